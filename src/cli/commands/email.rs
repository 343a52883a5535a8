use anyhow::{Result, anyhow};
use clap::{Arg, ArgAction, Command};
use secrecy::SecretString;

pub const ARG_MOCKS: &str = "mocks";
pub const ARG_RESEND_API_KEY: &str = "resend-api-key";
pub const ARG_EMAIL_FROM: &str = "email-from";

#[derive(Debug)]
pub struct Options {
    pub mocks: bool,
    pub resend_api_key: Option<SecretString>,
    pub from: String,
}

impl Options {
    /// Read email delivery settings.
    ///
    /// # Errors
    /// Returns an error when real delivery is requested without an API key.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let mocks = matches.get_flag(ARG_MOCKS);
        let resend_api_key = matches
            .get_one::<String>(ARG_RESEND_API_KEY)
            .map(|key| SecretString::from(key.clone()));

        if !mocks && resend_api_key.is_none() {
            return Err(anyhow!(
                "missing required argument: --{ARG_RESEND_API_KEY} (or run with --{ARG_MOCKS})"
            ));
        }

        Ok(Self {
            mocks,
            resend_api_key,
            from: matches
                .get_one::<String>(ARG_EMAIL_FROM)
                .cloned()
                .unwrap_or_else(|| "Grape Stack <hello@grapestack.dev>".to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MOCKS)
                .long(ARG_MOCKS)
                .help("Log outgoing email instead of delivering it")
                .env("GRAPESTACK_MOCKS")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_RESEND_API_KEY)
                .long(ARG_RESEND_API_KEY)
                .help("Resend API key used to deliver email")
                .env("GRAPESTACK_RESEND_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_EMAIL_FROM)
                .long(ARG_EMAIL_FROM)
                .help("Sender address for outgoing email")
                .env("GRAPESTACK_EMAIL_FROM")
                .default_value("Grape Stack <hello@grapestack.dev>"),
        )
}
