use anyhow::{Context, Result, anyhow};
use clap::{Arg, Command};
use secrecy::SecretString;
use std::{fmt, str::FromStr};

pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_VERIFICATION_TTL_SECONDS: &str = "verification-ttl-seconds";

/// Deployment environment; only `production` marks cookies `Secure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
    Test,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Test => "test",
        }
    }

    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            other => Err(anyhow!("unknown environment: {other}")),
        }
    }
}

#[derive(Debug)]
pub struct Options {
    pub environment: Environment,
    pub session_secrets: Vec<SecretString>,
    pub base_url: String,
    pub session_ttl_seconds: i64,
    pub verification_ttl_seconds: i64,
}

impl Options {
    /// Read session and cookie settings from parsed arguments.
    ///
    /// # Errors
    /// Returns an error if the secret list is empty or a value is malformed.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let environment = matches
            .get_one::<String>(ARG_ENVIRONMENT)
            .map_or(Ok(Environment::Development), |value| value.parse())?;

        let secrets = matches
            .get_one::<String>(ARG_SESSION_SECRET)
            .context("missing required argument: --session-secret")?;
        let session_secrets = split_secrets(secrets);
        if session_secrets.is_empty() {
            return Err(anyhow!("--session-secret must contain at least one secret"));
        }

        let base_url = matches
            .get_one::<String>(ARG_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:3000".to_string());
        url::Url::parse(&base_url).with_context(|| format!("invalid --base-url: {base_url}"))?;

        Ok(Self {
            environment,
            session_secrets,
            base_url,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(30 * 24 * 60 * 60),
            verification_ttl_seconds: matches
                .get_one::<i64>(ARG_VERIFICATION_TTL_SECONDS)
                .copied()
                .unwrap_or(10 * 60),
        })
    }
}

/// Secrets are comma separated; the first one signs, all of them verify.
fn split_secrets(value: &str) -> Vec<SecretString> {
    value
        .split(',')
        .map(str::trim)
        .filter(|secret| !secret.is_empty())
        .map(|secret| SecretString::from(secret.to_string()))
        .collect()
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment; production marks cookies Secure")
                .env("GRAPESTACK_ENV")
                .default_value("development")
                .value_parser(["production", "development", "test"]),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Comma separated cookie signing secrets, newest first")
                .env("GRAPESTACK_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Public base URL used in verification links")
                .env("GRAPESTACK_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Login session lifetime in seconds")
                .env("GRAPESTACK_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64).range(60..)),
        )
        .arg(
            Arg::new(ARG_VERIFICATION_TTL_SECONDS)
                .long(ARG_VERIFICATION_TTL_SECONDS)
                .help("Lifetime of one-time codes and the verify-session cookie in seconds")
                .env("GRAPESTACK_VERIFICATION_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64).range(30..=i64::from(i32::MAX))),
        )
}
