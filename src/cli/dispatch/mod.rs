//! Command-line argument dispatch.
//!
//! Turns validated CLI matches into an [`Action`] carrying everything the
//! server needs to start.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_SEED_DEMO_USER, email, session};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(3000);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let session_opts = session::Options::parse(matches)?;
    let email_opts = email::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        environment: session_opts.environment,
        session_secrets: session_opts.session_secrets,
        base_url: session_opts.base_url,
        session_ttl_seconds: session_opts.session_ttl_seconds,
        verification_ttl_seconds: session_opts.verification_ttl_seconds,
        mocks: email_opts.mocks,
        resend_api_key: email_opts.resend_api_key,
        email_from: email_opts.from,
        seed_demo_user: matches.get_flag(ARG_SEED_DEMO_USER),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::session::Environment;

    fn clean_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(
            [
                ("GRAPESTACK_DSN", Some("postgres://user@localhost:5432/grapestack")),
                ("GRAPESTACK_SESSION_SECRET", Some("primary,previous")),
                ("GRAPESTACK_ENV", None::<&str>),
                ("GRAPESTACK_MOCKS", None::<&str>),
                ("GRAPESTACK_RESEND_API_KEY", None::<&str>),
                ("GRAPESTACK_PORT", None::<&str>),
                ("GRAPESTACK_SEED_DEMO_USER", None::<&str>),
            ],
            f,
        );
    }

    #[test]
    fn resend_key_required_without_mocks() {
        clean_env(|| {
            let matches = crate::cli::commands::new().get_matches_from(vec!["grapestack"]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(
                    err.to_string()
                        .contains("missing required argument: --resend-api-key")
                );
            }
        });
    }

    #[test]
    fn mocks_build_server_action() {
        clean_env(|| {
            let matches = crate::cli::commands::new().get_matches_from(vec![
                "grapestack",
                "--mocks",
                "--environment",
                "production",
            ]);
            let result = handler(&matches);
            assert!(result.is_ok());
            if let Ok(Action::Server(args)) = result {
                assert_eq!(args.port, 3000);
                assert!(args.mocks);
                assert_eq!(args.environment, Environment::Production);
                assert_eq!(args.session_secrets.len(), 2);
                assert_eq!(args.session_ttl_seconds, 30 * 24 * 60 * 60);
                assert_eq!(args.verification_ttl_seconds, 600);
                assert!(args.resend_api_key.is_none());
                assert!(!args.seed_demo_user);
            }
        });
    }
}
