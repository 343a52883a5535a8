use crate::{
    api::{
        self,
        email::{EmailSender, LogEmailSender, ResendEmailSender},
        handlers::auth::{AuthConfig, AuthState, CookieSigner},
    },
    cli::commands::session::Environment,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub environment: Environment,
    pub session_secrets: Vec<SecretString>,
    pub base_url: String,
    pub session_ttl_seconds: i64,
    pub verification_ttl_seconds: i64,
    pub mocks: bool,
    pub resend_api_key: Option<SecretString>,
    pub email_from: String,
    pub seed_demo_user: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let auth_config = AuthConfig::new(args.base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_verification_ttl_seconds(args.verification_ttl_seconds)
        .with_secure_cookies(args.environment.is_production());

    let cookies = CookieSigner::new(args.session_secrets).context("invalid session secrets")?;

    let email: Arc<dyn EmailSender> = if args.mocks {
        warn!("Mock mode: outgoing email is logged, not delivered");
        Arc::new(LogEmailSender)
    } else {
        let api_key = args
            .resend_api_key
            .context("missing required argument: --resend-api-key")?;
        Arc::new(ResendEmailSender::new(api_key, args.email_from)?)
    };

    let auth_state = Arc::new(AuthState::new(auth_config, cookies, email));

    api::new(args.port, args.dsn, auth_state, args.seed_demo_user).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("environment", args.environment.to_string()),
        ("base_url", args.base_url.clone()),
        ("session_secrets", args.session_secrets.len().to_string()),
        ("session_ttl_seconds", args.session_ttl_seconds.to_string()),
        (
            "verification_ttl_seconds",
            args.verification_ttl_seconds.to_string(),
        ),
        (
            "email",
            if args.mocks { "log" } else { "resend" }.to_string(),
        ),
    ];
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "grapestack {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
