pub mod email;
pub mod logging;
pub mod session;

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_SEED_DEMO_USER: &str = "seed-demo-user";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("grapestack")
        .about("Starter web stack with email verification and session management")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("3000")
                .env("GRAPESTACK_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("GRAPESTACK_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SEED_DEMO_USER)
                .long(ARG_SEED_DEMO_USER)
                .help("Create the demouser/demopassword account on startup")
                .env("GRAPESTACK_SEED_DEMO_USER")
                .action(ArgAction::SetTrue),
        );

    let command = session::with_args(command);
    let command = email::with_args(command);
    logging::with_args(command)
}
