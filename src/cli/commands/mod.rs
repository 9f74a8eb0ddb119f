pub mod logging;
pub mod provider;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_STATIC_DIR: &str = "static-dir";
pub const ARG_EMAIL_DOMAIN: &str = "email-domain";

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

    let command = Command::new("credgate")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("3000")
                .env("PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_STATIC_DIR)
                .long(ARG_STATIC_DIR)
                .help("Directory served for any path not handled by the API")
                .env("CREDGATE_STATIC_DIR")
                .default_value("."),
        )
        .arg(
            Arg::new(ARG_EMAIL_DOMAIN)
                .long(ARG_EMAIL_DOMAIN)
                .help("Domain appended to normalized usernames to build provider emails")
                .env("CREDGATE_EMAIL_DOMAIN")
                .default_value(crate::gateway::DEFAULT_EMAIL_DOMAIN),
        );

    let command = provider::with_args(command);
    logging::with_args(command)
}
