#![allow(clippy::multiple_crate_versions)]

use clap::{Arg, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Path to the TOML configuration file")
        .default_value("hookline.toml")
}

fn build_cli() -> Command {
    Command::new("hookline")
        .version(VERSION)
        .about("Hookline - Messenger webhook receiver for chatbot backends")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Start the webhook receiver and job worker")
                .arg(config_arg())
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Port for the webhook receiver (overrides facebook.webhook_port)"),
                )
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Address to bind to (overrides facebook.bind_address)"),
                )
                .arg(
                    Arg::new("verify-token")
                        .long("verify-token")
                        .value_name("TOKEN")
                        .env("FACEBOOK_VERIFY_TOKEN")
                        .help("Token expected in subscription handshakes"),
                )
                .arg(
                    Arg::new("page-access-token")
                        .long("page-access-token")
                        .value_name("TOKEN")
                        .env("FACEBOOK_PAGE_ACCESS_TOKEN")
                        .help("Fallback page access token"),
                )
                .arg(
                    Arg::new("app-secret")
                        .long("app-secret")
                        .value_name("SECRET")
                        .env("FACEBOOK_APP_SECRET")
                        .help("App secret for X-Hub-Signature-256 verification"),
                )
                .arg(
                    Arg::new("queue-capacity")
                        .long("queue-capacity")
                        .value_name("N")
                        .help("Maximum number of pending jobs"),
                )
                .arg(
                    Arg::new("outcome-log")
                        .long("outcome-log")
                        .value_name("FILE")
                        .help("Append one JSON line per processed job to FILE"),
                ),
        )
        .subcommand(
            Command::new("doctor")
                .about("Check configuration and environment")
                .arg(config_arg()),
        )
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("serve", sub_matches)) => commands::serve::run(sub_matches).await,
        Some(("doctor", sub_matches)) => commands::doctor::run(sub_matches).await,
        _ => {
            eprintln!("Unknown command. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookline_messenger::HooklineConfig;

    #[test]
    fn cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn serve_flags_override_config() {
        let matches = build_cli()
            .try_get_matches_from([
                "hookline",
                "serve",
                "--port",
                "4000",
                "--host",
                "127.0.0.1",
                "--verify-token",
                "verify",
                "--queue-capacity",
                "16",
                "--outcome-log",
                "outcomes.jsonl",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "serve");
        assert_eq!(sub.get_one::<String>("config").unwrap(), "hookline.toml");

        let mut config = HooklineConfig::default();
        commands::serve::apply_overrides(&mut config, sub).unwrap();
        assert_eq!(config.facebook.webhook_port, 4000);
        assert_eq!(config.facebook.bind_address, "127.0.0.1");
        assert_eq!(config.facebook.verify_token.as_deref(), Some("verify"));
        assert_eq!(config.queue.capacity, 16);
        assert_eq!(
            config.logging.outcome_log.as_deref(),
            Some(std::path::Path::new("outcomes.jsonl"))
        );
    }

    #[test]
    fn invalid_port_is_rejected() {
        let matches = build_cli()
            .try_get_matches_from(["hookline", "serve", "--port", "not-a-port"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let mut config = HooklineConfig::default();
        assert!(commands::serve::apply_overrides(&mut config, sub).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(build_cli().try_get_matches_from(["hookline"]).is_err());
    }
}
