//! Discourse SSO provider CLI.

use std::process::ExitCode;

use clap::Parser;

use discourse_sso_server::auth::hash_password;
use discourse_sso_server::config::{Cli, Command, ServerConfig};
use discourse_sso_server::server::{self, EXIT_CONFIG_ERROR, EXIT_RUNTIME_ERROR};
use discourse_sso_telemetry::{log_startup, Telemetry};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            let config = match args.into_config() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("error: {:#}", e);
                    return ExitCode::from(EXIT_CONFIG_ERROR);
                }
            };

            let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
            rt.block_on(async {
                match serve(config).await {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(e) => {
                        eprintln!("error: {:#}", e);
                        ExitCode::from(server::exit_code_for(&e))
                    }
                }
            })
        }

        Command::HashPassword { password } => match hash_password(&password) {
            Ok(hash) => {
                println!("{}", hash);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::from(EXIT_RUNTIME_ERROR)
            }
        },
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let telemetry = Telemetry::init(config.telemetry.clone())?;
    log_startup!(
        service = %telemetry.config().service_name,
        version = env!("CARGO_PKG_VERSION"),
        nonce_ttl_secs = config.nonce_ttl.as_secs(),
        "starting Discourse SSO provider"
    );

    let state = server::build_state(&config, telemetry.metrics_clone())?;
    server::run(config, state).await
}
