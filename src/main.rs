mod cli;

use actix_web::{App, HttpServer};
use clap::Parser;
use cli::{Cli, Command};
use similtext::{config, DirStore, SharedIndex};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Cli::parse();

    match args.command {
        Command::Serve { host, port } => {
            tracing::info!("serving index in '{}' on {}:{}", args.storage_dir.display(), host, port);
            let state = similtext::server::app_state(args.storage_dir);
            HttpServer::new(move || {
                App::new()
                    .app_data(state.clone())
                    .configure(similtext::server::config)
            })
            .bind((host, port))?
            .run()
            .await?;
        }
        command => {
            let index = SharedIndex::new(DirStore::new(args.storage_dir));
            if !cli::execute_command(&index, command) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
