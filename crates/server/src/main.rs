use std::net::{Ipv4Addr, SocketAddr};
use std::process::exit;
use std::sync::Arc;
use std::time::Instant;

use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use basalt_config::build_config_from_env;
use basalt_log::configure_logger;
use basalt_net::join::Client;
use basalt_net::key::ServerKeypair;
use basalt_net::mojang::MojangSessionApi;
use basalt_net::server::{NetServer, ServerContext};

const BANNER: &str = r"
>  ____                  _ _
> | __ )  __ _ ___  __ _| | |_
> |  _ \ / _` / __|/ _` | | __|
> | |_) | (_| \__ \ (_| | | |_
> |____/ \__,_|___/\__,_|_|\__|
>                      v. 0.1.0
>
> Basalt: Minecraft-compatible game server written in Rust";

#[tokio::main]
async fn main() {
    let config = match build_config_from_env() {
        Ok(config) => config.unwrap(),
        Err(e) => {
            eprintln!("Error reading configuration file: {e}");
            eprintln!("Launch interrupted by error");
            exit(1);
        }
    };

    let _guard = configure_logger(&config.log);

    info!("{}", BANNER);

    if let Err(e) = run(config).await {
        error!("Launch interrupted by error: {e:#}");
        exit(1);
    }
}

async fn run(config: basalt_config::Config) -> anyhow::Result<()> {
    let started_at = Instant::now();
    let keypair = Arc::new(ServerKeypair::generate()?);
    info!(
        "Generated {} RSA keypair in {:.2?}",
        "server".cyan(),
        started_at.elapsed()
    );

    if !config.auth.online_mode {
        info!(
            "{}: player identities are self-reported",
            "Online mode is disabled".yellow()
        );
    }

    let authenticator = Arc::new(MojangSessionApi::new(config.auth.session_host.clone())?);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.network.port));
    let cancel = CancellationToken::new();
    let (players_tx, players_rx) = flume::unbounded::<Client>();

    let ctx = ServerContext::new(config, Arc::clone(&keypair), authenticator);
    let server = NetServer::new(addr, cancel.clone(), players_tx, ctx);

    tokio::spawn(async move {
        while let Ok(client) = players_rx.recv_async().await {
            info!("Player handed off to play phase: {client:?}");
        }
    });

    tokio::spawn({
        let cancel = cancel.clone();

        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down...");
                cancel.cancel();
            }
        }
    });

    server.serve().await
}
