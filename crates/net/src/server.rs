use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use flume::Sender;
use owo_colors::OwoColorize;
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use basalt_config::Config;

use crate::join::Client;
use crate::conn::Connection;
use crate::key::ServerKeypair;
use crate::mojang::SessionAuthenticator;
use crate::worker::Worker;

/// Server-wide dependencies of every connection handler: configuration,
/// the process-lifetime RSA keypair, and the identity verifier. Built
/// once at startup; cloning only bumps reference counts.
pub struct ServerContext<A> {
    pub config: Config,
    pub keypair: Arc<ServerKeypair>,
    pub authenticator: Arc<A>,
}

impl<A> ServerContext<A> {
    pub fn new(config: Config, keypair: Arc<ServerKeypair>, authenticator: Arc<A>) -> Self {
        Self {
            config,
            keypair,
            authenticator,
        }
    }
}

impl<A> Clone for ServerContext<A> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            keypair: Arc::clone(&self.keypair),
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}

pub struct NetServer<A> {
    next_id: AtomicI32,
    addr: SocketAddr,
    cancel: CancellationToken,
    players: Sender<Client>,
    ctx: ServerContext<A>,
}

impl<A: SessionAuthenticator + 'static> NetServer<A> {
    pub fn new(
        addr: SocketAddr,
        cancel: CancellationToken,
        players: Sender<Client>,
        ctx: ServerContext<A>,
    ) -> Self {
        Self {
            next_id: AtomicI32::new(0),
            addr,
            cancel,
            players,
            ctx,
        }
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        Arc::new(self).listen().await
    }

    async fn listen(self: Arc<Self>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(
            "Listening socket {} for incoming connections...",
            format!("{}:{}", self.addr.ip(), self.addr.port()).cyan().underline()
        );

        loop {
            select! {
                _ = self.cancel.cancelled() => {
                    return Ok(());
                }
                res = listener.accept() => {
                    match res {
                        Ok((stream, addr)) => self.accept(stream, addr),
                        Err(e) => error!("Could not accept connection: {e}"),
                    }
                }
            }
        }
    }

    fn accept(&self, stream: TcpStream, addr: SocketAddr) {
        let conn = Connection::new(self.next_id.fetch_add(1, Ordering::Relaxed), addr);

        Worker::new(conn, stream, self.players.clone(), self.ctx.clone()).start();
    }
}
