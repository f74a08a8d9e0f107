use flume::Sender;
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn, Level};

use basalt_proto::codec::{ReadableCodec, WritableCodec};

use crate::conn::Connection;
use crate::io::{Reader, Writer};
use crate::join::Client;
use crate::mojang::SessionAuthenticator;
use crate::preamble::{handle_preamble, Preamble, PreambleError};
use crate::server::ServerContext;

/// Owns one accepted connection and runs its pre-play exchange on a
/// dedicated task. Login state never leaves this task.
pub struct Worker<A> {
    conn: Connection,
    stream: TcpStream,
    players: Sender<Client>,
    ctx: ServerContext<A>,
}

impl<A: SessionAuthenticator + 'static> Worker<A> {
    pub fn new(
        conn: Connection,
        stream: TcpStream,
        players: Sender<Client>,
        ctx: ServerContext<A>,
    ) -> Self {
        Self {
            conn,
            stream,
            players,
            ctx,
        }
    }

    pub fn start(self) {
        tokio::task::spawn(async move {
            self.run().await;
        });
    }

    async fn run(self) {
        let (read_half, write_half) = self.stream.into_split();
        let mut reader = Reader::new(self.conn.id, read_half, ReadableCodec::new());
        let mut writer = Writer::new(self.conn.id, write_half, WritableCodec::new());

        let preamble = Preamble::new(&self.conn, &mut reader, &mut writer);

        match handle_preamble(preamble, &self.ctx).await {
            Ok(Some(join_ctx)) => {
                let client = join_ctx.to_client();
                info!(
                    "{} ({}) joined from {}",
                    client.name,
                    client.uuid,
                    self.conn.addr(),
                );

                if self.players.send_async(client).await.is_err() {
                    return;
                }

                // TODO: hand the connection to the play-phase handler once it exists
                let _ = reader.drain().await;
                debug!("[{}] connection closed", self.conn.id);
            }
            Ok(None) => {}
            Err(e) => log_preamble_error(&self.conn, e),
        }
    }
}

/// One log line per failed connection, severity picked by error kind.
/// Failures close the connection without a reply; reconnecting is the
/// client's business.
fn log_preamble_error(conn: &Connection, err: PreambleError) {
    match err {
        PreambleError::Handshake(e) => warn!("[{}] handshake aborted: {e:#}", conn.id),
        PreambleError::Status(e) => warn!("[{}] status exchange aborted: {e:#}", conn.id),
        PreambleError::Login(e) => match e.severity() {
            Level::INFO => info!("[{}] login rejected: {e}", conn.id),
            Level::WARN => warn!("[{}] login aborted: {e}", conn.id),
            _ => error!("[{}] login failed: {e}", conn.id),
        },
    }
}
