use anyhow::anyhow;
use tokio::io::{AsyncRead, AsyncWrite};

use basalt_proto::packet::clientbound::{
    PingResponse, StatusMapping as ClientboundStatusMapping, StatusResponse,
};
use basalt_proto::packet::serverbound::{HandshakingMapping, StatusMapping as ServerboundStatusMapping};

use crate::conn::Connection;
use crate::error::LoginError;
use crate::io::{Reader, Writer};
use crate::join::JoinContext;
use crate::login::handle_login;
use crate::mojang::{GameProfile, SessionAuthenticator};
use crate::server::ServerContext;

const NEXT_STATE_STATUS: i32 = 1;
const NEXT_STATE_LOGIN: i32 = 2;

/// Everything the pre-play part of a connection has to work with.
pub struct Preamble<'a, R, W> {
    pub conn: &'a Connection,
    pub reader: &'a mut Reader<R>,
    pub writer: &'a mut Writer<W>,
}

#[derive(Debug)]
pub enum PreambleError {
    Handshake(anyhow::Error),
    Status(anyhow::Error),
    Login(LoginError),
}

impl<'a, R, W> Preamble<'a, R, W> {
    pub fn new(conn: &'a Connection, reader: &'a mut Reader<R>, writer: &'a mut Writer<W>) -> Self {
        Self {
            conn,
            reader,
            writer,
        }
    }

    pub fn into_join_context(self, profile: GameProfile) -> JoinContext<'a, R, W> {
        JoinContext::new(profile, self.conn, self.reader, self.writer)
    }
}

/// Runs a fresh connection up to the point where it either turns into a
/// joined player (`Some`), or finishes a status exchange and is done
/// (`None`).
pub async fn handle_preamble<'a, R, W, A>(
    mut preamble: Preamble<'a, R, W>,
    ctx: &ServerContext<A>,
) -> Result<Option<JoinContext<'a, R, W>>, PreambleError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    A: SessionAuthenticator,
{
    let h = preamble
        .reader
        .read::<HandshakingMapping>()
        .await
        .map_err(|e| PreambleError::Handshake(anyhow!(e)))?;

    let HandshakingMapping::Handshake(h) = h;

    match h.next_state.0 {
        NEXT_STATE_STATUS => {
            handle_status(&mut preamble, ctx)
                .await
                .map_err(PreambleError::Status)?;

            Ok(None)
        }
        NEXT_STATE_LOGIN => {
            let join_ctx = handle_login(preamble, ctx, h.protocol_version.0)
                .await
                .map_err(PreambleError::Login)?;

            Ok(Some(join_ctx))
        }
        other => Err(PreambleError::Handshake(anyhow!(
            "handshake requested unknown next state {other}"
        ))),
    }
}

async fn handle_status<R, W, A>(
    preamble: &mut Preamble<'_, R, W>,
    ctx: &ServerContext<A>,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let req = preamble.reader.read::<ServerboundStatusMapping>().await?;

    let ServerboundStatusMapping::StatusRequest(_) = req else {
        return Err(anyhow!("expected StatusRequest packet, but {} given", req.name()));
    };

    let game = &ctx.config.game;
    let json = serde_json::json!({
        "version": {
            "name": game.version_name,
            "protocol": game.protocol_version,
        },
        "players": {
            "max": game.max_players,
            "online": 0,
        },
        "description": {
            "text": game.motd,
        },
    })
    .to_string();

    preamble
        .writer
        .write(ClientboundStatusMapping::StatusResponse(StatusResponse {
            json,
        }))
        .await?;

    let ping = preamble.reader.read::<ServerboundStatusMapping>().await?;

    let ServerboundStatusMapping::PingRequest(ping) = ping else {
        return Err(anyhow!("expected PingRequest packet, but {} given", ping.name()));
    };

    preamble
        .writer
        .write(ClientboundStatusMapping::PingResponse(PingResponse {
            payload: ping.payload,
        }))
        .await?;

    Ok(())
}
