use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use basalt_proto::codec::{CipherContext, CompressionContext};
use basalt_proto::io::VarInt;
use basalt_proto::packet::clientbound::{
    EncryptionRequest, LoginDisconnect, LoginMapping as ClientboundLoginMapping, LoginSuccess,
    SetCompression,
};
use basalt_proto::packet::serverbound::{
    EncryptionResponse, LoginMapping as ServerboundLoginMapping, LoginStart,
};
use basalt_util::sha1::minecraft_signed_hex;

use crate::chat;
use crate::error::LoginError;
use crate::join::JoinContext;
use crate::mojang::{GameProfile, SessionAuthenticator};
use crate::preamble::Preamble;
use crate::server::ServerContext;
use crate::session::{LoginSession, Phase};

/// Server ID appears to be empty
const SERVER_ID: &str = "";

/// RSA blobs from the client can never exceed one modulus-sized block.
const MAX_CIPHERTEXT_LENGTH: usize = 128;

const USERNAME_MIN_CHARS: usize = 1;
const USERNAME_MAX_CHARS: usize = 16;

/// Drives a connection through the whole login exchange. On success the
/// connection is ready for the play phase: identity is settled and
/// compression/encryption are switched on as negotiated.
pub async fn handle_login<'a, R, W, A>(
    mut preamble: Preamble<'a, R, W>,
    ctx: &ServerContext<A>,
    protocol_version: i32,
) -> Result<JoinContext<'a, R, W>, LoginError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    A: SessionAuthenticator,
{
    let mut session = LoginSession::new(protocol_version);

    match drive(&mut preamble, &mut session, ctx).await {
        Ok(profile) => Ok(preamble.into_join_context(profile)),
        Err(e) => {
            session.fail();
            Err(e)
        }
    }
}

async fn drive<R, W, A>(
    preamble: &mut Preamble<'_, R, W>,
    session: &mut LoginSession,
    ctx: &ServerContext<A>,
) -> Result<GameProfile, LoginError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    A: SessionAuthenticator,
{
    loop {
        let packet = preamble.reader.read::<ServerboundLoginMapping>().await?;

        match (session.phase(), packet) {
            (Phase::AwaitingHello, ServerboundLoginMapping::LoginStart(p)) => {
                if let Some(profile) = on_login_start(preamble, session, ctx, p).await? {
                    return Ok(profile);
                }
            }
            (Phase::AwaitingEncryptionResponse, ServerboundLoginMapping::EncryptionResponse(p)) => {
                return on_encryption_response(preamble, session, ctx, p).await;
            }
            (Phase::AwaitingPluginResponse, ServerboundLoginMapping::LoginPluginResponse(p)) => {
                session.accept_plugin_response(p.message_id.0)?;
                debug!(
                    "[{}] plugin response for message {} ({})",
                    preamble.conn.id,
                    p.message_id,
                    if p.successful { "understood" } else { "not understood" },
                );
            }
            (phase, packet) => {
                warn!(
                    "[{}] unexpected {} packet in {:?} phase",
                    preamble.conn.id,
                    packet.name(),
                    phase,
                );

                return Err(LoginError::MalformedPacket(format!(
                    "unexpected {} in {:?}",
                    packet.name(),
                    phase
                )));
            }
        }
    }
}

/// Hello packet: settle the protocol version, then either admit the
/// player outright (offline mode) or open the encryption exchange.
async fn on_login_start<R, W, A>(
    preamble: &mut Preamble<'_, R, W>,
    session: &mut LoginSession,
    ctx: &ServerContext<A>,
    p: LoginStart,
) -> Result<Option<GameProfile>, LoginError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    A: SessionAuthenticator,
{
    let username_chars = p.name.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&username_chars) {
        return Err(LoginError::MalformedPacket(format!(
            "username of {username_chars} characters"
        )));
    }
    session.set_claimed_username(p.name.clone());

    let client = session.protocol_version();
    let server = ctx.config.game.protocol_version;
    if client != server {
        let reason = if client < server {
            chat::outdated_client(&ctx.config.game.version_name)
        } else {
            chat::outdated_server(&ctx.config.game.version_name)
        };

        preamble
            .writer
            .write(ClientboundLoginMapping::LoginDisconnect(LoginDisconnect {
                reason,
            }))
            .await?;

        return Err(LoginError::ProtocolVersionMismatch { client, server });
    }

    if !ctx.config.auth.online_mode {
        let profile = GameProfile::offline(&p.name);
        finish_login(preamble, session, ctx, &profile).await?;

        return Ok(Some(profile));
    }

    preamble
        .writer
        .write(ClientboundLoginMapping::EncryptionRequest(EncryptionRequest {
            server_id: SERVER_ID.to_owned(),
            public_key: Box::from(ctx.keypair.spki_der()),
            verify_token: Box::new(session.verify_token()),
        }))
        .await?;

    session.advance(Phase::AwaitingEncryptionResponse)?;

    Ok(None)
}

async fn on_encryption_response<R, W, A>(
    preamble: &mut Preamble<'_, R, W>,
    session: &mut LoginSession,
    ctx: &ServerContext<A>,
    p: EncryptionResponse,
) -> Result<GameProfile, LoginError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    A: SessionAuthenticator,
{
    for (field, len) in [
        ("shared secret", p.shared_secret.len()),
        ("verify token", p.verify_token.len()),
    ] {
        if len > MAX_CIPHERTEXT_LENGTH {
            return Err(LoginError::MalformedPacket(format!(
                "{field} ciphertext of {len} bytes"
            )));
        }
    }

    let secret = ctx.keypair.decrypt_shared_secret(&p.shared_secret)?;
    session.install_shared_secret(secret)?;

    // The client switched its cipher on right after sending this packet,
    // so ours flips before anything else crosses the wire in either
    // direction
    preamble.reader.codec().enable_encryption(CipherContext::new(secret));
    preamble.writer.codec().enable_encryption(CipherContext::new(secret));

    let token = ctx.keypair.decrypt_verify_token(&p.verify_token)?;
    if u32::from_be_bytes(token) != u32::from_be_bytes(session.verify_token()) {
        return Err(LoginError::VerifyTokenMismatch);
    }

    let server_id = server_id_digest(SERVER_ID, &secret, ctx.keypair.spki_der());
    let username = session
        .claimed_username()
        .ok_or_else(|| LoginError::Internal("no claimed username on record".to_owned()))?
        .to_owned();

    let profile = ctx.authenticator.has_joined(&username, &server_id).await?;
    finish_login(preamble, session, ctx, &profile).await?;

    Ok(profile)
}

/// Terminal happy path: compression is announced (the announcement
/// itself always rides uncompressed), then the success packet seals the
/// login and the session completes.
async fn finish_login<R, W, A>(
    preamble: &mut Preamble<'_, R, W>,
    session: &mut LoginSession,
    ctx: &ServerContext<A>,
    profile: &GameProfile,
) -> Result<(), LoginError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    A: SessionAuthenticator,
{
    let threshold = ctx.config.network.compression_threshold;

    preamble
        .writer
        .write(ClientboundLoginMapping::SetCompression(SetCompression {
            threshold: VarInt(threshold),
        }))
        .await?;

    if threshold > 0 {
        preamble
            .reader
            .codec()
            .enable_compression(CompressionContext::new(threshold as usize));
        preamble
            .writer
            .codec()
            .enable_compression(CompressionContext::new(threshold as usize));
    }

    preamble
        .writer
        .write(ClientboundLoginMapping::LoginSuccess(LoginSuccess {
            uuid: profile.uuid,
            username: profile.name.clone(),
        }))
        .await?;

    session.complete(profile.clone())
}

/// Digest the session server checks the `serverId` parameter against,
/// as described here: https://wiki.vg/Protocol_Encryption#Client
fn server_id_digest(server_id: &str, secret: &[u8; 16], spki_der: &[u8]) -> String {
    let mut hasher = Sha1::new();

    hasher.update(server_id.as_bytes());
    hasher.update(secret);
    hasher.update(spki_der);

    minecraft_signed_hex(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::server_id_digest;

    #[test]
    fn digest_of_zero_secret_and_empty_key() {
        assert_eq!(
            "-1ed60d83aefc43a33bb4320f5ea1e9f2bbaf9901",
            server_id_digest("", &[0u8; 16], &[])
        );
    }

    #[test]
    fn digest_covers_all_three_inputs() {
        let base = server_id_digest("", &[0x11; 16], &[0x22; 8]);

        assert_ne!(base, server_id_digest("x", &[0x11; 16], &[0x22; 8]));
        assert_ne!(base, server_id_digest("", &[0x12; 16], &[0x22; 8]));
        assert_ne!(base, server_id_digest("", &[0x11; 16], &[0x23; 8]));
    }
}
