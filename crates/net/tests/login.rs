//! End-to-end login exchanges over an in-memory pipe: a real reader,
//! writer, and codec on both sides, with a fake session service standing
//! in for Mojang.

use std::future::Future;
use std::sync::{Arc, Mutex};

use rand::rngs::OsRng;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, PublicKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use tokio::io::{duplex, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use uuid::Uuid;

use basalt_config::Config;
use basalt_net::conn::Connection;
use basalt_net::error::LoginError;
use basalt_net::io::{Reader, Writer};
use basalt_net::key::ServerKeypair;
use basalt_net::mojang::{GameProfile, SessionAuthenticator, Textures};
use basalt_net::preamble::{handle_preamble, Preamble, PreambleError};
use basalt_net::server::ServerContext;
use basalt_proto::codec::{CipherContext, CompressionContext, ReadableCodec, WritableCodec};
use basalt_proto::io::{RemainingBytes, VarInt};
use basalt_proto::packet::clientbound::LoginMapping as Clientbound;
use basalt_proto::packet::serverbound::{
    EncryptionResponse, Handshake, LoginMapping as Serverbound, LoginPluginResponse, LoginStart,
};
use basalt_util::sha1::minecraft_signed_hex;

const PROTOCOL: i32 = 762;

struct FakeSessionService {
    outcome: FakeOutcome,
    calls: Mutex<Vec<(String, String)>>,
}

enum FakeOutcome {
    Accept(GameProfile),
    Refuse(u16),
}

impl FakeSessionService {
    fn accepting(profile: GameProfile) -> Self {
        Self {
            outcome: FakeOutcome::Accept(profile),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn refusing(status: u16) -> Self {
        Self {
            outcome: FakeOutcome::Refuse(status),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SessionAuthenticator for FakeSessionService {
    fn has_joined(
        &self,
        username: &str,
        server_id: &str,
    ) -> impl Future<Output = Result<GameProfile, LoginError>> + Send {
        self.calls
            .lock()
            .unwrap()
            .push((username.to_owned(), server_id.to_owned()));

        let result = match &self.outcome {
            FakeOutcome::Accept(profile) => Ok(profile.clone()),
            FakeOutcome::Refuse(status) => Err(LoginError::AuthenticationRefused(*status)),
        };

        async move { result }
    }
}

fn notch_profile() -> GameProfile {
    GameProfile {
        uuid: Uuid::parse_str("069a79f444e94726a5befca90e38aaf5").unwrap(),
        name: "Notch".to_owned(),
        textures: Some(Textures {
            value: "eyJ0ZXh0dXJlcyI6e319".to_owned(),
            signature: Some("AbcSig==".to_owned()),
        }),
    }
}

struct Fixture {
    client: TestClient,
    service: Arc<FakeSessionService>,
    keypair: Arc<ServerKeypair>,
    server: JoinHandle<Result<Option<GameProfile>, PreambleError>>,
}

fn fixture(online_mode: bool, service: FakeSessionService) -> Fixture {
    let mut config = Config::default();
    config.auth.online_mode = online_mode;

    let keypair = Arc::new(ServerKeypair::generate().unwrap());
    let service = Arc::new(service);
    let ctx = ServerContext::new(config, Arc::clone(&keypair), Arc::clone(&service));

    let (client_stream, server_stream) = duplex(4096);

    let server = tokio::spawn(async move {
        let conn = Connection::new(0, "127.0.0.1:25565".parse().unwrap());
        let (read_half, write_half) = tokio::io::split(server_stream);
        let mut reader = Reader::new(0, read_half, ReadableCodec::new());
        let mut writer = Writer::new(0, write_half, WritableCodec::new());

        let preamble = Preamble::new(&conn, &mut reader, &mut writer);
        handle_preamble(preamble, &ctx)
            .await
            .map(|outcome| outcome.map(|join_ctx| join_ctx.profile))
    });

    Fixture {
        client: TestClient::new(client_stream),
        service,
        keypair,
        server,
    }
}

struct TestClient {
    reader: Reader<ReadHalf<DuplexStream>>,
    writer: Writer<WriteHalf<DuplexStream>>,
}

impl TestClient {
    fn new(stream: DuplexStream) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);

        Self {
            reader: Reader::new(1, read_half, ReadableCodec::new()),
            writer: Writer::new(1, write_half, WritableCodec::new()),
        }
    }

    async fn hello(&mut self, protocol: i32, username: &str) {
        self.writer
            .write(basalt_proto::packet::serverbound::HandshakingMapping::Handshake(Handshake {
                protocol_version: VarInt(protocol),
                server_address: "localhost".to_owned(),
                server_port: 25565,
                next_state: VarInt(2),
            }))
            .await
            .unwrap();

        self.writer
            .write(Serverbound::LoginStart(LoginStart {
                name: username.to_owned(),
            }))
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> Clientbound {
        self.reader.read::<Clientbound>().await.unwrap()
    }

    fn enable_encryption(&mut self, secret: [u8; 16]) {
        self.reader.codec().enable_encryption(CipherContext::new(secret));
        self.writer.codec().enable_encryption(CipherContext::new(secret));
    }

    fn enable_compression(&mut self, threshold: usize) {
        self.reader
            .codec()
            .enable_compression(CompressionContext::new(threshold));
        self.writer
            .codec()
            .enable_compression(CompressionContext::new(threshold));
    }
}

fn rsa_encrypt(spki_der: &[u8], payload: &[u8]) -> Box<[u8]> {
    let public = RsaPublicKey::from_public_key_der(spki_der).unwrap();

    public
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, payload)
        .unwrap()
        .into_boxed_slice()
}

fn expected_server_id(wire_secret: &[u8; 16], spki_der: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(b"");
    hasher.update(wire_secret);
    hasher.update(spki_der);

    minecraft_signed_hex(hasher.finalize().into())
}

async fn expect_login_error(
    server: JoinHandle<Result<Option<GameProfile>, PreambleError>>,
) -> LoginError {
    match server.await.unwrap() {
        Err(PreambleError::Login(e)) => e,
        other => panic!("expected a login error, got {other:?}"),
    }
}

// Scenario: offline mode admits the self-reported username directly.
#[tokio::test]
async fn offline_login_completes_without_encryption() {
    let mut fixture = fixture(false, FakeSessionService::refusing(204));

    fixture.client.hello(PROTOCOL, "Alex").await;

    let packet = fixture.client.recv().await;
    let Clientbound::SetCompression(packet) = packet else {
        panic!("expected SetCompression, but {} given", packet.name());
    };
    assert_eq!(packet.threshold, VarInt(256));
    fixture.client.enable_compression(256);

    let packet = fixture.client.recv().await;
    let Clientbound::LoginSuccess(packet) = packet else {
        panic!("expected LoginSuccess, but {} given", packet.name());
    };
    assert_eq!(packet.username, "Alex");
    assert_eq!(packet.uuid, GameProfile::offline("Alex").uuid);

    let profile = fixture.server.await.unwrap().unwrap().unwrap();
    assert_eq!(profile.name, "Alex");
    assert!(profile.textures.is_none());

    // The session server is never consulted offline
    assert!(fixture.service.calls().is_empty());
}

// Scenario: online mode opens with an encryption request carrying the
// server's DER key and a 4-byte token.
#[tokio::test]
async fn online_login_requests_encryption() {
    let mut fixture = fixture(true, FakeSessionService::accepting(notch_profile()));

    fixture.client.hello(PROTOCOL, "Alex").await;

    let packet = fixture.client.recv().await;
    let Clientbound::EncryptionRequest(packet) = packet else {
        panic!("expected EncryptionRequest, but {} given", packet.name());
    };

    assert_eq!(packet.server_id, "");
    assert_eq!(&packet.public_key[..], fixture.keypair.spki_der());
    assert_eq!(packet.verify_token.len(), 4);

    // The advertised key must be a parseable SubjectPublicKeyInfo
    RsaPublicKey::from_public_key_der(&packet.public_key).unwrap();

    drop(fixture.client);
    assert!(matches!(
        expect_login_error(fixture.server).await,
        LoginError::MalformedPacket(_)
    ));
}

// Scenario: the full online exchange, through to textures capture.
#[tokio::test]
async fn online_login_completes_and_authenticates() {
    let mut fixture = fixture(true, FakeSessionService::accepting(notch_profile()));

    fixture.client.hello(PROTOCOL, "Alex").await;

    let packet = fixture.client.recv().await;
    let Clientbound::EncryptionRequest(packet) = packet else {
        panic!("expected EncryptionRequest, but {} given", packet.name());
    };

    let secret: [u8; 16] = *b"\x01\x02\x03\x04\x05\x06\x07\x08\x09\x0A\x0B\x0C\x0D\x0E\x0F\x10";

    fixture
        .client
        .writer
        .write(Serverbound::EncryptionResponse(EncryptionResponse {
            shared_secret: rsa_encrypt(&packet.public_key, &secret),
            verify_token: rsa_encrypt(&packet.public_key, &packet.verify_token),
        }))
        .await
        .unwrap();

    // The server consumes the decrypted payload in reverse byte order;
    // from here on both sides speak AES-CFB8 under that key
    let mut wire_secret = secret;
    wire_secret.reverse();
    fixture.client.enable_encryption(wire_secret);

    let packet = fixture.client.recv().await;
    let Clientbound::SetCompression(packet) = packet else {
        panic!("expected SetCompression, but {} given", packet.name());
    };
    assert_eq!(packet.threshold, VarInt(256));
    fixture.client.enable_compression(256);

    let packet = fixture.client.recv().await;
    let Clientbound::LoginSuccess(packet) = packet else {
        panic!("expected LoginSuccess, but {} given", packet.name());
    };

    // Canonical username and UUID come from the session server, not the
    // client's claim
    assert_eq!(packet.username, "Notch");
    assert_eq!(
        packet.uuid,
        Uuid::parse_str("069a79f444e94726a5befca90e38aaf5").unwrap()
    );

    let profile = fixture.server.await.unwrap().unwrap().unwrap();
    assert_eq!(profile.name, "Notch");
    assert_eq!(profile.textures.as_ref().unwrap().value, "eyJ0ZXh0dXJlcyI6e319");
    assert_eq!(
        profile.textures.as_ref().unwrap().signature.as_deref(),
        Some("AbcSig==")
    );

    let calls = fixture.service.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Alex");
    assert_eq!(
        calls[0].1,
        expected_server_id(&wire_secret, fixture.keypair.spki_der())
    );
}

// Scenario: outdated client protocol draws a translated disconnect.
#[tokio::test]
async fn outdated_client_is_disconnected() {
    let mut fixture = fixture(true, FakeSessionService::refusing(204));

    fixture.client.hello(PROTOCOL - 1, "Alex").await;

    let packet = fixture.client.recv().await;
    let Clientbound::LoginDisconnect(packet) = packet else {
        panic!("expected LoginDisconnect, but {} given", packet.name());
    };
    assert!(packet.reason.contains("multiplayer.disconnect.outdated_client"));
    assert!(packet.reason.contains("1.19.4"));

    assert!(matches!(
        expect_login_error(fixture.server).await,
        LoginError::ProtocolVersionMismatch { client, server }
            if client == PROTOCOL - 1 && server == PROTOCOL
    ));
}

#[tokio::test]
async fn outdated_server_is_reported_too() {
    let mut fixture = fixture(true, FakeSessionService::refusing(204));

    fixture.client.hello(PROTOCOL + 5, "Alex").await;

    let packet = fixture.client.recv().await;
    let Clientbound::LoginDisconnect(packet) = packet else {
        panic!("expected LoginDisconnect, but {} given", packet.name());
    };
    assert!(packet.reason.contains("multiplayer.disconnect.outdated_server"));
}

// Scenario: a wrong verify token closes the connection silently.
#[tokio::test]
async fn verify_token_mismatch_closes_silently() {
    let mut fixture = fixture(true, FakeSessionService::accepting(notch_profile()));

    fixture.client.hello(PROTOCOL, "Alex").await;

    let packet = fixture.client.recv().await;
    let Clientbound::EncryptionRequest(packet) = packet else {
        panic!("expected EncryptionRequest, but {} given", packet.name());
    };

    let secret = [0x42u8; 16];
    fixture
        .client
        .writer
        .write(Serverbound::EncryptionResponse(EncryptionResponse {
            shared_secret: rsa_encrypt(&packet.public_key, &secret),
            verify_token: rsa_encrypt(&packet.public_key, &[0xDE, 0xAD, 0xBE, 0xEF]),
        }))
        .await
        .unwrap();

    assert!(matches!(
        expect_login_error(fixture.server).await,
        LoginError::VerifyTokenMismatch
    ));
}

// Scenario: an oversized ciphertext length field is malformed.
#[tokio::test]
async fn oversized_ciphertext_is_rejected() {
    let mut fixture = fixture(true, FakeSessionService::accepting(notch_profile()));

    fixture.client.hello(PROTOCOL, "Alex").await;

    let packet = fixture.client.recv().await;
    let Clientbound::EncryptionRequest(_) = packet else {
        panic!("expected EncryptionRequest, but {} given", packet.name());
    };

    fixture
        .client
        .writer
        .write(Serverbound::EncryptionResponse(EncryptionResponse {
            shared_secret: vec![0u8; 200].into_boxed_slice(),
            verify_token: vec![0u8; 4].into_boxed_slice(),
        }))
        .await
        .unwrap();

    assert!(matches!(
        expect_login_error(fixture.server).await,
        LoginError::MalformedPacket(_)
    ));
}

#[tokio::test]
async fn refused_session_fails_authentication() {
    let mut fixture = fixture(true, FakeSessionService::refusing(204));

    fixture.client.hello(PROTOCOL, "Alex").await;

    let packet = fixture.client.recv().await;
    let Clientbound::EncryptionRequest(packet) = packet else {
        panic!("expected EncryptionRequest, but {} given", packet.name());
    };

    let secret = [0x42u8; 16];
    fixture
        .client
        .writer
        .write(Serverbound::EncryptionResponse(EncryptionResponse {
            shared_secret: rsa_encrypt(&packet.public_key, &secret),
            verify_token: rsa_encrypt(&packet.public_key, &packet.verify_token),
        }))
        .await
        .unwrap();

    assert!(matches!(
        expect_login_error(fixture.server).await,
        LoginError::AuthenticationRefused(204)
    ));
}

// A packet that is legal in the login state but not in the current
// phase ends the session.
#[tokio::test]
async fn encryption_response_before_hello_is_rejected() {
    let mut fixture = fixture(true, FakeSessionService::refusing(204));

    fixture
        .client
        .writer
        .write(basalt_proto::packet::serverbound::HandshakingMapping::Handshake(Handshake {
            protocol_version: VarInt(PROTOCOL),
            server_address: "localhost".to_owned(),
            server_port: 25565,
            next_state: VarInt(2),
        }))
        .await
        .unwrap();

    fixture
        .client
        .writer
        .write(Serverbound::EncryptionResponse(EncryptionResponse {
            shared_secret: vec![0u8; 16].into_boxed_slice(),
            verify_token: vec![0u8; 4].into_boxed_slice(),
        }))
        .await
        .unwrap();

    assert!(matches!(
        expect_login_error(fixture.server).await,
        LoginError::MalformedPacket(_)
    ));
}

// An unsolicited plugin response is a protocol violation.
#[tokio::test]
async fn unsolicited_plugin_response_is_rejected() {
    let mut fixture = fixture(true, FakeSessionService::refusing(204));

    fixture.client.hello(PROTOCOL, "Alex").await;

    let packet = fixture.client.recv().await;
    let Clientbound::EncryptionRequest(_) = packet else {
        panic!("expected EncryptionRequest, but {} given", packet.name());
    };

    fixture
        .client
        .writer
        .write(Serverbound::LoginPluginResponse(LoginPluginResponse {
            message_id: VarInt(7),
            successful: true,
            data: RemainingBytes(Vec::new()),
        }))
        .await
        .unwrap();

    assert!(matches!(
        expect_login_error(fixture.server).await,
        LoginError::MalformedPacket(_)
    ));
}

#[tokio::test]
async fn overlong_username_is_rejected() {
    let mut fixture = fixture(true, FakeSessionService::refusing(204));

    fixture.client.hello(PROTOCOL, "ThisNameIsWayTooLongToBeLegal").await;

    assert!(matches!(
        expect_login_error(fixture.server).await,
        LoginError::MalformedPacket(_)
    ));
}
