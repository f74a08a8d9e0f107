use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::LoginError;

/// Authentication calls are single-shot; a hung session server must not
/// starve the connection handler.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Responses are a small JSON document; anything bigger is not the
/// session server talking.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Identity the session server vouches for.
#[derive(Debug, Clone)]
pub struct GameProfile {
    pub uuid: Uuid,
    /// Canonical username; may differ in casing from what the client
    /// claimed.
    pub name: String,
    pub textures: Option<Textures>,
}

/// The skin blob and its detached signature, both base64 and kept
/// verbatim: decoding them is the client's business.
#[derive(Debug, Clone)]
pub struct Textures {
    pub value: String,
    pub signature: Option<String>,
}

impl GameProfile {
    /// Offline-mode identity: the name-derived UUID the wider ecosystem
    /// agrees on (`md5("OfflinePlayer:" ‖ name)` as a version-3 UUID),
    /// so a player keeps their identity across restarts.
    pub fn offline(name: &str) -> Self {
        let mut bytes: [u8; 16] = md5::compute(format!("OfflinePlayer:{name}").as_bytes()).0;
        bytes[6] = (bytes[6] & 0x0F) | 0x30;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;

        Self {
            uuid: Uuid::from_bytes(bytes),
            name: name.to_owned(),
            textures: None,
        }
    }
}

/// Profile property as the session server tags it. Only `textures` is
/// meaningful here; everything else passes through as `Unknown` and is
/// dropped.
#[derive(Debug)]
enum ProfileProperty {
    Textures {
        value: String,
        signature: Option<String>,
    },
    Unknown,
}

#[derive(Deserialize)]
struct HasJoinedResponse {
    id: String,
    name: String,
    #[serde(default)]
    properties: Vec<RawProperty>,
}

#[derive(Deserialize)]
struct RawProperty {
    name: String,
    value: String,
    #[serde(default)]
    signature: Option<String>,
}

impl From<RawProperty> for ProfileProperty {
    fn from(raw: RawProperty) -> Self {
        match raw.name.as_str() {
            "textures" => ProfileProperty::Textures {
                value: raw.value,
                signature: raw.signature,
            },
            _ => ProfileProperty::Unknown,
        }
    }
}

impl TryFrom<HasJoinedResponse> for GameProfile {
    type Error = LoginError;

    fn try_from(response: HasJoinedResponse) -> Result<Self, Self::Error> {
        let uuid = Uuid::try_parse(&response.id)
            .map_err(|e| LoginError::MalformedAuth(format!("profile id: {e}")))?;

        let mut textures = None;
        for property in response.properties {
            if let ProfileProperty::Textures { value, signature } = property.into() {
                textures = Some(Textures {
                    value,
                    signature,
                });
            }
        }

        Ok(Self {
            uuid,
            name: response.name,
            textures,
        })
    }
}

/// The identity-verification seam of the login handler. Production uses
/// [`MojangSessionApi`]; tests inject a fake returning canned profiles.
pub trait SessionAuthenticator: Send + Sync {
    /// Asks whether `username` has posted a join for this server, where
    /// `server_id` is the Minecraft signed-hex session digest.
    fn has_joined(
        &self,
        username: &str,
        server_id: &str,
    ) -> impl Future<Output = Result<GameProfile, LoginError>> + Send;
}

/// `hasJoined` client against a Mojang-compatible session server.
///
/// Built eagerly at startup and shared by every connection; reqwest
/// pools connections internally, so no serialization is needed on top.
pub struct MojangSessionApi {
    base_url: String,
    client: Client,
}

impl MojangSessionApi {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(Policy::none())
            .local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .build()?;

        Ok(Self {
            base_url,
            client,
        })
    }
}

impl SessionAuthenticator for MojangSessionApi {
    fn has_joined(
        &self,
        username: &str,
        server_id: &str,
    ) -> impl Future<Output = Result<GameProfile, LoginError>> + Send {
        let request = self
            .client
            .get(format!("{}/session/minecraft/hasJoined", self.base_url))
            .query(&[("username", username), ("serverId", server_id)]);

        async move {
            let mut response = request
                .send()
                .await
                .map_err(|e| LoginError::AuthenticationUnreachable(e.to_string()))?;

            let status = response.status();
            if status != StatusCode::OK {
                // 204 is the session server's way of saying "never heard
                // of that join"
                return Err(LoginError::AuthenticationRefused(status.as_u16()));
            }

            if let Some(announced) = response.content_length() {
                if announced > MAX_RESPONSE_BYTES as u64 {
                    return Err(LoginError::MalformedAuth(format!(
                        "response body announces {announced} bytes"
                    )));
                }
            }

            // The cap bounds the read itself: accumulation stops the
            // moment a chunk would push past it, announced length or not
            let mut body = Vec::new();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| LoginError::AuthenticationUnreachable(e.to_string()))?
            {
                if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
                    return Err(LoginError::MalformedAuth(format!(
                        "response body exceeds {MAX_RESPONSE_BYTES} bytes"
                    )));
                }

                body.extend_from_slice(&chunk);
            }

            let response: HasJoinedResponse = serde_json::from_slice(&body)
                .map_err(|e| LoginError::MalformedAuth(e.to_string()))?;

            response.try_into()
        }
    }
}
