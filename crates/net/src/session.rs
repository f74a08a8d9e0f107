use rand::random;
use uuid::Uuid;

use crate::error::LoginError;
use crate::key::{SharedSecret, VerifyToken};
use crate::mojang::GameProfile;

/// Where a connection currently stands in the login exchange.
///
/// The phase only ever moves forward; `Completed` and `Failed` are
/// terminal. The one detour is `AwaitingPluginResponse`, which returns
/// to the phase it was entered from once the matching response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingHello,
    AwaitingEncryptionResponse,
    AwaitingPluginResponse,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Per-connection login state. Owned by exactly one handler task; never
/// shared across threads.
pub struct LoginSession {
    phase: Phase,
    // Phase to restore once an outstanding plugin exchange resolves
    resume_phase: Option<Phase>,
    protocol_version: i32,
    claimed_username: Option<String>,
    verify_token: VerifyToken,
    shared_secret: Option<SharedSecret>,
    outstanding_plugin_request: Option<i32>,
    profile: Option<GameProfile>,
}

impl LoginSession {
    pub fn new(protocol_version: i32) -> Self {
        Self {
            phase: Phase::AwaitingHello,
            resume_phase: None,
            protocol_version,
            claimed_username: None,
            // Fresh random token per session; a token is used for exactly
            // one encryption exchange
            verify_token: random::<VerifyToken>(),
            shared_secret: None,
            outstanding_plugin_request: None,
            profile: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn protocol_version(&self) -> i32 {
        self.protocol_version
    }

    pub fn verify_token(&self) -> VerifyToken {
        self.verify_token
    }

    pub fn claimed_username(&self) -> Option<&str> {
        self.claimed_username.as_deref()
    }

    pub fn set_claimed_username(&mut self, username: String) {
        self.claimed_username = Some(username);
    }

    pub fn shared_secret(&self) -> Option<&SharedSecret> {
        self.shared_secret.as_ref()
    }

    /// Identity populated at completion. `None` until then.
    pub fn profile(&self) -> Option<&GameProfile> {
        self.profile.as_ref()
    }

    pub fn uuid(&self) -> Option<Uuid> {
        self.profile.as_ref().map(|p| p.uuid)
    }

    pub fn username(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.name.as_str())
    }

    pub fn advance(&mut self, next: Phase) -> Result<(), LoginError> {
        if self.phase.is_terminal() {
            return Err(LoginError::Internal(format!(
                "attempted transition out of terminal phase {:?}",
                self.phase
            )));
        }

        self.phase = next;

        Ok(())
    }

    /// Stores the negotiated secret. Setting it is monotonic: a second
    /// encryption response on the same session is a protocol violation.
    pub fn install_shared_secret(&mut self, secret: SharedSecret) -> Result<(), LoginError> {
        if self.shared_secret.is_some() {
            return Err(LoginError::MalformedPacket(
                "shared secret negotiated twice".to_owned(),
            ));
        }

        self.shared_secret = Some(secret);

        Ok(())
    }

    pub fn complete(&mut self, profile: GameProfile) -> Result<(), LoginError> {
        self.advance(Phase::Completed)?;
        self.profile = Some(profile);

        Ok(())
    }

    /// Terminal failure: wipes the secret material before the session
    /// lingers in logs or drops.
    pub fn fail(&mut self) {
        if let Some(secret) = self.shared_secret.as_mut() {
            secret.fill(0);
        }
        self.shared_secret = None;
        self.phase = Phase::Failed;
    }

    /// Registers an outbound plugin request and parks the session until
    /// the matching response arrives.
    pub fn issue_plugin_request(&mut self, message_id: i32) -> Result<(), LoginError> {
        if self.outstanding_plugin_request.is_some() {
            return Err(LoginError::Internal(
                "plugin request already outstanding".to_owned(),
            ));
        }

        self.resume_phase = Some(self.phase);
        self.outstanding_plugin_request = Some(message_id);
        self.advance(Phase::AwaitingPluginResponse)
    }

    /// Validates an inbound plugin response. Legal only while a request
    /// is outstanding and only with the matching message id; restores
    /// the pre-request phase on success.
    pub fn accept_plugin_response(&mut self, message_id: i32) -> Result<(), LoginError> {
        let Some(expected) = self.outstanding_plugin_request else {
            return Err(LoginError::MalformedPacket(
                "plugin response without an outstanding request".to_owned(),
            ));
        };

        if message_id != expected {
            return Err(LoginError::MalformedPacket(format!(
                "plugin response for message {message_id}, expected {expected}"
            )));
        }

        self.outstanding_plugin_request = None;
        let resume = self.resume_phase.take().ok_or_else(|| {
            LoginError::Internal("no phase to resume after plugin response".to_owned())
        })?;
        self.advance(resume)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::error::LoginError;
    use crate::mojang::GameProfile;

    use super::{LoginSession, Phase};

    fn profile() -> GameProfile {
        GameProfile {
            uuid: Uuid::parse_str("069a79f444e94726a5befca90e38aaf5").unwrap(),
            name: "Notch".to_owned(),
            textures: None,
        }
    }

    #[test]
    fn fresh_session_awaits_hello() {
        let session = LoginSession::new(762);

        assert_eq!(session.phase(), Phase::AwaitingHello);
        assert!(session.shared_secret().is_none());
        assert!(session.profile().is_none());
    }

    #[test]
    fn verify_tokens_differ_between_sessions() {
        // Four random bytes collide vanishingly rarely across a handful
        // of sessions; equality across all of them means no randomness
        let tokens: Vec<_> = (0..8).map(|_| LoginSession::new(762).verify_token()).collect();
        assert!(tokens.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn completed_is_terminal() {
        let mut session = LoginSession::new(762);
        session.complete(profile()).unwrap();

        assert_eq!(session.phase(), Phase::Completed);
        assert!(matches!(
            session.advance(Phase::AwaitingHello),
            Err(LoginError::Internal(_))
        ));
    }

    #[test]
    fn failed_is_terminal_and_clears_secret() {
        let mut session = LoginSession::new(762);
        session.install_shared_secret([0xAB; 16]).unwrap();
        session.fail();

        assert_eq!(session.phase(), Phase::Failed);
        assert!(session.shared_secret().is_none());
        assert!(session.advance(Phase::Completed).is_err());
    }

    #[test]
    fn shared_secret_is_set_at_most_once() {
        let mut session = LoginSession::new(762);

        session.install_shared_secret([0x01; 16]).unwrap();
        assert!(matches!(
            session.install_shared_secret([0x02; 16]),
            Err(LoginError::MalformedPacket(_))
        ));
    }

    #[test]
    fn plugin_response_without_request_is_a_violation() {
        let mut session = LoginSession::new(762);

        assert!(matches!(
            session.accept_plugin_response(7),
            Err(LoginError::MalformedPacket(_))
        ));
    }

    #[test]
    fn plugin_exchange_resumes_prior_phase() {
        let mut session = LoginSession::new(762);
        session.advance(Phase::AwaitingEncryptionResponse).unwrap();

        session.issue_plugin_request(3).unwrap();
        assert_eq!(session.phase(), Phase::AwaitingPluginResponse);

        session.accept_plugin_response(3).unwrap();
        assert_eq!(session.phase(), Phase::AwaitingEncryptionResponse);
    }

    #[test]
    fn plugin_response_with_wrong_id_fails() {
        let mut session = LoginSession::new(762);
        session.issue_plugin_request(3).unwrap();

        assert!(matches!(
            session.accept_plugin_response(4),
            Err(LoginError::MalformedPacket(_))
        ));
    }
}
