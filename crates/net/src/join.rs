use std::fmt::{Debug, Formatter};

use uuid::Uuid;

use crate::conn::Connection;
use crate::io::{Reader, Writer};
use crate::mojang::{GameProfile, Textures};

/// Hands a freshly authenticated connection over to the play phase. The
/// identity fields settled during login live here from now on; the
/// login session itself is gone.
pub struct JoinContext<'a, R, W> {
    pub profile: GameProfile,
    pub conn: &'a Connection,
    pub reader: &'a mut Reader<R>,
    pub writer: &'a mut Writer<W>,
}

impl<'a, R, W> JoinContext<'a, R, W> {
    pub fn new(
        profile: GameProfile,
        conn: &'a Connection,
        reader: &'a mut Reader<R>,
        writer: &'a mut Writer<W>,
    ) -> Self {
        Self {
            profile,
            conn,
            reader,
            writer,
        }
    }

    pub fn to_client(&self) -> Client {
        Client::new(self.profile.clone())
    }
}

/// Host-facing record of a joined player.
pub struct Client {
    pub name: String,
    pub uuid: Uuid,
    pub textures: Option<Textures>,
}

impl Client {
    pub fn new(profile: GameProfile) -> Self {
        Self {
            name: profile.name,
            uuid: profile.uuid,
            textures: profile.textures,
        }
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Client {{name: {}, uuid: {}}}", self.name, self.uuid)
    }
}
