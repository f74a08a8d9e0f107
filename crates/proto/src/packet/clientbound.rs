use uuid::Uuid;

use crate::io::{RemainingBytes, VarInt};
use crate::packet::{packet, packet_mapping};

packet!(
    StatusResponse {
        json: String,
    }

    PingResponse {
        payload: i64,
    }
);

packet_mapping!(
    StatusMapping {
        0x00 = StatusResponse,
        0x01 = PingResponse
    }
);

packet!(
    LoginDisconnect {
        reason: String,
    }

    EncryptionRequest {
        server_id: String,
        public_key: Box<[u8]>,
        verify_token: Box<[u8]>,
    }

    LoginSuccess {
        uuid: Uuid,
        username: String,
    }

    SetCompression {
        threshold: VarInt,
    }

    LoginPluginRequest {
        message_id: VarInt,
        channel: String,
        data: RemainingBytes,
    }
);

packet_mapping!(
    LoginMapping {
        0x00 = LoginDisconnect,
        0x01 = EncryptionRequest,
        0x02 = LoginSuccess,
        0x03 = SetCompression,
        0x04 = LoginPluginRequest
    }
);
