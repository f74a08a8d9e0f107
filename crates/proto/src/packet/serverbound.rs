use crate::io::{RemainingBytes, VarInt};
use crate::packet::{packet, packet_mapping};

packet!(
    Handshake {
        protocol_version: VarInt,
        server_address: String,
        server_port: u16,
        next_state: VarInt,
    }
);

packet_mapping!(
    HandshakingMapping {
        0x00 = Handshake
    }
);

packet!(
    StatusRequest {}

    PingRequest {
        payload: i64,
    }
);

packet_mapping!(
    StatusMapping {
        0x00 = StatusRequest,
        0x01 = PingRequest
    }
);

packet!(
    LoginStart {
        name: String,
    }

    EncryptionResponse {
        shared_secret: Box<[u8]>,
        verify_token: Box<[u8]>,
    }

    LoginPluginResponse {
        message_id: VarInt,
        successful: bool,
        data: RemainingBytes,
    }
);

packet_mapping!(
    LoginMapping {
        0x00 = LoginStart,
        0x01 = EncryptionResponse,
        0x02 = LoginPluginResponse
    }
);
