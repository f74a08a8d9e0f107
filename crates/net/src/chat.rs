use serde_json::json;

/// Disconnect reasons ride in a single login packet and must stay small.
pub const DISCONNECT_REASON_MAX_BYTES: usize = 128;

/// Translatable chat component for a client running an older protocol.
pub fn outdated_client(server_version: &str) -> String {
    translation("multiplayer.disconnect.outdated_client", server_version)
}

/// Translatable chat component for a client running a newer protocol.
pub fn outdated_server(server_version: &str) -> String {
    translation("multiplayer.disconnect.outdated_server", server_version)
}

fn translation(key: &str, with: &str) -> String {
    let rendered = render(key, with);
    if rendered.len() <= DISCONNECT_REASON_MAX_BYTES {
        return rendered;
    }

    // Overlong parameters (the value comes from operator configuration)
    // are shed rather than the translation key. JSON escaping can only
    // grow a parameter, so dropping `overflow` parameter bytes shrinks
    // the document by at least as much.
    let overflow = rendered.len() - DISCONNECT_REASON_MAX_BYTES;
    let mut keep = with.len().saturating_sub(overflow);
    while keep > 0 && !with.is_char_boundary(keep) {
        keep -= 1;
    }

    render(key, &with[..keep])
}

fn render(key: &str, with: &str) -> String {
    json!({
        "translate": key,
        "with": [with],
    })
    .to_string()
}
