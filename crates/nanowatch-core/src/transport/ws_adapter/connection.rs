use tokio_tungstenite::tungstenite::http::Uri;

use crate::error::CoreError;

pub(super) fn parse_connection(connection: &str) -> Result<String, CoreError> {
    let parsed: Uri = connection.parse().map_err(|e| {
        CoreError::InvalidConfig(format!(
            "invalid connection `{connection}`: expected websocket URL ({e})"
        ))
    })?;
    match parsed.scheme_str() {
        Some("ws" | "wss") => {}
        Some(other) => {
            return Err(CoreError::InvalidConfig(format!(
                "unsupported connection scheme `{other}`; expected ws or wss"
            )));
        }
        None => {
            return Err(CoreError::InvalidConfig(format!(
                "connection `{connection}` has no scheme; expected ws:// or wss://"
            )));
        }
    }
    if parsed.host().map_or(true, str::is_empty) {
        return Err(CoreError::InvalidConfig(format!(
            "connection `{connection}` has no host"
        )));
    }
    Ok(connection.to_owned())
}
