//! UTF-8 JSON message bodies.

use orderflow_domain::event::WireEvent;

pub const CONTENT_TYPE: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("message body is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("message body is not a valid {kind} event: {source}")]
    Json {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub fn encode<E: WireEvent>(event: &E) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(event)
}

pub fn decode<E: WireEvent>(body: &[u8]) -> Result<E, DecodeError> {
    let text = std::str::from_utf8(body)?;
    serde_json::from_str(text).map_err(|source| DecodeError::Json {
        kind: E::KIND,
        source,
    })
}
