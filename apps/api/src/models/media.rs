//! Inline media carried as a data URI (`data:<mimetype>;base64,<payload>`).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUriError {
    #[error("must start with 'data:'")]
    MissingScheme,
    #[error("missing ',' between header and payload")]
    MissingPayloadSeparator,
    #[error("only base64 encoded data URIs are supported")]
    NotBase64,
    #[error("'{0}' is not a MIME type")]
    InvalidMimeType(String),
    #[error("payload is empty")]
    EmptyPayload,
    #[error("payload is not valid base64")]
    InvalidPayload,
}

/// A syntactically valid base64 data URI, split into its MIME type and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    payload: String,
}

impl DataUri {
    pub fn parse(raw: &str) -> Result<Self, DataUriError> {
        let rest = raw.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or(DataUriError::MissingPayloadSeparator)?;

        // MediaRecorder emits parameters, e.g. `audio/webm;codecs=opus;base64`
        let params = header.strip_suffix(";base64").ok_or(DataUriError::NotBase64)?;
        let mime_type = params.split(';').next().unwrap_or_default();
        if !is_mime_type(mime_type) {
            return Err(DataUriError::InvalidMimeType(mime_type.to_string()));
        }

        if payload.is_empty() {
            return Err(DataUriError::EmptyPayload);
        }
        // Decoded only to validate; the model receives the payload as supplied.
        if BASE64.decode(payload).is_err() {
            return Err(DataUriError::InvalidPayload);
        }

        Ok(Self {
            mime_type: mime_type.to_ascii_lowercase(),
            payload: payload.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The base64 payload, exactly as supplied.
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

fn is_mime_type(s: &str) -> bool {
    let Some((kind, subtype)) = s.split_once('/') else {
        return false;
    };
    let token = |t: &str| {
        !t.is_empty()
            && t.chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    };
    token(kind) && token(subtype)
}
