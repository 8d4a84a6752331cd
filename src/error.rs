use alloy::transports::{self, TransportErrorKind};

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

/// Error returned by the explorer or the RPC client.
///
/// Cloneable so one failed upstream call can be handed to every caller
/// waiting on the same cached request.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    #[error("upstream returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("RPC method not supported: {0}")]
    MethodNotSupported(String),

    #[error("unexpected empty RPC response")]
    NullResp,

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// HTTP status the upstream answered with, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if let Some(status) = value.status() {
            Self::Http {
                status: status.as_u16(),
                message: value.to_string(),
            }
        } else if value.is_decode() {
            Self::Decode(value.to_string())
        } else if value.is_builder() {
            Self::InvalidRequest(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(value: url::ParseError) -> Self {
        Self::InvalidRequest(value.to_string())
    }
}

impl From<transports::TransportError> for ClientError {
    fn from(value: transports::TransportError) -> Self {
        match value {
            transports::RpcError::ErrorResp(ref resp) => {
                // Nodes disagree on codes for missing methods, some answer
                // -32000 with a "does not exist/is not available" message
                let msg = resp.message.to_ascii_lowercase();
                if resp.code == METHOD_NOT_FOUND
                    || (msg.contains("method")
                        && (msg.contains("not found")
                            || msg.contains("does not exist")
                            || msg.contains("not available")
                            || msg.contains("not supported")))
                {
                    Self::MethodNotSupported(resp.message.to_string())
                } else {
                    Self::Rpc {
                        code: resp.code,
                        message: resp.message.to_string(),
                    }
                }
            }
            transports::RpcError::NullResp => Self::NullResp,
            transports::RpcError::DeserError { ref err, .. } => Self::Decode(err.to_string()),
            transports::RpcError::Transport(TransportErrorKind::HttpError(ref http)) => {
                Self::Http {
                    status: http.status,
                    message: http.body.clone(),
                }
            }
            _ => Self::Transport(value.to_string()),
        }
    }
}
