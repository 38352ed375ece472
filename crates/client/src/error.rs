use std::fmt::{Display, Formatter};

/// Why an API call failed.
///
/// The `Display` form of each variant is exactly the string reported by
/// [`Client::last_error`](crate::Client::last_error).
#[derive(Debug)]
pub enum Error {
    /// The request never completed; the payload is the transport diagnostic.
    Transport(String),
    /// The server rejected the request with a 4xx or 5xx status.
    Api { code: u16, message: String },
    /// The server answered with a status the API does not use.
    UnexpectedStatus(u16),
    /// A success response carried a body that is not valid JSON.
    Decode {
        code: u16,
        source: serde_json::Error,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Transport(message) => f.write_str(message),
            Error::Api { message, .. } => f.write_str(message),
            Error::UnexpectedStatus(code) => write!(f, "Unknown HTTP response {code}"),
            Error::Decode { code, source } => {
                write!(f, "Malformed JSON in HTTP {code} response: {source}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Decode { source, .. } => Some(source),
            Error::Transport(_) | Error::Api { .. } | Error::UnexpectedStatus(_) => None,
        }
    }
}
