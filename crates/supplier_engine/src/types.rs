use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupError {
    pub kind: LookupFailure,
    pub message: String,
}

impl LookupError {
    pub(crate) fn new(kind: LookupFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for LookupError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// The HTTP client could not be constructed.
    Client,
    Network,
    Timeout,
    HttpStatus(u16),
    TooLarge { max_bytes: u64, actual: Option<u64> },
    /// Body was not the expected JSON envelope array.
    Parse,
}

impl LookupFailure {
    /// Transport-level failures, as opposed to a reply we could not understand.
    pub fn is_transport(&self) -> bool {
        matches!(self, LookupFailure::Network | LookupFailure::Timeout)
    }
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::Client => write!(f, "http client error"),
            LookupFailure::Network => write!(f, "network error"),
            LookupFailure::Timeout => write!(f, "timeout"),
            LookupFailure::HttpStatus(code) => write!(f, "http status {code}"),
            LookupFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            LookupFailure::Parse => write!(f, "unexpected response format"),
        }
    }
}
