use std::fmt;

use crate::dns::record::RecordError;

#[allow(clippy::enum_variant_names)]
#[derive(Debug)]
pub enum Error {
    ProviderError {
        status_code: u16,
        code: String,
        help: String,
    },
    Transport(String),
    Timeout(String),
    InvalidRecord(RecordError),
    ZoneNotFound(String),
    CredentialError(String),
    Config(String),
    Other(String),
}

impl Error {
    /// Transport failures may succeed on a later attempt; provider rejections won't.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::ProviderError {
                status_code: 404,
                ..
            }
        )
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ProviderError {
                status_code,
                code,
                help,
            } => write!(
                f,
                "Encountered DomeneshopError during communication with API: {status_code} {code}. {help}"
            ),
            Error::Transport(msg) => write!(f, "Transport error: {msg}"),
            Error::Timeout(msg) => write!(f, "Request timed out: {msg}"),
            Error::InvalidRecord(err) => write!(f, "Invalid record: {err}"),
            Error::ZoneNotFound(domain) => write!(
                f,
                "Failed to find domain {domain} (Does your account have access to this domain?)"
            ),
            Error::CredentialError(msg) => write!(f, "Credential error: {msg}"),
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
            Error::Other(msg) => write!(f, "Other error: {msg}"),
        }
    }
}

impl From<RecordError> for Error {
    fn from(err: RecordError) -> Self {
        Error::InvalidRecord(err)
    }
}
