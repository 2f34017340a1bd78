use crate::dns::record::RecordError;
use crate::providers::domeneshop::types::DomeneshopErrorBody;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomeneshopProviderError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(reqwest::Error),

    #[error("{status_code} {code}. {help}")]
    Api {
        status_code: u16,
        code: String,
        help: String,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("Create response did not include a Location header")]
    MissingLocation,

    #[error("Cannot read record id from Location header {0:?}")]
    InvalidLocation(String),

    #[error("Cannot decode response body: {0}")]
    Decode(String),
}

impl DomeneshopProviderError {
    pub fn api(status_code: u16, body: &DomeneshopErrorBody) -> Self {
        DomeneshopProviderError::Api {
            status_code,
            code: body.code().to_string(),
            help: body.help().to_string(),
        }
    }
}

impl From<reqwest::Error> for DomeneshopProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DomeneshopProviderError::Timeout(err)
        } else if err.is_decode() {
            DomeneshopProviderError::Decode(err.to_string())
        } else {
            DomeneshopProviderError::Http(err)
        }
    }
}

use crate::error::Error;

pub fn map_error(e: DomeneshopProviderError) -> Error {
    use DomeneshopProviderError::*;
    match e {
        Http(err) => Error::Transport(err.to_string()),
        Timeout(err) => Error::Timeout(err.to_string()),
        Api {
            status_code,
            code,
            help,
        } => Error::ProviderError {
            status_code,
            code,
            help,
        },
        InvalidRecord(err) => Error::InvalidRecord(err),
        MissingLocation => Error::Other(MissingLocation.to_string()),
        InvalidLocation(location) => Error::Other(InvalidLocation(location).to_string()),
        Decode(msg) => Error::Other(format!("Cannot decode response body: {msg}")),
    }
}
