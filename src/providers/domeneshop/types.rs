use serde::Deserialize;

use crate::dns::zone::Zone;

/// Entry of `GET /domains`.
#[derive(Deserialize, Debug, Clone)]
pub struct DomeneshopDomain {
    pub id: u64,
    pub domain: String,
}

/// Body of a non-2xx response.
#[derive(Deserialize, Debug, Default)]
pub struct DomeneshopErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub help: Option<String>,
}

pub const UNKNOWN_ERROR_CODE: &str = "unknown";
pub const UNKNOWN_ERROR_HELP: &str = "A server error occurred.";

impl DomeneshopErrorBody {
    /// Reads an error body, falling back to a generic server error when the
    /// payload is not JSON.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    pub fn code(&self) -> &str {
        self.code.as_deref().unwrap_or(UNKNOWN_ERROR_CODE)
    }

    pub fn help(&self) -> &str {
        self.help.as_deref().unwrap_or(UNKNOWN_ERROR_HELP)
    }
}

pub fn to_zone(domain: &DomeneshopDomain) -> Zone {
    Zone {
        id: domain.id,
        name: domain.domain.clone(),
    }
}
