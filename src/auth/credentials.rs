use crate::error::Error;
use async_trait::async_trait;
use ini::Ini;
use log::warn;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

pub const HELP_URL: &str = "https://api.domeneshop.no/docs";

pub const CLIENT_TOKEN_KEY: &str = "domeneshop_client_token";
pub const CLIENT_SECRET_KEY: &str = "domeneshop_client_secret";

#[async_trait]
pub trait CredentialManager: Send + Sync {
    async fn get(&self, key: &str) -> Result<String, Error>;
}

/// Token/secret pair sent as HTTP Basic auth on every API call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token)
            .field("secret", &"********")
            .finish()
    }
}

pub async fn load_credentials(manager: &dyn CredentialManager) -> Result<Credentials, Error> {
    let token = manager.get(CLIENT_TOKEN_KEY).await?;
    let secret = manager.get(CLIENT_SECRET_KEY).await?;
    if token.is_empty() || secret.is_empty() {
        return Err(Error::CredentialError(format!(
            "Client token and client secret must not be empty, see {HELP_URL}"
        )));
    }
    Ok(Credentials { token, secret })
}

fn describe(key: &str) -> Result<&'static str, Error> {
    match key {
        CLIENT_TOKEN_KEY => Ok("Client token for Domeneshop API"),
        CLIENT_SECRET_KEY => Ok("Client secret for Domeneshop API"),
        _ => Err(Error::CredentialError(format!("Unknown key: {key}"))),
    }
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads `DOMENESHOP_CLIENT_TOKEN` and `DOMENESHOP_CLIENT_SECRET`.
pub struct EnvCredentialManager {
    lookup: Lookup,
}

impl EnvCredentialManager {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn variable(key: &str) -> Option<&'static str> {
        match key {
            CLIENT_TOKEN_KEY => Some("DOMENESHOP_CLIENT_TOKEN"),
            CLIENT_SECRET_KEY => Some("DOMENESHOP_CLIENT_SECRET"),
            _ => None,
        }
    }
}

impl Default for EnvCredentialManager {
    fn default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }
}

#[async_trait]
impl CredentialManager for EnvCredentialManager {
    async fn get(&self, key: &str) -> Result<String, Error> {
        let description = describe(key)?;
        let variable = Self::variable(key)
            .ok_or_else(|| Error::CredentialError(format!("Unknown key: {key}")))?;
        (self.lookup)(variable).ok_or_else(|| {
            Error::CredentialError(format!("{variable} is not set ({description}, see {HELP_URL})"))
        })
    }
}

/// Certbot-style credentials INI file:
///
/// ```ini
/// dns_domeneshop_client_token = <token>
/// dns_domeneshop_client_secret = <secret>
/// ```
pub struct FileCredentialManager {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FileCredentialManager {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::CredentialError(format!("Cannot read credentials file {}: {e}", path.display()))
        })?;
        #[cfg(unix)]
        warn_if_readable_by_others(&path).await;

        let values = parse_properties(&contents).map_err(|e| {
            Error::CredentialError(format!("Invalid credentials file {}: {e}", path.display()))
        })?;
        Ok(Self { path, values })
    }
}

#[async_trait]
impl CredentialManager for FileCredentialManager {
    async fn get(&self, key: &str) -> Result<String, Error> {
        let description = describe(key)?;
        let property = format!("dns_{key}");
        self.values.get(&property).cloned().ok_or_else(|| {
            Error::CredentialError(format!(
                "Missing property in credentials file {}: {property} ({description}, see {HELP_URL})",
                self.path.display()
            ))
        })
    }
}

/// Top-level `key = value` pairs; `-` in keys is read as `_`.
fn parse_properties(contents: &str) -> Result<HashMap<String, String>, ini::ParseError> {
    let ini = Ini::load_from_str(contents)?;
    Ok(ini
        .section(None::<String>)
        .into_iter()
        .flat_map(|properties| properties.iter())
        .map(|(key, value)| (key.trim().replace('-', "_"), value.trim().to_string()))
        .collect())
}

#[cfg(unix)]
async fn warn_if_readable_by_others(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = tokio::fs::metadata(path).await {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!("Unsafe permissions on credentials file {}: {mode:o}", path.display());
        }
    }
}
