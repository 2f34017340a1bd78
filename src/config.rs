use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;
use crate::providers::domeneshop::{DOMENESHOP_API_BASE, DomeneshopConfig};

pub const DEFAULT_CREDENTIALS_FILE: &str = "/etc/letsencrypt/domeneshop.ini";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Env,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub ttl: u32,
    pub propagation: Duration,
    pub request_timeout: Duration,
    pub credential_source: CredentialSource,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let credential_source = match lookup("DOMENESHOP_CREDENTIALS").as_deref() {
            None | Some("file") => CredentialSource::File(
                lookup("DOMENESHOP_CREDENTIALS_FILE")
                    .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string())
                    .into(),
            ),
            Some("env") => CredentialSource::Env,
            Some(other) => {
                return Err(Error::Config(format!(
                    "DOMENESHOP_CREDENTIALS must be `file` or `env`, got {other:?}"
                )));
            }
        };

        Ok(Config {
            api_url: lookup("DOMENESHOP_API_URL").unwrap_or(defaults.api_url),
            ttl: parse_var(&lookup, "DOMENESHOP_TTL", defaults.ttl)?,
            propagation: Duration::from_secs(parse_var(
                &lookup,
                "DOMENESHOP_PROPAGATION_SECONDS",
                defaults.propagation.as_secs(),
            )?),
            request_timeout: Duration::from_secs(parse_var(
                &lookup,
                "DOMENESHOP_REQUEST_TIMEOUT",
                defaults.request_timeout.as_secs(),
            )?),
            credential_source,
        })
    }

    pub fn domeneshop(&self) -> DomeneshopConfig {
        DomeneshopConfig {
            api_url: self.api_url.clone(),
            timeout: self.request_timeout,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} is not a valid number: {raw:?}"))),
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DOMENESHOP_API_BASE.to_string(),
            ttl: 60,
            propagation: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            credential_source: CredentialSource::File(DEFAULT_CREDENTIALS_FILE.into()),
        }
    }
}
