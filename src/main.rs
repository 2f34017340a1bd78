use auth::credentials::{
    CredentialManager, EnvCredentialManager, FileCredentialManager, load_credentials,
};
use authenticator::{Authenticator, Challenge};
use config::{Config, CredentialSource};
use error::Error;
use log::{error, info, warn};
use providers::domeneshop::{DomeneshopProvider, error::map_error};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

mod auth;
mod authenticator;
mod config;
mod dns;
mod error;
mod providers;

/// Which certbot manual hook this invocation serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    Auth,
    Cleanup,
}

impl FromStr for Hook {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth" => Ok(Hook::Auth),
            "cleanup" => Ok(Hook::Cleanup),
            other => Err(Error::Config(format!(
                "unknown hook {other:?}, expected `auth` or `cleanup`"
            ))),
        }
    }
}

async fn credential_manager(config: &Config) -> Result<Box<dyn CredentialManager>, Error> {
    Ok(match &config.credential_source {
        CredentialSource::Env => Box::new(EnvCredentialManager::default()),
        CredentialSource::File(path) => Box::new(FileCredentialManager::load(path).await?),
    })
}

async fn run(hook: Hook) -> Result<(), Error> {
    let config = Config::from_env()?;
    let challenge = Challenge::from_env()?;
    let credentials = load_credentials(credential_manager(&config).await?.as_ref()).await?;
    let provider = DomeneshopProvider::new(config.domeneshop(), credentials).map_err(map_error)?;
    let authenticator = Authenticator::new(provider, &config);

    match hook {
        Hook::Auth => {
            authenticator
                .perform(std::slice::from_ref(&challenge))
                .await?;
        }
        Hook::Cleanup => {
            let reports = authenticator
                .cleanup_all(std::slice::from_ref(&challenge))
                .await;
            for report in reports.iter().filter(|r| !r.is_clean()) {
                warn!(
                    "Cleanup of {} incomplete: {} of {} matching records deleted",
                    challenge.validation_name,
                    report.deleted.len(),
                    report.matched
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let hook = match env::args().nth(1).as_deref().map(Hook::from_str) {
        Some(Ok(hook)) => hook,
        Some(Err(e)) => {
            error!("{e}");
            return ExitCode::from(2);
        }
        None => {
            error!("usage: domeneshop-dns01 <auth|cleanup>");
            return ExitCode::from(2);
        }
    };

    match run(hook).await {
        Ok(()) => {
            info!("{hook:?} hook finished");
            ExitCode::SUCCESS
        }
        // A failed cleanup leaves a stray TXT record; it must not fail the renewal
        Err(e) if hook == Hook::Cleanup => {
            warn!("Cleanup skipped: {e}");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_retryable() => {
            error!("{e} (transient, try again later)");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
