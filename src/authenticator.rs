//! DNS-01 challenge fulfillment: publish the validation TXT record before the
//! CA checks it and remove it afterwards.

use log::{error, info, warn};
use std::env;
use std::time::Duration;

use crate::config::Config;
use crate::dns::provider::DomainApi;
use crate::dns::record::{DnsRecord, RecordFilter};
use crate::dns::zone::{relative_host, resolve_zone};
use crate::error::Error;

pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// One pending challenge as handed over by the ACME client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub domain: String,
    pub validation_name: String,
    pub validation: String,
}

impl Challenge {
    pub fn new(domain: &str, validation: &str) -> Self {
        // Wildcard names validate on the base domain
        let domain = domain.trim_end_matches('.').to_ascii_lowercase();
        let domain = domain.strip_prefix("*.").unwrap_or(&domain);
        Self {
            domain: domain.to_string(),
            validation_name: format!("{ACME_CHALLENGE_LABEL}.{domain}"),
            validation: validation.to_string(),
        }
    }

    /// Reads `CERTBOT_DOMAIN` and `CERTBOT_VALIDATION` as set for manual hooks.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{key} is not set")))
        };
        Ok(Self::new(
            &required("CERTBOT_DOMAIN")?,
            &required("CERTBOT_VALIDATION")?,
        ))
    }
}

/// Outcome of a best-effort cleanup.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub matched: usize,
    pub deleted: Vec<u64>,
    pub failed: Vec<(u64, Error)>,
    /// Set when the zone or its records could not be fetched.
    pub aborted: Option<Error>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_none()
    }
}

pub struct Authenticator<A: DomainApi> {
    api: A,
    ttl: u32,
    propagation: Duration,
}

impl<A: DomainApi> Authenticator<A> {
    pub fn new(api: A, config: &Config) -> Self {
        Self {
            api,
            ttl: config.ttl,
            propagation: config.propagation,
        }
    }

    /// Creates the validation TXT record and returns its id.
    pub async fn present(&self, challenge: &Challenge) -> Result<u64, Error> {
        let zone = resolve_zone(&self.api, &challenge.domain)
            .await
            .inspect_err(|e| error!("Cannot present challenge for {}: {e}", challenge.domain))?;

        let host = relative_host(&challenge.validation_name, &zone.name);
        let record = DnsRecord::txt(&host, &challenge.validation, self.ttl);

        match self.api.create_record(zone.id, &record).await {
            Ok(record_id) => {
                info!(
                    "Created TXT record {} (id {record_id}) in zone {}",
                    challenge.validation_name, zone.name
                );
                Ok(record_id)
            }
            Err(e) => {
                error!(
                    "Encountered error while creating TXT record {host:?} in {}: {e}",
                    zone.name
                );
                Err(e)
            }
        }
    }

    /// Removes every TXT record matching the challenge. Never fails; problems
    /// are logged and collected in the report.
    pub async fn cleanup(&self, challenge: &Challenge) -> CleanupReport {
        let mut report = CleanupReport::default();

        let zone = match resolve_zone(&self.api, &challenge.domain).await {
            Ok(zone) => zone,
            Err(e) => {
                warn!("Error occurred while determining domain ID for deletion: {e}");
                report.aborted = Some(e);
                return report;
            }
        };

        let host = relative_host(&challenge.validation_name, &zone.name);
        let filter = RecordFilter::txt(&host, &challenge.validation);

        let records = match self.api.list_records(zone.id).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Error occurred while listing DNS records of {}: {e}", zone.name);
                report.aborted = Some(e);
                return report;
            }
        };

        for record in records.iter().filter(|r| filter.matches(r)) {
            report.matched += 1;
            let Some(record_id) = record.id else {
                warn!("Skipping matching TXT record {host:?} without an id");
                continue;
            };
            match self.api.delete_record(zone.id, record_id).await {
                Ok(()) => {
                    info!("Deleted TXT record {} (id {record_id})", challenge.validation_name);
                    report.deleted.push(record_id);
                }
                // Removed concurrently, e.g. by an earlier cleanup run
                Err(e) if e.is_not_found() => {
                    info!("TXT record {record_id} already deleted");
                    report.deleted.push(record_id);
                }
                Err(e) => {
                    warn!("Error occurred while deleting DNS record {record_id}: {e}");
                    report.failed.push((record_id, e));
                }
            }
        }

        if report.matched == 0 {
            info!("No TXT record left for {}", challenge.validation_name);
        }
        report
    }

    /// Presents all challenges, then waits once for the records to propagate.
    pub async fn perform(&self, challenges: &[Challenge]) -> Result<Vec<u64>, Error> {
        let mut record_ids = Vec::with_capacity(challenges.len());
        for challenge in challenges {
            record_ids.push(self.present(challenge).await?);
        }

        if !self.propagation.is_zero() {
            info!(
                "Waiting {} seconds for DNS changes to propagate",
                self.propagation.as_secs()
            );
            tokio::time::sleep(self.propagation).await;
        }
        Ok(record_ids)
    }

    pub async fn cleanup_all(&self, challenges: &[Challenge]) -> Vec<CleanupReport> {
        let mut reports = Vec::with_capacity(challenges.len());
        for challenge in challenges {
            reports.push(self.cleanup(challenge).await);
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::provider::MockDomainApi;
    use crate::dns::provider::mock::InMemoryDomainApi;
    use crate::dns::record::RecordType;
    use crate::dns::zone::Zone;
    use assert_matches::assert_matches;
    use mockall::predicate::*;
    use std::collections::HashMap;

    fn zone(id: u64, name: &str) -> Zone {
        Zone {
            id,
            name: name.to_string(),
        }
    }

    fn config() -> Config {
        Config {
            propagation: Duration::ZERO,
            ..Config::default()
        }
    }

    fn api_error(status_code: u16) -> Error {
        Error::ProviderError {
            status_code,
            code: "unknown".to_string(),
            help: "A server error occurred.".to_string(),
        }
    }

    #[test]
    fn test_challenge_new() {
        let challenge = Challenge::new("sub.example.com.", "XYZ123");
        assert_eq!(challenge.domain, "sub.example.com");
        assert_eq!(challenge.validation_name, "_acme-challenge.sub.example.com");
        assert_eq!(challenge.validation, "XYZ123");

        let wildcard = Challenge::new("*.example.com", "XYZ123");
        assert_eq!(wildcard.domain, "example.com");
        assert_eq!(wildcard.validation_name, "_acme-challenge.example.com");

        let mixed = Challenge::new("WWW.Example.COM", "AbC-123_x");
        assert_eq!(mixed.domain, "www.example.com");
        assert_eq!(mixed.validation_name, "_acme-challenge.www.example.com");
        assert_eq!(mixed.validation, "AbC-123_x");
    }

    #[tokio::test]
    async fn test_mixed_case_domain_is_cleaned_up() {
        let api = InMemoryDomainApi::new(vec![zone(1, "example.com")]);
        let authenticator = Authenticator::new(api, &config());

        let record_id = authenticator
            .present(&Challenge::new("WWW.Example.com", "XYZ123"))
            .await
            .unwrap();
        let records = authenticator.api.records_in(1);
        assert_eq!(records[0].host, "_acme-challenge.www");

        let report = authenticator
            .cleanup(&Challenge::new("www.example.com", "XYZ123"))
            .await;
        assert_eq!(report.deleted, vec![record_id]);
        assert!(authenticator.api.records_in(1).is_empty());
    }

    #[test]
    fn test_challenge_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CERTBOT_DOMAIN", "example.com"),
            ("CERTBOT_VALIDATION", "XYZ123"),
        ]
        .into_iter()
        .collect();
        let challenge =
            Challenge::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(challenge, Challenge::new("example.com", "XYZ123"));

        assert_matches!(
            Challenge::from_lookup(
                |key| (key == "CERTBOT_DOMAIN").then(|| "example.com".to_string())
            ),
            Err(Error::Config(msg)) if msg.contains("CERTBOT_VALIDATION")
        );
    }

    #[tokio::test]
    async fn test_present_and_cleanup_end_to_end() {
        let api = InMemoryDomainApi::new(vec![zone(1, "example.com")]);
        let authenticator = Authenticator::new(api, &config());
        let challenge = Challenge::new("example.com", "XYZ123");

        let record_id = authenticator.present(&challenge).await.unwrap();
        let records = authenticator.api.records_in(1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, Some(record_id));
        assert_eq!(records[0].record_type, "TXT");
        assert_eq!(records[0].host, "_acme-challenge");
        assert_eq!(records[0].data, "XYZ123");
        assert_eq!(records[0].ttl, 60);

        let report = authenticator.cleanup(&challenge).await;
        assert!(report.is_clean());
        assert_eq!(report.matched, 1);
        assert_eq!(report.deleted, vec![record_id]);
        assert!(authenticator.api.records_in(1).is_empty());
    }

    #[tokio::test]
    async fn test_present_subdomain_uses_registered_zone() {
        let api = InMemoryDomainApi::new(vec![zone(1, "example.org"), zone(2, "example.com")]);
        let config = Config {
            ttl: 300,
            ..config()
        };
        let authenticator = Authenticator::new(api, &config);

        authenticator
            .present(&Challenge::new("a.b.example.com", "token"))
            .await
            .unwrap();
        let records = authenticator.api.records_in(2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].host, "_acme-challenge.a.b");
        assert_eq!(records[0].ttl, 300);
        assert!(authenticator.api.records_in(1).is_empty());
    }

    #[tokio::test]
    async fn test_present_zone_not_found() {
        let mut api = MockDomainApi::new();
        api.expect_list_zones()
            .times(1)
            .returning(|| Ok(vec![zone(1, "example.org")]));
        api.expect_create_record().never();

        let authenticator = Authenticator::new(api, &config());
        let result = authenticator
            .present(&Challenge::new("example.com", "XYZ123"))
            .await;
        assert_matches!(result, Err(Error::ZoneNotFound(domain)) if domain == "example.com");
    }

    #[tokio::test]
    async fn test_present_propagates_provider_error() {
        let mut api = MockDomainApi::new();
        api.expect_list_zones()
            .returning(|| Ok(vec![zone(1, "example.com")]));
        api.expect_create_record()
            .with(eq(1), always())
            .times(1)
            .returning(|_, _| {
                Err(Error::ProviderError {
                    status_code: 400,
                    code: "dns:invalidData".to_string(),
                    help: "Data is not valid".to_string(),
                })
            });

        let authenticator = Authenticator::new(api, &config());
        let err = authenticator
            .present(&Challenge::new("example.com", "XYZ123"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dns:invalidData"));
        assert!(err.to_string().contains("Data is not valid"));
    }

    #[tokio::test]
    async fn test_present_sends_txt_record() {
        let mut api = MockDomainApi::new();
        api.expect_list_zones()
            .returning(|| Ok(vec![zone(7, "example.com")]));
        api.expect_create_record()
            .withf(|zone_id, record| {
                *zone_id == 7
                    && *record
                        == DnsRecord::new(RecordType::TXT, "_acme-challenge.www", "abc", 60)
            })
            .times(1)
            .returning(|_, _| Ok(99));

        let authenticator = Authenticator::new(api, &config());
        let id = authenticator
            .present(&Challenge::new("www.example.com", "abc"))
            .await
            .unwrap();
        assert_eq!(id, 99);
    }

    #[tokio::test]
    async fn test_cleanup_twice_is_idempotent() {
        let api = InMemoryDomainApi::new(vec![zone(1, "example.com")]);
        let authenticator = Authenticator::new(api, &config());
        let challenge = Challenge::new("example.com", "XYZ123");
        authenticator.present(&challenge).await.unwrap();

        let first = authenticator.cleanup(&challenge).await;
        assert_eq!(first.deleted.len(), 1);

        let second = authenticator.cleanup(&challenge).await;
        assert!(second.is_clean());
        assert_eq!(second.matched, 0);
        assert!(second.deleted.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_only_touches_matching_records() {
        let api = InMemoryDomainApi::new(vec![zone(1, "example.com")]);
        api.insert(1, DnsRecord::txt("_acme-challenge", "other-token", 60));
        api.insert(1, DnsRecord::txt("www", "XYZ123", 60));
        api.insert(
            1,
            DnsRecord::new(RecordType::CNAME, "_acme-challenge", "XYZ123", 60),
        );
        let drifted = api.insert(1, DnsRecord::txt("_acme-challenge", "XYZ123", 3600));

        let authenticator = Authenticator::new(api, &config());
        let report = authenticator
            .cleanup(&Challenge::new("example.com", "XYZ123"))
            .await;
        assert_eq!(report.deleted, vec![drifted]);
        assert_eq!(authenticator.api.records_in(1).len(), 3);
    }

    #[tokio::test]
    async fn test_cleanup_continues_after_failed_delete() {
        let mut api = InMemoryDomainApi::new(vec![zone(1, "example.com")]);
        let first = api.insert(1, DnsRecord::txt("_acme-challenge", "XYZ123", 60));
        let second = api.insert(1, DnsRecord::txt("_acme-challenge", "XYZ123", 60));
        api.failing_deletes.insert(first);

        let authenticator = Authenticator::new(api, &config());
        let report = authenticator
            .cleanup(&Challenge::new("example.com", "XYZ123"))
            .await;

        assert_eq!(report.matched, 2);
        assert_eq!(report.deleted, vec![second]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, first);
        assert_matches!(
            report.failed[0].1,
            Error::ProviderError { status_code: 500, .. }
        );
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_cleanup_attempts_every_match() {
        let mut api = MockDomainApi::new();
        api.expect_list_zones()
            .returning(|| Ok(vec![zone(1, "example.com")]));
        api.expect_list_records().with(eq(1)).returning(|_| {
            Ok(vec![
                DnsRecord {
                    id: Some(10),
                    ..DnsRecord::txt("_acme-challenge", "XYZ123", 60)
                },
                DnsRecord {
                    id: Some(11),
                    ..DnsRecord::txt("_acme-challenge", "XYZ123", 60)
                },
            ])
        });
        api.expect_delete_record()
            .with(eq(1), eq(10))
            .times(1)
            .returning(|_, _| Err(Error::Transport("connection reset".into())));
        api.expect_delete_record()
            .with(eq(1), eq(11))
            .times(1)
            .returning(|_, _| Ok(()));

        let authenticator = Authenticator::new(api, &config());
        let report = authenticator
            .cleanup(&Challenge::new("example.com", "XYZ123"))
            .await;
        assert_eq!(report.deleted, vec![11]);
        assert_matches!(report.failed.as_slice(), [(10, Error::Transport(_))]);
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_already_deleted_record() {
        let mut api = MockDomainApi::new();
        api.expect_list_zones()
            .returning(|| Ok(vec![zone(1, "example.com")]));
        api.expect_list_records().with(eq(1)).returning(|_| {
            Ok(vec![
                DnsRecord {
                    id: Some(10),
                    ..DnsRecord::txt("_acme-challenge", "XYZ123", 60)
                },
                DnsRecord {
                    id: Some(11),
                    ..DnsRecord::txt("_acme-challenge", "XYZ123", 60)
                },
            ])
        });
        api.expect_delete_record()
            .with(eq(1), eq(10))
            .times(1)
            .returning(|_, _| Err(api_error(404)));
        api.expect_delete_record()
            .with(eq(1), eq(11))
            .times(1)
            .returning(|_, _| Ok(()));

        let authenticator = Authenticator::new(api, &config());
        let report = authenticator
            .cleanup(&Challenge::new("example.com", "XYZ123"))
            .await;
        assert!(report.is_clean());
        assert_eq!(report.matched, 2);
        assert_eq!(report.deleted, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_cleanup_zone_not_found_does_not_fail() {
        let mut api = MockDomainApi::new();
        api.expect_list_zones()
            .returning(|| Ok(vec![zone(1, "example.org")]));
        api.expect_list_records().never();
        api.expect_delete_record().never();

        let authenticator = Authenticator::new(api, &config());
        let report = authenticator
            .cleanup(&Challenge::new("example.com", "XYZ123"))
            .await;
        assert_matches!(report.aborted, Some(Error::ZoneNotFound(_)));
        assert_eq!(report.matched, 0);
    }

    #[tokio::test]
    async fn test_cleanup_listing_failure_does_not_fail() {
        let mut api = MockDomainApi::new();
        api.expect_list_zones()
            .returning(|| Ok(vec![zone(1, "example.com")]));
        api.expect_list_records()
            .returning(|_| Err(api_error(503)));
        api.expect_delete_record().never();

        let authenticator = Authenticator::new(api, &config());
        let report = authenticator
            .cleanup(&Challenge::new("example.com", "XYZ123"))
            .await;
        assert_matches!(
            report.aborted,
            Some(Error::ProviderError { status_code: 503, .. })
        );
    }

    #[tokio::test]
    async fn test_perform_stops_at_first_failure() {
        let api = InMemoryDomainApi::new(vec![zone(1, "example.com")]);
        let authenticator = Authenticator::new(api, &config());
        let challenges = [
            Challenge::new("example.com", "one"),
            Challenge::new("example.net", "two"),
            Challenge::new("www.example.com", "three"),
        ];

        let result = authenticator.perform(&challenges).await;
        assert_matches!(result, Err(Error::ZoneNotFound(_)));
        assert_eq!(authenticator.api.records_in(1).len(), 1);
    }

    #[tokio::test]
    async fn test_perform_and_cleanup_all() {
        let api = InMemoryDomainApi::new(vec![zone(1, "example.com"), zone(2, "example.net")]);
        let authenticator = Authenticator::new(api, &config());
        let challenges = [
            Challenge::new("example.com", "one"),
            Challenge::new("*.example.com", "two"),
            Challenge::new("example.net", "three"),
        ];

        let ids = authenticator.perform(&challenges).await.unwrap();
        assert_eq!(ids.len(), 3);

        let reports = authenticator.cleanup_all(&challenges).await;
        assert!(reports.iter().all(CleanupReport::is_clean));
        assert!(authenticator.api.records_in(1).is_empty());
        assert!(authenticator.api.records_in(2).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_perform_waits_for_propagation() {
        let api = InMemoryDomainApi::new(vec![zone(1, "example.com")]);
        let config = Config {
            propagation: Duration::from_secs(30),
            ..Config::default()
        };
        let authenticator = Authenticator::new(api, &config);

        let started = tokio::time::Instant::now();
        authenticator
            .perform(&[Challenge::new("example.com", "XYZ123")])
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
    }
}
