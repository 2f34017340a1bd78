//! Domeneshop provider implementation

pub mod client;
pub mod error;
pub mod types;


pub use client::{DOMENESHOP_API_BASE, DomeneshopConfig, DomeneshopProvider};

// --- DomainApi trait implementation for DomeneshopProvider ---
use crate::dns::provider::DomainApi;
use crate::dns::record::DnsRecord;
use crate::dns::zone::Zone;
use crate::error::Error;
use async_trait::async_trait;
use error::map_error;
use types::to_zone;

#[async_trait]
impl DomainApi for DomeneshopProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>, Error> {
        self.get_domains()
            .await
            .map(|v| v.iter().map(to_zone).collect())
            .map_err(map_error)
    }

    async fn get_zone(&self, zone_id: u64) -> Result<Zone, Error> {
        self.get_domain(zone_id)
            .await
            .map(|d| to_zone(&d))
            .map_err(map_error)
    }

    async fn list_records(&self, zone_id: u64) -> Result<Vec<DnsRecord>, Error> {
        self.get_records(zone_id).await.map_err(map_error)
    }

    async fn get_record(&self, zone_id: u64, record_id: u64) -> Result<DnsRecord, Error> {
        DomeneshopProvider::get_record(self, zone_id, record_id)
            .await
            .map_err(map_error)
    }

    async fn create_record(&self, zone_id: u64, record: &DnsRecord) -> Result<u64, Error> {
        DomeneshopProvider::create_record(self, zone_id, record)
            .await
            .map_err(map_error)
    }

    async fn modify_record(
        &self,
        zone_id: u64,
        record_id: u64,
        record: &DnsRecord,
    ) -> Result<(), Error> {
        DomeneshopProvider::modify_record(self, zone_id, record_id, record)
            .await
            .map_err(map_error)
    }

    async fn delete_record(&self, zone_id: u64, record_id: u64) -> Result<(), Error> {
        DomeneshopProvider::delete_record(self, zone_id, record_id)
            .await
            .map_err(map_error)
    }
}
