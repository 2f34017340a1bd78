use crate::dns::record::DnsRecord;
use crate::dns::zone::Zone;
use crate::error::Error;
use async_trait::async_trait;

/// Zone and record operations of a DNS hosting API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainApi: Send + Sync {
    async fn list_zones(&self) -> Result<Vec<Zone>, Error>;
    async fn get_zone(&self, zone_id: u64) -> Result<Zone, Error>;
    async fn list_records(&self, zone_id: u64) -> Result<Vec<DnsRecord>, Error>;
    async fn get_record(&self, zone_id: u64, record_id: u64) -> Result<DnsRecord, Error>;
    /// Returns the id the provider assigned to the new record.
    async fn create_record(&self, zone_id: u64, record: &DnsRecord) -> Result<u64, Error>;
    async fn modify_record(
        &self,
        zone_id: u64,
        record_id: u64,
        record: &DnsRecord,
    ) -> Result<(), Error>;
    async fn delete_record(&self, zone_id: u64, record_id: u64) -> Result<(), Error>;
}
