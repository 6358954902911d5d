use crate::models::Harvest;
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for both collection paths. They converge on the same output
/// schema, so callers can swap one for the other.
#[async_trait]
pub trait Collector {
    /// Run one collection pass.
    async fn collect(&self) -> Result<Harvest>;

    /// Get the name of the collection path.
    fn source_name(&self) -> &'static str;
}
