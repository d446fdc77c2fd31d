use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable unit (landmark) owned by exactly one host profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub host_id: Uuid,
    /// Nightly rate in minor currency units (cents).
    pub nightly_rate_minor: i64,
    pub currency: String,
    /// Number of interchangeable units behind this resource. Usually 1.
    pub capacity: i32,
}

impl Resource {
    pub fn is_owned_by(&self, profile_id: Uuid) -> bool {
        self.host_id == profile_id
    }
}

/// Read access to the listing catalog.
///
/// The catalog is an external collaborator; the booking core only needs the
/// owner, the rate and the unit capacity of a resource.
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    async fn get_resource(&self, id: Uuid) -> Result<Option<Resource>, CatalogError>;

    async fn resources_for_host(&self, host_id: Uuid) -> Result<Vec<Resource>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog backend failure: {0}")]
    Backend(String),
}
