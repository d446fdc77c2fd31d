use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use roost_core::catalog::{CatalogError, Resource, ResourceCatalog};

/// Reads the marketplace's `resources` table.
pub struct PgResourceCatalog {
    pool: PgPool,
}

impl PgResourceCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ResourceRow {
    id: Uuid,
    host_id: Uuid,
    nightly_rate_minor: i64,
    currency: String,
    capacity: i32,
}

impl From<ResourceRow> for Resource {
    fn from(row: ResourceRow) -> Self {
        Resource {
            id: row.id,
            host_id: row.host_id,
            nightly_rate_minor: row.nightly_rate_minor,
            currency: row.currency,
            capacity: row.capacity,
        }
    }
}

fn backend(err: sqlx::Error) -> CatalogError {
    CatalogError::Backend(err.to_string())
}

#[async_trait]
impl ResourceCatalog for PgResourceCatalog {
    async fn get_resource(&self, id: Uuid) -> Result<Option<Resource>, CatalogError> {
        let row: Option<ResourceRow> = sqlx::query_as(
            "SELECT id, host_id, nightly_rate_minor, currency, capacity \
             FROM resources WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Resource::from))
    }

    async fn resources_for_host(&self, host_id: Uuid) -> Result<Vec<Resource>, CatalogError> {
        let rows: Vec<ResourceRow> = sqlx::query_as(
            "SELECT id, host_id, nightly_rate_minor, currency, capacity \
             FROM resources WHERE host_id = $1",
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(Resource::from).collect())
    }
}
