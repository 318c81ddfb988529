//! Index provisioning.

use crate::schema::IndexSchema;
use crate::store::VectorStore;
use semsearch_core::AppResult;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Creates indices with the declared vector schema.
#[derive(Debug, Clone)]
pub struct IndexManager {
    store: Arc<dyn VectorStore>,
}

impl IndexManager {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Drop `name` if it exists, then create it empty with `schema`.
    ///
    /// Every call leaves the same empty index behind, so a rebuild can be
    /// repeated after a failed run. Store errors are returned unchanged and
    /// must abort ingestion.
    #[instrument(skip(self, schema), fields(backend = self.store.backend_name()))]
    pub async fn ensure_clean_index(&self, name: &str, schema: &IndexSchema) -> AppResult<()> {
        schema.validate()?;

        if self.store.index_exists(name).await? {
            warn!("Deleting existing index '{}' and all its documents", name);
            self.store.delete_index(name).await?;
        }

        self.store.create_index(name, schema).await?;
        info!(
            "Created index '{}' ({} field, {} dims, {})",
            name,
            schema.field,
            schema.dimensions,
            schema.similarity.as_str()
        );
        Ok(())
    }
}
