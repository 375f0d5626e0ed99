//! Dataset lifecycle: upload, listing, and the auto-load handoff that lets
//! the dashboard start its gated analytics right after an upload.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::query::{QueryData, QueryEngine, QueryKey, QueryName, QueryState};
use crate::store::{KvStore, AUTO_LOAD_KEY};
use crate::types::{Dataset, UploadReceipt};

/// Leave the one-shot flag the dashboard consumes on its next load.
pub(crate) fn record_upload_handoff(store: &Arc<dyn KvStore>) {
    store.set(AUTO_LOAD_KEY, "1");
}

pub struct DatasetsService {
    client: Arc<ApiClient>,
    engine: Arc<QueryEngine>,
}

impl DatasetsService {
    pub fn new(client: Arc<ApiClient>, engine: Arc<QueryEngine>) -> Self {
        Self { client, engine }
    }

    /// Upload a file. On success every cached result is stale, so the cache
    /// is dropped and the handoff flag set for the dashboard.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<UploadReceipt> {
        let receipt = self.client.upload(file_name, bytes).await?;
        log::info!(
            "uploaded {} as {} ({:?} rows)",
            file_name,
            receipt.table_name,
            receipt.rows_inserted
        );
        record_upload_handoff(self.client.session().store());
        self.engine.invalidate_all();
        Ok(receipt)
    }

    /// Current dataset list through the engine cache, newest first.
    pub async fn list(&self) -> ApiResult<Vec<Dataset>> {
        match self
            .engine
            .query(QueryKey::unscoped(QueryName::Datasets))
            .await
        {
            QueryState::Success(QueryData::Datasets(datasets)) => Ok(datasets),
            QueryState::Error(e) => Err(e),
            _ => Ok(Vec::new()),
        }
    }

    /// Wipe all server-side data and every cached result.
    pub async fn reset(&self) -> ApiResult<()> {
        self.client.admin_reset().await?;
        self.engine.invalidate_all();
        Ok(())
    }
}
