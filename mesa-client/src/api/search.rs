//! Search/availability service wrapper

use crate::transport::ApiTransport;
use async_trait::async_trait;
use shared::ClientResult;
use shared::models::TableAvailability;
use shared::request::SearchParams;
use shared::response::{SearchPage, SearchStats};

const SEARCH_PATH: &str = "/api/search";

/// Search service operations
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Paged availability search
    async fn search(&self, params: &SearchParams) -> ClientResult<SearchPage<TableAvailability>>;

    /// Single availability document by id
    async fn get_availability(&self, id: &str) -> ClientResult<TableAvailability>;

    /// Index statistics (admin surface)
    async fn stats(&self) -> ClientResult<SearchStats>;

    /// Trigger a full reindex (admin surface)
    async fn reindex(&self) -> ClientResult<()>;
}

pub struct HttpSearchApi {
    transport: ApiTransport,
}

impl HttpSearchApi {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search(&self, params: &SearchParams) -> ClientResult<SearchPage<TableAvailability>> {
        self.transport
            .get_query(SEARCH_PATH, &params.to_query())
            .await
    }

    async fn get_availability(&self, id: &str) -> ClientResult<TableAvailability> {
        self.transport.get(&format!("{SEARCH_PATH}/{id}")).await
    }

    async fn stats(&self) -> ClientResult<SearchStats> {
        self.transport.get(&format!("{SEARCH_PATH}/stats")).await
    }

    async fn reindex(&self) -> ClientResult<()> {
        // Returns 202 with a status body; the payload is not interesting.
        let _: serde_json::Value = self
            .transport
            .post_empty(&format!("{SEARCH_PATH}/reindex"))
            .await?;
        Ok(())
    }
}
