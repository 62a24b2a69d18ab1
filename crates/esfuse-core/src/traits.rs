//! Interface to the search backend.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SearchResponse;

/// Search backend client.
///
/// Implementations send `body` as the request body of a search against
/// `index` and return the parsed response. Transport and backend failures
/// are reported as [`SearchError::Backend`](crate::SearchError::Backend);
/// raw JSON bodies can be turned into a response with
/// [`SearchResponse::from_json`].
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, index: &str, body: &serde_json::Value) -> Result<SearchResponse>;
}
