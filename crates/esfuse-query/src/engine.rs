//! Query engine for hybrid and rank-fused search.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use esfuse_core::{
    EsfuseConfig, FusedResults, QueryRequest, RankedList, Result, SearchClient, SearchConfig,
    SearchError, SearchResponse,
};

use crate::builder::QueryBuilder;
use crate::fusion::{
    reciprocal_rank_fusion, ScoredList, DEFAULT_RRF_K, TEXT_SCORE_COLUMN, VECTOR_SCORE_COLUMN,
};

/// Parameters of a rank-fused search.
#[derive(Debug, Clone)]
pub struct FusionOptions {
    /// Hits fetched from each individual query.
    pub num_query_results: usize,

    /// RRF constant.
    pub k: u32,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            num_query_results: 50,
            k: DEFAULT_RRF_K,
        }
    }
}

impl From<&SearchConfig> for FusionOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            num_query_results: config.num_query_results,
            k: config.rrf_k,
        }
    }
}

/// Hybrid search query engine.
///
/// Builds query bodies for the configured index, sends them through the
/// search client and optionally fuses several result lists with RRF.
pub struct QueryEngine<C> {
    /// Search backend.
    client: Arc<C>,

    /// Index layout and search defaults.
    config: Arc<EsfuseConfig>,
}

impl<C> QueryEngine<C>
where
    C: SearchClient + 'static,
{
    /// Create a new query engine with default configuration.
    pub fn new(client: Arc<C>) -> Self {
        Self::with_config(client, EsfuseConfig::default())
    }

    /// Create a new query engine with the given configuration.
    pub fn with_config(client: Arc<C>, config: EsfuseConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EsfuseConfig {
        &self.config
    }

    /// Fusion options taken from the search configuration.
    pub fn fusion_options(&self) -> FusionOptions {
        FusionOptions::from(&self.config.search)
    }

    /// Empty request carrying the configured result count and boosts.
    pub fn request(&self) -> QueryRequest {
        QueryRequest::new(self.config.search.default_num_results)
            .boosts(self.config.boosts.clone())
    }

    fn builder(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.config.index, self.config.search.num_candidates)
    }

    /// Run a single hybrid query combining every text and vector clause.
    pub async fn search(&self, request: &QueryRequest) -> Result<SearchResponse> {
        request.validate()?;

        info!(
            "Hybrid search: text={:?} vector={}",
            request.search_text,
            request.search_vector.is_some()
        );

        let body = self.builder().build(request, request.num_results);
        let response = self.client.search(&self.config.index.name, &body).await?;

        debug!("Hybrid search returned {} hits", response.hits().len());

        Ok(response)
    }

    /// Issue one query of `size` hits, skipping the backend when the
    /// request would produce no clauses.
    async fn ranked(&self, request: QueryRequest, size: usize) -> Result<RankedList> {
        if !request.has_clauses() {
            return Ok(Vec::new());
        }

        let body = self.builder().build(&request, size);
        let response = self.client.search(&self.config.index.name, &body).await?;
        Ok(response.into_hits())
    }

    /// Fuse a text-only and a vector-only query with RRF.
    ///
    /// The vector query carries every configured vector clause. When the
    /// text query returns nothing, the ranking is the vector list's own.
    pub async fn search_rrf(
        &self,
        request: &QueryRequest,
        options: &FusionOptions,
    ) -> Result<FusedResults> {
        request.validate()?;
        let start = Instant::now();

        info!("RRF search for: {:?}", request.search_text);

        let (text_hits, vector_hits) = tokio::join!(
            self.ranked(request.text_only(), options.num_query_results),
            self.ranked(request.vector_only(), options.num_query_results)
        );

        let text_hits = text_hits?;
        let vector_hits = vector_hits?;

        debug!(
            "Text search returned {} hits, vector search returned {} hits",
            text_hits.len(),
            vector_hits.len()
        );

        let lists = vec![
            ScoredList::new(TEXT_SCORE_COLUMN, text_hits),
            ScoredList::new(VECTOR_SCORE_COLUMN, vector_hits),
        ];

        self.fuse(lists, request.num_results, options.k, start)
    }

    /// Fuse a text-only query and one vector-only query per vector field.
    ///
    /// Queries run on a pool bounded by `max_concurrent_queries` and are
    /// joined in a fixed order: text first, then vector fields as declared.
    pub async fn search_rrf_multi(
        &self,
        request: &QueryRequest,
        options: &FusionOptions,
    ) -> Result<FusedResults> {
        request.validate()?;
        let start = Instant::now();

        info!(
            "Multi-vector RRF search for: {:?} over {} vector fields",
            request.search_text,
            request.boosts.vectors.len()
        );

        let builder = self.builder();
        let mut jobs: Vec<(String, serde_json::Value)> = Vec::new();

        if request.search_text.is_some() {
            let body = builder.build(&request.text_only(), options.num_query_results);
            jobs.push((TEXT_SCORE_COLUMN.to_string(), body));
        }

        if request.search_vector.is_some() {
            let vector_request = request.vector_only();
            for vector in &request.boosts.vectors {
                let single = QueryRequest {
                    boosts: request.boosts.only_vector(*vector),
                    ..vector_request.clone()
                };
                let body = builder.build(&single, options.num_query_results);
                jobs.push((format!("{}_score", vector.field.boost_key()), body));
            }
        }

        let (columns, bodies): (Vec<String>, Vec<serde_json::Value>) = jobs.into_iter().unzip();
        let responses = self.dispatch(bodies).await?;

        let mut lists = Vec::with_capacity(columns.len());
        for (column, response) in columns.into_iter().zip(responses) {
            let hits = response.into_hits();
            debug!("{} list has {} hits", column, hits.len());

            // An empty text list contributes no column.
            if column == TEXT_SCORE_COLUMN && hits.is_empty() {
                continue;
            }
            lists.push(ScoredList::new(column, hits));
        }

        self.fuse(lists, request.num_results, options.k, start)
    }

    /// Send every body to the backend, at most `max_concurrent_queries` at
    /// a time. Responses come back in the order of `bodies`.
    async fn dispatch(&self, bodies: Vec<serde_json::Value>) -> Result<Vec<SearchResponse>> {
        let permits = Arc::new(Semaphore::new(
            self.config.search.max_concurrent_queries.max(1),
        ));
        let mut tasks = JoinSet::new();

        for (slot, body) in bodies.into_iter().enumerate() {
            let client = Arc::clone(&self.client);
            let config = Arc::clone(&self.config);
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| SearchError::internal(format!("query pool closed: {}", e)))?;
                let response = client.search(&config.index.name, &body).await?;
                Ok::<_, SearchError>((slot, response))
            });
        }

        let mut responses: Vec<Option<SearchResponse>> = (0..tasks.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (slot, response) = joined
                .map_err(|e| SearchError::internal(format!("query task failed: {}", e)))??;
            responses[slot] = Some(response);
        }

        responses
            .into_iter()
            .map(|r| r.ok_or_else(|| SearchError::internal("query task produced no response")))
            .collect()
    }

    fn fuse(
        &self,
        lists: Vec<ScoredList>,
        num_results: usize,
        k: u32,
        start: Instant,
    ) -> Result<FusedResults> {
        let columns: Vec<String> = lists.iter().map(|l| l.column.clone()).collect();

        let results = reciprocal_rank_fusion(
            lists,
            &self.config.index.product_id_field,
            k,
            num_results,
        )?;

        let latency_ms = start.elapsed().as_millis() as u64;

        info!(
            "Fused {} lists in {}ms, returned {} results",
            columns.len(),
            latency_ms,
            results.len()
        );

        Ok(FusedResults {
            columns,
            total_results: results.len(),
            latency_ms,
            results,
        })
    }
}
