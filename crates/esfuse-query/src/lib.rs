//! esfuse-query - Query building and rank fusion
//!
//! This crate builds Elasticsearch hybrid query bodies and combines
//! text and vector result lists using Reciprocal Rank Fusion (RRF).
//!
//! # Features
//!
//! - Hybrid `bool`/`should` queries over title, description, nested
//!   attributes and any number of knn vector fields
//! - Independent boost weight per clause
//! - Two-list RRF (text vs. all vector fields)
//! - Multi-list RRF with one vector-only query per vector field
//!
//! # Example
//!
//! ```rust,ignore
//! use esfuse_query::{FusionOptions, QueryEngine};
//! use esfuse_core::QueryRequest;
//! use std::sync::Arc;
//!
//! let engine = QueryEngine::new(Arc::new(client));
//! let request = QueryRequest::new(10).text("cordless drill").vector(embedding);
//! let fused = engine.search_rrf(&request, &FusionOptions::default()).await?;
//! ```

mod builder;
mod engine;
mod fusion;

pub use builder::QueryBuilder;
pub use engine::{FusionOptions, QueryEngine};
pub use fusion::{
    rank_scores, reciprocal_rank_fusion, rrf_contribution, ScoredList, DEFAULT_RRF_K,
    TEXT_SCORE_COLUMN, VECTOR_SCORE_COLUMN,
};

// Re-export for convenience
pub use esfuse_core::{FusedResult, FusedResults, QueryRequest, SearchClient};
