//! Core domain types for esfuse.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::config::BoostConfig;
use crate::error::{Result, SearchError};

/// Inputs of a hybrid or fused search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Text matched against title, description and attributes.
    pub search_text: Option<String>,

    /// Query embedding matched against the configured vector fields.
    pub search_vector: Option<Vec<f32>>,

    /// Maximum number of results to return.
    pub num_results: usize,

    /// Clause boost weights.
    #[serde(default)]
    pub boosts: BoostConfig,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            search_text: None,
            search_vector: None,
            num_results: 10,
            boosts: BoostConfig::default(),
        }
    }
}

impl QueryRequest {
    /// Create an empty request returning up to `num_results` results.
    pub fn new(num_results: usize) -> Self {
        Self {
            num_results,
            ..Default::default()
        }
    }

    /// Set the search text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    /// Set the search vector.
    pub fn vector(mut self, vector: Vec<f32>) -> Self {
        self.search_vector = Some(vector);
        self
    }

    /// Set the boost weights.
    pub fn boosts(mut self, boosts: BoostConfig) -> Self {
        self.boosts = boosts;
        self
    }

    /// Set the result count.
    pub fn num_results(mut self, num_results: usize) -> Self {
        self.num_results = num_results;
        self
    }

    /// Same request with the vector input dropped.
    pub fn text_only(&self) -> Self {
        Self {
            search_vector: None,
            ..self.clone()
        }
    }

    /// Same request with the text input dropped.
    pub fn vector_only(&self) -> Self {
        Self {
            search_text: None,
            ..self.clone()
        }
    }

    /// Whether a query built from this request has at least one clause.
    ///
    /// A vector with no configured vector fields produces no knn clause.
    pub fn has_clauses(&self) -> bool {
        self.search_text.is_some()
            || (self.search_vector.is_some() && !self.boosts.vectors.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_results == 0 {
            return Err(SearchError::invalid_argument("num_results must be positive"));
        }
        if matches!(&self.search_vector, Some(v) if v.is_empty()) {
            return Err(SearchError::invalid_argument("search_vector must not be empty"));
        }
        self.boosts
            .validate()
            .map_err(|e| SearchError::invalid_argument(e.to_string()))
    }
}

/// A single document returned by the search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Backend document identifier.
    #[serde(rename = "_id")]
    pub id: String,

    /// Index the document lives in.
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    /// Backend relevance score (null scores read as 0).
    #[serde(rename = "_score", default, deserialize_with = "nullable_score")]
    pub score: f64,

    /// Stored document.
    #[serde(rename = "_source", default)]
    pub source: serde_json::Value,
}

impl Hit {
    pub fn new(id: impl Into<String>, score: f64, source: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            index: None,
            score,
            source,
        }
    }

    /// Product identifier stored under `field` in the source record.
    ///
    /// String and numeric identifiers are accepted; numbers are rendered
    /// with their JSON representation.
    pub fn product_id(&self, field: &str) -> Result<String> {
        match self.source.get(field) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
            _ => Err(SearchError::MissingProductId {
                doc_id: self.id.clone(),
                field: field.to_string(),
            }),
        }
    }
}

fn nullable_score<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Hits in backend order, best first.
pub type RankedList = Vec<Hit>;

/// Response body of a search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Backend processing time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub took: Option<u64>,

    pub hits: HitsEnvelope,
}

/// The `hits` object of a search response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,

    #[serde(default)]
    pub hits: RankedList,
}

impl SearchResponse {
    /// Parse a raw search response body returned by the backend.
    pub fn from_json(body: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(body)?)
    }

    /// Wrap a list of hits as a response.
    pub fn from_hits(hits: RankedList) -> Self {
        let max_score = hits.iter().map(|h| h.score).reduce(f64::max);
        Self {
            took: None,
            hits: HitsEnvelope { max_score, hits },
        }
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits.hits
    }

    pub fn into_hits(self) -> RankedList {
        self.hits.hits
    }
}

/// One row of a fused ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    /// Product identifier the lists were joined on.
    pub product_id: String,

    /// Backend id of the first hit seen for this product.
    pub doc_id: String,

    /// Per-list RRF contribution keyed by score column, 0 where absent.
    pub scores: BTreeMap<String, f64>,

    /// Sum of the per-list contributions.
    pub rrf_score: f64,

    /// Source record of the first hit seen for this product.
    pub source: serde_json::Value,
}

impl FusedResult {
    /// Contribution of one score column.
    pub fn score(&self, column: &str) -> f64 {
        self.scores.get(column).copied().unwrap_or(0.0)
    }
}

/// Fused ranking container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedResults {
    /// Score columns that took part in the fusion, in join order.
    pub columns: Vec<String>,

    /// Total results returned.
    pub total_results: usize,

    /// End-to-end latency in milliseconds.
    pub latency_ms: u64,

    /// Results, best first.
    pub results: Vec<FusedResult>,
}

impl FusedResults {
    pub fn product_ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.product_id.as_str()).collect()
    }
}
