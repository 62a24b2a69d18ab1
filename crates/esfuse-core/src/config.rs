//! Configuration types for esfuse.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, SearchError};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EsfuseConfig {
    /// Index and field layout.
    #[serde(default)]
    pub index: IndexConfig,

    /// Search and fusion parameters.
    #[serde(default)]
    pub search: SearchConfig,

    /// Default boost weights.
    #[serde(default)]
    pub boosts: BoostConfig,
}

/// Index name and the document fields queried in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index to query.
    #[serde(default = "default_index_name")]
    pub name: String,

    /// Text field holding the product title.
    #[serde(default = "default_title_field")]
    pub title_field: String,

    /// Text field holding the product description.
    #[serde(default = "default_description_field")]
    pub description_field: String,

    /// Path of the nested attribute collection.
    #[serde(default = "default_attributes_path")]
    pub attributes_path: String,

    /// Field matched inside the nested attribute collection.
    #[serde(default = "default_attributes_field")]
    pub attributes_field: String,

    /// Source field carrying the product identifier used as fusion key.
    #[serde(default = "default_product_id_field")]
    pub product_id_field: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            title_field: default_title_field(),
            description_field: default_description_field(),
            attributes_path: default_attributes_path(),
            attributes_field: default_attributes_field(),
            product_id_field: default_product_id_field(),
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of fused results.
    #[serde(default = "default_num_results")]
    pub default_num_results: usize,

    /// Hits fetched per query before fusion.
    #[serde(default = "default_num_query_results")]
    pub num_query_results: usize,

    /// RRF constant k.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    /// Candidate pool size for each knn clause.
    #[serde(default = "default_num_candidates")]
    pub num_candidates: u32,

    /// Upper bound on backend requests in flight during multi-list fusion.
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_num_results: 10,
            num_query_results: 50,
            rrf_k: 60,
            num_candidates: 150,
            max_concurrent_queries: 4,
        }
    }
}

/// Dense vector fields present in the product index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorField {
    #[serde(rename = "product_text_string_vector")]
    ProductTextString,
    #[serde(rename = "product_title_vector")]
    ProductTitle,
    #[serde(rename = "product_description_vector")]
    ProductDescription,
    #[serde(rename = "product_attributes_string_vector")]
    ProductAttributesString,
}

impl VectorField {
    /// All known vector fields, in index mapping order.
    pub const ALL: [VectorField; 4] = [
        Self::ProductTextString,
        Self::ProductTitle,
        Self::ProductDescription,
        Self::ProductAttributesString,
    ];

    /// Name of the field in the index.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::ProductTextString => "product_text_string_vector",
            Self::ProductTitle => "product_title_vector",
            Self::ProductDescription => "product_description_vector",
            Self::ProductAttributesString => "product_attributes_string_vector",
        }
    }

    /// Name of the boost weight for this field.
    pub fn boost_key(&self) -> &'static str {
        match self {
            Self::ProductTextString => "product_text_string_vector_boost",
            Self::ProductTitle => "product_title_vector_boost",
            Self::ProductDescription => "product_description_vector_boost",
            Self::ProductAttributesString => "product_attributes_string_vector_boost",
        }
    }
}

impl std::fmt::Display for VectorField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

/// Boost weight for one vector field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorBoost {
    /// Vector field to query.
    pub field: VectorField,

    /// Boost applied to the knn clause.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl VectorBoost {
    pub fn new(field: VectorField, boost: f32) -> Self {
        Self { field, boost }
    }
}

/// Boost weights for every clause of the hybrid query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostConfig {
    /// Weight of the title match.
    #[serde(default = "default_boost")]
    pub title: f32,

    /// Weight of the description match.
    #[serde(default = "default_boost")]
    pub description: f32,

    /// Weight of the nested attribute match.
    #[serde(default = "default_boost")]
    pub attributes: f32,

    /// Vector fields to query, in clause order.
    #[serde(default = "default_vector_boosts")]
    pub vectors: Vec<VectorBoost>,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            title: 1.0,
            description: 1.0,
            attributes: 1.0,
            vectors: default_vector_boosts(),
        }
    }
}

impl BoostConfig {
    /// Replace the vector boosts.
    pub fn with_vectors(mut self, vectors: Vec<VectorBoost>) -> Self {
        self.vectors = vectors;
        self
    }

    /// Copy of this config that queries a single vector field.
    pub fn only_vector(&self, vector: VectorBoost) -> Self {
        Self {
            vectors: vec![vector],
            ..self.clone()
        }
    }

    /// Check weights are finite and non-negative and vector fields are unique.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("title", self.title),
            ("description", self.description),
            ("attributes", self.attributes),
        ];
        for (name, weight) in named {
            check_weight(name, weight)?;
        }

        for (i, vector) in self.vectors.iter().enumerate() {
            check_weight(vector.field.boost_key(), vector.boost)?;
            if self.vectors[..i].iter().any(|v| v.field == vector.field) {
                return Err(SearchError::config(format!(
                    "vector field '{}' configured more than once",
                    vector.field
                )));
            }
        }

        Ok(())
    }
}

fn check_weight(name: &str, weight: f32) -> Result<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(SearchError::config(format!(
            "boost '{}' must be a non-negative number, got {}",
            name, weight
        )));
    }
    Ok(())
}

// Default value functions

fn default_index_name() -> String {
    "products".to_string()
}

fn default_title_field() -> String {
    "product_title".to_string()
}

fn default_description_field() -> String {
    "product_description".to_string()
}

fn default_attributes_path() -> String {
    "product_attributes".to_string()
}

fn default_attributes_field() -> String {
    "product_attributes.name_value".to_string()
}

fn default_product_id_field() -> String {
    "product_uid".to_string()
}

fn default_num_results() -> usize {
    10
}

fn default_num_query_results() -> usize {
    50
}

fn default_rrf_k() -> u32 {
    60
}

fn default_num_candidates() -> u32 {
    150
}

fn default_max_concurrent_queries() -> usize {
    4
}

fn default_boost() -> f32 {
    1.0
}

fn default_vector_boosts() -> Vec<VectorBoost> {
    vec![VectorBoost::new(VectorField::ProductTextString, 1.0)]
}

impl EsfuseConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SearchError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("esfuse").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("esfuse.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Reject configurations that cannot produce a valid query.
    pub fn validate(&self) -> Result<()> {
        if self.index.name.trim().is_empty() {
            return Err(SearchError::config("index name must not be empty"));
        }
        if self.index.product_id_field.trim().is_empty() {
            return Err(SearchError::config("product_id_field must not be empty"));
        }
        if self.search.default_num_results == 0 {
            return Err(SearchError::config("default_num_results must be positive"));
        }
        if self.search.num_query_results == 0 {
            return Err(SearchError::config("num_query_results must be positive"));
        }
        if self.search.num_candidates == 0 {
            return Err(SearchError::config("num_candidates must be positive"));
        }
        if self.search.max_concurrent_queries == 0 {
            return Err(SearchError::config("max_concurrent_queries must be positive"));
        }
        self.boosts.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    impl BoostConfig {
        fn vector_boost(&self, field: VectorField) -> Option<f32> {
            self.vectors
                .iter()
                .find(|v| v.field == field)
                .map(|v| v.boost)
        }
    }

    #[test]
    fn test_default_config() {
        let config = EsfuseConfig::default();
        assert_eq!(config.search.default_num_results, 10);
        assert_eq!(config.search.num_query_results, 50);
        assert_eq!(config.search.rrf_k, 60);
        assert_eq!(config.search.num_candidates, 150);
        assert_eq!(config.index.product_id_field, "product_uid");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_boosts() {
        let boosts = BoostConfig::default();
        assert_eq!(boosts.title, 1.0);
        assert_eq!(boosts.description, 1.0);
        assert_eq!(boosts.attributes, 1.0);
        assert_eq!(
            boosts.vector_boost(VectorField::ProductTextString),
            Some(1.0)
        );
        assert_eq!(boosts.vector_boost(VectorField::ProductTitle), None);
    }

    #[test]
    fn test_vector_field_names() {
        for field in VectorField::ALL {
            assert!(field.boost_key().starts_with(field.field_name()));
            assert_eq!(serde_json::to_value(field).unwrap(), field.field_name());
            assert_eq!(field.to_string(), field.field_name());
        }
    }

    #[test]
    fn test_rejects_negative_boost() {
        let boosts = BoostConfig {
            description: -0.5,
            ..Default::default()
        };
        let err = boosts.validate().unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_rejects_nan_vector_boost() {
        let boosts = BoostConfig::default()
            .with_vectors(vec![VectorBoost::new(VectorField::ProductTitle, f32::NAN)]);
        assert!(boosts.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_vector_field() {
        let boosts = BoostConfig::default().with_vectors(vec![
            VectorBoost::new(VectorField::ProductTitle, 1.0),
            VectorBoost::new(VectorField::ProductTitle, 2.0),
        ]);
        let err = boosts.validate().unwrap_err();
        assert!(err.to_string().contains("product_title_vector"));
    }

    #[test]
    fn test_only_vector_keeps_text_boosts() {
        let boosts = BoostConfig {
            title: 3.0,
            ..Default::default()
        }
        .with_vectors(vec![
            VectorBoost::new(VectorField::ProductTitle, 1.0),
            VectorBoost::new(VectorField::ProductDescription, 2.0),
        ]);

        let single = boosts.only_vector(VectorBoost::new(VectorField::ProductDescription, 2.0));
        assert_eq!(single.title, 3.0);
        assert_eq!(single.vectors.len(), 1);
        assert_eq!(single.vector_boost(VectorField::ProductDescription), Some(2.0));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EsfuseConfig::from_toml(
            r#"
            [index]
            name = "home-depot"

            [search]
            rrf_k = 20

            [boosts]
            title = 2.5

            [[boosts.vectors]]
            field = "product_title_vector"
            boost = 0.5

            [[boosts.vectors]]
            field = "product_description_vector"
            "#,
        )
        .unwrap();

        assert_eq!(config.index.name, "home-depot");
        assert_eq!(config.index.title_field, "product_title");
        assert_eq!(config.search.rrf_k, 20);
        assert_eq!(config.search.num_query_results, 50);
        assert_eq!(config.boosts.title, 2.5);
        assert_eq!(config.boosts.description, 1.0);
        assert_eq!(config.boosts.vector_boost(VectorField::ProductTitle), Some(0.5));
        assert_eq!(
            config.boosts.vector_boost(VectorField::ProductDescription),
            Some(1.0)
        );
        assert_eq!(config.boosts.vector_boost(VectorField::ProductTextString), None);
    }

    #[test]
    fn test_from_toml_unknown_vector_field() {
        let err = EsfuseConfig::from_toml(
            r#"
            [[boosts.vectors]]
            field = "image_vector"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_from_toml_validates() {
        let err = EsfuseConfig::from_toml("[search]\nnum_query_results = 0\n").unwrap_err();
        assert!(err.to_string().contains("num_query_results"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[index]\nproduct_id_field = \"sku\"").unwrap();

        let config = EsfuseConfig::load(file.path()).unwrap();
        assert_eq!(config.index.product_id_field, "sku");
        assert_eq!(config.boosts, BoostConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = EsfuseConfig::load(std::path::Path::new("/nonexistent/esfuse.toml")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
