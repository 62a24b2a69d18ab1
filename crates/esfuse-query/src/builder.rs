//! Construction of Elasticsearch query bodies.

use serde_json::{json, Value};

use esfuse_core::{BoostConfig, IndexConfig, QueryRequest, VectorBoost};

/// Builds `bool`/`should` query bodies for one index layout.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    index: &'a IndexConfig,
    num_candidates: u32,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(index: &'a IndexConfig, num_candidates: u32) -> Self {
        Self {
            index,
            num_candidates,
        }
    }

    /// Full query body returning up to `size` hits.
    ///
    /// Text clauses are present only when the request has text, knn
    /// clauses only when it has a vector. With neither, `should` is empty.
    pub fn build(&self, request: &QueryRequest, size: usize) -> Value {
        let mut should = Vec::new();

        if let Some(text) = &request.search_text {
            should.extend(self.text_clauses(text, &request.boosts));
        }

        if let Some(vector) = &request.search_vector {
            for boost in &request.boosts.vectors {
                should.push(self.knn_clause(vector, boost));
            }
        }

        json!({
            "size": size,
            "query": {
                "bool": {
                    "should": should
                }
            }
        })
    }

    /// Title, description and nested attribute matches.
    pub fn text_clauses(&self, text: &str, boosts: &BoostConfig) -> Vec<Value> {
        vec![
            match_clause(&self.index.title_field, text, boosts.title),
            match_clause(&self.index.description_field, text, boosts.description),
            json!({
                "nested": {
                    "path": self.index.attributes_path,
                    "query": match_clause(&self.index.attributes_field, text, boosts.attributes),
                }
            }),
        ]
    }

    /// Approximate nearest-neighbor clause for one vector field.
    pub fn knn_clause(&self, vector: &[f32], boost: &VectorBoost) -> Value {
        json!({
            "knn": {
                "field": boost.field.field_name(),
                "query_vector": vector,
                "num_candidates": self.num_candidates,
                "boost": boost.boost,
            }
        })
    }
}

fn match_clause(field: &str, text: &str, boost: f32) -> Value {
    let mut params = serde_json::Map::new();
    params.insert(
        field.to_string(),
        json!({
            "query": text,
            "boost": boost,
        }),
    );
    json!({ "match": params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use esfuse_core::VectorField;

    fn should(body: &Value) -> &Vec<Value> {
        body["query"]["bool"]["should"].as_array().unwrap()
    }

    #[test]
    fn test_text_and_vector_clauses() {
        let index = IndexConfig::default();
        let builder = QueryBuilder::new(&index, 150);
        let boosts = BoostConfig {
            title: 2.0,
            description: 0.5,
            attributes: 0.25,
            ..Default::default()
        }
        .with_vectors(vec![
            VectorBoost::new(VectorField::ProductTitle, 1.5),
            VectorBoost::new(VectorField::ProductDescription, 3.0),
        ]);
        let request = QueryRequest::new(10)
            .text("cordless drill")
            .vector(vec![0.5, -0.25])
            .boosts(boosts);

        let body = builder.build(&request, 10);

        let expected = json!({
            "size": 10,
            "query": {"bool": {"should": [
                {"match": {"product_title": {"query": "cordless drill", "boost": 2.0}}},
                {"match": {"product_description": {"query": "cordless drill", "boost": 0.5}}},
                {"nested": {
                    "path": "product_attributes",
                    "query": {"match": {"product_attributes.name_value": {"query": "cordless drill", "boost": 0.25}}}
                }},
                {"knn": {"field": "product_title_vector", "query_vector": [0.5, -0.25], "num_candidates": 150, "boost": 1.5}},
                {"knn": {"field": "product_description_vector", "query_vector": [0.5, -0.25], "num_candidates": 150, "boost": 3.0}}
            ]}}
        });
        assert_eq!(body, expected);
    }

    #[test]
    fn test_without_text_has_no_match_clauses() {
        let index = IndexConfig::default();
        let builder = QueryBuilder::new(&index, 150);
        let request = QueryRequest::new(5).vector(vec![1.0]);

        let body = builder.build(&request, 5);
        let clauses = should(&body);

        assert_eq!(clauses.len(), 1);
        assert!(clauses.iter().all(|c| c.get("knn").is_some()));
    }

    #[test]
    fn test_without_vector_has_no_knn_clauses() {
        let index = IndexConfig::default();
        let builder = QueryBuilder::new(&index, 150);
        let boosts = BoostConfig::default().with_vectors(
            VectorField::ALL
                .into_iter()
                .map(|f| VectorBoost::new(f, 1.0))
                .collect(),
        );
        let request = QueryRequest::new(5).text("paint").boosts(boosts);

        let body = builder.build(&request, 5);
        let clauses = should(&body);

        assert_eq!(clauses.len(), 3);
        assert!(clauses.iter().all(|c| c.get("knn").is_none()));
    }

    #[test]
    fn test_empty_request_has_empty_should() {
        let index = IndexConfig::default();
        let body = QueryBuilder::new(&index, 150).build(&QueryRequest::new(3), 3);
        assert_eq!(body["size"], 3);
        assert!(should(&body).is_empty());
    }

    #[test]
    fn test_custom_fields_and_candidates() {
        let index = IndexConfig {
            title_field: "name".to_string(),
            attributes_path: "specs".to_string(),
            attributes_field: "specs.value".to_string(),
            ..Default::default()
        };
        let builder = QueryBuilder::new(&index, 40);
        let request = QueryRequest::new(5).text("oak").vector(vec![1.0]);

        let body = builder.build(&request, 7);
        let clauses = should(&body);

        assert_eq!(body["size"], 7);
        assert!(clauses[0]["match"].get("name").is_some());
        assert_eq!(clauses[2]["nested"]["path"], "specs");
        assert!(clauses[2]["nested"]["query"]["match"].get("specs.value").is_some());
        assert_eq!(clauses[3]["knn"]["num_candidates"], 40);
    }
}
