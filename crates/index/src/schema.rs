//! Vector field schema shared by the index manager and the query path.

use crate::embeddings::EmbeddingProvider;
use semsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Name of the dense vector field.
pub const EMBEDDING_FIELD: &str = "embedding";

/// Largest dimensionality a dense vector field accepts.
pub const MAX_DIMENSIONS: usize = 4096;

/// Similarity metric of the vector field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    #[default]
    Cosine,
    DotProduct,
    L2Norm,
}

impl Similarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Similarity::Cosine => "cosine",
            Similarity::DotProduct => "dot_product",
            Similarity::L2Norm => "l2_norm",
        }
    }

    /// Score two vectors the way a KNN search reports it.
    ///
    /// Scores are non-negative and higher means closer: cosine and dot
    /// product map `[-1, 1]` onto `[0, 1]`, L2 uses `1 / (1 + d²)`.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Similarity::Cosine => (1.0 + cosine_similarity(a, b)) / 2.0,
            Similarity::DotProduct => (1.0 + dot(a, b)) / 2.0,
            Similarity::L2Norm => {
                let dist_sq: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                1.0 / (1.0 + dist_sq)
            }
        }
    }
}

impl std::str::FromStr for Similarity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(Similarity::Cosine),
            "dot_product" => Ok(Similarity::DotProduct),
            "l2_norm" => Ok(Similarity::L2Norm),
            other => Err(AppError::Config(format!(
                "Unknown similarity: {}. Supported: cosine, dot_product, l2_norm",
                other
            ))),
        }
    }
}

/// Declared shape of the index.
///
/// `embedding_model` and `embedding_provider` are recorded alongside the
/// mapping so the query path can refuse to search with a different model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub field: String,
    pub dimensions: usize,
    pub indexed: bool,
    pub similarity: Similarity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

impl IndexSchema {
    /// Schema for documents produced by the given embedder.
    pub fn for_provider(provider: &dyn EmbeddingProvider) -> Self {
        Self {
            field: EMBEDDING_FIELD.to_string(),
            dimensions: provider.dimensions(),
            indexed: true,
            similarity: Similarity::Cosine,
            embedding_provider: Some(provider.provider_name().to_string()),
            embedding_model: Some(provider.model_name().to_string()),
        }
    }

    /// Check the schema is one a store can create.
    pub fn validate(&self) -> AppResult<()> {
        if self.field.is_empty() {
            return Err(AppError::Config("Vector field name is empty".to_string()));
        }
        if self.dimensions == 0 || self.dimensions > MAX_DIMENSIONS {
            return Err(AppError::Config(format!(
                "Vector dimensions must be between 1 and {}, got {}",
                MAX_DIMENSIONS, self.dimensions
            )));
        }
        Ok(())
    }

    /// Check that vectors from `provider` live in this schema's space.
    ///
    /// Dimensionality must always match. Provider and model are compared
    /// only when the schema recorded them.
    pub fn validate_embedder(&self, provider: &dyn EmbeddingProvider) -> AppResult<()> {
        if self.dimensions != provider.dimensions() {
            return Err(AppError::SchemaMismatch(format!(
                "Index field '{}' has {} dimensions, embedder '{}' produces {}",
                self.field,
                self.dimensions,
                provider.model_name(),
                provider.dimensions()
            )));
        }

        if let Some(ref recorded) = self.embedding_provider {
            if recorded != provider.provider_name() {
                return Err(AppError::SchemaMismatch(format!(
                    "Index was built with provider '{}', query uses '{}'",
                    recorded,
                    provider.provider_name()
                )));
            }
        }

        if let Some(ref recorded) = self.embedding_model {
            if recorded != provider.model_name() {
                return Err(AppError::SchemaMismatch(format!(
                    "Index was built with model '{}', query uses '{}'",
                    recorded,
                    provider.model_name()
                )));
            }
        }

        Ok(())
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product = dot(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;

    #[test]
    fn test_schema_for_provider() {
        let schema = IndexSchema::for_provider(&TrigramProvider::new(768));
        assert_eq!(schema.field, "embedding");
        assert_eq!(schema.dimensions, 768);
        assert!(schema.indexed);
        assert_eq!(schema.similarity, Similarity::Cosine);
        assert_eq!(schema.embedding_provider.as_deref(), Some("trigram"));
        assert_eq!(schema.embedding_model.as_deref(), Some("trigram-v1"));
    }

    #[test]
    fn test_validate_dimension_bounds() {
        assert!(IndexSchema::for_provider(&TrigramProvider::new(768))
            .validate()
            .is_ok());
        assert!(IndexSchema::for_provider(&TrigramProvider::new(0))
            .validate()
            .is_err());
        assert!(IndexSchema::for_provider(&TrigramProvider::new(MAX_DIMENSIONS + 1))
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_embedder_dimension_mismatch() {
        let schema = IndexSchema::for_provider(&TrigramProvider::new(768));
        let provider = TrigramProvider::new(384);

        let err = schema.validate_embedder(&provider).unwrap_err();
        assert!(matches!(err, AppError::SchemaMismatch(_)));
        assert!(err.to_string().contains("768"));
    }

    #[test]
    fn test_validate_embedder_model_mismatch() {
        let provider = TrigramProvider::new(384);
        let mut schema = IndexSchema::for_provider(&provider);
        schema.embedding_model = Some("nomic-embed-text".to_string());

        let err = schema.validate_embedder(&provider).unwrap_err();
        assert!(err.to_string().contains("nomic-embed-text"));
    }

    #[test]
    fn test_validate_embedder_without_recorded_model() {
        let provider = TrigramProvider::new(384);
        let mut schema = IndexSchema::for_provider(&provider);
        schema.embedding_model = None;
        schema.embedding_provider = None;

        assert!(schema.validate_embedder(&provider).is_ok());
    }

    #[test]
    fn test_cosine_score_range() {
        let a = [1.0, 0.0];
        let b = [-1.0, 0.0];
        let c = [0.0, 1.0];
        assert!((Similarity::Cosine.score(&a, &a) - 1.0).abs() < 1e-6);
        assert!(Similarity::Cosine.score(&a, &b).abs() < 1e-6);
        assert!((Similarity::Cosine.score(&a, &c) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_parse() {
        assert_eq!("l2_norm".parse::<Similarity>().unwrap(), Similarity::L2Norm);
        assert!("manhattan".parse::<Similarity>().is_err());
    }
}
