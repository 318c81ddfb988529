//! Trigram embedding provider for local, offline operation.

use crate::embeddings::provider::EmbeddingProvider;
use semsearch_core::AppResult;
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

/// Model identifier reported by the trigram provider.
pub const TRIGRAM_MODEL: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Hashing embedder over words and character trigrams.
///
/// Vectors are deterministic and unit-length (or all zeros when the text has
/// no content words). Texts sharing words land close together, which is
/// enough for development and tests without a model server.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let lower = text.to_lowercase();
        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower.unicode_words() {
            if word.chars().count() > 2 && !STOP_WORDS.contains(&word) {
                *word_freq.entry(word).or_insert(0) += 1;
            }
        }

        for (word, freq) in &word_freq {
            let weight = *freq as f32;

            // Whole word
            let (idx, sign) = self.bucket(fnv1a(word.as_bytes()));
            embedding[idx] += sign * weight;

            // Character trigrams with word boundary markers
            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                let (idx, sign) = self.bucket(fnv1a(trigram.as_bytes()));
                embedding[idx] += sign * weight.sqrt() * 0.5;
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }

    /// Dimension index and sign for a feature hash.
    fn bucket(&self, hash: u64) -> (usize, f32) {
        let idx = (hash % self.dimensions as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        (idx, sign)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
        (acc ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        TRIGRAM_MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(self.generate(text))
    }
}
