use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::PseudoError;
use crate::cosine::cosine_similarity;
use crate::model::FittedModel;

/// Controls the dissimilarity constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleOptions {
    /// Maximum cosine similarity to the reference a candidate may have.
    /// Similarity is bounded by 1, so the default 1.01 disables rejection.
    pub threshold: f32,

    /// Draws allowed before falling back to the least similar candidate.
    /// At least one draw is always made.
    pub max_attempts: usize,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            threshold: 1.01,
            max_attempts: 1000,
        }
    }
}

/// One synthesized embedding and how it was obtained.
#[derive(Debug, Clone)]
pub struct PseudoSample {
    pub embedding: Vec<f32>,

    /// Cosine similarity to the reference; `None` without a reference.
    pub similarity: Option<f32>,

    /// Number of candidates drawn.
    pub attempts: usize,

    /// False when the attempt budget ran out and the least similar
    /// candidate was returned instead.
    pub accepted: bool,
}

/// Draws pseudo-speaker embeddings from a fitted model by rejection
/// sampling against a reference embedding.
pub struct PseudoSampler<'a> {
    model: &'a FittedModel,
    opts: SampleOptions,
}

impl<'a> PseudoSampler<'a> {
    pub fn new(model: &'a FittedModel, opts: SampleOptions) -> Self {
        Self { model, opts }
    }

    pub fn options(&self) -> &SampleOptions {
        &self.opts
    }

    /// Draws until a candidate's cosine similarity to `reference` is at
    /// most the threshold, or the attempt budget is spent.
    ///
    /// Never fails on exhaustion: the candidate with the lowest similarity
    /// seen is returned with `accepted = false`. Without a reference the
    /// first draw is returned.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        reference: Option<&[f32]>,
        rng: &mut R,
    ) -> Result<PseudoSample, PseudoError> {
        let Some(reference) = reference else {
            return Ok(PseudoSample {
                embedding: self.model.draw(rng),
                similarity: None,
                attempts: 1,
                accepted: true,
            });
        };
        if reference.len() != self.model.dim() {
            return Err(PseudoError::DimensionMismatch {
                expected: self.model.dim(),
                got: reference.len(),
            });
        }

        let limit = self.opts.max_attempts.max(1);
        let threshold = self.opts.threshold;

        let candidate = self.model.draw(rng);
        let similarity = cosine_similarity(&candidate, reference);
        if similarity <= threshold {
            return Ok(accept(candidate, similarity, 1));
        }
        let mut best = (similarity, candidate);

        for attempt in 2..=limit {
            let candidate = self.model.draw(rng);
            let similarity = cosine_similarity(&candidate, reference);
            if similarity <= threshold {
                return Ok(accept(candidate, similarity, attempt));
            }
            if similarity < best.0 {
                best = (similarity, candidate);
            }
        }

        debug!(
            attempts = limit,
            similarity = best.0,
            threshold,
            "no candidate under threshold, using least similar"
        );
        Ok(PseudoSample {
            embedding: best.1,
            similarity: Some(best.0),
            attempts: limit,
            accepted: false,
        })
    }
}

fn accept(embedding: Vec<f32>, similarity: f32, attempts: usize) -> PseudoSample {
    PseudoSample {
        embedding,
        similarity: Some(similarity),
        attempts,
        accepted: true,
    }
}
