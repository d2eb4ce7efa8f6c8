use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::PseudoError;
use crate::model::{Gender, ModelBundle};
use crate::sampler::{PseudoSampler, SampleOptions};

/// How many pseudo-speaker embeddings are drawn per source speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    /// One embedding shared by all of a speaker's utterances.
    #[serde(rename = "spk")]
    Speaker,
    /// An independent embedding per utterance.
    #[serde(rename = "utt")]
    Utterance,
}

impl FromStr for Granularity {
    type Err = PseudoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spk" => Ok(Self::Speaker),
            "utt" => Ok(Self::Utterance),
            other => Err(PseudoError::UnsupportedGranularity(other.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Speaker => f.write_str("spk"),
            Self::Utterance => f.write_str("utt"),
        }
    }
}

/// Source speaker metadata: gender and ordered utterance ids.
#[derive(Debug, Clone, Default)]
pub struct SpeakerRecord {
    pub genders: BTreeMap<String, Gender>,
    pub utterances: BTreeMap<String, Vec<String>>,
}

impl SpeakerRecord {
    pub fn new(
        genders: BTreeMap<String, Gender>,
        utterances: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            genders,
            utterances,
        }
    }
}

/// Controls [`assign`].
#[derive(Debug, Clone, Copy)]
pub struct AssignOptions {
    /// Sample from the opposite gender's model.
    pub cross_gender: bool,
    pub granularity: Granularity,
    pub sampling: SampleOptions,
}

/// Output of an assignment run.
#[derive(Debug, Clone, Default)]
pub struct PseudoAssignment {
    /// Utterance id -> pseudo-speaker embedding.
    pub embeddings: BTreeMap<String, Vec<f32>>,

    /// Speaker id -> gender of the pseudo-speaker.
    pub genders: BTreeMap<String, Gender>,

    /// Draws that exhausted the attempt budget.
    pub fallbacks: usize,
}

impl PseudoAssignment {
    /// `spk2gender` lines (`"spk g"`) sorted by the whole line.
    pub fn gender_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .genders
            .iter()
            .map(|(spk, g)| format!("{spk} {g}"))
            .collect();
        lines.sort();
        lines
    }
}

/// Assigns pseudo-speaker embeddings to every utterance of every source speaker.
///
/// Speakers are visited in id order. Each is sampled from the model of its
/// output gender (flipped when `cross_gender`), constrained against the
/// speaker's own embedding in `sources`.
pub fn assign<R: Rng + ?Sized>(
    bundle: &ModelBundle,
    sources: &HashMap<String, Vec<f32>>,
    speakers: &SpeakerRecord,
    opts: &AssignOptions,
    rng: &mut R,
) -> Result<PseudoAssignment, PseudoError> {
    let mut out = PseudoAssignment::default();

    for (spk, &gender) in &speakers.genders {
        let original = sources
            .get(spk)
            .ok_or_else(|| PseudoError::MissingEmbedding(spk.clone()))?;
        let utts = speakers
            .utterances
            .get(spk)
            .ok_or_else(|| PseudoError::MissingUtterances(spk.clone()))?;

        let gender = if opts.cross_gender {
            gender.opposite()
        } else {
            gender
        };
        out.genders.insert(spk.clone(), gender);

        let sampler = PseudoSampler::new(bundle.model_for(gender), opts.sampling);
        match opts.granularity {
            Granularity::Speaker => {
                let sample = sampler.sample(Some(original), rng)?;
                if !sample.accepted {
                    out.fallbacks += 1;
                }
                for utt in utts {
                    out.embeddings.insert(utt.clone(), sample.embedding.clone());
                }
            }
            Granularity::Utterance => {
                for utt in utts {
                    let sample = sampler.sample(Some(original), rng)?;
                    if !sample.accepted {
                        out.fallbacks += 1;
                    }
                    out.embeddings.insert(utt.clone(), sample.embedding);
                }
            }
        }
    }

    info!(
        speakers = out.genders.len(),
        utterances = out.embeddings.len(),
        fallbacks = out.fallbacks,
        granularity = %opts.granularity,
        cross_gender = opts.cross_gender,
        "assigned pseudo-speakers"
    );
    Ok(out)
}
