use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::PseudoError;
use crate::gmm::GaussianMixture;
use crate::pca::Pca;

/// Binary speaker gender label as found in `spk2gender` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// The other gender (`m` <-> `f`).
    pub fn opposite(self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "m",
            Self::Female => "f",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = PseudoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(Self::Male),
            "f" => Ok(Self::Female),
            other => Err(PseudoError::InvalidGender(other.to_string())),
        }
    }
}

/// A reduction transform and the density model fitted over its output.
///
/// Immutable once fitted; samplers only borrow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pca: Pca,
    gmm: GaussianMixture,
}

impl FittedModel {
    pub fn new(pca: Pca, gmm: GaussianMixture) -> Self {
        Self { pca, gmm }
    }

    /// Draws one candidate embedding: a mixture sample in reduced space,
    /// mapped back through the inverse reduction.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        let z = self.gmm.sample(rng);
        self.pca
            .inverse_transform(&z)
            .into_iter()
            .map(|x| x as f32)
            .collect()
    }

    /// Embedding dimensionality.
    pub fn dim(&self) -> usize {
        self.pca.dim()
    }

    /// Dimensionality of the reduced space the mixture lives in.
    pub fn reduced_dim(&self) -> usize {
        self.pca.n_components()
    }

    pub fn pca(&self) -> &Pca {
        &self.pca
    }

    pub fn gmm(&self) -> &GaussianMixture {
        &self.gmm
    }
}

/// Either one model shared by both genders or one model per gender.
///
/// Chosen once when fitting or loading; [`ModelBundle::model_for`]
/// resolves the model for an output gender regardless of shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelBundle {
    Combined(FittedModel),
    PerGender {
        male: FittedModel,
        female: FittedModel,
    },
}

impl ModelBundle {
    /// Model to sample a pseudo-speaker of `gender` from.
    pub fn model_for(&self, gender: Gender) -> &FittedModel {
        match self {
            Self::Combined(m) => m,
            Self::PerGender { male, .. } if gender == Gender::Male => male,
            Self::PerGender { female, .. } => female,
        }
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, Self::Combined(_))
    }

    /// Short description of the bundle shape.
    pub fn shape(&self) -> &'static str {
        if self.is_combined() {
            "combined"
        } else {
            "per-gender"
        }
    }

    /// Checks the bundle shape against the requested gender mode.
    pub fn ensure_shape(&self, combine_genders: bool) -> Result<(), PseudoError> {
        if self.is_combined() == combine_genders {
            return Ok(());
        }
        Err(PseudoError::ModelShapeMismatch {
            found: self.shape(),
            combine_genders,
        })
    }

    /// All models with the gender they serve (`None` for a combined model).
    pub fn models(&self) -> Vec<(Option<Gender>, &FittedModel)> {
        match self {
            Self::Combined(m) => vec![(None, m)],
            Self::PerGender { male, female } => {
                vec![(Some(Gender::Male), male), (Some(Gender::Female), female)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmm::GmmParams;
    use crate::pca::ReductionTarget;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tiny_model(offset: f64) -> FittedModel {
        let data: Vec<Vec<f64>> = (0..8)
            .map(|i| vec![offset + i as f64, offset - (i % 3) as f64, offset + (i % 2) as f64])
            .collect();
        let pca = Pca::fit(&data, ReductionTarget::Components(2)).unwrap();
        let reduced: Vec<Vec<f64>> = data.iter().map(|r| pca.transform(r)).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let gmm = GaussianMixture::fit(&reduced, &GmmParams::new(1), &mut rng).unwrap();
        FittedModel::new(pca, gmm)
    }

    #[test]
    fn gender_parse_and_display() {
        assert_eq!("m".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("f".parse::<Gender>().unwrap(), Gender::Female);
        assert!(matches!("x".parse::<Gender>(), Err(PseudoError::InvalidGender(_))));
        assert!("M".parse::<Gender>().is_err());
        assert_eq!(Gender::Male.to_string(), "m");
        assert_eq!(Gender::Female.to_string(), "f");
    }

    #[test]
    fn gender_opposite() {
        for g in Gender::ALL {
            assert_ne!(g.opposite(), g);
            assert_eq!(g.opposite().opposite(), g);
        }
    }

    #[test]
    fn draw_has_embedding_dim() {
        let model = tiny_model(0.0);
        assert_eq!(model.dim(), 3);
        assert_eq!(model.reduced_dim(), 2);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(model.draw(&mut rng).len(), 3);
    }

    #[test]
    fn model_for_resolves_shape() {
        let combined = ModelBundle::Combined(tiny_model(0.0));
        assert!(std::ptr::eq(
            combined.model_for(Gender::Male),
            combined.model_for(Gender::Female)
        ));

        let split = ModelBundle::PerGender {
            male: tiny_model(0.0),
            female: tiny_model(100.0),
        };
        let m = split.model_for(Gender::Male);
        let f = split.model_for(Gender::Female);
        assert!(m.pca().mean()[0] < 50.0);
        assert!(f.pca().mean()[0] > 50.0);
        assert_eq!(split.models().len(), 2);
    }

    #[test]
    fn ensure_shape_both_directions() {
        let combined = ModelBundle::Combined(tiny_model(0.0));
        assert!(combined.ensure_shape(true).is_ok());
        assert!(matches!(
            combined.ensure_shape(false),
            Err(PseudoError::ModelShapeMismatch { found: "combined", combine_genders: false })
        ));

        let split = ModelBundle::PerGender {
            male: tiny_model(0.0),
            female: tiny_model(1.0),
        };
        assert!(split.ensure_shape(false).is_ok());
        assert!(split.ensure_shape(true).is_err());
    }
}
