//! Binary classifier used by the inference service.

pub mod train;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("failed to access model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("training failed: {0}")]
    Training(String),
}

/// Predicted class and the probability of that class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: i64,
    pub probability: f64,
}

pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;
    fn predict(&self, features: &[f64]) -> Result<Prediction, ModelError>;
}

/// Shared handle injected into request handlers.
pub type SharedModel = Arc<dyn Classifier>;

/// Fitted logistic regression, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub positive_class: i64,
    pub negative_class: i64,
}

impl LogisticModel {
    /// Probability of `positive_class` for one feature vector.
    pub fn positive_probability(&self, features: &[f64]) -> f64 {
        let z: f64 = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        1.0 / (1.0 + (-z).exp())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let io_err = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(self).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, body).map_err(io_err)
    }
}

impl Classifier for LogisticModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> Result<Prediction, ModelError> {
        if features.len() != self.n_features() {
            return Err(ModelError::FeatureCount {
                expected: self.n_features(),
                got: features.len(),
            });
        }
        let p = self.positive_probability(features);
        let prediction = if p >= 0.5 {
            Prediction {
                prediction: self.positive_class,
                probability: p,
            }
        } else {
            Prediction {
                prediction: self.negative_class,
                probability: 1.0 - p,
            }
        };
        Ok(prediction)
    }
}

/// Load the model at `path`, or `None` when no model file exists yet.
pub fn load_model(path: &Path) -> Result<Option<SharedModel>, ModelError> {
    if !path.exists() {
        warn!(path = %path.display(), "model file not found; serving without a model");
        return Ok(None);
    }
    let model = LogisticModel::load(path)?;
    info!(
        path = %path.display(),
        features = model.n_features(),
        "model loaded"
    );
    Ok(Some(Arc::new(model)))
}
