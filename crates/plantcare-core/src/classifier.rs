//! Plant disease classification from camera frames.
//!
//! A frame is decoded, resized to the model's square input, scaled to
//! `[0, 1]` and laid out as NHWC `[1, size, size, 3]`. One forward pass
//! yields a score per category; the predicted label is the argmax and the
//! confidence its softmax probability.
//!
//! The model is loaded once at startup. If loading fails the dashboard runs
//! with a [`ClassifierHandle::Disabled`] handle for the rest of the process.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use image::imageops::FilterType;
use serde::Serialize;
use tracing::{info, warn};
use tract_onnx::prelude::*;

use plantcare_types::{Classification, LabelMap};

use crate::error::{Error, Result};

/// Default edge length of the square model input.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Tolerance when deciding whether raw outputs already sum to one.
const DISTRIBUTION_EPSILON: f32 = 1e-3;

/// Something that can turn a preprocessed frame into per-category scores.
///
/// Implementors provide [`infer`](ImageClassifier::infer); decoding and label
/// selection are shared.
pub trait ImageClassifier: Send + Sync {
    /// Edge length of the square input in pixels.
    fn input_size(&self) -> u32;

    /// Labels indexed by output position.
    fn labels(&self) -> &LabelMap;

    /// Run one forward pass over an NHWC `[1, size, size, 3]` input.
    fn infer(&self, input: &[f32]) -> Result<Vec<f32>>;

    /// Classify an encoded frame (JPEG or PNG).
    fn classify(&self, frame: &[u8]) -> Result<Classification> {
        let input = preprocess(frame, self.input_size())?;
        let outputs = self.infer(&input)?;
        select(&outputs, self.labels())
    }
}

/// Decode `frame` and convert it to a normalized NHWC tensor buffer.
pub fn preprocess(frame: &[u8], size: u32) -> Result<Vec<f32>> {
    let decoded = image::load_from_memory(frame).map_err(|e| Error::malformed("/capture", e))?;
    let rgb = decoded
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();

    Ok(rgb
        .pixels()
        .flat_map(|p| p.0)
        .map(|channel| channel as f32 / 255.0)
        .collect())
}

/// Numerically stable softmax.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|v| v / sum).collect()
    } else {
        vec![0.0; scores.len()]
    }
}

/// Whether `values` already form a probability distribution.
pub fn is_distribution(values: &[f32]) -> bool {
    !values.is_empty()
        && values.iter().all(|v| (0.0..=1.0).contains(v))
        && (values.iter().sum::<f32>() - 1.0).abs() <= DISTRIBUTION_EPSILON
}

/// Index of the largest finite value.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

/// Pick the most likely category from raw model outputs.
pub fn select(outputs: &[f32], labels: &LabelMap) -> Result<Classification> {
    if outputs.len() != labels.len() {
        return Err(Error::Classification(format!(
            "model produced {} scores for {} categories",
            outputs.len(),
            labels.len()
        )));
    }

    let probabilities = if is_distribution(outputs) {
        outputs.to_vec()
    } else {
        softmax(outputs)
    };

    let index = argmax(&probabilities)
        .ok_or_else(|| Error::Classification("model produced no finite scores".to_string()))?;
    let label = labels
        .get(index)
        .ok_or_else(|| Error::Classification(format!("no label for index {}", index)))?;

    Ok(Classification {
        label: label.to_string(),
        confidence: probabilities[index].clamp(0.0, 1.0),
        index,
    })
}

/// Load a `categories.json` label map from disk.
pub fn load_labels(path: &Path) -> Result<LabelMap> {
    let json = fs::read_to_string(path)
        .map_err(|e| Error::ModelLoad(format!("{}: {}", path.display(), e)))?;
    let labels = LabelMap::from_json(&json)
        .map_err(|e| Error::ModelLoad(format!("{}: {}", path.display(), e)))?;
    if labels.is_empty() {
        return Err(Error::ModelLoad(format!(
            "{}: no categories",
            path.display()
        )));
    }
    Ok(labels)
}

type Plan = TypedRunnableModel<TypedModel>;

/// ONNX model evaluated with tract.
pub struct OnnxClassifier {
    plan: Plan,
    labels: LabelMap,
    input_size: u32,
}

impl fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("labels", &self.labels.len())
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load the model and its label map, then run one warm-up inference.
    ///
    /// Fails with [`Error::ModelLoad`] if either file is unusable or the
    /// model's output width does not match the number of categories.
    pub fn load(model: &Path, categories: &Path, input_size: u32) -> Result<Self> {
        if input_size == 0 {
            return Err(Error::ModelLoad("input size must be positive".to_string()));
        }
        let labels = load_labels(categories)?;

        let size = input_size as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(model)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, size, size, 3]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| Error::ModelLoad(format!("{}: {}", model.display(), e)))?;

        let classifier = Self {
            plan,
            labels,
            input_size,
        };

        let warmup = vec![0.0; size * size * 3];
        let outputs = classifier
            .infer(&warmup)
            .map_err(|e| Error::ModelLoad(e.to_string()))?;
        if outputs.len() != classifier.labels.len() {
            return Err(Error::ModelLoad(format!(
                "model has {} outputs but {} lists {} categories",
                outputs.len(),
                categories.display(),
                classifier.labels.len()
            )));
        }

        Ok(classifier)
    }
}

impl ImageClassifier for OnnxClassifier {
    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn labels(&self) -> &LabelMap {
        &self.labels
    }

    fn infer(&self, input: &[f32]) -> Result<Vec<f32>> {
        let size = self.input_size as usize;
        let tensor = Tensor::from_shape(&[1, size, size, 3], input)
            .map_err(|e| Error::Classification(e.to_string()))?;
        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| Error::Classification(e.to_string()))?;
        let first = outputs
            .first()
            .ok_or_else(|| Error::Classification("model produced no output".to_string()))?;
        let scores = first
            .as_slice::<f32>()
            .map_err(|e| Error::Classification(e.to_string()))?;
        Ok(scores.to_vec())
    }
}

/// Classifier availability reported to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClassifierState {
    Ready { categories: usize },
    Disabled { reason: String },
}

/// A loaded classifier, or the reason there is none.
#[derive(Clone)]
pub enum ClassifierHandle {
    Ready(Arc<dyn ImageClassifier>),
    Disabled { reason: String },
}

impl fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierHandle::Ready(c) => f
                .debug_struct("Ready")
                .field("categories", &c.labels().len())
                .finish(),
            ClassifierHandle::Disabled { reason } => {
                f.debug_struct("Disabled").field("reason", reason).finish()
            }
        }
    }
}

impl ClassifierHandle {
    pub fn disabled(reason: impl Into<String>) -> Self {
        ClassifierHandle::Disabled {
            reason: reason.into(),
        }
    }

    /// Load an ONNX classifier, downgrading any failure to a disabled handle.
    pub fn load_onnx(model: &Path, categories: &Path, input_size: u32) -> Self {
        match OnnxClassifier::load(model, categories, input_size) {
            Ok(classifier) => {
                info!(
                    "Classifier loaded from {} ({} categories)",
                    model.display(),
                    classifier.labels().len()
                );
                ClassifierHandle::Ready(Arc::new(classifier))
            }
            Err(e) => {
                warn!("Disease detection disabled: {}", e);
                ClassifierHandle::disabled(e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ClassifierHandle::Ready(_))
    }

    pub fn state(&self) -> ClassifierState {
        match self {
            ClassifierHandle::Ready(c) => ClassifierState::Ready {
                categories: c.labels().len(),
            },
            ClassifierHandle::Disabled { reason } => ClassifierState::Disabled {
                reason: reason.clone(),
            },
        }
    }

    /// Classify a frame on the blocking pool. Returns `None` when disabled.
    pub async fn classify(&self, frame: Bytes) -> Option<Result<Classification>> {
        let ClassifierHandle::Ready(classifier) = self else {
            return None;
        };
        let classifier = Arc::clone(classifier);
        let result = tokio::task::spawn_blocking(move || classifier.classify(&frame))
            .await
            .map_err(|e| Error::Classification(format!("inference task failed: {}", e)))
            .and_then(|r| r);
        Some(result)
    }
}
