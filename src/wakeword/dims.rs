//! Wake-word model dimension probing.
//!
//! Classifier heads in the wild disagree about how many embedding vectors
//! they consume and how wide each one is, and not every export carries
//! usable shape metadata. This module resolves both values once per model
//! load through an ordered fallback chain — declared metadata, then an
//! empirical probe, then parsing the runtime's own shape-mismatch message —
//! and caches the result in an immutable [`ModelDims`]. Nothing here runs on
//! the per-window path.

use crate::defaults;
use crate::engine::{InferenceEngine, TensorMap, TensorValue};
use crate::error::{Result, WakestreamError};

/// Resolved wake-word model geometry, immutable once probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDims {
    /// Embedding vectors the classifier consumes per inference.
    pub embedding_buffer_size: usize,
    /// Width of each embedding vector.
    pub embedding_dimension: usize,
}

impl Default for ModelDims {
    fn default() -> Self {
        Self {
            embedding_buffer_size: defaults::EMBEDDING_BUFFER_SIZE,
            embedding_dimension: defaults::EMBEDDING_DIM,
        }
    }
}

/// Partially resolved geometry carried through the fallback chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeHint {
    /// Classifier input depth (embedding vectors per inference).
    pub time: Option<usize>,
    /// Embedding vector width.
    pub dim: Option<usize>,
}

impl ShapeHint {
    /// True once both values are known.
    pub fn resolved(&self) -> bool {
        self.time.is_some() && self.dim.is_some()
    }
}

/// Determines a wake-word model's embedding geometry.
///
/// Fallback chain, each step consulted only while a value is missing:
/// 1. embedding engine declared output metadata (numeric last dimension);
/// 2. detector engine declared input metadata (rank-3 `[batch, time, dim]`);
/// 3. empirical probe over candidate depths with zero tensors;
/// 4. shape literals parsed out of the probe's shape-mismatch error text;
/// 5. the supplied fallback dims, if any.
///
/// Deterministic for fixed engine metadata. Returns
/// [`WakestreamError::DimensionProbeExhausted`] when every step fails and no
/// fallback was provided.
pub fn probe_model_dims(
    embedding: &dyn InferenceEngine,
    detector: &mut dyn InferenceEngine,
    fallback: Option<ModelDims>,
) -> Result<ModelDims> {
    let mut hint = ShapeHint::default();

    // Step 1: embedding output metadata
    for spec in embedding.output_specs() {
        if let Some(&Some(last)) = spec.dims.last() {
            hint.dim = Some(last);
            break;
        }
    }

    // Step 2: detector input metadata
    for spec in detector.input_specs() {
        if spec.dims.len() == 3 {
            if hint.time.is_none()
                && let Some(time) = spec.dims[1]
            {
                hint.time = Some(time);
            }
            if hint.dim.is_none()
                && let Some(dim) = spec.dims[2]
            {
                hint.dim = Some(dim);
            }
        }
        if hint.resolved() {
            break;
        }
    }

    // Steps 3 and 4: empirical probe, then error-text parsing
    if hint.time.is_none() {
        let dim = hint.dim.unwrap_or(defaults::EMBEDDING_DIM);
        let input_name = detector
            .input_specs()
            .first()
            .map(|spec| spec.name.clone())
            .unwrap_or_else(|| "input".to_string());

        let mut last_error: Option<WakestreamError> = None;
        for candidate in defaults::PROBE_CANDIDATE_SIZES {
            let mut inputs = TensorMap::new();
            inputs.insert(
                input_name.clone(),
                TensorValue::zeros_f32(&[1, candidate, dim]),
            );
            match detector.run(inputs) {
                Ok(_) => {
                    hint.time = Some(candidate);
                    break;
                }
                Err(err) => last_error = Some(err),
            }
        }

        if hint.time.is_none()
            && let Some(err) = last_error
            && let Some((time, parsed_dim)) = shape_hint_from_text(&err.to_string())
        {
            hint.time = Some(time);
            if hint.dim.is_none() {
                hint.dim = Some(parsed_dim);
            }
        }
    }

    // Step 5: configured fallback for whatever is still missing
    let time = hint.time.or(fallback.map(|f| f.embedding_buffer_size));
    let dim = hint.dim.or(fallback.map(|f| f.embedding_dimension));
    match (time, dim) {
        (Some(embedding_buffer_size), Some(embedding_dimension)) => Ok(ModelDims {
            embedding_buffer_size,
            embedding_dimension,
        }),
        _ => Err(WakestreamError::DimensionProbeExhausted {
            message: format!(
                "no metadata, all probe sizes rejected, no parseable shape (time={:?}, dim={:?})",
                hint.time, hint.dim
            ),
        }),
    }
}

/// Extracts the expected `[time, dim]` pair from a runtime error message.
///
/// Prefers rank-3 shapes with a leading batch dimension of 1, which is how
/// classifier inputs are reported.
fn shape_hint_from_text(text: &str) -> Option<(usize, usize)> {
    parse_shape_literals(text)
        .into_iter()
        .find(|shape| shape.len() == 3 && shape[0] == 1)
        .map(|shape| (shape[1], shape[2]))
}

/// Finds every shape literal embedded in an error message, in order.
///
/// Handles both bracketed (`[1, 16, 96]`) and `1x16x96`-style forms.
fn parse_shape_literals(text: &str) -> Vec<Vec<usize>> {
    let mut shapes = Vec::new();

    // Bracketed form
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let tail = &rest[open + 1..];
        let Some(close) = tail.find(']') else {
            break;
        };
        let inner = &tail[..close];
        let dims: Vec<Option<usize>> = inner
            .split(',')
            .map(|part| part.trim().parse::<usize>().ok())
            .collect();
        if !dims.is_empty() && dims.iter().all(Option::is_some) {
            shapes.push(dims.into_iter().flatten().collect());
        }
        rest = &tail[close + 1..];
    }

    // NxNxN form
    for token in text.split(|c: char| !c.is_ascii_digit() && c != 'x') {
        if !token.contains('x') {
            continue;
        }
        let dims: Vec<Option<usize>> = token
            .split('x')
            .map(|part| part.parse::<usize>().ok())
            .collect();
        if dims.len() >= 2 && dims.iter().all(Option::is_some) {
            shapes.push(dims.into_iter().flatten().collect());
        }
    }

    shapes
}
