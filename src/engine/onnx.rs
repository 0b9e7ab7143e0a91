//! ONNX Runtime engine adapter.
//!
//! Thin bridge from [`InferenceEngine`] to an `ort` session: named tensors
//! are matched to the graph's declared inputs (positionally, in declared
//! order, when names differ), and declared ONNX shape metadata is exposed as
//! [`TensorSpec`]s for the dimension probe. Dynamic ONNX dimensions surface
//! as `None`.

use crate::engine::{InferenceEngine, TensorMap, TensorSpec, TensorValue};
use crate::error::{Result, WakestreamError};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::{Tensor, ValueType};
use std::path::Path;

/// ONNX Runtime session behind the engine trait.
pub struct OnnxEngine {
    session: Session,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl OnnxEngine {
    /// Loads a model graph from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WakestreamError::ModelNotFound {
                path: path.display().to_string(),
            });
        }

        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.with_intra_threads(1))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| WakestreamError::ModelLoad {
                message: format!("{}: {}", path.display(), e),
            })?;

        let input_names = session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_names = session.outputs.iter().map(|o| o.name.clone()).collect();

        Ok(Self {
            session,
            input_names,
            output_names,
        })
    }

    fn dims_of(value_type: &ValueType) -> Vec<Option<usize>> {
        match value_type {
            ValueType::Tensor { dimensions, .. } => dimensions
                .iter()
                .map(|&d| usize::try_from(d).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn to_session_value(tensor: TensorValue) -> Result<SessionInputValue<'static>> {
        let value = match tensor {
            TensorValue::F32(array) => {
                let shape: Vec<i64> = array.shape().iter().map(|&d| d as i64).collect();
                let data = array.into_raw_vec_and_offset().0;
                Tensor::from_array((shape, data))
                    .map_err(|e| WakestreamError::Inference {
                        message: format!("tensor conversion failed: {}", e),
                    })?
                    .into()
            }
            TensorValue::I64(array) => {
                let shape: Vec<i64> = array.shape().iter().map(|&d| d as i64).collect();
                let data = array.into_raw_vec_and_offset().0;
                Tensor::from_array((shape, data))
                    .map_err(|e| WakestreamError::Inference {
                        message: format!("tensor conversion failed: {}", e),
                    })?
                    .into()
            }
        };
        Ok(value)
    }
}

impl InferenceEngine for OnnxEngine {
    fn run(&mut self, mut inputs: TensorMap) -> Result<TensorMap> {
        // Feed in the graph's declared order. A tensor is matched by name
        // when possible; a single leftover tensor may stand in for a single
        // unmatched input, which covers graphs whose exported input names
        // differ from the pipeline's conventional ones.
        let mut ordered = Vec::with_capacity(self.input_names.len());
        let mut unmatched: Vec<TensorValue> = Vec::new();
        let mut missing: Vec<String> = Vec::new();

        for name in &self.input_names {
            match inputs.remove(name) {
                Some(tensor) => ordered.push(Some(tensor)),
                None => {
                    ordered.push(None);
                    missing.push(name.clone());
                }
            }
        }
        unmatched.extend(inputs.into_values());

        if missing.len() == 1 && unmatched.len() == 1 {
            let idx = ordered.iter().position(Option::is_none);
            if let Some(idx) = idx {
                ordered[idx] = unmatched.pop();
            }
        }

        let mut session_inputs: Vec<SessionInputValue<'static>> =
            Vec::with_capacity(ordered.len());
        for (slot, name) in ordered.into_iter().zip(&self.input_names) {
            let tensor = slot.ok_or_else(|| WakestreamError::Inference {
                message: format!("no tensor provided for graph input {}", name),
            })?;
            session_inputs.push(Self::to_session_value(tensor)?);
        }

        let outputs = self
            .session
            .run(session_inputs)
            .map_err(|e| WakestreamError::Inference {
                message: e.to_string(),
            })?;

        let mut result = TensorMap::new();
        for name in &self.output_names {
            let value = &outputs[name.as_str()];
            if let Ok(array) = value.try_extract_array::<f32>() {
                result.insert(name.clone(), TensorValue::F32(array.to_owned()));
            } else if let Ok(array) = value.try_extract_array::<i64>() {
                result.insert(name.clone(), TensorValue::I64(array.to_owned()));
            } else {
                return Err(WakestreamError::Inference {
                    message: format!("output {} has an unsupported element type", name),
                });
            }
        }
        drop(outputs);
        Ok(result)
    }

    fn input_specs(&self) -> Vec<TensorSpec> {
        self.session
            .inputs
            .iter()
            .map(|input| TensorSpec::new(input.name.clone(), Self::dims_of(&input.input_type)))
            .collect()
    }

    fn output_specs(&self) -> Vec<TensorSpec> {
        self.session
            .outputs
            .iter()
            .map(|output| TensorSpec::new(output.name.clone(), Self::dims_of(&output.output_type)))
            .collect()
    }
}

/// Convenience loader used by the CLI: boxes the engine for injection.
pub fn load_engine(path: &Path) -> Result<Box<dyn InferenceEngine>> {
    Ok(Box::new(OnnxEngine::from_file(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let err = OnnxEngine::from_file(Path::new("/nonexistent/model.onnx")).unwrap_err();
        assert!(matches!(err, WakestreamError::ModelNotFound { .. }));
    }
}
