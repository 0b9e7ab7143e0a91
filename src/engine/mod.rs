//! Opaque inference engine boundary.
//!
//! The detector pipelines drive a precompiled compute graph through named
//! tensor inputs and outputs; everything about *how* that graph executes
//! (native runtime, worker offload) stays behind the [`InferenceEngine`]
//! trait. Engines are constructor-injected into pipelines — there is no
//! global runtime instance.

use crate::error::{Result, WakestreamError};
use ndarray::{ArrayD, IxDyn};
use std::collections::HashMap;

pub mod mock;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use mock::MockEngine;
#[cfg(feature = "onnx")]
pub use onnx::OnnxEngine;

/// A tensor crossing the engine boundary.
///
/// Only the two element types the speech models use are represented; shape
/// travels with the ndarray value.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorValue {
    F32(ArrayD<f32>),
    I64(ArrayD<i64>),
}

impl TensorValue {
    /// Builds an f32 tensor from a shape and flat data.
    ///
    /// Returns an error if `data.len()` does not match the shape's element
    /// count.
    pub fn from_f32(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|e| {
            WakestreamError::InvalidState {
                message: format!("tensor shape mismatch: {}", e),
            }
        })?;
        Ok(TensorValue::F32(array))
    }

    /// Builds a zero-filled f32 tensor of the given shape.
    pub fn zeros_f32(shape: &[usize]) -> Self {
        TensorValue::F32(ArrayD::zeros(IxDyn(shape)))
    }

    /// Builds a rank-1 i64 tensor holding a single value.
    pub fn scalar_i64(value: i64) -> Self {
        TensorValue::I64(ArrayD::from_elem(IxDyn(&[1]), value))
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &[usize] {
        match self {
            TensorValue::F32(a) => a.shape(),
            TensorValue::I64(a) => a.shape(),
        }
    }

    /// Returns the f32 payload, if this is an f32 tensor.
    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            TensorValue::F32(a) => Some(a),
            TensorValue::I64(_) => None,
        }
    }

    /// Returns the first element of an f32 tensor, regardless of rank.
    ///
    /// Classifier models in the wild report their score as `[1]`, `[1,1]` or
    /// `[1,1,1]`; this reads the scalar without caring which.
    pub fn first_f32(&self) -> Option<f32> {
        self.as_f32().and_then(|a| a.iter().next().copied())
    }
}

/// Named tensors flowing into or out of an engine call.
pub type TensorMap = HashMap<String, TensorValue>;

/// Declared shape metadata for one engine input or output.
///
/// `None` dimensions are dynamic (unknown until runtime). Only the dimension
/// probe consults this; the per-window hot path never does.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSpec {
    pub name: String,
    pub dims: Vec<Option<usize>>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, dims: Vec<Option<usize>>) -> Self {
        Self {
            name: name.into(),
            dims,
        }
    }
}

/// Named-tensor-in / named-tensor-out execution of a precompiled model graph.
///
/// Calls look synchronous to the pipelines even if the backing runtime is
/// asynchronous or offloaded; the engine call is the pipelines' only
/// suspension point. Implementations must not retain references to input
/// buffers across calls.
pub trait InferenceEngine: Send {
    /// Runs the graph on the given named inputs.
    fn run(&mut self, inputs: TensorMap) -> Result<TensorMap>;

    /// Declared input shapes, if the model carries metadata.
    fn input_specs(&self) -> Vec<TensorSpec> {
        Vec::new()
    }

    /// Declared output shapes, if the model carries metadata.
    fn output_specs(&self) -> Vec<TensorSpec> {
        Vec::new()
    }
}

impl InferenceEngine for Box<dyn InferenceEngine> {
    fn run(&mut self, inputs: TensorMap) -> Result<TensorMap> {
        (**self).run(inputs)
    }

    fn input_specs(&self) -> Vec<TensorSpec> {
        (**self).input_specs()
    }

    fn output_specs(&self) -> Vec<TensorSpec> {
        (**self).output_specs()
    }
}

/// Removes a named f32 tensor from an engine result.
pub(crate) fn take_f32(outputs: &mut TensorMap, name: &str) -> Result<ArrayD<f32>> {
    match outputs.remove(name) {
        Some(TensorValue::F32(a)) => Ok(a),
        Some(TensorValue::I64(_)) => Err(WakestreamError::Inference {
            message: format!("tensor {} has unexpected element type", name),
        }),
        None => Err(WakestreamError::MissingTensor {
            name: name.to_string(),
        }),
    }
}

/// Removes the sole f32 tensor from an engine result.
///
/// The melspectrogram, embedding and classifier graphs each produce exactly
/// one output; callers that know the output name should use [`take_f32`].
pub(crate) fn take_single_f32(outputs: TensorMap) -> Result<ArrayD<f32>> {
    let count = outputs.len();
    let mut f32_outputs = outputs
        .into_iter()
        .filter_map(|(_, v)| match v {
            TensorValue::F32(a) => Some(a),
            TensorValue::I64(_) => None,
        })
        .collect::<Vec<_>>();
    match (f32_outputs.len(), count) {
        (1, _) => Ok(f32_outputs.remove(0)),
        (0, 0) => Err(WakestreamError::Inference {
            message: "engine returned no outputs".to_string(),
        }),
        _ => Err(WakestreamError::Inference {
            message: format!("expected a single f32 output, got {} outputs", count),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f32_checks_element_count() {
        assert!(TensorValue::from_f32(&[2, 3], vec![0.0; 6]).is_ok());
        assert!(TensorValue::from_f32(&[2, 3], vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_zeros_shape() {
        let t = TensorValue::zeros_f32(&[2, 1, 128]);
        assert_eq!(t.shape(), &[2, 1, 128]);
    }

    #[test]
    fn test_scalar_i64() {
        let t = TensorValue::scalar_i64(16000);
        assert_eq!(t.shape(), &[1]);
        match t {
            TensorValue::I64(a) => assert_eq!(a[[0]], 16000),
            TensorValue::F32(_) => panic!("expected i64 tensor"),
        }
    }

    #[test]
    fn test_first_f32_any_rank() {
        let flat = TensorValue::from_f32(&[1], vec![0.25]).unwrap();
        assert_eq!(flat.first_f32(), Some(0.25));

        let nested = TensorValue::from_f32(&[1, 1, 1], vec![0.75]).unwrap();
        assert_eq!(nested.first_f32(), Some(0.75));

        let int = TensorValue::scalar_i64(3);
        assert_eq!(int.first_f32(), None);
    }

    #[test]
    fn test_take_f32_missing() {
        let mut outputs = TensorMap::new();
        outputs.insert("output".to_string(), TensorValue::zeros_f32(&[1, 1]));

        assert!(take_f32(&mut outputs, "output").is_ok());
        let err = take_f32(&mut outputs, "stateN").unwrap_err();
        assert!(err.to_string().contains("stateN"));
    }

    #[test]
    fn test_take_single_f32() {
        let mut outputs = TensorMap::new();
        outputs.insert("scores".to_string(), TensorValue::zeros_f32(&[1, 1]));
        assert!(take_single_f32(outputs).is_ok());

        let mut two = TensorMap::new();
        two.insert("a".to_string(), TensorValue::zeros_f32(&[1]));
        two.insert("b".to_string(), TensorValue::zeros_f32(&[1]));
        assert!(take_single_f32(two).is_err());

        assert!(take_single_f32(TensorMap::new()).is_err());
    }
}
