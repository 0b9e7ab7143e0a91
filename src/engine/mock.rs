//! Mock inference engine for tests.
//!
//! Configurable the same way as [`MockAudioSource`](crate::audio::recorder):
//! builder methods set up canned behavior, and assertions read back call
//! counts and captured inputs. Kept outside `#[cfg(test)]` so downstream
//! crates can drive the pipelines without model files.

use crate::engine::{InferenceEngine, TensorMap, TensorSpec, TensorValue};
use crate::error::{Result, WakestreamError};
use std::collections::{HashMap, VecDeque};

/// How the mock produces one named output.
#[derive(Debug, Clone)]
enum MockOutput {
    /// Same tensor every call.
    Fixed(TensorValue),
    /// Scalar score sequence; the last value repeats once exhausted.
    Scripted { shape: Vec<usize>, scores: Vec<f32> },
    /// Echoes a named input tensor back out (recurrent-state passthrough).
    EchoInput { input: String },
}

/// Mock engine with scripted outputs and optional shape enforcement.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    outputs: Vec<(String, MockOutput)>,
    scripted_cursor: usize,
    expected_shapes: HashMap<String, Vec<usize>>,
    input_specs: Vec<TensorSpec>,
    output_specs: Vec<TensorSpec>,
    fail_message: Option<String>,
    calls: usize,
    captured: VecDeque<TensorMap>,
    capture_inputs: bool,
}

impl MockEngine {
    /// Creates a mock that produces no outputs until configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a named output returned unchanged on every call.
    pub fn with_output(mut self, name: &str, value: TensorValue) -> Self {
        self.outputs.push((name.to_string(), MockOutput::Fixed(value)));
        self
    }

    /// Configure a named scalar output that walks through `scores` one call
    /// at a time, repeating the final value once exhausted.
    pub fn with_scores(mut self, name: &str, shape: &[usize], scores: Vec<f32>) -> Self {
        self.outputs.push((
            name.to_string(),
            MockOutput::Scripted {
                shape: shape.to_vec(),
                scores,
            },
        ));
        self
    }

    /// Configure a named output that echoes the given input tensor.
    pub fn with_echo(mut self, output: &str, input: &str) -> Self {
        self.outputs.push((
            output.to_string(),
            MockOutput::EchoInput {
                input: input.to_string(),
            },
        ));
        self
    }

    /// Reject any call whose named input does not match `shape` exactly,
    /// with a shape-mismatch message in the style real runtimes emit.
    pub fn with_expected_shape(mut self, name: &str, shape: &[usize]) -> Self {
        self.expected_shapes.insert(name.to_string(), shape.to_vec());
        self
    }

    /// Declare input metadata for the dimension probe.
    pub fn with_input_specs(mut self, specs: Vec<TensorSpec>) -> Self {
        self.input_specs = specs;
        self
    }

    /// Declare output metadata for the dimension probe.
    pub fn with_output_specs(mut self, specs: Vec<TensorSpec>) -> Self {
        self.output_specs = specs;
        self
    }

    /// Fail every call with the given message.
    pub fn with_failure(mut self, message: &str) -> Self {
        self.fail_message = Some(message.to_string());
        self
    }

    /// Keep a copy of every call's inputs for later assertions.
    pub fn capturing_inputs(mut self) -> Self {
        self.capture_inputs = true;
        self
    }

    /// Number of `run` calls so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Oldest captured input map not yet taken.
    pub fn take_captured(&mut self) -> Option<TensorMap> {
        self.captured.pop_front()
    }

    fn format_shape(shape: &[usize]) -> String {
        let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
        format!("[{}]", dims.join(","))
    }
}

impl InferenceEngine for MockEngine {
    fn run(&mut self, inputs: TensorMap) -> Result<TensorMap> {
        self.calls += 1;

        if let Some(message) = &self.fail_message {
            return Err(WakestreamError::Inference {
                message: message.clone(),
            });
        }

        for (name, expected) in &self.expected_shapes {
            let Some(tensor) = inputs.get(name) else {
                return Err(WakestreamError::Inference {
                    message: format!("missing required input: {}", name),
                });
            };
            if tensor.shape() != expected.as_slice() {
                return Err(WakestreamError::Inference {
                    message: format!(
                        "invalid dimensions for input {}: expected shape {}, got {}",
                        name,
                        Self::format_shape(expected),
                        Self::format_shape(tensor.shape()),
                    ),
                });
            }
        }

        let mut result = TensorMap::new();
        for (name, output) in &self.outputs {
            let value = match output {
                MockOutput::Fixed(t) => t.clone(),
                MockOutput::Scripted { shape, scores } => {
                    let idx = self.scripted_cursor.min(scores.len().saturating_sub(1));
                    let score = scores.get(idx).copied().unwrap_or(0.0);
                    let count: usize = shape.iter().product();
                    TensorValue::from_f32(shape, vec![score; count])?
                }
                MockOutput::EchoInput { input } => {
                    inputs
                        .get(input)
                        .cloned()
                        .ok_or_else(|| WakestreamError::Inference {
                            message: format!("echo source input missing: {}", input),
                        })?
                }
            };
            result.insert(name.clone(), value);
        }

        if self
            .outputs
            .iter()
            .any(|(_, o)| matches!(o, MockOutput::Scripted { .. }))
        {
            self.scripted_cursor += 1;
        }

        if self.capture_inputs {
            self.captured.push_back(inputs);
        }

        Ok(result)
    }

    fn input_specs(&self) -> Vec<TensorSpec> {
        self.input_specs.clone()
    }

    fn output_specs(&self) -> Vec<TensorSpec> {
        self.output_specs.clone()
    }
}
