#[cfg(feature = "onnx")]
use std::path::Path;

#[cfg(feature = "onnx")]
use ndarray::{Array1, Array2};

use crate::config::AlignerConfig;
#[cfg(feature = "onnx")]
use crate::config::ModelOutputLayout;
use crate::error::AlignmentError;
#[cfg(feature = "onnx")]
use crate::alignment::emission::{JointLogProbs, ModelOutput, SplitLogProbs};
use crate::pipeline::traits::RuntimeBackend;

/// Build the backend named by `config`; `table_blank_id` fills an unset joint blank id.
pub(crate) fn build_runtime_backend(
    config: &AlignerConfig,
    table_blank_id: usize,
) -> Result<Box<dyn RuntimeBackend>, AlignmentError> {
    if config.model_path.is_empty() {
        return Err(AlignmentError::runtime(
            "build runtime backend",
            "no model path configured and no runtime backend supplied",
        ));
    }

    #[cfg(feature = "onnx")]
    {
        Ok(Box::new(OnnxRuntimeBackend::load(config, table_blank_id)?))
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = table_blank_id;
        Err(AlignmentError::runtime(
            "build runtime backend",
            "ONNX runtime support is disabled; enable the `onnx` cargo feature",
        ))
    }
}

#[cfg(feature = "onnx")]
struct OnnxRuntimeBackend {
    session: std::sync::Mutex<ort::session::Session>,
    layout: ResolvedLayout,
    device_label: String,
}

#[cfg(feature = "onnx")]
enum ResolvedLayout {
    Split {
        input_name: String,
        transition_output: String,
        blank_output: String,
    },
    Joint {
        blank_id: usize,
    },
}

#[cfg(feature = "onnx")]
impl OnnxRuntimeBackend {
    fn load(config: &AlignerConfig, table_blank_id: usize) -> Result<Self, AlignmentError> {
        let execution_providers = onnx_execution_providers(config.device.as_str())?;
        let session = ort::session::Session::builder()
            .map_err(|e| AlignmentError::runtime("onnx session builder", e))?
            .with_execution_providers(execution_providers)
            .map_err(|e| AlignmentError::runtime("onnx execution providers", e))?
            .commit_from_file(Path::new(&config.model_path))
            .map_err(|e| AlignmentError::runtime("onnx model load", e))?;

        tracing::info!(
            inputs = session.inputs().len(),
            outputs = session.outputs().len(),
            model_path = %config.model_path,
            device = %config.device,
            "phoneme transition ONNX runtime loaded"
        );

        let layout = match &config.output_layout {
            ModelOutputLayout::Split {
                input_name,
                transition_output,
                blank_output,
            } => ResolvedLayout::Split {
                input_name: input_name.clone(),
                transition_output: transition_output.clone(),
                blank_output: blank_output.clone(),
            },
            ModelOutputLayout::Joint { blank_id } => ResolvedLayout::Joint {
                blank_id: blank_id.unwrap_or(table_blank_id),
            },
        };
        let device_label = parse_onnx_device(config.device.as_str())?;
        Ok(Self {
            session: std::sync::Mutex::new(session),
            layout,
            device_label: device_label.to_string(),
        })
    }

    fn run_forward(&self, samples: &[f32]) -> Result<ModelOutput, AlignmentError> {
        let input = ort::value::TensorRef::from_array_view(([1usize, samples.len()], samples))
            .map_err(|e| AlignmentError::runtime("onnx input tensor", e))?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| AlignmentError::runtime("onnx session lock", "session mutex poisoned"))?;

        match &self.layout {
            ResolvedLayout::Split {
                input_name,
                transition_output,
                blank_output,
            } => {
                let outputs = session
                    .run(ort::inputs![input_name.as_str() => input])
                    .map_err(|e| AlignmentError::runtime("onnx forward pass", e))?;
                let transitions =
                    require_output(outputs.get(transition_output.as_str()), transition_output)?;
                let (shape, data) = transitions
                    .try_extract_tensor::<f32>()
                    .map_err(|e| AlignmentError::runtime("onnx extract transitions", e))?;
                let dims: Vec<i64> = shape.iter().copied().collect();
                let (frames, vocab) = parse_frame_matrix_shape(&dims, data.len())?;
                let transition_log_probs = Array2::from_shape_vec((frames, vocab), data.to_vec())
                    .map_err(|e| AlignmentError::runtime("onnx transitions shape", e))?;

                let blank = require_output(outputs.get(blank_output.as_str()), blank_output)?;
                let (shape, data) = blank
                    .try_extract_tensor::<f32>()
                    .map_err(|e| AlignmentError::runtime("onnx extract blank", e))?;
                let dims: Vec<i64> = shape.iter().copied().collect();
                let blank_frames = parse_frame_vector_shape(&dims, data.len())?;
                if blank_frames != frames {
                    return Err(AlignmentError::invalid_input(format!(
                        "blank output covers {blank_frames} frames, transition output covers {frames}"
                    )));
                }

                Ok(ModelOutput::Split(SplitLogProbs {
                    transition_log_probs,
                    blank_log_probs: Array1::from(data.to_vec()),
                }))
            }
            ResolvedLayout::Joint { blank_id } => {
                let outputs = session
                    .run(ort::inputs![input])
                    .map_err(|e| AlignmentError::runtime("onnx forward pass", e))?;
                if outputs.len() == 0 {
                    return Err(AlignmentError::runtime(
                        "onnx forward pass",
                        "model produced no outputs",
                    ));
                }
                let (shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .map_err(|e| AlignmentError::runtime("onnx extract log-probs", e))?;
                let dims: Vec<i64> = shape.iter().copied().collect();
                let (frames, vocab) = parse_frame_matrix_shape(&dims, data.len())?;
                let log_probs = Array2::from_shape_vec((frames, vocab), data.to_vec())
                    .map_err(|e| AlignmentError::runtime("onnx log-probs shape", e))?;
                Ok(ModelOutput::Joint(JointLogProbs {
                    log_probs,
                    blank_id: *blank_id,
                }))
            }
        }
    }
}

#[cfg(feature = "onnx")]
impl RuntimeBackend for OnnxRuntimeBackend {
    fn infer(&self, samples: &[f32]) -> Result<ModelOutput, AlignmentError> {
        self.run_forward(samples)
    }

    fn device_label(&self) -> String {
        self.device_label.clone()
    }
}

#[cfg(feature = "onnx")]
fn onnx_execution_providers(
    device: &str,
) -> Result<Vec<ort::ep::ExecutionProviderDispatch>, AlignmentError> {
    match parse_onnx_device(device)? {
        "cpu" => Ok(vec![ort::ep::CPU::default().build()]),
        "cuda" => Ok(vec![
            ort::ep::CUDA::default()
                .with_device_id(0)
                .build()
                .error_on_failure(),
            ort::ep::CPU::default().build(),
        ]),
        _ => Err(AlignmentError::invalid_input(format!(
            "unsupported ONNX device '{device}', expected 'cpu' or 'cuda'"
        ))),
    }
}

#[cfg(feature = "onnx")]
fn parse_onnx_device(device: &str) -> Result<&'static str, AlignmentError> {
    if device.eq_ignore_ascii_case("cpu") {
        Ok("cpu")
    } else if device.eq_ignore_ascii_case("cuda") {
        Ok("cuda")
    } else {
        Err(AlignmentError::invalid_input(format!(
            "unsupported ONNX device '{device}', expected 'cpu' or 'cuda'"
        )))
    }
}

/// A configured output name the model does not produce.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn require_output<T>(value: Option<T>, name: &str) -> Result<T, AlignmentError> {
    value.ok_or_else(|| {
        AlignmentError::runtime("onnx forward pass", format!("model has no output '{name}'"))
    })
}

/// `[1, T, V]` or `[T, V]` to `(T, V)`, checked against the data length.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn parse_frame_matrix_shape(dims: &[i64], len: usize) -> Result<(usize, usize), AlignmentError> {
    let (frames, vocab) = match dims {
        [batch, t, v] => {
            check_unit_batch(*batch)?;
            (positive_dim(*t, "time")?, positive_dim(*v, "vocab")?)
        }
        [t, v] => (positive_dim(*t, "time")?, positive_dim(*v, "vocab")?),
        _ => {
            return Err(AlignmentError::invalid_input(format!(
                "unsupported ONNX output rank {}; expected [1, T, V] or [T, V]",
                dims.len()
            )));
        }
    };

    let expected_len = frames
        .checked_mul(vocab)
        .ok_or_else(|| AlignmentError::invalid_input("ONNX output shape is too large"))?;
    if expected_len != len {
        return Err(AlignmentError::invalid_input(format!(
            "ONNX output shape/data mismatch: shape implies {expected_len} values, got {len}"
        )));
    }
    Ok((frames, vocab))
}

/// `[1, T]` or `[T]` to `T`.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn parse_frame_vector_shape(dims: &[i64], len: usize) -> Result<usize, AlignmentError> {
    let frames = match dims {
        [batch, t] => {
            check_unit_batch(*batch)?;
            positive_dim(*t, "time")?
        }
        [t] => positive_dim(*t, "time")?,
        _ => {
            return Err(AlignmentError::invalid_input(format!(
                "unsupported ONNX blank output rank {}; expected [1, T] or [T]",
                dims.len()
            )));
        }
    };
    if frames != len {
        return Err(AlignmentError::invalid_input(format!(
            "ONNX output shape/data mismatch: shape implies {frames} values, got {len}"
        )));
    }
    Ok(frames)
}

#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn check_unit_batch(batch: i64) -> Result<(), AlignmentError> {
    if batch != 1 {
        return Err(AlignmentError::invalid_input(format!(
            "ONNX output batch size must be 1, got {batch}"
        )));
    }
    Ok(())
}

#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn positive_dim(value: i64, name: &'static str) -> Result<usize, AlignmentError> {
    if value <= 0 {
        return Err(AlignmentError::invalid_input(format!(
            "ONNX output {name} dimension must be > 0, got {value}"
        )));
    }
    Ok(value as usize)
}
