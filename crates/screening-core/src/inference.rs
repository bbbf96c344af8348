//! ONNX model loading and inference via the `ort` crate.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::triage::RiskScore;

/// Anything that turns a preprocessed (1, 224, 224, 3) tensor into a risk score.
pub trait RiskScorer {
    fn score(&self, input: &Array4<f32>) -> Result<RiskScore>;
}

/// Binary classifier exported to ONNX with a single sigmoid output.
pub struct RiskModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl RiskModel {
    /// Load the model once at start-up. Failure here is fatal for the caller.
    pub fn load(model_path: &Path) -> Result<Self> {
        let session = Session::builder()
            .and_then(|builder| builder.with_intra_threads(4))
            .and_then(|builder| builder.commit_from_file(model_path))
            .with_context(|| format!("failed to load model from {}", model_path.display()))?;

        // Keras exports name their tensors after the layers, so read them
        // from the graph rather than hard-coding.
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| anyhow!("model declares no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| anyhow!("model declares no outputs"))?;

        log::debug!("model input '{input_name}', output '{output_name}'");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl RiskScorer for RiskModel {
    fn score(&self, input: &Array4<f32>) -> Result<RiskScore> {
        let input_tensor = TensorRef::from_array_view(input)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("lock error: {e}"))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        let output_array = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;
        let raw = output_array
            .iter()
            .next()
            .copied()
            .ok_or_else(|| anyhow!("model produced an empty output"))?;

        RiskScore::new(raw)
    }
}
