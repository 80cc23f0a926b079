use crate::{
    config::{ModelConfig, Validatable},
    model_service::{ModelError, ModelService},
};
use ndarray::{Array2, ArrayView4, Ix2};
use ort::{
    execution_providers::CUDAExecutionProvider,
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Pool of ONNX Runtime sessions over the same graph, used round-robin.
#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    output_name: Arc<str>,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ModelError> {
        let num_instances = model_config.num_instances.max(1);
        let model_path = model_config.get_path();

        let sessions = (0..num_instances)
            .map(|_| {
                let mut builder = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?;
                if model_config.use_cuda {
                    // Falls back to the CPU provider when CUDA is unavailable.
                    builder = builder
                        .with_execution_providers([CUDAExecutionProvider::default().build()])?;
                }
                let session = builder.commit_from_file(&model_path)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        let output_name = {
            let session = sessions[0].lock();
            session
                .outputs
                .first()
                .map(|output| output.name.clone())
                .ok_or_else(|| ModelError::Shape("model declares no outputs".to_string()))?
        };

        tracing::info!(
            "Created {} ONNX sessions from {:?} (output `{}`, cuda requested: {})",
            num_instances,
            model_path,
            output_name,
            model_config.use_cuda
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
            output_name: output_name.into(),
        })
    }
}

impl ModelService for OrtModelService {
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError> {
        if input.shape()[0] == 0 {
            return Err(ModelError::EmptyBatch);
        }

        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index].lock();
        tracing::debug!("Handling batch of {} with session {}", input.shape()[0], index);

        let owned_buffer;
        let input_view = if input.is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.to_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)?;
        let outputs = session.run(ort::inputs![tensor_ref])?;

        let (shape, data) = outputs[&*self.output_name].try_extract_tensor::<f32>()?;

        let array = ndarray::ArrayD::from_shape_vec(shape.to_ixdyn(), data.to_vec())
            .map_err(|e| ModelError::Shape(e.to_string()))?;

        array
            .into_dimensionality::<Ix2>()
            .map_err(|e| ModelError::Shape(format!("expected N x C logits: {}", e)))
    }
}
