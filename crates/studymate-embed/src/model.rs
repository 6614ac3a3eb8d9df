use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use studymate_core::error::{Error, Result};
use studymate_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

pub const BGE_M3_DIM: usize = 1024;
const BGE_M3_MAX_LEN: usize = 256;

fn unavailable<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Error + '_ {
    move |e| Error::ProviderUnavailable(format!("{context}: {e}"))
}

/// BGE-M3 sentence embeddings computed locally with candle.
///
/// Expects `tokenizer.json`, `config.json` and `pytorch_model.bin` in the
/// model directory. Vectors are mean-pooled over real tokens and
/// L2-normalized.
pub struct BgeM3Embedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
}

impl BgeM3Embedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(model_dir = %model_dir.display(), "loading BGE-M3 model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::ProviderUnavailable(format!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path).map_err(unavailable("failed to read model config"))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw_config).map_err(unavailable("failed to parse model config"))?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path).map_err(unavailable("failed to read model weights"))?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(unavailable("failed to build model"))?;

        info!("BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device, id: format!("bge-m3:d{BGE_M3_DIM}") })
    }

    fn forward(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, BGE_M3_MAX_LEN, &self.device)
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;
        let token_type_ids = Tensor::zeros((1, BGE_M3_MAX_LEN), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()
    }
}

impl Embedder for BgeM3Embedder {
    fn id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { BGE_M3_DIM }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("cannot embed empty text".into()));
        }
        let start = Instant::now();
        let v = self.forward(text).map_err(unavailable("inference failed"))?;
        if v.len() != BGE_M3_DIM {
            return Err(Error::DimensionMismatch { expected: BGE_M3_DIM, got: v.len() });
        }
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            warn!(?elapsed, "slow embedding");
        } else {
            debug!(?elapsed, "embedded text");
        }
        Ok(v)
    }
}
