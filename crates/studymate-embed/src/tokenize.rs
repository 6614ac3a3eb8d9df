use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use studymate_core::error::{Error, Result};

/// Padding token id of the XLM-RoBERTa vocabulary.
const PAD_ID: u32 = 1;

/// Tokenize one text into `[1, max_len]` id and mask tensors, truncating or
/// padding as needed.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer
        .encode(text, true)
        .map_err(|e| Error::ProviderUnavailable(format!("tokenization failed: {e}")))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    ids.truncate(max_len);
    mask.truncate(max_len);
    ids.resize(max_len, PAD_ID);
    mask.resize(max_len, 0);
    let to_tensor = |v: Vec<u32>| -> Result<Tensor> {
        Tensor::from_vec(v, (1, max_len), device).map_err(|e| Error::ProviderUnavailable(e.to_string()))
    };
    Ok((to_tensor(ids)?, to_tensor(mask)?))
}
