//! Token counting with vendor-specific tokenizers
//!
//! Prompt budgets are checked against the tokenizer of the model that will
//! actually run the extraction: Mistral-family models use their HuggingFace
//! tokenizer, everything else goes through tiktoken. Counting is advisory —
//! any tokenizer failure logs and reports zero so the pipeline never stalls
//! on a budget check.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use tiktoken_rs::CoreBPE;
use tokenizers::Tokenizer;
use tracing::warn;

/// Boilerplate the prompt builder appends to every request so the model
/// answers with schema-conforming JSON. Counted here because it is part of
/// what is actually sent.
pub const JSON_FORMAT_INSTRUCTIONS: &str = r#"The output should be formatted as a JSON instance that conforms to the JSON schema below.

As an example, for the schema {"properties": {"foo": {"title": "Foo", "description": "a list of strings", "type": "array", "items": {"type": "string"}}}, "required": ["foo"]}
the object {"foo": ["bar", "baz"]} is a well-formatted instance of the schema. The object {"properties": {"foo": ["bar", "baz"]}} is not well-formatted.

Here is the output schema:
```
{schema}
```"#;

/// HuggingFace repo for the Mistral fallback tokenizer. Mistral checkpoints
/// share a vocabulary, so one tokenizer serves the whole family.
const MISTRAL_TOKENIZER_REPO: &str = "mistralai/Mistral-7B-v0.1";

/// Model vendor, used to pick the tokenizer family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    OpenAi,
    Google,
    Mistral,
    /// Anything unrecognized counts via tiktoken, same as the hosted APIs.
    Other,
}

impl Vendor {
    /// Parse a vendor label. Never fails: unknown vendors take the tiktoken
    /// path, which is the right default for hosted models.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "openai" | "azure" => Vendor::OpenAi,
            "google" | "palm" | "gemini" => Vendor::Google,
            "mistral" | "mistralai" => Vendor::Mistral,
            _ => Vendor::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai",
            Vendor::Google => "google",
            Vendor::Mistral => "mistral",
            Vendor::Other => "other",
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count the tokens of `text` plus the JSON format instructions, using the
/// tokenizer for `vendor`/`model`.
///
/// Returns 0 on any tokenizer failure (unknown model name, hub download
/// failure, malformed tokenizer file). The failure is logged, never raised:
/// token counts feed reporting and budget heuristics, not correctness.
pub fn count_tokens(text: &str, vendor: Vendor, model: &str) -> usize {
    let full = format!("{text}{JSON_FORMAT_INSTRUCTIONS}");

    let counted = match vendor {
        Vendor::Mistral => count_mistral(&full),
        _ => count_tiktoken(&full, model),
    };

    match counted {
        Ok(n) => n,
        Err(err) => {
            warn!(vendor = %vendor, model, error = %err, "token count failed, reporting 0");
            0
        }
    }
}

// ---------------------------------------------------------------------------
// tiktoken path (OpenAI-family and default)
// ---------------------------------------------------------------------------

/// Loaded BPE instances keyed by model name. Building a CoreBPE is expensive,
/// and the pipeline counts every prompt it sends.
static BPE_CACHE: Lazy<Mutex<HashMap<String, Arc<CoreBPE>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn bpe_for_model(model: &str) -> Result<Arc<CoreBPE>> {
    let mut cache = BPE_CACHE.lock();
    if let Some(bpe) = cache.get(model) {
        return Ok(Arc::clone(bpe));
    }
    let bpe = Arc::new(tiktoken_rs::get_bpe_from_model(model)?);
    cache.insert(model.to_string(), Arc::clone(&bpe));
    Ok(bpe)
}

fn count_tiktoken(text: &str, model: &str) -> Result<usize> {
    let bpe = bpe_for_model(model)?;
    Ok(bpe.encode_ordinary(text).len())
}

// ---------------------------------------------------------------------------
// HuggingFace path (Mistral)
// ---------------------------------------------------------------------------

/// Mistral tokenizer, fetched once per process. The hub client resolves from
/// the local cache first, so only the first run on a machine hits the network.
static MISTRAL_TOKENIZER: OnceCell<Tokenizer> = OnceCell::new();

fn mistral_tokenizer() -> Result<&'static Tokenizer> {
    MISTRAL_TOKENIZER.get_or_try_init(|| {
        let api = hf_hub::api::sync::Api::new()?;
        let path = api.model(MISTRAL_TOKENIZER_REPO.to_string()).get("tokenizer.json")?;
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", path.display()))
    })
}

fn count_mistral(text: &str) -> Result<usize> {
    let tokenizer = mistral_tokenizer()?;
    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| anyhow!("encoding failed: {e}"))?;
    Ok(encoding.get_ids().len())
}
