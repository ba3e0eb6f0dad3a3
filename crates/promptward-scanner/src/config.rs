//! # Scanner Configuration
//!
//! A plain record passed through construction; nothing here is process
//! global. The environment ingestion below is a convenience for hosts that
//! configure through variables, not an architectural commitment; embedding
//! hosts populate the record directly.
//!
//! | Field | Env var | Default |
//! |-------|---------|---------|
//! | `deberta_spm_path` | `DEBERTA_SPM_PATH` | unset |
//! | `deberta_max_len` | `DEBERTA_MAX_LEN` | 512 |
//! | `deberta_cls_id` | `DEBERTA_CLS_ID` | unset |
//! | `deberta_sep_id` | `DEBERTA_SEP_ID` | unset |
//! | `deberta_pad_id` | `DEBERTA_PAD_ID` | unset |
//! | `deberta_mask_id` | `DEBERTA_MASK_ID` | unset |
//! | `deberta_unk_id` | `DEBERTA_UNK_ID` | unset |
//! | `pi_threshold` | `PI_THRESHOLD` | 0.5 |
//! | `pi_onnx_path` | `PI_ONNX_PATH` | unset |
//! | `pi_onnx_repo` | `PI_ONNX_REPO` | ProtectAI checkpoint |
//! | `pi_onnx_revision` | `PI_ONNX_REVISION` | `main` |
//! | `pi_onnx_filename` | `PI_ONNX_FILENAME` | `model.onnx` |
//! | `pi_onnx_local_path` | `PI_ONNX_LOCAL_PATH` | unset |
//!
//! The tokenizer is enabled only when the model path and all five special
//! IDs are present. The remote locator fields describe where a deployment
//! tool can fetch the graph; this crate never downloads anything.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use promptward_tokenizer::SpecialTokens;

/// Construction-time settings for the prompt-injection scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Path to the binary SentencePiece model.
    pub deberta_spm_path: Option<PathBuf>,

    /// Default tokenizer sequence length.
    pub deberta_max_len: usize,

    /// `[CLS]` token ID.
    pub deberta_cls_id: Option<i32>,

    /// `[SEP]` token ID.
    pub deberta_sep_id: Option<i32>,

    /// `[PAD]` token ID.
    pub deberta_pad_id: Option<i32>,

    /// `[MASK]` token ID.
    pub deberta_mask_id: Option<i32>,

    /// `[UNK]` token ID.
    pub deberta_unk_id: Option<i32>,

    /// Default detection threshold.
    pub pi_threshold: f32,

    /// Local classifier graph file.
    pub pi_onnx_path: Option<PathBuf>,

    /// Remote model repository (informational; never fetched here).
    pub pi_onnx_repo: String,

    /// Remote model revision.
    pub pi_onnx_revision: String,

    /// Remote model filename.
    pub pi_onnx_filename: String,

    /// Where a deployment tool placed the fetched graph, if anywhere.
    pub pi_onnx_local_path: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            deberta_spm_path: None,
            deberta_max_len: 512,
            deberta_cls_id: None,
            deberta_sep_id: None,
            deberta_pad_id: None,
            deberta_mask_id: None,
            deberta_unk_id: None,
            pi_threshold: 0.5,
            pi_onnx_path: None,
            pi_onnx_repo: "ProtectAI/deberta-v3-base-prompt-injection-v2".to_string(),
            pi_onnx_revision: "main".to_string(),
            pi_onnx_filename: "model.onnx".to_string(),
            pi_onnx_local_path: None,
        }
    }
}

impl ScannerConfig {
    /// Reads the documented environment variables over the defaults.
    ///
    /// Unparsable numeric values are ignored with a warning rather than
    /// failing startup; a misconfigured scanner still loads and runs on
    /// its fallback engine.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = env_path("DEBERTA_SPM_PATH") {
            config.deberta_spm_path = Some(path);
        }
        if let Some(value) = env_parse::<usize>("DEBERTA_MAX_LEN") {
            config.deberta_max_len = value;
        }
        config.deberta_cls_id = env_parse::<i32>("DEBERTA_CLS_ID");
        config.deberta_sep_id = env_parse::<i32>("DEBERTA_SEP_ID");
        config.deberta_pad_id = env_parse::<i32>("DEBERTA_PAD_ID");
        config.deberta_mask_id = env_parse::<i32>("DEBERTA_MASK_ID");
        config.deberta_unk_id = env_parse::<i32>("DEBERTA_UNK_ID");
        if let Some(value) = env_parse::<f32>("PI_THRESHOLD") {
            config.pi_threshold = value;
        }
        if let Some(path) = env_path("PI_ONNX_PATH") {
            config.pi_onnx_path = Some(path);
        }
        if let Ok(value) = std::env::var("PI_ONNX_REPO") {
            config.pi_onnx_repo = value;
        }
        if let Ok(value) = std::env::var("PI_ONNX_REVISION") {
            config.pi_onnx_revision = value;
        }
        if let Ok(value) = std::env::var("PI_ONNX_FILENAME") {
            config.pi_onnx_filename = value;
        }
        if let Some(path) = env_path("PI_ONNX_LOCAL_PATH") {
            config.pi_onnx_local_path = Some(path);
        }

        config
    }

    /// The special-token record, if all five IDs are configured.
    pub fn special_tokens(&self) -> Option<SpecialTokens> {
        Some(SpecialTokens::new(
            self.deberta_pad_id?,
            self.deberta_cls_id?,
            self.deberta_sep_id?,
            self.deberta_unk_id?,
            self.deberta_mask_id?,
        ))
    }

    /// Populates the tokenizer fields for the DeBERTa-v3-base checkpoint.
    pub fn with_deberta_v3_defaults(mut self, spm_path: impl Into<PathBuf>) -> Self {
        let specials = SpecialTokens::deberta_v3();
        self.deberta_spm_path = Some(spm_path.into());
        self.deberta_pad_id = Some(specials.pad);
        self.deberta_cls_id = Some(specials.cls);
        self.deberta_sep_id = Some(specials.sep);
        self.deberta_unk_id = Some(specials.unk);
        self.deberta_mask_id = Some(specials.mask);
        self
    }

    /// The classifier graph location: explicit path first, then wherever a
    /// deployment tool recorded the fetched copy.
    pub fn classifier_path(&self) -> Option<&PathBuf> {
        self.pi_onnx_path
            .as_ref()
            .or(self.pi_onnx_local_path.as_ref())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name).map(PathBuf::from)
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
