//! # Promptward Scanner - Detection Contract and Engines
//!
//! Defines the uniform scanning contract every detector obeys and ships the
//! prompt-injection scanner that fuses the DeBERTa classifier with cheap
//! heuristic cues.
//!
//! ## Contract
//!
//! Every scanner, whatever its engine, returns a [`ScanResult`] holding a
//! detection flag, a calibrated confidence in [0,1], a coarse risk level,
//! optional diagnostic metadata, and the wall-clock cost of the call. The
//! flag and the risk level are pure functions of the score and threshold,
//! so downstream layers never re-derive them differently.
//!
//! ## Engine Selection
//!
//! The prompt-injection scanner picks its engine once, at construction:
//!
//! 1. **Classifier**: tokenizer and ONNX graph both configured.
//! 2. **Injected scorer**: a caller-supplied scoring function over
//!    encodings, for hosts embedding their own runtime and for tests.
//! 3. **Heuristics**: a fixed cue dictionary. Low precision; exists so the
//!    scanner degrades gracefully when the model is absent, never as a
//!    production substitute.
//!
//! Missing model artefacts demote the scanner at startup with a logged
//! cause. A *runtime* inference failure is surfaced as an error instead of
//! silently falling back, so a broken model deployment cannot masquerade
//! as a healthy low-severity scanner.

pub mod config;
pub mod heuristics;
mod models;
mod prompt_injection;
mod scanner;

pub use config::ScannerConfig;
pub use models::{Metadata, RiskLevel, ScanError, ScanOptions, ScanResult};
pub use prompt_injection::{PromptInjectionScanner, ScoreFn, PROMPT_INJECTION_SCANNER};
pub use scanner::{OutputScanner, Scanner};

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;
