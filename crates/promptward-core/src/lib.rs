//! # Promptward Core
//!
//! Admission-layer surface of the prompt-injection scanning pipeline.
//! Multiplexes any number of scanners behind one call and folds their
//! verdicts into a single `Allow`/`Review`/`Block` decision.
//!
//! ## Pipeline
//!
//! | Stage | Component | Produces |
//! |-------|-----------|----------|
//! | Detection | `promptward-scanner` | Per-scanner `ScanResult` |
//! | Collection | [`ScannerRegistry`] | Name-keyed result map |
//! | Aggregation | [`aggregate`](aggregate::aggregate) | Decision, findings, advisory signals |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          PROMPTWARD                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │                     ┌────────────────┐                       │
//! │                     │      Ward      │  ← Admission Facade   │
//! │                     └───────┬────────┘                       │
//! │                             │                                │
//! │              ┌──────────────┴──────────────┐                 │
//! │              ▼                             ▼                 │
//! │    ┌──────────────────┐          ┌──────────────────┐        │
//! │    │ ScannerRegistry  │          │   Aggregation    │        │
//! │    │  (input kind)    │─results─▶│  Allow / Review  │        │
//! │    │  name → scanner  │          │     / Block      │        │
//! │    └────────┬─────────┘          └──────────────────┘        │
//! │             │                                                │
//! │             ▼                                                │
//! │    ┌──────────────────┐                                      │
//! │    │ PromptInjection  │  + any registered scanner            │
//! │    │     Scanner      │                                      │
//! │    └──────────────────┘                                      │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use promptward_core::{aggregate::Decision, Ward};
//! use promptward_scanner::{PromptInjectionScanner, ScannerConfig, ScanOptions};
//!
//! let scanner = Arc::new(PromptInjectionScanner::new(ScannerConfig::default()));
//! let ward = Ward::builder().scanner(scanner).build();
//!
//! let report = ward.analyze("What is the weather today?", &ScanOptions::default());
//! assert_eq!(report.decision, Decision::Allow);
//! ```
//!
//! ## Failure Policy
//!
//! One broken scanner never fails a batch: the registry converts the
//! failure into an error-carrying result, and aggregation turns an
//! otherwise clean request into `Review` because an inconclusive scan is
//! not a safe one.

pub mod aggregate;
pub mod registry;
mod ward;

pub use aggregate::{AggregateReport, Decision, Finding, Severity};
pub use registry::{OutputScannerRegistry, ScannerRegistry};
pub use ward::{Ward, WardBuilder};

// Re-export the contract types callers hold results in.
pub use promptward_scanner::{
    Metadata, OutputScanner, RiskLevel, ScanError, ScanOptions, ScanResult, Scanner,
};
