//! screening-core - shared library for retinal cardiac risk screening.
//!
//! Provides image preprocessing, ONNX inference, risk triage, screening
//! orchestration, report formatting and dataset splitting used by the CLI.

pub mod inference;
pub mod preprocess;
pub mod report;
pub mod screen;
pub mod split;
pub mod triage;
