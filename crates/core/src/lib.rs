//! Core library for docsift
//!
//! This crate implements the **Functional Core** of the docsift application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The docsift project uses a three-crate architecture:
//!
//! - **`docsift_core`** (this crate): Pure transformation functions with zero I/O
//! - **`pdf`**: Layout decoding of PDF bytes into positioned, styled text runs
//! - **`docsift`**: I/O operations, model loading and orchestration (the Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O operations, no external state mutations
//! - **Deterministic**: Behavior is predictable and reproducible
//! - **Testable**: Can be tested with simple fixture data, no mocking required
//!
//! # Pipeline
//!
//! ```text
//! TextRun[]  ->  LineGroup[]  ->  FeatureRow[]  ->  FeatureMatrix  ->  Label[]
//!   (pdf)         features          features        normalize        classify
//!
//! LabeledRow[] (all documents)  ->  SectionBlock[]  ->  Selection  ->  Report
//!                                     sections             mmr          report
//! ```
//!
//! # Module Organization
//!
//! - [`text`]: Text cleaning and the ignore rules for bullets and artifacts
//! - [`features`]: Line grouping and raw feature rows
//! - [`normalize`]: Per-document feature normalization and the classifier matrix
//! - [`classify`]: Heading labels, the classifier capability and a tree-ensemble model
//! - [`sections`]: Section assembly and per-document outlines
//! - [`embed`]: Vector helpers and the offline hashing embedder
//! - [`mmr`]: Maximal Marginal Relevance selection
//! - [`request`]: The persona/task request model
//! - [`report`]: The output report model
//! - [`config`]: Pipeline settings parsed from TOML

use thiserror::Error;

pub mod classify;
pub mod config;
pub mod embed;
pub mod features;
pub mod mmr;
pub mod normalize;
pub mod report;
pub mod request;
pub mod sections;
pub mod text;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Document {0} produced no usable text rows")]
    EmptyDocument(String),
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Invalid classifier model: {0}")]
    InvalidModel(String),
    #[error("Unknown label: {0}")]
    UnknownLabel(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}
