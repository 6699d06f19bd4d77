// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # MCDC — Modified Condition/Decision Coverage analysis
//!
//! Extracts compound boolean decisions from C source, builds their truth
//! tables, derives per-condition independence pairs, selects a minimal
//! covering test-vector set, and maps externally executed test results onto
//! that set to measure MC/DC coverage.
//!
//! ## Core Concept
//!
//! MC/DC requires each atomic condition in a compound decision to
//! independently affect the decision's outcome, demonstrated by a pair of
//! executions differing only in that condition. For a decision with N
//! conditions, a minimal demonstrating set has N+1 test vectors (pure
//! AND/OR) — far fewer than the 2^N exhaustive table.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mcdc::{extract, analyze_all, compute_coverage, TestResults, VectorDataset};
//!
//! // Pass 1: static analysis
//! let decisions = extract(&source_files, &include_dirs);
//! let results = analyze_all(&decisions);
//! let dataset = VectorDataset::from_results(&results, "train_door_control", 3);
//! dataset.save("MC-DC-Vectors.json")?;
//!
//! // Pass 2 (later, possibly another process): coverage evidence
//! let dataset = VectorDataset::load("MC-DC-Vectors.json")?;
//! let executed = TestResults::load("test-results.json")?;
//! let report = compute_coverage(&dataset, &executed);
//! if !report.meets_requirement {
//!     for gap in &report.gap_summary {
//!         eprintln!("gap: {}", gap);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                                                              │
//! │  SOURCE (.c)                                                 │
//! │      │                                                       │
//! │      ├──► extract(files, includes) ──► Vec<Decision>         │
//! │      │        (scanning; syntax-tree path cross-validates)   │
//! │      │                                                       │
//! │      └──► analyze_all(decisions) ──► Vec<AnalysisResult>     │
//! │               truth table + independence pairs + vectors     │
//! │                        │                                     │
//! │                        ▼                                     │
//! │              VectorDataset (JSON, schema 1.0)                │
//! │                        │                                     │
//! │   TestResults ────────►└──► compute_coverage ──► Report      │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decision ids (`CBE-<TAG>-<NNN>`) and row labels
//! (`TC-<id>-<NN>`) are stable across runs: the truth table counting order
//! is fixed (condition 0 varies slowest) and id counters are scoped to an
//! extraction session, monotonic, never reused.

// Core modules
pub mod config;
pub mod decision;
pub mod error;
pub mod formula;

// Operations
pub mod coverage;
pub mod dataset;
pub mod engine;
pub mod extract;
pub mod parse;
pub mod select;

// Re-exports
pub use config::ProjectConfig;
pub use coverage::{
    compute_coverage, CoverageReport, DecisionCoverage, PairCoverage, TestCase, TestResults,
};
pub use dataset::{source_digest, DecisionVectors, PairRecord, VectorDataset, SCHEMA_VERSION};
pub use decision::{Condition, Decision, Operator};
pub use engine::{analyze, analyze_all, AnalysisResult, IndependencePair, TruthRow};
pub use error::{Error, Result};
pub use extract::{extract, ExtractionSession, Extractor, ExtractorConfig, MAX_CONDITIONS};
pub use formula::Formula;
pub use parse::{extract_ast, AstConfig, AstExtractor};
pub use select::minimal_vectors;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
