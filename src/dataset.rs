//! Vector dataset serialization
//!
//! The analyze run serializes its results to a JSON dataset that a later
//! coverage run (possibly a different process, much later) loads and maps
//! test results onto. The dataset is the contract between the two runs:
//! schema version, project metadata, and one entry per decision carrying the
//! truth table, minimal vectors, and independence pairs with both row ids
//! and row labels.

use crate::coverage;
use crate::decision::{Condition, Operator};
use crate::engine::{AnalysisResult, TruthRow};
use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Dataset schema version accepted by [`VectorDataset::load`]
pub const SCHEMA_VERSION: &str = "1.0";

/// Serialized independence pair with resolved row labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PairRecord {
    pub condition_index: u32,
    pub condition_text: String,
    pub row_false: u32,
    pub row_true: u32,
    pub row_false_label: String,
    pub row_true_label: String,
}

/// One decision's analysis in serialized form.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DecisionVectors {
    pub id: String,
    pub file: String,
    pub line: u32,
    pub function: String,
    pub text: String,
    pub operator: Operator,
    pub num_conditions: u32,
    pub conditions: Vec<Condition>,
    pub truth_table: Vec<TruthRow>,
    pub minimal_vectors: Vec<TruthRow>,
    /// condition index -> pairs
    pub independence_pairs: BTreeMap<u32, Vec<PairRecord>>,
    pub min_required: u32,
    pub is_achievable: bool,
}

/// Serialized result of an analyze run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VectorDataset {
    pub schema_version: String,
    pub project: String,
    pub sil_level: u32,
    /// UTC generation timestamp, e.g. `2026-02-24T12:00:00Z`
    pub generated: String,
    pub total_decisions: usize,
    /// source path -> content digest, for traceability
    #[serde(default)]
    pub source_digests: BTreeMap<String, String>,
    pub decisions: Vec<DecisionVectors>,
}

impl VectorDataset {
    /// Build a dataset from analysis results.
    pub fn from_results(results: &[AnalysisResult], project: &str, sil_level: u32) -> Self {
        let decisions: Vec<DecisionVectors> = results.iter().map(decision_vectors).collect();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            project: project.to_string(),
            sil_level,
            generated: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            total_decisions: decisions.len(),
            source_digests: BTreeMap::new(),
            decisions,
        }
    }

    /// Record content digests for the analyzed sources.
    pub fn record_digest(&mut self, file: &str, content: &str) {
        self.source_digests
            .insert(file.to_string(), source_digest(content));
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write to disk, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load from disk. A structurally invalid dataset is fatal for coverage
    /// computation; the serde diagnostic is preserved.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Dataset(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse from a JSON string with schema validation.
    pub fn from_json(content: &str) -> Result<Self> {
        let dataset: VectorDataset =
            serde_json::from_str(content).map_err(|e| Error::Dataset(e.to_string()))?;
        if !dataset.schema_version.starts_with("1.") {
            return Err(Error::Dataset(format!(
                "unsupported schema version: {}",
                dataset.schema_version
            )));
        }
        Ok(dataset)
    }

    /// All truth-table row labels across every decision. Coverage matching
    /// recognizes these; pair endpoints may lie outside the minimal set.
    pub fn known_labels(&self) -> HashSet<String> {
        self.decisions
            .iter()
            .flat_map(|d| d.truth_table.iter().map(|r| r.label.clone()))
            .collect()
    }

    /// Compute coverage against externally executed test results.
    pub fn coverage(&self, results: &coverage::TestResults) -> coverage::CoverageReport {
        coverage::compute_coverage(self, results)
    }
}

fn decision_vectors(result: &AnalysisResult) -> DecisionVectors {
    let label_of = |row_id: u32| result.decision.row_label(row_id);

    let independence_pairs: BTreeMap<u32, Vec<PairRecord>> = result
        .pairs
        .iter()
        .map(|(cond_idx, pairs)| {
            let records = pairs
                .iter()
                .map(|p| PairRecord {
                    condition_index: p.condition_index,
                    condition_text: p.condition_text.clone(),
                    row_false: p.row_false,
                    row_true: p.row_true,
                    row_false_label: label_of(p.row_false),
                    row_true_label: label_of(p.row_true),
                })
                .collect();
            (*cond_idx, records)
        })
        .collect();

    DecisionVectors {
        id: result.decision.id.clone(),
        file: result.decision.file.clone(),
        line: result.decision.line,
        function: result.decision.function.clone(),
        text: result.decision.text.clone(),
        operator: result.decision.operator,
        num_conditions: result.decision.num_conditions,
        conditions: result.decision.conditions.clone(),
        truth_table: result.truth_table.clone(),
        minimal_vectors: result.minimal_vectors.clone(),
        independence_pairs,
        min_required: result.min_required,
        is_achievable: result.is_achievable,
    }
}

/// Content digest in the project's standard form: `sha256:` plus the first
/// 8 bytes of the hash, hex encoded.
pub fn source_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("sha256:{}", hex::encode(&hasher.finalize()[..8]))
}
