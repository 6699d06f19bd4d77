//! Syntax-tree decision extraction via tree-sitter
//!
//! Secondary extraction path for cross-validating the scanning method.
//! Optionally preprocesses each file with an external `cc -E` call (bounded
//! by a timeout) before parsing; any preprocessing or parse failure degrades
//! that one file to the scanning path in [`crate::extract`]. Failures are
//! logged, never fatal.

use crate::decision::{Condition, Decision, Operator};
use crate::error::{Error, Result};
use crate::extract::{module_tag, ExtractionSession, Extractor};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

static LINEMARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^#\s+(\d+)\s+"([^"]*)""#).expect("static regex"));

/// Syntax-tree extractor configuration
#[derive(Debug, Clone)]
pub struct AstConfig {
    /// Run the external preprocessor before parsing
    pub preprocess: bool,
    /// Preprocessor executable
    pub compiler: String,
    /// Kill the preprocessor after this long and degrade to raw text
    pub timeout: Duration,
}

impl Default for AstConfig {
    fn default() -> Self {
        Self {
            preprocess: false,
            compiler: "cc".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Extract decisions using the syntax-tree path with per-file fallback.
pub fn extract_ast<P: AsRef<Path>>(files: &[P], include_dirs: &[P]) -> Vec<Decision> {
    let mut session = ExtractionSession::new();
    let dirs: Vec<PathBuf> = include_dirs.iter().map(|d| d.as_ref().to_path_buf()).collect();
    AstExtractor::new().extract(&mut session, files, &dirs)
}

/// Tree-sitter based decision extractor
pub struct AstExtractor {
    config: AstConfig,
}

impl Default for AstExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl AstExtractor {
    pub fn new() -> Self {
        Self {
            config: AstConfig::default(),
        }
    }

    pub fn with_config(config: AstConfig) -> Self {
        Self { config }
    }

    /// Extract from a list of files. Unreadable files are skipped; files the
    /// parser cannot handle degrade to the scanning extractor.
    pub fn extract<P: AsRef<Path>>(
        &self,
        session: &mut ExtractionSession,
        files: &[P],
        include_dirs: &[PathBuf],
    ) -> Vec<Decision> {
        let mut decisions = Vec::new();
        for file in files {
            let path = file.as_ref();
            let raw = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "cannot read source file, skipping");
                    session.files_skipped += 1;
                    continue;
                }
            };
            session.files_scanned += 1;
            let label = path.to_string_lossy().to_string();

            let source = if self.config.preprocess {
                match self.preprocess(path, include_dirs) {
                    Some(preprocessed) => realign_preprocessed(&preprocessed, path),
                    None => {
                        debug!(file = %path.display(), "preprocessing failed, parsing raw text");
                        raw.clone()
                    }
                }
            } else {
                raw.clone()
            };

            match parse_decisions(session, &label, &source) {
                Ok(found) => decisions.extend(found),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "syntax-tree parse failed, using scanning extraction");
                    decisions.extend(Extractor::new().extract_source(session, &label, &raw));
                }
            }
        }
        decisions
    }

    // Run `cc -E` with a bounded timeout, writing to a temp file so a large
    // translation unit cannot stall on a full pipe. Any failure returns None.
    fn preprocess(&self, path: &Path, include_dirs: &[PathBuf]) -> Option<String> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "src".to_string());
        let out_path = std::env::temp_dir().join(format!(
            "mcdc-pp-{}-{}.i",
            std::process::id(),
            stem
        ));

        let mut cmd = Command::new(&self.config.compiler);
        cmd.arg("-E").arg("-std=c11");
        for dir in include_dirs {
            cmd.arg("-I").arg(dir);
        }
        cmd.arg(path).arg("-o").arg(&out_path);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(compiler = %self.config.compiler, error = %e, "preprocessor not runnable");
                return None;
            }
        };

        let deadline = Instant::now() + self.config.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!(file = %path.display(), "preprocessor timed out");
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = std::fs::remove_file(&out_path);
                        return None;
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
                Err(e) => {
                    debug!(error = %e, "preprocessor wait failed");
                    let _ = std::fs::remove_file(&out_path);
                    return None;
                }
            }
        };

        let text = if status.success() {
            std::fs::read_to_string(&out_path).ok()
        } else {
            debug!(file = %path.display(), %status, "preprocessor exited nonzero");
            None
        };
        let _ = std::fs::remove_file(&out_path);
        text
    }
}

/// Re-place preprocessed lines at their original line numbers using the
/// `# <line> "<file>"` markers, dropping lines pulled in from other files.
/// Keeps decision line numbers meaningful after `cc -E`.
fn realign_preprocessed(output: &str, original: &Path) -> String {
    let target = original.file_name().map(|n| n.to_string_lossy().to_string());
    let mut lines: Vec<String> = Vec::new();
    let mut in_target = false;
    let mut next_line: usize = 0;

    for line in output.lines() {
        if let Some(caps) = LINEMARKER_RE.captures(line) {
            next_line = caps[1].parse().unwrap_or(0);
            let marker_file = Path::new(&caps[2])
                .file_name()
                .map(|n| n.to_string_lossy().to_string());
            in_target = marker_file == target;
            continue;
        }
        if in_target && next_line >= 1 {
            while lines.len() + 1 < next_line {
                lines.push(String::new());
            }
            if lines.len() + 1 == next_line {
                lines.push(line.to_string());
            }
            next_line += 1;
        }
    }
    lines.join("\n")
}

struct RawDecision {
    line: u32,
    function: String,
    text: String,
    operator: Operator,
    conditions: Vec<Condition>,
}

fn parse_decisions(
    session: &mut ExtractionSession,
    file_label: &str,
    source: &str,
) -> Result<Vec<Decision>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c::LANGUAGE.into())
        .map_err(|e| Error::Extract(format!("failed to load C grammar: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::Extract("parser returned no tree".into()))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(Error::Extract(format!(
            "{}: source has syntax errors",
            file_label
        )));
    }

    let mut found = Vec::new();
    visit(root, source, "unknown", &mut found);

    let tag = module_tag(Path::new(file_label));
    Ok(found
        .into_iter()
        .map(|raw| {
            let num_conditions = raw.conditions.len() as u32;
            Decision {
                id: session.next_id(&tag),
                file: file_label.to_string(),
                line: raw.line,
                function: raw.function,
                text: raw.text,
                conditions: raw.conditions,
                operator: raw.operator,
                num_conditions,
            }
        })
        .collect())
}

fn visit(node: Node, source: &str, current_fn: &str, out: &mut Vec<RawDecision>) {
    let own_name;
    let func = if node.kind() == "function_definition" {
        own_name = function_name(node, source).unwrap_or_else(|| "unknown".to_string());
        own_name.as_str()
    } else {
        current_fn
    };

    let candidate = match node.kind() {
        "if_statement" | "while_statement" | "for_statement" => {
            node.child_by_field_name("condition")
        }
        "return_statement" => node.named_child(0),
        "assignment_expression" => node.child_by_field_name("right"),
        "init_declarator" => node.child_by_field_name("value"),
        _ => None,
    };

    if let Some(cand) = candidate {
        if let Some(raw) = compound_decision(cand, source, func) {
            out.push(raw);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, func, out);
    }
}

fn compound_decision(node: Node, source: &str, function: &str) -> Option<RawDecision> {
    let expr = unwrap_parens(node);
    connective_op(expr, source)?;

    let mut atoms: Vec<String> = Vec::new();
    let mut has_and = false;
    let mut has_or = false;
    collect_atoms(expr, source, &mut atoms, &mut has_and, &mut has_or);

    let mut conditions: Vec<Condition> = Vec::new();
    for text in atoms {
        if conditions.iter().any(|c| c.text == text) {
            continue;
        }
        conditions.push(Condition {
            index: conditions.len() as u32,
            text,
        });
    }
    if conditions.len() < 2 || conditions.len() > crate::extract::MAX_CONDITIONS {
        return None;
    }

    let operator = match (has_and, has_or) {
        (true, true) => Operator::Mixed,
        (true, false) => Operator::And,
        (false, true) => Operator::Or,
        (false, false) => return None,
    };

    Some(RawDecision {
        line: expr.start_position().row as u32 + 1,
        function: function.to_string(),
        text: node_text(expr, source),
        operator,
        conditions,
    })
}

fn collect_atoms(
    node: Node,
    source: &str,
    atoms: &mut Vec<String>,
    has_and: &mut bool,
    has_or: &mut bool,
) {
    let node = unwrap_parens(node);
    match connective_op(node, source) {
        Some("&&") => *has_and = true,
        Some("||") => *has_or = true,
        _ => {
            atoms.push(node_text(node, source));
            return;
        }
    }
    if let Some(left) = node.child_by_field_name("left") {
        collect_atoms(left, source, atoms, has_and, has_or);
    }
    if let Some(right) = node.child_by_field_name("right") {
        collect_atoms(right, source, atoms, has_and, has_or);
    }
}

fn connective_op<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    if node.kind() != "binary_expression" {
        return None;
    }
    let op = node.child_by_field_name("operator")?;
    let text = op.utf8_text(source.as_bytes()).ok()?;
    match text {
        "&&" | "||" => Some(text),
        _ => None,
    }
}

fn unwrap_parens(node: Node) -> Node {
    let mut current = node;
    while current.kind() == "parenthesized_expression" {
        match current.named_child(0) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

fn node_text(node: Node, source: &str) -> String {
    node.utf8_text(source.as_bytes())
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn function_name(node: Node, source: &str) -> Option<String> {
    let mut declarator = node.child_by_field_name("declarator")?;
    // Descend through pointer/function declarators to the identifier.
    loop {
        if declarator.kind() == "identifier" {
            return Some(node_text(declarator, source));
        }
        match declarator.child_by_field_name("declarator") {
            Some(inner) => declarator = inner,
            None => return None,
        }
    }
}
