//! Decision extraction — line scanning over stripped source text
//!
//! The primary extraction method. Scans statement contexts (`if`/`while`/
//! `for` parens, `return` expressions, assignment right-hand sides) for
//! top-level `&&`/`||` and emits one `Decision` per compound expression with
//! at least two distinct atomic conditions.
//!
//! Scanning rules:
//! - Comments and string/char literal contents are blanked to spaces first,
//!   in place, so line numbers and paren balance survive.
//! - A candidate with unbalanced parens joins following lines, bounded by a
//!   small lookahead window; an expression that never balances is skipped,
//!   not an error.
//! - A missing or unreadable file is logged and skipped; the run continues.
//!
//! Robust against the non-standard constructs common in embedded C, at the
//! cost of precision; the syntax-tree path in [`crate::parse`] exists for
//! cross-validation and falls back to this method per file.

use crate::decision::{Condition, Decision, Operator};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

static BOOL_OP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&&|\|\|").expect("static regex"));

static KEYWORD_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:if|while|for)\s*\(").expect("static regex"));

static FUNCTION_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\w[\w\s\*]*\b(\w+)\s*\(").expect("static regex"));

const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "switch", "return", "do"];

/// Upper bound on conditions per decision. The truth table is 2^N rows;
/// anything past this is a malformed or generated construct, skipped rather
/// than enumerated.
pub const MAX_CONDITIONS: usize = 16;

/// Extractor configuration
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Continuation-line window for unbalanced expressions
    pub lookahead_lines: usize,
    /// Backward window for enclosing-function detection
    pub backscan_lines: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            lookahead_lines: 10,
            backscan_lines: 100,
        }
    }
}

/// Per-run extraction state: decision id counters and file statistics.
///
/// Counters are keyed by module tag, increment only on successful emission,
/// and never reuse or roll back a value. Scoping them to a session object
/// (rather than process globals) keeps parallel extraction runs independent.
#[derive(Debug, Default)]
pub struct ExtractionSession {
    counters: HashMap<String, u32>,
    pub files_scanned: usize,
    pub files_skipped: usize,
}

impl ExtractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next decision id for a module tag, e.g. `CBE-SM-004`.
    pub fn next_id(&mut self, tag: &str) -> String {
        let counter = self.counters.entry(tag.to_string()).or_insert(0);
        *counter += 1;
        format!("CBE-{}-{:03}", tag, counter)
    }

    /// Whether any file yielded scannable text. When false after a run, the
    /// caller has no usable input and should abort the whole run.
    pub fn any_usable_input(&self) -> bool {
        self.files_scanned > 0
    }
}

/// Short alphabetic module tag from a file's base name: first letters of the
/// first two `_`-separated words, or the first two characters of a
/// single-word stem. `safety_monitor.c` -> `SM`, `door.c` -> `DO`.
pub fn module_tag(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let words: Vec<&str> = stem.split('_').filter(|w| !w.is_empty()).collect();
    let tag: String = if words.len() >= 2 {
        words[0]
            .chars()
            .take(1)
            .chain(words[1].chars().take(1))
            .collect()
    } else {
        stem.chars().take(2).collect()
    };
    let tag = tag.to_uppercase();
    if tag.is_empty() {
        "XX".to_string()
    } else {
        tag
    }
}

/// Extract compound boolean decisions from source files.
///
/// The include directories only matter for the syntax-tree path; they are
/// accepted here so both paths share one signature.
pub fn extract<P: AsRef<Path>>(files: &[P], _include_dirs: &[P]) -> Vec<Decision> {
    let mut session = ExtractionSession::new();
    Extractor::new().extract(&mut session, files)
}

/// Scanning decision extractor
pub struct Extractor {
    config: ExtractorConfig,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extract from a list of files, skipping per-file problems.
    pub fn extract<P: AsRef<Path>>(
        &self,
        session: &mut ExtractionSession,
        files: &[P],
    ) -> Vec<Decision> {
        let mut decisions = Vec::new();
        for file in files {
            let path = file.as_ref();
            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "cannot read source file, skipping");
                    session.files_skipped += 1;
                    continue;
                }
            };
            session.files_scanned += 1;
            decisions.extend(self.extract_source(session, &path.to_string_lossy(), &text));
        }
        decisions
    }

    /// Extract from already-loaded source text. `file_label` is recorded as
    /// the `file` field of emitted decisions.
    pub fn extract_source(
        &self,
        session: &mut ExtractionSession,
        file_label: &str,
        text: &str,
    ) -> Vec<Decision> {
        let tag = module_tag(Path::new(file_label));
        let stripped = strip_comments_and_strings(text);
        let lines: Vec<&str> = stripped.lines().collect();

        let mut decisions = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i].trim();

            // Preprocessor directives are not statement candidates.
            if line.starts_with('#') || !BOOL_OP_RE.is_match(line) {
                i += 1;
                continue;
            }

            // Join continuation lines while parens stay open, bounded.
            let mut combined = line.to_string();
            let mut open = paren_balance(&combined);
            let mut j = i + 1;
            let window_end = (i + 1 + self.config.lookahead_lines).min(lines.len());
            while open > 0 && j < window_end {
                combined.push(' ');
                combined.push_str(lines[j].trim());
                open = paren_balance(&combined);
                j += 1;
            }

            let Some(expr_text) = extract_bool_expr(&combined) else {
                i += 1;
                continue;
            };

            let Some((operator, conditions)) = classify_and_split(&expr_text) else {
                i += 1;
                continue;
            };

            if conditions.len() < 2 {
                debug!(file = file_label, line = i + 1, "fewer than 2 distinct conditions, not a compound decision");
                i += 1;
                continue;
            }
            if conditions.len() > MAX_CONDITIONS {
                warn!(
                    file = file_label,
                    line = i + 1,
                    conditions = conditions.len(),
                    "decision exceeds the condition bound, skipping"
                );
                i += 1;
                continue;
            }

            let function = enclosing_function(&lines, i, self.config.backscan_lines);
            let num_conditions = conditions.len() as u32;
            decisions.push(Decision {
                id: session.next_id(&tag),
                file: file_label.to_string(),
                line: (i + 1) as u32,
                function,
                text: expr_text,
                conditions,
                operator,
                num_conditions,
            });

            // Continue past the consumed continuation lines.
            i = j.max(i + 1);
        }
        decisions
    }
}

/// Blank comments and string/char literal contents to spaces, preserving
/// line structure and total length. Quotes themselves survive so blanked
/// literals still read as tokens.
pub fn strip_comments_and_strings(text: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str,
        Chr,
    }

    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut state = State::Code;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match state {
            State::Code => match c {
                '/' if next == Some('/') => {
                    state = State::LineComment;
                    out.push_str("  ");
                    i += 2;
                }
                '/' if next == Some('*') => {
                    state = State::BlockComment;
                    out.push_str("  ");
                    i += 2;
                }
                '"' => {
                    state = State::Str;
                    out.push(c);
                    i += 1;
                }
                '\'' => {
                    state = State::Chr;
                    out.push(c);
                    i += 1;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    out.push('\n');
                } else {
                    out.push(' ');
                }
                i += 1;
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = State::Code;
                    out.push_str("  ");
                    i += 2;
                } else {
                    out.push(if c == '\n' { '\n' } else { ' ' });
                    i += 1;
                }
            }
            State::Str | State::Chr => {
                let quote = if state == State::Str { '"' } else { '\'' };
                if c == '\\' && next.is_some() {
                    out.push(' ');
                    out.push(if next == Some('\n') { '\n' } else { ' ' });
                    i += 2;
                } else if c == quote {
                    state = State::Code;
                    out.push(c);
                    i += 1;
                } else {
                    out.push(if c == '\n' { '\n' } else { ' ' });
                    i += 1;
                }
            }
        }
    }
    out
}

fn paren_balance(s: &str) -> i32 {
    let mut balance = 0;
    for c in s.chars() {
        match c {
            '(' => balance += 1,
            ')' => balance -= 1,
            _ => {}
        }
    }
    balance
}

/// Pull the boolean expression out of a statement candidate:
/// `if (...)`, `while (...)`, `for (...)`, `return ...;`, `lhs = ...;`.
fn extract_bool_expr(line: &str) -> Option<String> {
    // if/while/for: take the balanced outermost paren block.
    if let Some(m) = KEYWORD_PAREN_RE.find(line) {
        let start = m.end() - 1;
        return balanced_paren_slice(line, start);
    }

    // return <expr>; with optional enclosing parens
    if let Some(pos) = find_keyword(line, "return") {
        let rest = line[pos + "return".len()..].trim();
        let body = rest.strip_suffix(';').unwrap_or(rest).trim();
        if BOOL_OP_RE.is_match(body) {
            return Some(strip_outer_parens(body).to_string());
        }
        return None;
    }

    // Assignment RHS: first plain '=' (not ==, !=, <=, >=, ...).
    if let Some(pos) = find_plain_assign(line) {
        if let Some(semi) = line[pos + 1..].find(';') {
            let rhs = line[pos + 1..pos + 1 + semi].trim();
            if BOOL_OP_RE.is_match(rhs) {
                return Some(strip_outer_parens(rhs).to_string());
            }
        }
    }

    // Last resort: the cleaned statement itself.
    let cleaned = line.trim_end_matches([';', '{', ' ']).trim();
    if BOOL_OP_RE.is_match(cleaned) {
        return Some(cleaned.to_string());
    }
    None
}

fn balanced_paren_slice(line: &str, open_pos: usize) -> Option<String> {
    let bytes = line.as_bytes();
    let mut depth = 0i32;
    for (k, &b) in bytes.iter().enumerate().skip(open_pos) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    let inner = &line[open_pos + 1..k];
                    return Some(inner.trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn find_keyword(line: &str, keyword: &str) -> Option<usize> {
    let pos = line.find(keyword)?;
    let before_ok = pos == 0
        || !line[..pos]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
    let after = line[pos + keyword.len()..].chars().next();
    let after_ok = !after.is_some_and(|c| c.is_alphanumeric() || c == '_');
    if before_ok && after_ok {
        Some(pos)
    } else {
        None
    }
}

// A '=' that is an assignment, not part of ==, !=, <=, >=, +=, &&=, etc.
fn find_plain_assign(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'=' {
            continue;
        }
        let prev = if i > 0 { bytes[i - 1] } else { b' ' };
        let next = bytes.get(i + 1).copied().unwrap_or(b' ');
        if next == b'=' {
            continue;
        }
        if matches!(prev, b'=' | b'!' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^') {
            continue;
        }
        return Some(i);
    }
    None
}

/// Remove one layer of matched outer parentheses if they span the whole
/// expression.
pub fn strip_outer_parens(s: &str) -> &str {
    let s = s.trim();
    if !(s.starts_with('(') && s.ends_with(')')) {
        return s;
    }
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && i < s.len() - 1 {
            return s; // outer parens close before the end
        }
    }
    s[1..s.len() - 1].trim()
}

/// Split on top-level occurrences of `&&` or `||`, ignoring nested parens
/// and brackets.
pub fn split_top_level<'a>(expr: &'a str, op: &str) -> Vec<&'a str> {
    let op_bytes = op.as_bytes();
    let bytes = expr.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' => {
                depth += 1;
                i += 1;
            }
            b')' | b']' => {
                depth -= 1;
                i += 1;
            }
            _ if depth == 0 && bytes[i..].starts_with(op_bytes) => {
                // Guard against the tail of a longer run, e.g. "&&&".
                if i > 0 && bytes[i - 1] == op_bytes[0] {
                    i += 1;
                    continue;
                }
                parts.push(expr[start..i].trim());
                i += op_bytes.len();
                start = i;
            }
            _ => i += 1,
        }
    }
    parts.push(expr[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Classify the connective structure and split into atomic conditions.
///
/// Splits on top-level `&&`, then `||`, descending through one layer of
/// enclosing parens per group so that `(a && b) || c` yields the three atoms
/// a, b, c with a MIXED connective. `None` means no connective was found
/// (not a compound expression). Atoms are deduplicated by exact text with
/// first-seen order and indices.
pub fn classify_and_split(expr: &str) -> Option<(Operator, Vec<Condition>)> {
    let mut atoms = Vec::new();
    let mut has_and = false;
    let mut has_or = false;
    flatten_into(expr, &mut atoms, &mut has_and, &mut has_or);

    let operator = match (has_and, has_or) {
        (true, true) => Operator::Mixed,
        (true, false) => Operator::And,
        (false, true) => Operator::Or,
        (false, false) => return None,
    };

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
    Some((operator, conditions))
}

fn flatten_into(expr: &str, atoms: &mut Vec<String>, has_and: &mut bool, has_or: &mut bool) {
    let s = strip_outer_parens(expr);
    let and_parts = split_top_level(s, "&&");
    if and_parts.len() > 1 {
        *has_and = true;
        for part in and_parts {
            flatten_into(part, atoms, has_and, has_or);
        }
        return;
    }
    let or_parts = split_top_level(s, "||");
    if or_parts.len() > 1 {
        *has_or = true;
        for part in or_parts {
            flatten_into(part, atoms, has_and, has_or);
        }
        return;
    }
    if !s.is_empty() {
        atoms.push(s.to_string());
    }
}

/// Walk backward from the decision line for the nearest
/// function-declaration-like line. `line_idx` is 0-based.
fn enclosing_function(lines: &[&str], line_idx: usize, backscan: usize) -> String {
    let floor = line_idx.saturating_sub(backscan);
    for i in (floor..line_idx).rev() {
        if let Some(caps) = FUNCTION_DECL_RE.captures(lines[i]) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if !CONTROL_KEYWORDS.contains(&name) && !name.is_empty() {
                return name.to_string();
            }
        }
    }
    "unknown".to_string()
}
