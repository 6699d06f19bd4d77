//! Boolean formula trees for MIXED decision evaluation
//!
//! A MIXED decision cannot be evaluated by folding a single connective, so
//! the engine builds an explicit AND/OR/NOT tree over opaque condition
//! handles (0..N-1), once per decision, and evaluates that tree directly
//! against each truth assignment. No source text is consulted at evaluation
//! time.
//!
//! Construction substitutes each condition's text (longest first, so a
//! condition that contains another as a substring is replaced first) with a
//! handle token, then parses the residue with a small recursive-descent
//! parser over `&&`, `||`, `!` and parentheses. Any leftover text fails the
//! parse and the caller falls back to pure-AND semantics.

use crate::decision::Condition;
use std::collections::BTreeMap;

/// Boolean expression tree over condition handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    Var(u32),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

impl Formula {
    /// Evaluate against a complete truth assignment.
    ///
    /// Evaluation is not short-circuit in any semantic sense: the result is
    /// the decision's final truth value for the full assignment, independent
    /// of operand order. A handle missing from the assignment reads as false.
    pub fn eval(&self, assignment: &BTreeMap<u32, bool>) -> bool {
        match self {
            Formula::Var(idx) => assignment.get(idx).copied().unwrap_or(false),
            Formula::Not(inner) => !inner.eval(assignment),
            Formula::And(parts) => parts.iter().all(|p| p.eval(assignment)),
            Formula::Or(parts) => parts.iter().any(|p| p.eval(assignment)),
        }
    }

    /// Condition handles referenced by this formula.
    pub fn variables(&self) -> Vec<u32> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort_unstable();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<u32>) {
        match self {
            Formula::Var(idx) => vars.push(*idx),
            Formula::Not(inner) => inner.collect_variables(vars),
            Formula::And(parts) | Formula::Or(parts) => {
                for p in parts {
                    p.collect_variables(vars);
                }
            }
        }
    }
}

// Handle tokens use control characters as fences; stripped source text
// cannot contain them.
const VAR_OPEN: char = '\u{1}';
const VAR_CLOSE: char = '\u{2}';

/// Build the formula tree for a decision from its text and condition list.
///
/// Returns `None` when the structure cannot be reconstructed; the engine
/// treats that as the documented pure-AND fallback.
pub fn build(text: &str, conditions: &[Condition]) -> Option<Formula> {
    // Longest-first substitution avoids a shorter condition clobbering part
    // of a longer one.
    let mut by_len: Vec<&Condition> = conditions.iter().collect();
    by_len.sort_by_key(|c| std::cmp::Reverse(c.text.len()));

    let mut substituted = text.to_string();
    for cond in by_len {
        if cond.text.is_empty() {
            return None;
        }
        let token = format!("{}{}{}", VAR_OPEN, cond.index, VAR_CLOSE);
        substituted = substituted.replace(&cond.text, &token);
    }

    let tokens = tokenize(&substituted)?;
    let mut parser = TokenStream {
        tokens: &tokens,
        pos: 0,
    };
    let formula = parser.parse_or()?;
    if parser.pos != tokens.len() {
        return None;
    }
    Some(formula)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Var(u32),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            VAR_OPEN => {
                let mut j = i + 1;
                while j < chars.len() && chars[j] != VAR_CLOSE {
                    j += 1;
                }
                if j == chars.len() {
                    return None;
                }
                let digits: String = chars[i + 1..j].iter().collect();
                let idx: u32 = digits.parse().ok()?;
                tokens.push(Token::Var(idx));
                i = j + 1;
            }
            // Anything else means a condition's text was not cleanly
            // substituted; the structure is not reconstructible.
            _ => return None,
        }
    }
    Some(tokens)
}

struct TokenStream<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl TokenStream<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    // or := and ('||' and)*
    fn parse_or(&mut self) -> Option<Formula> {
        let mut parts = vec![self.parse_and()?];
        while self.peek() == Some(Token::Or) {
            self.bump();
            parts.push(self.parse_and()?);
        }
        if parts.len() == 1 {
            return parts.pop();
        }
        Some(Formula::Or(parts))
    }

    // and := unary ('&&' unary)*
    fn parse_and(&mut self) -> Option<Formula> {
        let mut parts = vec![self.parse_unary()?];
        while self.peek() == Some(Token::And) {
            self.bump();
            parts.push(self.parse_unary()?);
        }
        if parts.len() == 1 {
            return parts.pop();
        }
        Some(Formula::And(parts))
    }

    // unary := '!' unary | '(' or ')' | var
    fn parse_unary(&mut self) -> Option<Formula> {
        match self.bump()? {
            Token::Not => Some(Formula::Not(Box::new(self.parse_unary()?))),
            Token::LParen => {
                let inner = self.parse_or()?;
                if self.bump()? != Token::RParen {
                    return None;
                }
                Some(inner)
            }
            Token::Var(idx) => Some(Formula::Var(idx)),
            _ => None,
        }
    }
}
