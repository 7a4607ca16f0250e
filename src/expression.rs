//! Expression Module
//!
//! The template mini-language is deliberately small:
//!
//! - `a`, `a.b.c` dotted property paths (missing intermediates are undefined)
//! - `fn()` zero-argument calls, gated by the component's exposed-method set
//! - `!expr` boolean negation
//! - string, number, boolean and null literals
//!
//! Event handlers use a second form, `name(arg, 'literal', 3)`, parsed by
//! [`CallExpr`]. Nothing here touches the DOM; evaluation goes through the
//! [`Scope`] trait so the same code serves bindings, directives and handlers.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::value::{display, is_truthy, walk};

lazy_static! {
    /// `{{ expr }}` occurrences in text and attribute values
    static ref MUSTACHE_RE: Regex = Regex::new(r"\{\{\s*(.*?)\s*\}\}").unwrap();

    /// Dotted property path, e.g. `user.name` or `items.0`
    static ref PATH_RE: Regex =
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$\-]*(\.[A-Za-z0-9_$\-]+)*$").unwrap();

    /// Zero-argument call, e.g. `isOpen()`
    static ref ZERO_ARG_CALL_RE: Regex =
        Regex::new(r"^([A-Za-z_$][A-Za-z0-9_$\-]*)\(\s*\)$").unwrap();

    /// Handler call with an optional argument list, e.g. `remove(item, 'x')`
    static ref HANDLER_CALL_RE: Regex =
        Regex::new(r"^([A-Za-z_$][A-Za-z0-9_$\-]*)\s*(?:\((.*)\))?$").unwrap();

    static ref NUMBER_RE: Regex = Regex::new(r"^-?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// What an expression can see while it is being evaluated.
pub trait Scope {
    /// Resolve the root identifier of a path
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Invoke a zero-argument method. Implementations refuse anything that is
    /// not exposed and turn failures into `None`.
    fn call(&mut self, method: &str) -> Option<Value>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY PATHS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    pub root: String,
    pub rest: Vec<String>,
}

impl PropertyPath {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if !PATH_RE.is_match(raw) {
            return None;
        }
        let mut parts = raw.split('.').map(str::to_string);
        let root = parts.next()?;
        Some(Self {
            root,
            rest: parts.collect(),
        })
    }

    /// Resolve the whole path against a scope
    pub fn resolve(&self, scope: &dyn Scope) -> Option<Value> {
        let base = scope.lookup(&self.root)?;
        if self.rest.is_empty() {
            Some(base)
        } else {
            walk(&base, &self.rest)
        }
    }
}

impl std::fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root)?;
        for segment in &self.rest {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Path(PropertyPath),
    Call(String),
    Not(Box<Expr>),
    Literal(Value),
    /// Text that is not part of the language; always evaluates to undefined
    Invalid(String),
}

impl Expr {
    pub fn parse(raw: &str) -> Expr {
        let trimmed = raw.trim();

        if let Some(inner) = trimmed.strip_prefix('!') {
            return Expr::Not(Box::new(Expr::parse(inner)));
        }

        if let Some(literal) = parse_literal_token(trimmed) {
            return Expr::Literal(literal);
        }

        if let Some(caps) = ZERO_ARG_CALL_RE.captures(trimmed) {
            return Expr::Call(caps[1].to_string());
        }

        match PropertyPath::parse(trimmed) {
            Some(path) => Expr::Path(path),
            None => Expr::Invalid(trimmed.to_string()),
        }
    }

    pub fn evaluate(&self, scope: &mut dyn Scope) -> Option<Value> {
        match self {
            Expr::Path(path) => path.resolve(scope),
            Expr::Call(method) => scope.call(method),
            Expr::Not(inner) => {
                let value = inner.evaluate(scope);
                Some(Value::Bool(!is_truthy(value.as_ref())))
            }
            Expr::Literal(value) => Some(value.clone()),
            Expr::Invalid(_) => None,
        }
    }

    pub fn is_truthy(&self, scope: &mut dyn Scope) -> bool {
        is_truthy(self.evaluate(scope).as_ref())
    }

    /// True for `fn()` (function bindings are recomputed on every write)
    pub fn is_call(&self) -> bool {
        match self {
            Expr::Call(_) => true,
            Expr::Not(inner) => inner.is_call(),
            _ => false,
        }
    }
}

fn parse_literal_token(token: &str) -> Option<Value> {
    if let Some(s) = unquote(token) {
        return Some(Value::String(s));
    }
    match token {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }
    if NUMBER_RE.is_match(token) {
        return serde_json::from_str::<Value>(token)
            .ok()
            .or_else(|| token.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f).map(Value::Number)));
    }
    None
}

/// Strip matching single or double quotes
fn unquote(token: &str) -> Option<String> {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'\'' || first == b'"') && first == last {
            return Some(token[1..token.len() - 1].to_string());
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// MUSTACHE TEMPLATES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Binding(Expr),
}

pub fn has_mustache(text: &str) -> bool {
    MUSTACHE_RE.is_match(text)
}

/// Split text into interleaved literal and `{{ expr }}` segments
pub fn split_mustaches(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for caps in MUSTACHE_RE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if m.start() > last_end {
            segments.push(Segment::Literal(text[last_end..m.start()].to_string()));
        }
        segments.push(Segment::Binding(Expr::parse(&caps[1])));
        last_end = m.end();
    }

    if last_end < text.len() {
        segments.push(Segment::Literal(text[last_end..].to_string()));
    }

    segments
}

/// If the whole text is exactly one `{{ expr }}` (surrounding whitespace
/// allowed), return that expression.
pub fn sole_mustache(text: &str) -> Option<Expr> {
    let trimmed = text.trim();
    let caps = MUSTACHE_RE.captures(trimmed)?;
    let m = caps.get(0)?;
    if m.start() == 0 && m.end() == trimmed.len() {
        Some(Expr::parse(&caps[1]))
    } else {
        None
    }
}

/// Render segments against a scope
pub fn render(segments: &[Segment], scope: &mut dyn Scope) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Binding(expr) => out.push_str(&display(expr.evaluate(scope).as_ref())),
        }
    }
    out
}

/// The literal parts only: what an attribute shows before its first sync
pub fn static_fallback(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter_map(|s| match s {
            Segment::Literal(text) => Some(text.as_str()),
            Segment::Binding(_) => None,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLER CALLS
// ═══════════════════════════════════════════════════════════════════════════════

/// `name` or `name(arg1, arg2)` as written in `(click)="..."`
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub method: String,
    pub args: Vec<String>,
}

impl CallExpr {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_end_matches(';').trim();
        let caps = HANDLER_CALL_RE.captures(trimmed)?;
        let method = caps[1].to_string();
        let args = caps
            .get(2)
            .map(|m| split_arguments(m.as_str()))
            .unwrap_or_default();
        Some(Self { method, args })
    }
}

/// Split an argument list on top-level commas, respecting quotes and brackets
fn split_arguments(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_string: Option<char> = None;
    let mut depth = 0i32;

    for c in raw.chars() {
        if let Some(quote) = in_string {
            current.push(c);
            if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                in_string = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current.trim().to_string());
    }

    args
}

/// Resolve one handler argument token. Order, first match wins:
///
/// 1. the value captured for this position when a `*for` clone was made
/// 2. a quoted string literal
/// 3. a number, `true`, `false` or `null`
/// 4. a property path that resolves against the scope
/// 5. the raw token as a string
pub fn resolve_argument(token: &str, captured: Option<&Value>, scope: &dyn Scope) -> Value {
    if let Some(value) = captured {
        return value.clone();
    }
    if let Some(literal) = parse_literal_token(token) {
        return literal;
    }
    if let Some(value) = PropertyPath::parse(token).and_then(|p| p.resolve(scope)) {
        return value;
    }
    Value::String(token.to_string())
}
