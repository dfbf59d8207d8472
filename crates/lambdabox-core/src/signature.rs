//! Entry-point signature check
//!
//! A lambda must open with an anonymous unary function declaration,
//! `function(<params>) {`, before anything else. This is a lexical check on
//! the raw text, not a parse: the body after the opening brace is not looked at.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^function\s*\(([^)]*)\)\s*\{").expect("signature pattern is valid")
});

/// Rejection of a lambda body whose entry point has the wrong shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid Lambda. It should start with \"function(data) {{\"")]
pub struct SignatureError;

/// Accepted entry point of a lambda body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature<'a> {
    /// Raw text between the parentheses
    pub params: &'a str,
    /// Byte offset of the opening brace of the body
    pub body_start: usize,
}

impl Signature<'_> {
    /// Parameter names, with any type annotation or default stripped
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params
            .split(',')
            .map(|p| p.split([':', '=']).next().unwrap_or_default().trim())
            .filter(|p| !p.is_empty())
    }
}

/// Check that `source` opens with `function(<params>) {`
pub fn validate(source: &str) -> Result<Signature<'_>, SignatureError> {
    let caps = SIGNATURE.captures(source).ok_or(SignatureError)?;
    let whole = caps.get(0).ok_or(SignatureError)?;
    let params = caps.get(1).map_or("", |m| m.as_str());

    Ok(Signature {
        params,
        body_start: whole.end() - 1,
    })
}
