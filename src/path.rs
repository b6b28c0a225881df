//! Route patterns and parameter extraction.
//!
//! A pattern is a `/`-separated path where a segment written as `:name`
//! captures whatever the request has in that position:
//!
//! ```text
//! /users/:id/comments/:commentId
//! /users/42/comments/7          → { id: "42", commentId: "7" }
//! ```
//!
//! Patterns without a `:` segment match by plain string equality. Captured
//! values are handed out raw: no percent-decoding, no type coercion.

use std::collections::HashMap;

use crate::error::Error;

/// A compiled route pattern. Built once at registration time.
#[derive(Clone, Debug)]
pub struct PathPattern {
    raw: String,
    /// `None` for exact patterns.
    segments: Option<Vec<Segment>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl PathPattern {
    /// Compiles `pattern`.
    ///
    /// Fails when the pattern does not start with `/`, or when a parameter
    /// segment has an empty, non-word, or repeated name.
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        if !pattern.starts_with('/') {
            return Err(Error::route(pattern, "pattern must start with `/`"));
        }
        if !pattern.contains(':') {
            return Ok(Self { raw: pattern.to_owned(), segments: None });
        }

        let mut segments = Vec::new();
        for part in pattern.split('/').skip(1) {
            let Some(name) = part.strip_prefix(':') else {
                segments.push(Segment::Literal(part.to_owned()));
                continue;
            };
            if name.is_empty() {
                return Err(Error::route(pattern, "parameter name is empty"));
            }
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::route(pattern, "parameter names may only use [A-Za-z0-9_]"));
            }
            if segments.contains(&Segment::Param(name.to_owned())) {
                return Err(Error::route(pattern, "parameter name is used twice"));
            }
            segments.push(Segment::Param(name.to_owned()));
        }

        Ok(Self { raw: pattern.to_owned(), segments: Some(segments) })
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `true` when the pattern has no parameter segments.
    pub fn is_exact(&self) -> bool {
        self.segments.is_none()
    }

    /// Matches `pathname` exactly, as a string.
    pub fn matches_exactly(&self, pathname: &str) -> bool {
        self.raw == pathname
    }

    /// Matches `pathname` against the pattern and returns the captured
    /// parameters. Exact patterns yield an empty map on equality.
    pub fn matches(&self, pathname: &str) -> Option<HashMap<String, String>> {
        let Some(segments) = &self.segments else {
            return self.matches_exactly(pathname).then(HashMap::new);
        };

        let rest = pathname.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != segments.len() {
            return None;
        }

        let mut params = HashMap::with_capacity(segments.len());
        for (segment, part) in segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_owned());
                }
            }
        }
        Some(params)
    }
}
