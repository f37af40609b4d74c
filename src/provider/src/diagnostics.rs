// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Accumulating, field-scoped error reporting.
//!
//! Configuration problems are reported in bulk rather than one at a
//! time: validation keeps going after the first failure so a user with
//! three missing attributes fixes all three in one round.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single user-facing problem, optionally scoped to the attribute
/// that caused it.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub attribute: Option<String>,
    pub summary: String,
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.attribute {
            Some(attribute) => write!(f, "{} ({}): {}", self.summary, attribute, self.detail),
            None => write!(f, "{}: {}", self.summary, self.detail),
        }
    }
}

/// An ordered collection of [`Diagnostic`]s.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    diags: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn add_error(&mut self, summary: &str, detail: &str) {
        self.diags.push(Diagnostic {
            severity: Severity::Error,
            attribute: None,
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    pub fn add_attribute_error(&mut self, attribute: &str, summary: &str, detail: &str) {
        self.diags.push(Diagnostic {
            severity: Severity::Error,
            attribute: Some(attribute.into()),
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut sep = "";
        for diag in &self.diags {
            write!(f, "{}{}", sep, diag)?;
            sep = "; ";
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diags.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_in_order() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());
        diags.add_attribute_error("region", "missing region", "region is required");
        diags.add_error("bad config", "something else");
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 2);
        let attributes: Vec<_> = diags.iter().map(|d| d.attribute.clone()).collect();
        assert_eq!(attributes, vec![Some("region".to_string()), None]);
    }

    #[test]
    fn display_is_field_scoped() {
        let mut diags = Diagnostics::new();
        diags.add_attribute_error("instance", "missing instance", "instance is required");
        assert_eq!(
            diags.to_string(),
            "missing instance (instance): instance is required"
        );
    }
}
