//! Named binary string comparisons shared by every entity filter.
//!
//! An [`Operator`] names one of six comparisons. A [`Comparison`] binds an
//! operator to a pattern, compiling regex patterns once so the same
//! comparison can be applied to many targets.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// A comparison between a target string and a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `==`: exact equality.
    #[serde(rename = "==")]
    Equal,
    /// `!=`: not equal.
    #[serde(rename = "!=")]
    NotEqual,
    /// `~`: target contains the pattern as a literal substring.
    #[serde(rename = "~")]
    Contains,
    /// `!~`: target does not contain the pattern.
    #[serde(rename = "!~")]
    NotContains,
    /// `R`: the pattern, as a regex, matches somewhere in the target.
    #[serde(rename = "R")]
    Matches,
    /// `!R`: the regex matches nowhere in the target.
    #[serde(rename = "!R")]
    NotMatches,
}

impl Operator {
    /// The operator's textual symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Contains => "~",
            Operator::NotContains => "!~",
            Operator::Matches => "R",
            Operator::NotMatches => "!R",
        }
    }

    /// Returns `true` for the regex operators.
    #[must_use]
    pub const fn is_regex(self) -> bool {
        matches!(self, Operator::Matches | Operator::NotMatches)
    }

    /// Returns `true` for the negated operators.
    #[must_use]
    pub const fn is_negated(self) -> bool {
        matches!(
            self,
            Operator::NotEqual | Operator::NotContains | Operator::NotMatches
        )
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            "~" => Ok(Operator::Contains),
            "!~" => Ok(Operator::NotContains),
            "R" => Ok(Operator::Matches),
            "!R" => Ok(Operator::NotMatches),
            other => Err(QueryError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An operator bound to a pattern.
#[derive(Debug, Clone)]
pub struct Comparison {
    op: Operator,
    pattern: String,
    regex: Option<Regex>,
}

impl Comparison {
    /// Bind `op` to `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidPattern`] if `op` is a regex operator
    /// and `pattern` does not compile.
    pub fn new(op: Operator, pattern: impl Into<String>) -> Result<Self, QueryError> {
        let pattern = pattern.into();
        let regex = if op.is_regex() {
            let compiled = Regex::new(&pattern).map_err(|source| QueryError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            Some(compiled)
        } else {
            None
        };
        Ok(Self { op, pattern, regex })
    }

    /// Parse the operator from its symbol, then bind it to `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownOperator`] or
    /// [`QueryError::InvalidPattern`].
    pub fn parse(symbol: &str, pattern: impl Into<String>) -> Result<Self, QueryError> {
        Self::new(symbol.parse()?, pattern)
    }

    /// The bound operator.
    #[must_use]
    pub fn op(&self) -> Operator {
        self.op
    }

    /// The bound pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Evaluate the comparison against `target`.
    #[must_use]
    pub fn test(&self, target: &str) -> bool {
        let hit = match (&self.regex, self.op) {
            // Unanchored: one match anywhere is enough.
            (Some(regex), _) => regex.is_match(target),
            (None, Operator::Equal | Operator::NotEqual) => target == self.pattern,
            (None, _) => target.contains(self.pattern.as_str()),
        };
        hit != self.op.is_negated()
    }

    /// Positional capture groups (excluding group 0) of the first regex match.
    ///
    /// Returns `None` for non-regex operators or when nothing matches.
    #[must_use]
    pub fn captures(&self, target: &str) -> Option<Vec<Option<String>>> {
        let caps = self.regex.as_ref()?.captures(target)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// Named capture groups of the first regex match that participated.
    ///
    /// Returns `None` for non-regex operators or when nothing matches.
    #[must_use]
    pub fn named_captures(&self, target: &str) -> Option<HashMap<String, String>> {
        let regex = self.regex.as_ref()?;
        let caps = regex.captures(target)?;
        Some(
            regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// One-shot comparison of `target` against `pattern`.
///
/// # Errors
///
/// Returns [`QueryError::InvalidPattern`] for an uncompilable regex.
pub fn compare(op: Operator, target: &str, pattern: &str) -> Result<bool, QueryError> {
    Ok(Comparison::new(op, pattern)?.test(target))
}
