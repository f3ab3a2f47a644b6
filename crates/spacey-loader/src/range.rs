// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Version ranges as written by JavaScript build tooling
//!
//! Comparators separated by whitespace must all hold, `||` separates
//! alternatives, `a - b` is an inclusive span and a partial bare version such
//! as `1.2` stands for `1.2.x`. Each alternative is lowered onto a
//! [`semver::VersionReq`].

use semver::{Version, VersionReq};
use std::fmt;

/// Longest operators first so `>=` is not read as `>`
const OPERATORS: [&str; 8] = ["~>", ">=", "<=", ">", "<", "=", "^", "~"];

/// A parsed range: satisfied when any alternative is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Parse a range such as `>=1.0.0 <2.0.0 || ^3.1`.
    ///
    /// An empty range, `*` and `x` accept every release.
    pub fn parse(range: &str) -> Result<Self, semver::Error> {
        let alternatives = range
            .split("||")
            .map(parse_alternative)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    /// Whether `version` satisfies at least one alternative
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The lowered alternatives
    pub fn alternatives(&self) -> &[VersionReq] {
        &self.alternatives
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, req) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(" || ")?;
            }
            write!(f, "{}", req)?;
        }
        Ok(())
    }
}

fn parse_alternative(alternative: &str) -> Result<VersionReq, semver::Error> {
    let tokens = tokenize(alternative);
    let comparators: Vec<String> = match tokens.as_slice() {
        [] => return Ok(VersionReq::STAR),
        [low, dash, high] if dash == "-" => vec![lower(">=", low), lower("<=", high)],
        _ => tokens
            .iter()
            .map(|token| {
                let (op, version) = split_operator(token);
                lower(op, version)
            })
            .collect(),
    };
    VersionReq::parse(&comparators.join(", "))
}

/// Split on whitespace and commas, keeping a detached operator (`>= 1.0.0`)
/// with the version that follows it.
fn tokenize(alternative: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();
    for word in alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|word| !word.is_empty())
    {
        pending.push_str(word);
        if !OPERATORS.contains(&word) {
            tokens.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }
    tokens
}

fn split_operator(token: &str) -> (&str, &str) {
    OPERATORS
        .iter()
        .find_map(|op| token.strip_prefix(*op).map(|rest| (*op, rest)))
        .unwrap_or(("", token))
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

/// Rewrite one comparator in the form `VersionReq` reads.
///
/// Wildcard components truncate the version, and a missing operator pins it.
/// `=1.2` in `VersionReq` already means `1.2.x`.
fn lower(op: &str, version: &str) -> String {
    let version = version.strip_prefix(['v', 'V']).unwrap_or(version);
    let (core, suffix) = version.split_at(version.find(['-', '+']).unwrap_or(version.len()));

    let parts: Vec<&str> = core.split('.').take_while(|part| !is_wildcard(part)).collect();
    if parts.is_empty() {
        return match op {
            // Nothing sorts below or above every version
            "<" | ">" => "<0.0.0-0".to_string(),
            _ => "*".to_string(),
        };
    }

    let op = match op {
        "" => "=",
        "~>" => "~",
        other => other,
    };
    format!("{}{}{}", op, parts.join("."), suffix)
}
