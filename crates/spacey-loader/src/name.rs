// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Version-mangled identifier parsing
//!
//! Identifiers look like `<package>@<version>[/<path>]`, where the package may
//! be scoped (`@scope/name`). Registered identifiers carry an exact version,
//! requests may carry any constraint the resolver understands.

use dashmap::DashMap;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Package is `name` or `@scope/name`; the version runs to the next `/`; the
/// module path keeps its leading `/`.
static MODULE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:@[^/@]+/)?[^/@]+)@([^/]+)(/.*)?$").expect("valid identifier pattern")
});

/// The parts of a version-mangled identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedName {
    /// Package name, including the scope if any
    pub package: String,
    /// Exact version or version constraint
    pub version: String,
    /// In-package path, starting with `/`
    pub module_path: Option<String>,
}

impl ParsedName {
    /// Parse an identifier without consulting any cache
    pub fn parse(name: &str) -> Option<Self> {
        let caps = MODULE_ID.captures(name)?;
        Some(Self {
            package: caps[1].to_string(),
            version: caps[2].to_string(),
            module_path: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// Whether two names address the same module, ignoring versions
    pub fn same_module(&self, other: &ParsedName) -> bool {
        self.package == other.package && self.module_path == other.module_path
    }
}

impl fmt::Display for ParsedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package, self.version)?;
        if let Some(path) = &self.module_path {
            f.write_str(path)?;
        }
        Ok(())
    }
}

/// Memoizing identifier parser.
///
/// Keyed by the raw input string. Failed parses are cached too, so garbage
/// input is only ever matched once.
#[derive(Default)]
pub struct NameCache {
    entries: DashMap<String, Option<Arc<ParsedName>>>,
}

impl NameCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name`, reusing an earlier result for the same string
    pub fn parse(&self, name: &str) -> Option<Arc<ParsedName>> {
        if let Some(hit) = self.entries.get(name) {
            return hit.value().clone();
        }

        let parsed = ParsedName::parse(name).map(Arc::new);
        self.entries
            .entry(name.to_string())
            .or_insert(parsed)
            .value()
            .clone()
    }

    /// Whether `name` has been parsed before (successfully or not)
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of memoized inputs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been parsed yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
