// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Version-constrained module resolution
//!
//! Maps a request such as `@scope/pkg@^1.2.0/lib/x.js` to the exact identifier
//! of the best registered module. Results are memoized per request string.

use crate::error::ResolveError;
use crate::name::{NameCache, ParsedName};
use crate::range::VersionRange;
use crate::registry::ModuleRegistry;
use dashmap::DashMap;
use semver::Version;
use tracing::{debug, warn};

/// A registered module sharing the request's package and path
#[derive(Debug, Clone)]
struct Candidate {
    id: String,
    version: String,
}

/// Module resolver
pub struct Resolver {
    /// Identifier parser shared by requests and registered ids
    names: NameCache,
    /// Request string -> chosen exact identifier; entries never change
    lookups: DashMap<String, String>,
    /// Take a lone candidate without checking its version
    single_candidate_shortcut: bool,
}

impl Resolver {
    /// Create a new resolver
    pub fn new(single_candidate_shortcut: bool) -> Self {
        Self {
            names: NameCache::new(),
            lookups: DashMap::new(),
            single_candidate_shortcut,
        }
    }

    /// The identifier parser used by this resolver
    pub fn names(&self) -> &NameCache {
        &self.names
    }

    /// Previously resolved binding for `request`, if any
    pub fn cached(&self, request: &str) -> Option<String> {
        self.lookups.get(request).map(|entry| entry.value().clone())
    }

    /// Resolve `request` against the modules in `registry`
    pub fn resolve(
        &self,
        request: &str,
        registry: &ModuleRegistry,
    ) -> Result<String, ResolveError> {
        if let Some(id) = self.cached(request) {
            return Ok(id);
        }

        let wanted = self
            .names
            .parse(request)
            .ok_or_else(|| ResolveError::InvalidName(request.to_string()))?;

        let candidates = self.candidates(&wanted, registry);

        let chosen = match candidates.as_slice() {
            [] => return Err(ResolveError::not_found(request)),
            [only] if self.single_candidate_shortcut => only.id.clone(),
            _ => select_best(&candidates, &wanted.version).ok_or_else(|| {
                ResolveError::NoSatisfyingVersion {
                    request: request.to_string(),
                    available: candidates.iter().map(|c| c.version.clone()).collect(),
                }
            })?,
        };

        debug!("Resolved {} to {}", request, chosen);

        // A racing resolution of the same request keeps whichever landed first
        let bound = self
            .lookups
            .entry(request.to_string())
            .or_insert(chosen)
            .value()
            .clone();
        Ok(bound)
    }

    /// Registered modules with the same package and path as `wanted`, lowest
    /// version first
    fn candidates(&self, wanted: &ParsedName, registry: &ModuleRegistry) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = registry
            .ids()
            .into_iter()
            .filter_map(|id| {
                let parsed = self.names.parse(&id)?;
                parsed.same_module(wanted).then(|| Candidate {
                    version: parsed.version.clone(),
                    id,
                })
            })
            .collect();
        // Unparseable versions sort first, by text
        candidates.sort_by_cached_key(|c| (Version::parse(&c.version).ok(), c.version.clone()));
        candidates
    }

    /// Number of memoized request bindings
    pub fn cached_len(&self) -> usize {
        self.lookups.len()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Highest candidate whose version satisfies `constraint`
fn select_best(candidates: &[Candidate], constraint: &str) -> Option<String> {
    let range = match VersionRange::parse(constraint) {
        Ok(range) => range,
        Err(e) => {
            warn!("Unusable version constraint '{}': {}", constraint, e);
            return None;
        }
    };

    candidates
        .iter()
        .filter_map(|candidate| match Version::parse(&candidate.version) {
            Ok(version) => Some((version, candidate)),
            Err(e) => {
                warn!("Skipping {}: invalid version: {}", candidate.id, e);
                None
            }
        })
        .filter(|(version, _)| range.matches(version))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, candidate)| candidate.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::factory;

    fn registry_with(ids: &[&str]) -> ModuleRegistry {
        let registry = ModuleRegistry::new();
        for id in ids {
            registry.define(id, factory(|_, _, _| Ok(())));
        }
        registry
    }

    #[test]
    fn test_range_forms_pick_highest_match() {
        let registry = registry_with(&["pkg@1.2.0", "pkg@1.9.0", "pkg@2.5.0"]);
        let resolver = Resolver::default();

        assert_eq!(resolver.resolve("pkg@>=1.0.0 <2.0.0", &registry).unwrap(), "pkg@1.9.0");
        assert_eq!(resolver.resolve("pkg@^1.0.0 || ^2.0.0", &registry).unwrap(), "pkg@2.5.0");
        assert_eq!(resolver.resolve("pkg@1.2", &registry).unwrap(), "pkg@1.2.0");
        assert_eq!(resolver.resolve("pkg@1", &registry).unwrap(), "pkg@1.9.0");
        assert_eq!(resolver.resolve("pkg@1.x", &registry).unwrap(), "pkg@1.9.0");
        assert_eq!(resolver.resolve("pkg@1.0.0 - 2.0.0", &registry).unwrap(), "pkg@1.9.0");
        assert_eq!(resolver.resolve("pkg@>= 2", &registry).unwrap(), "pkg@2.5.0");
    }

    #[test]
    fn test_exact_version_is_pinned() {
        let registry = registry_with(&["pkg@1.2.0", "pkg@1.9.0", "pkg@2.5.0"]);
        let resolver = Resolver::default();

        assert_eq!(resolver.resolve("pkg@1.2.0", &registry).unwrap(), "pkg@1.2.0");
        assert!(matches!(
            resolver.resolve("pkg@1.3.0", &registry),
            Err(ResolveError::NoSatisfyingVersion { .. })
        ));
    }

    #[test]
    fn test_picks_highest_satisfying() {
        let registry = registry_with(&["pkg@1.0.0/a.js", "pkg@1.2.0/a.js", "pkg@2.0.0/a.js"]);
        let resolver = Resolver::default();

        assert_eq!(resolver.resolve("pkg@^1.0.0/a.js", &registry).unwrap(), "pkg@1.2.0/a.js");
        assert_eq!(resolver.resolve("pkg@*/a.js", &registry).unwrap(), "pkg@2.0.0/a.js");
        assert_eq!(resolver.resolve("pkg@1.0.0/a.js", &registry).unwrap(), "pkg@1.0.0/a.js");
    }

    #[test]
    fn test_no_satisfying_version() {
        let registry = registry_with(&["pkg@1.0.0/a.js", "pkg@1.2.0/a.js", "pkg@2.0.0/a.js"]);
        let resolver = Resolver::default();

        let err = resolver.resolve("pkg@^3.0.0/a.js", &registry).unwrap_err();
        match err {
            ResolveError::NoSatisfyingVersion { request, available } => {
                assert_eq!(request, "pkg@^3.0.0/a.js");
                assert_eq!(available, vec!["1.0.0", "1.2.0", "2.0.0"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(resolver.cached_len(), 0);
    }

    #[test]
    fn test_not_found_when_path_differs() {
        let registry = registry_with(&["pkg@1.0.0/a.js"]);
        let resolver = Resolver::default();

        assert_eq!(
            resolver.resolve("pkg@^1.0.0/b.js", &registry),
            Err(ResolveError::not_found("pkg@^1.0.0/b.js"))
        );
        assert_eq!(
            resolver.resolve("other@^1.0.0/a.js", &registry),
            Err(ResolveError::not_found("other@^1.0.0/a.js"))
        );
    }

    #[test]
    fn test_invalid_request() {
        let resolver = Resolver::default();
        assert_eq!(
            resolver.resolve("no-version-here", &ModuleRegistry::new()),
            Err(ResolveError::InvalidName("no-version-here".into()))
        );
    }

    #[test]
    fn test_single_candidate_short_circuit() {
        let registry = registry_with(&["pkg@1.0.0"]);

        let lenient = Resolver::new(true);
        assert_eq!(lenient.resolve("pkg@^9.0.0", &registry).unwrap(), "pkg@1.0.0");

        let strict = Resolver::new(false);
        assert!(matches!(
            strict.resolve("pkg@^9.0.0", &registry),
            Err(ResolveError::NoSatisfyingVersion { .. })
        ));
        assert_eq!(strict.resolve("pkg@^1.0.0", &registry).unwrap(), "pkg@1.0.0");
    }

    #[test]
    fn test_binding_is_stable_after_new_definitions() {
        let registry = registry_with(&["pkg@1.0.0", "pkg@1.1.0"]);
        let resolver = Resolver::default();
        assert_eq!(resolver.resolve("pkg@^1.0.0", &registry).unwrap(), "pkg@1.1.0");

        registry.define("pkg@1.9.0", factory(|_, _, _| Ok(())));
        assert_eq!(resolver.resolve("pkg@^1.0.0", &registry).unwrap(), "pkg@1.1.0");
        // A different request string is resolved fresh
        assert_eq!(resolver.resolve("pkg@~1.9.0", &registry).unwrap(), "pkg@1.9.0");
    }

    #[test]
    fn test_prerelease_needs_opt_in() {
        let registry = registry_with(&["pkg@1.0.0", "pkg@1.1.0-beta.1"]);
        let resolver = Resolver::default();

        assert_eq!(resolver.resolve("pkg@^1.0.0", &registry).unwrap(), "pkg@1.0.0");
        assert_eq!(
            resolver.resolve("pkg@>=1.1.0-beta.0", &registry).unwrap(),
            "pkg@1.1.0-beta.1"
        );
    }

    #[test]
    fn test_skips_unparseable_candidate_versions() {
        let registry = registry_with(&["pkg@1.0.0", "pkg@banana"]);
        let resolver = Resolver::default();
        assert_eq!(resolver.resolve("pkg@^1.0.0", &registry).unwrap(), "pkg@1.0.0");
    }

    #[test]
    fn test_available_versions_are_ordered() {
        let registry = registry_with(&["pkg@1.10.0", "pkg@banana", "pkg@1.2.0", "pkg@0.9.0"]);
        let resolver = Resolver::default();

        let err = resolver.resolve("pkg@^3", &registry).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No version of 'pkg@^3' satisfies the constraint (available: banana, 0.9.0, 1.2.0, 1.10.0)"
        );
    }

    #[test]
    fn test_malformed_range_satisfies_nothing() {
        let registry = registry_with(&["pkg@1.2.0", "pkg@1.9.0"]);
        let resolver = Resolver::default();
        assert!(matches!(
            resolver.resolve("pkg@>=1.0.0 || wat", &registry),
            Err(ResolveError::NoSatisfyingVersion { .. })
        ));
    }
}
