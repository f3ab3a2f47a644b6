// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors raised while resolving a module request to an exact identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The identifier does not have the `package@version[/path]` shape
    #[error("Invalid module identifier '{0}': expected <package>@<version>[/<path>]")]
    InvalidName(String),

    /// No registered module shares the request's package and path
    #[error("Cannot find module '{request}'")]
    NotFound {
        /// The original request string
        request: String,
    },

    /// Candidates exist but none satisfies the requested constraint
    #[error("No version of '{request}' satisfies the constraint (available: {})", .available.join(", "))]
    NoSatisfyingVersion {
        /// The original request string
        request: String,
        /// Versions of the registered candidates
        available: Vec<String>,
    },
}

impl ResolveError {
    /// Create a not-found error for a request
    pub fn not_found(request: impl Into<String>) -> Self {
        Self::NotFound {
            request: request.into(),
        }
    }
}

/// A bundle fetch failure.
///
/// Cloned out to every waiter registered on the failing path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to load bundle '{path}': {reason}")]
pub struct BundleError {
    /// Bundle path as requested
    pub path: String,
    /// Rendered cause reported by the fetcher
    pub reason: String,
}

impl BundleError {
    /// Build a bundle error from a fetcher failure
    pub fn from_fetch(path: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            path: path.into(),
            reason: format!("{:#}", err),
        }
    }
}

/// Errors that can occur in the module loader
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Module resolution error
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    /// The module's factory failed; passed through untouched
    #[error(transparent)]
    Factory(anyhow::Error),

    /// A bundle could not be fetched
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// The bundle loader went away before signaling readiness
    #[error("Bundle '{0}' was abandoned before it finished loading")]
    Abandoned(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoaderError {
    /// The resolution failure behind this error, if any
    pub fn as_resolve_error(&self) -> Option<&ResolveError> {
        match self {
            Self::Resolution(err) => Some(err),
            _ => None,
        }
    }
}
