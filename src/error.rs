//! Error types for the recipe-scrape library.
//!
//! Failures fall into two tiers:
//!
//! * [`ExtractionError`] — **Fatal**: no usable recipe source could be built
//!   for the URL (bad input, unreachable page, no recipe markup, and the
//!   wild-mode fallback also failing). Returned as `Err(ExtractionError)`
//!   from [`crate::extract::extract_recipe`] and
//!   [`crate::extract::RecipeExtractor::extract`].
//!
//! * [`FieldError`] / [`FetchError`] — **Non-fatal**: a single accessor
//!   failed, or the hero image could not be fetched. These are contained
//!   where they happen and surface only as an absent field in
//!   [`crate::output::RecipeRecord`].
//!
//! [`SourceError`] sits in between: it is what a
//! [`crate::source::SourceProvider`] reports, and the orchestrator turns it
//! either into a wild-mode retry or into an [`ExtractionError`].

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse classification of a fatal extraction failure.
///
/// The boundary layer maps this onto a transport-level response; the
/// `WildModeFailed` variant lets it tell "strict and permissive parsing were
/// both tried" apart from every other failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The caller supplied something that is not an HTTP/HTTPS URL.
    InvalidInput,
    /// Strict parsing reported the site as unsupported and fallback is disabled.
    Unsupported,
    /// Strict parsing reported the site as unsupported, wild mode was tried and failed.
    WildModeFailed,
    /// Source construction failed for another reason (network, parse).
    SourceFailed,
    /// Library misconfiguration.
    Config,
    /// Runtime or client setup failed.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Unsupported => "unsupported",
            ErrorCategory::WildModeFailed => "wild_mode_failed",
            ErrorCategory::SourceFailed => "source_failed",
            ErrorCategory::Config => "config",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// All fatal errors returned by the recipe-scrape library.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The input string is not a valid HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// Strict parsing does not support the site and wild-mode fallback is off.
    #[error("Website '{host}' is not supported (wild-mode fallback disabled)")]
    Unsupported { url: String, host: String },

    /// Strict parsing did not support the site; wild mode was attempted and also failed.
    #[error("Wild mode also failed for '{url}': {source}")]
    WildModeFailed {
        url: String,
        #[source]
        source: SourceError,
    },

    /// A recipe source could not be constructed.
    #[error("Failed to extract recipe from '{url}': {source}")]
    SourceFailed {
        url: String,
        #[source]
        source: SourceError,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client or async runtime could not be created.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractionError {
    /// The coarse category of this failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExtractionError::InvalidInput { .. } => ErrorCategory::InvalidInput,
            ExtractionError::Unsupported { .. } => ErrorCategory::Unsupported,
            ExtractionError::WildModeFailed { .. } => ErrorCategory::WildModeFailed,
            ExtractionError::SourceFailed { .. } => ErrorCategory::SourceFailed,
            ExtractionError::InvalidConfig(_) => ErrorCategory::Config,
            ExtractionError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

/// Why a [`crate::source::SourceProvider`] could not build a recipe source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Strict mode has no rules for this host.
    #[error("Website '{host}' is not supported in strict mode")]
    Unsupported { host: String },

    /// The URL could not be parsed or has no host.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The page could not be downloaded.
    #[error("Failed to fetch page: {0}")]
    Fetch(#[from] FetchError),

    /// The page was fetched but carries no recognisable recipe markup.
    #[error("No recipe found on the page ({detail})")]
    NoRecipe { detail: String },

    /// Anything else the parsing collaborator reports.
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// True for the condition that triggers the wild-mode fallback.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, SourceError::Unsupported { .. })
    }
}

/// A single accessor on a [`crate::source::RecipeSource`] failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    /// The underlying data has no value for this field.
    #[error("missing '{0}'")]
    Missing(String),

    /// The value exists but has an unexpected shape.
    #[error("malformed '{key}': {detail}")]
    Malformed { key: String, detail: String },

    /// Implementation-specific failure.
    #[error("{0}")]
    Other(String),
}

/// An outbound HTTP request failed after the retry policy was applied.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request did not complete within its timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from '{url}' after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    /// Connection or transport failure.
    #[error("Request to '{url}' failed: {reason}")]
    Transport { url: String, reason: String },
}
