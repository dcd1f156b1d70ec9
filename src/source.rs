//! The seam between the extraction core and the page-parsing collaborator.
//!
//! A [`SourceProvider`] turns a URL into a [`RecipeSource`]; the core only
//! ever calls the four accessors. Site-specific parsing rules live entirely
//! behind these traits. [`crate::schema_org::SchemaOrgProvider`] is the
//! bundled implementation; tests and embedders can supply their own.

use crate::error::{FieldError, SourceError};
use async_trait::async_trait;
use std::fmt;

/// How strictly the provider should match a page against its site rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseMode {
    /// Only hosts the provider has rules for; anything else is
    /// [`SourceError::Unsupported`].
    Strict,
    /// Generic parsing for any host, at lower fidelity.
    Wild,
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Strict => f.write_str("strict"),
            ParseMode::Wild => f.write_str("wild"),
        }
    }
}

/// A parsed recipe page exposing four independently fallible accessors.
///
/// No accessor is guaranteed to succeed or to return non-empty data.
pub trait RecipeSource: Send + Sync {
    fn title(&self) -> Result<String, FieldError>;

    fn ingredients(&self) -> Result<Vec<String>, FieldError>;

    fn instructions(&self) -> Result<String, FieldError>;

    /// Absolute URL of the page's hero image.
    fn image(&self) -> Result<String, FieldError>;
}

/// Builds a [`RecipeSource`] for a URL.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn construct(
        &self,
        url: &str,
        mode: ParseMode,
    ) -> Result<Box<dyn RecipeSource>, SourceError>;
}
