//! # recipe-scrape
//!
//! Extract a recipe (name, ingredients, instructions) and a display-worthy
//! hero image from a recipe web page.
//!
//! ## Why this crate?
//!
//! Recipe pages are noisy, and the "main image" they declare is often a
//! tracking pixel, a logo or a thumbnail. This crate reads the page's
//! schema.org data and keeps only the fields it could actually read. It also
//! checks the hero image by reading just its header bytes, so a small image is
//! dropped instead of shown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL
//!  │
//!  ├─ 1. Source    strict site rules, falling back once to generic (wild) parsing
//!  ├─ 2. Image     hero-image URL read first, validated on a spawned task
//!  │                 fetch (timeout, 5xx retry) → size floor → header sniff → LRU cache
//!  ├─ 3. Fields    title / ingredients / instructions; failures become `None`
//!  └─ 4. Record    join the validation task, keep the image only if it passed
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recipe_scrape::{extract_recipe, ExtractorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractorConfig::default();
//!     let record = extract_recipe("https://www.allrecipes.com/recipe/21014/", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&record)?);
//!     Ok(())
//! }
//! ```
//!
//! When extracting more than one URL, build a [`RecipeExtractor`] once and
//! share it. The dimension cache and connection pool live inside it.
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | via cli | [`server`] module: axum HTTP service |
//! | `cli`    | on      | Enables the `recipe-scrape` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable default features when using only the library:
//! ```toml
//! recipe-scrape = { version = "0.1", default-features = false }
//! ```
//!
//! ## Plugging in your own parser
//!
//! Implement [`SourceProvider`] / [`RecipeSource`] and pass the provider to
//! [`RecipeExtractor::with_parts`]. The bundled
//! [`schema_org::SchemaOrgProvider`] reads JSON-LD and microdata.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod schema_org;
#[cfg(feature = "server")]
pub mod server;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::{CacheStats, DimensionCache};
pub use config::{ExtractorConfig, ExtractorConfigBuilder, DEFAULT_SUPPORTED_HOSTS};
pub use error::{ErrorCategory, ExtractionError, FetchError, FieldError, SourceError};
pub use extract::{extract_recipe, extract_recipe_sync, is_url, RecipeExtractor};
pub use output::{ImageDimensions, RecipeRecord};
pub use pipeline::fetch::{HttpFetcher, ReqwestFetcher, RetryPolicy};
pub use pipeline::fields::{Field, FieldValue};
pub use pipeline::sniff::sniff_dimensions;
pub use pipeline::validate::ImageValidator;
pub use schema_org::SchemaOrgProvider;
pub use source::{ParseMode, RecipeSource, SourceProvider};
