//! Recipe extraction entry points.
//!
//! [`RecipeExtractor`] owns the long-lived pieces (source provider, HTTP
//! client, dimension cache, validation semaphore) and is meant to be built
//! once and shared. [`extract_recipe`] is the one-shot convenience wrapper.
//!
//! ## Flow of one request
//!
//! ```text
//! url ──▶ is_url? ──▶ construct(strict) ──Unsupported──▶ construct(wild)
//!                          │                                  │
//!                          ▼                                  ▼
//!                   image field ──▶ spawn validate ─────────┐
//!                   title / ingredients / instructions ─────┴─▶ join ──▶ RecipeRecord
//! ```

use crate::cache::DimensionCache;
use crate::config::ExtractorConfig;
use crate::error::{ExtractionError, SourceError};
use crate::output::RecipeRecord;
use crate::pipeline::fetch::{HttpFetcher, ReqwestFetcher};
use crate::pipeline::fields::{self, Field};
use crate::pipeline::validate::ImageValidator;
use crate::schema_org::SchemaOrgProvider;
use crate::source::{ParseMode, RecipeSource, SourceProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Shared extraction service.
///
/// Cheap to call concurrently: every request borrows the same provider,
/// connection pool and dimension cache.
///
/// # Example
/// ```rust,no_run
/// use recipe_scrape::{ExtractorConfig, RecipeExtractor};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = RecipeExtractor::new(&ExtractorConfig::default())?;
/// let record = extractor
///     .extract("https://www.allrecipes.com/recipe/21014/good-old-fashioned-pancakes/")
///     .await?;
/// println!("{}", serde_json::to_string_pretty(&record)?);
/// # Ok(())
/// # }
/// ```
pub struct RecipeExtractor {
    provider: Arc<dyn SourceProvider>,
    validator: Arc<ImageValidator>,
    workers: Arc<Semaphore>,
    wild_mode_fallback: bool,
}

impl RecipeExtractor {
    /// Build the default stack: reqwest fetcher, schema.org provider, fresh cache.
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractionError> {
        let fetcher: Arc<dyn HttpFetcher> = Arc::new(
            ReqwestFetcher::from_config(config)
                .map_err(|e| ExtractionError::Internal(e.to_string()))?,
        );
        let provider = Arc::new(SchemaOrgProvider::from_config(config, Arc::clone(&fetcher)));
        let cache = Arc::new(DimensionCache::new(config.cache_capacity));
        let validator = ImageValidator::from_config(config, fetcher, cache);
        Ok(Self::with_parts(provider, validator, config))
    }

    /// Assemble from caller-supplied collaborators.
    ///
    /// Only `validation_workers` and `wild_mode_fallback` are read from
    /// `config`; the provider and validator carry their own settings.
    pub fn with_parts(
        provider: Arc<dyn SourceProvider>,
        validator: ImageValidator,
        config: &ExtractorConfig,
    ) -> Self {
        Self {
            provider,
            validator: Arc::new(validator),
            workers: Arc::new(Semaphore::new(config.validation_workers.max(1))),
            wild_mode_fallback: config.wild_mode_fallback,
        }
    }

    pub fn cache(&self) -> &Arc<DimensionCache> {
        self.validator.cache()
    }

    /// Extract a recipe record from `url`.
    ///
    /// # Errors
    /// Only when no recipe source could be built: invalid input, an
    /// unsupported site with fallback disabled, wild mode failing after a
    /// strict-mode rejection, or any other construction failure. Field and
    /// image failures never surface here; they leave the field `None`.
    pub async fn extract(&self, url: &str) -> Result<RecipeRecord, ExtractionError> {
        let start = Instant::now();
        let url = url.trim();
        if !is_url(url) {
            return Err(ExtractionError::InvalidInput {
                input: url.to_string(),
            });
        }
        info!("Extracting recipe: {}", url);

        let source = self.build_source(url).await?;

        // The image URL is fixed before validation starts so the spawned task
        // never touches the source.
        let image_url = fields::extract_text(source.as_ref(), Field::Image);
        let validation = image_url.clone().map(|image| {
            let validator = Arc::clone(&self.validator);
            let workers = Arc::clone(&self.workers);
            tokio::spawn(async move {
                let _permit = workers.acquire_owned().await.ok();
                validator.validate(Some(image.as_str())).await
            })
        });

        let name = fields::extract_text(source.as_ref(), Field::Title);
        let ingredients = fields::extract_list(source.as_ref(), Field::Ingredients);
        let instructions = fields::extract_text(source.as_ref(), Field::Instructions);

        let image_ok = match validation {
            Some(handle) => match handle.await {
                Ok(valid) => valid,
                Err(e) => {
                    warn!("{}: image validation task failed: {}", url, e);
                    false
                }
            },
            None => false,
        };
        if !image_ok {
            if let Some(ref image) = image_url {
                debug!("{}: dropping image {}", url, image);
            }
        }

        let record = RecipeRecord {
            name,
            ingredients,
            instructions,
            image_url: image_url.filter(|_| image_ok),
        };

        let present = [
            record.name.is_some(),
            record.ingredients.is_some(),
            record.instructions.is_some(),
            record.image_url.is_some(),
        ]
        .into_iter()
        .filter(|p| *p)
        .count();
        info!(
            "Extraction complete: {} ({}/4 fields, {}ms)",
            url,
            present,
            start.elapsed().as_millis()
        );

        Ok(record)
    }

    /// Strict construction with a single wild-mode retry on "unsupported".
    async fn build_source(&self, url: &str) -> Result<Box<dyn RecipeSource>, ExtractionError> {
        match self.provider.construct(url, ParseMode::Strict).await {
            Ok(source) => Ok(source),
            Err(SourceError::Unsupported { host }) => {
                if !self.wild_mode_fallback {
                    return Err(ExtractionError::Unsupported {
                        url: url.to_string(),
                        host,
                    });
                }
                info!("{} is not supported in strict mode, retrying in wild mode", host);
                self.provider
                    .construct(url, ParseMode::Wild)
                    .await
                    .map_err(|source| ExtractionError::WildModeFailed {
                        url: url.to_string(),
                        source,
                    })
            }
            Err(source) => Err(ExtractionError::SourceFailed {
                url: url.to_string(),
                source,
            }),
        }
    }
}

impl std::fmt::Debug for RecipeExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeExtractor")
            .field("validator", &self.validator)
            .field("available_workers", &self.workers.available_permits())
            .field("wild_mode_fallback", &self.wild_mode_fallback)
            .finish_non_exhaustive()
    }
}

/// Extract one recipe with a freshly built [`RecipeExtractor`].
///
/// Each call gets its own dimension cache and connection pool; build a
/// [`RecipeExtractor`] once and reuse it when extracting more than one URL.
pub async fn extract_recipe(
    url: impl AsRef<str>,
    config: &ExtractorConfig,
) -> Result<RecipeRecord, ExtractionError> {
    RecipeExtractor::new(config)?.extract(url.as_ref()).await
}

/// Synchronous wrapper around [`extract_recipe`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_recipe_sync(
    url: impl AsRef<str>,
    config: &ExtractorConfig,
) -> Result<RecipeRecord, ExtractionError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractionError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_recipe(url, config))
}

/// True for absolute `http://` or `https://` URLs with a host.
pub fn is_url(input: &str) -> bool {
    match url::Url::parse(input) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}
