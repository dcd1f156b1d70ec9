//! Configuration types for recipe extraction.
//!
//! All extraction behaviour is controlled through [`ExtractorConfig`], built
//! via its [`ExtractorConfigBuilder`]. One struct holds every knob so a
//! single value can be shared between the CLI, the HTTP service and tests.

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};

/// Hosts the strict parsing mode has rules for.
///
/// Anything not listed here is reported as unsupported in strict mode and
/// goes through the wild-mode fallback instead.
pub const DEFAULT_SUPPORTED_HOSTS: &[&str] = &[
    "allrecipes.com",
    "bbcgoodfood.com",
    "bonappetit.com",
    "budgetbytes.com",
    "cookieandkate.com",
    "cooking.nytimes.com",
    "delish.com",
    "epicurious.com",
    "food.com",
    "food52.com",
    "foodnetwork.com",
    "jamieoliver.com",
    "kingarthurbaking.com",
    "minimalistbaker.com",
    "thepioneerwoman.com",
    "seriouseats.com",
    "simplyrecipes.com",
    "smittenkitchen.com",
    "tasteofhome.com",
    "thekitchn.com",
];

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36 recipe-scrape/0.1";

/// Configuration for a [`crate::extract::RecipeExtractor`].
///
/// Built via [`ExtractorConfig::builder()`] or using
/// [`ExtractorConfig::default()`].
///
/// # Example
/// ```rust
/// use recipe_scrape::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .image_timeout_secs(3)
///     .min_image_size(400, 300)
///     .cache_capacity(512)
///     .build()
///     .unwrap();
/// assert_eq!(config.min_image_width, 400);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Timeout for a single hero-image request, in seconds. Default: 5.
    ///
    /// Image checks run alongside field extraction; a slow CDN should cost
    /// the caller the image, not the whole response.
    pub image_timeout_secs: u64,

    /// Timeout for fetching the recipe page itself, in seconds. Default: 15.
    pub page_timeout_secs: u64,

    /// Maximum attempts per outbound request, including the first. Default: 3.
    ///
    /// Only 500/502/503/504 responses and transport errors are retried.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds. Default: 300.
    ///
    /// Doubles after each attempt: 300 ms → 600 ms → 1.2 s.
    pub retry_backoff_ms: u64,

    /// Images with fewer bytes than this are rejected without sniffing. Default: 10 000.
    pub min_image_bytes: usize,

    /// Minimum accepted image width in pixels. Default: 300.
    pub min_image_width: u32,

    /// Minimum accepted image height in pixels. Default: 300.
    pub min_image_height: u32,

    /// Number of image URLs whose dimensions are remembered. Default: 128.
    pub cache_capacity: usize,

    /// Maximum image validations in flight across all requests. Default: 4.
    pub validation_workers: usize,

    /// Retry in wild mode when strict parsing reports the site as unsupported. Default: true.
    pub wild_mode_fallback: bool,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Hosts accepted by strict parsing. Leading `www.` is ignored.
    pub supported_hosts: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            image_timeout_secs: 5,
            page_timeout_secs: 15,
            max_attempts: 3,
            retry_backoff_ms: 300,
            min_image_bytes: 10_000,
            min_image_width: 300,
            min_image_height: 300,
            cache_capacity: 128,
            validation_workers: 4,
            wild_mode_fallback: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            supported_hosts: DEFAULT_SUPPORTED_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs;
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn min_image_bytes(mut self, bytes: usize) -> Self {
        self.config.min_image_bytes = bytes;
        self
    }

    pub fn min_image_size(mut self, width: u32, height: u32) -> Self {
        self.config.min_image_width = width;
        self.config.min_image_height = height;
        self
    }

    pub fn cache_capacity(mut self, n: usize) -> Self {
        self.config.cache_capacity = n.max(1);
        self
    }

    pub fn validation_workers(mut self, n: usize) -> Self {
        self.config.validation_workers = n.max(1);
        self
    }

    pub fn wild_mode_fallback(mut self, v: bool) -> Self {
        self.config.wild_mode_fallback = v;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Replace the strict-mode host list.
    pub fn supported_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.supported_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Add one host to the strict-mode host list.
    pub fn add_supported_host(mut self, host: impl Into<String>) -> Self {
        self.config.supported_hosts.push(host.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, ExtractionError> {
        let c = &self.config;
        if c.image_timeout_secs == 0 || c.page_timeout_secs == 0 {
            return Err(ExtractionError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.user_agent.trim().is_empty() {
            return Err(ExtractionError::InvalidConfig(
                "User-Agent must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
