//! Hero-image validation: is the image at a URL large enough to show?
//!
//! ## Decision procedure
//!
//! 1. No URL → invalid.
//! 2. Cached dimensions → compare against the minimum, no network.
//! 3. Fetch the bytes (per-request timeout, retry on 5xx). Any fetch
//!    failure → invalid, and nothing is cached.
//! 4. Fewer than `min_image_bytes` → cache `(0, 0)`, invalid.
//! 5. Sniff the header, cache the result (including `(0, 0)` for an
//!    unreadable header), compare against the minimum.
//!
//! Validation never returns an error: every failure is a `false`.

use super::fetch::HttpFetcher;
use super::sniff::sniff_dimensions;
use crate::cache::DimensionCache;
use crate::config::ExtractorConfig;
use crate::output::ImageDimensions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Checks hero-image URLs against size thresholds, remembering dimensions.
#[derive(Clone)]
pub struct ImageValidator {
    fetcher: Arc<dyn HttpFetcher>,
    cache: Arc<DimensionCache>,
    timeout: Duration,
    min_bytes: usize,
    min_width: u32,
    min_height: u32,
}

impl ImageValidator {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        cache: Arc<DimensionCache>,
        timeout: Duration,
        min_bytes: usize,
        min_width: u32,
        min_height: u32,
    ) -> Self {
        Self {
            fetcher,
            cache,
            timeout,
            min_bytes,
            min_width,
            min_height,
        }
    }

    /// Thresholds and timeout taken from the config.
    pub fn from_config(
        config: &ExtractorConfig,
        fetcher: Arc<dyn HttpFetcher>,
        cache: Arc<DimensionCache>,
    ) -> Self {
        Self::new(
            fetcher,
            cache,
            Duration::from_secs(config.image_timeout_secs),
            config.min_image_bytes,
            config.min_image_width,
            config.min_image_height,
        )
    }

    pub fn cache(&self) -> &Arc<DimensionCache> {
        &self.cache
    }

    /// True iff the image at `url` meets the minimum width and height.
    pub async fn validate(&self, url: Option<&str>) -> bool {
        let Some(url) = url else {
            return false;
        };
        match self.dimensions(url).await {
            Some(dims) => {
                let ok = dims.meets(self.min_width, self.min_height);
                debug!(
                    "image {}: {}x{} ({})",
                    url,
                    dims.width,
                    dims.height,
                    if ok { "accepted" } else { "too small" }
                );
                ok
            }
            None => false,
        }
    }

    /// Dimensions from cache or network; `None` only when the fetch failed.
    async fn dimensions(&self, url: &str) -> Option<ImageDimensions> {
        if let Some(dims) = self.cache.get(url) {
            debug!("image {}: dimension cache hit", url);
            return Some(dims);
        }

        let bytes = match self.fetcher.fetch_bytes(url, self.timeout).await {
            Ok(b) => b,
            Err(e) => {
                warn!("image {}: fetch failed: {}", url, e);
                return None;
            }
        };

        let dims = if bytes.len() < self.min_bytes {
            debug!(
                "image {}: {} bytes, below the {}-byte minimum",
                url,
                bytes.len(),
                self.min_bytes
            );
            ImageDimensions::UNKNOWN
        } else {
            let dims = sniff_dimensions(&bytes);
            if !dims.is_known() {
                debug!("image {}: header not recognised as PNG, GIF or JPEG", url);
            }
            dims
        };

        self.cache.insert(url, dims);
        Some(dims)
    }
}

impl std::fmt::Debug for ImageValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageValidator")
            .field("timeout", &self.timeout)
            .field("min_bytes", &self.min_bytes)
            .field("min_width", &self.min_width)
            .field("min_height", &self.min_height)
            .field("cache", &self.cache.stats())
            .finish()
    }
}
