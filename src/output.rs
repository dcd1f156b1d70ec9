//! Output types: the assembled recipe record and image dimensions.

use serde::{Deserialize, Serialize};

/// The result of a successful extraction.
///
/// Every field is optional: `None` means the page did not yield a usable
/// value, whether the accessor failed or returned only blank content. The
/// JSON form always carries all four keys (`null` when absent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRecord {
    pub name: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<String>,
    /// Hero image URL, present only if the image passed validation.
    pub image_url: Option<String>,
}

impl RecipeRecord {
    /// True when no field could be extracted.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.ingredients.is_none()
            && self.instructions.is_none()
            && self.image_url.is_none()
    }
}

/// Pixel dimensions read from an image header.
///
/// `(0, 0)` is the "undeterminable" sentinel; see [`ImageDimensions::UNKNOWN`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub const UNKNOWN: ImageDimensions = ImageDimensions {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// False for the `(0, 0)` sentinel.
    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }

    /// Both sides meet their minimum.
    pub fn meets(&self, min_width: u32, min_height: u32) -> bool {
        self.width >= min_width && self.height >= min_height
    }
}
