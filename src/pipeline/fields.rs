//! Safe field extraction: call one accessor, contain its failure.
//!
//! An accessor error, an accessor panic and a blank value look the same to
//! the caller: all become `None`. Failures are logged at `warn`; they never
//! propagate.

use crate::source::RecipeSource;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// The four accessors a [`RecipeSource`] exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Ingredients,
    Instructions,
    Image,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Ingredients => "ingredients",
            Field::Instructions => "instructions",
            Field::Image => "image",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An accessor's value: text for title/instructions/image, a list for ingredients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Empty, or nothing but whitespace. A list is blank when every entry is.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<String>> {
        match self {
            FieldValue::List(items) => Some(items),
            FieldValue::Text(_) => None,
        }
    }
}

/// Invoke the accessor for `field`, mapping errors, panics and blank values to `None`.
pub fn extract(source: &dyn RecipeSource, field: Field) -> Option<FieldValue> {
    // A panicking accessor costs one field, not the record.
    let call = panic::catch_unwind(AssertUnwindSafe(|| match field {
        Field::Title => source.title().map(FieldValue::Text),
        Field::Ingredients => source.ingredients().map(FieldValue::List),
        Field::Instructions => source.instructions().map(FieldValue::Text),
        Field::Image => source.image().map(FieldValue::Text),
    }));

    let result = match call {
        Ok(result) => result,
        Err(payload) => {
            warn!("{} accessor panicked: {}", field, panic_message(payload.as_ref()));
            return None;
        }
    };

    match result {
        Ok(value) if value.is_blank() => None,
        Ok(value) => Some(value),
        Err(e) => {
            warn!("could not extract {}: {}", field, e);
            None
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// [`extract`] for the text-valued fields.
pub fn extract_text(source: &dyn RecipeSource, field: Field) -> Option<String> {
    extract(source, field).and_then(FieldValue::into_text)
}

/// [`extract`] for the ingredient list.
pub fn extract_list(source: &dyn RecipeSource, field: Field) -> Option<Vec<String>> {
    extract(source, field).and_then(FieldValue::into_list)
}
