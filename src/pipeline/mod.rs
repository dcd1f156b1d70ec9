//! Pipeline stages for recipe extraction.
//!
//! Each submodule implements one step. The orchestrator in
//! [`crate::extract`] wires them together; none of them knows about the
//! others except through plain values.
//!
//! ## Data Flow
//!
//! ```text
//!                  ┌──▶ fields::extract(image) ──▶ validate ──┐ (spawned)
//! source (page) ───┤                                          ├──▶ RecipeRecord
//!                  └──▶ fields::extract(title, ingredients,  ─┘
//!                                       instructions)
//! ```
//!
//! 1. [`fields`]   — call one accessor, turn failures and blanks into `None`
//! 2. [`fetch`]    — HTTP GET with per-request timeout and 5xx retry; the only
//!    stage with network I/O
//! 3. [`sniff`]    — read width and height from PNG/GIF/JPEG headers
//! 4. [`validate`] — fetch, size-check, sniff and cache a hero image

pub mod fetch;
pub mod fields;
pub mod sniff;
pub mod validate;
