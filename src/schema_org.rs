//! Bundled [`SourceProvider`]: schema.org `Recipe` markup.
//!
//! ## Modes
//!
//! * **Strict** accepts only hosts on the supported list (leading `www.`
//!   ignored, subdomains match) and only JSON-LD markup. Any other host is
//!   [`SourceError::Unsupported`] before a single byte is fetched.
//! * **Wild** accepts any host and falls back from JSON-LD to microdata
//!   (`itemtype` ending in `schema.org/Recipe`).
//!
//! In both modes the page is reduced to one `serde_json::Value` holding the
//! Recipe object (microdata is converted into the same shape), and the four
//! accessors of [`SchemaOrgRecipe`] read from it lazily. A key that is absent
//! is [`FieldError::Missing`]; a key with an unusable shape is
//! [`FieldError::Malformed`].

use crate::config::ExtractorConfig;
use crate::error::{FieldError, SourceError};
use crate::pipeline::fetch::HttpFetcher;
use crate::source::{ParseMode, RecipeSource, SourceProvider};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

static JSONLD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("Invalid JSON-LD selector")
});

static OG_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#)
        .expect("Invalid og:image selector")
});

static ITEMTYPE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[itemtype]").expect("Invalid itemtype selector"));

// ── Provider ─────────────────────────────────────────────────────────────────

/// Fetches a page and builds a [`SchemaOrgRecipe`] from its structured data.
pub struct SchemaOrgProvider {
    fetcher: Arc<dyn HttpFetcher>,
    supported_hosts: Vec<String>,
    page_timeout: Duration,
}

impl SchemaOrgProvider {
    pub fn new<I, S>(fetcher: Arc<dyn HttpFetcher>, supported_hosts: I, page_timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let supported_hosts = supported_hosts
            .into_iter()
            .map(|h| normalize_host(h.as_ref()))
            .filter(|h| !h.is_empty())
            .collect();
        Self {
            fetcher,
            supported_hosts,
            page_timeout,
        }
    }

    pub fn from_config(config: &ExtractorConfig, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self::new(
            fetcher,
            &config.supported_hosts,
            Duration::from_secs(config.page_timeout_secs),
        )
    }

    /// Whether strict mode has rules for `host`.
    pub fn is_supported(&self, host: &str) -> bool {
        let host = normalize_host(host);
        self.supported_hosts
            .iter()
            .any(|h| host == *h || host.strip_suffix(h.as_str()).is_some_and(|p| p.ends_with('.')))
    }
}

#[async_trait]
impl SourceProvider for SchemaOrgProvider {
    async fn construct(
        &self,
        url: &str,
        mode: ParseMode,
    ) -> Result<Box<dyn RecipeSource>, SourceError> {
        let page_url = Url::parse(url).map_err(|e| SourceError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = page_url
            .host_str()
            .map(normalize_host)
            .ok_or_else(|| SourceError::InvalidUrl {
                url: url.to_string(),
                reason: "URL has no host".to_string(),
            })?;

        if mode == ParseMode::Strict && !self.is_supported(&host) {
            return Err(SourceError::Unsupported { host });
        }

        let html = self.fetcher.fetch_text(url, self.page_timeout).await?;
        debug!("{}: fetched {} bytes of HTML ({} mode)", url, html.len(), mode);

        let recipe = parse_page(&html, page_url, mode)?;
        Ok(Box::new(recipe))
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

// ── Page parsing ─────────────────────────────────────────────────────────────

/// Locate the Recipe object in `html`. Microdata is consulted only in wild mode.
pub fn parse_page(html: &str, page_url: Url, mode: ParseMode) -> Result<SchemaOrgRecipe, SourceError> {
    let document = Html::parse_document(html);
    let og_image = og_image(&document);

    if let Some(data) = jsonld_recipe(&document) {
        return Ok(SchemaOrgRecipe::new(data, page_url, og_image));
    }

    match mode {
        ParseMode::Strict => Err(SourceError::NoRecipe {
            detail: "no JSON-LD Recipe object".to_string(),
        }),
        ParseMode::Wild => microdata_recipe(&document)
            .map(|data| SchemaOrgRecipe::new(data, page_url, og_image))
            .ok_or_else(|| SourceError::NoRecipe {
                detail: "no JSON-LD or microdata Recipe".to_string(),
            }),
    }
}

fn jsonld_recipe(document: &Html) -> Option<Value> {
    for script in document.select(&JSONLD_SELECTOR) {
        let raw: String = script.text().collect();
        let sanitized = sanitize_json(&raw);
        let json: Value = match serde_json::from_str(&sanitized) {
            Ok(v) => v,
            Err(e) => {
                debug!("skipping unparseable JSON-LD block: {}", e);
                continue;
            }
        };
        if let Some(recipe) = find_recipe_in_json(&json) {
            return Some(recipe.clone());
        }
    }
    None
}

/// Escape raw control characters inside JSON strings; several sites emit
/// literal newlines and tabs in their JSON-LD.
fn sanitize_json(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in raw.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Depth-first search for an object whose `@type` is (or includes) Recipe.
fn find_recipe_in_json(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(obj) => {
            let is_recipe = match obj.get("@type") {
                Some(Value::String(s)) => is_recipe_type(s),
                Some(Value::Array(types)) => types
                    .iter()
                    .any(|t| t.as_str().is_some_and(is_recipe_type)),
                _ => false,
            };
            if is_recipe {
                return Some(json);
            }
            if let Some(recipe) = obj.get("@graph").and_then(find_recipe_in_json) {
                return Some(recipe);
            }
            obj.iter()
                .filter(|(k, _)| k.as_str() != "@graph")
                .find_map(|(_, v)| find_recipe_in_json(v))
        }
        Value::Array(items) => items.iter().find_map(find_recipe_in_json),
        _ => None,
    }
}

fn is_recipe_type(t: &str) -> bool {
    t == "Recipe" || t.ends_with("schema.org/Recipe") || t == "schema:Recipe"
}

fn og_image(document: &Html) -> Option<String> {
    document
        .select(&OG_IMAGE_SELECTOR)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

// ── Microdata ────────────────────────────────────────────────────────────────

/// Convert the first microdata Recipe scope into JSON-LD-shaped data.
///
/// Only properties owned by the Recipe itself are read: an `itemprop` inside
/// a nested `itemscope` (author `Person`, `NutritionInformation`, reviews)
/// belongs to that item.
fn microdata_recipe(document: &Html) -> Option<Value> {
    let recipe = document.select(&ITEMTYPE_SELECTOR).find(|el| {
        el.value()
            .attr("itemtype")
            .is_some_and(|t| t.split_whitespace().any(|t| t.ends_with("schema.org/Recipe")))
    })?;

    let mut data = Map::new();
    data.insert("@type".into(), Value::String("Recipe".into()));

    if let Some(name) = microdata_text(recipe, &["name"]).into_iter().next() {
        data.insert("name".into(), Value::String(name));
    }

    let ingredients = microdata_text(recipe, &["recipeIngredient", "ingredients"]);
    if !ingredients.is_empty() {
        data.insert(
            "recipeIngredient".into(),
            Value::Array(ingredients.into_iter().map(Value::String).collect()),
        );
    }

    let steps = microdata_steps(recipe);
    if !steps.is_empty() {
        data.insert(
            "recipeInstructions".into(),
            Value::Array(steps.into_iter().map(Value::String).collect()),
        );
    }

    if let Some(image) = microdata_image(recipe) {
        data.insert("image".into(), Value::String(image));
    }

    Some(Value::Object(data))
}

/// Elements under `scope` carrying one of `props` whose nearest enclosing
/// `itemscope` is `scope`. An element that opens its own scope still counts
/// as a property of the enclosing one.
fn own_props<'a>(scope: ElementRef<'a>, props: &'a [&'a str]) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let scope_id = scope.id();
    scope.descendent_elements().skip(1).filter(move |el| {
        let carries = el
            .attr("itemprop")
            .is_some_and(|p| p.split_whitespace().any(|p| props.contains(&p)));
        carries
            && el
                .ancestors()
                .find(|n| n.value().as_element().is_some_and(|e| e.attr("itemscope").is_some()))
                .is_some_and(|n| n.id() == scope_id)
    })
}

/// Text (or `content` attribute) of every property in `props`.
fn microdata_text(scope: ElementRef, props: &[&str]) -> Vec<String> {
    own_props(scope, props)
        .map(|el| match el.value().attr("content") {
            Some(content) => content.trim().to_string(),
            None => element_text(&el),
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Instruction steps; a `HowToStep` scope contributes its `text` property.
fn microdata_steps(scope: ElementRef) -> Vec<String> {
    own_props(scope, &["recipeInstructions", "instructions"])
        .map(|el| {
            let text = if el.value().attr("itemscope").is_some() {
                own_props(el, &["text"]).next()
            } else {
                None
            };
            element_text(&text.unwrap_or(el))
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn microdata_image(scope: ElementRef) -> Option<String> {
    own_props(scope, &["image"]).find_map(|el| {
        let v = el.value();
        v.attr("src")
            .or_else(|| v.attr("href"))
            .or_else(|| v.attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Collapsed whitespace text content.
fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Source ───────────────────────────────────────────────────────────────────

/// A parsed schema.org Recipe. Accessors read the JSON on demand.
#[derive(Debug, Clone)]
pub struct SchemaOrgRecipe {
    data: Value,
    page_url: Url,
    og_image: Option<String>,
}

impl SchemaOrgRecipe {
    pub fn new(data: Value, page_url: Url, og_image: Option<String>) -> Self {
        Self {
            data,
            page_url,
            og_image,
        }
    }

    fn resolve(&self, raw: &str) -> Result<String, FieldError> {
        self.page_url
            .join(raw.trim())
            .map(String::from)
            .map_err(|e| FieldError::Malformed {
                key: "image".into(),
                detail: format!("cannot resolve '{raw}': {e}"),
            })
    }
}

impl RecipeSource for SchemaOrgRecipe {
    fn title(&self) -> Result<String, FieldError> {
        match self.data.get("name") {
            None | Some(Value::Null) => Err(FieldError::Missing("name".into())),
            Some(Value::String(s)) => Ok(s.trim().to_string()),
            Some(other) => Err(malformed("name", "a string", other)),
        }
    }

    fn ingredients(&self) -> Result<Vec<String>, FieldError> {
        let (key, value) = ["recipeIngredient", "ingredients"]
            .into_iter()
            .find_map(|k| self.data.get(k).filter(|v| !v.is_null()).map(|v| (k, v)))
            .ok_or_else(|| FieldError::Missing("recipeIngredient".into()))?;

        match value {
            Value::String(s) => Ok(s
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()),
            Value::Array(items) => {
                let lines: Vec<String> = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .collect();
                if lines.is_empty() && !items.is_empty() {
                    return Err(malformed(key, "an array of strings", value));
                }
                Ok(lines)
            }
            other => Err(malformed(key, "a string or array", other)),
        }
    }

    fn instructions(&self) -> Result<String, FieldError> {
        let value = match self.data.get("recipeInstructions") {
            None | Some(Value::Null) => return Err(FieldError::Missing("recipeInstructions".into())),
            Some(v) => v,
        };
        match value {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Array(_) | Value::Object(_) => {
                let mut steps = Vec::new();
                collect_steps(value, &mut steps);
                Ok(steps.join("\n"))
            }
            other => Err(malformed("recipeInstructions", "a string, array or HowToStep", other)),
        }
    }

    fn image(&self) -> Result<String, FieldError> {
        let declared = match self.data.get("image") {
            None | Some(Value::Null) => None,
            Some(value) => match first_image_url(value) {
                Some(url) => Some(url),
                None if self.og_image.is_none() => {
                    return Err(malformed("image", "a URL, array or ImageObject", value));
                }
                None => None,
            },
        };

        match declared.or(self.og_image.as_deref()) {
            Some(raw) => self.resolve(raw),
            None => Err(FieldError::Missing("image".into())),
        }
    }
}

/// Flatten HowToStep / HowToSection trees into step texts.
fn collect_steps(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_steps(item, out)),
        Value::Object(obj) => {
            if let Some(list) = obj.get("itemListElement") {
                collect_steps(list, out);
            } else if let Some(text) = obj.get("text").or_else(|| obj.get("name")) {
                collect_steps(text, out);
            }
        }
        _ => {}
    }
}

/// First usable URL from `image`: a string, an ImageObject, or an array of either.
fn first_image_url(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        Value::Object(obj) => obj
            .get("url")
            .or_else(|| obj.get("contentUrl"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty()),
        Value::Array(items) => items.iter().find_map(first_image_url),
        _ => None,
    }
}

fn malformed(key: &str, expected: &str, got: &Value) -> FieldError {
    let kind = match got {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    FieldError::Malformed {
        key: key.to_string(),
        detail: format!("expected {expected}, found {kind}"),
    }
}
