//! CLI binary for recipe-scrape.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractorConfig`, then either extracts one URL or runs the HTTP service.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use recipe_scrape::{server, ExtractorConfig, RecipeExtractor, RecipeRecord};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract one recipe as JSON
  recipe-scrape extract https://www.allrecipes.com/recipe/21014/good-old-fashioned-pancakes/

  # Stricter hero-image requirements
  recipe-scrape --min-image-size 600x400 extract https://smittenkitchen.com/2024/01/soup/

  # Only accept sites with strict rules
  recipe-scrape --no-wild-fallback extract https://www.bbcgoodfood.com/recipes/lemon-drizzle

  # Run the HTTP service
  recipe-scrape serve --bind 0.0.0.0:5328
  curl -X POST localhost:5328/api/scrape_recipy -H 'content-type: application/json' \
       -d '{"url": "https://cooking.nytimes.com/recipes/1015819"}'

ENVIRONMENT VARIABLES:
  RUST_LOG                        Override the log filter (e.g. recipe_scrape=debug)
  RECIPE_SCRAPE_IMAGE_TIMEOUT     Hero-image request timeout in seconds
  RECIPE_SCRAPE_PAGE_TIMEOUT      Page request timeout in seconds
  RECIPE_SCRAPE_MAX_ATTEMPTS      Attempts per request (5xx and transport errors are retried)
  RECIPE_SCRAPE_BIND              Listen address for `serve`
"#;

/// Extract recipes from web pages.
#[derive(Parser, Debug)]
#[command(
    name = "recipe-scrape",
    version,
    about = "Extract recipe name, ingredients, instructions and a hero image from a URL",
    long_about = "Extract a recipe (name, ingredients, instructions) and a display-worthy hero \
image from a recipe web page. Well-known recipe sites are parsed strictly; any other site is \
parsed from generic schema.org markup.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    tuning: Tuning,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "RECIPE_SCRAPE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "RECIPE_SCRAPE_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract one recipe and print it as JSON.
    Extract {
        /// HTTP/HTTPS URL of the recipe page.
        url: String,

        /// Write JSON to this file instead of stdout.
        #[arg(short, long, env = "RECIPE_SCRAPE_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Serve the extraction API over HTTP.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "RECIPE_SCRAPE_BIND", default_value = "127.0.0.1:5328")]
        bind: SocketAddr,
    },
}

#[derive(Args, Debug)]
struct Tuning {
    /// Hero-image request timeout in seconds.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_IMAGE_TIMEOUT", default_value_t = 5)]
    image_timeout: u64,

    /// Page request timeout in seconds.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_PAGE_TIMEOUT", default_value_t = 15)]
    page_timeout: u64,

    /// Attempts per outbound request, including the first.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Initial retry delay in milliseconds (doubles per retry).
    #[arg(long, global = true, env = "RECIPE_SCRAPE_RETRY_BACKOFF_MS", default_value_t = 300)]
    retry_backoff_ms: u64,

    /// Reject images smaller than this many bytes.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_MIN_IMAGE_BYTES", default_value_t = 10_000)]
    min_image_bytes: usize,

    /// Minimum hero-image size as WIDTHxHEIGHT.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_MIN_IMAGE_SIZE", default_value = "300x300",
          value_parser = parse_size)]
    min_image_size: (u32, u32),

    /// Number of image URLs whose dimensions are cached.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_CACHE_CAPACITY", default_value_t = 128)]
    cache_capacity: usize,

    /// Maximum concurrent image validations.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Fail on unsupported sites instead of retrying with generic parsing.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_NO_WILD_FALLBACK")]
    no_wild_fallback: bool,

    /// Extra host accepted by strict parsing (repeatable or comma-separated).
    #[arg(long = "supported-host", global = true, env = "RECIPE_SCRAPE_SUPPORTED_HOSTS",
          value_delimiter = ',')]
    supported_hosts: Vec<String>,

    /// Override the User-Agent header.
    #[arg(long, global = true, env = "RECIPE_SCRAPE_USER_AGENT")]
    user_agent: Option<String>,
}

fn parse_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    Ok((w, h))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are hidden while the spinner runs; `serve` has no
    // spinner and logs at INFO by default.
    let is_extract = matches!(cli.command, Command::Extract { .. });
    let show_progress = is_extract && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli.tuning)?;
    let extractor = RecipeExtractor::new(&config).context("Failed to initialise extractor")?;

    match cli.command {
        Command::Extract { url, output } => {
            run_extract(&extractor, &url, output, show_progress, cli.quiet).await
        }
        Command::Serve { bind } => server::serve(bind, Arc::new(extractor))
            .await
            .with_context(|| format!("HTTP service on {bind} failed")),
    }
}

async fn run_extract(
    extractor: &RecipeExtractor,
    url: &str,
    output: Option<PathBuf>,
    show_progress: bool,
    quiet: bool,
) -> Result<()> {
    let start = Instant::now();
    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Extracting");
        bar.set_message(url.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = extractor.extract(url).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let record = result.with_context(|| format!("Extraction failed for {url}"))?;

    let json = serde_json::to_string_pretty(&record).context("Failed to serialise record")?;
    match output {
        Some(ref path) => tokio::fs::write(path, format!("{json}\n"))
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    if !quiet {
        eprintln!(
            "{} {}  {}",
            green("✔"),
            summary(&record),
            dim(&format!("{}ms", start.elapsed().as_millis()))
        );
    }
    Ok(())
}

fn summary(record: &RecipeRecord) -> String {
    let mut parts = Vec::new();
    if let Some(ref name) = record.name {
        parts.push(format!("\"{name}\""));
    }
    if let Some(ref ingredients) = record.ingredients {
        parts.push(format!("{} ingredients", ingredients.len()));
    }
    if record.instructions.is_some() {
        parts.push("instructions".to_string());
    }
    parts.push(if record.image_url.is_some() {
        "image ✓".to_string()
    } else {
        "no image".to_string()
    });
    parts.join(", ")
}

/// Map CLI args to `ExtractorConfig`.
fn build_config(t: &Tuning) -> Result<ExtractorConfig> {
    let (min_w, min_h) = t.min_image_size;
    let mut builder = ExtractorConfig::builder()
        .image_timeout_secs(t.image_timeout)
        .page_timeout_secs(t.page_timeout)
        .max_attempts(t.max_attempts)
        .retry_backoff_ms(t.retry_backoff_ms)
        .min_image_bytes(t.min_image_bytes)
        .min_image_size(min_w, min_h)
        .cache_capacity(t.cache_capacity)
        .validation_workers(t.workers)
        .wild_mode_fallback(!t.no_wild_fallback);

    for host in t.supported_hosts.iter().filter(|h| !h.trim().is_empty()) {
        builder = builder.add_supported_host(host.trim());
    }
    if let Some(ref ua) = t.user_agent {
        builder = builder.user_agent(ua.clone());
    }

    builder.build().context("Invalid configuration")
}
