//! HTTP integration tests against an in-process axum server.
//!
//! The server binds `127.0.0.1:0`, so these run offline and in parallel.
//! Images are encoded with the `image` crate rather than hand-built headers.
//!
//! Run with:
//!   cargo test --test http_fetch -- --nocapture

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use recipe_scrape::{
    sniff_dimensions, DimensionCache, ExtractorConfig, FetchError, HttpFetcher, ImageDimensions,
    ImageValidator, RecipeExtractor, ReqwestFetcher, RetryPolicy,
};
use once_cell::sync::Lazy;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct Hits {
    flaky: AtomicUsize,
    always_503: AtomicUsize,
    missing: AtomicUsize,
    hero: AtomicUsize,
}

#[derive(Clone)]
struct AppState {
    hits: Arc<Hits>,
    hero_png: Arc<Vec<u8>>,
    thumb_gif: Arc<Vec<u8>>,
}

/// Encoded once; deflating 480 KB of noise is slow in debug builds.
static HERO_PNG: Lazy<Vec<u8>> = Lazy::new(hero_png);

/// 400×400 PNG of pseudo-random noise, large enough to pass the byte floor.
fn hero_png() -> Vec<u8> {
    let mut seed: u32 = 0x1234_5678;
    let img = image::RgbImage::from_fn(400, 400, |_, _| {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let [a, b, c, _] = seed.to_le_bytes();
        image::Rgb([a, b, c])
    });
    encode(image::DynamicImage::ImageRgb8(img), image::ImageFormat::Png)
}

fn thumb_gif() -> Vec<u8> {
    let img = image::RgbaImage::from_fn(64, 48, |x, y| image::Rgba([x as u8 * 4, y as u8 * 5, 0, 255]));
    encode(image::DynamicImage::ImageRgba8(img), image::ImageFormat::Gif)
}

fn encode(img: image::DynamicImage, format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

async fn flaky(State(s): State<AppState>) -> impl IntoResponse {
    let n = s.hits.flaky.fetch_add(1, Ordering::SeqCst);
    if n < 2 {
        (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response()
    } else {
        (StatusCode::OK, "finally").into_response()
    }
}

async fn always_503(State(s): State<AppState>) -> StatusCode {
    s.hits.always_503.fetch_add(1, Ordering::SeqCst);
    StatusCode::SERVICE_UNAVAILABLE
}

async fn missing(State(s): State<AppState>) -> StatusCode {
    s.hits.missing.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "too late"
}

async fn latin1() -> impl IntoResponse {
    (
        [("content-type", "text/html; charset=iso-8859-1")],
        b"<h1>Cr\xe8me br\xfbl\xe9e</h1>".to_vec(),
    )
}

async fn hero(State(s): State<AppState>) -> impl IntoResponse {
    s.hits.hero.fetch_add(1, Ordering::SeqCst);
    ([("content-type", "image/png")], s.hero_png.as_ref().clone())
}

async fn thumb(State(s): State<AppState>) -> impl IntoResponse {
    ([("content-type", "image/gif")], s.thumb_gif.as_ref().clone())
}

async fn jsonld_page() -> Html<&'static str> {
    Html(
        r#"<html><head>
<script type="application/ld+json">
{"@context":"https://schema.org","@type":"Recipe","name":"Noise Bread",
 "image":"/hero.png",
 "recipeIngredient":["500g flour","350ml water"],
 "recipeInstructions":[{"@type":"HowToStep","text":"Mix."},{"@type":"HowToStep","text":"Bake."}]}
</script></head><body></body></html>"#,
    )
}

async fn microdata_page() -> Html<&'static str> {
    Html(
        r#"<html><body>
<article itemscope itemtype="https://schema.org/Recipe">
  <h1 itemprop="name">Tiny Toast</h1>
  <img itemprop="image" src="/thumb.gif">
  <span itemprop="recipeIngredient">1 slice bread</span>
  <p itemprop="recipeInstructions">Toast it.</p>
</article>
</body></html>"#,
    )
}

async fn spawn_server() -> (String, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let state = AppState {
        hits: Arc::clone(&hits),
        hero_png: Arc::new(HERO_PNG.clone()),
        thumb_gif: Arc::new(thumb_gif()),
    };
    let app = Router::new()
        .route("/flaky", get(flaky))
        .route("/always-503", get(always_503))
        .route("/missing", get(missing))
        .route("/slow", get(slow))
        .route("/latin1", get(latin1))
        .route("/hero.png", get(hero))
        .route("/thumb.gif", get(thumb))
        .route("/recipes/bread", get(jsonld_page))
        .route("/recipes/toast", get(microdata_page))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), hits)
}

fn fast_fetcher(max_attempts: u32) -> ReqwestFetcher {
    ReqwestFetcher::new(
        "recipe-scrape-tests",
        RetryPolicy {
            max_attempts,
            backoff_ms: 10,
        },
    )
    .unwrap()
}

const TIMEOUT: Duration = Duration::from_secs(5);

// ── Retry policy ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_retries_503_until_success() {
    let (base, hits) = spawn_server().await;
    let body = fast_fetcher(3)
        .fetch_text(&format!("{base}/flaky"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(body, "finally");
    assert_eq!(hits.flaky.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let (base, hits) = spawn_server().await;
    let err = fast_fetcher(3)
        .fetch_bytes(&format!("{base}/always-503"), TIMEOUT)
        .await
        .unwrap_err();
    assert!(
        matches!(err, FetchError::Status { status: 503, attempts: 3, .. }),
        "got {err:?}"
    );
    assert_eq!(hits.always_503.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_404_is_not_retried() {
    let (base, hits) = spawn_server().await;
    let err = fast_fetcher(3)
        .fetch_bytes(&format!("{base}/missing"), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, attempts: 1, .. }));
    assert_eq!(hits.missing.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_per_request_timeout() {
    let (base, _) = spawn_server().await;
    let err = fast_fetcher(1)
        .fetch_bytes(&format!("{base}/slow"), Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let err = fast_fetcher(2)
        .fetch_bytes(&format!("http://{addr}/"), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_text_honours_declared_charset() {
    let (base, _) = spawn_server().await;
    let html = fast_fetcher(1)
        .fetch_text(&format!("{base}/latin1"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(html, "<h1>Crème brûlée</h1>");
}

// ── Sniffing real encoder output ─────────────────────────────────────────────

#[tokio::test]
async fn test_sniffs_encoded_png_and_gif() {
    let (base, _) = spawn_server().await;
    let fetcher = fast_fetcher(1);

    let png = fetcher.fetch_bytes(&format!("{base}/hero.png"), TIMEOUT).await.unwrap();
    assert!(png.len() > 10_000, "noise PNG should be large, got {}", png.len());
    assert_eq!(sniff_dimensions(&png), ImageDimensions::new(400, 400));

    let gif = fetcher.fetch_bytes(&format!("{base}/thumb.gif"), TIMEOUT).await.unwrap();
    assert_eq!(sniff_dimensions(&gif), ImageDimensions::new(64, 48));
}

#[tokio::test]
async fn test_validator_fetches_each_image_once() {
    let (base, hits) = spawn_server().await;
    let validator = ImageValidator::from_config(
        &ExtractorConfig::default(),
        Arc::new(fast_fetcher(3)),
        Arc::new(DimensionCache::new(8)),
    );
    let url = format!("{base}/hero.png");

    assert!(validator.validate(Some(url.as_str())).await);
    assert!(validator.validate(Some(url.as_str())).await);
    assert_eq!(hits.hero.load(Ordering::SeqCst), 1);

    // Small GIF: below the byte floor and the size floor.
    let thumb = format!("{base}/thumb.gif");
    assert!(!validator.validate(Some(thumb.as_str())).await);
}

// ── End to end ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_strict_mode_end_to_end() {
    let (base, _) = spawn_server().await;
    let config = ExtractorConfig::builder()
        .supported_hosts(["127.0.0.1"])
        .retry_backoff_ms(10)
        .build()
        .unwrap();
    let extractor = RecipeExtractor::new(&config).unwrap();

    let record = extractor.extract(&format!("{base}/recipes/bread")).await.unwrap();

    assert_eq!(record.name.as_deref(), Some("Noise Bread"));
    assert_eq!(
        record.ingredients,
        Some(vec!["500g flour".to_string(), "350ml water".to_string()])
    );
    assert_eq!(record.instructions.as_deref(), Some("Mix.\nBake."));
    assert_eq!(record.image_url, Some(format!("{base}/hero.png")));
}

#[tokio::test]
async fn test_wild_mode_end_to_end_drops_small_image() {
    let (base, _) = spawn_server().await;
    // 127.0.0.1 is not on the default list, so strict mode rejects it.
    let config = ExtractorConfig::builder().retry_backoff_ms(10).build().unwrap();
    let extractor = RecipeExtractor::new(&config).unwrap();

    let record = extractor.extract(&format!("{base}/recipes/toast")).await.unwrap();

    assert_eq!(record.name.as_deref(), Some("Tiny Toast"));
    assert_eq!(record.ingredients, Some(vec!["1 slice bread".to_string()]));
    assert_eq!(record.instructions.as_deref(), Some("Toast it."));
    assert_eq!(record.image_url, None);
}

#[tokio::test]
async fn test_wild_mode_end_to_end_failure() {
    let (base, _) = spawn_server().await;
    let config = ExtractorConfig::builder().retry_backoff_ms(10).build().unwrap();
    let extractor = RecipeExtractor::new(&config).unwrap();

    let err = extractor.extract(&format!("{base}/missing")).await.unwrap_err();

    assert!(err.to_string().contains("Wild mode also failed"), "got {err}");
}
