//! End-to-end pipeline tests against deterministic in-memory collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};

use agentic_logo::{
    Fetcher, LogoError, LogoPipeline, LogoRequest, LogoResult, PageRenderer, PipelineConfig,
    PromptScore, RankSource, RenderedPage, Uploader,
};

// ─────────────────────── fakes ───────────────────────

#[derive(Default)]
struct FakeWeb {
    pages: HashMap<String, RenderedPage>,
    assets: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeWeb {
    fn page(mut self, url: &str, status: u16, html: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            RenderedPage {
                status,
                html: html.to_string(),
            },
        );
        self
    }

    fn asset(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.assets.insert(url.to_string(), bytes);
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for FakeWeb {
    async fn render(&self, url: &str) -> LogoResult<RenderedPage> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| LogoError::Http(format!("unreachable: {url}")))
    }
}

#[async_trait]
impl Fetcher for FakeWeb {
    async fn fetch(&self, url: &str) -> LogoResult<Vec<u8>> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.assets.get(url).cloned().ok_or(LogoError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Uploader for MemoryStore {
    async fn upload(&self, identifier: &str, png_bytes: Vec<u8>) -> LogoResult<String> {
        self.objects
            .lock()
            .unwrap()
            .insert(identifier.to_string(), png_bytes);
        Ok(format!("mem://{identifier}"))
    }

    async fn delete(&self, identifier: &str) -> LogoResult<()> {
        self.objects.lock().unwrap().remove(identifier);
        Ok(())
    }
}

#[derive(Default)]
struct ScriptedRanker {
    answers: HashMap<String, Vec<PromptScore>>,
}

impl ScriptedRanker {
    fn answer(mut self, address: &str, top: (&str, f64), second: (&str, f64)) -> Self {
        self.answers.insert(
            address.to_string(),
            vec![
                PromptScore::new(top.0, top.1, 0.3),
                PromptScore::new(second.0, second.1, 0.2),
            ],
        );
        self
    }
}

#[async_trait]
impl RankSource for ScriptedRanker {
    async fn rank(
        &self,
        image_address: &str,
        _entity_name: &str,
        _prefix: &str,
    ) -> LogoResult<Vec<PromptScore>> {
        self.answers
            .get(image_address)
            .cloned()
            .ok_or_else(|| LogoError::Rank(format!("no answer for {image_address}")))
    }
}

// ─────────────────────── helpers ───────────────────────

fn logo_png(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for y in height / 4..height * 3 / 4 {
        for x in width / 4..width * 3 / 4 {
            img.put_pixel(x, y, Rgb([20, 40, 160]));
        }
    }
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(image::codecs::png::PngEncoder::new(&mut buf))
        .unwrap();
    buf
}

fn pipeline(web: Arc<FakeWeb>, store: Arc<MemoryStore>, ranker: ScriptedRanker) -> LogoPipeline {
    LogoPipeline::new(
        web.clone(),
        web,
        store,
        Arc::new(ranker),
        PipelineConfig::default(),
    )
}

const PAGE: &str = "https://acme.com/";

const ACME_HTML: &str = r#"
<html><head>
  <meta property="og:image" content="/share.png">
  <link rel="icon" href="/favicon.ico">
</head><body>
  <header><img src="/logo.png" alt="Acme logo"></header>
  <footer><img src="/tiny.png"></footer>
</body></html>
"#;

fn acme_web() -> FakeWeb {
    FakeWeb::default()
        .page(PAGE, 200, ACME_HTML)
        .asset("https://acme.com/logo.png", logo_png(120, 60))
        .asset("https://acme.com/share.png", logo_png(64, 64))
        .asset("https://acme.com/tiny.png", logo_png(16, 16))
}

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn test_winner_found_and_rest_disposed() {
    let web = Arc::new(acme_web());
    let store = Arc::new(MemoryStore::default());
    let ranker = ScriptedRanker::default()
        .answer("mem://acme-com-logo-png", ("the logo of Acme", 0.93), ("abstract art", 0.02))
        .answer("mem://acme-com-share-png", ("the logo of Acme", 0.6), ("a photo of nothing", 0.2));

    let report = pipeline(web.clone(), store.clone(), ranker)
        .run(&LogoRequest::new(PAGE, "Acme"))
        .await
        .unwrap();

    assert_eq!(report.outcome.winner.as_deref(), Some("mem://acme-com-logo-png"));
    assert_eq!(report.outcome.disposal, vec!["mem://acme-com-share-png".to_string()]);
    assert_eq!(report.deleted, vec!["acme-com-share-png".to_string()]);
    assert_eq!(store.keys(), vec!["acme-com-logo-png".to_string()]);
    assert_eq!(report.best(), Some("mem://acme-com-logo-png"));
}

#[tokio::test]
async fn test_unsupported_assets_never_fetched() {
    let web = Arc::new(acme_web());
    let store = Arc::new(MemoryStore::default());

    pipeline(web.clone(), store, ScriptedRanker::default())
        .run(&LogoRequest::new(PAGE, "Acme"))
        .await
        .unwrap();

    let fetched = web.fetched();
    assert!(!fetched.iter().any(|u| u.ends_with(".ico")));
    assert_eq!(fetched.len(), 3);
}

#[tokio::test]
async fn test_small_images_skipped() {
    let web = Arc::new(acme_web());
    let store = Arc::new(MemoryStore::default());

    let report = pipeline(web, store.clone(), ScriptedRanker::default())
        .run(&LogoRequest::new(PAGE, "Acme"))
        .await
        .unwrap();

    assert_eq!(report.uploaded.len(), 2);
    assert!(!store.keys().contains(&"acme-com-tiny-png".to_string()));
    for u in &report.uploaded {
        let stored = store.objects.lock().unwrap()[&u.identifier].clone();
        let img = image::load_from_memory(&stored).unwrap();
        assert_eq!(img.width(), img.height());
    }
}

#[tokio::test]
async fn test_rank_failure_excluded_and_backup_kept() {
    let web = Arc::new(acme_web());
    let store = Arc::new(MemoryStore::default());
    // Only share.png gets an answer, and it is not confident.
    let ranker = ScriptedRanker::default().answer(
        "mem://acme-com-share-png",
        ("the logo of Acme", 0.6),
        ("a photo of nothing", 0.2),
    );

    let report = pipeline(web, store.clone(), ranker)
        .run(&LogoRequest::new(PAGE, "Acme"))
        .await
        .unwrap();

    assert_eq!(report.ranked.len(), 1);
    assert_eq!(report.outcome.winner, None);
    assert_eq!(report.outcome.backups, vec!["mem://acme-com-share-png".to_string()]);
    assert!(report.deleted.is_empty());
    assert_eq!(store.keys().len(), 2);
}

#[tokio::test]
async fn test_empty_page_is_empty_outcome() {
    let web = Arc::new(FakeWeb::default().page(PAGE, 200, "<html><body>nothing</body></html>"));
    let report = pipeline(web.clone(), Arc::new(MemoryStore::default()), ScriptedRanker::default())
        .run(&LogoRequest::new(PAGE, "Acme"))
        .await
        .unwrap();

    assert!(report.candidates.is_empty());
    assert!(report.outcome.is_empty());
    assert!(web.fetched().is_empty());
}

#[tokio::test]
async fn test_error_status_page_is_empty_outcome() {
    let web = Arc::new(FakeWeb::default().page(PAGE, 503, ACME_HTML));
    let report = pipeline(web.clone(), Arc::new(MemoryStore::default()), ScriptedRanker::default())
        .run(&LogoRequest::new(PAGE, "Acme"))
        .await
        .unwrap();

    assert!(report.candidates.is_empty());
    assert_eq!(report.best(), None);
    assert!(web.fetched().is_empty());
}

#[tokio::test]
async fn test_unreachable_page_is_empty_outcome() {
    let web = Arc::new(FakeWeb::default());
    let report = pipeline(web, Arc::new(MemoryStore::default()), ScriptedRanker::default())
        .run(&LogoRequest::new("https://down.example/", "Acme"))
        .await
        .unwrap();
    assert!(report.outcome.is_empty());
}

#[tokio::test]
async fn test_invalid_url_is_error() {
    let web = Arc::new(FakeWeb::default());
    let err = pipeline(web, Arc::new(MemoryStore::default()), ScriptedRanker::default())
        .run(&LogoRequest::new("not a url", "Acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, LogoError::InvalidInput(_)));
}

#[tokio::test]
async fn test_empty_name_uses_default_description() {
    let web = Arc::new(acme_web());
    let ranker = ScriptedRanker::default().answer(
        "mem://acme-com-logo-png",
        ("the logo of a tech company or university", 0.5),
        ("a company logo", 0.3),
    );

    let report = pipeline(web, Arc::new(MemoryStore::default()), ranker)
        .run(&LogoRequest::new(PAGE, ""))
        .await
        .unwrap();

    assert_eq!(report.outcome.winner.as_deref(), Some("mem://acme-com-logo-png"));
}

#[tokio::test]
async fn test_colliding_identifiers_keep_winner_stored() {
    // Both URLs flatten to the same identifier.
    let html = r#"<html><body><header>
        <img src="/a/b.png"><img src="/ab.png">
    </header></body></html>"#;
    let web = Arc::new(
        FakeWeb::default()
            .page(PAGE, 200, html)
            .asset("https://acme.com/a/b.png", logo_png(80, 40))
            .asset("https://acme.com/ab.png", logo_png(60, 60)),
    );
    let store = Arc::new(MemoryStore::default());
    let ranker = ScriptedRanker::default().answer(
        "mem://acme-com-ab-png",
        ("the logo of Acme", 0.95),
        ("a company logo", 0.4),
    );

    let report = pipeline(web, store.clone(), ranker)
        .run(&LogoRequest::new(PAGE, "Acme"))
        .await
        .unwrap();

    assert_eq!(report.uploaded.len(), 1);
    assert_eq!(report.uploaded[0].source_url, "https://acme.com/a/b.png");
    assert_eq!(report.outcome.winner.as_deref(), Some("mem://acme-com-ab-png"));
    assert!(report.outcome.disposal.is_empty());
    assert!(report.deleted.is_empty());
    assert_eq!(store.keys(), vec!["acme-com-ab-png".to_string()]);
}
