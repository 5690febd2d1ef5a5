//! End-to-end tests for the daily pipeline against local stand-ins for the
//! verse API, the book file host and the Gemini endpoint.
//!
//! Every upstream is a small axum app bound to `127.0.0.1:0`.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use daily_wisdom::assembler::{
    DEFAULT_HISTORICAL_CURIOSITY, DEFAULT_INTERPRETATION, DEFAULT_PRACTICAL_STEPS,
    DEFAULT_REFLECTION_QUESTION, PLACEHOLDER_VERSE_TEXT,
};
use daily_wisdom::config::{parse_config, Config};
use daily_wisdom::models::{SourceKind, Verse};
use daily_wisdom::pipeline::DailyPipeline;
use daily_wisdom::server::router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ─── Upstream stand-ins ─────────────────────────────────────────────

#[derive(Clone)]
struct Upstream {
    api_status: u16,
    api_body: Value,
    book_status: u16,
    book_body: String,
    gemini_status: u16,
    gemini_text: String,
    book_hits: Arc<AtomicUsize>,
    api_hits: Arc<AtomicUsize>,
    gemini_requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Upstream {
    /// Everything fails until configured otherwise.
    fn failing() -> Self {
        Self {
            api_status: 500,
            api_body: json!({ "msg": "down" }),
            book_status: 404,
            book_body: String::new(),
            gemini_status: 500,
            gemini_text: String::new(),
            book_hits: Arc::new(AtomicUsize::new(0)),
            api_hits: Arc::new(AtomicUsize::new(0)),
            gemini_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_gemini(mut self, text: &str) -> Self {
        self.gemini_status = 200;
        self.gemini_text = text.to_string();
        self
    }

    fn requests(&self) -> Vec<(Option<String>, Value)> {
        self.gemini_requests.lock().unwrap().clone()
    }
}

async fn handle_api(
    State(up): State<Upstream>,
    Path(_day): Path<u32>,
) -> (StatusCode, Json<Value>) {
    up.api_hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::from_u16(up.api_status).unwrap(),
        Json(up.api_body.clone()),
    )
}

async fn handle_book(State(up): State<Upstream>) -> (StatusCode, String) {
    up.book_hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::from_u16(up.book_status).unwrap(),
        up.book_body.clone(),
    )
}

async fn handle_gemini(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    up.gemini_requests.lock().unwrap().push((key, body));
    (
        StatusCode::from_u16(up.gemini_status).unwrap(),
        Json(json!({
            "candidates": [{ "content": { "parts": [{ "text": up.gemini_text }] } }]
        })),
    )
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_upstream(up: &Upstream) -> String {
    let app = Router::new()
        .route("/api/verses/nvi/pv/{day}", get(handle_api))
        .route("/pv.json", get(handle_book))
        .route(
            "/v1beta/models/gemini-test:generateContent",
            post(handle_gemini),
        )
        .with_state(up.clone());
    spawn(app).await
}

fn test_config(base: &str, tmp: &TempDir, bundled: Option<&str>) -> Config {
    let bundled_line = match bundled {
        Some(dataset) => {
            let path = tmp.path().join("proverbs.json");
            std::fs::write(&path, dataset).unwrap();
            format!("path = \"{}\"", path.display())
        }
        None => String::new(),
    };
    let content = format!(
        r#"
[book]
name = "Proverbs"
chapters = 31

[sources.bundled]
{bundled_line}

[sources.remote_api]
enabled = true
base_url = "{base}/api"
timeout_secs = 5

[sources.remote_file]
enabled = true
url = "{base}/pv.json"
timeout_secs = 5

[cache]
dir = "{cache}"

[generator]
provider = "gemini"
model = "gemini-test"
base_url = "{base}"
timeout_secs = 5
"#,
        cache = tmp.path().join("cache").display(),
    );
    let mut cfg = parse_config(&content).unwrap();
    cfg.generator.api_key = Some("test-key".to_string());
    cfg
}

const REFLECTION: &str = r#"{
    "interpretation": "X",
    "practicalSteps": ["p1", "p2", "p3"],
    "reflectionQuestion": "Q?",
    "historicalCuriosity": "H"
}"#;

fn texts(verses: &[Verse]) -> Vec<&str> {
    verses.iter().map(|v| v.text.as_str()).collect()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bundled_chapter_with_reflection() {
    let up = Upstream::failing().with_gemini(REFLECTION);
    let base = spawn_upstream(&up).await;
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&base, &tmp, Some(r#"{"3": ["A", "B", "C"]}"#));

    let pipeline = DailyPipeline::from_config(&cfg).unwrap();
    let report = pipeline.fetch_report(3).await.unwrap();

    assert_eq!(report.source, Some(SourceKind::Bundled));
    assert_eq!(
        serde_json::to_value(&report.content).unwrap(),
        json!({
            "day": 3,
            "scriptureReference": "Proverbs 3",
            "scriptureVerses": [
                { "verse": 1, "text": "A" },
                { "verse": 2, "text": "B" },
                { "verse": 3, "text": "C" }
            ],
            "interpretation": "X",
            "practicalSteps": ["p1", "p2", "p3"],
            "reflectionQuestion": "Q?",
            "historicalCuriosity": "H"
        })
    );

    // Bundled data short-circuits every remote source.
    assert_eq!(up.api_hits.load(Ordering::SeqCst), 0);
    assert_eq!(up.book_hits.load(Ordering::SeqCst), 0);

    let requests = up.requests();
    assert_eq!(requests.len(), 1);
    let (key, body) = &requests[0];
    assert_eq!(key.as_deref(), Some("test-key"));
    let generation = &body["generationConfig"];
    assert_eq!(generation["responseMimeType"], "application/json");
    assert!((generation["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert!(generation["responseSchema"]["properties"]
        .get("scriptureVerses")
        .is_none());
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains(r#""text":"B""#), "prompt carries the verses");
}

#[tokio::test]
async fn test_remote_api_used_when_bundled_entry_missing() {
    let mut up = Upstream::failing().with_gemini(REFLECTION);
    up.api_status = 200;
    up.api_body = json!({
        "chapter": { "number": 5 },
        "verses": [
            { "number": 2, "text": "second" },
            { "number": 1, "text": "first" }
        ]
    });
    let base = spawn_upstream(&up).await;
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&base, &tmp, Some(r#"{"3": ["A"]}"#));

    let report = DailyPipeline::from_config(&cfg)
        .unwrap()
        .fetch_report(5)
        .await
        .unwrap();

    assert_eq!(report.source, Some(SourceKind::RemoteApi));
    assert_eq!(texts(&report.content.scripture_verses), vec!["first", "second"]);
    assert_eq!(report.content.scripture_verses[1].verse, 2);
    assert_eq!(up.book_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_api_failure_falls_through_to_cached_book() {
    let mut up = Upstream::failing().with_gemini(REFLECTION);
    up.book_status = 200;
    up.book_body = json!({
        "abbrev": "pv",
        "chapters": [["one-1", "one-2"], ["two-1"]]
    })
    .to_string();
    let base = spawn_upstream(&up).await;
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&base, &tmp, None);

    let pipeline = DailyPipeline::from_config(&cfg).unwrap();
    let first = pipeline.fetch_report(2).await.unwrap();
    assert_eq!(first.source, Some(SourceKind::CachedFile));
    assert_eq!(first.content.scripture_verses, vec![Verse::new(1, "two-1")]);

    let again = pipeline.fetch_report(1).await.unwrap();
    assert_eq!(texts(&again.content.scripture_verses), vec!["one-1", "one-2"]);

    // The file cache outlives the pipeline.
    let fresh = DailyPipeline::from_config(&cfg).unwrap();
    assert!(fresh.fetch(2).await.is_some());

    assert_eq!(up.book_hits.load(Ordering::SeqCst), 1, "book downloaded once");
    assert_eq!(up.api_hits.load(Ordering::SeqCst), 3, "API tried every time");
}

#[tokio::test]
async fn test_missing_chapter_in_book_uses_full_generation() {
    let generated = r#"{
        "scriptureVerses": [{ "verse": 1, "text": "g1" }, { "verse": 2, "text": "g2" }],
        "interpretation": "I",
        "practicalSteps": ["s"],
        "reflectionQuestion": "R?",
        "historicalCuriosity": "C"
    }"#;
    let mut up = Upstream::failing().with_gemini(generated);
    up.book_status = 200;
    up.book_body = r#"{"chapters": [["only chapter one"]]}"#.to_string();
    let base = spawn_upstream(&up).await;
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&base, &tmp, None);

    let report = DailyPipeline::from_config(&cfg)
        .unwrap()
        .fetch_report(9)
        .await
        .unwrap();

    assert_eq!(report.source, Some(SourceKind::Generated));
    assert_eq!(texts(&report.content.scripture_verses), vec!["g1", "g2"]);
    assert_eq!(report.content.interpretation, "I");

    let requests = up.requests();
    let generation = &requests[0].1["generationConfig"];
    assert!((generation["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    let required = generation["responseSchema"]["required"].as_array().unwrap();
    assert!(required.contains(&json!("scriptureVerses")));
}

#[tokio::test]
async fn test_everything_down_yields_placeholder_record() {
    let up = Upstream::failing();
    let base = spawn_upstream(&up).await;
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&base, &tmp, None);

    let content = DailyPipeline::from_config(&cfg)
        .unwrap()
        .fetch(7)
        .await
        .expect("degraded record is still returned");

    assert_eq!(content.day, 7);
    assert_eq!(content.scripture_reference, "Proverbs 7");
    assert_eq!(
        content.scripture_verses,
        vec![Verse::new(1, PLACEHOLDER_VERSE_TEXT)]
    );
    assert_eq!(content.interpretation, DEFAULT_INTERPRETATION);
    assert_eq!(content.practical_steps, DEFAULT_PRACTICAL_STEPS.to_vec());
    assert_eq!(content.reflection_question, DEFAULT_REFLECTION_QUESTION);
    assert_eq!(content.historical_curiosity, DEFAULT_HISTORICAL_CURIOSITY);
    assert_eq!(up.requests().len(), 1, "model is called exactly once");
}

#[tokio::test]
async fn test_partial_reflection_defaults_only_missing_field() {
    let up = Upstream::failing().with_gemini(
        r#"{"interpretation": "X", "reflectionQuestion": "Q?", "historicalCuriosity": "H"}"#,
    );
    let base = spawn_upstream(&up).await;
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&base, &tmp, Some(r#"[["a"], ["b"]]"#));

    let content = DailyPipeline::from_config(&cfg)
        .unwrap()
        .fetch(2)
        .await
        .unwrap();

    assert_eq!(content.scripture_verses, vec![Verse::new(1, "b")]);
    assert_eq!(content.practical_steps, DEFAULT_PRACTICAL_STEPS.to_vec());
    assert_eq!(content.interpretation, "X");
    assert_eq!(content.reflection_question, "Q?");
    assert_eq!(content.historical_curiosity, "H");
}

#[tokio::test]
async fn test_identical_responses_give_identical_records() {
    let up = Upstream::failing().with_gemini(REFLECTION);
    let base = spawn_upstream(&up).await;
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&base, &tmp, Some(r#"{"4": ["x", "y"]}"#));
    let pipeline = DailyPipeline::from_config(&cfg).unwrap();

    let a = serde_json::to_vec(&pipeline.fetch(4).await.unwrap()).unwrap();
    let b = serde_json::to_vec(&pipeline.fetch(4).await.unwrap()).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_http_api() {
    let up = Upstream::failing().with_gemini(REFLECTION);
    let base = spawn_upstream(&up).await;
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&base, &tmp, Some(r#"{"3": ["A", "B", "C"]}"#));

    let pipeline = Arc::new(DailyPipeline::from_config(&cfg).unwrap());
    let api = spawn(router(pipeline)).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", api))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let resp = client
        .get(format!("{}/chapters/3", api))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["scriptureReference"], "Proverbs 3");
    assert_eq!(body["scriptureVerses"][2]["text"], "C");

    for bad in ["40", "0", "abc"] {
        let resp = client
            .get(format!("{}/chapters/{}", api, bad))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "day {}", bad);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }

    let resp = client.get(format!("{}/today", api)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}
