use lifelog_export::{
    ContentNode, ExportEvent, ExportFormat, ExportLayout, ExportOptions, ExportOutcome, Exporter,
    Lifelog, LifelogClient, LifelogError, LifelogPage, LifelogSource, ListQuery,
};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============ IN-MEMORY SOURCE ============

/// Serves fixed pages keyed by cursor and counts every call.
#[derive(Default)]
struct MemorySource {
    pages: HashMap<Option<String>, LifelogPage>,
    records: RefCell<HashMap<String, Lifelog>>,
    list_calls: Cell<usize>,
    fetches: RefCell<Vec<String>>,
    queries: RefCell<Vec<ListQuery>>,
}

impl MemorySource {
    fn with_page(mut self, cursor: Option<&str>, ids: &[&str], next: Option<&str>) -> Self {
        let lifelogs: Vec<Lifelog> = ids.iter().map(|id| lifelog(id, "Team meeting")).collect();
        for log in &lifelogs {
            self.records
                .borrow_mut()
                .insert(log.id.clone(), log.clone());
        }
        self.pages.insert(
            cursor.map(str::to_string),
            LifelogPage {
                lifelogs,
                next_cursor: next.map(str::to_string),
            },
        );
        self
    }

    fn with_record(self, record: Lifelog) -> Self {
        self.records
            .borrow_mut()
            .insert(record.id.clone(), record);
        self
    }

    fn set_title(&self, id: &str, title: &str) {
        if let Some(record) = self.records.borrow_mut().get_mut(id) {
            record.title = title.to_string();
        }
    }

    fn fetch_count(&self, id: &str) -> usize {
        self.fetches.borrow().iter().filter(|f| *f == id).count()
    }
}

impl LifelogSource for MemorySource {
    fn list_lifelogs(&self, query: &ListQuery) -> lifelog_export::Result<LifelogPage> {
        self.list_calls.set(self.list_calls.get() + 1);
        self.queries.borrow_mut().push(query.clone());
        self.pages
            .get(&query.cursor)
            .cloned()
            .ok_or_else(|| LifelogError::Request {
                status: Some(400),
                message: format!("unknown cursor {:?}", query.cursor),
            })
    }

    fn get_lifelog(&self, id: &str) -> lifelog_export::Result<Lifelog> {
        self.fetches.borrow_mut().push(id.to_string());
        self.records
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| LifelogError::NotFound { id: id.to_string() })
    }
}

fn lifelog(id: &str, title: &str) -> Lifelog {
    Lifelog {
        id: id.to_string(),
        title: title.to_string(),
        markdown: Some(format!("# {}\n\nNotes from the {} demo.", title, id)),
        contents: vec![ContentNode::new("heading1", title)],
        start_time: "2025-04-10T14:00:00+02:00".to_string(),
        end_time: "2025-04-10T15:00:00+02:00".to_string(),
    }
}

fn options() -> ExportOptions {
    ExportOptions {
        page_delay: Duration::ZERO,
        ..ExportOptions::default()
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

// ============ SINGLE EXPORT ============

#[test]
fn test_export_one_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default().with_record(lifelog("abc", "Team meeting"));
    let exporter = Exporter::new(&source, temp.path(), options());

    let first = exporter.export_one("abc").unwrap();
    assert_eq!(
        first,
        ExportOutcome::Written(vec![temp.path().join("lifelog_abc.json")])
    );

    let second = exporter.export_one("abc").unwrap();
    assert_eq!(second, ExportOutcome::Skipped);

    assert_eq!(source.fetch_count("abc"), 1);
    assert_eq!(file_count(temp.path()), 1);

    let written = read_json(&temp.path().join("lifelog_abc.json"));
    assert_eq!(written["id"], "abc");
    assert_eq!(written["startTime"], "2025-04-10T14:00:00+02:00");
    assert_eq!(written["tags"], json!(["meeting", "demo"]));
}

#[test]
fn test_repull_overwrites_with_fresh_content() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default().with_record(lifelog("abc", "Old title"));

    Exporter::new(&source, temp.path(), options())
        .export_one("abc")
        .unwrap();

    source.set_title("abc", "New title");
    let forced = ExportOptions {
        force: true,
        ..options()
    };
    let outcome = Exporter::new(&source, temp.path(), forced)
        .export_one("abc")
        .unwrap();

    assert!(matches!(outcome, ExportOutcome::Written(_)));
    assert_eq!(source.fetch_count("abc"), 2);
    let written = read_json(&temp.path().join("lifelog_abc.json"));
    assert_eq!(written["title"], "New title");
}

#[test]
fn test_export_one_not_found_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default();
    let exporter = Exporter::new(&source, temp.path().join("out"), options());

    let result = exporter.export_one("missing");
    assert!(matches!(result, Err(LifelogError::NotFound { .. })));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn test_export_one_markdown_dated() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default().with_record(lifelog("abc", "Onboarding call"));
    let opts = ExportOptions {
        format: ExportFormat::Markdown,
        layout: ExportLayout::Dated,
        ..options()
    };

    Exporter::new(&source, temp.path(), opts)
        .export_one("abc")
        .unwrap();

    let day = temp.path().join("2025-04-10");
    let body = fs::read_to_string(day.join("abc.md")).unwrap();
    assert!(body.starts_with("# Onboarding call"));

    let meta = read_json(&day.join("abc.meta.json"));
    assert_eq!(meta["data_file"], "abc.md");
    assert_eq!(meta["tags"], json!(["demo", "onboarding", "call"]));

    // The dated export is recognized on the next run
    let again = Exporter::new(&source, temp.path(), options()).export_one("abc");
    assert_eq!(again.unwrap(), ExportOutcome::Skipped);
}

#[test]
fn test_id_ending_in_meta_is_fetched_once() {
    for layout in [ExportLayout::Flat, ExportLayout::Dated] {
        let temp = TempDir::new().unwrap();
        let source = MemorySource::default().with_record(lifelog("rec.meta", "Team meeting"));
        let opts = ExportOptions {
            layout,
            ..options()
        };
        let exporter = Exporter::new(&source, temp.path(), opts);

        let first = exporter.export_one("rec.meta").unwrap();
        assert!(matches!(first, ExportOutcome::Written(_)), "{:?}", layout);
        let second = exporter.export_one("rec.meta").unwrap();
        assert_eq!(second, ExportOutcome::Skipped, "{:?}", layout);
        assert_eq!(source.fetch_count("rec.meta"), 1, "{:?}", layout);
    }
}

// ============ FULL EXPORT ============

#[test]
fn test_export_all_follows_cursor_chain() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default()
        .with_page(None, &["a", "b"], Some("p2"))
        .with_page(Some("p2"), &["c"], None);
    let opts = ExportOptions {
        page_size: 2,
        timezone: Some("Europe/Paris".to_string()),
        ..options()
    };

    let report = Exporter::new(&source, temp.path(), opts)
        .export_all()
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.pages, 2);
    assert_eq!(report.written, 3);
    assert_eq!(file_count(temp.path()), 3);

    let queries = source.queries.borrow();
    assert_eq!(queries[0].cursor, None);
    assert_eq!(queries[1].cursor.as_deref(), Some("p2"));
    assert!(queries.iter().all(|q| q.limit == 2));
    assert!(queries
        .iter()
        .all(|q| q.timezone.as_deref() == Some("Europe/Paris")));
}

#[test]
fn test_export_all_skips_existing_without_fetching() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default().with_page(None, &["a", "b"], None);
    fs::write(temp.path().join("lifelog_a.json"), "{}").unwrap();

    let report = Exporter::new(&source, temp.path(), options())
        .export_all()
        .unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(source.fetch_count("a"), 0);
    assert_eq!(source.fetch_count("b"), 1);
    assert_eq!(
        fs::read_to_string(temp.path().join("lifelog_a.json")).unwrap(),
        "{}"
    );
}

#[test]
fn test_record_listed_twice_is_fetched_once() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default()
        .with_page(None, &["a", "b"], Some("p2"))
        .with_page(Some("p2"), &["b", "c"], None);

    for force in [false, true] {
        source.fetches.borrow_mut().clear();
        let opts = ExportOptions { force, ..options() };
        Exporter::new(&source, temp.path(), opts)
            .export_all()
            .unwrap();
        assert_eq!(source.fetch_count("b"), 1, "force={}", force);
    }
}

#[test]
fn test_failed_record_does_not_stop_run() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default().with_page(None, &["a", "b", "c"], None);
    // A directory where the file should go makes the write fail
    fs::create_dir(temp.path().join("lifelog_b.json")).unwrap();

    let mut failed = Vec::new();
    let report = Exporter::new(&source, temp.path(), options())
        .export_all_with(|event| {
            if let ExportEvent::Failed { id, .. } = event {
                failed.push(id.to_string());
            }
        })
        .unwrap();

    assert_eq!(report.written, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "b");
    assert!(matches!(
        report.failures[0].1,
        LifelogError::Filesystem { .. }
    ));
    assert!(!report.is_complete());
    assert_eq!(failed, vec!["b"]);
    assert!(temp.path().join("lifelog_a.json").is_file());
    assert!(temp.path().join("lifelog_c.json").is_file());
}

#[test]
fn test_listing_failure_aborts_run() {
    let temp = TempDir::new().unwrap();
    // Second page is missing, so listing it fails
    let source = MemorySource::default().with_page(None, &["a"], Some("gone"));

    let result = Exporter::new(&source, temp.path(), options()).export_all();

    assert!(matches!(result, Err(LifelogError::Request { .. })));
    assert!(temp.path().join("lifelog_a.json").is_file());
}

#[test]
fn test_repeated_cursor_is_pagination_loop() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default()
        .with_page(None, &["a"], Some("x"))
        .with_page(Some("x"), &["b"], Some("x"));

    let result = Exporter::new(&source, temp.path(), options()).export_all();

    match result {
        Err(err @ LifelogError::PaginationLoop { .. }) => assert!(err.is_fatal()),
        other => panic!("expected PaginationLoop, got {:?}", other),
    }
    assert_eq!(source.list_calls.get(), 2);
}

#[test]
fn test_page_ceiling_is_pagination_loop() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default()
        .with_page(None, &[], Some("1"))
        .with_page(Some("1"), &[], Some("2"))
        .with_page(Some("2"), &[], Some("3"))
        .with_page(Some("3"), &[], None);
    let opts = ExportOptions {
        max_pages: 3,
        ..options()
    };

    let result = Exporter::new(&source, temp.path(), opts).export_all();

    assert!(matches!(
        result,
        Err(LifelogError::PaginationLoop { pages: 3, .. })
    ));
}

#[test]
fn test_cancelled_run_stops_between_records() {
    let temp = TempDir::new().unwrap();
    let source = MemorySource::default().with_page(None, &["a", "b", "c"], None);
    let cancel = Arc::new(AtomicBool::new(false));
    let opts = ExportOptions {
        cancel: Some(Arc::clone(&cancel)),
        ..options()
    };

    let report = Exporter::new(&source, temp.path(), opts)
        .export_all_with(|event| {
            if let ExportEvent::Written { .. } = event {
                cancel.store(true, Ordering::Relaxed);
            }
        })
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.written, 1);
    assert_eq!(file_count(temp.path()), 1);
}

// ============ OVER HTTP ============

async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}

async fn mount_page(server: &MockServer, cursor: Option<&str>, ids: &[&str], next: &str) {
    let items: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "title": "Call",
                "markdown": "Quick call",
                "startTime": "2025-04-10T14:00:00Z",
                "endTime": "2025-04-10T14:05:00Z"
            })
        })
        .collect();
    let body = json!({
        "data": { "lifelogs": items },
        "meta": { "lifelogs": { "nextCursor": next, "count": ids.len() } }
    });

    let mock = Mock::given(method("GET"))
        .and(path("/v1/lifelogs"))
        .and(query_param_is_missing("id"));
    let mock = match cursor {
        Some(cursor) => mock.and(query_param("cursor", cursor)),
        None => mock.and(query_param_is_missing("cursor")),
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_record(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/lifelogs"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "lifelogs": [{
                "id": id,
                "title": "Call",
                "markdown": "Quick call",
                "startTime": "2025-04-10T14:00:00Z",
                "endTime": "2025-04-10T14:05:00Z"
            }] }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_http_empty_cursor_ends_after_two_pages() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, None, &["r1"], "a").await;
    mount_page(&mock_server, Some("a"), &["r2"], "").await;
    mount_record(&mock_server, "r1").await;
    mount_record(&mock_server, "r2").await;

    let temp = TempDir::new().unwrap();
    let destination = temp.path().to_path_buf();
    let base = format!("{}/v1", mock_server.uri());

    let report = blocking(move || {
        let client = LifelogClient::with_options("key", &base, Duration::from_secs(5)).unwrap();
        Exporter::new(&client, destination, options()).export_all()
    })
    .await
    .unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.written, 2);
    assert!(temp.path().join("lifelog_r2.json").is_file());
}

#[tokio::test]
async fn test_http_repeated_cursor_is_pagination_loop() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, None, &[], "a").await;
    mount_page(&mock_server, Some("a"), &[], "b").await;
    mount_page(&mock_server, Some("b"), &[], "b").await;

    let temp = TempDir::new().unwrap();
    let destination = temp.path().to_path_buf();
    let base = format!("{}/v1", mock_server.uri());

    let result = blocking(move || {
        let client = LifelogClient::with_options("key", &base, Duration::from_secs(5)).unwrap();
        Exporter::new(&client, destination, options()).export_all()
    })
    .await;

    match result {
        Err(LifelogError::PaginationLoop { pages, cursor }) => {
            assert_eq!(pages, 3);
            assert_eq!(cursor.as_deref(), Some("b"));
        }
        other => panic!("expected PaginationLoop, got {:?}", other),
    }
}
