//! End-to-end ingestion: discovery, classification, crawling, scheduling and
//! index writing against in-memory collaborators.

use async_trait::async_trait;
use neogpt_config::BuilderConfig;
use neogpt_core::{Embedder, Error, ErrorKind, Fetcher, Result, Source, VectorIndex};
use neogpt_db::InMemoryIndex;
use neogpt_ingest::{
    CancelToken, ChunkConfig, IndexBuilder, IndexWriter, LoaderRegistry, WorkItem, URL_LIST_FILE,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Serves canned pages and remembers what was requested.
struct StaticFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    fn new(pages: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| Error::Fetch {
            url: url.to_string(),
            message: "404 Not Found".into(),
        })
    }
}

/// Letter-frequency vectors: deterministic and good enough to rank by topic.
struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; 26];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(v)
    }
}

fn builder_with(
    fetcher: Arc<StaticFetcher>,
    settings: BuilderConfig,
) -> (IndexBuilder, Arc<InMemoryIndex>) {
    let registry = Arc::new(LoaderRegistry::standard(fetcher, ChunkConfig::default()));
    let index = Arc::new(InMemoryIndex::new());
    let writer = IndexWriter::new(Arc::new(LetterEmbedder), index.clone());
    (IndexBuilder::new(registry, settings, writer), index)
}

#[tokio::test]
async fn mixed_work_list_reports_every_item() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("a.pdf");
    std::fs::write(&pdf, b"%PDF-1.4 truncated").unwrap();

    let fetcher = StaticFetcher::new(&[(
        "https://example.com/page",
        "<html><title>Page</title><body><p>Hello from the web.</p></body></html>",
    )]);
    let settings = BuilderConfig {
        concurrency: 2,
        ..Default::default()
    };
    let (builder, index) = builder_with(fetcher, settings);

    let sources = vec![
        Source::new(pdf.to_string_lossy()),
        Source::new("b.unknownext"),
        Source::new("https://example.com/page"),
    ];
    let work = builder.plan(sources).await;
    let summary = builder.run(work, &CancelToken::new(), None).await.unwrap();
    let report = summary.report;

    assert_eq!(report.enqueued(), 3);
    assert_eq!(report.succeeded() + report.failed().len(), 3);
    assert_eq!(report.failures_of(ErrorKind::ClassificationUnsupported), 1);
    assert_eq!(report.failures_of(ErrorKind::ParseFailure), 1);
    assert_eq!(report.succeeded(), 1);
    assert!(!report.cancelled());

    let unsupported = report
        .failed()
        .iter()
        .find(|f| f.kind == ErrorKind::ClassificationUnsupported)
        .unwrap();
    assert_eq!(unsupported.source.location(), "b.unknownext");

    assert_eq!(summary.stored, 1);
    assert_eq!(index.len().await.unwrap(), 1);
}

#[tokio::test]
async fn directory_build_with_cyclic_crawl() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("guide.md"),
        "# Guide\n\nInstall the tool, then run it.",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("people.csv"),
        "name,team\nAda,compilers\nGrace,languages\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.unknownext"), "ignored").unwrap();
    std::fs::write(dir.path().join(URL_LIST_FILE), "https://site.test/\n").unwrap();

    let fetcher = StaticFetcher::new(&[
        (
            "https://site.test/",
            r#"<p>Home page.</p><a href="/about">About</a><a href="/about/#team">Team</a>"#,
        ),
        (
            "https://site.test/about",
            r#"<p>About us.</p><a href="/">Home</a><a href="https://elsewhere.test/">Out</a>"#,
        ),
    ]);
    let settings = BuilderConfig {
        recursive: true,
        max_depth: 5,
        concurrency: 3,
        ..Default::default()
    };
    let (builder, index) = builder_with(fetcher.clone(), settings);

    let summary = builder
        .build(dir.path(), &CancelToken::new(), None)
        .await
        .unwrap();
    let report = summary.report;

    // guide.md, people.csv, notes.unknownext, two crawled pages
    assert_eq!(report.enqueued(), 5);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failures_of(ErrorKind::ClassificationUnsupported), 1);

    // 1 markdown chunk + 2 csv rows + 2 pages
    assert_eq!(report.total_chunks(), 5);
    assert_eq!(index.len().await.unwrap(), 5);

    assert_eq!(fetcher.request_count("https://elsewhere.test/"), 0);
    let query = LetterEmbedder.embed("Ada compilers").await.unwrap();
    let best = index.search(&query, 1).await.unwrap();
    assert!(best[0].chunk.content.contains("Ada"));
}

#[tokio::test]
async fn cancelled_build_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        std::fs::write(dir.path().join(name), "some text").unwrap();
    }
    let (builder, index) = builder_with(StaticFetcher::new(&[]), BuilderConfig::default());

    let cancel = CancelToken::new();
    cancel.cancel();
    let summary = builder.build(dir.path(), &cancel, None).await.unwrap();

    assert!(summary.report.cancelled());
    assert_eq!(summary.report.skipped(), 3);
    assert_eq!(summary.stored, 0);
    assert_eq!(index.len().await.unwrap(), 0);
}

#[tokio::test]
async fn rejected_items_never_reach_a_worker() {
    let (builder, _index) = builder_with(StaticFetcher::new(&[]), BuilderConfig::default());
    let work = vec![WorkItem::Rejected {
        source: Source::new("https://down.test/"),
        kind: ErrorKind::FetchError,
        message: "connection refused".into(),
    }];

    let summary = builder.run(work, &CancelToken::new(), None).await.unwrap();

    assert_eq!(summary.report.failures_of(ErrorKind::FetchError), 1);
    assert_eq!(summary.report.succeeded(), 0);
}
