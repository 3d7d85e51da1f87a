mod common;

use common::{FakeRenderer, ARTICLE_PAGE};
use futures::future::join_all;
use mockito::Server;
use scholar_flow::config::PipelineSettings;
use scholar_flow::engine::dispatcher::{AdapterDispatcher, SourceMatcher};
use scholar_flow::engine::orchestrator::{ErrorKind, Orchestrator, PipelineError};
use scholar_flow::network::client::FastClient;
use scholar_flow::network::identity::IdentityRotator;
use scholar_flow::persistence::{InMemoryReferenceStore, ReferenceSource, ReferenceStore};
use scholar_flow::refinery::{DisciplineModel, DocumentType};
use scholar_flow::sources::{
    AsyncResult, PdfAdapter, RawExtraction, RenderedSourceAdapter, SelectorProfile, SourceAdapter,
    SourceError,
};
use std::sync::Arc;
use std::time::Duration;

/// Adapter returning a fixed extraction after a delay.
struct StubAdapter {
    raw: RawExtraction,
    delay: Duration,
}

impl SourceAdapter for StubAdapter {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn extract(&self, _url: &str) -> AsyncResult<RawExtraction> {
        let raw = self.raw.clone();
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok::<_, SourceError>(raw)
        })
    }
}

fn model() -> Arc<DisciplineModel> {
    Arc::new(DisciplineModel::with_default_corpus().unwrap())
}

fn client() -> FastClient {
    FastClient::new(Duration::from_secs(5)).unwrap()
}

fn standard(renderer: FakeRenderer) -> Orchestrator {
    Orchestrator::from_parts(
        &PipelineSettings::default(),
        model(),
        client(),
        common::pool(Arc::new(renderer), 1),
    )
}

fn with_stub(raw: RawExtraction, delay: Duration, settings: &PipelineSettings) -> Orchestrator {
    let dispatcher = AdapterDispatcher::new().route(
        SourceMatcher::Any,
        Arc::new(StubAdapter { raw, delay }),
    );
    let pdf = Arc::new(PdfAdapter::new(client(), Arc::new(IdentityRotator::new())));
    Orchestrator::new(dispatcher, model(), pdf, settings)
}

#[tokio::test]
async fn test_invalid_urls_rejected() {
    let orchestrator = standard(FakeRenderer::serving(""));

    for url in ["", "not a url", "ftp://example.org/paper", "mailto:x@example.org"] {
        let err = orchestrator.extract_and_classify(url, None).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)), "{url}");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}

#[tokio::test]
async fn test_generic_page_end_to_end() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/article")
        .with_status(200)
        .with_body(ARTICLE_PAGE)
        .create_async()
        .await;

    let orchestrator = standard(FakeRenderer::serving(""));
    let url = format!("{}/article#comments", server.url());
    let draft = orchestrator.extract_and_classify(&url, None).await.unwrap();

    assert_eq!(draft.title, "Convolutional Neural Networks for Image Recognition");
    assert_eq!(draft.authors, vec!["Yann LeCun"]);
    assert_eq!(draft.publication_year, Some(2015));
    assert_eq!(draft.url.as_deref(), Some(format!("{}/article", server.url()).as_str()));
    assert_eq!(draft.source, ReferenceSource::UrlExtraction);
    assert!(!draft.keywords.is_empty());
    assert!(draft.keywords.len() <= 10);

    let metadata = draft.extraction_metadata.unwrap();
    assert_eq!(metadata.extraction_method, "generic_static");
    assert!((0.0..=1.0).contains(&metadata.confidence));
}

const CITED_PAGE: &str = r#"<html><head>
    <title>Attention Is All You Need</title>
    <meta name="citation_title" content="Attention Is All You Need">
    <meta name="citation_author" content="Ashish Vaswani">
    <meta name="citation_doi" content="10.48550/arXiv.1706.03762">
    <meta name="citation_journal_title" content="Advances in Neural Information Processing Systems">
    <meta name="citation_publication_date" content="2017/06/12">
</head><body><p>We propose a new network architecture based on attention.</p></body></html>"#;

#[tokio::test]
async fn test_citation_doi_and_journal_are_kept() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/cited")
        .with_status(200)
        .with_body(CITED_PAGE)
        .create_async()
        .await;

    let orchestrator = standard(FakeRenderer::serving(""));
    let store = InMemoryReferenceStore::new();
    let record = orchestrator
        .ingest_url(&format!("{}/cited", server.url()), None, &store)
        .await
        .unwrap();

    assert_eq!(record.doi.as_deref(), Some("10.48550/arXiv.1706.03762"));
    assert_eq!(
        record.journal.as_deref(),
        Some("Advances in Neural Information Processing Systems")
    );
    assert_eq!(record.publication_year, Some(2017));
    assert_eq!(record.authors, vec!["Ashish Vaswani"]);

    let stored = store.find_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(stored.doi, record.doi);
}

#[tokio::test]
async fn test_concurrent_rendered_extractions_respect_cap() {
    let renderer = Arc::new(
        FakeRenderer::serving(
            r#"<html><body><div class="gs_r">
                <h3 class="gs_rt"><a href="/paper">Deep Learning for Image Recognition</a></h3>
                <div class="gs_a">K He - CVPR, 2016 - ieee.org</div>
                <div class="gs_rs">Neural network training at depth.</div>
            </div></body></html>"#,
        )
        .with_delay(Duration::from_millis(50)),
    );
    let pool = common::pool(renderer.clone(), 2);
    let dispatcher = AdapterDispatcher::new().route(
        SourceMatcher::Any,
        Arc::new(RenderedSourceAdapter::new(
            "google_scholar",
            SelectorProfile::google_scholar(),
            pool.clone(),
        )),
    );
    let pdf = Arc::new(PdfAdapter::new(client(), Arc::new(IdentityRotator::new())));
    let orchestrator = Orchestrator::new(dispatcher, model(), pdf, &PipelineSettings::default());

    let urls: Vec<String> = (0..6)
        .map(|i| format!("https://scholar.google.com/scholar?q=paper{}", i))
        .collect();
    let results = join_all(urls.iter().map(|url| orchestrator.extract_and_classify(url, None))).await;

    for result in results {
        let draft = result.unwrap();
        assert_eq!(draft.title, "Deep Learning for Image Recognition");
        assert_eq!(draft.publication_year, Some(2016));
    }
    assert_eq!(renderer.renders(), 6);
    assert_eq!(pool.peak(), 2);
    assert_eq!(pool.active(), 0);
}

#[tokio::test]
async fn test_type_hint_overrides_detection() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/article")
        .with_status(200)
        .with_body(ARTICLE_PAGE)
        .create_async()
        .await;

    let orchestrator = standard(FakeRenderer::serving(""));
    let draft = orchestrator
        .extract_and_classify(&format!("{}/article", server.url()), Some(DocumentType::Thesis))
        .await
        .unwrap();
    assert_eq!(draft.document_type, DocumentType::Thesis);
}

#[tokio::test]
async fn test_blocked_page_uses_rendered_html() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/guarded").with_status(403).create_async().await;

    let orchestrator = standard(FakeRenderer::serving(ARTICLE_PAGE));
    let draft = orchestrator
        .extract_and_classify(&format!("{}/guarded", server.url()), None)
        .await
        .unwrap();

    assert_eq!(draft.title, "Convolutional Neural Networks for Image Recognition");
    assert_eq!(draft.extraction_metadata.unwrap().extraction_method, "generic_rendered");
}

#[tokio::test]
async fn test_non_pdf_on_pdf_route_is_extraction_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/paper.pdf")
        .with_status(200)
        .with_body("<html>nope</html>")
        .create_async()
        .await;

    let orchestrator = standard(FakeRenderer::serving(""));
    let err = orchestrator
        .extract_and_classify(&format!("{}/paper.pdf", server.url()), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Extraction { cause: SourceError::Parse(_), .. }
    ));
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
}

#[tokio::test]
async fn test_empty_title_is_extraction_error() {
    let raw = RawExtraction {
        abstract_text: Some("An abstract without a title".to_string()),
        ..RawExtraction::new("stub")
    };
    let orchestrator = with_stub(raw, Duration::ZERO, &PipelineSettings::default());

    let err = orchestrator
        .extract_and_classify("https://example.org/untitled", None)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Extraction { .. }));
}

#[tokio::test]
async fn test_deadline_expiry_is_timeout() {
    let settings = PipelineSettings {
        static_timeout_secs: 1,
        ..Default::default()
    };
    let raw = RawExtraction {
        title: "Slow".to_string(),
        ..RawExtraction::new("stub")
    };
    let orchestrator = with_stub(raw, Duration::from_secs(3), &settings);

    let err = orchestrator
        .extract_and_classify("https://example.org/slow", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Extraction { cause: SourceError::Timeout, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_broken_pdf_link_is_swallowed() {
    let mut server = Server::new_async().await;
    let pdf = server
        .mock("GET", "/paper.pdf")
        .with_status(404)
        .create_async()
        .await;

    let raw = RawExtraction {
        title: "Quantum Error Correction".to_string(),
        abstract_text: Some("Quantum computing with physics of qubits.".to_string()),
        pdf_link: Some(format!("{}/paper.pdf", server.url())),
        ..RawExtraction::new("stub")
    };
    let orchestrator = with_stub(raw, Duration::ZERO, &PipelineSettings::default());

    let draft = orchestrator
        .extract_and_classify("https://example.org/quantum", None)
        .await
        .unwrap();

    pdf.assert_async().await;
    assert_eq!(draft.title, "Quantum Error Correction");
    assert!(draft.full_text.is_none());
}

#[tokio::test]
async fn test_ingest_url_saves_record() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/article")
        .with_status(200)
        .with_body(ARTICLE_PAGE)
        .create_async()
        .await;

    let orchestrator = standard(FakeRenderer::serving(""));
    let store = InMemoryReferenceStore::new();
    let record = orchestrator
        .ingest_url(&format!("{}/article", server.url()), None, &store)
        .await
        .unwrap();

    let stored = store.find_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(stored, record);
    assert_eq!(record.created_at, record.updated_at);
}

#[tokio::test]
async fn test_failed_extraction_saves_nothing() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/gone").with_status(404).create_async().await;

    let orchestrator = standard(FakeRenderer::serving(""));
    let store = InMemoryReferenceStore::new();
    let result = orchestrator
        .ingest_url(&format!("{}/gone", server.url()), None, &store)
        .await;

    assert!(result.is_err());
    assert_eq!(store.count(Default::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_classify_text() {
    let orchestrator = standard(FakeRenderer::serving(""));

    let profile = orchestrator.classify_text("");
    assert_eq!(profile.discipline, "General");
    assert_eq!(profile.confidence, 0.0);
    assert!(profile.keywords.is_empty());

    let profile = orchestrator.classify_text("neural networks and deep learning algorithms");
    assert!((0.0..=1.0).contains(&profile.confidence));
    assert!(profile.keywords.contains(&"neural".to_string()));
}
