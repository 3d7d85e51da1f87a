#![allow(dead_code)]

use scholar_flow::engine::renderer::{
    AsyncResult, PageRenderer, RenderError, RenderPool, RenderRequest, RenderedPage,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Stand-in for Chromium: returns canned HTML after a delay.
pub struct FakeRenderer {
    html: String,
    delay: Duration,
    fail: bool,
    renders: AtomicUsize,
}

impl FakeRenderer {
    pub fn serving(html: &str) -> Self {
        Self {
            html: html.to_string(),
            delay: Duration::ZERO,
            fail: false,
            renders: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::serving("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl PageRenderer for FakeRenderer {
    fn render(&self, request: RenderRequest) -> AsyncResult<RenderedPage> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let html = self.html.clone();
        let delay = self.delay;
        let fail = self.fail;

        Box::pin(async move {
            tokio::time::sleep(delay).await;
            if fail {
                return Err(RenderError::Navigation(format!("cannot reach {}", request.url)));
            }
            Ok(RenderedPage {
                html,
                final_url: request.url,
            })
        })
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

pub fn pool(renderer: Arc<FakeRenderer>, capacity: usize) -> Arc<RenderPool> {
    Arc::new(RenderPool::new(
        renderer,
        capacity,
        Duration::from_secs(5),
        Duration::from_secs(5),
    ))
}

pub const ARTICLE_PAGE: &str = r#"<html><head>
    <title>Convolutional Neural Networks for Image Recognition</title>
    <meta name="description" content="We train deep convolutional neural networks on large image datasets.">
    <meta name="citation_author" content="Yann LeCun">
    <meta name="citation_publication_date" content="2015/05/28">
</head><body>
    <nav>Home | About</nav>
    <article>
        <p>Deep learning algorithms with neural networks improve computer vision.</p>
        <p>The network learns image features through training on labeled data.</p>
    </article>
</body></html>"#;

/// Builds a one-page PDF with one line of Helvetica text per entry.
pub fn one_page_pdf(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from("BT\n/F1 16 Tf\n72 720 Td\n");
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            content.push_str("0 -28 Td\n");
        }
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        content.push_str(&format!("({}) Tj\n", escaped));
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}endstream", content.len(), content),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_start = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_start
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}

/// Whitespace-insensitive view of extracted text.
pub fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
