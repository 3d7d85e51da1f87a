// * Configuration Constants
// * Central location for all configurable thresholds and timeouts

// * Deadline for static (plain HTTP) fetches in seconds
pub const STATIC_TIMEOUT_SECS: u64 = 30;

// * Deadline for paths that may go through the headless browser
pub const RENDER_TIMEOUT_SECS: u64 = 60;

// * Page navigation timeout inside a render session
pub const PAGE_TIMEOUT_MS: u64 = 30_000;

// * Bounded wait for dynamic content after the network settles
pub const RENDER_SETTLE_MS: u64 = 2_000;

// * Network-idle polling: interval and number of quiet polls required
pub const NETWORK_IDLE_POLL_MS: u64 = 250;
pub const NETWORK_IDLE_QUIET_POLLS: u32 = 2;

// * Concurrent headless sessions allowed across the process
pub const MAX_RENDER_SESSIONS: usize = 2;

// * How long a request may queue for a render session before failing as busy
pub const RENDER_QUEUE_TIMEOUT_SECS: u64 = 15;

// * Upper bound for downloaded or uploaded PDF bodies (50MB)
pub const MAX_PDF_BYTES: usize = 50 * 1024 * 1024;

// * Deadline for PDF-to-text conversion
pub const PDF_PARSE_TIMEOUT_SECS: u64 = 30;

// * PDF parses allowed on the blocking pool at once
pub const MAX_CONCURRENT_PDF_PARSES: usize = 4;

// * Body text fallback is truncated to this many characters
pub const BODY_TEXT_LIMIT: usize = 5_000;

// * Keywords kept per record
pub const MAX_KEYWORDS: usize = 10;

// * Bounds for a plausible publication year
pub const MIN_PUBLICATION_YEAR: i32 = 1000;
pub const MAX_PUBLICATION_YEAR: i32 = 3000;

// * Discipline label used when nothing better is known
pub const DEFAULT_DISCIPLINE: &str = "General";

// * Default directory for uploaded PDFs
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

// * Default Prometheus exporter port
pub const DEFAULT_METRICS_PORT: u16 = 9000;
