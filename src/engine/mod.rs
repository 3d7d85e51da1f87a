// * The Engine: URL canonicalization, adapter routing, headless rendering
// * and the orchestrator that ties them to the refinery.

pub mod dispatcher;
pub mod normalization;
pub mod orchestrator;
pub mod renderer;

// * Re-exports for convenient access
pub use dispatcher::{AdapterDispatcher, SourceMatcher};
pub use normalization::{canonicalize_url, UrlRejection};
pub use orchestrator::{ErrorKind, Orchestrator, PipelineError};
pub use renderer::{
    ChromiumRenderer, PageRenderer, RenderError, RenderPool, RenderRequest, RenderSession,
    RenderedPage,
};
