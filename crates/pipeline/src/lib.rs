//! `policyfeed-pipeline`: the run orchestrator.
//!
//! Owns run-scoped artifact storage and the canonical dataset slots, and
//! sequences fetch → reconcile → render → gates → manifest → publish.

pub mod context;
pub mod error;
pub mod fetch;
pub mod health;
pub mod orchestrator;
pub mod render;
pub mod schema;
pub mod store;

pub use context::{PipelineContext, SourcesInput};
pub use error::PipelineError;
pub use fetch::fetch_all;
pub use orchestrator::{Pipeline, PublishReport, RunMode, RunOutcome};
pub use render::{slugify, DetailPageRenderer, RenderOutput, Renderer, SiteScanner};
pub use schema::SchemaSet;
pub use store::{
    ArtifactBundle, ArtifactStore, DatasetStore, FsArtifactStore, FsDatasetStore,
    MemoryArtifactStore, MemoryDatasetStore,
};
