//! `policyfeed-core`: shared data model for the ingestion pipeline.
//!
//! Pure types: no IO, no network. Every other crate in the workspace speaks
//! in these structures so the run artifacts have one serialized shape.

pub mod error;
pub mod record;
pub mod report;
pub mod run;
pub mod source;

pub use error::CoreError;
pub use record::{CanonicalRecord, ChangeRecord, ChangeType, RawRow, RecordStatus, REQUIRED_FIELDS};
pub use report::{Decision, FetchReport, PolicyReport, QualityMetrics, QualityReport};
pub use run::{Manifest, RunMeta, RunStage, RunStatus};
pub use source::{
    AuthDescriptor, CanonicalField, FieldCandidates, FieldMapping, Pagination, SourceConfig,
    SourceDefinition, SourceKind,
};
