//! `policyfeed-gates`: pure evaluation steps run after rendering.
//!
//! Gates read the canonical set and rendered pages handed to them and return
//! a pass / soft_fail / hard_fail report. No IO, no owned state.

pub mod manifest;
pub mod monetization;
pub mod page;
pub mod publish;
pub mod quality;

pub use manifest::{build_manifest, PageCounts};
pub use monetization::PolicyRules;
pub use page::RenderedPage;
pub use publish::deploy_ready;
pub use quality::{QualityThresholds, REQUIRED_SECTION_MARKERS};
