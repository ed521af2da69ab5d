//! `policyfeed-recon`: canonical dataset reconciliation.
//!
//! Pure engine crate: receives pre-fetched rows and the previous snapshot,
//! returns the canonical set with change classification. No IO.

pub mod classify;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod identity;
pub mod mapping;
pub mod model;

pub use engine::reconcile;
pub use error::ReconError;
pub use identity::synthesize_policy_id;
pub use model::{ChangeSummary, IdCollision, ReconInput, ReconOutput};
