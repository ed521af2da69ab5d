use policyfeed_core::Manifest;
use serde::{Deserialize, Serialize};

/// Page counts reported by the rendering step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCounts {
    /// HTML pages written: detail pages plus index pages.
    pub generated: usize,
    /// Records skipped by the renderer (closed, or otherwise unpublishable).
    pub excluded: usize,
    pub sitemap_entries: usize,
}

/// Summarize a completed build into the published contract.
pub fn build_manifest(run_id: &str, counts: PageCounts, build_sha: &str, generated_at: &str) -> Manifest {
    Manifest {
        run_id: run_id.to_string(),
        generated_pages: counts.generated,
        excluded_pages: counts.excluded,
        sitemap_entries: counts.sitemap_entries,
        build_sha: if build_sha.trim().is_empty() {
            "local".to_string()
        } else {
            build_sha.trim().to_string()
        },
        generated_at: generated_at.to_string(),
    }
}
