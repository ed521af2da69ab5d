use std::thread;

use policyfeed_connect::{SourceConnector, SourceFetch};
use policyfeed_core::{FetchReport, SourceDefinition};
use tracing::{debug, error};

/// Fetch every definition, returning results in definition order.
///
/// With `parallel` each source runs on its own scoped thread; results are
/// still collected in the given order, so downstream last-wins merging is
/// identical to the sequential path. A panicking connector becomes a failed
/// report for its source only.
pub fn fetch_all(
    connector: &dyn SourceConnector,
    sources: &[SourceDefinition],
    parallel: bool,
) -> Vec<SourceFetch> {
    if !parallel || sources.len() < 2 {
        return sources.iter().map(|s| connector.fetch(s)).collect();
    }

    thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                let start = std::time::Instant::now();
                let handle = scope.spawn(move || connector.fetch(source));
                (source, start, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(source, start, handle)| match handle.join() {
                Ok(fetched) => {
                    debug!(
                        source_id = %source.source_id,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "parallel fetch joined"
                    );
                    fetched
                }
                Err(_) => {
                    error!(source_id = %source.source_id, "connector panicked");
                    SourceFetch {
                        rows: Vec::new(),
                        report: FetchReport::failure(&source.source_id, "connector panicked"),
                    }
                }
            })
            .collect()
    })
}
