use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use policyfeed_core::{FetchReport, Pagination, RawRow, SourceDefinition, SourceKind};
use tracing::{debug, info, warn};

use crate::client::{HttpFetcher, RetryPolicy};
use crate::error::FetchError;
use crate::extract::{parse_json_body, read_items, value_to_text};
use crate::query::{apply_auth, parse_endpoint, set_query_params};
use crate::secrets::SecretStore;

/// Rows plus the report describing how they were obtained.
#[derive(Debug, Clone)]
pub struct SourceFetch {
    pub rows: Vec<RawRow>,
    pub report: FetchReport,
}

/// Fetch-only adapter for one source definition.
///
/// Implementations must not panic or return early for expected failures:
/// those become `report.ok == false` with empty rows.
pub trait SourceConnector: Send + Sync {
    fn fetch(&self, source: &SourceDefinition) -> SourceFetch;
}

#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    /// Base directory for `file_json` endpoints.
    pub root: PathBuf,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
        }
    }
}

/// The standard connector: `file_json` and `http_json` sources.
pub struct Connector {
    root: PathBuf,
    http: HttpFetcher,
    secrets: Arc<dyn SecretStore>,
}

impl Connector {
    pub fn new(settings: ConnectorSettings, secrets: Arc<dyn SecretStore>) -> Result<Self, FetchError> {
        Ok(Self {
            root: settings.root,
            http: HttpFetcher::new(settings.timeout, settings.retry)?,
            secrets,
        })
    }

    fn fetch_rows(&self, source: &SourceDefinition) -> Result<Vec<RawRow>, FetchError> {
        match source.kind {
            SourceKind::FileJson => self.fetch_file(source),
            SourceKind::HttpJson => match &source.pagination {
                Pagination::None => self.fetch_single(source),
                Pagination::Page {
                    page_param,
                    size_param,
                    start_page,
                    max_pages,
                } => self.fetch_paged(source, page_param, size_param, *start_page, *max_pages),
            },
        }
    }

    fn fetch_file(&self, source: &SourceDefinition) -> Result<Vec<RawRow>, FetchError> {
        let path = self.root.join(&source.endpoint);
        let text = std::fs::read_to_string(&path).map_err(|e| FetchError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let payload = parse_json_body(&text).map_err(|e| FetchError::Parse {
            source_id: source.source_id.clone(),
            message: e.to_string(),
        })?;
        Ok(read_items(payload, &source.mapping.items_path))
    }

    fn fetch_single(&self, source: &SourceDefinition) -> Result<Vec<RawRow>, FetchError> {
        let mut url = parse_endpoint(&source.endpoint)?;
        set_query_params(&mut url, &static_params(source));
        apply_auth(&mut url, &source.auth, self.secrets.as_ref())?;

        let payload = self.http.get_json(&source.source_id, &url)?;
        Ok(read_items(payload, &source.mapping.items_path))
    }

    /// Sequential page requests.
    ///
    /// Stops when a page returns fewer rows than the page size. A failure on
    /// the first page fails the fetch; a failure on a later page keeps the
    /// rows collected so far, since some upstreams error past their last page.
    fn fetch_paged(
        &self,
        source: &SourceDefinition,
        page_param: &str,
        size_param: &str,
        start_page: u32,
        max_pages: u32,
    ) -> Result<Vec<RawRow>, FetchError> {
        let page_size = source.page_size(size_param);
        let mut base = parse_endpoint(&source.endpoint)?;
        set_query_params(&mut base, &static_params(source));

        let mut rows = Vec::new();
        for page in start_page..start_page.saturating_add(max_pages) {
            let mut url = base.clone();
            set_query_params(
                &mut url,
                &[
                    (page_param.to_string(), page.to_string()),
                    (size_param.to_string(), page_size.to_string()),
                ],
            );
            apply_auth(&mut url, &source.auth, self.secrets.as_ref())?;

            let payload = match self.http.get_json(&source.source_id, &url) {
                Ok(payload) => payload,
                Err(e) if page > start_page => {
                    warn!(
                        source_id = %source.source_id,
                        page,
                        rows = rows.len(),
                        error = %e,
                        "page failed after retries; keeping rows fetched so far"
                    );
                    break;
                }
                Err(e) => return Err(e),
            };

            let part = read_items(payload, &source.mapping.items_path);
            let count = part.len();
            rows.extend(part);
            debug!(source_id = %source.source_id, page, count, "fetched page");

            if count < page_size {
                break;
            }
        }
        Ok(rows)
    }
}

impl SourceConnector for Connector {
    fn fetch(&self, source: &SourceDefinition) -> SourceFetch {
        match self.fetch_rows(source) {
            Ok(rows) => {
                info!(source_id = %source.source_id, kind = %source.kind, rows = rows.len(), "source fetched");
                let report = FetchReport::success(&source.source_id, rows.len());
                SourceFetch { rows, report }
            }
            Err(e) => {
                warn!(source_id = %source.source_id, kind = %source.kind, error = %e, "source fetch failed");
                SourceFetch {
                    rows: Vec::new(),
                    report: FetchReport::failure(&source.source_id, e.to_string()),
                }
            }
        }
    }
}

/// The definition's fixed query parameters as text.
fn static_params(source: &SourceDefinition) -> Vec<(String, String)> {
    source
        .params
        .iter()
        .map(|(k, v)| (k.clone(), value_to_text(v)))
        .collect()
}
