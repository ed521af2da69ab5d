use std::time::Duration;

use tracing::warn;

/// GET `<base_url><path>` for each path. Returns one `"<url> => <status|error>"`
/// line per failure; an empty list means every page answered below 400.
pub fn run_health_checks(base_url: &str, paths: &[String], timeout: Duration) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => return vec![format!("{base} => cannot build HTTP client: {e}")],
    };

    let mut errors = Vec::new();
    for path in paths {
        let url = format!("{base}{path}");
        match client.get(&url).send() {
            Ok(resp) if resp.status().as_u16() >= 400 => {
                errors.push(format!("{url} => {}", resp.status().as_u16()));
            }
            Ok(_) => {}
            Err(e) => errors.push(format!("{url} => {e}")),
        }
    }
    if !errors.is_empty() {
        warn!(failures = errors.len(), "publish health checks failed");
    }
    errors
}
