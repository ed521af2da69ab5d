/// One rendered HTML page, addressed by its path under the site root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Slash-separated path relative to the site root, e.g. `grants/abc/index.html`.
    pub route: String,
    pub html: String,
}

impl RenderedPage {
    pub fn new(route: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            html: html.into(),
        }
    }

    /// Policy detail page: exactly `grants/<slug>/index.html`.
    pub fn is_detail(&self) -> bool {
        let parts: Vec<&str> = self.route.trim_start_matches('/').split('/').collect();
        matches!(parts.as_slice(), ["grants", slug, "index.html"] if !slug.is_empty())
    }
}

/// Detail pages only, in the given order.
pub fn detail_pages(pages: &[RenderedPage]) -> impl Iterator<Item = &RenderedPage> {
    pages.iter().filter(|p| p.is_detail())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_route_shape() {
        assert!(RenderedPage::new("grants/abc/index.html", "").is_detail());
        assert!(RenderedPage::new("/grants/abc/index.html", "").is_detail());
        assert!(!RenderedPage::new("grants/index.html", "").is_detail());
        assert!(!RenderedPage::new("grants/abc/print/index.html", "").is_detail());
        assert!(!RenderedPage::new("updates/abc/index.html", "").is_detail());
        assert!(!RenderedPage::new("index.html", "").is_detail());
    }
}
