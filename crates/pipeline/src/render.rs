//! The rendering seam, a minimal static renderer, and a site reader.
//!
//! Full page design lives outside this crate. What the pipeline needs from a
//! renderer is the set of pages it produced (for the gates) and the counts
//! that go into the manifest.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use policyfeed_core::{CanonicalRecord, ChangeRecord};
use policyfeed_gates::{PageCounts, RenderedPage};
use tracing::info;

use crate::error::PipelineError;

#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    pub pages: Vec<RenderedPage>,
    pub counts: PageCounts,
}

/// Rendering collaborator. Receives the canonical set after rotation.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        canonical: &[CanonicalRecord],
        changes: &[ChangeRecord],
    ) -> Result<RenderOutput, PipelineError>;
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Lowercase, drop anything but word characters, whitespace and `-`, collapse
/// whitespace/underscore runs to `-`. Empty results become `unknown`.
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for c in lowered.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            pending_dash = true;
        } else if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        }
    }
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

pub fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Detail page renderer ────────────────────────────────────────────

/// Writes `grants/<slug>/index.html` per active record, a home page, an
/// updates page and `sitemap.xml` under `site_dir`. The directory is
/// recreated on every render.
pub struct DetailPageRenderer {
    site_dir: PathBuf,
    base_url: String,
    disclaimer: String,
}

impl DetailPageRenderer {
    pub fn new(site_dir: impl Into<PathBuf>, base_url: &str, disclaimer: &str) -> Self {
        Self {
            site_dir: site_dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            disclaimer: disclaimer.to_string(),
        }
    }

    fn layout(&self, title: &str, canonical_url: &str, body: &str) -> String {
        format!(
            "<!doctype html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"utf-8\" />\n\
             <title>{}</title>\n<link rel=\"canonical\" href=\"{}\" />\n</head>\n<body>\n{body}\n</body>\n</html>\n",
            html_escape(title),
            html_escape(canonical_url),
        )
    }

    fn detail_body(&self, rec: &CanonicalRecord) -> String {
        format!(
            "<article class=\"policy-post\">\n\
             <h1>{title}</h1>\n\
             <p class=\"meta-line\">{region} · {target} · {category}</p>\n\
             <section id=\"eligibility\"><h2>지원 대상</h2><p>{eligibility}</p></section>\n\
             <section id=\"benefit\"><h2>지원 내용</h2><p>{benefit}</p></section>\n\
             <section id=\"period\"><h2>신청 기간</h2><p>{period}</p></section>\n\
             <section id=\"official\"><h2>공식 출처</h2><p><a href=\"{url}\" rel=\"noopener noreferrer\">{url}</a> ({org})</p></section>\n\
             <section><h2>최종 확인 시각</h2><p>{checked}</p></section>\n\
             <section class=\"notice-section\"><h2>안내</h2><p>{notice}</p></section>\n\
             </article>",
            title = html_escape(&rec.title),
            region = html_escape(&rec.region),
            target = html_escape(&rec.target_group),
            category = html_escape(&rec.category),
            eligibility = html_escape(&rec.eligibility_text),
            benefit = html_escape(&rec.benefit_text),
            period = html_escape(&rec.application_period_text),
            url = html_escape(&rec.official_url),
            org = html_escape(&rec.source_org),
            checked = html_escape(&rec.last_checked_at),
            notice = html_escape(&self.notice()),
        )
    }

    fn notice(&self) -> String {
        format!(
            "본 사이트는 {}, 최종 신청 및 자격 판단은 반드시 원문 공고를 확인하세요.",
            self.disclaimer
        )
    }

    fn write_page(&self, route: &str, html: String, pages: &mut Vec<RenderedPage>) -> Result<(), PipelineError> {
        let path = self.site_dir.join(route);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        fs::write(&path, &html).map_err(|e| PipelineError::io(&path, e))?;
        pages.push(RenderedPage::new(route, html));
        Ok(())
    }
}

impl Renderer for DetailPageRenderer {
    fn render(
        &self,
        canonical: &[CanonicalRecord],
        changes: &[ChangeRecord],
    ) -> Result<RenderOutput, PipelineError> {
        if self.site_dir.exists() {
            fs::remove_dir_all(&self.site_dir).map_err(|e| PipelineError::io(&self.site_dir, e))?;
        }
        fs::create_dir_all(&self.site_dir).map_err(|e| PipelineError::io(&self.site_dir, e))?;

        let mut pages = Vec::new();
        let mut sitemap: BTreeSet<String> = BTreeSet::new();
        let mut excluded = 0;
        let mut home_links = String::new();

        for rec in canonical {
            if !rec.is_active() {
                excluded += 1;
                continue;
            }
            let slug = slugify(&rec.policy_id);
            let url = format!("{}/grants/{slug}/", self.base_url);
            let html = self.layout(&rec.title, &url, &self.detail_body(rec));
            self.write_page(&format!("grants/{slug}/index.html"), html, &mut pages)?;
            home_links.push_str(&format!(
                "<li><a href=\"/grants/{slug}/\">{}</a></li>\n",
                html_escape(&rec.title)
            ));
            sitemap.insert(url);
        }

        let mut update_links = String::new();
        for change in changes {
            update_links.push_str(&format!(
                "<li><a href=\"/grants/{}/\">{} · {}</a></li>\n",
                slugify(&change.policy_id),
                html_escape(&change.title),
                change.change_type
            ));
        }

        let updates_url = format!("{}/updates/", self.base_url);
        let updates = self.layout(
            "최근 변경사항",
            &updates_url,
            &format!("<h1>최근 변경사항</h1>\n<ul>\n{update_links}</ul>"),
        );
        self.write_page("updates/index.html", updates, &mut pages)?;
        sitemap.insert(updates_url);

        let home_url = format!("{}/", self.base_url);
        let home = self.layout(
            "지원알람",
            &home_url,
            &format!("<h1>지원알람</h1>\n<ul>\n{home_links}</ul>\n<p>{}</p>", html_escape(&self.notice())),
        );
        self.write_page("index.html", home, &mut pages)?;
        sitemap.insert(home_url);

        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        for url in &sitemap {
            xml.push_str(&format!("  <url><loc>{}</loc></url>\n", html_escape(url)));
        }
        xml.push_str("</urlset>\n");
        let sitemap_path = self.site_dir.join("sitemap.xml");
        fs::write(&sitemap_path, xml).map_err(|e| PipelineError::io(&sitemap_path, e))?;

        let counts = PageCounts {
            generated: pages.len(),
            excluded,
            sitemap_entries: sitemap.len(),
        };
        info!(
            generated = counts.generated,
            excluded = counts.excluded,
            sitemap_entries = counts.sitemap_entries,
            site_dir = %self.site_dir.display(),
            "site rendered"
        );
        Ok(RenderOutput { pages, counts })
    }
}

// ── Site scanner ────────────────────────────────────────────────────

/// Reads every `index.html` under a built site back as [`RenderedPage`]s.
pub struct SiteScanner {
    site_dir: PathBuf,
}

impl SiteScanner {
    pub fn new(site_dir: impl Into<PathBuf>) -> Self {
        Self {
            site_dir: site_dir.into(),
        }
    }

    /// Pages sorted by route. A missing site dir yields no pages.
    pub fn scan(&self) -> Result<Vec<RenderedPage>, PipelineError> {
        let mut pages = Vec::new();
        if self.site_dir.is_dir() {
            self.walk(&self.site_dir, &mut pages)?;
        }
        pages.sort_by(|a, b| a.route.cmp(&b.route));
        Ok(pages)
    }

    fn walk(&self, dir: &Path, pages: &mut Vec<RenderedPage>) -> Result<(), PipelineError> {
        for entry in fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))? {
            let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
            if path.is_dir() {
                self.walk(&path, pages)?;
            } else if path.file_name().is_some_and(|n| n == "index.html") {
                let html = fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
                let route = path
                    .strip_prefix(&self.site_dir)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                pages.push(RenderedPage::new(route, html));
            }
        }
        Ok(())
    }
}
