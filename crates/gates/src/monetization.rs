//! Content-policy (monetization) gate.

use policyfeed_core::{Decision, PolicyReport};
use serde::{Deserialize, Serialize};

use crate::page::{detail_pages, RenderedPage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRules {
    /// Must appear on every detail page.
    pub disclaimer_phrase: String,
    /// Manipulative calls-to-action that may not appear on any detail page.
    pub banned_phrases: Vec<String>,
}

impl Default for PolicyRules {
    fn default() -> Self {
        Self {
            disclaimer_phrase: "공식기관이 아니며".to_string(),
            banned_phrases: vec!["광고를 클릭".to_string(), "지금 클릭해서 지원받기".to_string()],
        }
    }
}

/// Evaluate rendered pages against the content rules.
///
/// Independent of data quality: a clean dataset can still fail here.
pub fn evaluate(pages: &[RenderedPage], rules: &PolicyRules) -> PolicyReport {
    let mut hard_fail = Vec::new();
    let soft_fail: Vec<String> = Vec::new();

    let mut details = detail_pages(pages).peekable();
    if details.peek().is_none() {
        hard_fail.push("no policy detail pages generated".to_string());
    }

    for page in details {
        if !page.html.contains(rules.disclaimer_phrase.as_str()) {
            hard_fail.push(format!("disclaimer missing in {}", page.route));
        }
        for phrase in rules.banned_phrases.iter().filter(|p| !p.is_empty()) {
            if page.html.contains(phrase.as_str()) {
                hard_fail.push(format!("banned phrase found in {}: {phrase}", page.route));
            }
        }
    }

    PolicyReport {
        decision: Decision::from_findings(&hard_fail, &soft_fail),
        hard_fail,
        soft_fail,
    }
}
