use anyhow::Result;
use tracing::warn;

use crate::activity_pub::model::{Note, Object};

use super::filters::log_excerpt;
use super::{MrfPolicy, Verdict};

/// Rejects notes whose content contains a denylisted substring, such as a raid
/// coordination link or the handle of a known spam account.
pub(crate) struct KeywordFilterPolicy {
    keywords: Vec<String>,
    case_insensitive: bool,
}

impl KeywordFilterPolicy {
    pub(crate) fn new(keywords: Vec<String>, case_insensitive: bool) -> Self {
        let keywords = if case_insensitive {
            keywords.iter().map(|k| k.to_lowercase()).collect()
        } else {
            keywords
        };
        KeywordFilterPolicy {
            keywords,
            case_insensitive,
        }
    }

    fn find_keyword(&self, content: &str) -> Option<&str> {
        let lowered;
        let haystack = if self.case_insensitive {
            lowered = content.to_lowercase();
            &lowered
        } else {
            content
        };
        self.keywords
            .iter()
            .find(|keyword| haystack.contains(keyword.as_str()))
            .map(String::as_str)
    }
}

impl MrfPolicy for KeywordFilterPolicy {
    fn name(&self) -> &'static str {
        "keyword_filter"
    }

    async fn evaluate<'a>(&self, activity: &'a Object<'_>) -> Result<Verdict<'a>> {
        let note = Note::of(activity);
        let Some(content) = note.as_ref().and_then(Note::content) else {
            return Ok(Verdict::neutral(activity.borrowed()));
        };
        if let Some(keyword) = self.find_keyword(content) {
            warn!(
                target: "mrf",
                policy = self.name(),
                keyword,
                actor = activity.get_node_iri("actor").unwrap_or_default(),
                content = %log_excerpt(Some(content)),
                "rejected note due to keyword filter"
            );
            return Ok(Verdict::reject(activity.borrowed()));
        }
        Ok(Verdict::neutral(activity.borrowed()))
    }
}
