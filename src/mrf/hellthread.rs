use anyhow::Result;
use tracing::warn;

use crate::activity_pub::model::{Note, Object};

use super::filters::log_excerpt;
use super::{MrfPolicy, Verdict};

/// Disarms notes that mention too many accounts at once.
pub(crate) struct HellthreadPolicy {
    threshold: usize,
}

impl HellthreadPolicy {
    pub(crate) const DEFAULT_THRESHOLD: usize = 15;

    pub(crate) fn new(threshold: usize) -> Self {
        HellthreadPolicy { threshold }
    }
}

impl Default for HellthreadPolicy {
    fn default() -> Self {
        HellthreadPolicy::new(Self::DEFAULT_THRESHOLD)
    }
}

impl MrfPolicy for HellthreadPolicy {
    fn name(&self) -> &'static str {
        "hellthread"
    }

    async fn evaluate<'a>(&self, activity: &'a Object<'_>) -> Result<Verdict<'a>> {
        let Some(note) = Note::of(activity) else {
            return Ok(Verdict::neutral(activity.borrowed()));
        };
        let mentions = note.mention_count();
        if mentions < self.threshold {
            return Ok(Verdict::neutral(activity.borrowed()));
        }
        warn!(
            target: "mrf",
            policy = self.name(),
            mentions,
            actor = activity.get_node_iri("actor").unwrap_or_default(),
            content = %log_excerpt(note.content()),
            "rewriting note due to hellthread"
        );
        let rewritten = note.without_mentions().into_activity(activity);
        Ok(Verdict::rewrite(rewritten))
    }
}
