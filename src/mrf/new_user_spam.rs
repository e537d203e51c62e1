use anyhow::Result;
use jiff::{SignedDuration, Timestamp};
use tracing::{debug, warn};

use crate::activity_pub::model::{Account, Note, Object};
use crate::id::decode_creation_time;

use super::{AccountResolver, MrfPolicy, Verdict};

/// Source of the current time.
pub(crate) type Clock = fn() -> Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NewUserSettings {
    /// Accounts younger than this are considered new.
    pub(crate) max_age: SignedDuration,
    /// Accounts with at least this many followers are left alone.
    pub(crate) min_followers: u64,
    /// Handle length produced by a known spambot generator. Such handles
    /// without a space in them get the note rejected outright.
    pub(crate) suspicious_handle_length: Option<usize>,
}

impl Default for NewUserSettings {
    fn default() -> Self {
        NewUserSettings {
            max_age: SignedDuration::from_hours(72),
            min_followers: 3,
            suspicious_handle_length: Some(10),
        }
    }
}

/// Disarms top-level notes from new or disposable looking accounts that
/// mention strangers.
///
/// The lookups this policy depends on fail open: an actor we cannot resolve or
/// an id we cannot date leaves the note untouched.
pub(crate) struct NewUserSpamPolicy<R> {
    resolver: R,
    settings: NewUserSettings,
    clock: Clock,
}

impl<R: AccountResolver> NewUserSpamPolicy<R> {
    pub(crate) fn new(resolver: R, settings: NewUserSettings) -> Self {
        NewUserSpamPolicy {
            resolver,
            settings,
            clock: Timestamp::now,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_clock(self, clock: Clock) -> Self {
        NewUserSpamPolicy { clock, ..self }
    }

    async fn lookup(&self, activity: &Object<'_>) -> Option<Account> {
        let actor_iri = activity.get_node_iri("actor")?;
        match self.resolver.resolve(actor_iri).await {
            Ok(Some(account)) => Some(account),
            Ok(None) => {
                debug!(
                    target: "mrf",
                    policy = self.name(),
                    actor_iri,
                    "actor is not known locally"
                );
                None
            }
            Err(error) => {
                warn!(
                    target: "mrf",
                    policy = self.name(),
                    actor_iri,
                    %error,
                    "actor lookup failed"
                );
                None
            }
        }
    }

    fn is_suspicious_handle(&self, handle: &str) -> bool {
        self.settings
            .suspicious_handle_length
            .is_some_and(|len| handle.chars().count() == len)
    }
}

impl<R: AccountResolver> MrfPolicy for NewUserSpamPolicy<R> {
    fn name(&self) -> &'static str {
        "new_user_spam"
    }

    async fn evaluate<'a>(&self, activity: &'a Object<'_>) -> Result<Verdict<'a>> {
        let neutral = move || Ok(Verdict::neutral(activity.borrowed()));

        let Some(note) = Note::of(activity) else {
            return neutral();
        };
        if note.tags().is_none_or(<[_]>::is_empty) || note.is_reply() {
            return neutral();
        }
        let Some(account) = self.lookup(activity).await else {
            return neutral();
        };
        let created_at = match decode_creation_time(&account.id) {
            Ok(created_at) => created_at,
            Err(error) => {
                warn!(
                    target: "mrf",
                    policy = self.name(),
                    actor = %account.uri,
                    %error,
                    "unable to date account"
                );
                return neutral();
            }
        };

        let now = (self.clock)();
        let age = now.duration_since(created_at);
        let suspicious_handle = self.is_suspicious_handle(&account.handle);
        let triggered = (age < self.settings.max_age || suspicious_handle)
            && account.followers_count < self.settings.min_followers;
        if !triggered {
            return neutral();
        }

        if suspicious_handle && !account.handle.contains(' ') {
            warn!(
                target: "mrf",
                policy = self.name(),
                actor = %account.uri,
                handle = %account.handle,
                note = note.url().unwrap_or_default(),
                "hard rejecting note: handle matches spambot pattern"
            );
            return Ok(Verdict::reject(activity.borrowed()));
        }

        warn!(
            target: "mrf",
            policy = self.name(),
            actor = %account.uri,
            note = note.url().unwrap_or_default(),
            age = %age,
            followers = account.followers_count,
            "rewriting note due to account age"
        );
        let rewritten = note.without_mentions().into_activity(activity);
        Ok(Verdict::rewrite(rewritten))
    }
}
