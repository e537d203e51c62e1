use std::any::Any;
use std::panic::AssertUnwindSafe;

use anyhow::Result;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::activity_pub::model::{Note, Object};

use super::{
    AccountResolver, HellthreadPolicy, KeywordFilterPolicy, MrfAction, MrfPolicy, NewUserSettings,
    NewUserSpamPolicy, Verdict,
};

/// Validated policy configuration, see [`crate::config::MrfConfig`].
#[derive(Clone, Debug)]
pub(crate) struct MrfSettings {
    pub(crate) keywords: Vec<String>,
    pub(crate) case_insensitive_keywords: bool,
    pub(crate) hellthread_threshold: usize,
    pub(crate) new_user: NewUserSettings,
}

/// The closed set of policies a pipeline can run.
pub(crate) enum Policy<R> {
    KeywordFilter(KeywordFilterPolicy),
    NewUserSpam(NewUserSpamPolicy<R>),
    Hellthread(HellthreadPolicy),
}

impl<R: AccountResolver> MrfPolicy for Policy<R> {
    fn name(&self) -> &'static str {
        match self {
            Policy::KeywordFilter(policy) => policy.name(),
            Policy::NewUserSpam(policy) => policy.name(),
            Policy::Hellthread(policy) => policy.name(),
        }
    }

    async fn evaluate<'a>(&self, activity: &'a Object<'_>) -> Result<Verdict<'a>> {
        match self {
            Policy::KeywordFilter(policy) => policy.evaluate(activity).await,
            Policy::NewUserSpam(policy) => policy.evaluate(activity).await,
            Policy::Hellthread(policy) => policy.evaluate(activity).await,
        }
    }
}

/// Runs inbound activities through an ordered list of policies.
///
/// The pipeline holds no per-activity state and can be shared between tasks.
pub(crate) struct Pipeline<R> {
    policies: Vec<Policy<R>>,
}

impl<R: AccountResolver> Pipeline<R> {
    pub(crate) fn new(policies: Vec<Policy<R>>) -> Self {
        Pipeline { policies }
    }

    /// The standard chain: keyword filter, new user spam, hellthread.
    pub(crate) fn from_settings(settings: MrfSettings, resolver: R) -> Self {
        Pipeline::new(vec![
            Policy::KeywordFilter(KeywordFilterPolicy::new(
                settings.keywords,
                settings.case_insensitive_keywords,
            )),
            Policy::NewUserSpam(NewUserSpamPolicy::new(resolver, settings.new_user)),
            Policy::Hellthread(HellthreadPolicy::new(settings.hellthread_threshold)),
        ])
    }

    /// Moderate one activity.
    ///
    /// The returned action is `RejectNote` when some policy rejected the note
    /// and `Neutral` otherwise. Rewrites are not reported in the action; the
    /// returned activity carries all of them and is what should be stored.
    pub(crate) async fn run<'a>(&self, activity: Object<'a>) -> Verdict<'a> {
        if !activity.type_is("Create") || Note::of(&activity).is_none() {
            return Verdict::neutral(activity);
        }

        let mut working = activity;
        for policy in &self.policies {
            let outcome = AssertUnwindSafe(policy.evaluate(&working))
                .catch_unwind()
                .await;
            let verdict = match outcome {
                Ok(Ok(verdict)) => verdict,
                Ok(Err(error)) => {
                    warn!(
                        target: "mrf",
                        policy = policy.name(),
                        id = working.id().unwrap_or_default(),
                        %error,
                        "policy failed, ignoring it for this activity"
                    );
                    continue;
                }
                Err(panic) => {
                    warn!(
                        target: "mrf",
                        policy = policy.name(),
                        id = working.id().unwrap_or_default(),
                        panic = panic_message(panic.as_ref()),
                        "policy panicked, ignoring it for this activity"
                    );
                    continue;
                }
            };
            match verdict.action {
                MrfAction::Neutral => {}
                MrfAction::RewriteNote => working = verdict.activity.into_owned(),
                MrfAction::RejectNote => {
                    debug!(
                        target: "mrf",
                        policy = policy.name(),
                        id = working.id().unwrap_or_default(),
                        "activity rejected"
                    );
                    return Verdict::reject(working);
                }
            }
        }
        Verdict::neutral(working)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, bail};
    use fjall::{Config, Keyspace};
    use jiff::{SignedDuration, Timestamp};
    use serde_json::{Value, json};
    use tempfile::{TempDir, tempdir};

    use crate::activity_pub::AccountRepo;
    use crate::activity_pub::model::{Account, Note, Object};
    use crate::id::aid_at;
    use crate::mrf::{
        AccountResolver, HellthreadPolicy, KeywordFilterPolicy, MrfAction, NewUserSettings,
        NewUserSpamPolicy,
    };

    use super::{Pipeline, Policy};

    const ACTOR: &str = "https://remote.example/users/someone";

    /// 2024-10-18T12:00:00Z
    fn fixed_now() -> Timestamp {
        Timestamp::from_second(1_729_252_800).unwrap()
    }

    fn accounts(
        handle: &str,
        age: SignedDuration,
        followers_count: u64,
    ) -> Result<(TempDir, AccountRepo)> {
        let tmp_dir = tempdir()?;
        let keyspace = Keyspace::open(Config::new(tmp_dir.path()).temporary(true))?;
        let repo = AccountRepo::new(keyspace)?;
        repo.insert(&Account {
            id: aid_at(fixed_now() - age),
            handle: handle.to_string(),
            followers_count,
            uri: ACTOR.to_string(),
        })?;
        Ok((tmp_dir, repo))
    }

    fn standard<R: AccountResolver>(resolver: R) -> Pipeline<R> {
        Pipeline::new(vec![
            Policy::KeywordFilter(KeywordFilterPolicy::new(
                vec!["https://discord.gg/ctkpaarr".to_string()],
                false,
            )),
            Policy::NewUserSpam(
                NewUserSpamPolicy::new(resolver, NewUserSettings::default())
                    .with_clock(fixed_now),
            ),
            Policy::Hellthread(HellthreadPolicy::default()),
        ])
    }

    fn create_note(content: &str, mentions: usize, in_reply_to: Value) -> Value {
        let mut tags: Vec<Value> = (0..mentions)
            .map(|n| {
                json!({ "type": "Mention", "href": format!("https://x.example/users/{n}") })
            })
            .collect();
        tags.insert(0, json!({ "type": "Hashtag", "name": "#fedi" }));
        json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": "https://remote.example/activities/1",
            "type": "Create",
            "actor": ACTOR,
            "object": {
                "id": "https://remote.example/notes/1",
                "type": "Note",
                "content": content,
                "inReplyTo": in_reply_to,
                "tag": tags
            }
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn only_notes_are_moderated() -> Result<()> {
        let (_tmp, repo) = accounts("spam_acct1", SignedDuration::from_hours(1), 0)?;
        let pipeline = standard(repo);

        let mut announce = create_note("https://discord.gg/ctkpaarr", 20, Value::Null);
        announce["type"] = json!("Announce");
        let verdict = pipeline.run(Object::from(&announce)).await;
        assert_eq!(verdict.action, MrfAction::Neutral);
        assert_eq!(verdict.activity.as_ref(), &announce);

        let mut question = create_note("https://discord.gg/ctkpaarr", 20, Value::Null);
        question["object"]["type"] = json!("Question");
        let verdict = pipeline.run(Object::from(&question)).await;
        assert_eq!(verdict.action, MrfAction::Neutral);
        assert_eq!(verdict.activity.as_ref(), &question);

        let mut by_reference = create_note("", 0, Value::Null);
        by_reference["object"] = json!("https://remote.example/notes/1");
        let verdict = pipeline.run(Object::from(&by_reference)).await;
        assert_eq!(verdict.action, MrfAction::Neutral);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn denylisted_content_is_rejected() -> Result<()> {
        let (_tmp, repo) = accounts("veteran", SignedDuration::from_hours(24 * 365), 100)?;
        let activity = create_note("join us at https://discord.gg/ctkpaarr", 0, Value::Null);
        let verdict = standard(repo).run(Object::from(&activity)).await;
        assert_eq!(verdict.action, MrfAction::RejectNote);
        assert_eq!(verdict.activity.as_ref(), &activity);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn spambot_mentioning_strangers_is_rejected() -> Result<()> {
        let (_tmp, repo) = accounts("spam_acct1", SignedDuration::from_hours(1), 0)?;
        let activity = create_note("<p>hi</p>", 2, Value::Null);
        let verdict = standard(repo).run(Object::from(&activity)).await;
        assert_eq!(verdict.action, MrfAction::RejectNote);
        assert_eq!(verdict.activity.as_ref(), &activity);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn hellthread_from_established_account_is_disarmed() -> Result<()> {
        let (_tmp, repo) = accounts("veteran", SignedDuration::from_hours(24 * 10), 50)?;
        let activity = create_note("<p>everyone!</p>", 20, Value::Null);
        let verdict = standard(repo).run(Object::from(&activity)).await;
        assert_eq!(verdict.action, MrfAction::Neutral);
        let note = Note::of(&verdict.activity).unwrap();
        assert_eq!(note.mention_count(), 0);
        assert_eq!(
            note.tags().unwrap(),
            &[json!({ "type": "Hashtag", "name": "#fedi" })]
        );
        // The caller's copy is not affected.
        assert_eq!(activity["object"]["tag"].as_array().unwrap().len(), 21);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reply_from_new_account_is_untouched() -> Result<()> {
        let (_tmp, repo) = accounts("newbie", SignedDuration::from_hours(1), 0)?;
        let activity = create_note("<p>hi</p>", 5, json!("https://local.example/notes/0"));
        let verdict = standard(repo).run(Object::from(&activity)).await;
        assert_eq!(verdict.action, MrfAction::Neutral);
        assert_eq!(verdict.activity.as_ref(), &activity);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rewrites_compound() -> Result<()> {
        // The new user policy strips mentions first; hellthread then sees none.
        let (_tmp, repo) = accounts("newbie", SignedDuration::from_hours(1), 0)?;
        let activity = create_note("<p>hi</p>", 20, Value::Null);
        let verdict = standard(repo).run(Object::from(&activity)).await;
        assert_eq!(verdict.action, MrfAction::Neutral);
        assert_eq!(Note::of(&verdict.activity).unwrap().mention_count(), 0);
        Ok(())
    }

    /// Counts how often it was asked to resolve an actor.
    struct Counting(Arc<AtomicUsize>);

    impl AccountResolver for Counting {
        async fn resolve(&self, _actor_iri: &str) -> Result<Option<Account>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn rejection_stops_the_chain() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = standard(Counting(calls.clone()));

        let spam = create_note("https://discord.gg/ctkpaarr", 2, Value::Null);
        let verdict = pipeline.run(Object::from(&spam)).await;
        assert_eq!(verdict.action, MrfAction::RejectNote);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let ham = create_note("<p>hello</p>", 2, Value::Null);
        let verdict = pipeline.run(Object::from(&ham)).await;
        assert_eq!(verdict.action, MrfAction::Neutral);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    struct Broken;

    impl AccountResolver for Broken {
        async fn resolve(&self, _actor_iri: &str) -> Result<Option<Account>> {
            bail!("connection reset")
        }
    }

    #[tokio::test]
    async fn resolver_failure_does_not_block_other_policies() -> Result<()> {
        let activity = create_note("<p>hi</p>", 16, Value::Null);
        let verdict = standard(Broken).run(Object::from(&activity)).await;
        assert_eq!(verdict.action, MrfAction::Neutral);
        assert_eq!(Note::of(&verdict.activity).unwrap().mention_count(), 0);
        Ok(())
    }

    struct Panicky;

    impl AccountResolver for Panicky {
        async fn resolve(&self, _actor_iri: &str) -> Result<Option<Account>> {
            panic!("resolver bug")
        }
    }

    #[tokio::test]
    async fn panicking_policy_is_skipped() -> Result<()> {
        let activity = create_note("<p>hi</p>", 20, Value::Null);
        let verdict = standard(Panicky).run(Object::from(&activity)).await;
        assert_eq!(verdict.action, MrfAction::Neutral);
        assert_eq!(Note::of(&verdict.activity).unwrap().mention_count(), 0);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_runs_share_one_pipeline() -> Result<()> {
        let (_tmp, repo) = accounts("veteran", SignedDuration::from_hours(24 * 10), 50)?;
        let pipeline = Arc::new(standard(repo));
        let mut join_set = tokio::task::JoinSet::new();
        for mentions in [1, 20, 3, 15] {
            let pipeline = pipeline.clone();
            join_set.spawn(async move {
                let activity = create_note("<p>hi</p>", mentions, Value::Null);
                let verdict = pipeline.run(Object::from(activity)).await;
                (mentions, Note::of(&verdict.activity).map(|n| n.mention_count()))
            });
        }
        for (mentions, remaining) in join_set.join_all().await {
            let expected = if mentions >= 15 { 0 } else { mentions };
            assert_eq!(remaining, Some(expected));
        }
        Ok(())
    }
}
