//! Moderation of inbound activities.
//!
//! Every `Create` of a `Note` received from a remote server goes through a
//! fixed chain of policies before it is accepted. A policy may reject the
//! note, which ends the chain, or rewrite it, in which case the rewritten
//! copy is what the next policy sees.

mod filters;
mod hellthread;
mod keyword_filter;
mod new_user_spam;
mod pipeline;

use std::future::Future;

use anyhow::Result;
use serde::Serialize;

use crate::activity_pub::model::{Account, Object};

pub(crate) use hellthread::HellthreadPolicy;
pub(crate) use keyword_filter::KeywordFilterPolicy;
pub(crate) use new_user_spam::{NewUserSettings, NewUserSpamPolicy};
pub(crate) use pipeline::{MrfSettings, Pipeline};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub(crate) enum MrfAction {
    Neutral,
    RejectNote,
    RewriteNote,
}

/// Outcome of one policy, or of the whole pipeline.
///
/// `activity` is the input itself for `Neutral` and `RejectNote`, and a fresh
/// copy for `RewriteNote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Verdict<'a> {
    pub(crate) action: MrfAction,
    pub(crate) activity: Object<'a>,
}

impl<'a> Verdict<'a> {
    pub(crate) fn neutral(activity: Object<'a>) -> Self {
        Verdict {
            action: MrfAction::Neutral,
            activity,
        }
    }
    pub(crate) fn reject(activity: Object<'a>) -> Self {
        Verdict {
            action: MrfAction::RejectNote,
            activity,
        }
    }
    pub(crate) fn rewrite(activity: Object<'static>) -> Self {
        Verdict {
            action: MrfAction::RewriteNote,
            activity,
        }
    }
}

/// A single moderation rule.
///
/// Policies never modify the activity they are given. They only ever see
/// `Create` activities wrapping a `Note`.
pub(crate) trait MrfPolicy {
    fn name(&self) -> &'static str;
    fn evaluate<'a>(
        &self,
        activity: &'a Object<'_>,
    ) -> impl Future<Output = Result<Verdict<'a>>> + Send;
}

/// Looks up the local record of a remote actor.
pub(crate) trait AccountResolver: Send + Sync {
    /// `Ok(None)` when the actor is not known locally.
    fn resolve(&self, actor_iri: &str) -> impl Future<Output = Result<Option<Account>>> + Send;
}
