use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::activity_pub::model::Object;
use crate::mrf::{AccountResolver, MrfAction, Pipeline};

pub(crate) async fn serve<R>(
    port: u16,
    pipeline: Arc<Pipeline<R>>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()>
where
    R: AccountResolver + 'static,
{
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(target: "http", port, "listening");
    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub(crate) fn router<R>(pipeline: Arc<Pipeline<R>>) -> Router
where
    R: AccountResolver + 'static,
{
    Router::new()
        .route("/inbox", post(post_shared_inbox::<R>))
        .route("/users/{uid}/inbox", post(post_user_inbox::<R>))
        .with_state(pipeline)
}

async fn post_shared_inbox<R: AccountResolver>(
    State(pipeline): State<Arc<Pipeline<R>>>,
    body: Bytes,
) -> StatusCode {
    receive(&pipeline, "shared", &body).await
}

async fn post_user_inbox<R: AccountResolver>(
    State(pipeline): State<Arc<Pipeline<R>>>,
    Path(uid): Path<String>,
    body: Bytes,
) -> StatusCode {
    receive(&pipeline, &uid, &body).await
}

/// Moderate an inbound activity.
///
/// Remote servers always get `202 Accepted` for well-formed JSON, whether the
/// activity was kept or dropped, so filter criteria cannot be probed.
async fn receive<R: AccountResolver>(
    pipeline: &Pipeline<R>,
    inbox: &str,
    body: &[u8],
) -> StatusCode {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(error) => {
            warn!(target: "http", inbox, %error, "malformed activity");
            return StatusCode::BAD_REQUEST;
        }
    };
    let verdict = pipeline.run(Object::from(&value)).await;
    let id = verdict.activity.id().unwrap_or_default();
    match verdict.action {
        MrfAction::RejectNote => info!(target: "http", inbox, id, "dropped activity"),
        _ => info!(
            target: "http",
            inbox,
            id,
            rewritten = value.is_object() && verdict.activity.as_ref() != &value,
            "accepted activity"
        ),
    }
    StatusCode::ACCEPTED
}
