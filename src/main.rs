mod activity_pub;
mod config;
mod flags;
mod http;
mod id;
mod mrf;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use fjall::PersistMode;
use serde_json::{Value, json};
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::activity_pub::AccountRepo;
use crate::activity_pub::model::{Account, Object};
use crate::config::Config;
use crate::flags::{Mrf, MrfCmd};
use crate::mrf::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let flags = Mrf::from_env_or_exit();
    let config = Config::load(flags.config.as_deref())?;
    let settings = config.mrf.validate()?;
    let keyspace = fjall::Config::new(&config.server.data_dir)
        .open()
        .with_context(|| format!("unable to open {}", config.server.data_dir.display()))?;
    let repo = AccountRepo::new(keyspace.clone())?;

    match flags.subcommand {
        MrfCmd::Serve(_) => {
            let pipeline = Arc::new(Pipeline::from_settings(settings, repo));
            info!(target: "lifecycle", port = config.server.http_port, "starting inbox server");
            http::serve(config.server.http_port, pipeline, shutdown_signal()?).await?;
            keyspace.persist(PersistMode::SyncAll)?;
            info!(target: "lifecycle", "stopped");
        }
        MrfCmd::Check(check) => {
            let pipeline = Pipeline::from_settings(settings, repo);
            let activity: Value = read_json(&check.file)?;
            let verdict = pipeline.run(Object::from(&activity)).await;
            let output = json!({
                "action": verdict.action,
                "activity": verdict.activity.to_value(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        MrfCmd::ImportAccounts(import) => {
            let accounts: Vec<Account> = read_json(&import.file)?;
            for account in &accounts {
                repo.insert(account)?;
            }
            keyspace.persist(PersistMode::SyncAll)?;
            info!(target: "lifecycle", count = accounts.len(), "imported accounts");
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("unable to parse {}", path.display()))
}

fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                info!(target: "lifecycle", "Received the terminate signal; stopping");
            }
            _ = sigint.recv() => {
                info!(target: "lifecycle", "Received the interrupt signal; stopping");
            }
        }
    })
}
