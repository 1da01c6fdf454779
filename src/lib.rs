pub mod agent;
pub mod config;
pub mod db;
pub mod remote;
pub mod signal;
mod utils;
pub mod web;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use tokio::{net::TcpListener, task::JoinSet};
use tokio_util::sync::CancellationToken;

use agent::{Agent, AgentExit};
use config::Config;
use db::Database;
use remote::RemoteClient;

/// Shared by every web request. The poll loop holds clones of the same handles.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub remote: RemoteClient,
}

pub async fn run(config: Config) -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("irlog starting up...");

    let database = Database::new(config.db.clone())?;

    if config.setup {
        return database.setup().await;
    }

    if config.clientkey.is_empty() {
        warn!("no client key configured; the remote service will reject requests");
    }

    let remote = RemoteClient::new(config.endpoint.clone(), config.clientkey.clone())?;

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("listening on {bind_addr}");

    let stop = CancellationToken::new();
    spawn_signal_listener(stop.clone());

    let mut activities = JoinSet::new();

    if config.agent {
        info!("polling {}", remote.endpoint());
        let agent = Agent::new(remote.clone(), database.clone(), stop.clone());
        activities.spawn(async move {
            match agent.supervise().await {
                AgentExit::Failed(err) => Err(err.context("agent failed")),
                AgentExit::Stopped | AgentExit::StoppedWithError(_) => Ok(()),
            }
        });
    }

    let state = AppState {
        db: database,
        remote,
    };
    activities.spawn(web::serve(listener, state, stop.clone()));

    let outcome = join_activities(activities, &stop).await;
    info!("irlog shut down");
    outcome
}

/// Waits for every activity. Whichever ends first cancels `stop` so the rest
/// wind down; the first failure is returned once all have been joined.
async fn join_activities(
    mut activities: JoinSet<Result<()>>,
    stop: &CancellationToken,
) -> Result<()> {
    let mut first_failure = None;
    while let Some(joined) = activities.join_next().await {
        stop.cancel();
        let outcome = joined.map_err(|err| anyhow!("activity panicked: {err}")).and_then(|r| r);
        if let Err(err) = outcome {
            first_failure.get_or_insert(err);
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn spawn_signal_listener(stop: CancellationToken) {
    tokio::spawn(async move {
        let received = shutdown_signal().await;
        info!("got signal: {received}");
        stop.cancel();
    });
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!("failed to install SIGTERM handler: {err}");
            return match tokio::signal::ctrl_c().await {
                Ok(()) => "SIGINT",
                Err(_) => std::future::pending().await,
            };
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => "SIGINT",
            Err(_) => std::future::pending().await,
        },
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "ctrl-c",
        Err(_) => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn first_failure_cancels_and_joins_the_rest() {
        let stop = CancellationToken::new();
        let wound_down = Arc::new(AtomicBool::new(false));
        let mut activities = JoinSet::new();

        activities.spawn({
            let stop = stop.clone();
            let wound_down = wound_down.clone();
            async move {
                stop.cancelled().await;
                tokio::task::yield_now().await;
                wound_down.store(true, Ordering::SeqCst);
                Ok(())
            }
        });
        activities.spawn(async { Err(anyhow!("address in use")) });

        let err = join_activities(activities, &stop).await.unwrap_err();

        assert_eq!(err.to_string(), "address in use");
        assert!(stop.is_cancelled());
        assert!(wound_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn clean_exit_still_stops_the_others() {
        let stop = CancellationToken::new();
        let mut activities = JoinSet::new();

        activities.spawn(async { Ok(()) });
        activities.spawn({
            let stop = stop.clone();
            async move {
                stop.cancelled().await;
                Ok(())
            }
        });

        join_activities(activities, &stop).await.unwrap();
        assert!(stop.is_cancelled());
    }

    #[tokio::test]
    async fn panicking_activity_is_reported() {
        let stop = CancellationToken::new();
        let mut activities: JoinSet<Result<()>> = JoinSet::new();
        activities.spawn(async { panic!("boom") });

        let err = join_activities(activities, &stop).await.unwrap_err();
        assert!(err.to_string().contains("activity panicked"));
    }
}
