use anyhow::{Context, Result};
use chrono::Utc;
use tokio::{task::JoinError, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::{
    db::{Database, NewLogEntry},
    remote::{RemoteClient, RemoteError},
    signal::Envelope,
};

use super::{AgentExit, SignalSource};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const FETCH_TIMEOUT_SECS: u64 = 120;

type FetchOutcome = Result<Option<Envelope>, RemoteError>;

enum Wake {
    Stop,
    Deadline,
    Done(Result<FetchOutcome, JoinError>),
}

/// Polls the remote service for captured signals and appends them to the log.
pub struct Agent<S = RemoteClient> {
    source: S,
    db: Database,
    stop: CancellationToken,
    fetch_timeout: Duration,
}

impl<S: SignalSource> Agent<S> {
    pub fn new(source: S, db: Database, stop: CancellationToken) -> Self {
        Self {
            source,
            db,
            stop,
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Runs fetch cycles back to back until one fails. A requested stop also
    /// surfaces as an error, normally [`RemoteError::Cancelled`].
    pub async fn run(&self) -> Result<()> {
        loop {
            self.fetch_cycle().await?;
        }
    }

    /// Runs the loop and classifies how it ended.
    pub async fn supervise(&self) -> AgentExit {
        log_info!("agent started");

        let exit = match self.run().await {
            Ok(()) => AgentExit::Stopped,
            Err(err) => AgentExit::from_error(err, self.stop.is_cancelled()),
        };

        match &exit {
            AgentExit::Stopped => log_info!("agent stopped"),
            AgentExit::StoppedWithError(err) => {
                log_warn!("agent stopped, in-flight fetch ended with: {err:#}")
            }
            AgentExit::Failed(err) => log_error!("agent failed: {err:#}"),
        }

        exit
    }

    /// One fetch: races the stop signal, the deadline and the request itself.
    ///
    /// The request runs on its own task and is always awaited before this
    /// returns, whichever event wins. Dropping the cycle cancels the request.
    pub async fn fetch_cycle(&self) -> Result<()> {
        let request_token = self.stop.child_token();
        let _request_guard = request_token.clone().drop_guard();
        let mut request = tokio::spawn({
            let source = self.source.clone();
            let token = request_token.clone();
            async move { source.next_signal(token).await }
        });

        let deadline = tokio::time::sleep(self.fetch_timeout);
        tokio::pin!(deadline);

        let wake = tokio::select! {
            biased;
            _ = self.stop.cancelled() => Wake::Stop,
            joined = &mut request => Wake::Done(joined),
            _ = &mut deadline => Wake::Deadline,
        };

        match wake {
            Wake::Done(joined) => {
                match joined.context("fetch task failed to join")? {
                    Ok(Some(envelope)) => self.persist(envelope).await,
                    Ok(None) => Ok(()),
                    Err(err) => Err(err).context("failed to fetch pending signal"),
                }
            }
            Wake::Stop => {
                request_token.cancel();
                match request.await.context("fetch task failed to join")? {
                    // The server clears a signal once delivered; keep it if it made it back.
                    Ok(Some(envelope)) => {
                        self.persist(envelope).await?;
                        Err(RemoteError::Cancelled.into())
                    }
                    Ok(None) => Err(RemoteError::Cancelled.into()),
                    Err(err) => Err(err.into()),
                }
            }
            Wake::Deadline => {
                log_warn!(
                    "fetch timed out after {}s, retrying",
                    self.fetch_timeout.as_secs()
                );
                request_token.cancel();
                match request.await.context("fetch task failed to join")? {
                    Ok(Some(envelope)) => self.persist(envelope).await,
                    Ok(None) | Err(RemoteError::Cancelled) => Ok(()),
                    Err(err) => {
                        log_warn!("timed out fetch ended with: {err}");
                        Ok(())
                    }
                }
            }
        }
    }

    async fn persist(&self, envelope: Envelope) -> Result<()> {
        let entry = NewLogEntry::from_envelope(envelope, Utc::now().timestamp_millis());
        let id = self
            .db
            .insert_log(&entry)
            .await
            .context("failed to persist fetched signal")?;

        log_info!(
            "insert id={} format={} freq={} hostname={} deviceid={} data_hash={}",
            id,
            entry.format,
            entry.freq,
            entry.hostname,
            entry.deviceid,
            entry.data_hash
        );
        Ok(())
    }
}
