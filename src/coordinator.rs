//! Single-flight run coordination.
//!
//! At most one fetch or refresh runs at a time. The [`Coordinator`] owns the
//! observable [`RunStatus`]; runs report into it through a [`RunTicket`],
//! which also releases the slot when dropped.

use crate::error::{CoordinatorError, Error};
use crate::models::{RefreshReport, Source, SourceReport};
use crate::pipeline::Pipeline;
use crate::progress::ProgressSink;
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Fetch,
    Refresh,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Fetch => "fetch",
            RunKind::Refresh => "refresh",
        }
    }
}

/// Snapshot of the active run, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub running: bool,
    pub kind: Option<RunKind>,
    pub stage: String,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

struct Inner {
    pipeline: Arc<Pipeline>,
    state: RwLock<RunStatus>,
    active: Mutex<Option<CancellationToken>>,
}

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            inner: Arc::new(Inner {
                pipeline: Arc::new(pipeline),
                state: RwLock::new(RunStatus::default()),
                active: Mutex::new(None),
            }),
        }
    }

    pub fn status(&self) -> RunStatus {
        self.inner.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_running(&self) -> bool {
        self.status().running
    }

    /// Ask the active run to stop at its next page or job boundary.
    ///
    /// Returns `false` when nothing is running.
    pub fn cancel(&self) -> bool {
        let active = self.inner.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.as_ref() {
            Some(token) => {
                info!("Cancelling active run");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Claim the run slot for a run of `kind`.
    pub fn begin(&self, kind: RunKind) -> Result<RunTicket, CoordinatorError> {
        let mut active = self.inner.active.lock().unwrap_or_else(|e| e.into_inner());
        if active.is_some() {
            let running = self.status().kind.unwrap_or(kind);
            warn!(requested = kind.as_str(), running = running.as_str(), "Run rejected; another is active");
            return Err(CoordinatorError::AlreadyRunning(running.as_str()));
        }
        let cancel = CancellationToken::new();
        *active = Some(cancel.clone());
        drop(active);

        self.set_state(RunStatus {
            running: true,
            kind: Some(kind),
            stage: "starting".to_string(),
            message: format!("{} starting", kind.as_str()),
            ..RunStatus::default()
        });
        info!(kind = kind.as_str(), "Run started");
        Ok(RunTicket {
            coordinator: self.clone(),
            kind,
            cancel,
        })
    }

    /// Run a full fetch on the current task.
    pub async fn run_fetch(&self) -> Result<Vec<SourceReport>, Error> {
        let ticket = self.begin(RunKind::Fetch)?;
        self.inner.pipeline.run_full_fetch(&ticket, ticket.cancel_token()).await
    }

    /// Run a refresh pass on the current task.
    pub async fn run_refresh(&self, source: Option<Source>) -> Result<RefreshReport, Error> {
        let ticket = self.begin(RunKind::Refresh)?;
        self.inner
            .pipeline
            .run_refresh(source, &ticket, ticket.cancel_token())
            .await
    }

    /// Start a full fetch in the background.
    ///
    /// The slot is claimed before returning, so a second request made right
    /// after this one is rejected.
    pub fn spawn_fetch(&self) -> Result<JoinHandle<Result<Vec<SourceReport>, Error>>, CoordinatorError> {
        let ticket = self.begin(RunKind::Fetch)?;
        let pipeline = Arc::clone(&self.inner.pipeline);
        Ok(tokio::spawn(async move {
            pipeline.run_full_fetch(&ticket, ticket.cancel_token()).await
        }))
    }

    pub fn spawn_refresh(
        &self,
        source: Option<Source>,
    ) -> Result<JoinHandle<Result<RefreshReport, Error>>, CoordinatorError> {
        let ticket = self.begin(RunKind::Refresh)?;
        let pipeline = Arc::clone(&self.inner.pipeline);
        Ok(tokio::spawn(async move {
            pipeline.run_refresh(source, &ticket, ticket.cancel_token()).await
        }))
    }

    fn set_state(&self, status: RunStatus) {
        *self.inner.state.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    fn update_state(&self, update: impl FnOnce(&mut RunStatus)) {
        update(&mut self.inner.state.write().unwrap_or_else(|e| e.into_inner()));
    }

    fn finish(&self, kind: RunKind) {
        self.set_state(RunStatus {
            message: format!("{} finished", kind.as_str()),
            ..RunStatus::default()
        });
        *self.inner.active.lock().unwrap_or_else(|e| e.into_inner()) = None;
        info!(kind = kind.as_str(), "Run finished");
    }
}

/// Proof of holding the run slot. Feeds progress into the shared status and
/// frees the slot on drop, however the run ends.
pub struct RunTicket {
    coordinator: Coordinator,
    kind: RunKind,
    cancel: CancellationToken,
}

impl RunTicket {
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl ProgressSink for RunTicket {
    fn stage(&self, stage: &str) {
        self.coordinator.update_state(|status| {
            status.stage = stage.to_string();
            status.current = 0;
            status.total = 0;
            status.message = stage.to_string();
        });
    }

    fn progress(&self, current: usize, total: usize) {
        self.coordinator.update_state(|status| {
            status.current = current;
            status.total = total;
            status.message = format!("{} ({}/{})", status.stage, current + 1, total);
        });
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        self.coordinator.finish(self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::SqliteJobStore;
    use crate::testing::ScriptedFetcher;
    use crate::transport::Pacer;

    async fn coordinator() -> Coordinator {
        let store = SqliteJobStore::in_memory().await.unwrap();
        let pipeline = Pipeline::new(Config::default(), Arc::new(ScriptedFetcher::new()), Arc::new(store))
            .unwrap()
            .with_pacer(Pacer::disabled());
        Coordinator::new(pipeline)
    }

    #[tokio::test]
    async fn test_second_run_is_rejected_while_active() {
        let coordinator = coordinator().await;
        let ticket = coordinator.begin(RunKind::Fetch).unwrap();
        assert!(coordinator.is_running());

        let err = coordinator.begin(RunKind::Refresh).err().unwrap();
        assert!(matches!(err, CoordinatorError::AlreadyRunning("fetch")));
        assert!(matches!(
            coordinator.run_refresh(None).await,
            Err(Error::Coordinator(CoordinatorError::AlreadyRunning(_)))
        ));

        drop(ticket);
        assert!(!coordinator.is_running());
        assert!(coordinator.begin(RunKind::Refresh).is_ok());
    }

    #[tokio::test]
    async fn test_progress_updates_status_message() {
        let coordinator = coordinator().await;
        let ticket = coordinator.begin(RunKind::Refresh).unwrap();
        ticket.stage("refreshing jobs");
        ticket.progress(4, 10);

        let status = coordinator.status();
        assert!(status.running);
        assert_eq!(status.kind, Some(RunKind::Refresh));
        assert_eq!(status.current, 4);
        assert_eq!(status.total, 10);
        assert_eq!(status.message, "refreshing jobs (5/10)");

        drop(ticket);
        let status = coordinator.status();
        assert!(!status.running);
        assert_eq!(status.message, "refresh finished");
    }

    #[tokio::test]
    async fn test_cancel_reaches_the_active_run() {
        let coordinator = coordinator().await;
        assert!(!coordinator.cancel());

        let ticket = coordinator.begin(RunKind::Fetch).unwrap();
        assert!(coordinator.cancel());
        assert!(ticket.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_spawned_refresh_releases_the_slot() {
        let coordinator = coordinator().await;
        let handle = coordinator.spawn_refresh(None).unwrap();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.checked, 0);
        assert!(!coordinator.is_running());
    }
}
