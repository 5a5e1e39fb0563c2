//! Recurring job-status polling.
//!
//! `JobPoller` owns one polling session at a time: give it a job id and it
//! queries the backend immediately, then on a fixed interval, until the job
//! reaches a terminal state. Consumers observe progress through a watch
//! channel instead of wiring the loop into any particular UI.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::jobs_api::{JobsApiClient, JobStatusResponse};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

const FAILED_MESSAGE: &str = "Analysis failed. Please try again";
const UNREACHABLE_MESSAGE: &str = "Could not retrieve the analysis status. Please try again";
const NO_DATA_MESSAGE: &str = "Analysis finished without any usable data";

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Payload strings that look like data but mean "nothing there". The
    /// empty string is always treated that way.
    pub sentinels: Vec<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            sentinels: vec!["None".to_string()],
        }
    }
}

/// Latest observable state of the current session.
#[derive(Debug, Clone, Default)]
pub struct PollSnapshot {
    pub result: Option<Value>,
    pub is_active: bool,
    pub error: Option<String>,
}

impl PollSnapshot {
    pub fn is_terminal(&self) -> bool {
        !self.is_active && (self.result.is_some() || self.error.is_some())
    }
}

pub(crate) enum Transition {
    Continue,
    Succeeded(Value),
    Failed(String),
}

pub struct JobPoller {
    inner: Arc<Inner>,
}

struct Inner {
    client: JobsApiClient,
    config: PollerConfig,
    session: Mutex<Session>,
    tx: watch::Sender<PollSnapshot>,
}

#[derive(Default)]
struct Session {
    generation: u64,
    job_id: Option<String>,
    handle: Option<JoinHandle<()>>,
}

impl JobPoller {
    pub fn new(client: JobsApiClient, config: PollerConfig) -> Self {
        let (tx, _rx) = watch::channel(PollSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                client,
                config,
                session: Mutex::new(Session::default()),
                tx,
            }),
        }
    }

    /// Switch the poller to a new job id. Must be called on a Tokio runtime.
    ///
    /// `Some(id)` tears down whatever session was running, clears the
    /// snapshot and starts polling `id` right away. `None` just tears down.
    /// Re-supplying the current id is a no-op, so a finished result is never
    /// re-applied and no second timer appears.
    pub fn set_job_id(&self, job_id: Option<String>) {
        let mut session = self.inner.session.lock().unwrap();
        if session.job_id == job_id {
            return;
        }

        // The old loop must be gone before any new state is established; a
        // bumped generation makes its in-flight response undeliverable.
        if let Some(handle) = session.handle.take() {
            handle.abort();
        }
        session.generation += 1;
        session.job_id = job_id.clone();

        match job_id {
            Some(id) => {
                self.inner.tx.send_replace(PollSnapshot {
                    result: None,
                    error: None,
                    is_active: true,
                });
                let inner = Arc::clone(&self.inner);
                let generation = session.generation;
                session.handle = Some(tokio::spawn(async move {
                    poll_loop(inner, generation, id).await;
                }));
            }
            None => {
                self.inner.tx.send_replace(PollSnapshot {
                    result: None,
                    error: None,
                    is_active: false,
                });
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.inner.tx.subscribe()
    }

    pub fn snapshot(&self) -> PollSnapshot {
        self.inner.tx.borrow().clone()
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        if let Ok(mut session) = self.inner.session.lock() {
            if let Some(handle) = session.handle.take() {
                handle.abort();
            }
        }
    }
}

impl Inner {
    /// Publish a terminal outcome, unless the session it belongs to has been
    /// superseded in the meantime.
    fn finish(&self, generation: u64, outcome: Result<Value, String>) {
        let mut session = self.session.lock().unwrap();
        if session.generation != generation {
            return;
        }
        session.handle = None;
        let snapshot = match outcome {
            Ok(value) => PollSnapshot {
                result: Some(value),
                error: None,
                is_active: false,
            },
            Err(message) => PollSnapshot {
                result: None,
                error: Some(message),
                is_active: false,
            },
        };
        self.tx.send_replace(snapshot);
    }
}

// First query fires immediately; the interval re-arms only after a response
// has been handled, so queries for one session never overlap.
async fn poll_loop(inner: Arc<Inner>, generation: u64, job_id: String) {
    loop {
        let transition = match inner.client.job_status(&job_id).await {
            Ok(status) => interpret_status(&status, &inner.config.sentinels),
            Err(e) => {
                tracing::debug!("status query for {job_id} failed: {e}");
                Transition::Failed(UNREACHABLE_MESSAGE.to_string())
            }
        };

        match transition {
            Transition::Continue => {}
            Transition::Succeeded(value) => {
                inner.finish(generation, Ok(value));
                return;
            }
            Transition::Failed(message) => {
                inner.finish(generation, Err(message));
                return;
            }
        }

        tokio::time::sleep(inner.config.interval).await;
    }
}

fn is_placeholder(payload: &str, sentinels: &[String]) -> bool {
    let trimmed = payload.trim();
    trimmed.is_empty() || sentinels.iter().any(|s| s == trimmed)
}

pub(crate) fn interpret_status(status: &JobStatusResponse, sentinels: &[String]) -> Transition {
    match status.status.as_str() {
        "COMPLETED" => match status.result_data.as_deref() {
            Some(payload) if !is_placeholder(payload, sentinels) => {
                match serde_json::from_str::<Value>(payload) {
                    Ok(Value::Null) => Transition::Failed(NO_DATA_MESSAGE.to_string()),
                    Ok(value) => Transition::Succeeded(value),
                    Err(e) => Transition::Failed(format!(
                        "Analysis finished but returned unreadable data: {e}"
                    )),
                }
            }
            _ => Transition::Failed(NO_DATA_MESSAGE.to_string()),
        },
        "FAILED" => Transition::Failed(FAILED_MESSAGE.to_string()),
        "PENDING" | "IN_PROGRESS" => Transition::Continue,
        other => {
            // Unknown statuses are not an error, the loop just keeps going.
            tracing::debug!("ignoring unrecognized job status {other:?}");
            Transition::Continue
        }
    }
}
