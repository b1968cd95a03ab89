//! Execution-thread handoff.
//!
//! Snippets must run on the host's one designated execution thread (the
//! stand-in for a UI-affinity thread), while transport handlers wait on the
//! network side. The handoff is a channel-based request/response: a handler
//! sends the payload plus a one-shot reply channel and blocks on the reply —
//! wait-on-signal, not polling, and deliberately without a timeout. A hang
//! in user code hangs that one request only.

use std::any::Any;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use livepad_core::dump::ExecuteResponse;

use crate::engine::Engine;

/// One queued execution: the snippet payload and the channel the serialized
/// response goes back on.
struct ExecJob {
    payload: Bytes,
    reply: oneshot::Sender<String>,
}

/// Cheap handle transport handlers use to submit work to the execution
/// thread.
#[derive(Clone)]
pub struct ExecutorHandle {
    tx: mpsc::UnboundedSender<ExecJob>,
}

impl ExecutorHandle {
    /// Run a payload on the execution thread and wait for its response.
    pub async fn execute(&self, payload: Bytes) -> String {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = ExecJob {
            payload,
            reply: reply_tx,
        };
        if self.tx.send(job).is_err() {
            return unavailable_response();
        }
        // No timeout by design: the completion signal is the only way out.
        reply_rx.await.unwrap_or_else(|_| unavailable_response())
    }
}

fn unavailable_response() -> String {
    serde_json::to_string(&ExecuteResponse::error("execution thread is gone"))
        .unwrap_or_else(|_| r#"{"ErrorMessage":"execution thread is gone","Results":null}"#.into())
}

/// Spawn the execution thread.
///
/// `host_factory` runs on the new thread, so the host's scriptable state
/// never has to be `Send` — only the factory does. Jobs are processed
/// strictly one at a time; the thread exits when every handle is dropped.
pub fn spawn_executor(
    engine: Engine,
    host_factory: impl FnOnce() -> Box<dyn Any> + Send + 'static,
) -> (ExecutorHandle, std::thread::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ExecJob>();

    let thread = std::thread::Builder::new()
        .name("livepad-exec".to_string())
        .spawn(move || {
            let mut host = host_factory();
            tracing::debug!("execution thread started");
            while let Some(job) = rx.blocking_recv() {
                let response = engine.execute(&job.payload, host.as_mut());
                let body = serde_json::to_string(&response).unwrap_or_else(|e| {
                    tracing::error!(error = %e, "response serialization failed");
                    serde_json::to_string(&ExecuteResponse::error(format!(
                        "response serialization failed: {e}"
                    )))
                    .expect("error response always serializes")
                });
                // The waiting handler may have given up (connection reset);
                // a dead receiver is not an executor problem.
                let _ = job.reply.send(body);
            }
            tracing::debug!("execution thread exiting");
        })
        .expect("failed to spawn execution thread");

    (ExecutorHandle { tx }, thread)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine() -> Engine {
        Engine::new(std::env::temp_dir().join("livepad-executor-tests"), 3, 1000)
    }

    #[tokio::test]
    async fn jobs_round_trip_through_the_execution_thread() {
        let (handle, _thread) = spawn_executor(test_engine(), || Box::new(()));

        // Garbage payload: the engine answers with a structured load error.
        let body = handle.execute(Bytes::from_static(b"not a library")).await;
        let response: ExecuteResponse = serde_json::from_str(&body).unwrap();
        assert!(response.error_message.unwrap().contains("not a loadable"));
    }

    #[tokio::test]
    async fn requests_are_processed_serially_in_order() {
        let (handle, _thread) = spawn_executor(test_engine(), || Box::new(()));

        // Fire several concurrently; every one must get its own response.
        let mut joins = Vec::new();
        for i in 0..4 {
            let handle = handle.clone();
            joins.push(tokio::spawn(async move {
                let body = handle.execute(Bytes::from(format!("payload {i}"))).await;
                serde_json::from_str::<ExecuteResponse>(&body).unwrap()
            }));
        }
        for join in joins {
            let response = join.await.unwrap();
            assert!(response.error_message.is_some());
        }
    }

    #[test]
    fn unavailable_response_is_valid_wire_json() {
        let response: ExecuteResponse = serde_json::from_str(&unavailable_response()).unwrap();
        assert!(response.error_message.unwrap().contains("execution thread"));
        assert!(response.results.is_none());
    }
}
