//! Dispatch boundary and periodic maintenance
//!
//! The drain pulls at most one queued request per tick and hands it to
//! the injected dispatcher, so dispatch concurrency is capped at one
//! in-flight analysis and bursts serialize naturally. A failed or
//! panicking dispatcher loses that one request (logged and dropped,
//! never retried) and the timer keeps running. The sweep purges
//! expired cache entries on its own independent tick.

use crate::controller::AdmissionController;
use crate::queue::AnalysisRequest;
use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Outcome of one external analysis call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Mentoring feedback text for the change
    pub feedback: String,
    /// Model that produced it, if the dispatcher reports one
    pub model: Option<String>,
    /// Billed tokens, if the dispatcher reports them
    pub tokens_used: Option<u32>,
}

impl AnalysisResult {
    pub fn text(feedback: impl Into<String>) -> Self {
        Self {
            feedback: feedback.into(),
            model: None,
            tokens_used: None,
        }
    }
}

/// The external collaborator that builds a prompt, calls a provider,
/// and parses the response. Lives outside this crate.
#[async_trait]
pub trait AnalysisDispatcher: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult>;
}

/// Dequeue and dispatch at most one request. Returns true when a
/// request was taken off the queue, whatever its dispatch outcome.
pub async fn drain_once(
    controller: &Mutex<AdmissionController>,
    dispatcher: &dyn AnalysisDispatcher,
) -> bool {
    let request = controller.lock().await.dequeue_analysis();
    let Some(request) = request else {
        return false;
    };

    let change = request.change.clone();
    let session = request.session.clone().unwrap_or_default();
    let request_id = request.id;

    // The dispatcher is foreign code; a panic there must not kill the
    // drain timer.
    let outcome = AssertUnwindSafe(dispatcher.analyze(request))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(result)) => {
            controller
                .lock()
                .await
                .set_cached_analysis(&change, result, &session);
        }
        Ok(Err(err)) => {
            log::warn!("analysis request {} dropped: {}", request_id, err);
        }
        Err(_) => {
            log::error!("dispatcher panicked; analysis request {} dropped", request_id);
        }
    }
    true
}

/// Start the periodic queue drain. The handle can be aborted on
/// shutdown; queued requests are simply abandoned with the process.
pub fn spawn_drain(
    controller: Arc<Mutex<AdmissionController>>,
    dispatcher: Arc<dyn AnalysisDispatcher>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let secs = controller.lock().await.config().drain_interval_secs;
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        loop {
            ticker.tick().await;
            drain_once(&controller, dispatcher.as_ref()).await;
        }
    })
}

/// Start the periodic cache sweep.
pub fn spawn_sweep(controller: Arc<Mutex<AdmissionController>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let secs = controller.lock().await.config().sweep_interval_secs;
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        loop {
            ticker.tick().await;
            let removed = controller.lock().await.sweep_cache();
            if removed > 0 {
                log::debug!("cache sweep removed {} expired entries", removed);
            }
        }
    })
}
