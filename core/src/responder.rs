//! Bark responder: consumes high-volume events and drives the response.
//!
//! One long-lived task drains the monitor's event channel; every event is
//! handled in its own spawned task so a response that takes seconds to play
//! out never delays intake of the next event. Handler failures are caught at
//! the spawn boundary and logged; they cannot reach the sampling loop.

use crate::config::ResponderConfig;
use crate::escalation::EscalationPolicy;
use crate::monitor::HighVolumeEvent;
use crate::notify::NotificationSink;
use crate::playback::{PlaybackBackend, ResponseDispatcher};
use crate::Result;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub struct BarkResponder {
    config: ResponderConfig,
    policy: Arc<Mutex<EscalationPolicy>>,
    dispatcher: Arc<ResponseDispatcher>,
    sink: Arc<dyn NotificationSink>,
}

impl BarkResponder {
    /// Validates the configuration and probes the backend for assets; both
    /// failures are startup errors, nothing is deferred to event time.
    pub async fn new(
        config: ResponderConfig,
        backend: Arc<dyn PlaybackBackend>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        config.validate()?;
        let dispatcher =
            Arc::new(ResponseDispatcher::new(backend, config.max_volume()).await?);
        let policy = Arc::new(Mutex::new(EscalationPolicy::new(
            config.volumes.clone(),
            Duration::from_secs(config.escalation_period),
        )));
        Ok(Self {
            config,
            policy,
            dispatcher,
            sink,
        })
    }

    /// Starts the event-consuming loop. Returns a handle to the background
    /// task; the task ends when the monitor drops its sender.
    pub fn start(self, events: mpsc::Receiver<HighVolumeEvent>) -> JoinHandle<()> {
        tokio::spawn(run_responder(
            self.config,
            self.policy,
            self.dispatcher,
            self.sink,
            events,
        ))
    }

    /// Dispatcher access for out-of-band playback requests (e.g. a remote
    /// "play now" command), sharing the same single-flight session.
    pub fn dispatcher(&self) -> Arc<ResponseDispatcher> {
        Arc::clone(&self.dispatcher)
    }
}

async fn run_responder(
    config: ResponderConfig,
    policy: Arc<Mutex<EscalationPolicy>>,
    dispatcher: Arc<ResponseDispatcher>,
    sink: Arc<dyn NotificationSink>,
    mut events: mpsc::Receiver<HighVolumeEvent>,
) {
    while let Some(event) = events.recv().await {
        let policy = Arc::clone(&policy);
        let dispatcher = Arc::clone(&dispatcher);
        let sink = Arc::clone(&sink);
        let topic_playing = config.topic_playing.clone();

        // One task per event: escalation lookup, dispatch and the blocking
        // wait for completion all happen off the intake path
        tokio::spawn(async move {
            if let Err(e) =
                handle_event(event, policy, dispatcher, sink, &topic_playing).await
            {
                error!(target: "responder", error = %e, "event handler failed");
            }
        });
    }
    info!(target: "responder", "event channel closed; responder stopping");
}

async fn handle_event(
    event: HighVolumeEvent,
    policy: Arc<Mutex<EscalationPolicy>>,
    dispatcher: Arc<ResponseDispatcher>,
    sink: Arc<dyn NotificationSink>,
    topic_playing: &str,
) -> Result<()> {
    let volume = policy.lock().await.choose(event.at);

    match dispatcher.dispatch(volume).await? {
        Some(asset) => {
            info!(target: "responder", playing = %asset, volume, peak = event.peak);
            sink.notify(
                topic_playing,
                &json!({ "Song": asset, "Vol": volume }).to_string(),
            )
            .await;

            // Empty payload marks the response as finished; it goes out even
            // when the backend failed, since either way nothing is playing
            let finished = dispatcher.await_completion().await;
            sink.notify(topic_playing, "").await;
            finished?;
        }
        None => {
            debug!(target: "responder", volume, "response in flight; event absorbed");
        }
    }
    Ok(())
}
