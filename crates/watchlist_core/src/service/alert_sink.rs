//! Best-effort delivery of alerts to an external push transport.
//!
//! # Invariants
//! - Delivery runs on a detached thread after the originating transaction
//!   has committed; the caller never waits on it.
//! - Delivery failures (including a failure to spawn) are logged and
//!   discarded. They never reach the primary result.

use crate::logging::sanitize_message;
use crate::model::alert::NewAlert;
use log::{debug, warn};
use std::sync::Arc;
use std::thread;

const MAX_SINK_ERROR_CHARS: usize = 160;

/// External push transport for newly inserted alerts.
pub trait AlertSink: Send + Sync + 'static {
    fn deliver(&self, alert: &NewAlert) -> Result<(), String>;
}

/// Hands `alerts` to `sink` on a detached thread.
pub(crate) fn dispatch_best_effort(sink: &Arc<dyn AlertSink>, alerts: Vec<NewAlert>) {
    if alerts.is_empty() {
        return;
    }

    let sink = Arc::clone(sink);
    let spawned = thread::Builder::new()
        .name("alert-sink".to_string())
        .spawn(move || {
            for alert in alerts {
                match sink.deliver(&alert) {
                    Ok(()) => debug!(
                        "event=alert_dispatch module=alert_sink status=ok user_id={} kind={}",
                        alert.user_id,
                        alert.kind.as_str()
                    ),
                    Err(err) => warn!(
                        "event=alert_dispatch module=alert_sink status=error user_id={} kind={} error={}",
                        alert.user_id,
                        alert.kind.as_str(),
                        sanitize_message(&err, MAX_SINK_ERROR_CHARS)
                    ),
                }
            }
        });

    if let Err(err) = spawned {
        warn!("event=alert_dispatch module=alert_sink status=error error_code=spawn_failed error={err}");
    }
}
