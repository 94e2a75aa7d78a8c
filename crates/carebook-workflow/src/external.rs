//! Timeout and retry discipline for external collaborator calls.
//!
//! The two external services (NLU extraction, document extraction) are
//! modeled as blocking calls. Each attempt runs on a helper thread and is
//! awaited with a deadline; a timeout or error is retried at most once, then
//! surfaced as `ExternalService` for the calling step's degrade path.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use carebook_contracts::error::{CarebookError, CarebookResult};

/// Deadline and retry budget for one collaborator.
#[derive(Debug, Clone)]
pub struct ExternalCallPolicy {
    pub timeout: Duration,
    pub retry_once: bool,
}

impl Default for ExternalCallPolicy {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(5), retry_once: true }
    }
}

/// Run `call` under `policy`, returning the first successful result.
///
/// A timed-out attempt's helper thread is abandoned; its eventual result is
/// dropped with the channel.
pub fn call_with_policy<T, F>(
    policy: &ExternalCallPolicy,
    service: &str,
    call: F,
) -> CarebookResult<T>
where
    T: Send + 'static,
    F: Fn() -> CarebookResult<T> + Send + Clone + 'static,
{
    let attempts = if policy.retry_once { 2 } else { 1 };
    let mut last_error = CarebookError::ExternalService {
        service: service.to_string(),
        reason: "no attempt made".to_string(),
    };

    for attempt in 1..=attempts {
        let (sender, receiver) = mpsc::channel();
        let call = call.clone();
        thread::spawn(move || {
            let _ = sender.send(call());
        });

        match receiver.recv_timeout(policy.timeout) {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => {
                warn!(service = service, attempt, error = %error, "external call failed");
                last_error = error;
            }
            Err(_) => {
                warn!(
                    service = service,
                    attempt,
                    timeout_ms = policy.timeout.as_millis() as u64,
                    "external call timed out"
                );
                last_error = CarebookError::ExternalService {
                    service: service.to_string(),
                    reason: format!("timed out after {:?}", policy.timeout),
                };
            }
        }
    }

    Err(last_error)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
