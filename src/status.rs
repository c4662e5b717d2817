//! API status monitor.
//!
//! A check issues one `GET /v1/models` and classifies the outcome:
//! 2xx is online, 401 is a rejected key, anything else (including a
//! failed connection) is offline. Overlapping checks are allowed, but only
//! the most recently started one may write its result.

use crate::client::OpenAiClient;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    Unknown,
    Online,
    Offline,
    InvalidKey,
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApiStatus::Unknown => "unknown",
            ApiStatus::Online => "online",
            ApiStatus::Offline => "offline",
            ApiStatus::InvalidKey => "invalid_key",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub status: ApiStatus,
    pub error: Option<String>,
    pub checking: bool,
    pub last_checked: Option<DateTime<Utc>>,
}

struct StatusState {
    snapshot: StatusSnapshot,
    generation: u64,
}

pub struct StatusMonitor {
    client: Arc<OpenAiClient>,
    credential: Mutex<String>,
    state: Mutex<StatusState>,
}

/// Pure mapping from a probe outcome to the displayed state.
pub fn classify(outcome: &crate::models::Result<u16>) -> (ApiStatus, Option<String>) {
    match outcome {
        Ok(401) => (ApiStatus::InvalidKey, Some("Invalid API Key".to_string())),
        Ok(code) if (200..300).contains(code) => (ApiStatus::Online, None),
        Ok(code) => (ApiStatus::Offline, Some(format!("Error: {}", code))),
        Err(_) => (ApiStatus::Offline, Some("Network error".to_string())),
    }
}

impl StatusMonitor {
    pub fn new(client: Arc<OpenAiClient>, credential: impl Into<String>) -> Self {
        Self {
            client,
            credential: Mutex::new(credential.into()),
            state: Mutex::new(StatusState {
                snapshot: StatusSnapshot {
                    status: ApiStatus::Unknown,
                    error: None,
                    checking: false,
                    last_checked: None,
                },
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatusState> {
        self.state.lock().expect("status lock poisoned")
    }

    fn credential(&self) -> MutexGuard<'_, String> {
        self.credential.lock().expect("credential lock poisoned")
    }

    pub fn set_credential(&self, credential: impl Into<String>) {
        *self.credential() = credential.into();
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().snapshot.clone()
    }

    /// Runs one check. Returns `None` without touching the network when no
    /// credential is set.
    pub async fn check(&self) -> Option<ApiStatus> {
        let credential = self.credential().clone();
        if credential.trim().is_empty() {
            return None;
        }

        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.snapshot.checking = true;
            state.generation
        };

        let outcome = self.client.probe(&credential).await;
        let (status, error) = classify(&outcome);

        let mut state = self.lock();
        if state.generation != generation {
            warn!(generation, latest = state.generation, "discarding stale status result");
            return Some(state.snapshot.status);
        }
        state.snapshot = StatusSnapshot {
            status,
            error,
            checking: false,
            last_checked: Some(Utc::now()),
        };
        info!(%status, "api status updated");
        Some(status)
    }

    /// Re-checks every `every` until `on_update` returns false. Ticks missed
    /// while a check is running are dropped rather than queued.
    pub async fn watch<F>(&self, every: Duration, mut on_update: F)
    where
        F: FnMut(&StatusSnapshot) -> bool,
    {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.check().await;
            if !on_update(&self.snapshot()) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Error;
    use crate::transport::mock::{self, MockTransport};
    use tokio::sync::Notify;

    fn monitor(transport: Arc<MockTransport>, key: &str) -> StatusMonitor {
        StatusMonitor::new(Arc::new(OpenAiClient::new(transport)), key)
    }

    #[test]
    fn classification_table() {
        assert_eq!(classify(&Ok(200)).0, ApiStatus::Online);
        assert_eq!(classify(&Ok(204)).0, ApiStatus::Online);
        assert_eq!(classify(&Ok(401)), (ApiStatus::InvalidKey, Some("Invalid API Key".into())));
        assert_eq!(classify(&Ok(500)), (ApiStatus::Offline, Some("Error: 500".into())));
        assert_eq!(classify(&Ok(403)).0, ApiStatus::Offline);
        assert_eq!(
            classify(&Err(Error::Network("x".into()))),
            (ApiStatus::Offline, Some("Network error".into()))
        );
    }

    #[tokio::test]
    async fn starts_unknown_and_skips_empty_credential() {
        let transport = Arc::new(MockTransport::new(vec![mock::ok("{}")]));
        let monitor = monitor(transport.clone(), "  ");

        assert_eq!(monitor.check().await, None);
        assert_eq!(monitor.snapshot().status, ApiStatus::Unknown);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn online_clears_previous_error() {
        let transport = Arc::new(MockTransport::new(vec![mock::status(401, ""), mock::ok("{}")]));
        let monitor = monitor(transport, "sk-a");

        assert_eq!(monitor.check().await, Some(ApiStatus::InvalidKey));
        assert_eq!(monitor.snapshot().error.as_deref(), Some("Invalid API Key"));

        assert_eq!(monitor.check().await, Some(ApiStatus::Online));
        let snapshot = monitor.snapshot();
        assert!(snapshot.error.is_none());
        assert!(snapshot.last_checked.is_some());
        assert!(!snapshot.checking);
    }

    #[tokio::test]
    async fn new_credential_is_used_by_next_check() {
        let transport = Arc::new(MockTransport::new(vec![mock::ok("{}")]));
        let monitor = monitor(transport.clone(), "");

        assert_eq!(monitor.check().await, None);
        monitor.set_credential("sk-later");
        assert_eq!(monitor.check().await, Some(ApiStatus::Online));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn network_failure_is_offline() {
        let transport = Arc::new(MockTransport::new(vec![mock::broken()]));
        let monitor = monitor(transport, "sk-a");

        assert_eq!(monitor.check().await, Some(ApiStatus::Offline));
        assert_eq!(monitor.snapshot().error.as_deref(), Some("Network error"));
    }

    #[tokio::test]
    async fn stale_check_does_not_overwrite_newer_one() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport::gated(
            vec![mock::status(500, ""), mock::ok("{}")],
            gate.clone(),
        ));
        let monitor = Arc::new(monitor(transport.clone(), "sk-a"));

        let first = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.check().await }
        });
        while transport.calls() < 1 {
            tokio::task::yield_now().await;
        }
        let second = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.check().await }
        });
        while transport.calls() < 2 {
            tokio::task::yield_now().await;
        }

        // The older call carries the 500, the newer one the 200.
        gate.notify_waiters();
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(monitor.snapshot().status, ApiStatus::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_rechecks_until_stopped() {
        let transport = Arc::new(MockTransport::new(vec![
            mock::status(503, ""),
            mock::ok("{}"),
            mock::ok("{}"),
        ]));
        let monitor = monitor(transport.clone(), "sk-a");

        let mut seen = Vec::new();
        monitor
            .watch(Duration::from_secs(30), |snapshot| {
                seen.push(snapshot.status);
                seen.len() < 3
            })
            .await;

        assert_eq!(seen, vec![ApiStatus::Offline, ApiStatus::Online, ApiStatus::Online]);
        assert_eq!(transport.calls(), 3);
    }
}
