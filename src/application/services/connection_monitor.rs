use crate::application::ports::ConnectivityProbe;
use crate::shared::subscription::{Listeners, Subscription};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionStatus {
    pub online: bool,
    pub last_ping: Option<DateTime<Utc>>,
}

/// Two-state online/offline tracker. State changes come from platform
/// signals (`signal_online` / `signal_offline`) and from a periodic probe
/// check; listeners are notified exactly once per actual transition.
pub struct ConnectionMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    online: AtomicBool,
    last_ping: Mutex<Option<DateTime<Utc>>>,
    listeners: Listeners<bool>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    check_interval: Duration,
}

impl ConnectionMonitor {
    pub fn new(probe: Arc<dyn ConnectivityProbe>, check_interval: Duration) -> Self {
        Self {
            probe,
            online: AtomicBool::new(false),
            last_ping: Mutex::new(None),
            listeners: Listeners::new(),
            ticker: Mutex::new(None),
            check_interval,
        }
    }

    /// Cached state; cheap, no I/O.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Forces a fresh probe check and updates the cached state.
    pub async fn check_online(&self) -> bool {
        let reachable = self.probe.is_reachable().await;
        self.apply(reachable);
        reachable
    }

    /// Platform reported connectivity (e.g. the shell's `online` event).
    pub fn signal_online(&self) {
        self.apply(true);
    }

    /// Platform reported loss of connectivity. Applied immediately, no
    /// probe round-trip.
    pub fn signal_offline(&self) {
        self.apply(false);
    }

    pub fn on_status_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            online: self.is_online(),
            last_ping: *self.last_ping.lock().expect("last_ping poisoned"),
        }
    }

    /// Starts the periodic re-check task. The first check runs immediately.
    pub fn start(self: &Arc<Self>) {
        let mut ticker = self.ticker.lock().expect("ticker poisoned");
        if ticker.is_some() {
            return;
        }
        let monitor = Arc::clone(self);
        *ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(monitor.check_interval);
            loop {
                interval.tick().await;
                monitor.check_online().await;
            }
        }));
    }

    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().expect("ticker poisoned").take() {
            handle.abort();
        }
    }

    fn apply(&self, online: bool) {
        if online {
            *self.last_ping.lock().expect("last_ping poisoned") = Some(Utc::now());
        }
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online != online {
            tracing::info!(online, "connectivity changed");
            self.listeners.emit(&online);
        }
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.lock().expect("ticker poisoned").take() {
            handle.abort();
        }
    }
}
