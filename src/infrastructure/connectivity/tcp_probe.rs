use crate::application::ports::ConnectivityProbe;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reachability probe that attempts a TCP connection to a well-known
/// endpoint, typically the backend's host and port.
pub struct TcpProbe {
    target: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.target)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Connectivity probe to {} failed: {}", self.target, e);
                false
            }
            Err(_) => {
                tracing::debug!("Connectivity probe to {} timed out", self.target);
                false
            }
        }
    }
}
