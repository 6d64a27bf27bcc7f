use async_trait::async_trait;

/// Answers "is the network usable right now". The default deployment wires
/// this to the cheap platform signal; a real reachability probe (see
/// `infrastructure::connectivity::TcpProbe`) can be substituted without
/// changing the monitor contract.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}
