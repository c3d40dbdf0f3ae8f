// Host reachability polling
//
// Probes the API host on a fixed interval and publishes transitions on a
// channel owned by whoever hosts the list engine.
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable,
}

pub struct ReachabilityMonitor {
    client: reqwest::Client,
    probe_url: String,
    interval: Duration,
}

impl ReachabilityMonitor {
    pub fn new(probe_url: impl Into<String>, interval: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(interval.max(Duration::from_secs(1)))
            .build()
            .unwrap_or_default();

        Self {
            client,
            probe_url: probe_url.into(),
            interval,
        }
    }

    /// Any HTTP response counts as reachable, only transport failures do not
    pub async fn probe(&self) -> Reachability {
        match self.client.head(&self.probe_url).send().await {
            Ok(_) => Reachability::Reachable,
            Err(e) => {
                debug!("Reachability probe to {} failed: {}", self.probe_url, e);
                Reachability::Unreachable
            }
        }
    }

    /// Poll forever, sending only state changes. Stops once the receiver is dropped.
    pub fn spawn(self, tx: mpsc::UnboundedSender<Reachability>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut last: Option<Reachability> = None;

            loop {
                let current = self.probe().await;
                if last != Some(current) {
                    info!("Host {} is now {:?}", self.probe_url, current);
                    if tx.send(current).is_err() {
                        break;
                    }
                    last = Some(current);
                }

                sleep(self.interval).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_probe_reachable_on_any_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let monitor = ReachabilityMonitor::new(server.uri(), Duration::from_millis(50));
        assert_eq!(monitor.probe().await, Reachability::Reachable);
    }

    #[tokio::test]
    async fn test_probe_unreachable_on_refused_connection() {
        // Port 9 (discard) is closed on test machines
        let monitor = ReachabilityMonitor::new("http://127.0.0.1:9", Duration::from_millis(50));
        assert_eq!(monitor.probe().await, Reachability::Unreachable);
    }

    #[tokio::test]
    async fn test_spawn_reports_initial_state_once() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = ReachabilityMonitor::new(server.uri(), Duration::from_millis(20)).spawn(tx);

        assert_eq!(rx.recv().await, Some(Reachability::Reachable));

        // Stable state, so nothing else should arrive for a few intervals
        sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());

        handle.abort();
    }
}
