//! Shared fixtures for the integration tests

use async_trait::async_trait;
use parking_lot::Mutex;
use pumpwatch::alert::Notifier;
use pumpwatch::config::RecipientConfig;
use pumpwatch::error::NotifyError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Notifier that records every send and fails for chosen recipients
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub unreachable: HashSet<i64>,
}

impl RecordingNotifier {
    pub fn failing_for(ids: &[i64]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            unreachable: ids.iter().copied().collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn recipients(&self) -> Vec<i64> {
        self.sent.lock().iter().map(|(id, _)| *id).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient_id: i64, text: &str) -> Result<(), NotifyError> {
        if self.unreachable.contains(&recipient_id) {
            return Err(NotifyError::Rejected {
                recipient: recipient_id,
                status: 403,
                body: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().push((recipient_id, text.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn recipient(id: i64) -> RecipientConfig {
    RecipientConfig {
        id,
        alert_venues: None,
        disabled_classes: vec![],
        banned: false,
    }
}

/// Request paths seen by a test HTTP server
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Serve the same canned response to every request. Returns the base URL.
pub async fn serve_http(status: u16, body: &'static str) -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let requests = log.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let requests = requests.clone();

            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&buf);
                if let Some(path) = head
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                {
                    requests.lock().push(path.to_string());
                }

                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (base_url, log)
}

/// Poll `condition` until it holds or five seconds pass
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
