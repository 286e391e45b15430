// src/notify.rs
//! Best-effort chat notifications through an incoming webhook.

use crate::constants::NOTIFICATION_TIMEOUT;
use crate::error::AppError;
use serde::Serialize;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Sends `{"text": ...}` to a Slack-style webhook. Without a URL every send
/// is a no-op.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(client: reqwest::Client, webhook_url: Option<String>) -> Self {
        let webhook_url = webhook_url.filter(|u| !u.trim().is_empty());
        if webhook_url.is_none() {
            log::debug!("No webhook configured; notifications disabled");
        }
        Self {
            client,
            webhook_url,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Delivers `text`. Failures are logged and reported as `false`.
    pub async fn send(&self, text: &str) -> bool {
        let Some(url) = self.webhook_url.as_deref() else {
            return false;
        };
        match self.deliver(url, text).await {
            Ok(()) => {
                log::info!("Notification sent");
                true
            }
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    async fn deliver(&self, url: &str, text: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(url)
            .timeout(NOTIFICATION_TIMEOUT)
            .json(&WebhookPayload { text })
            .send()
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Notification(format!("webhook returned {}: {}", status, body)))
        }
    }
}

/// `✅ [account] label: posted` or `❌ [account] label: failed (reason)`.
pub fn outcome_message(username: &str, label: &str, error: Option<&AppError>) -> String {
    match error {
        None => format!("✅ [{}] {}: posted", username, label),
        Some(e) => format!("❌ [{}] {}: failed ({})", username, label, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one request, answers with `status`, and returns the raw request.
    async fn one_shot_server(status: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            if name.eq_ignore_ascii_case("content-length") {
                                value.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
                status
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });
        (url, handle)
    }

    #[test]
    fn messages_carry_account_and_outcome() {
        assert_eq!(
            outcome_message("jobs_bot", "page abc", None),
            "✅ [jobs_bot] page abc: posted"
        );
        let err = AppError::ThreadBroken { index: 2 };
        assert_eq!(
            outcome_message("jobs_bot", "row 4", Some(&err)),
            "❌ [jobs_bot] row 4: failed (Could not locate the post for chunk 2; thread stopped)"
        );
    }

    #[tokio::test]
    async fn disabled_notifier_sends_nothing() {
        let notifier = Notifier::new(reqwest::Client::new(), Some("  ".to_string()));
        assert!(!notifier.is_enabled());
        assert!(!notifier.send("hello").await);
    }

    #[tokio::test]
    async fn posts_text_payload() {
        let (url, server) = one_shot_server("200 OK").await;
        let notifier = Notifier::new(reqwest::Client::new(), Some(url));
        assert!(notifier.send("✅ [jobs_bot] row 2: posted").await);
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /hook"));
        assert!(request.ends_with(r#"{"text":"✅ [jobs_bot] row 2: posted"}"#));
    }

    #[tokio::test]
    async fn webhook_errors_are_swallowed() {
        let (url, server) = one_shot_server("500 Internal Server Error").await;
        let notifier = Notifier::new(reqwest::Client::new(), Some(url));
        assert!(!notifier.send("hello").await);
        server.await.unwrap();
    }
}
