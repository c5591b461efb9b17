use crate::error::{MonitorError, Result};
use anyhow::Context;
use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;

/// Outbound transport for composed alert messages.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, text: &str) -> Result<()>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Slack incoming-webhook client.
#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    url: Url,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let url = Url::parse(webhook_url).context("invalid Slack webhook URL")?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl AlertSink for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload { text })
            .send()
            .await
            .map_err(|err| MonitorError::delivery(format!("webhook request failed: {err}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MonitorError::delivery(format!(
                "webhook returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

/// Fallback used when no webhook is configured: the alert only reaches the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl AlertSink for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<()> {
        warn!("[alerts] {}", text.replace('\n', " |"));
        info!("[alerts] no webhook configured; alert logged only");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    async fn spawn_webhook(status: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let app = Router::new().route(
            "/services/T000/B000/XXXX",
            post(move |Json(body): Json<Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().await.push(body);
                    (status, "ok")
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                eprintln!("mock webhook error: {err}");
            }
        });
        (format!("http://{addr}/services/T000/B000/XXXX"), received)
    }

    #[tokio::test]
    async fn posts_text_payload() {
        let (url, received) = spawn_webhook(StatusCode::OK).await;
        let notifier = SlackNotifier::new(&url, Duration::from_secs(2)).unwrap();

        notifier.send("Alert at now:\n 🔥 High CPU Usage: 91.0%").await.unwrap();

        let bodies = received.lock().await;
        assert_eq!(bodies.len(), 1);
        assert_eq!(
            bodies[0]["text"],
            "Alert at now:\n 🔥 High CPU Usage: 91.0%"
        );
    }

    #[tokio::test]
    async fn non_success_status_is_delivery_error() {
        let (url, _received) = spawn_webhook(StatusCode::FORBIDDEN).await;
        let notifier = SlackNotifier::new(&url, Duration::from_secs(2)).unwrap();

        let err = notifier.send("hello").await.unwrap_err();
        assert!(matches!(err, MonitorError::Delivery(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn unreachable_webhook_is_delivery_error() {
        let notifier =
            SlackNotifier::new("http://127.0.0.1:9/hook", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            notifier.send("hello").await,
            Err(MonitorError::Delivery(_))
        ));
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(SlackNotifier::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.send("line one\nline two").await.is_ok());
    }
}
