use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::{EmailMessage, Mailer};
use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts each message as JSON to a mail relay endpoint
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            auth_token: None,
        })
    }

    /// Bearer token sent with every request
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn deliver(&self, message: &EmailMessage) -> Result<()> {
        debug!("Posting e-mail '{}' to {}", message.subject, self.endpoint);

        let mut request = self.client.post(&self.endpoint).json(message);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to send e-mail: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "Mail relay rejected '{}' with status: {}",
                message.subject,
                response.status()
            )));
        }

        Ok(())
    }
}

/// Dry-run mailer that only logs what would have been sent
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, message: &EmailMessage) -> Result<()> {
        info!(
            "Would send '{}' to {:?} (cc {:?})",
            message.subject, message.to, message.cc
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationsConfig;
    use crate::notifications::NotificationService;
    use crate::testing::fixtures::IncidentBuilder;
    use axum::{
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    fn message() -> EmailMessage {
        EmailMessage {
            from: "incidents@example.com".into(),
            to: vec!["rca@example.com".into()],
            cc: Vec::new(),
            subject: "New incident: INC-2024-10001 - Disk full".into(),
            html: "<p>body</p>".into(),
        }
    }

    async fn spawn_relay(status: StatusCode) -> (String, Arc<Mutex<Vec<EmailMessage>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let app = Router::new().route(
            "/send",
            post(move |Json(message): Json<EmailMessage>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(message);
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/send"), received)
    }

    #[tokio::test]
    async fn test_http_mailer_posts_json() {
        let (endpoint, received) = spawn_relay(StatusCode::OK).await;
        let mailer = HttpMailer::new(endpoint).unwrap();
        mailer.deliver(&message()).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], message());
    }

    #[tokio::test]
    async fn test_http_mailer_reports_rejection() {
        let (endpoint, _) = spawn_relay(StatusCode::BAD_GATEWAY).await;
        let mailer = HttpMailer::new(endpoint).unwrap();
        let err = mailer.deliver(&message()).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    /// Relay recording the `Authorization` header of every request
    async fn spawn_auth_relay() -> (String, Arc<Mutex<Vec<Option<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let app = Router::new().route(
            "/send",
            post(move |headers: HeaderMap, Json(_): Json<EmailMessage>| {
                let sink = Arc::clone(&sink);
                async move {
                    let auth = headers
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    sink.lock().unwrap().push(auth);
                    StatusCode::OK
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/send"), seen)
    }

    #[tokio::test]
    async fn test_configured_token_is_sent_as_bearer() {
        let (endpoint, seen) = spawn_auth_relay().await;
        let config = NotificationsConfig {
            enabled: true,
            endpoint: Some(endpoint),
            auth_token: Some("s3cret".into()),
            from: "incidents@example.com".into(),
            ..Default::default()
        };
        let service = NotificationService::from_config(&config).unwrap().unwrap();

        service
            .send_reminder(&IncidentBuilder::new("a").build(), "jane@example.com")
            .await
            .unwrap();

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[Some("Bearer s3cret".to_string())]
        );
    }

    #[tokio::test]
    async fn test_no_token_sends_no_authorization() {
        let (endpoint, seen) = spawn_auth_relay().await;
        let mailer = HttpMailer::new(endpoint).unwrap().with_auth_token(None);
        mailer.deliver(&message()).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), &[None]);
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        assert!(LogMailer.deliver(&message()).await.is_ok());
    }
}
