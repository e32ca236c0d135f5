//! Transport collaborator: delivers the multipart payload to the backend.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::TransportError;

use super::model::SelectedFile;

/// One named part of the setup payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadPart {
    Text { name: &'static str, value: String },
    File { name: &'static str, file: SelectedFile },
}

impl PayloadPart {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => *name,
        }
    }
}

/// Ordered multipart payload, independent of any HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPayload {
    parts: Vec<PayloadPart>,
}

impl MultipartPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, name: &'static str, value: impl Into<String>) {
        self.parts.push(PayloadPart::Text {
            name,
            value: value.into(),
        });
    }

    pub fn push_file(&mut self, name: &'static str, file: SelectedFile) {
        self.parts.push(PayloadPart::File { name, file });
    }

    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&PayloadPart> {
        self.parts.iter().find(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.parts.iter().map(PayloadPart::name).collect()
    }

    /// Convert into a reqwest form.
    pub fn into_form(self) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for part in self.parts {
            form = match part {
                PayloadPart::Text { name, value } => form.text(name, value),
                PayloadPart::File { name, file } => {
                    let bytes = Part::bytes(file.data().to_vec())
                        .file_name(file.name.clone())
                        .mime_str(&file.mime_type)
                        .map_err(|e| TransportError::InvalidPayload {
                            part: name.to_string(),
                            reason: e.to_string(),
                        })?;
                    form.part(name, bytes)
                }
            };
        }
        Ok(form)
    }
}

/// The created school, as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SchoolRecord {
    /// Numeric or string id, depending on the backend.
    pub id: serde_json::Value,
}

/// Success body of the setup endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SetupResponse {
    pub school: SchoolRecord,
}

impl SetupResponse {
    pub fn new(id: impl Into<serde_json::Value>) -> Self {
        Self {
            school: SchoolRecord { id: id.into() },
        }
    }

    /// The persisted school id as a string, if the response carries one.
    pub fn identifier(&self) -> Option<String> {
        match &self.school.id {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Sends a setup payload with a bearer token.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(
        &self,
        payload: MultipartPayload,
        token: &SecretString,
    ) -> Result<SetupResponse, TransportError>;
}

/// HTTP transport: POSTs `multipart/form-data` to the setup endpoint.
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(
        &self,
        payload: MultipartPayload,
        token: &SecretString,
    ) -> Result<SetupResponse, TransportError> {
        debug!(endpoint = %self.endpoint, parts = ?payload.names(), "Sending school setup");
        let form = payload.into_form()?;

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let response: SetupResponse = serde_json::from_str(&body)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        info!(endpoint = %self.endpoint, status = %status, "School setup accepted");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn one_shot_server(
        status_line: &str,
        body: &str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                // multipart bodies end with the closing boundary "--\r\n"
                if request.ends_with(b"--\r\n") {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://127.0.0.1:{port}/school/setup"), handle)
    }

    fn payload() -> MultipartPayload {
        let mut payload = MultipartPayload::new();
        payload.push_text("name", "Acme");
        payload.push_text("phoneNumber", "555");
        payload.push_file(
            "logoUrl",
            SelectedFile::new("logo.png", "image/png", b"PNGDATA".to_vec()),
        );
        payload
    }

    #[test]
    fn payload_lookup_by_name() {
        let payload = payload();
        assert_eq!(payload.names(), vec!["name", "phoneNumber", "logoUrl"]);
        assert!(matches!(payload.part("logoUrl"), Some(PayloadPart::File { .. })));
        assert!(payload.part("stampUrl").is_none());
    }

    #[test]
    fn identifier_accepts_numbers_and_strings() {
        assert_eq!(SetupResponse::new(42).identifier().as_deref(), Some("42"));
        assert_eq!(SetupResponse::new("sch_1").identifier().as_deref(), Some("sch_1"));
        assert!(SetupResponse::new("").identifier().is_none());
        assert!(SetupResponse::new(serde_json::Value::Null).identifier().is_none());
    }

    #[test]
    fn response_parses_backend_shape() {
        let parsed: SetupResponse =
            serde_json::from_str(r#"{"school":{"id":7,"name":"Acme"},"message":"ok"}"#).unwrap();
        assert_eq!(parsed.identifier().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn http_transport_sends_multipart_with_bearer() {
        let (url, server) = one_shot_server("201 Created", r#"{"school":{"id":99}}"#).await;
        let transport = HttpTransport::new(url);
        let token = SecretString::from("tok-123".to_string());

        let response = transport.submit(payload(), &token).await.unwrap();
        assert_eq!(response.identifier().as_deref(), Some("99"));

        let request = server.await.unwrap();
        let lower = request.to_lowercase();
        assert!(lower.starts_with("post /school/setup"));
        assert!(lower.contains("authorization: bearer tok-123"));
        assert!(lower.contains("multipart/form-data"));
        assert!(request.contains("name=\"phoneNumber\""));
        assert!(request.contains("filename=\"logo.png\""));
        assert!(request.contains("PNGDATA"));
    }

    #[tokio::test]
    async fn http_transport_reports_error_status() {
        let (url, server) =
            one_shot_server("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let transport = HttpTransport::new(url);
        let token = SecretString::from("tok".to_string());

        let err = transport.submit(payload(), &token).await.unwrap_err();
        match err {
            TransportError::Status { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("boom"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn http_transport_rejects_malformed_body() {
        let (url, server) = one_shot_server("200 OK", r#"{"ok":true}"#).await;
        let transport = HttpTransport::new(url);
        let token = SecretString::from("tok".to_string());

        let err = transport.submit(payload(), &token).await.unwrap_err();
        assert!(matches!(err, TransportError::MalformedResponse(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn http_transport_maps_connection_failure() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = HttpTransport::new(format!("http://127.0.0.1:{port}/school/setup"));
        let token = SecretString::from("tok".to_string());
        let err = transport.submit(payload(), &token).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
