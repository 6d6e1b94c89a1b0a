use std::sync::Arc;

use axum::http::Method;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::error::RelayError;
use crate::relay::Relay;
use crate::submission::Submission;

/// Validates a form submission and forwards it through the relay.
///
/// `relay` is `None` when the deployment lacks credentials; every request
/// then fails with a configuration error before touching the body.
pub struct FormRelayHandler {
    relay: Option<Arc<dyn Relay>>,
}

impl FormRelayHandler {
    pub fn new(relay: Option<Arc<dyn Relay>>) -> Self {
        Self { relay }
    }

    /// Runs the pipeline for anything except a CORS preflight, which the
    /// router answers on its own.
    pub async fn handle(&self, method: &Method, body: &[u8]) -> Result<(), RelayError> {
        if *method != Method::POST {
            return Err(RelayError::MethodNotAllowed);
        }

        let relay = self.relay.as_ref().ok_or(RelayError::Configuration)?;

        let submission = Submission::parse(&parse_body(body))?;
        info!("Relaying {} submission", submission.kind());

        relay.send_text(&submission.to_message()).await
    }

    /// Like `handle`, with failures logged at the level they deserve.
    pub async fn handle_logged(&self, method: &Method, body: &[u8]) -> Result<(), RelayError> {
        let result = self.handle(method, body).await;
        match &result {
            Ok(()) => info!("Submission delivered"),
            Err(RelayError::Unexpected(e)) => error!("Failed to relay submission: {:#}", e),
            Err(RelayError::Configuration) => error!("{}", RelayError::Configuration),
            Err(RelayError::Downstream { status, .. }) => {
                warn!("Telegram refused submission with status {}", status)
            }
            Err(e) => info!("Rejected submission: {}", e),
        }
        result
    }
}

/// An absent or malformed body reads as an empty object.
fn parse_body(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Records every message instead of sending it.
    #[derive(Default)]
    struct RecordingRelay {
        sent: Mutex<Vec<String>>,
        fail_with_status: Option<u16>,
    }

    #[async_trait]
    impl Relay for RecordingRelay {
        async fn send_text(&self, text: &str) -> Result<(), RelayError> {
            self.sent.lock().await.push(text.to_string());
            match self.fail_with_status {
                Some(status) => Err(RelayError::Downstream {
                    status,
                    detail: "Unauthorized".to_string(),
                }),
                None => Ok(()),
            }
        }
    }

    fn handler_with(relay: &Arc<RecordingRelay>) -> FormRelayHandler {
        FormRelayHandler::new(Some(relay.clone() as Arc<dyn Relay>))
    }

    #[tokio::test]
    async fn test_guest_entry_is_relayed() {
        let relay = Arc::new(RecordingRelay::default());
        let handler = handler_with(&relay);

        let body = br#"{"nama": "Sari", "kehadiran": "Hadir", "jumlah": "2"}"#;
        handler.handle(&Method::POST, body).await.unwrap();

        let sent = relay.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Nama: Sari"));
        assert!(sent[0].contains("Kehadiran: Hadir"));
        assert!(sent[0].contains("Jumlah: 2"));
    }

    #[tokio::test]
    async fn test_missing_required_field_skips_relay() {
        let relay = Arc::new(RecordingRelay::default());
        let handler = handler_with(&relay);

        let bodies: [&[u8]; 3] = [
            br#"{"kehadiran": "Hadir"}"#,
            br#"{"tipe": "konfirmasi_pembayaran", "nama_pengirim": "Sari"}"#,
            b"",
        ];
        for body in bodies {
            let err = handler.handle(&Method::POST, body).await.unwrap_err();
            assert!(matches!(err, RelayError::Validation(_)), "{:?}", err);
        }
        assert!(relay.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_reads_as_empty_object() {
        let relay = Arc::new(RecordingRelay::default());
        let handler = handler_with(&relay);

        let err = handler
            .handle(&Method::POST, b"{not json")
            .await
            .unwrap_err();
        match err {
            RelayError::Validation(msg) => assert_eq!(msg, "Nama wajib diisi"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_method_rejected() {
        let relay = Arc::new(RecordingRelay::default());
        let handler = handler_with(&relay);

        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let err = handler.handle(&method, b"{}").await.unwrap_err();
            assert!(matches!(err, RelayError::MethodNotAllowed));
        }
        assert!(relay.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_every_kind() {
        let handler = FormRelayHandler::new(None);

        let bodies: [&[u8]; 3] = [
            br#"{"nama": "Sari", "kehadiran": "Hadir"}"#,
            br#"{"tipe": "konfirmasi_pembayaran", "nama_pengirim": "Sari", "metode": "BCA"}"#,
            b"{}",
        ];
        for body in bodies {
            let err = handler.handle(&Method::POST, body).await.unwrap_err();
            assert!(matches!(err, RelayError::Configuration), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_downstream_failure_propagates() {
        let relay = Arc::new(RecordingRelay {
            fail_with_status: Some(401),
            ..RecordingRelay::default()
        });
        let handler = handler_with(&relay);

        let body = br#"{"tipe": "KONFIRMASI_PEMBAYARAN", "nama_pengirim": "Sari", "metode": "BCA", "nominal": "150,000"}"#;
        let err = handler.handle_logged(&Method::POST, body).await.unwrap_err();
        assert!(matches!(err, RelayError::Downstream { status: 401, .. }));

        let sent = relay.sent.lock().await;
        assert!(sent[0].contains("Nominal: Rp150.000"));
    }
}
