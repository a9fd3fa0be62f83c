use crate::config::{ServiceConfig, CHARACTER_ENDPOINT, SENTENCE_ENDPOINT};
use crate::emotion::{CharacterTimeline, SentenceAnnotation};
use crate::service::{AnalysisService, ServiceError, FALLBACK_ERROR_MESSAGE};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

const LOG_TARGET: &str = "service::http";

/// [`AnalysisService`] over the JSON-over-HTTP contract:
/// `POST {base}/analyze` and `POST {base}/analyze_characters` with `{"text": ...}`.
#[derive(Clone)]
pub struct HttpAnalysisService {
    client: Client,
    sentence_url: Url,
    character_url: Url,
}

impl HttpAnalysisService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(config.timeout.duration()).build()?;
        Ok(Self {
            client,
            sentence_url: config.base_url.endpoint(SENTENCE_ENDPOINT)?,
            character_url: config.base_url.endpoint(CHARACTER_ENDPOINT)?,
        })
    }

    async fn post<T: DeserializeOwned>(&self, url: &Url, text: String) -> Result<T, ServiceError> {
        tracing::debug!(target: LOG_TARGET, %url, chars = text.len(), "posting analysis request");

        let response = self
            .client
            .post(url.clone())
            .json(&AnalyzeRequest { text })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(target: LOG_TARGET, %url, error = %e, "analysis request failed");
                ServiceError::Transport(e)
            })?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_owned());
            tracing::warn!(target: LOG_TARGET, %url, status = status.as_u16(), %message, "analysis service error");
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(target: LOG_TARGET, %url, error = %e, "unparseable analysis response");
            ServiceError::InvalidResponse(format!("Failed to parse JSON: {e}"))
        })
    }
}

#[derive(Serialize)]
struct AnalyzeRequest {
    text: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl AnalysisService for HttpAnalysisService {
    fn analyze_sentences(
        &self,
        text: String,
    ) -> BoxFuture<'_, Result<Vec<SentenceAnnotation>, ServiceError>> {
        async move { self.post(&self.sentence_url, text).await }.boxed()
    }

    fn analyze_characters(
        &self,
        text: String,
    ) -> BoxFuture<'_, Result<CharacterTimeline, ServiceError>> {
        async move { self.post(&self.character_url, text).await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RequestTimeout, ServiceUrl};
    use crate::emotion::EmotionLabel;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::net::SocketAddr;

    async fn echo_sentences(Json(body): Json<Value>) -> Json<Value> {
        let text = body["text"].as_str().unwrap_or_default().to_owned();
        Json(json!([
            { "sentence": text, "emotions": ["joy", "elation"] },
            { "sentence": "Quiet.", "emotions": [] }
        ]))
    }

    async fn ordered_characters() -> impl IntoResponse {
        (
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"Zed":[{"sentence":"Zed ran.","emotions":["fear"]}],"Amy":[{"sentence":"Amy laughed.","emotions":["joy"]}]}"#,
        )
    }

    async fn failing_with_message() -> impl IntoResponse {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "An internal error occurred: model offline" })),
        )
    }

    async fn failing_without_json() -> impl IntoResponse {
        (StatusCode::BAD_GATEWAY, "upstream went away")
    }

    async fn spawn_service(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    fn client_for(addr: SocketAddr) -> HttpAnalysisService {
        let config = ServiceConfig {
            base_url: ServiceUrl::parse(&format!("http://{addr}")).expect("valid url"),
            timeout: RequestTimeout::new(5).expect("nonzero"),
        };
        HttpAnalysisService::new(&config).expect("client builds")
    }

    #[tokio::test]
    async fn sentence_request_sends_full_text() {
        let addr = spawn_service(Router::new().route("/analyze", post(echo_sentences))).await;
        let service = client_for(addr);

        let text = "Alice smiled.\nBob frowned.".to_owned();
        let annotations = service
            .analyze_sentences(text.clone())
            .await
            .expect("request succeeds");

        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].sentence, text);
        assert_eq!(
            annotations[0].emotions,
            vec![
                EmotionLabel::Joy,
                EmotionLabel::Unrecognized("elation".to_owned())
            ]
        );
        assert!(annotations[1].emotions.is_empty());
    }

    #[tokio::test]
    async fn character_response_keeps_service_order() {
        let addr = spawn_service(
            Router::new().route("/analyze_characters", post(ordered_characters)),
        )
        .await;

        let timeline = client_for(addr)
            .analyze_characters("Zed ran. Amy laughed.".to_owned())
            .await
            .expect("request succeeds");
        assert_eq!(timeline.names().collect::<Vec<_>>(), vec!["Zed", "Amy"]);
    }

    #[tokio::test]
    async fn error_body_message_is_passed_through() {
        let addr = spawn_service(Router::new().route("/analyze", post(failing_with_message))).await;

        let err = client_for(addr)
            .analyze_sentences("text".to_owned())
            .await
            .expect_err("500 is an error");
        match err {
            ServiceError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "An internal error occurred: model offline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_uses_fallback_message() {
        let addr = spawn_service(
            Router::new().route("/analyze_characters", post(failing_without_json)),
        )
        .await;

        let err = client_for(addr)
            .analyze_characters("text".to_owned())
            .await
            .expect_err("502 is an error");
        assert_eq!(err.to_string(), FALLBACK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn wrong_shape_is_invalid_response() {
        // A character-shaped body where a sentence list is expected.
        let addr = spawn_service(Router::new().route("/analyze", post(ordered_characters))).await;

        let err = client_for(addr)
            .analyze_sentences("text".to_owned())
            .await
            .expect_err("object is not a list");
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let err = client_for(addr)
            .analyze_sentences("text".to_owned())
            .await
            .expect_err("nothing is listening");
        assert!(matches!(err, ServiceError::Transport(_)));
    }
}
