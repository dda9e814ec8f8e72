//! HTTP surface over the message and relay layers.
//!
//! Everything lives under `/messages`, which is also the root of the paths the
//! content-id rewriter produces, so rewritten HTML links resolve against this
//! router unchanged.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    forward_message, health, list_messages, message_content, message_detail, message_html,
    message_raw, message_text, ApiError, AppState, ErrorResponse, ForwardRequest,
    HealthResponse, ListQuery,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/messages", get(list_messages))
        .route("/messages/:id", get(message_detail))
        .route("/messages/:id/html", get(message_html))
        .route("/messages/:id/text", get(message_text))
        .route("/messages/:id/raw", get(message_raw))
        .route("/messages/:id/content/:part_id", get(message_content))
        .route("/messages/:id/forward", post(forward_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::mime::content_path;
    use crate::relay::testing::{DownRelay, RecordingRelay};
    use crate::relay::Relay;
    use crate::store::{MemoryStore, MessageId};
    use crate::Config;

    const RELATED: &str = "From: sender@example.com\r\n\
To: rcpt@example.com\r\n\
Subject: Newsletter\r\n\
Content-Type: multipart/related; boundary=B\r\n\
\r\n\
--B\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Hi <img src=\"cid:img1\"></p>\r\n\
--B\r\n\
Content-Type: image/png\r\n\
Content-ID: <img1>\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw0KGgo=\r\n\
--B--\r\n";

    const MALFORMED: &str =
        "Subject: Broken\r\nContent-Type: multipart/mixed; boundary=X\r\n\r\n--X\r\n\r\nopen";

    struct Harness {
        app: Router,
        relay: Arc<RecordingRelay>,
        related: MessageId,
        malformed: MessageId,
    }

    async fn harness() -> Harness {
        let store = MemoryStore::new();
        let related = store
            .insert("sender@example.com", "rcpt@example.com", RELATED.as_bytes().to_vec())
            .await;
        let malformed = store
            .insert("sender@example.com", "other@example.com", MALFORMED.as_bytes().to_vec())
            .await;

        let relay = Arc::new(RecordingRelay::default());
        let state = AppState::new(Config::default(), Arc::new(store), relay.clone());

        Harness {
            app: router(state),
            relay,
            related,
            malformed,
        }
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, content_type, body)
    }

    async fn post_forward(app: &Router, id: MessageId, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/messages/{id}/forward"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness().await;
        let (status, _, body) = get(&h.app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_list_filters_by_recipient() {
        let h = harness().await;

        let (status, _, body) = get(&h.app, "/messages?recipient=RCPT@example.com").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["messageId"], h.related.0);
        assert_eq!(messages[0]["subject"], "Newsletter");
        assert_eq!(json["truncated"], false);
        assert_eq!(json["unreadable"], 0);

        let (_, _, body) = get(&h.app, "/messages").await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_detail_has_rewritten_html_and_parts() {
        let h = harness().await;

        let (status, _, body) = get(&h.app, &format!("/messages/{}", h.related)).await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["subject"], "Newsletter");
        let html = json["htmlBody"].as_str().unwrap();
        assert!(html.contains(&content_path(h.related, "img1")));
        assert!(!html.contains("cid:"));
        assert_eq!(json["parts"][1]["contentId"], "img1");
        assert_eq!(json["parts"][1]["size"], 8);
    }

    #[tokio::test]
    async fn test_html_view_and_missing_text_body() {
        let h = harness().await;

        let (status, content_type, body) = get(&h.app, &format!("/messages/{}/html", h.related)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains(&format!("/messages/{}/content/img1", h.related)));

        let (status, _, _) = get(&h.app, &format!("/messages/{}/text", h.related)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rewritten_link_serves_part_bytes() {
        let h = harness().await;

        let (status, content_type, body) = get(&h.app, &content_path(h.related, "img1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert_eq!(body, b"\x89PNG\r\n\x1a\n".to_vec());

        let (status, content_type, _) =
            get(&h.app, &format!("/messages/{}/content/0", h.related)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn test_missing_message_and_part_are_not_found() {
        let h = harness().await;

        for uri in [
            "/messages/999".to_string(),
            "/messages/abc".to_string(),
            "/messages/999/raw".to_string(),
            format!("/messages/{}/content/nope", h.related),
            format!("/messages/{}/content/7", h.related),
        ] {
            let (status, _, body) = get(&h.app, &uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["status"], "not_found");
        }
    }

    #[tokio::test]
    async fn test_malformed_message_keeps_raw_view() {
        let h = harness().await;

        for view in ["", "/html", "/text", "/content/0", "/content/img1"] {
            let uri = format!("/messages/{}{view}", h.malformed);
            let (status, _, body) = get(&h.app, &uri).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["status"], "malformed", "{uri}");
        }

        let (status, content_type, body) =
            get(&h.app, &format!("/messages/{}/raw", h.malformed)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/plain"));
        assert_eq!(body, MALFORMED.as_bytes());
    }

    #[tokio::test]
    async fn test_forward_accepted() {
        let h = harness().await;

        let (status, json) =
            post_forward(&h.app, h.related, r#"{"recipient":"new@example.com"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["recipient"], "new@example.com");

        let submitted = h.relay.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].raw, RELATED.as_bytes());
    }

    #[tokio::test]
    async fn test_forward_errors() {
        let h = harness().await;

        let (status, json) = post_forward(&h.app, h.related, r#"{"recipient":"nope"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "invalid_recipient");

        let (status, _) =
            post_forward(&h.app, MessageId(999), r#"{"recipient":"new@example.com"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let store = MemoryStore::new();
        let id = store.insert("a@example.com", "b@example.com", RELATED.as_bytes().to_vec()).await;
        let relay: Arc<dyn Relay> = Arc::new(DownRelay);
        let app = router(AppState::new(Config::default(), Arc::new(store), relay));

        let (status, json) = post_forward(&app, id, r#"{"recipient":"new@example.com"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["status"], "relay_unavailable");
    }
}
