//! Router and handlers.

use axum::{
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use kavach_core::{HoneypotEngine, KavachError, VoiceAnalyzer};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use crate::wire::{
    HoneypotRequest, HoneypotResponse, SessionResponse, VoiceAnalyzeRequest, VoiceAnalyzeResponse,
};

pub struct AppState {
    pub app_name: String,
    pub voice: VoiceAnalyzer,
    pub honeypot: HoneypotEngine,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/voice/analyze", post(analyze_voice))
        .route("/api/v1/honeypot", post(engage_honeypot))
        .route("/api/v1/sessions", get(list_sessions))
        .route("/api/v1/sessions/:id", get(get_session).delete(end_session))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn health() -> &'static str {
    "OK"
}

async fn analyze_voice(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VoiceAnalyzeRequest>,
) -> Result<Json<VoiceAnalyzeResponse>, ApiError> {
    let audio = body.audio()?;
    let result = state.voice.analyze(body.language, audio).await?;
    Ok(Json(VoiceAnalyzeResponse {
        status: "success",
        result,
    }))
}

async fn engage_honeypot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HoneypotRequest>,
) -> Result<Json<HoneypotResponse>, ApiError> {
    let incoming = body.message.into_message()?;
    let engagement = state
        .honeypot
        .engage(&body.session_id, &body.metadata, incoming)
        .await?;

    let stored_before = engagement.turn.saturating_sub(1) * 2;
    if stored_before != body.conversation_history.len() {
        tracing::debug!(
            session = %body.session_id,
            stored = stored_before,
            supplied = body.conversation_history.len(),
            "client history differs from stored history; used stored"
        );
    }
    Ok(Json(engagement.into()))
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "success",
        "app_name": state.app_name,
        "sessions": state.honeypot.store().session_ids(),
    }))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .honeypot
        .store()
        .get(&id)
        .ok_or_else(|| KavachError::UnknownSession(id.clone()))?;
    Ok(Json(SessionResponse {
        status: "success",
        session,
    }))
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .honeypot
        .store()
        .end(&id)
        .ok_or_else(|| KavachError::UnknownSession(id.clone()))?;
    Ok(Json(SessionResponse {
        status: "success",
        session,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use kavach_core::{PlaceholderGateway, ScriptedGateway, SessionStore};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_with(gw: Arc<ScriptedGateway>) -> Router {
        let timeout = Duration::from_secs(5);
        router(Arc::new(AppState {
            app_name: "KAVACH Test".to_string(),
            voice: VoiceAnalyzer::new(gw.clone(), timeout),
            honeypot: HoneypotEngine::new(gw, Arc::new(SessionStore::new()), timeout),
        }))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn honeypot_body(session: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "sessionId": session,
            "message": { "id": "m1", "sender": "scammer", "text": text, "timestamp": "2024-05-01T10:00:00Z" },
            "conversationHistory": [],
            "metadata": { "channel": "SMS", "language": "English", "locale": "en-IN" }
        })
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = app_with(Arc::new(ScriptedGateway::new()));
        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn honeypot_turn_reports_success_and_accumulates() {
        let gw = Arc::new(ScriptedGateway::new());
        gw.push_ok(
            r#"{"reply":"Which app?","strategyUsed":"Verification Probing","detectedIntelligence":{"upiIds":["John@Bank"]}}"#,
        );
        let app = app_with(gw);

        let (status, json) = send(
            app.clone(),
            post_json("/api/v1/honeypot", honeypot_body("s-1", "Send money to UPI John@Bank now")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["reply"], "Which app?");
        assert_eq!(json["strategyUsed"], "Verification Probing");
        assert_eq!(json["detectedIntelligence"]["upiIds"][0], "john@bank");
        assert_eq!(json["accumulatedIntelligence"]["upiIds"][0], "john@bank");
        assert_eq!(json["turn"], 1);

        let (status, json) = send(
            app,
            Request::builder().uri("/api/v1/sessions/s-1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["session"]["history"][0]["sender"], "scammer");
        assert_eq!(json["session"]["history"][0]["id"], "m1");
        assert_eq!(json["session"]["history"][1]["sender"], "honeypot");
    }

    #[tokio::test]
    async fn malformed_model_output_is_422() {
        let gw = Arc::new(ScriptedGateway::new());
        gw.push_ok("I am not JSON");
        let (status, json) = send(app_with(gw), post_json("/api/v1/honeypot", honeypot_body("s-2", "hi"))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "engagement_failed");
    }

    #[tokio::test]
    async fn agent_sender_is_rejected() {
        let mut body = honeypot_body("s-3", "hi");
        body["message"]["sender"] = "honeypot".into();
        let (status, json) = send(app_with(Arc::new(ScriptedGateway::new())), post_json("/api/v1/honeypot", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_request");
    }

    #[tokio::test]
    async fn voice_analysis_flattens_result_with_status() {
        let gw = Arc::new(ScriptedGateway::new());
        gw.push_ok(
            r#"{"classification":"HUMAN","confidence":0.91,"explanation":"natural breath","languageDetected":"English",
                "signals":{"pitchVariation":0.7,"breathRandomness":0.8,"spectralFlatness":0.2,"neuralArtifacts":0.05}}"#,
        );
        let (status, json) = send(
            app_with(gw),
            post_json(
                "/api/v1/voice/analyze",
                serde_json::json!({ "language": "English", "audioBase64": "AQIDBA==" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["classification"], "HUMAN");
        assert_eq!(json["signals"]["neuralArtifacts"], 0.05);
        assert_eq!(json["anomaliesTimeline"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let app = app_with(Arc::new(ScriptedGateway::new()));
        let req = Request::builder()
            .method("DELETE")
            .uri("/api/v1/sessions/nope")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "unknown_session");
    }

    #[tokio::test]
    async fn placeholder_backend_serves_a_full_turn() {
        let gw = Arc::new(PlaceholderGateway::new());
        let timeout = Duration::from_secs(1);
        let app = router(Arc::new(AppState {
            app_name: "KAVACH".to_string(),
            voice: VoiceAnalyzer::new(gw.clone(), timeout),
            honeypot: HoneypotEngine::new(gw, Arc::new(SessionStore::new()), timeout),
        }));
        let (status, json) = send(app, post_json("/api/v1/honeypot", honeypot_body("s-4", "hello"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["strategyUsed"], "Passive Listening");
    }

    #[tokio::test]
    async fn session_list_is_sorted_and_shrinks_on_delete() {
        let gw = Arc::new(ScriptedGateway::new());
        gw.push_ok(r#"{"reply":"b?","strategyUsed":"Probe"}"#)
            .push_ok(r#"{"reply":"a?","strategyUsed":"Probe"}"#);
        let app = app_with(gw);
        send(app.clone(), post_json("/api/v1/honeypot", honeypot_body("s-b", "hi"))).await;
        send(app.clone(), post_json("/api/v1/honeypot", honeypot_body("s-a", "hi"))).await;

        let list = || Request::builder().uri("/api/v1/sessions").body(Body::empty()).unwrap();
        let (status, json) = send(app.clone(), list()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["sessions"], serde_json::json!(["s-a", "s-b"]));

        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/v1/sessions/s-a")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app.clone(), delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["session"]["history"].as_array().map(Vec::len), Some(2));

        let (_, json) = send(app, list()).await;
        assert_eq!(json["sessions"], serde_json::json!(["s-b"]));
    }

    #[tokio::test]
    async fn unparsable_timestamp_is_400_and_skips_inference() {
        let gw = Arc::new(ScriptedGateway::new());
        let mut body = honeypot_body("s-5", "hi");
        body["message"]["timestamp"] = "last tuesday".into();
        let (status, json) = send(app_with(gw.clone()), post_json("/api/v1/honeypot", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_request");
        assert!(gw.requests().is_empty());
    }
}
