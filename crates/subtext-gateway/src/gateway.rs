//! HTTP gateway exposing the analysis pipeline.
//!
//! The gateway is a thin marshalling layer: it validates nothing itself
//! beyond JSON decoding, hands the input to the pipeline, and maps the
//! typed failure onto an HTTP status. Statelessness is a product property -
//! no request or result is ever stored.

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{ApiFailure, GatewayError, Result};
use subtext_core::AnalyzeInput;
use subtext_engine::AnalysisPipeline;

/// Shared state for all handlers.
#[derive(Debug)]
pub struct GatewayState {
    pub pipeline: AnalysisPipeline,
    pub expose_error_details: bool,
    pub started_at: DateTime<Utc>,
}

/// The gateway server.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    state: Arc<GatewayState>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, pipeline: AnalysisPipeline) -> Self {
        let state = Arc::new(GatewayState {
            pipeline,
            expose_error_details: config.expose_error_details,
            started_at: Utc::now(),
        });
        Self { config, state }
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/", get(Self::handle_index))
            .route("/health", get(Self::handle_health))
            .route("/status", get(Self::handle_status))
            .route("/analyze/text", post(Self::handle_analyze))
            .layer(self.cors_layer())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let router = self.build_router();

        tracing::info!("gateway listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .await
            .map_err(GatewayError::Io)?;

        Ok(())
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        if origins.is_empty() {
            // Development fallback, also covers origin-less clients.
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
        }
    }

    async fn handle_index() -> &'static str {
        "Subtext Analysis API"
    }

    async fn handle_health() -> impl IntoResponse {
        axum::Json(serde_json::json!({ "status": "ok" }))
    }

    async fn handle_status(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
        axum::Json(serde_json::json!({
            "status": "ok",
            "started_at": state.started_at.to_rfc3339(),
            "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
        }))
    }

    async fn handle_analyze(
        State(state): State<Arc<GatewayState>>,
        Json(input): Json<AnalyzeInput>,
    ) -> Response {
        let request_id = Uuid::new_v4();
        tracing::info!(
            "[{}] analysis request: text={} chars, context={}, image={}",
            request_id,
            input.text.as_deref().map(|t| t.chars().count()).unwrap_or(0),
            input.context.is_some(),
            input.image.is_some()
        );

        match state.pipeline.run(input).await {
            Ok(result) => {
                tracing::info!("[{}] analysis completed", request_id);
                (StatusCode::OK, Json(result)).into_response()
            }
            Err(err) => {
                // Full detail to the log; the response body only ever
                // carries what ApiFailure decides is safe.
                tracing::error!("[{}] analysis failed: {}", request_id, err);
                ApiFailure::from_pipeline(&err, state.expose_error_details).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use subtext_core::ImagePayload;
    use subtext_engine::Oracle;

    /// Oracle double that always produces the same scripted pair of stage
    /// outputs, keyed off the instruction text.
    #[derive(Debug)]
    struct CannedOracle;

    #[async_trait::async_trait]
    impl Oracle for CannedOracle {
        async fn invoke(
            &self,
            system_instruction: &str,
            _user_prompt: &str,
            _image: Option<&ImagePayload>,
        ) -> Result<String> {
            if system_instruction.contains("response strategies") {
                Ok(r#"{"strategies": [
                    {"name": "Hold back", "optimization_goal": "space", "risks": []},
                    {"name": "Name it", "optimization_goal": "clarity", "risks": []},
                    {"name": "Open question", "optimization_goal": "dialogue", "risks": []}
                ]}"#
                    .to_string())
            } else {
                Ok(r#"{
                    "subtext_summary": {"explicit": "a", "implied": "b", "avoided": "c"},
                    "intent_score": 50,
                    "confidence": 50,
                    "emotional_tones": ["flat"],
                    "risk_flags": []
                }"#
                .to_string())
            }
        }
    }

    fn gateway() -> Gateway {
        let pipeline = AnalysisPipeline::new(Arc::new(CannedOracle));
        Gateway::new(GatewayConfig::default(), pipeline)
    }

    #[test]
    fn router_builds_with_default_config() {
        let _router = gateway().build_router();
    }

    #[tokio::test]
    async fn analyze_rejects_empty_input_with_400() {
        let gw = gateway();
        let response =
            Gateway::handle_analyze(State(gw.state.clone()), Json(AnalyzeInput::default())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyze_returns_200_for_valid_text() {
        let gw = gateway();
        let input = AnalyzeInput {
            text: Some("Are we ok?".to_string()),
            ..Default::default()
        };
        let response = Gateway::handle_analyze(State(gw.state.clone()), Json(input)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = Gateway::handle_health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
