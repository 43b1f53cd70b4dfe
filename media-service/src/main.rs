use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use uuid::Uuid;

use media_service::{MediaCrew, Recommendation, RecommendationRequest, ServiceConfig};

#[derive(Debug, Deserialize)]
struct RecommendParams {
    query: String,
    #[serde(default = "default_media_type")]
    media_type: String,
    genre: Option<String>,
    mood: Option<String>,
    timeframe: Option<String>,
    #[serde(default = "default_count")]
    num_recommendations: usize,
}

fn default_media_type() -> String {
    "movie".to_string()
}

fn default_count() -> usize {
    3
}

#[derive(Debug, Serialize)]
struct RecommendResponse {
    session_id: String,
    recommendations: Vec<Recommendation>,
    status: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
struct AppState {
    crew: Arc<MediaCrew>,
}

async fn health_check() -> &'static str {
    "OK"
}

async fn recommend(
    Query(params): Query<RecommendParams>,
    State(state): State<AppState>,
) -> Result<Json<RecommendResponse>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = Uuid::new_v4().to_string();
    info!(
        "Received recommendation request ({}): {}",
        session_id, params.query
    );

    let request = RecommendationRequest {
        user_request: params.query,
        media_type: params.media_type,
        genre: params.genre,
        mood: params.mood,
        timeframe: params.timeframe,
        num_recommendations: params.num_recommendations,
        personalization_context: None,
    };

    match state.crew.run(request).await {
        Ok(recommendations) => Ok(Json(RecommendResponse {
            session_id,
            recommendations,
            status: "completed".to_string(),
        })),
        Err(e) => {
            error!("Invalid request: {}", e);
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .compact()
        .init();

    info!("Starting media recommendation service");

    let config = ServiceConfig::from_env();
    let crew = Arc::new(MediaCrew::new(config)?);

    let state = AppState { crew };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/recommend", post(recommend))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server running on http://0.0.0.0:3000");
    info!("Available endpoints:");
    info!("  GET  /health     - Health check");
    info!("  POST /recommend  - Generate media recommendations");
    info!("    Example: POST /recommend?query=comedy%20movies&media_type=movie");

    axum::serve(listener, app).await?;

    Ok(())
}
