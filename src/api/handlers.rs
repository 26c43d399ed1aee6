//! HTTP request handlers

use super::sse::{display_stream, turn_stream};
use super::types::{
    ChatRequest, ErrorResponse, HistoryResponse, MessageResponse, ProductsResponse, ProfileListResponse,
    ProfileResponse, ProfileUpdateRequest, ResetResponse,
};
use super::AppState;
use crate::carousel::CarouselSnapshot;
use crate::catalog::{CatalogError, IMAGE_ROUTE};
use crate::profile::ProfileError;
use crate::render::Artifact;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Conversation history
        .route("/history", get(get_history))
        .route("/reset", post(reset))
        // User profiles
        .route("/user-profile", get(get_user_profile).post(update_user_profile))
        .route("/user-profiles", get(list_user_profiles))
        // Catalog
        .route("/products", get(list_products))
        .route(
            &format!("{IMAGE_ROUTE}/:product_type/:product_id"),
            get(get_product_image),
        )
        // Turns
        .route("/api/chat", post(send_chat))
        // Display pane
        .route("/api/display", get(get_display))
        .route("/api/display/stream", get(stream_display))
        // Carousel controls
        .route("/api/carousel", get(get_carousel))
        .route("/api/carousel/:action", post(carousel_action))
        .route("/api/carousel/:action/:index", post(carousel_jump))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// History
// ============================================================

async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(state.session.history().into())
}

async fn reset(State(state): State<AppState>) -> Json<ResetResponse> {
    let history = state.session.reset().await;
    Json(ResetResponse {
        message: "Chat history reset successfully".to_string(),
        history: HistoryResponse::from(history).history,
    })
}

// ============================================================
// User profiles
// ============================================================

impl From<ProfileError> for AppError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::InvalidName(_) => AppError::BadRequest(e.to_string()),
            ProfileError::Io { .. } => AppError::Internal(e.to_string()),
        }
    }
}

async fn get_user_profile(State(state): State<AppState>) -> Result<Json<ProfileResponse>, AppError> {
    let content = state.profiles.load().await?;
    Ok(Json(ProfileResponse {
        profile_name: state.profiles.current().to_string(),
        content,
    }))
}

async fn list_user_profiles(State(state): State<AppState>) -> Result<Json<ProfileListResponse>, AppError> {
    let profiles = state.profiles.list().await?;
    Ok(Json(ProfileListResponse {
        profiles,
        current: state.profiles.current().to_string(),
    }))
}

async fn update_user_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.profiles.save(&req.content).await?;
    Ok(Json(MessageResponse {
        message: format!("User profile {} updated successfully", state.profiles.current()),
    }))
}

// ============================================================
// Catalog
// ============================================================

async fn list_products(State(state): State<AppState>) -> Json<ProductsResponse> {
    let products = state.session.refresh_catalog().await;
    Json(ProductsResponse {
        products,
        product_type: state.session.product_type().to_string(),
    })
}

async fn get_product_image(
    State(state): State<AppState>,
    Path((product_type, product_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let bytes = state
        .session
        .catalog()
        .image(&product_type, &product_id)
        .await
        .map_err(|e| match e {
            CatalogError::InvalidPathSegment(_) => AppError::BadRequest(e.to_string()),
            _ => AppError::Internal(e.to_string()),
        })?
        .ok_or_else(|| AppError::NotFound(format!("No image for product {product_id}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        bytes,
    )
        .into_response())
}

// ============================================================
// Turns
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let input = req.input.trim();
    if input.is_empty() {
        return Err(AppError::BadRequest("Input must not be empty".to_string()));
    }

    let turn = state.session.submit(input);
    tracing::info!(turn_id = %turn.id, "Turn started");
    Ok(turn_stream(turn).into_response())
}

// ============================================================
// Display pane
// ============================================================

async fn get_display(State(state): State<AppState>) -> Json<Artifact> {
    Json(state.session.display())
}

async fn stream_display(State(state): State<AppState>) -> impl IntoResponse {
    display_stream(state.session)
}

// ============================================================
// Carousel
// ============================================================

async fn get_carousel(State(state): State<AppState>) -> Json<CarouselSnapshot> {
    Json(state.session.carousel().snapshot())
}

async fn carousel_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> Result<Json<CarouselSnapshot>, AppError> {
    let carousel = state.session.carousel();
    let snapshot = match action.as_str() {
        "next" => carousel.next().await,
        "prev" => carousel.prev().await,
        "pointer-enter" => carousel.pointer_enter().await,
        "pointer-leave" => carousel.pointer_leave().await,
        other => return Err(AppError::BadRequest(format!("Unknown carousel action: {other}"))),
    };
    Ok(Json(snapshot))
}

async fn carousel_jump(
    State(state): State<AppState>,
    Path((action, index)): Path<(String, usize)>,
) -> Result<Json<CarouselSnapshot>, AppError> {
    if action != "jump" {
        return Err(AppError::BadRequest(format!("Unknown carousel action: {action}")));
    }
    Ok(Json(state.session.carousel().jump_to(index).await))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("genui-assistant ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
