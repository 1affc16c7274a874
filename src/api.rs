use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{GameError, InvalidTransition};
use crate::game::GuessInput;
use crate::location::KNOWN_MAPS;
use crate::session;
use crate::source::CollaboratorError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/maps", get(list_maps))
        .route("/games", post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/guess", post(submit_guess))
        .route("/games/{id}/next", post(next_round))
        .route("/games/{id}/restart", post(restart_game))
        .route("/images/{map}/{file}", get(get_image))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError(GameError);

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        ApiError(e)
    }
}

impl From<CollaboratorError> for ApiError {
    fn from(e: CollaboratorError) -> Self {
        ApiError(GameError::Collaborator(e))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            GameError::InvalidRoundCount { .. }
            | GameError::InvalidTransition(InvalidTransition::InvalidGuess(_)) => {
                StatusCode::BAD_REQUEST
            }
            GameError::UnknownGame => StatusCode::NOT_FOUND,
            GameError::InvalidTransition(_) | GameError::Busy | GameError::StaleGeneration => {
                StatusCode::CONFLICT
            }
            GameError::InsufficientLocations { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GameError::Collaborator(CollaboratorError::NotFound(_)) => StatusCode::NOT_FOUND,
            GameError::Collaborator(CollaboratorError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            GameError::Collaborator(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn list_maps() -> impl IntoResponse {
    Json(KNOWN_MAPS)
}

#[derive(Deserialize)]
struct CreateGameRequest {
    map: String,
    rounds: Option<u32>,
}

async fn create_game(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = session::create_game(&state, &req.map, req.rounds).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(session::game_view(&state, id).await?))
}

async fn submit_guess(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(guess): Json<GuessInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(session::submit_guess(&state, id, guess).await?))
}

async fn next_round(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(session::advance_round(&state, id).await?))
}

async fn restart_game(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(session::restart(&state, id).await?))
}

async fn get_image(
    State(state): State<AppState>,
    Path((map, file)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let fetcher = {
        let s = state.lock().await;
        if let Some(data) = s.cached_image(&map, &file) {
            return Ok(([(header::CONTENT_TYPE, content_type(&file))], data));
        }
        s.fetcher.clone()
    };

    let fetcher =
        fetcher.ok_or_else(|| CollaboratorError::NotFound(format!("image {map}/{file}")))?;
    let data = fetcher.fetch_image(&map, &file).await?;

    Ok(([(header::CONTENT_TYPE, content_type(&file))], data))
}

fn content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
