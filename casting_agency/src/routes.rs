//! HTTP handlers

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    model::{ActorPatch, MoviePatch, NewActor, NewMovie},
    repository::Repository,
};

mod permission {
    casting_axum::permission_guards! {
        pub permission ReadActors = "get:actors";
        pub permission CreateActor = "post:actor";
        pub permission UpdateActor = "patch:actor";
        pub permission DeleteActor = "delete:actor";
        pub permission ReadMovies = "get:movies";
        pub permission CreateMovie = "post:movie";
        pub permission UpdateMovie = "patch:movie";
        pub permission DeleteMovie = "delete:movie";
    }
}

use permission::*;

/// Shared handler state
#[derive(Clone, Debug)]
pub struct AppState {
    repository: Arc<dyn Repository>,
}

impl AppState {
    /// Wraps the repository handlers operate on
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/api/actors", get(list_actors).post(create_actor))
        .route(
            "/api/actors/:id",
            get(show_actor).patch(update_actor).delete(delete_actor),
        )
        .route("/api/movies", get(list_movies).post(create_movie))
        .route(
            "/api/movies/:id",
            get(show_movie).patch(update_movie).delete(delete_movie),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "Healthy" }))
}

async fn list_actors(_: ReadActors, State(state): State<AppState>) -> ApiResult {
    let actors = state.repository.actors().await?;
    Ok(Json(json!({ "success": true, "actors": actors })))
}

async fn show_actor(
    _: ReadActors,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult {
    let Path(id) = id?;
    let actor = state.repository.actor(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "success": true, "actor": actor })))
}

async fn create_actor(
    guard: CreateActor,
    State(state): State<AppState>,
    body: Result<Json<NewActor>, JsonRejection>,
) -> ApiResult {
    let Json(actor) = body?;
    actor.validate()?;

    let actor = state.repository.insert_actor(actor).await?;
    tracing::info!(
        actor.id = actor.id,
        requested_by = ?guard.claims().subject(),
        "actor created"
    );
    Ok(Json(json!({ "success": true, "actor": actor })))
}

async fn update_actor(
    _: UpdateActor,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<ActorPatch>, JsonRejection>,
) -> ApiResult {
    let Path(id) = id?;
    let Json(patch) = body?;
    patch.validate()?;

    let actor = state
        .repository
        .update_actor(id, patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(actor.id = actor.id, "actor updated");
    Ok(Json(json!({ "success": true, "actor": actor })))
}

async fn delete_actor(
    _: DeleteActor,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult {
    let Path(id) = id?;
    let actor = state
        .repository
        .delete_actor(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(actor.id = actor.id, "actor deleted");
    Ok(Json(json!({ "success": true, "delete": actor })))
}

async fn list_movies(_: ReadMovies, State(state): State<AppState>) -> ApiResult {
    let movies = state.repository.movies().await?;
    Ok(Json(json!({ "success": true, "movies": movies })))
}

async fn show_movie(
    _: ReadMovies,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult {
    let Path(id) = id?;
    let movie = state.repository.movie(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "success": true, "movie": movie })))
}

async fn create_movie(
    guard: CreateMovie,
    State(state): State<AppState>,
    body: Result<Json<NewMovie>, JsonRejection>,
) -> ApiResult {
    let Json(movie) = body?;
    movie.validate()?;

    let movie = state.repository.insert_movie(movie).await?;
    tracing::info!(
        movie.id = movie.id,
        requested_by = ?guard.claims().subject(),
        "movie created"
    );
    Ok(Json(json!({ "success": true, "movie": movie })))
}

async fn update_movie(
    _: UpdateMovie,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<MoviePatch>, JsonRejection>,
) -> ApiResult {
    let Path(id) = id?;
    let Json(patch) = body?;
    patch.validate()?;

    let movie = state
        .repository
        .update_movie(id, patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(movie.id = movie.id, "movie updated");
    Ok(Json(json!({ "success": true, "movie": movie })))
}

async fn delete_movie(
    _: DeleteMovie,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult {
    let Path(id) = id?;
    let movie = state
        .repository
        .delete_movie(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(movie.id = movie.id, "movie deleted");
    Ok(Json(json!({ "success": true, "deleted": movie })))
}
