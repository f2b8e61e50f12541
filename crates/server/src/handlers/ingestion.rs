//! `/api/ingestion/*` handlers (§6.1): repository registration, listing,
//! lookup, deletion, and indexed-repository stats.

use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use common::RepositoryId;
use core::Repository;
use error::CodeqaError;
use store::Store;

use crate::api_error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRepositoryRequest {
    #[serde(default)]
    pub id: Option<RepositoryId>,
    #[serde(default)]
    pub name: Option<String>,
    pub path: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RepositoryStats {
    pub repository_id: RepositoryId,
    pub chunk_count: usize,
    pub languages: Vec<String>,
    pub indexed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// `GET /api/ingestion/repositories`.
pub async fn list_repositories(State(state): State<AppState>) -> Result<Json<Vec<Repository>>, ApiError> {
    let repositories = state.store.list_repositories().await?;
    Ok(Json(repositories))
}

/// `GET /api/ingestion/repositories/{id}`.
pub async fn get_repository(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
) -> Result<Json<Repository>, ApiError> {
    let repository = state
        .store
        .read_repository(&id)
        .await?
        .ok_or_else(|| CodeqaError::not_found(format!("repository {id}")))?;
    Ok(Json(repository))
}

/// `POST /api/ingestion/repositories`: chunks `path`, embeds the chunks,
/// stores them, and registers the repository (C3 → C4 → store, §4.3/§4.4).
pub async fn create_repository(
    State(state): State<AppState>,
    Json(req): Json<CreateRepositoryRequest>,
) -> Result<(StatusCode, Json<Repository>), ApiError> {
    if req.path.trim().is_empty() {
        return Err(CodeqaError::validation("path must not be empty").into());
    }

    let name = req
        .name
        .unwrap_or_else(|| PathBuf::from(&req.path).file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| req.path.clone()));

    let mut repository = Repository::new(name, req.path.clone());
    if let Some(id) = req.id {
        repository.id = id;
    }
    repository.description = req.description;

    let (mut chunks, summary) =
        index::chunk_repository_path(&repository.id, PathBuf::from(&req.path), &state.config.chunking).await;
    state.embedding.embed_chunks(&mut chunks).await?;
    state.store.bulk_upsert_chunks(chunks).await?;

    repository.mark_indexed(summary.chunks_produced, summary.languages);
    state.store.upsert_repository(repository.clone()).await?;

    Ok((StatusCode::CREATED, Json(repository)))
}

/// `DELETE /api/ingestion/repositories/{id}`.
pub async fn delete_repository(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_chunks_by_repository(&id).await?;
    state.store.delete_repository(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/ingestion/repositories/{id}/stats`.
pub async fn repository_stats(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
) -> Result<Json<RepositoryStats>, ApiError> {
    let repository = state
        .store
        .read_repository(&id)
        .await?
        .ok_or_else(|| CodeqaError::not_found(format!("repository {id}")))?;

    Ok(Json(RepositoryStats {
        repository_id: repository.id,
        chunk_count: repository.chunk_count,
        languages: repository.languages,
        indexed_at: repository.indexed_at,
    }))
}
