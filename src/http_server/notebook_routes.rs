//! # Notebook Routes
//!
//! Notebook and cell CRUD, all behind a bearer token. Cell execution
//! routes the cell's query through the interpreter with the caller's
//! context and records the envelope on the cell.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::interpreter::ResultEnvelope;
use crate::notebook::{Cell, Notebook, NotebookError};

use super::errors::ApiResult;
use super::server::{require_user, AppState};

/// Body for notebook create/rename
#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

/// Body for cell create/update
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

pub async fn list_notebooks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Notebook>>> {
    let ctx = require_user(&state, &headers)?;
    let owner = ctx.user_id.ok_or(NotebookError::NotOwner)?;
    Ok(Json(state.notebooks.list_for_owner(owner)?))
}

pub async fn create_notebook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<TitleRequest>,
) -> ApiResult<(StatusCode, Json<Notebook>)> {
    let ctx = require_user(&state, &headers)?;
    let owner = ctx.user_id.ok_or(NotebookError::NotOwner)?;
    let notebook = state.notebooks.create(owner, &body.title)?;
    Ok((StatusCode::CREATED, Json(notebook)))
}

pub async fn get_notebook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Notebook>> {
    let ctx = require_user(&state, &headers)?;
    let owner = ctx.user_id.ok_or(NotebookError::NotOwner)?;
    Ok(Json(state.notebooks.get(id, owner)?))
}

pub async fn rename_notebook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<TitleRequest>,
) -> ApiResult<Json<Notebook>> {
    let ctx = require_user(&state, &headers)?;
    let owner = ctx.user_id.ok_or(NotebookError::NotOwner)?;
    Ok(Json(state.notebooks.rename(id, owner, &body.title)?))
}

pub async fn delete_notebook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let ctx = require_user(&state, &headers)?;
    let owner = ctx.user_id.ok_or(NotebookError::NotOwner)?;
    state.notebooks.delete(id, owner)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_cell(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<QueryRequest>,
) -> ApiResult<(StatusCode, Json<Cell>)> {
    let ctx = require_user(&state, &headers)?;
    let owner = ctx.user_id.ok_or(NotebookError::NotOwner)?;
    let cell = state.notebooks.add_cell(id, owner, &body.query)?;
    Ok((StatusCode::CREATED, Json(cell)))
}

pub async fn update_cell(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, cell_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<QueryRequest>,
) -> ApiResult<Json<Cell>> {
    let ctx = require_user(&state, &headers)?;
    let owner = ctx.user_id.ok_or(NotebookError::NotOwner)?;
    Ok(Json(state.notebooks.update_cell(id, owner, cell_id, &body.query)?))
}

pub async fn remove_cell(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, cell_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let ctx = require_user(&state, &headers)?;
    let owner = ctx.user_id.ok_or(NotebookError::NotOwner)?;
    state.notebooks.remove_cell(id, owner, cell_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run a cell's query through the interpreter and record the envelope
pub async fn execute_cell(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, cell_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ResultEnvelope>> {
    let ctx = require_user(&state, &headers)?;
    let owner = ctx.user_id.ok_or(NotebookError::NotOwner)?;

    let notebook = state.notebooks.get(id, owner)?;
    let cell = notebook
        .cells
        .iter()
        .find(|c| c.id == cell_id)
        .ok_or(NotebookError::CellNotFound)?;

    let envelope = state.interpreter.interpret(&cell.query, &ctx);
    state
        .notebooks
        .record_result(id, owner, cell_id, envelope.clone())?;
    Ok(Json(envelope))
}
