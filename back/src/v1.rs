use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use dew_api::v1::{FilterCriteria, NewTodo, Todo, TodoPatch};
use uuid::Uuid;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/todos", get(get_todos).post(add_todo).delete(clear_todos))
        .route("/todos/completed", delete(delete_completed_todos))
        .route(
            "/todos/:id",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
        .route("/todos/:id/toggle", post(toggle_todo))
        .route("/generation", get(get_generation))
}

async fn get_generation(State(state): State<Arc<AppState>>) -> Json<u64> {
    Json(state.store.lock().await.generation())
}

async fn get_todos(
    State(state): State<Arc<AppState>>,
    Query(criteria): Query<FilterCriteria>,
) -> Json<Vec<Todo>> {
    Json(state.store.lock().await.query(&criteria))
}

async fn get_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Todo>, StatusCode> {
    let store = state.store.lock().await;
    let todo = store.get(id).ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(todo.clone()))
}

async fn add_todo(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewTodo>,
) -> Result<(StatusCode, Json<Todo>), StatusCode> {
    let mut store = state.store.lock().await;
    let todo = store.add(new).ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;

    Ok((StatusCode::CREATED, Json(todo)))
}

async fn toggle_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Todo>, StatusCode> {
    let mut store = state.store.lock().await;
    let todo = store.toggle_complete(id).ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(todo))
}

async fn update_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TodoPatch>,
) -> Result<Json<Todo>, StatusCode> {
    let mut store = state.store.lock().await;
    let todo = store.update(id, patch).ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(todo))
}

async fn delete_todo(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> StatusCode {
    match state.store.lock().await.delete(id) {
        true => StatusCode::NO_CONTENT,
        false => StatusCode::NOT_FOUND,
    }
}

async fn delete_completed_todos(State(state): State<Arc<AppState>>) -> Json<usize> {
    Json(state.store.lock().await.delete_completed())
}

async fn clear_todos(State(state): State<Arc<AppState>>) -> StatusCode {
    state.store.lock().await.clear();
    StatusCode::NO_CONTENT
}
