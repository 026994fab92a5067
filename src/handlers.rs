use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{
        FromRequest, Multipart, Path, Query, Request, State, multipart::MultipartError,
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::db::TaskStore;
use crate::error::{ApiError, ApiResult, parse_task_id};
use crate::models::{NewTask, Task, TaskForm};
use crate::views::render_index;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
}

impl AppState {
    pub fn new(store: impl TaskStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub id: String,
}

/// Create-task body: an HTML form post (urlencoded or multipart) or JSON.
/// A request without a content type carries no fields.
pub struct TaskInput(pub TaskForm);

impl<S> FromRequest<S> for TaskInput
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase);

        let form = match content_type.as_deref() {
            None => TaskForm::default(),
            Some(ct) if ct.starts_with("application/json") => {
                let Json(form) = Json::<TaskForm>::from_request(req, state)
                    .await
                    .map_err(IntoResponse::into_response)?;
                form
            }
            Some(ct) if ct.starts_with("multipart/form-data") => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(IntoResponse::into_response)?;
                read_multipart(multipart)
                    .await
                    .map_err(IntoResponse::into_response)?
            }
            Some(_) => {
                let Form(form) = Form::<TaskForm>::from_request(req, state)
                    .await
                    .map_err(IntoResponse::into_response)?;
                form
            }
        };

        Ok(TaskInput(form))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<TaskForm, MultipartError> {
    let mut form = TaskForm::default();
    while let Some(field) = multipart.next_field().await? {
        let slot = match field.name() {
            Some("title") => &mut form.title,
            Some("description") => &mut form.description,
            Some("due_date") => &mut form.due_date,
            _ => continue,
        };
        *slot = field.text().await?;
    }
    Ok(form)
}

fn redirect_home() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

async fn load_tasks(state: &AppState) -> ApiResult<Vec<Task>> {
    state
        .store
        .get_tasks()
        .await
        .map_err(ApiError::store("Failed to load tasks"))
}

/// Re-renders the page with `message`, falling back to an empty list if the
/// tasks themselves cannot be loaded.
async fn error_page(state: &AppState, status: StatusCode, message: &str) -> Response {
    let tasks = match state.store.get_tasks().await {
        Ok(tasks) => tasks,
        Err(err) => {
            warn!(error = %err, "could not load tasks for error page");
            Vec::new()
        }
    };

    (status, Html(render_index(&tasks, Some(message)))).into_response()
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn index(State(state): State<AppState>) -> Response {
    match state.store.get_tasks().await {
        Ok(tasks) => Html(render_index(&tasks, None)).into_response(),
        Err(err) => {
            error!(error = %err, "listing tasks failed");
            error_page(&state, StatusCode::INTERNAL_SERVER_ERROR, "Database error").await
        }
    }
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    let tasks = load_tasks(&state).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_task_id(&id)?;
    let task = state
        .store
        .get_task(id)
        .await
        .map_err(ApiError::store("Failed to load task"))?;

    Ok(match task {
        Some(task) => Json(task).into_response(),
        None => Json(json!({ "message": "Task Not Found" })).into_response(),
    })
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_task_id(&id)?;
    let deleted = state
        .store
        .delete_task(id)
        .await
        .map_err(ApiError::store("Failed to delete task"))?;

    if deleted {
        info!(task_id = id, "task deleted");
    } else {
        debug!(task_id = id, "delete of unknown task");
    }
    Ok(redirect_home())
}

pub async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_task_id(&id)?;
    let matched = state
        .store
        .complete_task(id)
        .await
        .map_err(ApiError::store("Failed to complete task"))?;

    if matched {
        info!(task_id = id, "task completed");
    } else {
        debug!(task_id = id, "complete of unknown task");
    }
    Ok(redirect_home())
}

pub async fn create_task(
    State(state): State<AppState>,
    TaskInput(form): TaskInput,
) -> ApiResult<Response> {
    let task = match NewTask::try_from(form) {
        Ok(task) => task,
        Err(message) => return Ok(error_page(&state, StatusCode::BAD_REQUEST, message).await),
    };

    let id = state
        .store
        .create_task(&task)
        .await
        .map_err(ApiError::store("Failed to create task"))?;

    info!(task_id = id, "task created");
    Ok(redirect_home())
}

pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Response {
    let raw = query.id.trim();
    if raw.is_empty() {
        return redirect_home();
    }

    let Ok(id) = raw.parse::<i64>() else {
        return error_page(&state, StatusCode::BAD_REQUEST, "Invalid ID format").await;
    };

    match state.store.get_task(id).await {
        Ok(Some(task)) => Html(render_index(&[task], None)).into_response(),
        Ok(None) => error_page(&state, StatusCode::NOT_FOUND, "Task not found").await,
        Err(err) => {
            error!(error = %err, task_id = id, "search failed");
            error_page(&state, StatusCode::INTERNAL_SERVER_ERROR, "Database error").await
        }
    }
}
