use crate::auth::auth::AuthUser;
use crate::auth::policy::can_view;
use crate::error::ApiError;
use crate::model::task::{EmployeeTask, TaskPatch, TaskPriority, TaskStatus};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "title": "Prepare quarterly report",
    "description": "Q1 figures for the board",
    "assigned_to_user_id": 7,
    "assigned_to_user_name": "John Doe",
    "status": "InProgress",
    "priority": "High",
    "progress_percentage": 60,
    "start_date": "2024-03-01T00:00:00Z",
    "due_date": "2024-03-15T00:00:00Z",
    "completed_date": null,
    "notes": null,
    "created_at": "2024-02-28T10:00:00Z"
}))]
pub struct TaskDto {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_user_id: u64,
    pub assigned_to_user_name: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub progress_percentage: u8,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub start_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub due_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub completed_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTaskReq {
    #[schema(example = "Prepare quarterly report")]
    pub title: String,
    #[schema(nullable = true)]
    pub description: Option<String>,
    #[schema(example = 7)]
    pub assigned_to_user_id: u64,
    /// Defaults to Medium
    pub priority: Option<TaskPriority>,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub start_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, IntoParams)]
pub struct TaskListQuery {
    /// Filter by task status
    pub status: Option<TaskStatus>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Status(TaskStatus),
}

const DTO_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.assigned_to_user_id,
           u.full_name AS assigned_to_user_name, t.status, t.priority,
           t.progress_percentage, t.start_date, t.due_date, t.completed_date,
           t.notes, t.created_at
    FROM employee_tasks t
    JOIN users u ON u.id = t.assigned_to_user_id
"#;

async fn fetch_dto(pool: &MySqlPool, id: u64) -> Result<Option<TaskDto>, ApiError> {
    let sql = format!("{DTO_SELECT} WHERE t.id = ?");
    let dto = sqlx::query_as::<_, TaskDto>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(dto)
}

/// List tasks. Admins see every task, employees only their own assignments
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Tasks, newest first", body = [TaskDto]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tasks"
)]
pub async fn list_tasks(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if !auth.is_admin() {
        where_sql.push_str(" AND t.assigned_to_user_id = ?");
        args.push(FilterValue::U64(auth.user_id));
    }

    if let Some(status) = query.status {
        where_sql.push_str(" AND t.status = ?");
        args.push(FilterValue::Status(status));
    }

    let sql = format!("{DTO_SELECT}{where_sql} ORDER BY t.created_at DESC");

    let mut q = sqlx::query_as::<_, TaskDto>(&sql);
    for arg in &args {
        q = match arg {
            FilterValue::U64(v) => q.bind(*v),
            FilterValue::Status(s) => q.bind(*s),
        };
    }

    let tasks = q.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Fetch one task (admin or assignee)
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(
        ("id" = u64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task found", body = TaskDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Task not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tasks"
)]
pub async fn get_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let dto = fetch_dto(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    if !can_view(auth.role, auth.user_id, dto.assigned_to_user_id) {
        return Err(ApiError::forbidden("Not allowed to view this task"));
    }

    Ok(HttpResponse::Ok().json(dto))
}

/// Create a task (admin only)
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskReq,
    responses(
        (status = 201, description = "Task created", body = TaskDto),
        (status = 400, description = "Assigned user not found", body = Object, example = json!({
            "message": "Assigned user not found"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tasks"
)]
pub async fn create_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTaskReq>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let assignee_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(payload.assigned_to_user_id)
            .fetch_one(pool.get_ref())
            .await?;

    if !assignee_exists {
        return Err(ApiError::validation("Assigned user not found"));
    }

    let now = Utc::now();
    let priority = payload.priority.unwrap_or(TaskPriority::Medium);

    let result = sqlx::query(
        r#"
        INSERT INTO employee_tasks
            (title, description, assigned_to_user_id, status, priority,
             progress_percentage, start_date, due_date, created_by_user_id, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.assigned_to_user_id)
    .bind(TaskStatus::Pending)
    .bind(priority)
    .bind(payload.start_date)
    .bind(payload.due_date)
    .bind(auth.user_id)
    .bind(now)
    .execute(pool.get_ref())
    .await?;

    let dto = fetch_dto(pool.get_ref(), result.last_insert_id())
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Created().json(dto))
}

/// Update a task. Field-level permissions apply; disallowed fields in the
/// patch are ignored rather than rejected
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(
        ("id" = u64, Path, description = "Task ID")
    ),
    request_body = TaskPatch,
    responses(
        (status = 200, description = "Task updated", body = TaskDto),
        (status = 400, description = "Invalid patch"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Task not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tasks"
)]
pub async fn update_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<TaskPatch>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let mut task = sqlx::query_as::<_, EmployeeTask>("SELECT * FROM employee_tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    if !can_view(auth.role, auth.user_id, task.assigned_to_user_id) {
        return Err(ApiError::forbidden("Not allowed to update this task"));
    }

    task.apply_patch(auth.role, auth.user_id, &payload, Utc::now())?;

    sqlx::query(
        r#"
        UPDATE employee_tasks
        SET title = ?, description = ?, assigned_to_user_id = ?, status = ?,
            priority = ?, progress_percentage = ?, due_date = ?,
            completed_date = ?, notes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.assigned_to_user_id)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.progress_percentage)
    .bind(task.due_date)
    .bind(task.completed_date)
    .bind(&task.notes)
    .bind(task.updated_at)
    .bind(task.id)
    .execute(pool.get_ref())
    .await?;

    let dto = fetch_dto(pool.get_ref(), task.id)
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Ok().json(dto))
}

/// Delete a task (admin only, any status)
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(
        ("id" = u64, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Task not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Tasks"
)]
pub async fn delete_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM employee_tasks WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Task not found"));
    }

    Ok(HttpResponse::NoContent().finish())
}
