use crate::auth::auth::AuthUser;
use crate::auth::policy::{can_delete_leave, can_view};
use crate::error::ApiError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, leave_days};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "user_id": 3,
    "user_name": "John Doe",
    "leave_type": "Sick",
    "start_date": "2024-04-10",
    "end_date": "2024-04-12",
    "number_of_days": 3,
    "reason": "Flu",
    "status": "Pending",
    "approved_by_user_id": null,
    "approved_by_user_name": null,
    "approved_date": null,
    "rejection_reason": null,
    "created_at": "2024-04-01T09:00:00Z"
}))]
pub struct LeaveDto {
    pub id: u64,
    pub user_id: u64,
    pub user_name: String,
    #[schema(example = "Sick")]
    pub leave_type: String,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub number_of_days: u32,
    pub reason: String,
    pub status: LeaveStatus,
    pub approved_by_user_id: Option<u64>,
    pub approved_by_user_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub approved_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLeaveReq {
    /// Sick, Casual, Annual, Emergency
    #[schema(example = "Sick")]
    pub leave_type: String,
    #[schema(example = "2024-04-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-04-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Flu")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveLeaveReq {
    #[schema(example = 1)]
    pub leave_request_id: u64,
    #[schema(example = true)]
    pub is_approved: bool,
    #[schema(example = "Team is short-staffed", nullable = true)]
    pub rejection_reason: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct LeaveListQuery {
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Status(LeaveStatus),
}

const DTO_SELECT: &str = r#"
    SELECT l.id, l.user_id, u.full_name AS user_name, l.leave_type, l.start_date,
           l.end_date, l.number_of_days, l.reason, l.status, l.approved_by_user_id,
           approver.full_name AS approved_by_user_name, l.approved_date,
           l.rejection_reason, l.created_at
    FROM leave_requests l
    JOIN users u ON u.id = l.user_id
    LEFT JOIN users approver ON approver.id = l.approved_by_user_id
"#;

async fn fetch_dto(pool: &MySqlPool, id: u64) -> Result<Option<LeaveDto>, ApiError> {
    let sql = format!("{DTO_SELECT} WHERE l.id = ?");
    let dto = sqlx::query_as::<_, LeaveDto>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(dto)
}

/// List leave requests. Admins see every request, employees only their own
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveListQuery),
    responses(
        (status = 200, description = "Leave requests, newest first", body = [LeaveDto]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn list_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if !auth.is_admin() {
        where_sql.push_str(" AND l.user_id = ?");
        args.push(FilterValue::U64(auth.user_id));
    }

    if let Some(status) = query.status {
        where_sql.push_str(" AND l.status = ?");
        args.push(FilterValue::Status(status));
    }

    let sql = format!("{DTO_SELECT}{where_sql} ORDER BY l.created_at DESC");

    let mut q = sqlx::query_as::<_, LeaveDto>(&sql);
    for arg in &args {
        q = match arg {
            FilterValue::U64(v) => q.bind(*v),
            FilterValue::Status(s) => q.bind(*s),
        };
    }

    let requests = q.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(requests))
}

/// Fetch one leave request (owner or admin)
#[utoipa::path(
    get,
    path = "/api/leave/{id}",
    params(
        ("id" = u64, Path, description = "Leave request ID")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let dto = fetch_dto(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave request not found"))?;

    if !can_view(auth.role, auth.user_id, dto.user_id) {
        return Err(ApiError::forbidden("Not allowed to view this request"));
    }

    Ok(HttpResponse::Ok().json(dto))
}

/// Submit a leave request
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = CreateLeaveReq,
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveDto),
        (status = 400, description = "Invalid date range", body = Object, example = json!({
            "message": "End date must be after start date"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeaveReq>,
) -> Result<HttpResponse, ApiError> {
    let number_of_days = leave_days(payload.start_date, payload.end_date)?;
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (user_id, leave_type, start_date, end_date, number_of_days, reason, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(&payload.leave_type)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(number_of_days)
    .bind(&payload.reason)
    .bind(LeaveStatus::Pending)
    .bind(now)
    .execute(pool.get_ref())
    .await?;

    let dto = fetch_dto(pool.get_ref(), result.last_insert_id())
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Created().json(dto))
}

/// Approve or reject a pending leave request (admin only)
#[utoipa::path(
    post,
    path = "/api/leave/approve",
    request_body = ApproveLeaveReq,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request has already been processed", body = Object, example = json!({
            "message": "Leave request has already been processed"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ApproveLeaveReq>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let mut leave =
        sqlx::query_as::<_, LeaveRequest>("SELECT * FROM leave_requests WHERE id = ?")
            .bind(payload.leave_request_id)
            .fetch_optional(pool.get_ref())
            .await?
            .ok_or_else(|| ApiError::not_found("Leave request not found"))?;

    leave.decide(
        auth.user_id,
        payload.is_approved,
        payload.rejection_reason.as_deref(),
        Utc::now(),
    )?;

    sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, approved_by_user_id = ?, approved_date = ?,
            rejection_reason = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(leave.status)
    .bind(leave.approved_by_user_id)
    .bind(leave.approved_date)
    .bind(&leave.rejection_reason)
    .bind(leave.updated_at)
    .bind(leave.id)
    .execute(pool.get_ref())
    .await?;

    let dto = fetch_dto(pool.get_ref(), leave.id)
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Ok().json(dto))
}

/// Delete a pending leave request (owner or admin)
#[utoipa::path(
    delete,
    path = "/api/leave/{id}",
    params(
        ("id" = u64, Path, description = "Leave request ID")
    ),
    responses(
        (status = 204, description = "Leave request deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Can only delete pending leave requests", body = Object, example = json!({
            "message": "Can only delete pending leave requests"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let leave = sqlx::query_as::<_, LeaveRequest>("SELECT * FROM leave_requests WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Leave request not found"))?;

    if !can_delete_leave(auth.role, auth.user_id, leave.user_id) {
        return Err(ApiError::forbidden("Not allowed to delete this request"));
    }

    leave.ensure_deletable()?;

    sqlx::query("DELETE FROM leave_requests WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
