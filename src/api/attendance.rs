use crate::auth::auth::AuthUser;
use crate::auth::policy::can_view;
use crate::error::{ApiError, is_unique_violation};
use crate::model::attendance::{Attendance, AttendanceStatus, CheckInMethod};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "user_id": 7,
    "user_name": "John Doe",
    "check_in_time": "2024-03-01T09:00:00Z",
    "check_out_time": "2024-03-01T17:30:00Z",
    "check_in_method": "QR",
    "check_in_location": "HQ lobby",
    "check_out_location": "HQ lobby",
    "working_hours": 8.5,
    "status": "Present",
    "date": "2024-03-01",
    "notes": null
}))]
pub struct AttendanceDto {
    pub id: u64,
    pub user_id: u64,
    pub user_name: String,
    #[schema(value_type = String, format = "date-time")]
    pub check_in_time: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_in_method: CheckInMethod,
    pub check_in_location: Option<String>,
    pub check_out_location: Option<String>,
    pub working_hours: Option<f64>,
    pub status: AttendanceStatus,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckInReq {
    #[schema(example = "QR")]
    pub method: CheckInMethod,
    #[schema(example = "HQ lobby", nullable = true)]
    pub location: Option<String>,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    /// Defaults to Present; never recomputed afterwards.
    pub status: Option<AttendanceStatus>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckOutReq {
    #[schema(example = 1)]
    pub attendance_id: u64,
    #[schema(example = "HQ lobby", nullable = true)]
    pub location: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct AttendanceListQuery {
    /// Limit to a single calendar day
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
pub struct MyAttendanceQuery {
    /// Earliest day to include
    pub start_date: Option<NaiveDate>,
    /// Latest day to include
    pub end_date: Option<NaiveDate>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

const DTO_SELECT: &str = r#"
    SELECT a.id, a.user_id, u.full_name AS user_name, a.check_in_time, a.check_out_time,
           a.check_in_method, a.check_in_location, a.check_out_location, a.working_hours,
           a.status, a.date, a.notes
    FROM attendance a
    JOIN users u ON u.id = a.user_id
"#;

async fn fetch_dto(pool: &MySqlPool, id: u64) -> Result<Option<AttendanceDto>, ApiError> {
    let sql = format!("{DTO_SELECT} WHERE a.id = ?");
    let dto = sqlx::query_as::<_, AttendanceDto>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(dto)
}

/// List every attendance record, optionally for one day
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceListQuery),
    responses(
        (status = 200, description = "Attendance records, newest check-in first", body = [AttendanceDto]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceListQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(date) = query.date {
        where_sql.push_str(" AND a.date = ?");
        args.push(FilterValue::Date(date));
    }

    let sql = format!("{DTO_SELECT}{where_sql} ORDER BY a.check_in_time DESC");

    let mut q = sqlx::query_as::<_, AttendanceDto>(&sql);
    for arg in &args {
        q = match arg {
            FilterValue::U64(v) => q.bind(*v),
            FilterValue::Date(d) => q.bind(*d),
        };
    }

    let records = q.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(records))
}

/// The caller's own attendance history, optionally bounded by a date range
#[utoipa::path(
    get,
    path = "/api/attendance/my-attendance",
    params(MyAttendanceQuery),
    responses(
        (status = 200, description = "Own attendance records, newest day first", body = [AttendanceDto]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MyAttendanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut where_sql = String::from(" WHERE a.user_id = ?");
    let mut args: Vec<FilterValue> = vec![FilterValue::U64(auth.user_id)];

    if let Some(start) = query.start_date {
        where_sql.push_str(" AND a.date >= ?");
        args.push(FilterValue::Date(start));
    }

    if let Some(end) = query.end_date {
        where_sql.push_str(" AND a.date <= ?");
        args.push(FilterValue::Date(end));
    }

    let sql = format!("{DTO_SELECT}{where_sql} ORDER BY a.date DESC");

    let mut q = sqlx::query_as::<_, AttendanceDto>(&sql);
    for arg in &args {
        q = match arg {
            FilterValue::U64(v) => q.bind(*v),
            FilterValue::Date(d) => q.bind(*d),
        };
    }

    let records = q.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(records))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInReq,
    responses(
        (status = 200, description = "Checked in successfully", body = AttendanceDto),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CheckInReq>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let today = now.date_naive();
    let status = payload.status.unwrap_or(AttendanceStatus::Present);

    let result = sqlx::query(
        r#"
        INSERT INTO attendance
            (user_id, check_in_time, check_in_method, check_in_location, status, date, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(now)
    .bind(payload.method)
    .bind(&payload.location)
    .bind(status)
    .bind(today)
    .bind(&payload.notes)
    .bind(now)
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        // The unique key on (user_id, date) catches concurrent double check-ins.
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Already checked in today"));
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = auth.user_id, "Check-in failed");
            return Err(e.into());
        }
    };

    let dto = fetch_dto(pool.get_ref(), result.last_insert_id())
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Ok().json(dto))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = CheckOutReq,
    responses(
        (status = 200, description = "Checked out successfully", body = AttendanceDto),
        (status = 404, description = "Attendance record not found", body = Object, example = json!({
            "message": "Attendance record not found"
        })),
        (status = 409, description = "Already checked out", body = Object, example = json!({
            "message": "Already checked out"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CheckOutReq>,
) -> Result<HttpResponse, ApiError> {
    let mut attendance =
        sqlx::query_as::<_, Attendance>("SELECT * FROM attendance WHERE id = ? AND user_id = ?")
            .bind(payload.attendance_id)
            .bind(auth.user_id)
            .fetch_optional(pool.get_ref())
            .await?
            .ok_or_else(|| ApiError::not_found("Attendance record not found"))?;

    attendance.check_out(Utc::now(), payload.location.clone())?;

    sqlx::query(
        "UPDATE attendance SET check_out_time = ?, check_out_location = ?, working_hours = ? WHERE id = ?",
    )
    .bind(attendance.check_out_time)
    .bind(&attendance.check_out_location)
    .bind(attendance.working_hours)
    .bind(attendance.id)
    .execute(pool.get_ref())
    .await?;

    let dto = fetch_dto(pool.get_ref(), attendance.id)
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Ok().json(dto))
}

/// Fetch one attendance record (owner or admin)
#[utoipa::path(
    get,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record ID")
    ),
    responses(
        (status = 200, description = "Attendance record found", body = AttendanceDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let dto = fetch_dto(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attendance record not found"))?;

    if !can_view(auth.role, auth.user_id, dto.user_id) {
        return Err(ApiError::forbidden("Not allowed to view this record"));
    }

    Ok(HttpResponse::Ok().json(dto))
}
