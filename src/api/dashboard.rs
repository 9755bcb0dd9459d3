use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::attendance::AttendanceStatus;
use crate::model::leave_request::LeaveStatus;
use crate::model::role::Role;
use crate::model::task::TaskStatus;
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
pub struct DashboardStats {
    #[schema(example = 10)]
    pub total_employees: i64,
    #[schema(example = 7)]
    pub present_today: i64,
    /// total_employees - present_today; an approximation, not an absence count.
    #[schema(example = 3)]
    pub absent_today: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
    pub pending_leaves: i64,
    pub approved_leaves: i64,
    pub rejected_leaves: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityItem {
    #[serde(rename = "type")]
    #[schema(example = "attendance")]
    pub activity_type: &'static str,
    #[schema(example = "John Doe")]
    pub user_name: String,
    #[schema(example = "Checked Out")]
    pub action: String,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    #[schema(example = "Present - 8.50 hours")]
    pub details: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailyAttendanceSummary {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub present: u32,
    pub late: u32,
    pub avg_working_hours: f64,
}

#[derive(Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// How many days back to aggregate (default 7)
    pub days: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct AttendanceActivityRow {
    user_name: String,
    check_in_time: DateTime<Utc>,
    check_out_time: Option<DateTime<Utc>>,
    working_hours: Option<f64>,
    status: AttendanceStatus,
}

#[derive(sqlx::FromRow)]
struct TaskActivityRow {
    user_name: String,
    title: String,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct LeaveActivityRow {
    user_name: String,
    leave_type: String,
    number_of_days: u32,
    status: LeaveStatus,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    date: NaiveDate,
    status: AttendanceStatus,
    working_hours: Option<f64>,
}

fn attendance_activity(row: AttendanceActivityRow) -> ActivityItem {
    let (action, timestamp) = match row.check_out_time {
        Some(t) => ("Checked Out", t),
        None => ("Checked In", row.check_in_time),
    };
    ActivityItem {
        activity_type: "attendance",
        user_name: row.user_name,
        action: action.to_string(),
        timestamp,
        details: format!("{} - {:.2} hours", row.status, row.working_hours.unwrap_or(0.0)),
    }
}

fn task_activity(row: TaskActivityRow) -> ActivityItem {
    ActivityItem {
        activity_type: "task",
        user_name: row.user_name,
        action: row.status.to_string(),
        timestamp: row.updated_at.unwrap_or(row.created_at),
        details: row.title,
    }
}

fn leave_activity(row: LeaveActivityRow) -> ActivityItem {
    ActivityItem {
        activity_type: "leave",
        user_name: row.user_name,
        action: row.status.to_string(),
        timestamp: row.created_at,
        details: format!("{} - {} days", row.leave_type, row.number_of_days),
    }
}

/// Merge the per-entity feeds into one, newest first, capped at 20 entries.
fn merge_recent(mut items: Vec<ActivityItem>) -> Vec<ActivityItem> {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(20);
    items
}

/// Group attendance rows by calendar day, ascending. Missing working hours
/// count as 0 in the mean.
fn summarize_by_day(rows: Vec<SummaryRow>) -> Vec<DailyAttendanceSummary> {
    let mut days: BTreeMap<NaiveDate, (u32, u32, f64)> = BTreeMap::new();

    for row in rows {
        let entry = days.entry(row.date).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if row.status == AttendanceStatus::Late {
            entry.1 += 1;
        }
        entry.2 += row.working_hours.unwrap_or(0.0);
    }

    days.into_iter()
        .map(|(date, (present, late, total_hours))| DailyAttendanceSummary {
            date,
            present,
            late,
            avg_working_hours: total_hours / present as f64,
        })
        .collect()
}

async fn count(pool: &MySqlPool, sql: &str) -> Result<i64, ApiError> {
    Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await?)
}

/// Aggregate counters for the admin landing page
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn dashboard_stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let pool = pool.get_ref();
    let today = Utc::now().date_naive();

    let total_employees = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE role = ? AND is_active = TRUE",
    )
    .bind(Role::Employee)
    .fetch_one(pool)
    .await?;

    let present_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendance WHERE date = ?",
    )
    .bind(today)
    .fetch_one(pool)
    .await?;

    let task_count = |status: TaskStatus| {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employee_tasks WHERE status = ?")
            .bind(status)
            .fetch_one(pool)
    };
    let leave_count = |status: LeaveStatus| {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_requests WHERE status = ?")
            .bind(status)
            .fetch_one(pool)
    };

    let stats = DashboardStats {
        total_employees,
        present_today,
        // Plain subtraction, as the dashboard has always shown it.
        absent_today: total_employees - present_today,
        pending_tasks: task_count(TaskStatus::Pending).await?,
        in_progress_tasks: task_count(TaskStatus::InProgress).await?,
        completed_tasks: task_count(TaskStatus::Completed).await?,
        pending_leaves: leave_count(LeaveStatus::Pending).await?,
        approved_leaves: leave_count(LeaveStatus::Approved).await?,
        rejected_leaves: leave_count(LeaveStatus::Rejected).await?,
    };

    Ok(HttpResponse::Ok().json(stats))
}

/// The 20 most recent events across attendance, tasks and leave
#[utoipa::path(
    get,
    path = "/api/dashboard/recent-activity",
    responses(
        (status = 200, description = "Merged activity feed, newest first", body = [ActivityItem]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn recent_activity(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let pool = pool.get_ref();

    let attendance = sqlx::query_as::<_, AttendanceActivityRow>(
        r#"
        SELECT u.full_name AS user_name, a.check_in_time, a.check_out_time,
               a.working_hours, a.status
        FROM attendance a
        JOIN users u ON u.id = a.user_id
        ORDER BY a.check_in_time DESC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await?;

    let tasks = sqlx::query_as::<_, TaskActivityRow>(
        r#"
        SELECT u.full_name AS user_name, t.title, t.status, t.created_at, t.updated_at
        FROM employee_tasks t
        JOIN users u ON u.id = t.assigned_to_user_id
        ORDER BY COALESCE(t.updated_at, t.created_at) DESC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await?;

    let leaves = sqlx::query_as::<_, LeaveActivityRow>(
        r#"
        SELECT u.full_name AS user_name, l.leave_type, l.number_of_days, l.status, l.created_at
        FROM leave_requests l
        JOIN users u ON u.id = l.user_id
        ORDER BY l.created_at DESC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await?;

    let items = attendance
        .into_iter()
        .map(attendance_activity)
        .chain(tasks.into_iter().map(task_activity))
        .chain(leaves.into_iter().map(leave_activity))
        .collect();

    Ok(HttpResponse::Ok().json(merge_recent(items)))
}

/// Per-day attendance counts over the trailing window
#[utoipa::path(
    get,
    path = "/api/dashboard/attendance-summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Daily summaries, oldest first", body = [DailyAttendanceSummary]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SummaryQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let days = query.days.unwrap_or(7);
    let start_date = Utc::now().date_naive() - chrono::Duration::days(days);

    let rows = sqlx::query_as::<_, SummaryRow>(
        "SELECT date, status, working_hours FROM attendance WHERE date >= ?",
    )
    .bind(start_date)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(summarize_by_day(rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, h, 0, 0).unwrap()
    }

    fn item(timestamp: DateTime<Utc>) -> ActivityItem {
        ActivityItem {
            activity_type: "task",
            user_name: "John Doe".into(),
            action: "Pending".into(),
            timestamp,
            details: "x".into(),
        }
    }

    #[test]
    fn merge_sorts_descending_and_caps_at_twenty() {
        let items: Vec<_> = (1..=25).map(|d| item(ts(d, 9))).collect();

        let merged = merge_recent(items);

        assert_eq!(merged.len(), 20);
        assert_eq!(merged[0].timestamp, ts(25, 9));
        assert!(merged.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn attendance_activity_prefers_checkout_timestamp() {
        let open = attendance_activity(AttendanceActivityRow {
            user_name: "John Doe".into(),
            check_in_time: ts(1, 9),
            check_out_time: None,
            working_hours: None,
            status: AttendanceStatus::Present,
        });
        assert_eq!(open.action, "Checked In");
        assert_eq!(open.timestamp, ts(1, 9));
        assert_eq!(open.details, "Present - 0.00 hours");

        let closed = attendance_activity(AttendanceActivityRow {
            user_name: "John Doe".into(),
            check_in_time: ts(1, 9),
            check_out_time: Some(ts(1, 17)),
            working_hours: Some(8.0),
            status: AttendanceStatus::Present,
        });
        assert_eq!(closed.action, "Checked Out");
        assert_eq!(closed.timestamp, ts(1, 17));
        assert_eq!(closed.details, "Present - 8.00 hours");
    }

    #[test]
    fn task_activity_falls_back_to_created_at() {
        let fresh = task_activity(TaskActivityRow {
            user_name: "John Doe".into(),
            title: "Report".into(),
            status: TaskStatus::InProgress,
            created_at: ts(2, 8),
            updated_at: None,
        });
        assert_eq!(fresh.timestamp, ts(2, 8));
        assert_eq!(fresh.action, "InProgress");
        assert_eq!(fresh.details, "Report");

        let touched = task_activity(TaskActivityRow {
            user_name: "John Doe".into(),
            title: "Report".into(),
            status: TaskStatus::Completed,
            created_at: ts(2, 8),
            updated_at: Some(ts(3, 12)),
        });
        assert_eq!(touched.timestamp, ts(3, 12));
    }

    #[test]
    fn leave_activity_details_carry_type_and_days() {
        let activity = leave_activity(LeaveActivityRow {
            user_name: "John Doe".into(),
            leave_type: "Sick".into(),
            number_of_days: 3,
            status: LeaveStatus::Pending,
            created_at: ts(4, 10),
        });
        assert_eq!(activity.details, "Sick - 3 days");
        assert_eq!(activity.action, "Pending");
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn summary_groups_by_day_ascending() {
        let rows = vec![
            SummaryRow { date: day(2), status: AttendanceStatus::Present, working_hours: Some(8.0) },
            SummaryRow { date: day(1), status: AttendanceStatus::Late, working_hours: Some(6.0) },
            SummaryRow { date: day(1), status: AttendanceStatus::Present, working_hours: None },
        ];

        let summary = summarize_by_day(rows);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].date, day(1));
        assert_eq!(summary[0].present, 2);
        assert_eq!(summary[0].late, 1);
        // null hours count as 0 in the mean
        assert_eq!(summary[0].avg_working_hours, 3.0);
        assert_eq!(summary[1].date, day(2));
        assert_eq!(summary[1].present, 1);
        assert_eq!(summary[1].late, 0);
        assert_eq!(summary[1].avg_working_hours, 8.0);
    }

    #[test]
    fn summary_of_no_rows_is_empty() {
        assert!(summarize_by_day(Vec::new()).is_empty());
    }
}
