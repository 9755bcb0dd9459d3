use crate::api::attendance::{AttendanceDto, CheckInReq, CheckOutReq};
use crate::api::dashboard::{ActivityItem, DailyAttendanceSummary, DashboardStats};
use crate::api::leave_request::{ApproveLeaveReq, CreateLeaveReq, LeaveDto};
use crate::api::task::{CreateTaskReq, TaskDto};
use crate::api::user::UserPatch;
use crate::auth::handlers::AuthResponse;
use crate::model::attendance::{AttendanceStatus, CheckInMethod};
use crate::model::leave_request::LeaveStatus;
use crate::model::role::Role;
use crate::model::task::{TaskPatch, TaskPriority, TaskStatus};
use crate::model::user::UserDto;
use crate::models::{LoginDto, RegisterDto};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Workforce Management API",
        version = "1.0.0",
        description = r#"
## Workforce Management System

This API powers a workforce-management system covering the day-to-day
operations of a small organization.

### 🔹 Key Features
- **Attendance**
  - Daily check-in / check-out with QR or GPS, per-day uniqueness
- **Task Tracking**
  - Assignment, progress percentage and status lifecycle
- **Leave Management**
  - Apply for leave, approve/reject requests, and view leave history
- **User Administration**
  - Account listing, updates, deactivation
- **Dashboard**
  - Aggregate counters, recent activity feed, attendance summary

### 🔐 Security
All endpoints outside `/auth` require **JWT Bearer authentication**.
Administrative operations are restricted to the **Admin** role.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::list_attendance,
        crate::api::attendance::my_attendance,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::get_attendance,

        crate::api::task::list_tasks,
        crate::api::task::get_task,
        crate::api::task::create_task,
        crate::api::task::update_task,
        crate::api::task::delete_task,

        crate::api::leave_request::list_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::delete_leave,

        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::dashboard::dashboard_stats,
        crate::api::dashboard::recent_activity,
        crate::api::dashboard::attendance_summary
    ),
    components(
        schemas(
            Role,
            UserDto,
            UserPatch,
            RegisterDto,
            LoginDto,
            AuthResponse,
            CheckInMethod,
            AttendanceStatus,
            AttendanceDto,
            CheckInReq,
            CheckOutReq,
            TaskStatus,
            TaskPriority,
            TaskDto,
            TaskPatch,
            CreateTaskReq,
            LeaveStatus,
            LeaveDto,
            CreateLeaveReq,
            ApproveLeaveReq,
            DashboardStats,
            ActivityItem,
            DailyAttendanceSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Tasks", description = "Task tracking APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Users", description = "User administration APIs"),
        (name = "Dashboard", description = "Aggregate dashboard APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
