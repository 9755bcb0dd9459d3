use crate::auth::policy::{TaskField, can_mutate_task};
use crate::error::ApiError;
use crate::model::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// No transition order is enforced between these. An authorized actor may
/// move a task from any status to any other, Completed back to Pending
/// included.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmployeeTask {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_user_id: u64,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub progress_percentage: u8,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub created_by_user_id: Option<u64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Field-wise update payload. Absent = unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TaskPatch {
    #[schema(example = "Prepare quarterly report")]
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = 7)]
    pub assigned_to_user_id: Option<u64>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[schema(example = 60, maximum = 100)]
    pub progress_percentage: Option<u8>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl EmployeeTask {
    /// Apply a patch on behalf of `actor`. Fields the actor may not touch are
    /// skipped silently; a patch carrying only disallowed fields still counts
    /// as an update. Setting status to Completed forces progress to 100 even
    /// when the same patch supplies a progress value, and stamps
    /// `completed_date` on the first transition in only.
    pub fn apply_patch(
        &mut self,
        role: Role,
        actor_id: u64,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if let Some(progress) = patch.progress_percentage {
            if progress > 100 {
                return Err(ApiError::validation("Progress must be between 0 and 100"));
            }
        }

        let assignee = self.assigned_to_user_id;
        let allowed = |field: TaskField| can_mutate_task(role, actor_id, assignee, field);

        if let Some(title) = &patch.title {
            if allowed(TaskField::Title) {
                self.title = title.clone();
            }
        }
        if let Some(description) = &patch.description {
            if allowed(TaskField::Description) {
                self.description = Some(description.clone());
            }
        }
        if let Some(assigned_to) = patch.assigned_to_user_id {
            if allowed(TaskField::AssignedTo) {
                self.assigned_to_user_id = assigned_to;
            }
        }
        if let Some(priority) = patch.priority {
            if allowed(TaskField::Priority) {
                self.priority = priority;
            }
        }
        if let Some(due_date) = patch.due_date {
            if allowed(TaskField::DueDate) {
                self.due_date = Some(due_date);
            }
        }
        if let Some(progress) = patch.progress_percentage {
            if allowed(TaskField::Progress) {
                self.progress_percentage = progress;
            }
        }
        if let Some(notes) = &patch.notes {
            if allowed(TaskField::Notes) {
                self.notes = Some(notes.clone());
            }
        }
        if let Some(status) = patch.status {
            if allowed(TaskField::Status) {
                let was_completed = self.status == TaskStatus::Completed;
                self.status = status;
                if status == TaskStatus::Completed {
                    self.progress_percentage = 100;
                    if !was_completed {
                        self.completed_date = Some(now);
                    }
                }
            }
        }

        self.updated_at = Some(now);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(assignee: u64) -> EmployeeTask {
        EmployeeTask {
            id: 1,
            title: "Initial title".into(),
            description: None,
            assigned_to_user_id: assignee,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            progress_percentage: 0,
            start_date: None,
            due_date: None,
            completed_date: None,
            created_by_user_id: Some(1),
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, h, 0, 0).unwrap()
    }

    #[test]
    fn completing_forces_progress_and_stamps_date() {
        let mut t = task(7);
        t.progress_percentage = 40;

        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        t.apply_patch(Role::Employee, 7, &patch, at(10)).unwrap();

        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(t.progress_percentage, 100);
        assert_eq!(t.completed_date, Some(at(10)));
    }

    #[test]
    fn forced_progress_wins_over_supplied_value() {
        let mut t = task(7);

        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            progress_percentage: Some(50),
            ..Default::default()
        };
        t.apply_patch(Role::Admin, 1, &patch, at(10)).unwrap();

        assert_eq!(t.progress_percentage, 100);
    }

    #[test]
    fn reasserting_completed_keeps_original_date() {
        let mut t = task(7);

        let complete = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        t.apply_patch(Role::Admin, 1, &complete, at(10)).unwrap();
        t.apply_patch(Role::Admin, 1, &complete, at(12)).unwrap();

        assert_eq!(t.completed_date, Some(at(10)));
    }

    #[test]
    fn completed_back_to_pending_is_allowed() {
        let mut t = task(7);
        t.status = TaskStatus::Completed;
        t.completed_date = Some(at(9));

        let patch = TaskPatch {
            status: Some(TaskStatus::Pending),
            ..Default::default()
        };
        t.apply_patch(Role::Admin, 1, &patch, at(11)).unwrap();

        assert_eq!(t.status, TaskStatus::Pending);
    }

    #[test]
    fn assignee_cannot_touch_admin_fields() {
        let mut t = task(7);

        let patch = TaskPatch {
            title: Some("Hijacked".into()),
            assigned_to_user_id: Some(99),
            progress_percentage: Some(30),
            ..Default::default()
        };
        t.apply_patch(Role::Employee, 7, &patch, at(10)).unwrap();

        assert_eq!(t.title, "Initial title");
        assert_eq!(t.assigned_to_user_id, 7);
        assert_eq!(t.progress_percentage, 30);
        assert_eq!(t.updated_at, Some(at(10)));
    }

    #[test]
    fn out_of_range_progress_is_rejected() {
        let mut t = task(7);

        let patch = TaskPatch {
            progress_percentage: Some(101),
            ..Default::default()
        };
        let result = t.apply_patch(Role::Admin, 1, &patch, at(10));

        assert!(matches!(result, Err(ApiError::Validation(_))));
        assert_eq!(t.progress_percentage, 0);
    }
}
