use crate::model::role::Role;

/// Mutable fields of a task, for the field-level write check.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TaskField {
    Title,
    Description,
    AssignedTo,
    Status,
    Priority,
    Progress,
    DueDate,
    Notes,
}

/// Whether `actor` may read a record owned by `owner_id`. Admins see
/// everything; employees only their own rows. Callers resolve the record
/// first, so a missing id stays NotFound for every role.
pub fn can_view(role: Role, actor_id: u64, owner_id: u64) -> bool {
    match role {
        Role::Admin => true,
        Role::Employee => actor_id == owner_id,
    }
}

/// Field-level write check for tasks. The assignee may move status, progress
/// and notes; everything else is admin-only.
pub fn can_mutate_task(role: Role, actor_id: u64, assignee_id: u64, field: TaskField) -> bool {
    match role {
        Role::Admin => true,
        Role::Employee => {
            actor_id == assignee_id
                && matches!(field, TaskField::Status | TaskField::Progress | TaskField::Notes)
        }
    }
}

/// Leave requests are deletable by their owner or an admin (the pending-only
/// restriction is a workflow rule, checked separately).
pub fn can_delete_leave(role: Role, actor_id: u64, owner_id: u64) -> bool {
    match role {
        Role::Admin => true,
        Role::Employee => actor_id == owner_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_views_any_record() {
        assert!(can_view(Role::Admin, 1, 99));
    }

    #[test]
    fn employee_views_only_own_records() {
        assert!(can_view(Role::Employee, 7, 7));
        assert!(!can_view(Role::Employee, 7, 8));
    }

    #[test]
    fn admin_mutates_every_task_field() {
        for field in [
            TaskField::Title,
            TaskField::Description,
            TaskField::AssignedTo,
            TaskField::Status,
            TaskField::Priority,
            TaskField::Progress,
            TaskField::DueDate,
            TaskField::Notes,
        ] {
            assert!(can_mutate_task(Role::Admin, 1, 7, field));
        }
    }

    #[test]
    fn assignee_mutates_status_progress_notes_only() {
        assert!(can_mutate_task(Role::Employee, 7, 7, TaskField::Status));
        assert!(can_mutate_task(Role::Employee, 7, 7, TaskField::Progress));
        assert!(can_mutate_task(Role::Employee, 7, 7, TaskField::Notes));

        assert!(!can_mutate_task(Role::Employee, 7, 7, TaskField::Title));
        assert!(!can_mutate_task(Role::Employee, 7, 7, TaskField::AssignedTo));
        assert!(!can_mutate_task(Role::Employee, 7, 7, TaskField::Priority));
        assert!(!can_mutate_task(Role::Employee, 7, 7, TaskField::DueDate));
    }

    #[test]
    fn non_assignee_employee_mutates_nothing() {
        assert!(!can_mutate_task(Role::Employee, 8, 7, TaskField::Status));
        assert!(!can_mutate_task(Role::Employee, 8, 7, TaskField::Notes));
    }

    #[test]
    fn leave_deletion_is_owner_or_admin() {
        assert!(can_delete_leave(Role::Admin, 1, 3));
        assert!(can_delete_leave(Role::Employee, 3, 3));
        assert!(!can_delete_leave(Role::Employee, 4, 3));
    }
}
