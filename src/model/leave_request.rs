use crate::error::ApiError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// Leave window [start_date, end_date], inclusive on both ends. Processed at
/// most once: Pending -> Approved or Rejected, then terminal.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_days: u32,
    pub reason: String,
    pub status: LeaveStatus,
    pub approved_by_user_id: Option<u64>,
    pub approved_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Inclusive day count of the leave window. Rejects end < start.
pub fn leave_days(start_date: NaiveDate, end_date: NaiveDate) -> Result<u32, ApiError> {
    if end_date < start_date {
        return Err(ApiError::validation("End date must be after start date"));
    }
    Ok(((end_date - start_date).num_days() + 1) as u32)
}

impl LeaveRequest {
    /// Approve or reject. The rejection reason is stored only on a rejection
    /// that supplies a non-empty string.
    pub fn decide(
        &mut self,
        approver_id: u64,
        approved: bool,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if self.status != LeaveStatus::Pending {
            return Err(ApiError::conflict("Leave request has already been processed"));
        }

        self.status = if approved {
            LeaveStatus::Approved
        } else {
            LeaveStatus::Rejected
        };
        self.approved_by_user_id = Some(approver_id);
        self.approved_date = Some(now);
        self.updated_at = Some(now);

        if !approved {
            if let Some(reason) = rejection_reason {
                if !reason.is_empty() {
                    self.rejection_reason = Some(reason.to_string());
                }
            }
        }

        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<(), ApiError> {
        if self.status != LeaveStatus::Pending {
            return Err(ApiError::conflict("Can only delete pending leave requests"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pending(start: NaiveDate, end: NaiveDate) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            user_id: 3,
            leave_type: "Sick".into(),
            start_date: start,
            end_date: end,
            number_of_days: leave_days(start, end).unwrap(),
            reason: "Flu".into(),
            status: LeaveStatus::Pending,
            approved_by_user_id: None,
            approved_date: None,
            rejection_reason: None,
            created_at: Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn day_count_is_inclusive() {
        assert_eq!(leave_days(date(2024, 4, 10), date(2024, 4, 12)).unwrap(), 3);
        assert_eq!(leave_days(date(2024, 4, 10), date(2024, 4, 10)).unwrap(), 1);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let result = leave_days(date(2024, 4, 12), date(2024, 4, 10));
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn approval_records_approver_and_timestamp() {
        let mut leave = pending(date(2024, 4, 10), date(2024, 4, 12));
        let now = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();

        leave.decide(1, true, None, now).unwrap();

        assert_eq!(leave.status, LeaveStatus::Approved);
        assert_eq!(leave.approved_by_user_id, Some(1));
        assert_eq!(leave.approved_date, Some(now));
        assert_eq!(leave.rejection_reason, None);
    }

    #[test]
    fn second_decision_is_rejected_and_changes_nothing() {
        let mut leave = pending(date(2024, 4, 10), date(2024, 4, 12));
        let now = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();

        leave.decide(1, true, None, now).unwrap();
        let again = leave.decide(2, false, Some("too late"), now + chrono::Duration::hours(1));

        assert!(matches!(again, Err(ApiError::Conflict(_))));
        assert_eq!(leave.status, LeaveStatus::Approved);
        assert_eq!(leave.approved_by_user_id, Some(1));
    }

    #[test]
    fn rejection_reason_stored_only_when_non_empty() {
        let now = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();

        let mut rejected = pending(date(2024, 4, 10), date(2024, 4, 12));
        rejected.decide(1, false, Some("Team is short-staffed"), now).unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Team is short-staffed"));

        let mut silent = pending(date(2024, 4, 10), date(2024, 4, 12));
        silent.decide(1, false, Some(""), now).unwrap();
        assert_eq!(silent.rejection_reason, None);

        let mut approved = pending(date(2024, 4, 10), date(2024, 4, 12));
        approved.decide(1, true, Some("ignored"), now).unwrap();
        assert_eq!(approved.rejection_reason, None);
    }

    #[test]
    fn only_pending_requests_are_deletable() {
        let mut leave = pending(date(2024, 4, 10), date(2024, 4, 12));
        assert!(leave.ensure_deletable().is_ok());

        let now = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        leave.decide(1, true, None, now).unwrap();
        assert!(matches!(leave.ensure_deletable(), Err(ApiError::Conflict(_))));
    }
}
