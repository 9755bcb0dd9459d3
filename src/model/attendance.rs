use crate::error::ApiError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
pub enum CheckInMethod {
    QR,
    GPS,
}

/// Caller-supplied at check-in and static afterwards. Nothing in the system
/// derives Late or Absent from clock arithmetic.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

/// One attendance session for a user on a calendar day. The DB enforces
/// uniqueness on (user_id, date), so a concurrent double check-in loses at
/// the insert, not in process.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: u64,
    pub user_id: u64,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_in_method: CheckInMethod,
    pub check_in_location: Option<String>,
    pub check_out_location: Option<String>,
    pub working_hours: Option<f64>,
    pub status: AttendanceStatus,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Attendance {
    /// Close the session. Rejects a second checkout on the same record and
    /// stamps working hours from the elapsed span.
    pub fn check_out(&mut self, now: DateTime<Utc>, location: Option<String>) -> Result<(), ApiError> {
        if self.check_out_time.is_some() {
            return Err(ApiError::conflict("Already checked out"));
        }

        self.check_out_time = Some(now);
        self.check_out_location = location;
        self.working_hours = Some(round_hours(now - self.check_in_time));

        Ok(())
    }
}

/// Duration in hours, rounded to 2 decimals.
pub fn round_hours(span: chrono::Duration) -> f64 {
    let hours = span.num_seconds() as f64 / 3600.0;
    (hours * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(check_in: DateTime<Utc>) -> Attendance {
        Attendance {
            id: 1,
            user_id: 7,
            check_in_time: check_in,
            check_out_time: None,
            check_in_method: CheckInMethod::QR,
            check_in_location: Some("HQ".into()),
            check_out_location: None,
            working_hours: None,
            status: AttendanceStatus::Present,
            date: check_in.date_naive(),
            notes: None,
            created_at: check_in,
        }
    }

    #[test]
    fn check_out_computes_working_hours() {
        let check_in = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let check_out = Utc.with_ymd_and_hms(2024, 3, 1, 17, 30, 0).unwrap();

        let mut att = session(check_in);
        att.check_out(check_out, Some("HQ".into())).unwrap();

        assert_eq!(att.working_hours, Some(8.5));
        assert_eq!(att.check_out_time, Some(check_out));
        assert_eq!(att.check_out_location.as_deref(), Some("HQ"));
    }

    #[test]
    fn second_check_out_is_rejected() {
        let check_in = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut att = session(check_in);

        att.check_out(check_in + chrono::Duration::hours(8), None).unwrap();
        let again = att.check_out(check_in + chrono::Duration::hours(9), None);

        assert!(matches!(again, Err(ApiError::Conflict(_))));
        // first checkout untouched
        assert_eq!(att.working_hours, Some(8.0));
    }

    #[test]
    fn working_hours_round_to_two_decimals() {
        // 7h 47m = 7.7833... hours
        let span = chrono::Duration::minutes(7 * 60 + 47);
        assert_eq!(round_hours(span), 7.78);
    }

    #[test]
    fn status_is_not_rederived_at_checkout() {
        let check_in = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut att = session(check_in);
        att.status = AttendanceStatus::Late;

        att.check_out(check_in + chrono::Duration::hours(4), None).unwrap();

        assert_eq!(att.status, AttendanceStatus::Late);
    }
}
