use crate::model::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account row. Dependent records (attendance, tasks, leave) reference it by
/// foreign key and are looked up per query; the entity itself carries no
/// navigation collections.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub date_of_joining: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Public shape of a user, returned by every endpoint that exposes accounts.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "full_name": "John Doe",
        "email": "john.doe@company.com",
        "role": "Employee",
        "phone_number": "+8801712345678",
        "address": "Dhaka",
        "date_of_joining": "2024-01-01T00:00:00Z",
        "is_active": true
    })
)]
pub struct UserDto {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "John Doe")]
    pub full_name: String,
    #[schema(example = "john.doe@company.com", format = "email")]
    pub email: String,
    pub role: Role,
    #[schema(nullable = true)]
    pub phone_number: Option<String>,
    #[schema(nullable = true)]
    pub address: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub date_of_joining: DateTime<Utc>,
    pub is_active: bool,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        UserDto {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            role: user.role,
            phone_number: user.phone_number.clone(),
            address: user.address.clone(),
            date_of_joining: user.date_of_joining,
            is_active: user.is_active,
        }
    }
}

/// The seeded administrator account. It can be deactivated but never deleted.
pub const DEFAULT_ADMIN_ID: u64 = 1;

impl User {
    pub fn is_default_admin(&self) -> bool {
        self.role == Role::Admin && self.id == DEFAULT_ADMIN_ID
    }
}
