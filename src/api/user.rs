use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::model::user::{User, UserDto};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

/// Field-wise account update. Absent = unchanged.
#[derive(Deserialize, ToSchema)]
pub struct UserPatch {
    #[schema(example = "John Doe")]
    pub full_name: Option<String>,
    #[schema(example = "+8801712345678", nullable = true)]
    pub phone_number: Option<String>,
    #[schema(example = "Dhaka", nullable = true)]
    pub address: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, IntoParams)]
pub struct UserListQuery {
    /// Filter by role
    pub role: Option<Role>,
    /// Filter by active flag
    pub is_active: Option<bool>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    Role(Role),
    Bool(bool),
}

/// List accounts (admin only)
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Accounts ordered by name", body = [UserDto]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(role) = query.role {
        where_sql.push_str(" AND role = ?");
        args.push(FilterValue::Role(role));
    }

    if let Some(is_active) = query.is_active {
        where_sql.push_str(" AND is_active = ?");
        args.push(FilterValue::Bool(is_active));
    }

    let sql = format!(
        "SELECT id, full_name, email, role, phone_number, address, date_of_joining, is_active \
         FROM users{where_sql} ORDER BY full_name"
    );

    let mut q = sqlx::query_as::<_, UserDto>(&sql);
    for arg in &args {
        q = match arg {
            FilterValue::Role(r) => q.bind(*r),
            FilterValue::Bool(b) => q.bind(*b),
        };
    }

    let users = q.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(users))
}

/// Fetch one account (admin only)
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Account found", body = UserDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let user = fetch_user(pool.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(UserDto::from(&user)))
}

/// Update an account (admin only)
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = u64, Path, description = "User ID")
    ),
    request_body = UserPatch,
    responses(
        (status = 200, description = "Account updated", body = UserDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UserPatch>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let mut user = fetch_user(pool.get_ref(), path.into_inner()).await?;

    if let Some(full_name) = &payload.full_name {
        user.full_name = full_name.clone();
    }
    if let Some(phone_number) = &payload.phone_number {
        user.phone_number = Some(phone_number.clone());
    }
    if let Some(address) = &payload.address {
        user.address = Some(address.clone());
    }
    if let Some(role) = payload.role {
        user.role = role;
    }
    if let Some(is_active) = payload.is_active {
        user.is_active = is_active;
    }
    user.updated_at = Some(Utc::now());

    sqlx::query(
        r#"
        UPDATE users
        SET full_name = ?, phone_number = ?, address = ?, role = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.full_name)
    .bind(&user.phone_number)
    .bind(&user.address)
    .bind(user.role)
    .bind(user.is_active)
    .bind(user.updated_at)
    .bind(user.id)
    .execute(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(UserDto::from(&user)))
}

/// Delete an account (admin only). The seeded admin is protected
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Cannot delete default admin user", body = Object, example = json!({
            "message": "Cannot delete default admin user"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let user = fetch_user(pool.get_ref(), path.into_inner()).await?;

    if user.is_default_admin() {
        return Err(ApiError::validation("Cannot delete default admin user"));
    }

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user.id)
        .execute(pool.get_ref())
        .await?;

    crate::utils::email_filter::remove(&user.email);

    Ok(HttpResponse::NoContent().finish())
}

async fn fetch_user(pool: &MySqlPool, id: u64) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}
