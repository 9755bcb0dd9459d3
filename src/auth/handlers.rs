use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, is_unique_violation},
    model::{
        role::Role,
        user::{User, UserDto},
    },
    models::{Claims, LoginDto, RegisterDto, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::utils::email_cache;
use crate::utils::email_filter;

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserDto,
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.to_lowercase();

    // Cuckoo filter first: a miss is a definite "never seen".
    if !email_filter::might_exist(&email) {
        return true;
    }

    // Moka cache: fast positive for recently seen emails.
    if email_cache::is_taken(&email).await {
        return false;
    }

    // Database fallback.
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

async fn issue_tokens(
    user: &User,
    pool: &MySqlPool,
    config: &Config,
) -> Result<(String, String), ApiError> {
    let access_token = generate_access_token(
        user.id,
        user.email.clone(),
        user.role,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id,
        user.email.clone(),
        user.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, FROM_UNIXTIME(?))")
        .bind(user.id)
        .bind(&refresh_claims.jti)
        .bind(refresh_claims.exp as i64)
        .execute(pool)
        .await?;

    Ok((access_token, refresh_token))
}

/// Registration. Every self-registered account starts as an active Employee;
/// admins exist only by seeding or promotion.
pub async fn register(
    payload: web::Json<RegisterDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let full_name = payload.full_name.trim();

    if full_name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Full name, email and password must not be empty"));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Err(ApiError::conflict("Email already exists"));
    }

    let hashed = hash_password(&payload.password);
    let now: DateTime<Utc> = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (full_name, email, password_hash, role, phone_number, address,
             date_of_joining, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, TRUE, ?)
        "#,
    )
    .bind(full_name)
    .bind(&email)
    .bind(&hashed)
    .bind(Role::Employee)
    .bind(&payload.phone_number)
    .bind(&payload.address)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        // Availability check raced another registration; the unique key wins.
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Email already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;

    let user = User {
        id: result.last_insert_id(),
        full_name: full_name.to_string(),
        email,
        password_hash: hashed,
        role: Role::Employee,
        phone_number: payload.phone_number.clone(),
        address: payload.address.clone(),
        date_of_joining: now,
        is_active: true,
        created_at: now,
        updated_at: None,
        last_login_at: None,
    };

    let (access_token, refresh_token) = issue_tokens(&user, pool.get_ref(), &config).await?;

    info!(user_id = user.id, "User registered");

    Ok(HttpResponse::Created().json(AuthResponse {
        access_token,
        refresh_token,
        user: UserDto::from(&user),
    }))
}

#[instrument(
    name = "auth_login",
    skip(pool, config, payload),
    fields(email = %payload.email)
)]
pub async fn login(
    payload: web::Json<LoginDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password required"));
    }

    debug!("Fetching user from database");

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(payload.email.trim().to_lowercase())
        .fetch_optional(pool.get_ref())
        .await?;

    let user = match user {
        Some(u) => u,
        None => {
            info!("Invalid credentials: user not found");
            return Err(ApiError::unauthenticated("Invalid email or password"));
        }
    };

    if verify_password(&payload.password, &user.password_hash).is_err() {
        info!("Invalid credentials: password mismatch");
        return Err(ApiError::unauthenticated("Invalid email or password"));
    }

    if !user.is_active {
        info!(user_id = user.id, "Login rejected: account deactivated");
        return Err(ApiError::unauthenticated(
            "Account is deactivated. Please contact administrator.",
        ));
    }

    let (access_token, refresh_token) = issue_tokens(&user, pool.get_ref(), &config).await?;

    // Non-fatal; the login stands even if this write fails.
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token,
        refresh_token,
        user: UserDto::from(&user),
    }))
}

fn bearer_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let token = req
        .headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    verify_token(token, &config.jwt_secret).ok()
}

/// Refresh-token rotation: the presented token is revoked and a fresh pair is
/// issued, so a replayed refresh token dies at the revocation check.
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let claims = bearer_claims(&req, &config)
        .ok_or_else(|| ApiError::unauthenticated("Invalid token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::unauthenticated("Refresh token required"));
    }

    let record = sqlx::query_as::<_, (u64, u64, bool)>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let (record_id, user_id) = match record {
        Some((id, user_id, revoked)) if !revoked => (id, user_id),
        _ => return Err(ApiError::unauthenticated("Invalid token")),
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, FROM_UNIXTIME(?))")
        .bind(user_id)
        .bind(&new_claims.jti)
        .bind(new_claims.exp as i64)
        .execute(pool.get_ref())
        .await?;

    let access_token = generate_access_token(
        claims.user_id,
        claims.sub,
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    })))
}

/// Idempotent revocation: always 204, even for a token we never issued.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let claims = match bearer_claims(&req, &config) {
        Some(c) => c,
        None => return HttpResponse::NoContent().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    HttpResponse::NoContent().finish()
}
