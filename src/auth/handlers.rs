use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{debug, error, info, instrument, warn};

use crate::auth::jwt::{
    Claims, Subject, TokenType, generate_access_token, generate_refresh_token, verify_token,
};
use crate::auth::password::verify_password;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::role::Role;
use crate::store::users;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Unauthorized(msg.to_string())
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues a fresh access/refresh pair and records the refresh token.
async fn issue_pair(
    conn: &mut MySqlConnection,
    subject: &Subject,
    config: &Config,
) -> AppResult<TokenPair> {
    let signing = |e: jsonwebtoken::errors::Error| AppError::internal(format!("token signing failed: {}", e));
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl).map_err(signing)?;
    let (refresh_token, claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(signing)?;

    debug!(user_id = subject.user_id, jti = %claims.jti, "Storing refresh token");
    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, FROM_UNIXTIME(?))",
    )
    .bind(subject.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(&mut *conn)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[instrument(name = "auth_login", skip(pool, config, body), fields(username = %body.username))]
pub async fn login(
    body: web::Json<LoginRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("Username or password required").into());
    }

    let mut conn = pool.acquire().await.map_err(AppError::from)?;
    let user = match users::find_by_username(&mut conn, body.username.trim()).await? {
        Some(u) if u.is_active => u,
        _ => {
            info!("Invalid credentials: unknown or inactive user");
            return Err(unauthorized("Invalid credentials").into());
        }
    };
    if let Err(e) = verify_password(&body.password, &user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(unauthorized("Invalid credentials").into());
    }
    if Role::from_id(user.role_id).is_none() {
        error!(user_id = user.id, role_id = user.role_id, "User has unknown role");
        return Err(unauthorized("Invalid role").into());
    }

    let subject = Subject {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role_id,
        organization_id: user.organization_id,
        employee_id: user.employee_id,
    };
    let pair = issue_pair(&mut conn, &subject, &config).await?;

    if let Err(e) = users::touch_last_login(&mut conn, user.id).await {
        warn!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> AppResult<Claims> {
    let token = bearer(req).ok_or_else(|| unauthorized("Missing refresh token"))?;
    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| unauthorized("Invalid refresh token"))?;
    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized("Refresh token required"));
    }
    Ok(claims)
}

/// Rotates the refresh token: the presented one is revoked and a new pair
/// is issued in the same transaction.
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let claims = refresh_claims(&req, &config)?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let record = sqlx::query_as::<_, (u64, bool)>(
        "SELECT id, revoked FROM refresh_tokens WHERE jti = ? FOR UPDATE",
    )
    .bind(&claims.jti)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::from)?;

    let token_id = match record {
        Some((id, false)) => id,
        _ => {
            warn!(user_id = claims.user_id, "Refresh with unknown or revoked token");
            return Err(unauthorized("Invalid refresh token").into());
        }
    };

    let user = users::find(&mut tx, claims.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| unauthorized("Invalid refresh token"))?;

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(token_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

    // role and links are re-read so changes apply on the next refresh
    let subject = Subject {
        user_id: user.id,
        username: user.username,
        role: user.role_id,
        organization_id: user.organization_id,
        employee_id: user.employee_id,
    };
    let pair = issue_pair(&mut tx, &subject, &config).await?;
    tx.commit().await.map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(pair))
}

/// Revokes the presented refresh token. Always 204, whether or not the
/// token was known.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Ok(claims) = refresh_claims(&req, &config) else {
        return HttpResponse::NoContent().finish();
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }
    HttpResponse::NoContent().finish()
}
