use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

use crate::auth::auth::AuthUser;
use crate::auth::jwt::{TokenType, verify_token};
use crate::config::Config;
use crate::model::role::Role;

fn reject(req: ServiceRequest, message: &str) -> Result<ServiceResponse<BoxBody>, Error> {
    let resp = HttpResponse::Unauthorized().json(json!({ "message": message }));
    Ok(req.into_response(resp.map_into_boxed_body()))
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let token = match req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(t) => t.to_string(),
            None => return reject(req, "Authorization header must start with Bearer"),
        },
        None => return reject(req, "Missing Authorization header"),
    };

    let claims = match verify_token(&token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            return reject(req, "Invalid or expired token");
        }
    };
    if claims.token_type != TokenType::Access {
        return reject(req, "Access token required");
    }

    let Some(role) = Role::from_id(claims.role) else {
        return reject(req, "Invalid role");
    };

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        role,
        organization_id: claims.organization_id,
        employee_id: claims.employee_id,
    });

    next.call(req).await
}
