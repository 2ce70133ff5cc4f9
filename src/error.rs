use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use sqlx::mysql::MySqlDatabaseError;

/// Error returned by every service call. The variant decides the HTTP status,
/// the message is what the caller sees in `{"message": ...}`.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "internal error: {}", _0)]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Message safe to hand back to the client.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        HttpResponse::build(self.status_code()).json(json!({
            "message": self.public_message()
        }))
    }
}

/// MySQL server error for a duplicate unique key.
const ER_DUP_ENTRY: u16 = 1062;
/// Row is still referenced by a child row.
const ER_ROW_IS_REFERENCED: u16 = 1451;
/// Parent row for a foreign key does not exist.
const ER_NO_REFERENCED_ROW: u16 = 1452;

/// Client message for an integrity constraint violation (SQLSTATE 23000),
/// keyed by the MySQL error number when the driver exposes one.
fn constraint_message(number: Option<u16>) -> &'static str {
    match number {
        Some(ER_DUP_ENTRY) => "Record already exists",
        Some(ER_ROW_IS_REFERENCED) => "Record is still in use",
        Some(ER_NO_REFERENCED_ROW) => "Referenced record does not exist",
        _ => "Constraint violation",
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
            // 23000 = integrity constraint violation
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000") => {
                let number = db_err
                    .try_downcast_ref::<MySqlDatabaseError>()
                    .map(MySqlDatabaseError::number);
                AppError::bad_request(constraint_message(number))
            }
            _ => AppError::Database(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn status_codes_follow_variant() {
        assert_eq!(
            AppError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn only_duplicate_keys_report_existing_record() {
        assert_eq!(constraint_message(Some(1062)), "Record already exists");
        assert_eq!(constraint_message(Some(1451)), "Record is still in use");
        assert_eq!(
            constraint_message(Some(1452)),
            "Referenced record does not exist"
        );
        assert_eq!(constraint_message(Some(1048)), "Constraint violation");
        assert_eq!(constraint_message(None), "Constraint violation");
    }

    #[actix_web::test]
    async fn internal_details_are_not_leaked() {
        let resp = AppError::internal("pool exhausted on host db-3").error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[actix_web::test]
    async fn business_message_reaches_client() {
        let resp = AppError::bad_request("Insufficient leave balance").error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "Insufficient leave balance");
    }
}
