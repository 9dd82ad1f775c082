//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Error returned by every handler.
///
/// Bodies are plain text; the status code carries the error kind.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Internal(noteapp_core::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
}

impl From<noteapp_core::Error> for ApiError {
    fn from(err: noteapp_core::Error) -> Self {
        use noteapp_core::Error;

        match &err {
            Error::NotFound(_) | Error::NoteNotFound(_) | Error::CategoryNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            Error::Conflict(msg) => ApiError::Conflict(msg.clone()),
            Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    let friendly_msg = if msg.contains("category_name_unique") {
                        "A category with this name already exists".to_string()
                    } else {
                        msg
                    };
                    return ApiError::Conflict(friendly_msg);
                }
                ApiError::Internal(err)
            }
            _ => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                tracing::error!(
                    subsystem = "api",
                    error = %err,
                    "Request failed with internal error"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_not_found_kinds_map_to_404() {
        let id = Uuid::new_v4();
        for err in [
            noteapp_core::Error::NoteNotFound(id),
            noteapp_core::Error::CategoryNotFound(id),
            noteapp_core::Error::NotFound("x".to_string()),
        ] {
            let resp = ApiError::from(err).into_response();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_note_not_found_message_names_the_id() {
        let id = Uuid::new_v4();
        let api_err = ApiError::from(noteapp_core::Error::NoteNotFound(id));
        assert_eq!(api_err.to_string(), format!("Note not found: {}", id));
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let err = noteapp_core::Error::InvalidInput("Category name cannot be empty".to_string());
        let api_err = ApiError::from(err);
        assert!(matches!(&api_err, ApiError::BadRequest(m) if m == "Category name cannot be empty"));
        assert_eq!(api_err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err = noteapp_core::Error::Conflict("taken".to_string());
        assert_eq!(
            ApiError::from(err).into_response().status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_other_errors_map_to_500() {
        let err = noteapp_core::Error::Internal("boom".to_string());
        assert_eq!(
            ApiError::from(err).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_body_is_plain_text() {
        let resp = ApiError::NotFound("Note not found".to_string()).into_response();
        let content_type = resp
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/plain"));
    }
}
