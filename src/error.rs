use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse};

#[derive(Debug, thiserror::Error)]
pub enum PostboardError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not Found")]
    NotFound,

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<diesel::result::Error> for PostboardError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => Self::NotFound,
            e => Self::Internal(e.into()),
        }
    }
}

#[derive(Clone)]
pub(crate) struct ErrorWrapper(pub Arc<PostboardError>);

impl IntoResponse for PostboardError {
    fn into_response(self) -> axum::response::Response {
        use PostboardError::*;

        let code = match self {
            Unauthorized => StatusCode::UNAUTHORIZED,
            NotFound => StatusCode::NOT_FOUND,
            Internal(ref inner) => {
                tracing::error!("Internal server error: {inner:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut response = (code, "").into_response();
        response
            .extensions_mut()
            .insert(ErrorWrapper(Arc::new(self)));

        response
    }
}
