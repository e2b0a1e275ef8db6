use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use diesel_async::pooled_connection::deadpool::Object;

use crate::{context::Context, error::PostboardError, Connection};

/// A pooled database connection checked out for the duration of a handler.
pub struct DatabaseConnection(pub Object<Connection>);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for DatabaseConnection
where
    S: Send + Sync,
    Context: FromRef<S>,
{
    type Rejection = PostboardError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = Context::from_ref(state);
        let conn = context
            .database
            .get()
            .await
            .map_err(|e| PostboardError::Internal(e.into()))?;

        Ok(Self(conn))
    }
}
