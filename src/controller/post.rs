use axum::{
    extract::{Form, Path},
    response::Redirect,
};
use axum_messages::Messages;
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationErrorsKind};

use crate::{
    error::PostboardError,
    extract::DatabaseConnection,
    model::{NewPost, Post},
    AuthSession,
};

#[derive(Debug, Deserialize, Validate)]
pub struct PostCreateForm {
    #[validate(length(
        min = 1,
        max = 280,
        message = "Posts must be between 1 and 280 characters"
    ))]
    title: String,
}

pub async fn create(
    AuthSession { user, .. }: AuthSession,
    DatabaseConnection(mut conn): DatabaseConnection,
    mut messages: Messages,
    Form(input): Form<PostCreateForm>,
) -> Result<Redirect, PostboardError> {
    let author = user.ok_or(PostboardError::Unauthorized)?;
    let input = PostCreateForm {
        title: input.title.trim().to_string(),
    };

    if let Err(validation) = input.validate() {
        for (_, info) in validation.into_errors() {
            if let ValidationErrorsKind::Field(errors) = info {
                for error in errors {
                    messages = messages.error(error.to_string());
                }
            }
        }

        return Ok(Redirect::to("/"));
    }

    let post = NewPost::new(&author.id, &input.title)
        .create(&mut conn)
        .await?;
    info!("user {} created post {}", author.id, post.id);

    Ok(Redirect::to("/"))
}

pub async fn delete(
    AuthSession { user, .. }: AuthSession,
    DatabaseConnection(mut conn): DatabaseConnection,
    messages: Messages,
    Path(id): Path<i32>,
) -> Result<Redirect, PostboardError> {
    let author = user.ok_or(PostboardError::Unauthorized)?;

    if !Post::delete_owned(id, &author.id, &mut conn).await? {
        return Err(PostboardError::NotFound);
    }
    info!("user {} deleted post {id}", author.id);

    messages.success("Post deleted");

    Ok(Redirect::to("/"))
}
