use axum::{
    extract::Query,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_messages::Messages;
use diesel::result::{DatabaseErrorKind, Error::DatabaseError};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::{
    auth::{LoginForm, RegisterForm, USER_ID_KEY},
    context::Context,
    error::PostboardError,
    extract::DatabaseConnection,
    model::NewUser,
    page_view, view, AuthSession,
};

const REGISTRATION_FORM_KEY: &str = "auth.registration_form";
const LOGIN_FORM_KEY: &str = "auth.login_form";

pub fn routes() -> Router<Context> {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(form).post(login))
        .route("/logout", get(logout))
}

#[derive(Debug, Deserialize)]
pub struct NextUrl {
    next: Option<String>,
}

/// Only same-site pages are followed after login. The `/post` routes only take
/// form posts, so a bounce from one of them lands on the home page instead.
fn local_path(next: Option<&str>) -> Option<&str> {
    next.filter(|next| {
        next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\")
    })
    .filter(|next| {
        let path = next.split(['?', '#']).next().unwrap_or_default();
        path != "/post" && !path.starts_with("/post/")
    })
}

fn flash_validation_errors(mut messages: Messages, validation: ValidationErrors) {
    for (_, info) in validation.into_errors() {
        if let ValidationErrorsKind::Field(errors) = info {
            for error in errors {
                messages = messages.error(error.to_string());
            }
        }
    }
}

fn internal(e: impl Into<anyhow::Error>) -> PostboardError {
    PostboardError::Internal(e.into())
}

pub async fn form(
    session: Session,
    Query(NextUrl { next }): Query<NextUrl>,
) -> Result<impl IntoResponse, PostboardError> {
    let form: LoginForm = session
        .remove(LOGIN_FORM_KEY)
        .await
        .map_err(internal)?
        .unwrap_or_default();

    let login = view::Login {
        email: form.email,
        next: local_path(next.as_deref().or(form.next.as_deref())).map(str::to_string),
    };

    Ok(page_view!(login, {
        "title" => "Sign in",
    }))
}

pub async fn login(
    mut auth_session: AuthSession,
    session: Session,
    messages: Messages,
    Form(input): Form<LoginForm>,
) -> Result<Response, PostboardError> {
    // `next` travels back to the form through the stashed input.
    let retry_url = "/login";

    if let Err(validation) = input.validate() {
        flash_validation_errors(messages, validation);
        session
            .insert(LOGIN_FORM_KEY, LoginForm {
                password: String::new(),
                ..input
            })
            .await
            .map_err(internal)?;

        return Ok(Redirect::to(retry_url).into_response());
    }

    let email = input.email.clone();
    let next = local_path(input.next.as_deref()).map(str::to_string);

    let account = match auth_session.authenticate(input.clone().into()).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            messages.error("Invalid credentials");
            session
                .insert(LOGIN_FORM_KEY, LoginForm {
                    password: String::new(),
                    ..input
                })
                .await
                .map_err(internal)?;

            return Ok(Redirect::to(retry_url).into_response());
        }
        Err(e) => {
            warn!("Error authenticating user({email}): {e}");
            return Err(internal(e));
        }
    };

    if let Err(e) = auth_session.login(&account).await {
        warn!("Error logging in user({email}): {e}");
        return Err(internal(e));
    }
    session
        .insert(USER_ID_KEY, &account.id)
        .await
        .map_err(internal)?;

    info!("user {} signed in", account.id);
    messages.success(format!("Signed in as {email}"));

    Ok(Redirect::to(next.as_deref().unwrap_or("/")).into_response())
}

pub async fn register_form(
    AuthSession { user, .. }: AuthSession,
    session: Session,
) -> Result<Response, PostboardError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let form: RegisterForm = session
        .remove(REGISTRATION_FORM_KEY)
        .await
        .map_err(internal)?
        .unwrap_or_default();

    let register = view::Register {
        name: form.name,
        email: form.email,
    };

    Ok(page_view!(register, {
        "title" => "Register",
    })
    .into_response())
}

pub async fn register(
    AuthSession { user, .. }: AuthSession,
    DatabaseConnection(mut conn): DatabaseConnection,
    session: Session,
    messages: Messages,
    Form(input): Form<RegisterForm>,
) -> Result<Redirect, PostboardError> {
    if user.is_some() {
        return Ok(Redirect::to("/"));
    }

    let stash = RegisterForm {
        password: String::new(),
        ..input.clone()
    };

    if let Err(validation) = input.validate() {
        flash_validation_errors(messages, validation);
        session
            .insert(REGISTRATION_FORM_KEY, stash)
            .await
            .map_err(internal)?;

        return Ok(Redirect::to("/register"));
    }

    let password = input.password.clone();
    let password = tokio::task::spawn_blocking(move || password_auth::generate_hash(password))
        .await
        .map_err(internal)?;

    let res = NewUser::new(&input.name, &input.email, &password)
        .create(&mut conn)
        .await;

    match res {
        Ok(user) => {
            info!("registered user {}", user.id);
            messages.success("Registration successful! You can now sign in.");

            Ok(Redirect::to("/login"))
        }
        Err(e) => {
            match e {
                DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    messages.error("A user with the same email already exists")
                }
                e => {
                    warn!("Error registering user({}): {e}", input.email);
                    messages.error("An unknown error occurred")
                }
            };

            session
                .insert(REGISTRATION_FORM_KEY, stash)
                .await
                .map_err(internal)?;

            Ok(Redirect::to("/register"))
        }
    }
}

pub async fn logout(
    mut auth_session: AuthSession,
    session: Session,
) -> Result<Redirect, PostboardError> {
    session
        .remove::<String>(USER_ID_KEY)
        .await
        .map_err(internal)?;

    match auth_session.logout().await {
        Ok(_) => Ok(Redirect::to("/")),
        Err(e) => {
            warn!("Error logging out user: {e}");
            Err(internal(e))
        }
    }
}
