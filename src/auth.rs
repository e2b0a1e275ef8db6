use async_trait::async_trait;
use axum_login::AuthnBackend;
use derive_masked::DebugMasked;
use diesel_async::pooled_connection::deadpool::Pool;
use password_auth::verify_password;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    model::{Account, Credentials},
    Connection,
};

pub type AuthSession = axum_login::AuthSession<PostboardAuth>;

/// Session key holding the signed-in account id. Written on login next to
/// axum-login's own data so public pages can resolve the visitor without the
/// auth layer.
pub(crate) const USER_ID_KEY: &str = "auth.user_id";
type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Deadpool(#[from] deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>),

    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
}

#[derive(Validate, Serialize, Deserialize, DebugMasked, Clone, Default)]
pub struct LoginForm {
    #[validate(email(message = "Email provided is not valid"))]
    pub email: String,

    #[masked]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub next: Option<String>,
}

impl From<LoginForm> for Credentials {
    fn from(form: LoginForm) -> Self {
        Self {
            email: form.email,
            password: form.password,
            next: form.next,
        }
    }
}

#[derive(Validate, Serialize, Deserialize, DebugMasked, Clone, Default)]
pub struct RegisterForm {
    #[validate(length(
        min = 1,
        max = 64,
        message = "Name must be between 1 and 64 characters"
    ))]
    pub name: String,

    #[validate(email(message = "Email provided is not valid"))]
    pub email: String,

    #[masked]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Clone)]
pub struct PostboardAuth {
    database: Pool<Connection>,
}

impl PostboardAuth {
    pub fn new(database: Pool<Connection>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl AuthnBackend for PostboardAuth {
    type User = Account;
    type Credentials = Credentials;
    type Error = Error;

    async fn authenticate(&self, credentials: Self::Credentials) -> Result<Option<Self::User>> {
        let mut conn = self.database.get().await?;

        let Some(account) = Account::find_by_email(&credentials.email, &mut conn).await? else {
            return Ok(None);
        };

        // Hash verification is CPU bound.
        tokio::task::spawn_blocking(move || {
            Ok(verify_password(credentials.password, &account.password)
                .is_ok()
                .then_some(account))
        })
        .await?
    }

    async fn get_user(&self, user_id: &axum_login::UserId<Self>) -> Result<Option<Self::User>> {
        let mut conn = self.database.get().await?;

        Ok(Account::find(user_id, &mut conn).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_pool;
    use crate::model::NewUser;

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
            next: None,
        }
    }

    #[tokio::test]
    async fn authenticates_with_the_right_password_only() {
        let pool = test_pool().await;
        let hash = password_auth::generate_hash("hunter22");
        let ann = {
            let mut conn = pool.get().await.unwrap();
            NewUser::new("Ann", "ann@x.com", &hash)
                .create(&mut conn)
                .await
                .unwrap()
        };
        let auth = PostboardAuth::new(pool);

        let account = auth
            .authenticate(credentials("ann@x.com", "hunter22"))
            .await
            .unwrap()
            .expect("password should verify");
        assert_eq!(account.id, ann.id);

        assert!(auth
            .authenticate(credentials("ann@x.com", "wrong"))
            .await
            .unwrap()
            .is_none());
        assert!(auth
            .authenticate(credentials("bob@x.com", "hunter22"))
            .await
            .unwrap()
            .is_none());

        assert!(auth.get_user(&ann.id).await.unwrap().is_some());
        assert!(auth.get_user(&"missing".to_string()).await.unwrap().is_none());
    }

    #[test]
    fn register_form_validation() {
        let form = RegisterForm {
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            password: "long enough".to_string(),
        };
        assert!(form.validate().is_ok());

        let form = RegisterForm {
            name: String::new(),
            email: "not an email".to_string(),
            password: "short".to_string(),
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
