use axum_login::AuthUser;
use derive_masked::DebugMasked;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::schema::user;
use crate::Connection;

/// Public profile of a user: a post author or the owner of a session.
#[derive(Clone, Debug, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = crate::schema::user)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

impl User {
    pub async fn find(id: &str, conn: &mut Connection) -> QueryResult<Option<User>> {
        user::table
            .find(id)
            .select(User::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// The credential-bearing view of a user row, used by the auth backend.
#[derive(Clone, DebugMasked, Queryable, Selectable)]
#[diesel(table_name = crate::schema::user)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Account {
    pub id: String,
    pub email: Option<String>,
    #[masked]
    pub password: String,
}

impl Account {
    pub async fn find(id: &str, conn: &mut Connection) -> QueryResult<Option<Account>> {
        user::table
            .find(id)
            .select(Account::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn find_by_email(email: &str, conn: &mut Connection) -> QueryResult<Option<Account>> {
        user::table
            .filter(user::email.eq(email))
            .select(Account::as_select())
            .first(conn)
            .await
            .optional()
    }
}

impl AuthUser for Account {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.id.clone()
    }

    fn session_auth_hash(&self) -> &[u8] {
        // Changing the password invalidates existing sessions.
        self.password.as_bytes()
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::user)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NewUser<'a> {
    pub id: String,
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub image: Option<String>,
    pub password: &'a str,
}

impl<'a> NewUser<'a> {
    /// A new user with a generated id and a default avatar.
    ///
    /// `password` is expected to already be a PHC hash string.
    pub fn new(name: &'a str, email: &'a str, password: &'a str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: Some(name),
            email: Some(email),
            image: Some(avatar_url(name)),
            password,
        }
    }

    pub async fn create(&self, conn: &mut Connection) -> QueryResult<User> {
        diesel::insert_into(user::table)
            .values(self)
            .returning(User::as_returning())
            .get_result(conn)
            .await
    }
}

pub fn avatar_url(name: &str) -> String {
    let username = name.split_whitespace().collect::<Vec<_>>().join("+");
    format!("https://avatar.iran.liara.run/username?username={username}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_pool;

    #[test]
    fn avatar_url_joins_name_parts() {
        assert_eq!(
            avatar_url("Ann  Lee"),
            "https://avatar.iran.liara.run/username?username=Ann+Lee"
        );
    }

    #[tokio::test]
    async fn created_users_are_found_by_id_and_email() {
        let pool = test_pool().await;
        let mut conn = pool.get().await.unwrap();

        let user = NewUser::new("Ann", "ann@x.com", "hash")
            .create(&mut conn)
            .await
            .unwrap();

        assert_eq!(User::find(&user.id, &mut conn).await.unwrap(), Some(user.clone()));

        let account = Account::find_by_email("ann@x.com", &mut conn)
            .await
            .unwrap()
            .expect("account should exist");
        assert_eq!(account.id, user.id);
        assert_eq!(account.password, "hash");

        assert!(User::find("missing", &mut conn).await.unwrap().is_none());
        assert!(Account::find_by_email("bob@x.com", &mut conn)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected() {
        let pool = test_pool().await;
        let mut conn = pool.get().await.unwrap();

        NewUser::new("Ann", "ann@x.com", "hash")
            .create(&mut conn)
            .await
            .unwrap();
        let res = NewUser::new("Other Ann", "ann@x.com", "hash")
            .create(&mut conn)
            .await;

        assert!(matches!(
            res,
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _
            ))
        ));
    }
}
