use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::User;
use crate::schema::{post, user};
use crate::Connection;

/// A post joined with its author.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub author: User,
    pub created_at: NaiveDateTime,
}

impl Post {
    /// Newest first, each joined with its author.
    ///
    /// With an `author_id` only that user's posts are returned.
    pub async fn list(author_id: Option<&str>, conn: &mut Connection) -> QueryResult<Vec<Post>> {
        let mut query = post::table
            .inner_join(user::table)
            .select((PostRecord::as_select(), User::as_select()))
            .order_by((post::created_at.desc(), post::id.desc()))
            .into_boxed();

        if let Some(author_id) = author_id {
            query = query.filter(post::author_id.eq(author_id));
        }

        let rows: Vec<(PostRecord, User)> = query.load(conn).await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Deletes post `id` if it belongs to `author_id`. Returns whether a row was removed.
    pub async fn delete_owned(id: i32, author_id: &str, conn: &mut Connection) -> QueryResult<bool> {
        let deleted = diesel::delete(
            post::table
                .filter(post::id.eq(id))
                .filter(post::author_id.eq(author_id)),
        )
        .execute(conn)
        .await?;

        Ok(deleted > 0)
    }
}

impl From<(PostRecord, User)> for Post {
    fn from((record, author): (PostRecord, User)) -> Self {
        Self {
            id: record.id,
            title: record.title,
            author,
            created_at: record.created_at,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable)]
#[diesel(table_name = crate::schema::post)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostRecord {
    pub id: i32,
    pub title: String,
    pub author_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::post)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NewPost<'a> {
    pub title: &'a str,
    pub author_id: &'a str,
    pub created_at: NaiveDateTime,
}

impl<'a> NewPost<'a> {
    pub fn new(author_id: &'a str, title: &'a str) -> Self {
        Self {
            title,
            author_id,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn with_created_at(self, created_at: NaiveDateTime) -> Self {
        Self { created_at, ..self }
    }

    pub async fn create(&self, conn: &mut Connection) -> QueryResult<PostRecord> {
        diesel::insert_into(post::table)
            .values(self)
            .returning(PostRecord::as_returning())
            .get_result(conn)
            .await
    }
}
