use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error::DatabaseError};
use diesel::{sql_query, table};
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::RunQueryDsl;
use tower_sessions::{
    session::{Id, Record},
    session_store, ExpiredDeletion, SessionStore,
};

use tracing::warn;

use crate::Connection;

#[derive(thiserror::Error, Debug)]
pub enum DieselStoreError {
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),

    #[error(transparent)]
    Pool(#[from] deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>),

    #[error(transparent)]
    Encode(#[from] rmp_serde::encode::Error),
}

impl From<DieselStoreError> for session_store::Error {
    fn from(err: DieselStoreError) -> Self {
        match err {
            DieselStoreError::Diesel(inner) => session_store::Error::Backend(inner.to_string()),
            DieselStoreError::Pool(inner) => session_store::Error::Backend(inner.to_string()),
            DieselStoreError::Encode(inner) => session_store::Error::Encode(inner.to_string()),
        }
    }
}

table! {
    _session {
        id -> Text,
        data -> Binary,
        expiry_date -> BigInt,
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = _session)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct SessionRow {
    id: String,
    data: Vec<u8>,
    expiry_date: i64,
}

impl SessionRow {
    fn encode(record: &Record) -> Result<Self, DieselStoreError> {
        Ok(Self {
            id: record.id.to_string(),
            data: rmp_serde::to_vec(record)?,
            expiry_date: record.expiry_date.unix_timestamp(),
        })
    }
}

/// A `tower-sessions` store keeping session records in the app's SQLite database.
#[derive(Clone, derive_more::Debug)]
pub struct DieselSqliteSessionStore {
    #[debug(skip)]
    database: Pool<Connection>,
}

impl DieselSqliteSessionStore {
    pub fn new(database: Pool<Connection>) -> Self {
        Self { database }
    }

    /// Migrate the session schema.
    pub async fn migrate(&self) -> Result<(), DieselStoreError> {
        let query = r#"
            create table if not exists _session
            (
                id text primary key not null,
                data blob not null,
                expiry_date integer not null
            )
            "#;

        let mut conn = self.database.get().await?;
        sql_query(query).execute(&mut *conn).await?;

        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for DieselSqliteSessionStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let mut conn = self
            .database
            .get()
            .await
            .map_err(DieselStoreError::Pool)?;

        let now = chrono::Utc::now().timestamp();
        diesel::delete(_session::table.filter(_session::expiry_date.lt(now)))
            .execute(&mut *conn)
            .await
            .map_err(DieselStoreError::Diesel)?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for DieselSqliteSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut conn = self
            .database
            .get()
            .await
            .map_err(DieselStoreError::Pool)?;

        loop {
            let row = SessionRow::encode(record)?;
            let res = diesel::insert_into(_session::table)
                .values(&row)
                .execute(&mut *conn)
                .await;

            match res {
                Ok(_) => return Ok(()),
                // Id collision, try again with a fresh one.
                Err(DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    record.id = Id::default();
                }
                Err(e) => return Err(DieselStoreError::Diesel(e).into()),
            }
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let mut conn = self
            .database
            .get()
            .await
            .map_err(DieselStoreError::Pool)?;

        let row = SessionRow::encode(record)?;
        diesel::replace_into(_session::table)
            .values(&row)
            .execute(&mut *conn)
            .await
            .map_err(DieselStoreError::Diesel)?;

        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let mut conn = self
            .database
            .get()
            .await
            .map_err(DieselStoreError::Pool)?;

        let now = chrono::Utc::now().timestamp();
        let row = _session::table
            .filter(_session::id.eq(session_id.to_string()))
            .filter(_session::expiry_date.gt(now))
            .select(SessionRow::as_select())
            .first(&mut *conn)
            .await
            .optional()
            .map_err(DieselStoreError::Diesel)?;

        let Some(row) = row else {
            return Ok(None);
        };

        match rmp_serde::from_slice(&row.data) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // An unreadable record is dropped and the visitor starts over.
                warn!("discarding undecodable session record: {e}");
                diesel::delete(_session::table.filter(_session::id.eq(&row.id)))
                    .execute(&mut *conn)
                    .await
                    .map_err(DieselStoreError::Diesel)?;

                Ok(None)
            }
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let mut conn = self
            .database
            .get()
            .await
            .map_err(DieselStoreError::Pool)?;

        diesel::delete(_session::table.filter(_session::id.eq(session_id.to_string())))
            .execute(&mut *conn)
            .await
            .map_err(DieselStoreError::Diesel)?;

        Ok(())
    }
}
