//! Loads everything the home page shows.
//!
//! The session and the global post list are resolved concurrently. The
//! signed-in user's own posts are requested as soon as the session is known,
//! without waiting on the global list. Every outcome is settled on its own: a
//! failure is logged and the value is treated as absent, so a broken backend
//! degrades the page instead of failing the request.

use anyhow::Result;
use async_trait::async_trait;
use diesel_async::pooled_connection::deadpool::Pool;
use tracing::error;

use crate::{
    auth::USER_ID_KEY,
    model::{Post, Session, User},
    Connection,
};

/// Resolves the current visitor's session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self) -> Result<Option<Session>>;
}

/// Reads posts, newest first, each joined with its author.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn posts(&self, author_id: Option<&str>) -> Result<Vec<Post>>;
}

/// Settled outcome of the home page fetches. `None` marks a failed fetch, or
/// for `own_posts` one that was never issued.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Feed {
    pub session: Option<Session>,
    pub all_posts: Option<Vec<Post>>,
    pub own_posts: Option<Vec<Post>>,
}

impl Feed {
    /// The signed-in user's own posts, otherwise the global list.
    ///
    /// There is no fallback to the global list when the personalized fetch
    /// failed for a signed-in user.
    pub fn posts_to_show(&self) -> Option<&[Post]> {
        if self.session.is_some() {
            self.own_posts.as_deref()
        } else {
            self.all_posts.as_deref()
        }
    }
}

pub async fn load_feed<S, P>(sessions: &S, store: &P) -> Feed
where
    S: SessionProvider + ?Sized,
    P: PostStore + ?Sized,
{
    let personalized = async {
        let session = settle("session", sessions.session().await).flatten();

        let own_posts = match session {
            Some(ref session) => {
                let own_posts = store.posts(Some(session.user.id.as_str())).await;
                settle("own posts", own_posts)
            }
            None => None,
        };

        (session, own_posts)
    };

    let ((session, own_posts), all_posts) = tokio::join!(personalized, async {
        settle("all posts", store.posts(None).await)
    });

    Feed {
        session,
        all_posts,
        own_posts,
    }
}

fn settle<T>(what: &str, outcome: Result<T>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            error!("failed to load {what}: {e:#}");
            None
        }
    }
}

/// Resolves the session from the request's cookie session and the user table.
pub struct DatabaseSessionProvider {
    database: Pool<Connection>,
    session: tower_sessions::Session,
}

impl DatabaseSessionProvider {
    pub fn new(database: Pool<Connection>, session: tower_sessions::Session) -> Self {
        Self { database, session }
    }
}

#[async_trait]
impl SessionProvider for DatabaseSessionProvider {
    async fn session(&self) -> Result<Option<Session>> {
        let Some(user_id) = self.session.get::<String>(USER_ID_KEY).await? else {
            return Ok(None);
        };

        let mut conn = self.database.get().await?;

        // A deleted user leaves a stale id behind, which is just signed out.
        Ok(User::find(&user_id, &mut conn).await?.map(Session::from))
    }
}

pub struct DatabasePostStore {
    database: Pool<Connection>,
}

impl DatabasePostStore {
    pub fn new(database: Pool<Connection>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl PostStore for DatabasePostStore {
    async fn posts(&self, author_id: Option<&str>) -> Result<Vec<Post>> {
        let mut conn = self.database.get().await?;

        Ok(Post::list(author_id, &mut conn).await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::NaiveDateTime;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    pub(crate) fn user(id: &str, name: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            image: Some(format!("https://img.test/{id}.png")),
        }
    }

    pub(crate) fn post(id: i32, title: &str, author: &User) -> Post {
        Post {
            id,
            title: title.to_string(),
            author: author.clone(),
            created_at: NaiveDateTime::default(),
        }
    }

    struct Sessions(Option<Result<Session, &'static str>>);

    #[async_trait]
    impl SessionProvider for Sessions {
        async fn session(&self) -> Result<Option<Session>> {
            match &self.0 {
                None => Ok(None),
                Some(Ok(session)) => Ok(Some(session.clone())),
                Some(Err(e)) => Err(anyhow!(*e)),
            }
        }
    }

    #[derive(Default)]
    struct Store {
        all: Option<Vec<Post>>,
        own: Option<Vec<Post>>,
        requests: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl PostStore for Store {
        async fn posts(&self, author_id: Option<&str>) -> Result<Vec<Post>> {
            self.requests
                .lock()
                .unwrap()
                .push(author_id.map(str::to_string));

            let posts = match author_id {
                None => &self.all,
                Some(_) => &self.own,
            };

            posts.clone().ok_or_else(|| anyhow!("database is down"))
        }
    }

    fn ann() -> User {
        user("u1", "Ann", "ann@x.com")
    }

    #[tokio::test]
    async fn anonymous_visitors_get_all_posts() {
        let hello = post(1, "Hello", &ann());
        let store = Store {
            all: Some(vec![hello.clone()]),
            ..Default::default()
        };

        let feed = load_feed(&Sessions(None), &store).await;

        assert_eq!(feed.session, None);
        assert_eq!(feed.posts_to_show(), Some(&[hello][..]));
        assert_eq!(*store.requests.lock().unwrap(), [None]);
    }

    #[tokio::test]
    async fn failed_session_is_treated_as_signed_out() {
        let hello = post(1, "Hello", &ann());
        let store = Store {
            all: Some(vec![hello.clone()]),
            own: Some(vec![]),
            ..Default::default()
        };

        let feed = load_feed(&Sessions(Some(Err("auth is down"))), &store).await;

        assert_eq!(feed.session, None);
        assert_eq!(feed.own_posts, None);
        assert_eq!(feed.posts_to_show(), Some(&[hello][..]));
        assert_eq!(*store.requests.lock().unwrap(), [None]);
    }

    #[tokio::test]
    async fn failed_global_fetch_without_session_shows_nothing() {
        let feed = load_feed(&Sessions(None), &Store::default()).await;

        assert_eq!(feed.all_posts, None);
        assert_eq!(feed.posts_to_show(), None);
    }

    #[tokio::test]
    async fn signed_in_users_get_exactly_their_own_posts() {
        let ann = ann();
        let bob = user("u2", "Bob", "bob@x.com");
        let own = vec![post(3, "Newer", &ann), post(2, "Mine", &ann)];
        let store = Store {
            all: Some(vec![post(4, "Hi", &bob), own[0].clone(), own[1].clone()]),
            own: Some(own.clone()),
            ..Default::default()
        };

        let feed = load_feed(&Sessions(Some(Ok(Session::new(ann)))), &store).await;

        assert_eq!(feed.posts_to_show(), Some(&own[..]));

        let mut requests = store.requests.lock().unwrap().clone();
        requests.sort();
        assert_eq!(requests, [None, Some("u1".to_string())]);
    }

    #[tokio::test]
    async fn failed_personalized_fetch_does_not_fall_back() {
        let store = Store {
            all: Some(vec![post(1, "Hello", &ann())]),
            own: None,
            ..Default::default()
        };

        let feed = load_feed(&Sessions(Some(Ok(Session::new(ann())))), &store).await;

        assert!(feed.session.is_some());
        assert!(feed.all_posts.is_some());
        assert_eq!(feed.posts_to_show(), None);
    }

    /// Holds the global fetch open until the personalized one has been issued.
    struct BlockingStore {
        own_requested: Notify,
    }

    #[async_trait]
    impl PostStore for BlockingStore {
        async fn posts(&self, author_id: Option<&str>) -> Result<Vec<Post>> {
            match author_id {
                None => self.own_requested.notified().await,
                Some(_) => self.own_requested.notify_one(),
            }
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn personalized_fetch_does_not_wait_for_global_fetch() {
        let store = BlockingStore {
            own_requested: Notify::new(),
        };

        let feed = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            load_feed(&Sessions(Some(Ok(Session::new(ann())))), &store),
        )
        .await
        .expect("personalized fetch should not wait on the global fetch");

        assert_eq!(feed.own_posts, Some(vec![]));
        assert_eq!(feed.all_posts, Some(vec![]));
    }
}
