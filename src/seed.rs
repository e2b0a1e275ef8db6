use anyhow::{ensure, Result};
use chrono::{Duration, Utc};
use diesel_async::pooled_connection::deadpool::Pool;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use tracing::info;

use crate::{
    model::{NewPost, NewUser},
    Connection,
};

/// Password shared by every seeded user.
pub const SEED_PASSWORD: &str = "password";

/// Fills the database with `users` fake users and `posts` fake posts spread
/// across them, one minute apart.
pub async fn seed(database: &Pool<Connection>, users: usize, posts: usize) -> Result<()> {
    ensure!(users > 0 || posts == 0, "posts need at least one user to author them");

    let mut conn = database.get().await?;
    let password = tokio::task::spawn_blocking(|| password_auth::generate_hash(SEED_PASSWORD)).await?;

    let mut authors = Vec::with_capacity(users);
    for _ in 0..users {
        let name = format!("{} {}", FirstName().fake::<String>(), LastName().fake::<String>());
        let email: String = SafeEmail().fake();

        let user = NewUser::new(&name, &email, &password)
            .create(&mut conn)
            .await?;
        info!("created user {name} <{email}>");

        authors.push(user);
    }

    let now = Utc::now().naive_utc();
    for i in 0..posts {
        let author = &authors[i % authors.len()];
        let title: String = Sentence(3..8).fake();

        NewPost::new(&author.id, &title)
            .with_created_at(now - Duration::minutes(i as i64))
            .create(&mut conn)
            .await?;
    }

    info!("seeded {users} users and {posts} posts");

    Ok(())
}
