use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;

use crate::{
    context::Context,
    feed::{load_feed, DatabasePostStore, DatabaseSessionProvider},
    page_view,
    view::{FormControls, Home},
};

pub async fn home(State(context): State<Context>, session: Session) -> impl IntoResponse {
    let sessions = DatabaseSessionProvider::new(context.database.clone(), session);
    let store = DatabasePostStore::new(context.database.clone());

    let feed = load_feed(&sessions, &store).await;

    page_view!(Home::new(&feed, &FormControls), {
        "title" => "Home",
    })
}
