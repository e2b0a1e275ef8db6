mod auth;
mod controls;
mod error;
mod home;
mod layout;

pub use auth::*;
pub use controls::*;
pub use error::*;
pub use home::*;
pub use layout::*;

use crate::{auth::USER_ID_KEY, error::ErrorWrapper};
use axum::{
    body::Body,
    response::{Html, IntoResponse, Response},
};
use axum_messages::Messages;
use rinja::Template;
use std::collections::BTreeMap;
use tower_sessions::Session;
use tracing::error;

pub async fn render_view(session: Session, messages: Messages, response: Response) -> Response {
    let status = response.status();
    let signed_in = matches!(session.get::<String>(USER_ID_KEY).await, Ok(Some(_)));

    let extensions = response.extensions();

    let content = if let Some(RenderedTemplate(content)) = extensions.get::<RenderedTemplate>() {
        content.clone()
    } else if let Some(ErrorWrapper(error)) = extensions.get::<ErrorWrapper>() {
        ErrorPage::new(status.as_u16(), error.to_string()).to_string()
    } else {
        return response;
    };

    let title = extensions
        .get::<ViewData>()
        .and_then(|data| data.get("title").cloned())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());

    let layout = Layout {
        title,
        messages: messages.into_iter().map(Flash::from).collect(),
        content,
        version_string: version_string().to_string(),
        signed_in,
    };

    match Template::render(&layout) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("failed to render layout: {e}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn version_string() -> &'static str {
    option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
}

#[derive(Clone, Default)]
pub struct ViewData(pub BTreeMap<String, String>);

impl ViewData {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }
}

impl std::ops::DerefMut for ViewData {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl std::ops::Deref for ViewData {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[macro_export]
macro_rules! view_data {
    ($($key:expr => $value:expr, )*) => {
        {
            let mut _data = $crate::view::ViewData::new();
        $(
            let _ = _data.insert($key.to_string(), $value.to_string());
        )*
            _data
        }
    }
}

/// Wraps a page in a response that [`render_view`] lays out.
///
/// ```ignore
/// page_view!(Home::new(&feed, &FormControls), { "title" => "Home", })
/// ```
#[macro_export(local_inner_macros)]
macro_rules! page_view {
    ($template:expr , { $($data:tt)* }) => {
        $crate::view::ViewWithData($template, view_data! { $($data)* })
    };
    ($template:expr, $data:expr) => {
        $crate::view::ViewWithData($template, $data)
    };
    ($template:expr) => {
        $crate::view::View($template)
    };
}

pub trait PageView {
    fn render(&self) -> String;
}

impl<T: ToString> PageView for T {
    fn render(&self) -> String {
        self.to_string()
    }
}

#[derive(Clone)]
pub struct View<T: PageView>(pub T);

#[derive(Clone)]
pub struct ViewWithData<T: PageView>(pub T, pub ViewData);

#[derive(Clone)]
struct RenderedTemplate(String);

impl<T> IntoResponse for View<T>
where
    T: PageView,
{
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::empty());
        let rendered = RenderedTemplate(self.0.render());
        response.extensions_mut().insert(rendered);
        response
    }
}

impl<T> IntoResponse for ViewWithData<T>
where
    T: PageView,
{
    fn into_response(self) -> Response {
        let mut response = View(self.0).into_response();
        response.extensions_mut().insert(self.1);
        response
    }
}
