use axum_messages::Message;
use rinja::Template;

#[derive(Template)]
#[template(path = "layout.html")]
pub struct Layout {
    pub title: String,
    pub messages: Vec<Flash>,
    pub content: String,
    pub version_string: String,
    pub signed_in: bool,
}

/// A flash message ready for display.
#[derive(Clone, Debug)]
pub struct Flash {
    pub level: String,
    pub text: String,
}

impl From<Message> for Flash {
    fn from(message: Message) -> Self {
        Self {
            level: format!("{:?}", message.level).to_lowercase(),
            text: message.message,
        }
    }
}
