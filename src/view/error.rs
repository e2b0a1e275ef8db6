use rinja::Template;

#[derive(Clone, Template)]
#[template(path = "pages/error.html")]
pub struct ErrorPage {
    pub code: u16,
    pub message: String,
}

impl ErrorPage {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
