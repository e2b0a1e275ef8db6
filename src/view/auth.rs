use rinja::Template;

#[derive(Clone, Default, Template)]
#[template(path = "pages/auth/login.html")]
pub struct Login {
    pub email: String,
    pub next: Option<String>,
}

#[derive(Clone, Default, Template)]
#[template(path = "pages/auth/register.html")]
pub struct Register {
    pub name: String,
    pub email: String,
}
