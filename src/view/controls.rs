use rinja::Template;

/// The interactive affordances a page composes. Each method returns an HTML
/// fragment wired to the handler that performs the action.
pub trait Controls {
    fn sign_in(&self) -> String;
    fn sign_out(&self) -> String;
    fn post_form(&self) -> String;
    fn delete(&self, post_id: i32) -> String;
}

/// Plain HTML links and forms targeting the app's own routes.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormControls;

impl Controls for FormControls {
    fn sign_in(&self) -> String {
        SignIn {}.to_string()
    }

    fn sign_out(&self) -> String {
        SignOut {}.to_string()
    }

    fn post_form(&self) -> String {
        PostForm {}.to_string()
    }

    fn delete(&self, post_id: i32) -> String {
        DeletePost { post_id }.to_string()
    }
}

#[derive(Template)]
#[template(path = "components/sign_in.html")]
struct SignIn {}

#[derive(Template)]
#[template(path = "components/sign_out.html")]
struct SignOut {}

#[derive(Template)]
#[template(path = "components/post_form.html")]
struct PostForm {}

#[derive(Template)]
#[template(path = "components/delete_post.html")]
struct DeletePost {
    post_id: i32,
}
