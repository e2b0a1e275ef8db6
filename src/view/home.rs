use rinja::Template;

use super::Controls;
use crate::{feed::Feed, model::Post};

/// The home page: who is signed in, what they can do, and the posts to show.
#[derive(Clone, Debug, Template)]
#[template(path = "pages/home.html")]
pub struct Home {
    pub identity: Option<Identity>,
    pub sign_in: String,
    pub sign_out: String,
    pub post_form: String,
    pub rows: Vec<PostRow>,
}

#[derive(Clone, Debug)]
pub struct Identity {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PostRow {
    pub id: i32,
    pub author: String,
    pub title: String,
    pub delete: String,
}

impl Home {
    pub fn new(feed: &Feed, controls: &impl Controls) -> Self {
        let session = feed.session.as_ref();

        let rows = feed
            .posts_to_show()
            .unwrap_or_default()
            .iter()
            .map(|post: &Post| PostRow {
                id: post.id,
                author: post.author.display_name().to_string(),
                title: post.title.clone(),
                delete: match session {
                    Some(session) if session.is_author(&post.author) => controls.delete(post.id),
                    _ => String::new(),
                },
            })
            .collect();

        match session {
            Some(session) => Self {
                identity: Some(Identity {
                    name: session.user.display_name().to_string(),
                    image: session.user.image.clone(),
                }),
                sign_in: String::new(),
                sign_out: controls.sign_out(),
                post_form: controls.post_form(),
                rows,
            },
            None => Self {
                identity: None,
                sign_in: controls.sign_in(),
                sign_out: String::new(),
                post_form: String::new(),
                rows,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::tests::{post, user};
    use crate::model::Session;

    /// Renders each control as a bracketed marker.
    struct Markers;

    impl Controls for Markers {
        fn sign_in(&self) -> String {
            "[sign-in]".to_string()
        }

        fn sign_out(&self) -> String {
            "[sign-out]".to_string()
        }

        fn post_form(&self) -> String {
            "[post-form]".to_string()
        }

        fn delete(&self, post_id: i32) -> String {
            format!("[delete:{post_id}]")
        }
    }

    fn render(feed: &Feed) -> String {
        Home::new(feed, &Markers).render().unwrap()
    }

    fn rows(html: &str) -> usize {
        html.matches(r#"class="post""#).count()
    }

    #[test]
    fn anonymous_visitor_sees_sign_in_and_all_posts() {
        let ann = user("u1", "Ann", "ann@x.com");
        let feed = Feed {
            all_posts: Some(vec![post(1, "Hello", &ann)]),
            ..Default::default()
        };

        let html = render(&feed);

        assert!(html.contains("[sign-in]"));
        assert!(!html.contains("[sign-out]"));
        assert!(!html.contains("[post-form]"));
        assert!(!html.contains("<img"));
        assert_eq!(rows(&html), 1);
        assert!(html.contains("<h2>Ann:</h2>"));
        assert!(html.contains("<p>Hello</p>"));
        assert!(!html.contains("[delete:"));
    }

    #[test]
    fn signed_in_user_sees_controls_and_deletes_own_posts() {
        let ann = user("u1", "Ann", "ann@x.com");
        let feed = Feed {
            session: Some(Session::new(ann.clone())),
            own_posts: Some(vec![post(2, "Mine", &ann)]),
            ..Default::default()
        };

        let html = render(&feed);

        assert!(html.contains(r#"src="https://img.test/u1.png""#));
        assert!(html.contains("[sign-out]"));
        assert!(html.contains("[post-form]"));
        assert!(!html.contains("[sign-in]"));
        assert_eq!(rows(&html), 1);
        assert!(html.contains("<h2>Ann:</h2>"));
        assert!(html.contains("<p>Mine</p>"));
        assert!(html.contains("[delete:2]"));
    }

    #[test]
    fn failed_personalized_fetch_renders_an_empty_list() {
        let ann = user("u1", "Ann", "ann@x.com");
        let feed = Feed {
            session: Some(Session::new(ann.clone())),
            all_posts: Some(vec![post(1, "Hello", &ann)]),
            own_posts: None,
        };

        let html = render(&feed);

        assert!(html.contains("[sign-out]"));
        assert!(html.contains("[post-form]"));
        assert_eq!(rows(&html), 0);
        assert!(!html.contains("Hello"));
    }

    #[test]
    fn delete_requires_an_exact_email_match() {
        let ann = user("u1", "Ann", "ann@x.com");
        let shouty_ann = user("u2", "Ann", "ANN@x.com");
        let mut nameless = user("u3", "Ghost", "");
        nameless.email = None;

        let feed = Feed {
            session: Some(Session::new(ann.clone())),
            own_posts: Some(vec![
                post(3, "Mine", &ann),
                post(4, "Not mine", &shouty_ann),
                post(5, "Nobody's", &nameless),
            ]),
            ..Default::default()
        };

        let html = render(&feed);

        assert_eq!(rows(&html), 3);
        assert!(html.contains("[delete:3]"));
        assert!(!html.contains("[delete:4]"));
        assert!(!html.contains("[delete:5]"));
    }

    #[test]
    fn missing_lists_render_nothing() {
        let html = render(&Feed::default());

        assert!(html.contains("[sign-in]"));
        assert_eq!(rows(&html), 0);
    }

    #[test]
    fn titles_are_escaped() {
        let ann = user("u1", "Ann", "ann@x.com");
        let feed = Feed {
            all_posts: Some(vec![post(1, "<script>alert(1)</script>", &ann)]),
            ..Default::default()
        };

        let html = render(&feed);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
