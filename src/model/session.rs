use super::User;

/// The signed-in visitor, resolved once per request and discarded after render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: User,
}

impl Session {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    /// Whether the session user authored a post by `author`.
    ///
    /// Emails are compared exactly; a missing email on either side never matches.
    pub fn is_author(&self, author: &User) -> bool {
        match (&self.user.email, &author.email) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        }
    }
}

impl From<User> for Session {
    fn from(user: User) -> Self {
        Self::new(user)
    }
}
