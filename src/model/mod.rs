mod credentials;
mod post;
mod session;
mod user;

pub use credentials::*;
pub use post::*;
pub use session::*;
pub use user::*;
