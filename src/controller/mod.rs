pub mod auth;
mod home;
pub mod post;

pub(crate) use home::*;
