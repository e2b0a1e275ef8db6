use derive_masked::DebugMasked;
use serde::Deserialize;

#[derive(Clone, DebugMasked, Deserialize)]
pub struct Credentials {
    pub email: String,
    #[masked]
    pub password: String,
    pub next: Option<String>,
}
