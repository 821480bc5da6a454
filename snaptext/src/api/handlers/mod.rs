pub mod extract;
pub(crate) mod health;

pub use extract::{extract_text, preflight};
pub use health::health_check;
