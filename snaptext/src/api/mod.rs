mod frontend;
pub mod handlers;
pub mod openapi;
pub mod response;
mod routes;
mod state;

pub use routes::{create_router, CONTENT_SECURITY_POLICY};
pub use state::AppState;
