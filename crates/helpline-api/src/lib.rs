//! Helpline API crate - axum HTTP surface over the dialogue engine.
//!
//! Accepts `{user_id, message}` on `/chat` and answers `{user_id, response}`.
//! The engine sits behind one store-wide lock so turns never interleave.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
