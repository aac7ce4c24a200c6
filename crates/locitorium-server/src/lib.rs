//! locitorium HTTP surface: one `GET /` endpoint that runs the resolution
//! pipeline on a query string.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
