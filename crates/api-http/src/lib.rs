// UWS HTTP Surface
// Implements: the route table and UWS/VOSI XML rendering (spec §6), replacing
// the teacher's JSON-RPC layer.

mod auth;
mod error;
mod params;
mod routes;
mod state;
mod xml;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
