mod routes;
mod state;

pub mod app;
pub mod config;
pub mod explain;

pub use app::{build_router, build_state, start_app};
pub use routes::{ExplainedPrediction, PREDICT_ROUTE};
pub use state::SharedState;
