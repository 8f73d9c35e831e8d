pub mod error;
pub mod middleware;
pub mod queue;
pub mod routes;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use queue::JobProducer;
pub use routes::create_router;
pub use state::AppState;
