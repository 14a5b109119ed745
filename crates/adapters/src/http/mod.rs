mod error;
mod health_handler;
mod logs_handler;
mod metrics_handler;
mod openapi;
mod router;
mod server;
mod state;

pub use router::build_router;
pub use server::run_http_server;
pub use state::AppState;
