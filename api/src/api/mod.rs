pub mod error;
pub mod extract;
pub mod handlers;
pub mod server;
pub mod state;
pub mod utils;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
