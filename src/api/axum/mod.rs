mod cors;
mod error;
mod handlers;
mod layer;
mod middleware;
mod routes;

pub use cors::session_cors;
pub use error::AppError;
pub use layer::{SessionContext, SessionHandle, session_layer};
pub use middleware::AuthenticatedSession;
pub use routes::{session_routes, with_session_layer};
