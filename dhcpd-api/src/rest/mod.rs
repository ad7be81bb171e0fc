//! REST surface: access gate, route table and resolvers.

pub mod auth;
pub mod dispatch;
pub mod handlers;
pub mod routes;

pub use auth::Credentials;
pub use dispatch::{Endpoint, PathParams, RouteError, RouteTable};
pub use handlers::{ApiError, AppState};
pub use routes::{ApiDoc, OPENAPI_PATH, create_router};
