pub mod auth;
pub mod response;
pub mod route_policy;

pub use auth::{authorization_guard, AuthUser};
pub use response::{ApiResponse, ApiResult, JsonBody};
pub use route_policy::{RouteAccess, RouteEntry, RoutePolicy};
