// handlers/mod.rs - HTTP handlers, one module per resource
//
// Access rules live in middleware::route_policy; handlers only see requests the
// guard let through. Protected handlers take `AuthUser` to stamp the actor.
pub mod auth;
pub mod companies;
pub mod jobs;
pub mod mail;
pub mod permissions;
pub mod resumes;
pub mod roles;
pub mod subscribers;
pub mod system;
pub mod users;

use std::collections::HashMap;

use crate::app::AppState;
use crate::filter::ListQuery;

/// Paging, sort and filters from a list endpoint's query string
pub(crate) fn list_query(state: &AppState, params: &HashMap<String, String>) -> ListQuery {
    let filter = &state.config.filter;
    ListQuery::from_params(params, filter.default_page_size, filter.max_limit)
}
