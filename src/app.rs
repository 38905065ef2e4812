use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::handlers;
use crate::mail::Mailer;
use crate::middleware::{authorization_guard, RoutePolicy};
use crate::services::{
    AuthService, BootstrapService, CompanyService, JobService, MailService, PermissionService, ResumeService, RoleService,
    SubscriberService, UserService,
};

/// Shared handles for every request. Cloning is cheap: services hold `Arc`ed stores.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub policy: Arc<RoutePolicy>,
    pub tokens: TokenIssuer,
    pub auth: AuthService,
    pub users: UserService,
    pub companies: CompanyService,
    pub jobs: JobService,
    pub roles: RoleService,
    pub permissions: PermissionService,
    pub resumes: ResumeService,
    pub subscribers: SubscriberService,
    pub mail: MailService,
    pub bootstrap: BootstrapService,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>) -> Self {
        let policy = RoutePolicy::new(&config.server.api_prefix);
        let tokens = TokenIssuer::new(&config.security);

        let users = UserService::new(store.clone(), config.bootstrap.admin_email.clone());
        let roles = RoleService::new(store.clone());
        let permissions = PermissionService::new(store.clone());
        let jobs = JobService::new(store.clone());
        let subscribers = SubscriberService::new(store.clone());

        Self {
            auth: AuthService::new(users.clone(), roles.clone(), tokens.clone()),
            companies: CompanyService::new(store.clone()),
            resumes: ResumeService::new(store.clone()),
            mail: MailService::new(subscribers.clone(), jobs.clone(), mailer),
            bootstrap: BootstrapService::new(
                permissions.clone(),
                roles.clone(),
                users.clone(),
                config.bootstrap.clone(),
                policy.clone(),
            ),
            policy: Arc::new(policy),
            users,
            roles,
            permissions,
            jobs,
            subscribers,
            tokens,
            store,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .merge(api_routes(&state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every route under the API prefix, behind the authorization guard.
/// `route_layer` keeps unmatched paths a plain 404.
fn api_routes(state: &AppState) -> Router<AppState> {
    use handlers::{auth, companies, jobs, mail, permissions, resumes, roles, subscribers, users};

    let p = |relative: &str| state.policy.path(relative);

    Router::new()
        // Auth
        .route(&p("/auth/login"), post(auth::login))
        .route(&p("/auth/register"), post(auth::register))
        .route(&p("/auth/account"), get(auth::account))
        .route(&p("/auth/refresh"), get(auth::refresh))
        .route(&p("/auth/logout"), post(auth::logout))
        // Users
        .route(&p("/users"), post(users::create).get(users::list))
        .route(&p("/users/:id"), get(users::get).patch(users::update).delete(users::remove))
        // Companies
        .route(&p("/companies"), post(companies::create).get(companies::list))
        .route(
            &p("/companies/:id"),
            get(companies::get).patch(companies::update).delete(companies::remove),
        )
        // Jobs
        .route(&p("/jobs"), post(jobs::create).get(jobs::list))
        .route(&p("/jobs/:id"), get(jobs::get).patch(jobs::update).delete(jobs::remove))
        // Roles
        .route(&p("/roles"), post(roles::create).get(roles::list))
        .route(&p("/roles/:id"), get(roles::get).patch(roles::update).delete(roles::remove))
        // Permissions
        .route(&p("/permissions"), post(permissions::create).get(permissions::list))
        .route(
            &p("/permissions/:id"),
            get(permissions::get).patch(permissions::update).delete(permissions::remove),
        )
        // Resumes
        .route(&p("/resumes"), post(resumes::create).get(resumes::list))
        .route(&p("/resumes/by-user"), post(resumes::by_user))
        .route(&p("/resumes/:id"), get(resumes::get).patch(resumes::update).delete(resumes::remove))
        // Subscribers
        .route(
            &p("/subscribers"),
            post(subscribers::create).get(subscribers::list).patch(subscribers::update_self),
        )
        .route(&p("/subscribers/skills"), post(subscribers::skills))
        .route(
            &p("/subscribers/:id"),
            get(subscribers::get).patch(subscribers::update).delete(subscribers::remove),
        )
        // Mail
        .route(&p("/mail"), get(mail::send_digest))
        .route_layer(middleware::from_fn_with_state(state.clone(), authorization_guard))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.is_development() {
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::StoreBackend;
    use crate::database::DatabaseManager;
    use crate::mail::LogMailer;

    async fn app() -> (Router, String) {
        let mut config = AppConfig::development();
        config.database.backend = StoreBackend::Memory;
        let config = Arc::new(config);
        let store = DatabaseManager::connect_store(&config).await.unwrap();
        let prefix = config.server.api_prefix.clone();
        (build_router(AppState::new(config, store, Arc::new(LogMailer))), prefix)
    }

    async fn status(app: &Router, uri: String) -> StatusCode {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        app.clone().oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn guard_applies_to_matched_api_routes_only() {
        let (app, prefix) = app().await;
        assert_eq!(status(&app, "/health".into()).await, StatusCode::OK);
        assert_eq!(status(&app, format!("{}/jobs", prefix)).await, StatusCode::OK);
        assert_eq!(status(&app, format!("{}/users", prefix)).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(&app, format!("{}/missing", prefix)).await, StatusCode::NOT_FOUND);
    }
}
