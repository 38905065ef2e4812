use axum::http::Method;
use std::collections::HashMap;

/// Access rule for one (method, route template) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteAccess {
    /// Reachable without a token
    pub public: bool,
    /// Any authenticated caller may use it
    pub skip_permission_check: bool,
}

impl RouteAccess {
    pub const PROTECTED: RouteAccess = RouteAccess {
        public: false,
        skip_permission_check: false,
    };
    pub const PUBLIC: RouteAccess = RouteAccess {
        public: true,
        skip_permission_check: false,
    };
    pub const SKIP_PERMISSION: RouteAccess = RouteAccess {
        public: false,
        skip_permission_check: true,
    };
}

/// One registered route: the template as the router matches it, plus the
/// display name and module used when seeding permission records.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
    pub name: &'static str,
    pub module: &'static str,
    pub access: RouteAccess,
}

const ROUTES: &[(&str, &str, &str, &str, RouteAccess)] = &[
    ("POST", "/auth/login", "Login", "AUTH", RouteAccess::PUBLIC),
    ("POST", "/auth/register", "Register a new user", "AUTH", RouteAccess::PUBLIC),
    ("GET", "/auth/refresh", "Refresh the token pair", "AUTH", RouteAccess::PUBLIC),
    ("GET", "/auth/account", "Get the current account", "AUTH", RouteAccess::PROTECTED),
    ("POST", "/auth/logout", "Logout", "AUTH", RouteAccess::PROTECTED),
    ("POST", "/users", "Create a user", "USERS", RouteAccess::PROTECTED),
    ("GET", "/users", "List users with paginate", "USERS", RouteAccess::PROTECTED),
    ("GET", "/users/:id", "Get user by id", "USERS", RouteAccess::PUBLIC),
    ("PATCH", "/users/:id", "Update a user", "USERS", RouteAccess::PROTECTED),
    ("DELETE", "/users/:id", "Delete a user", "USERS", RouteAccess::PROTECTED),
    ("POST", "/companies", "Create a company", "COMPANIES", RouteAccess::PROTECTED),
    ("GET", "/companies", "List companies with paginate", "COMPANIES", RouteAccess::PUBLIC),
    ("GET", "/companies/:id", "Get company by id", "COMPANIES", RouteAccess::PUBLIC),
    ("PATCH", "/companies/:id", "Update a company", "COMPANIES", RouteAccess::PROTECTED),
    ("DELETE", "/companies/:id", "Delete a company", "COMPANIES", RouteAccess::PROTECTED),
    ("POST", "/jobs", "Create a job", "JOBS", RouteAccess::PROTECTED),
    ("GET", "/jobs", "List jobs with paginate", "JOBS", RouteAccess::PUBLIC),
    ("GET", "/jobs/:id", "Get job by id", "JOBS", RouteAccess::PUBLIC),
    ("PATCH", "/jobs/:id", "Update a job", "JOBS", RouteAccess::PROTECTED),
    ("DELETE", "/jobs/:id", "Delete a job", "JOBS", RouteAccess::PROTECTED),
    ("POST", "/roles", "Create a role", "ROLES", RouteAccess::PROTECTED),
    ("GET", "/roles", "List roles with paginate", "ROLES", RouteAccess::PROTECTED),
    ("GET", "/roles/:id", "Get role by id", "ROLES", RouteAccess::PROTECTED),
    ("PATCH", "/roles/:id", "Update a role", "ROLES", RouteAccess::PROTECTED),
    ("DELETE", "/roles/:id", "Delete a role", "ROLES", RouteAccess::PROTECTED),
    ("POST", "/permissions", "Create a permission", "PERMISSIONS", RouteAccess::PROTECTED),
    ("GET", "/permissions", "List permissions with paginate", "PERMISSIONS", RouteAccess::PROTECTED),
    ("GET", "/permissions/:id", "Get permission by id", "PERMISSIONS", RouteAccess::PROTECTED),
    ("PATCH", "/permissions/:id", "Update a permission", "PERMISSIONS", RouteAccess::PROTECTED),
    ("DELETE", "/permissions/:id", "Delete a permission", "PERMISSIONS", RouteAccess::PROTECTED),
    ("POST", "/resumes", "Submit a resume", "RESUMES", RouteAccess::SKIP_PERMISSION),
    ("POST", "/resumes/by-user", "List the caller's resumes", "RESUMES", RouteAccess::SKIP_PERMISSION),
    ("GET", "/resumes", "List resumes with paginate", "RESUMES", RouteAccess::PROTECTED),
    ("GET", "/resumes/:id", "Get resume by id", "RESUMES", RouteAccess::PROTECTED),
    ("PATCH", "/resumes/:id", "Update resume status", "RESUMES", RouteAccess::PROTECTED),
    ("DELETE", "/resumes/:id", "Delete a resume", "RESUMES", RouteAccess::PROTECTED),
    ("POST", "/subscribers", "Create a subscriber", "SUBSCRIBERS", RouteAccess::SKIP_PERMISSION),
    ("PATCH", "/subscribers", "Update own subscription", "SUBSCRIBERS", RouteAccess::SKIP_PERMISSION),
    ("POST", "/subscribers/skills", "Get own subscribed skills", "SUBSCRIBERS", RouteAccess::SKIP_PERMISSION),
    ("GET", "/subscribers", "List subscribers with paginate", "SUBSCRIBERS", RouteAccess::PROTECTED),
    ("GET", "/subscribers/:id", "Get subscriber by id", "SUBSCRIBERS", RouteAccess::PROTECTED),
    ("PATCH", "/subscribers/:id", "Update a subscriber", "SUBSCRIBERS", RouteAccess::PROTECTED),
    ("DELETE", "/subscribers/:id", "Delete a subscriber", "SUBSCRIBERS", RouteAccess::PROTECTED),
    ("GET", "/mail", "Send the job digest", "MAIL", RouteAccess::PROTECTED),
];

/// Capability table for every route under the API prefix.
/// Routes missing from the table are treated as protected.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    prefix: String,
    entries: Vec<RouteEntry>,
    index: HashMap<(Method, String), RouteAccess>,
}

impl RoutePolicy {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/').to_string();
        let entries: Vec<RouteEntry> = ROUTES
            .iter()
            .filter_map(|(method, path, name, module, access)| {
                Some(RouteEntry {
                    method: Method::from_bytes(method.as_bytes()).ok()?,
                    path: format!("{}{}", prefix, path),
                    name: *name,
                    module: *module,
                    access: *access,
                })
            })
            .collect();
        let index = entries
            .iter()
            .map(|e| ((e.method.clone(), e.path.clone()), e.access))
            .collect();

        Self { prefix, entries, index }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full route template for a path relative to the prefix
    pub fn path(&self, relative: &str) -> String {
        format!("{}{}", self.prefix, relative)
    }

    pub fn access(&self, method: &Method, route: &str) -> RouteAccess {
        self.index
            .get(&(method.clone(), route.to_string()))
            .copied()
            .unwrap_or(RouteAccess::PROTECTED)
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// True when `route` is the auth namespace itself or lies below it
    pub fn in_auth_namespace(&self, route: &str) -> bool {
        let namespace = format!("{}/auth", self.prefix);
        route == namespace || route.starts_with(&format!("{}/", namespace))
    }

    /// Routes that need an explicit permission grant
    pub fn permission_routes(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries
            .iter()
            .filter(|e| !e.access.public && !e.access.skip_permission_check && !self.in_auth_namespace(&e.path))
    }
}
