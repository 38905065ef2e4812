/// Storage layout of one collection: its name and the body keys that must stay unique
/// among live (not soft-deleted) documents.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub unique: &'static [&'static [&'static str]],
}

impl CollectionSpec {
    pub const fn new(name: &'static str, unique: &'static [&'static [&'static str]]) -> Self {
        Self { name, unique }
    }
}

pub const PERMISSIONS: CollectionSpec = CollectionSpec::new("permissions", &[&["apiPath", "method"]]);
pub const ROLES: CollectionSpec = CollectionSpec::new("roles", &[&["name"]]);
pub const USERS: CollectionSpec = CollectionSpec::new("users", &[&["email"]]);
pub const COMPANIES: CollectionSpec = CollectionSpec::new("companies", &[]);
pub const JOBS: CollectionSpec = CollectionSpec::new("jobs", &[]);
pub const RESUMES: CollectionSpec = CollectionSpec::new("resumes", &[]);
pub const SUBSCRIBERS: CollectionSpec = CollectionSpec::new("subscribers", &[&["email"]]);

pub const ALL: &[CollectionSpec] = &[PERMISSIONS, ROLES, USERS, COMPANIES, JOBS, RESUMES, SUBSCRIBERS];
