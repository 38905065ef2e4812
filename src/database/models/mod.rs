pub mod audit;
pub mod company;
pub mod job;
pub mod permission;
pub mod resume;
pub mod role;
pub mod subscriber;
pub mod user;

pub use audit::{Actor, Audit};
pub use company::{Company, CompanyRef};
pub use job::Job;
pub use permission::Permission;
pub use resume::{Resume, ResumeHistory, ResumeStatus};
pub use role::Role;
pub use subscriber::Subscriber;
pub use user::{User, UserView};
