use serde::Serialize;
use tracing::info;

use super::permission_service::PermissionService;
use super::role_service::RoleService;
use super::user_service::UserService;
use super::ServiceResult;
use crate::auth::password::hash_password;
use crate::config::BootstrapConfig;
use crate::database::models::role::{ADMIN_ROLE, USER_ROLE};
use crate::database::models::{Audit, Permission, Role, User};
use crate::middleware::RoutePolicy;

/// How many records each seeding stage inserted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub permissions: usize,
    pub roles: usize,
    pub users: usize,
}

/// First-boot seeding. Each collection is seeded only while it is empty, so reruns are no-ops.
#[derive(Clone)]
pub struct BootstrapService {
    permissions: PermissionService,
    roles: RoleService,
    users: UserService,
    config: BootstrapConfig,
    policy: RoutePolicy,
}

impl BootstrapService {
    pub fn new(
        permissions: PermissionService,
        roles: RoleService,
        users: UserService,
        config: BootstrapConfig,
        policy: RoutePolicy,
    ) -> Self {
        Self {
            permissions,
            roles,
            users,
            config,
            policy,
        }
    }

    pub async fn run(&self) -> ServiceResult<BootstrapReport> {
        if !self.config.should_init {
            info!("SHOULD_INIT is off, skipping bootstrap");
            return Ok(BootstrapReport::default());
        }

        let report = BootstrapReport {
            permissions: self.seed_permissions().await?,
            roles: self.seed_roles().await?,
            users: self.seed_users().await?,
        };
        info!(
            "bootstrap finished: {} permissions, {} roles, {} users inserted",
            report.permissions, report.roles, report.users
        );
        Ok(report)
    }

    async fn seed_permissions(&self) -> ServiceResult<usize> {
        if self.permissions.count().await? > 0 {
            return Ok(0);
        }
        let permissions: Vec<Permission> = self
            .policy
            .permission_routes()
            .map(|route| Permission {
                name: route.name.to_string(),
                api_path: route.path.clone(),
                method: route.method.as_str().to_string(),
                module: route.module.to_string(),
                audit: Audit::default(),
            })
            .collect();
        self.permissions.insert_many(&permissions).await
    }

    async fn seed_roles(&self) -> ServiceResult<usize> {
        if self.roles.count().await? > 0 {
            return Ok(0);
        }
        let roles = [
            Role {
                name: ADMIN_ROLE.to_string(),
                description: "Admin has full permissions".to_string(),
                is_active: true,
                permissions: self.permissions.all_ids().await?,
                audit: Audit::default(),
            },
            Role {
                name: USER_ROLE.to_string(),
                description: "Regular user of the system".to_string(),
                is_active: true,
                permissions: vec![],
                audit: Audit::default(),
            },
        ];
        self.roles.insert_many(&roles).await
    }

    async fn seed_users(&self) -> ServiceResult<usize> {
        if self.users.count().await? > 0 {
            return Ok(0);
        }
        let admin_role = self.roles.find_by_name(ADMIN_ROLE).await?.map(|r| r.id);
        let user_role = self.roles.find_by_name(USER_ROLE).await?.map(|r| r.id);
        let password = hash_password(&self.config.init_password)?;

        let seed = |name: &str, email: &str, role| User {
            name: name.to_string(),
            email: email.to_string(),
            password: password.clone(),
            age: None,
            gender: None,
            address: None,
            role,
            company: None,
            refresh_token: None,
            audit: Audit::default(),
        };
        let users = [
            seed("I'm admin", &self.config.admin_email, admin_role),
            seed("I'm normal user", &self.config.sample_user_email, user_role),
        ];
        self.users.insert_many(&users).await
    }
}
