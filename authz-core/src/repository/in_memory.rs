// authz-core/src/repository/in_memory.rs
//
// 各ポートのインメモリ実装
// テストおよび外部インフラ無しで組み込む用途向け

use crate::domain::inheritance_audit_model::InheritanceAuditEntry;
use crate::domain::inheritance_rule_model::RoleInheritanceRule;
use crate::domain::permission_dependency_model::PermissionDependency;
use crate::domain::permission_model::Permission;
use crate::domain::permission_override_model::UserPermissionOverride;
use crate::domain::role_model::{Role, RolePermission};
use crate::domain::user_model::AuthUser;
use crate::domain::user_role_model::UserRole;
use crate::error::{AppError, AppResult};
use crate::repository::audit_log_repository::InheritanceAuditRepository;
use crate::repository::permission_store::PermissionStore;
use crate::repository::user_repository::UserRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// `PermissionStore` のインメモリ実装
#[derive(Default)]
pub struct InMemoryPermissionStore {
    permissions: RwLock<HashMap<Uuid, Permission>>,
    roles: RwLock<HashMap<Uuid, Role>>,
    role_permissions: RwLock<Vec<RolePermission>>,
    user_roles: RwLock<Vec<UserRole>>,
    inheritance_rules: RwLock<HashMap<Uuid, RoleInheritanceRule>>,
    overrides: RwLock<HashMap<Uuid, UserPermissionOverride>>,
    dependencies: RwLock<Vec<PermissionDependency>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn find_permission_by_id(&self, id: Uuid) -> AppResult<Option<Permission>> {
        Ok(self.permissions.read().await.get(&id).cloned())
    }

    async fn find_permission_by_code(&self, code: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .read()
            .await
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn find_permissions_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Permission>> {
        let permissions = self.permissions.read().await;
        let mut found = Vec::new();
        for id in ids {
            if let Some(permission) = permissions.get(id) {
                if !found.iter().any(|p: &Permission| p.id == *id) {
                    found.push(permission.clone());
                }
            }
        }
        Ok(found)
    }

    async fn find_active_permissions(&self) -> AppResult<Vec<Permission>> {
        let mut active: Vec<Permission> = self
            .permissions
            .read()
            .await
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(active)
    }

    async fn create_permission(&self, permission: Permission) -> AppResult<Permission> {
        self.permissions
            .write()
            .await
            .insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn update_permission(&self, permission: Permission) -> AppResult<Permission> {
        let mut permissions = self.permissions.write().await;
        if !permissions.contains_key(&permission.id) {
            return Err(AppError::NotFound(format!(
                "Permission with identifier {} not found",
                permission.id
            )));
        }
        permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn find_role_by_id(&self, id: Uuid) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(&id).cloned())
    }

    async fn find_role_by_code(
        &self,
        code: &str,
        organization_id: Option<Uuid>,
    ) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|r| r.code == code && r.organization_id == organization_id)
            .cloned())
    }

    async fn create_role(&self, role: Role) -> AppResult<Role> {
        self.roles.write().await.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update_role(&self, role: Role) -> AppResult<Role> {
        let mut roles = self.roles.write().await;
        if !roles.contains_key(&role.id) {
            return Err(AppError::NotFound(format!(
                "Role with identifier {} not found",
                role.id
            )));
        }
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn find_role_permissions(&self, role_id: Uuid) -> AppResult<Vec<RolePermission>> {
        Ok(self
            .role_permissions
            .read()
            .await
            .iter()
            .filter(|rp| rp.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn add_role_permission(&self, grant: RolePermission) -> AppResult<RolePermission> {
        let mut role_permissions = self.role_permissions.write().await;
        if let Some(existing) = role_permissions
            .iter()
            .find(|rp| rp.role_id == grant.role_id && rp.permission_id == grant.permission_id)
        {
            return Ok(existing.clone());
        }
        role_permissions.push(grant.clone());
        Ok(grant)
    }

    async fn remove_role_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> AppResult<bool> {
        let mut role_permissions = self.role_permissions.write().await;
        let before = role_permissions.len();
        role_permissions.retain(|rp| !(rp.role_id == role_id && rp.permission_id == permission_id));
        Ok(role_permissions.len() < before)
    }

    async fn find_active_user_roles(&self, user_id: Uuid) -> AppResult<Vec<UserRole>> {
        Ok(self
            .user_roles
            .read()
            .await
            .iter()
            .filter(|ur| ur.user_id == user_id && ur.is_active)
            .cloned()
            .collect())
    }

    async fn find_user_roles_by_role(&self, role_id: Uuid) -> AppResult<Vec<UserRole>> {
        Ok(self
            .user_roles
            .read()
            .await
            .iter()
            .filter(|ur| ur.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn add_user_role(&self, user_role: UserRole) -> AppResult<UserRole> {
        self.user_roles.write().await.push(user_role.clone());
        Ok(user_role)
    }

    async fn remove_user_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<bool> {
        let mut user_roles = self.user_roles.write().await;
        let before = user_roles.len();
        user_roles.retain(|ur| !(ur.user_id == user_id && ur.role_id == role_id));
        Ok(user_roles.len() < before)
    }

    async fn find_inheritance_rule_by_id(
        &self,
        id: Uuid,
    ) -> AppResult<Option<RoleInheritanceRule>> {
        Ok(self.inheritance_rules.read().await.get(&id).cloned())
    }

    async fn find_rules_by_child(
        &self,
        child_role_id: Uuid,
    ) -> AppResult<Vec<RoleInheritanceRule>> {
        let mut rules: Vec<RoleInheritanceRule> = self
            .inheritance_rules
            .read()
            .await
            .values()
            .filter(|r| r.child_role_id == child_role_id)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(rules)
    }

    async fn find_rules_by_parent(
        &self,
        parent_role_id: Uuid,
    ) -> AppResult<Vec<RoleInheritanceRule>> {
        let mut rules: Vec<RoleInheritanceRule> = self
            .inheritance_rules
            .read()
            .await
            .values()
            .filter(|r| r.parent_role_id == parent_role_id)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(rules)
    }

    async fn create_inheritance_rule(
        &self,
        rule: RoleInheritanceRule,
    ) -> AppResult<RoleInheritanceRule> {
        self.inheritance_rules
            .write()
            .await
            .insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn delete_inheritance_rule(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.inheritance_rules.write().await.remove(&id).is_some())
    }

    async fn find_override_by_id(
        &self,
        id: Uuid,
    ) -> AppResult<Option<UserPermissionOverride>> {
        Ok(self.overrides.read().await.get(&id).cloned())
    }

    async fn find_overrides_by_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<UserPermissionOverride>> {
        Ok(self
            .overrides
            .read()
            .await
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_override(
        &self,
        user_override: UserPermissionOverride,
    ) -> AppResult<UserPermissionOverride> {
        self.overrides
            .write()
            .await
            .insert(user_override.id, user_override.clone());
        Ok(user_override)
    }

    async fn delete_override(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.overrides.write().await.remove(&id).is_some())
    }

    async fn create_permission_dependency(
        &self,
        dependency: PermissionDependency,
    ) -> AppResult<PermissionDependency> {
        self.dependencies.write().await.push(dependency.clone());
        Ok(dependency)
    }

    async fn find_dependencies_for_permission(
        &self,
        permission_id: Uuid,
    ) -> AppResult<Vec<PermissionDependency>> {
        Ok(self
            .dependencies
            .read()
            .await
            .iter()
            .filter(|d| d.permission_id == permission_id)
            .cloned()
            .collect())
    }
}

/// `UserRepository` のインメモリ実装
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, AuthUser>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: AuthUser) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<AuthUser>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

/// `InheritanceAuditRepository` のインメモリ実装
#[derive(Default)]
pub struct InMemoryInheritanceAuditRepository {
    entries: RwLock<Vec<InheritanceAuditEntry>>,
}

impl InMemoryInheritanceAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl InheritanceAuditRepository for InMemoryInheritanceAuditRepository {
    async fn append(&self, entry: InheritanceAuditEntry) -> AppResult<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn find_by_role(
        &self,
        role_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<InheritanceAuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| {
                e.role_id == Some(role_id)
                    || e.parent_role_id == Some(role_id)
                    || e.child_role_id == Some(role_id)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<InheritanceAuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.user_id == Some(user_id))
            .take(limit)
            .cloned()
            .collect())
    }
}
