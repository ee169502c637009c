// authz-core/src/service/permission_admin_service.rs
//
// 権限・ロール・メンバーシップのライフサイクル管理

use crate::domain::inheritance_audit_model::InheritanceAuditAction;
use crate::domain::permission_dependency_model::PermissionDependency;
use crate::domain::permission_model::Permission;
use crate::domain::role_model::{Role, RolePermission};
use crate::domain::user_role_model::{RoleScope, UserRole};
use crate::error::AppResult;
use crate::log_with_context;
use crate::repository::permission_store::PermissionStore;
use crate::repository::user_repository::UserRepository;
use crate::service::audit_log_service::InheritanceAuditService;
use crate::service::permission_cache_service::PermissionCacheService;
use crate::service::role_inheritance_service::RoleInheritanceService;
use crate::utils::error_helper::{conflict_error, not_found_error, validation_error};
use crate::utils::validation::{validate_permission_code, validate_role_code};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct PermissionAdminService {
    store: Arc<dyn PermissionStore>,
    user_repository: Arc<dyn UserRepository>,
    inheritance_service: Arc<RoleInheritanceService>,
    audit_service: Arc<InheritanceAuditService>,
    cache_service: Arc<PermissionCacheService>,
}

impl PermissionAdminService {
    pub fn new(
        store: Arc<dyn PermissionStore>,
        user_repository: Arc<dyn UserRepository>,
        inheritance_service: Arc<RoleInheritanceService>,
        audit_service: Arc<InheritanceAuditService>,
        cache_service: Arc<PermissionCacheService>,
    ) -> Self {
        Self {
            store,
            user_repository,
            inheritance_service,
            audit_service,
            cache_service,
        }
    }

    /// 権限を登録する
    pub async fn create_permission(
        &self,
        code: &str,
        name: &str,
        description: Option<String>,
    ) -> AppResult<Permission> {
        const CONTEXT: &str = "permission_admin_service::create_permission";

        validate_permission_code(code).map_err(|_| {
            validation_error("code", "must be in 'category.action' format")
        })?;

        if self.store.find_permission_by_code(code).await?.is_some() {
            return Err(conflict_error("Permission code already exists", CONTEXT));
        }

        let mut permission = Permission::new(code, name);
        permission.description = description;
        let permission = self.store.create_permission(permission).await?;

        log_with_context!(
            tracing::Level::INFO,
            "Permission created",
            "permission_id" => permission.id,
            "code" => &permission.code
        );

        Ok(permission)
    }

    /// 権限を退役させる
    ///
    /// キャッシュ済みの解決結果にはTTLまで残りうる（許容される整合性境界）。
    pub async fn deactivate_permission(&self, permission_id: Uuid) -> AppResult<Permission> {
        const CONTEXT: &str = "permission_admin_service::deactivate_permission";

        let mut permission = self
            .store
            .find_permission_by_id(permission_id)
            .await?
            .ok_or_else(|| not_found_error("Permission", &permission_id.to_string(), CONTEXT))?;

        permission.is_active = false;
        permission.updated_at = Utc::now();
        let permission = self.store.update_permission(permission).await?;

        log_with_context!(
            tracing::Level::INFO,
            "Permission deactivated",
            "permission_id" => permission.id,
            "code" => &permission.code
        );

        Ok(permission)
    }

    /// ロールを作成する
    pub async fn create_role(
        &self,
        code: &str,
        name: &str,
        organization_id: Option<Uuid>,
    ) -> AppResult<Role> {
        const CONTEXT: &str = "permission_admin_service::create_role";

        validate_role_code(code).map_err(|_| {
            validation_error("code", "must contain only lowercase letters, digits and underscores")
        })?;

        if self
            .store
            .find_role_by_code(code, organization_id)
            .await?
            .is_some()
        {
            return Err(conflict_error(
                "Role code already exists in this organization scope",
                CONTEXT,
            ));
        }

        let role = self
            .store
            .create_role(Role::new(code, name, organization_id))
            .await?;

        log_with_context!(
            tracing::Level::INFO,
            "Role created",
            "role_id" => role.id,
            "code" => &role.code,
            "organization_id" => role.organization_id
        );

        Ok(role)
    }

    /// ロールを退役させ、保持者のキャッシュを無効化する
    pub async fn deactivate_role(&self, role_id: Uuid) -> AppResult<Role> {
        const CONTEXT: &str = "permission_admin_service::deactivate_role";

        let mut role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| not_found_error("Role", &role_id.to_string(), CONTEXT))?;

        role.is_active = false;
        role.updated_at = Utc::now();
        let role = self.store.update_role(role).await?;

        self.inheritance_service
            .invalidate_affected_users(role.id)
            .await?;

        log_with_context!(
            tracing::Level::INFO,
            "Role deactivated",
            "role_id" => role.id,
            "code" => &role.code
        );

        Ok(role)
    }

    /// ユーザーにロールを割り当てる
    pub async fn assign_role_to_user(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        scope: RoleScope,
        is_primary: bool,
        performed_by: Uuid,
    ) -> AppResult<UserRole> {
        const CONTEXT: &str = "permission_admin_service::assign_role_to_user";

        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| not_found_error("User", &user_id.to_string(), CONTEXT))?;
        self.store
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| not_found_error("Role", &role_id.to_string(), CONTEXT))?;

        let duplicate = self
            .store
            .find_active_user_roles(user_id)
            .await?
            .into_iter()
            .any(|m| m.role_id == role_id && m.scope() == scope);
        if duplicate {
            return Err(conflict_error(
                "User already holds this role in this scope",
                CONTEXT,
            ));
        }

        let mut membership = UserRole::new(user_id, role_id, scope, performed_by);
        membership.is_primary = is_primary;
        let membership = self.store.add_user_role(membership).await?;

        self.cache_service
            .invalidate_user(user_id, scope.organization_id, scope.department_id)
            .await;

        log_with_context!(
            tracing::Level::INFO,
            "Role assigned to user",
            "user_id" => user_id,
            "role_id" => role_id,
            "organization_id" => scope.organization_id,
            "department_id" => scope.department_id
        );

        Ok(membership)
    }

    /// ユーザーからロールを外す
    pub async fn remove_user_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<()> {
        const CONTEXT: &str = "permission_admin_service::remove_user_role";

        let removed = self.store.remove_user_role(user_id, role_id).await?;
        if !removed {
            return Err(not_found_error(
                "User role",
                &format!("{}/{}", user_id, role_id),
                CONTEXT,
            ));
        }

        self.cache_service.invalidate_user(user_id, None, None).await;

        log_with_context!(
            tracing::Level::INFO,
            "Role removed from user",
            "user_id" => user_id,
            "role_id" => role_id
        );

        Ok(())
    }

    /// ロールへ単一の権限を付与する
    pub async fn grant_permission_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        performed_by: Uuid,
    ) -> AppResult<RolePermission> {
        const CONTEXT: &str = "permission_admin_service::grant_permission_to_role";

        let role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| not_found_error("Role", &role_id.to_string(), CONTEXT))?;
        self.store
            .find_permission_by_id(permission_id)
            .await?
            .ok_or_else(|| not_found_error("Permission", &permission_id.to_string(), CONTEXT))?;

        self.audit_service
            .log_role_permission_change(
                performed_by,
                InheritanceAuditAction::PermissionGranted,
                role.id,
                &[permission_id],
                None,
            )
            .await?;
        let grant = self
            .store
            .add_role_permission(RolePermission::new(role.id, permission_id, performed_by))
            .await?;

        self.inheritance_service
            .invalidate_affected_users(role.id)
            .await?;

        Ok(grant)
    }

    /// ロールから単一の権限を剥奪する
    pub async fn revoke_permission_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        performed_by: Uuid,
    ) -> AppResult<()> {
        const CONTEXT: &str = "permission_admin_service::revoke_permission_from_role";

        let role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| not_found_error("Role", &role_id.to_string(), CONTEXT))?;

        self.audit_service
            .log_role_permission_change(
                performed_by,
                InheritanceAuditAction::PermissionRevoked,
                role.id,
                &[permission_id],
                None,
            )
            .await?;
        let removed = self
            .store
            .remove_role_permission(role.id, permission_id)
            .await?;
        if !removed {
            return Err(not_found_error(
                "Role permission",
                &format!("{}/{}", role_id, permission_id),
                CONTEXT,
            ));
        }

        self.inheritance_service
            .invalidate_affected_users(role.id)
            .await?;

        Ok(())
    }

    /// 権限間の依存を宣言する
    ///
    /// 宣言は参考情報であり、付与時の自動展開や強制は行わない。
    pub async fn add_permission_dependency(
        &self,
        permission_id: Uuid,
        requires_permission_id: Uuid,
    ) -> AppResult<PermissionDependency> {
        const CONTEXT: &str = "permission_admin_service::add_permission_dependency";

        if permission_id == requires_permission_id {
            return Err(validation_error(
                "requires_permission_id",
                "a permission cannot require itself",
            ));
        }

        self.store
            .find_permission_by_id(permission_id)
            .await?
            .ok_or_else(|| not_found_error("Permission", &permission_id.to_string(), CONTEXT))?;
        self.store
            .find_permission_by_id(requires_permission_id)
            .await?
            .ok_or_else(|| {
                not_found_error("Permission", &requires_permission_id.to_string(), CONTEXT)
            })?;

        let duplicate = self
            .store
            .find_dependencies_for_permission(permission_id)
            .await?
            .into_iter()
            .any(|d| d.requires_permission_id == requires_permission_id);
        if duplicate {
            return Err(conflict_error("Dependency already declared", CONTEXT));
        }

        self.store
            .create_permission_dependency(PermissionDependency::new(
                permission_id,
                requires_permission_id,
            ))
            .await
    }

    /// 権限の依存宣言を一覧する
    pub async fn list_permission_dependencies(
        &self,
        permission_id: Uuid,
    ) -> AppResult<Vec<PermissionDependency>> {
        self.store
            .find_dependencies_for_permission(permission_id)
            .await
    }
}
