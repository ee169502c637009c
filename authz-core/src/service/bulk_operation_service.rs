// authz-core/src/service/bulk_operation_service.rs
//
// 権限の一括付与・剥奪
// 対象を順に処理し、個別の失敗はバッチを中断せず結果に記録する

use crate::domain::bulk_operation_model::{
    BulkOperationFailure, BulkOperationResult, BulkPermissionOperation,
    BulkPermissionOperationInput, BulkTargetType,
};
use crate::domain::inheritance_audit_model::InheritanceAuditAction;
use crate::domain::permission_model::Permission;
use crate::domain::permission_override_model::{OverrideAction, UserPermissionOverride};
use crate::domain::role_model::RolePermission;
use crate::error::AppResult;
use crate::log_with_context;
use crate::repository::permission_store::PermissionStore;
use crate::repository::user_repository::UserRepository;
use crate::service::audit_log_service::InheritanceAuditService;
use crate::service::permission_cache_service::PermissionCacheService;
use crate::service::role_inheritance_service::RoleInheritanceService;
use crate::utils::error_helper::{
    convert_validation_errors, not_found_error, validation_error,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct BulkPermissionOperationService {
    store: Arc<dyn PermissionStore>,
    user_repository: Arc<dyn UserRepository>,
    inheritance_service: Arc<RoleInheritanceService>,
    audit_service: Arc<InheritanceAuditService>,
    cache_service: Arc<PermissionCacheService>,
}

impl BulkPermissionOperationService {
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

    /// 一括操作を実行する
    ///
    /// 入力の形式と列挙値は先頭で検証して即座にエラーにする。対象単位の
    /// 問題（未知のidなど）は結果の `failures` に積み、残りの処理を続ける。
    /// キャッシュ無効化はバッチ完了後に影響ユーザーごとに一度だけ行う。
    pub async fn execute(
        &self,
        input: BulkPermissionOperationInput,
        performed_by: Uuid,
    ) -> AppResult<BulkOperationResult> {
        const CONTEXT: &str = "bulk_operation_service::execute";

        input
            .validate()
            .map_err(|e| convert_validation_errors(e, CONTEXT))?;

        let operation = BulkPermissionOperation::from_str(&input.operation)
            .ok_or_else(|| validation_error("operation", "must be either 'grant' or 'revoke'"))?;
        let target_type = BulkTargetType::from_str(&input.target_type)
            .ok_or_else(|| validation_error("target_type", "must be either 'roles' or 'users'"))?;

        log_with_context!(
            tracing::Level::DEBUG,
            "Executing bulk permission operation",
            "operation" => operation.as_str(),
            "target_type" => target_type.as_str(),
            "target_count" => input.target_ids.len(),
            "permission_count" => input.permission_ids.len(),
            "performed_by" => performed_by
        );

        let reason = input.reason.as_deref();
        let mut failures: Vec<BulkOperationFailure> = Vec::new();
        let mut affected_users: HashSet<Uuid> = HashSet::new();

        for target_id in &input.target_ids {
            let outcome = match target_type {
                BulkTargetType::Roles => {
                    self.apply_to_role(
                        *target_id,
                        &input.permission_ids,
                        operation,
                        performed_by,
                        reason,
                    )
                    .await
                }
                BulkTargetType::Users => {
                    self.apply_to_user(
                        *target_id,
                        &input.permission_ids,
                        operation,
                        performed_by,
                        reason,
                    )
                    .await
                }
            };

            match outcome {
                Ok(users) => affected_users.extend(users),
                Err(e) => failures.push(BulkOperationFailure {
                    target_id: *target_id,
                    error_message: e.to_string(),
                }),
            }
        }

        // バッチ全体で一度だけ無効化する
        for user_id in &affected_users {
            self.cache_service.invalidate_user(*user_id, None, None).await;
        }

        let result = BulkOperationResult {
            operation: operation.as_str().to_string(),
            target_type: target_type.as_str().to_string(),
            success_count: input.target_ids.len() - failures.len(),
            failure_count: failures.len(),
            failures,
        };

        log_with_context!(
            tracing::Level::INFO,
            "Bulk permission operation completed",
            "operation" => operation.as_str(),
            "target_type" => target_type.as_str(),
            "status" => result.status(),
            "success_count" => result.success_count,
            "failure_count" => result.failure_count,
            "affected_users" => affected_users.len()
        );

        Ok(result)
    }

    /// 指定された権限を全件解決する（1件でも未知ならエラー）
    async fn resolve_permissions(
        &self,
        permission_ids: &[Uuid],
        context: &str,
    ) -> AppResult<Vec<Permission>> {
        let permissions = self.store.find_permissions_by_ids(permission_ids).await?;
        if permissions.len() != permission_ids.len() {
            let found: HashSet<Uuid> = permissions.iter().map(|p| p.id).collect();
            let missing = permission_ids
                .iter()
                .find(|id| !found.contains(id))
                .map(|id| id.to_string())
                .unwrap_or_default();
            return Err(not_found_error("Permission", &missing, context));
        }
        Ok(permissions)
    }

    async fn apply_to_role(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
        operation: BulkPermissionOperation,
        performed_by: Uuid,
        reason: Option<&str>,
    ) -> AppResult<HashSet<Uuid>> {
        const CONTEXT: &str = "bulk_operation_service::apply_to_role";

        let role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| not_found_error("Role", &role_id.to_string(), CONTEXT))?;
        let permissions = self.resolve_permissions(permission_ids, CONTEXT).await?;

        let audit_action = match operation {
            BulkPermissionOperation::Grant => InheritanceAuditAction::PermissionGranted,
            BulkPermissionOperation::Revoke => InheritanceAuditAction::PermissionRevoked,
        };
        self.audit_service
            .log_role_permission_change(
                performed_by,
                audit_action,
                role.id,
                permission_ids,
                reason,
            )
            .await?;

        for permission in &permissions {
            match operation {
                BulkPermissionOperation::Grant => {
                    self.store
                        .add_role_permission(RolePermission::new(
                            role.id,
                            permission.id,
                            performed_by,
                        ))
                        .await?;
                }
                BulkPermissionOperation::Revoke => {
                    self.store
                        .remove_role_permission(role.id, permission.id)
                        .await?;
                }
            }
        }

        // ロールの保持者に加えて、継承している子孫ロールの保持者も影響を受ける
        self.inheritance_service.affected_user_ids(role.id).await
    }

    async fn apply_to_user(
        &self,
        user_id: Uuid,
        permission_ids: &[Uuid],
        operation: BulkPermissionOperation,
        performed_by: Uuid,
        reason: Option<&str>,
    ) -> AppResult<HashSet<Uuid>> {
        const CONTEXT: &str = "bulk_operation_service::apply_to_user";

        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| not_found_error("User", &user_id.to_string(), CONTEXT))?;
        let permissions = self.resolve_permissions(permission_ids, CONTEXT).await?;

        // ユーザーへの直接付与・剥奪はオーバーライドとして具体化する
        let action = match operation {
            BulkPermissionOperation::Grant => OverrideAction::Grant,
            BulkPermissionOperation::Revoke => OverrideAction::Revoke,
        };

        self.audit_service
            .log_user_override_batch(
                performed_by,
                user_id,
                action.as_str(),
                permission_ids,
                reason,
            )
            .await?;

        for permission in &permissions {
            self.store
                .create_override(UserPermissionOverride {
                    id: Uuid::new_v4(),
                    user_id,
                    permission_id: permission.id,
                    organization_id: None,
                    department_id: None,
                    action,
                    reason: reason.map(|r| r.to_string()),
                    expires_at: None,
                    created_by: performed_by,
                    created_at: Utc::now(),
                })
                .await?;
        }

        Ok(HashSet::from([user_id]))
    }
}
