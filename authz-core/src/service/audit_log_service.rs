// authz-core/src/service/audit_log_service.rs
use crate::domain::inheritance_audit_model::{
    InheritanceAuditAction, InheritanceAuditBuilder, InheritanceAuditEntry,
};
use crate::domain::inheritance_rule_model::RoleInheritanceRule;
use crate::domain::permission_override_model::UserPermissionOverride;
use crate::error::AppResult;
use crate::log_with_context;
use crate::repository::audit_log_repository::InheritanceAuditRepository;
use crate::utils::error_helper::internal_server_error;
use std::sync::Arc;
use uuid::Uuid;

/// 継承・オーバーライド変更の監査サービス
///
/// 追記と参照のみを提供し、ビジネスバリデーションは行わない。
pub struct InheritanceAuditService {
    audit_repository: Arc<dyn InheritanceAuditRepository>,
}

impl InheritanceAuditService {
    pub fn new(audit_repository: Arc<dyn InheritanceAuditRepository>) -> Self {
        Self { audit_repository }
    }

    async fn append(&self, entry: InheritanceAuditEntry, context: &str) -> AppResult<()> {
        let action = entry.action.clone();
        self.audit_repository.append(entry).await.map_err(|e| {
            internal_server_error(e, context, "Failed to record audit entry")
        })?;

        log_with_context!(
            tracing::Level::INFO,
            "Audit entry recorded",
            "action" => &action
        );
        Ok(())
    }

    // 継承ルール作成を記録
    pub async fn log_inheritance_created(
        &self,
        performed_by: Uuid,
        rule: &RoleInheritanceRule,
    ) -> AppResult<()> {
        let entry =
            InheritanceAuditBuilder::new(performed_by, InheritanceAuditAction::InheritanceCreated)
                .parent_role_id(rule.parent_role_id)
                .child_role_id(rule.child_role_id)
                .details(serde_json::json!({
                    "rule_id": rule.id,
                    "inherit_all": rule.inherit_all,
                    "permission_ids": rule.permission_ids,
                    "priority": rule.priority,
                }))
                .build();
        self.append(entry, "audit_log_service::log_inheritance_created")
            .await
    }

    // 継承ルール削除を記録
    pub async fn log_inheritance_removed(
        &self,
        performed_by: Uuid,
        rule: &RoleInheritanceRule,
    ) -> AppResult<()> {
        let entry =
            InheritanceAuditBuilder::new(performed_by, InheritanceAuditAction::InheritanceRemoved)
                .parent_role_id(rule.parent_role_id)
                .child_role_id(rule.child_role_id)
                .details(serde_json::json!({ "rule_id": rule.id }))
                .build();
        self.append(entry, "audit_log_service::log_inheritance_removed")
            .await
    }

    // オーバーライド作成を記録
    pub async fn log_override_created(
        &self,
        performed_by: Uuid,
        user_override: &UserPermissionOverride,
    ) -> AppResult<()> {
        let entry =
            InheritanceAuditBuilder::new(performed_by, InheritanceAuditAction::OverrideCreated)
                .user_id(user_override.user_id)
                .permission_id(user_override.permission_id)
                .details(serde_json::json!({
                    "override_id": user_override.id,
                    "action": user_override.action.as_str(),
                    "reason": user_override.reason,
                    "expires_at": user_override.expires_at,
                }))
                .build();
        self.append(entry, "audit_log_service::log_override_created")
            .await
    }

    // オーバーライド削除を記録
    pub async fn log_override_removed(
        &self,
        performed_by: Uuid,
        user_override: &UserPermissionOverride,
    ) -> AppResult<()> {
        let entry =
            InheritanceAuditBuilder::new(performed_by, InheritanceAuditAction::OverrideRemoved)
                .user_id(user_override.user_id)
                .permission_id(user_override.permission_id)
                .details(serde_json::json!({ "override_id": user_override.id }))
                .build();
        self.append(entry, "audit_log_service::log_override_removed")
            .await
    }

    // ロールへの直接付与・剥奪を記録
    pub async fn log_role_permission_change(
        &self,
        performed_by: Uuid,
        action: InheritanceAuditAction,
        role_id: Uuid,
        permission_ids: &[Uuid],
        reason: Option<&str>,
    ) -> AppResult<()> {
        let entry = InheritanceAuditBuilder::new(performed_by, action)
            .role_id(role_id)
            .details(serde_json::json!({
                "permission_ids": permission_ids,
                "reason": reason,
            }))
            .build();
        self.append(entry, "audit_log_service::log_role_permission_change")
            .await
    }

    // 一括操作によるユーザーへのオーバーライド作成をまとめて記録
    pub async fn log_user_override_batch(
        &self,
        performed_by: Uuid,
        user_id: Uuid,
        action: &str,
        permission_ids: &[Uuid],
        reason: Option<&str>,
    ) -> AppResult<()> {
        let entry =
            InheritanceAuditBuilder::new(performed_by, InheritanceAuditAction::OverrideCreated)
                .user_id(user_id)
                .details(serde_json::json!({
                    "action": action,
                    "permission_ids": permission_ids,
                    "reason": reason,
                    "bulk": true,
                }))
                .build();
        self.append(entry, "audit_log_service::log_user_override_batch")
            .await
    }

    // ロールの監査ログを取得
    pub async fn get_role_audit_logs(
        &self,
        role_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<InheritanceAuditEntry>> {
        log_with_context!(
            tracing::Level::DEBUG,
            "Retrieving role audit logs",
            "role_id" => role_id,
            "limit" => limit
        );
        self.audit_repository
            .find_by_role(role_id, limit)
            .await
            .map_err(|e| {
                internal_server_error(
                    e,
                    "audit_log_service::get_role_audit_logs",
                    "Failed to retrieve role audit logs",
                )
            })
    }

    // ユーザーの監査ログを取得
    pub async fn get_user_audit_logs(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<InheritanceAuditEntry>> {
        log_with_context!(
            tracing::Level::DEBUG,
            "Retrieving user audit logs",
            "user_id" => user_id,
            "limit" => limit
        );
        self.audit_repository
            .find_by_user(user_id, limit)
            .await
            .map_err(|e| {
                internal_server_error(
                    e,
                    "audit_log_service::get_user_audit_logs",
                    "Failed to retrieve user audit logs",
                )
            })
    }
}
