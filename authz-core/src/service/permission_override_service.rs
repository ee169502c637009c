// authz-core/src/service/permission_override_service.rs
//
// ユーザー単位オーバーライドの適用と管理
// 期限切れは解決時に遅延評価し、能動的な掃き出しは行わない

use crate::domain::permission_override_model::{
    CreateOverrideInput, OverrideAction, UserPermissionOverride,
};
use crate::error::AppResult;
use crate::log_with_context;
use crate::repository::permission_store::PermissionStore;
use crate::repository::user_repository::UserRepository;
use crate::service::audit_log_service::InheritanceAuditService;
use crate::service::permission_cache_service::PermissionCacheService;
use crate::utils::error_helper::{
    convert_validation_errors, not_found_error, validation_error,
};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct PermissionOverrideService {
    store: Arc<dyn PermissionStore>,
    user_repository: Arc<dyn UserRepository>,
    audit_service: Arc<InheritanceAuditService>,
    cache_service: Arc<PermissionCacheService>,
}

impl PermissionOverrideService {
    pub fn new(
        store: Arc<dyn PermissionStore>,
        user_repository: Arc<dyn UserRepository>,
        audit_service: Arc<InheritanceAuditService>,
        cache_service: Arc<PermissionCacheService>,
    ) -> Self {
        Self {
            store,
            user_repository,
            audit_service,
            cache_service,
        }
    }

    /// 有効なオーバーライドを権限コード付きで作成順に返す
    ///
    /// 期限切れとスコープ外のものを除外する。
    pub(crate) async fn active_overrides(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> AppResult<Vec<(UserPermissionOverride, String)>> {
        let now = Utc::now();
        let mut overrides = self.store.find_overrides_by_user(user_id).await?;
        overrides.retain(|o| {
            !o.is_expired(now) && o.applies_to_scope(organization_id, department_id)
        });
        overrides.sort_by_key(|o| o.created_at);

        let ids: Vec<Uuid> = overrides.iter().map(|o| o.permission_id).collect();
        let code_by_id: HashMap<Uuid, String> = self
            .store
            .find_permissions_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.code))
            .collect();

        Ok(overrides
            .into_iter()
            .filter_map(|o| {
                let code = code_by_id.get(&o.permission_id)?.clone();
                Some((o, code))
            })
            .collect())
    }

    /// ロール由来の権限セットにオーバーライドを適用する
    ///
    /// 作成順に適用するため、同一コードに対しては最後の（= 最新の）
    /// 有効なオーバーライドが勝つ。
    pub async fn apply(
        &self,
        base: BTreeSet<String>,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> AppResult<BTreeSet<String>> {
        let mut codes = base;
        for (user_override, code) in self
            .active_overrides(user_id, organization_id, department_id)
            .await?
        {
            match user_override.action {
                OverrideAction::Grant => {
                    codes.insert(code);
                }
                OverrideAction::Revoke => {
                    codes.remove(&code);
                }
            }
        }
        Ok(codes)
    }

    /// オーバーライドを作成する
    pub async fn create_override(
        &self,
        input: CreateOverrideInput,
        performed_by: Uuid,
    ) -> AppResult<UserPermissionOverride> {
        const CONTEXT: &str = "permission_override_service::create_override";

        input
            .validate()
            .map_err(|e| convert_validation_errors(e, CONTEXT))?;

        let action = OverrideAction::from_str(&input.action)
            .ok_or_else(|| validation_error("action", "must be either 'grant' or 'revoke'"))?;

        if let Some(expires_at) = input.expires_at {
            if expires_at <= Utc::now() {
                return Err(validation_error("expires_at", "must be in the future"));
            }
        }

        self.user_repository
            .find_by_id(input.user_id)
            .await?
            .ok_or_else(|| not_found_error("User", &input.user_id.to_string(), CONTEXT))?;
        self.store
            .find_permission_by_id(input.permission_id)
            .await?
            .ok_or_else(|| {
                not_found_error("Permission", &input.permission_id.to_string(), CONTEXT)
            })?;

        let user_override = UserPermissionOverride {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            permission_id: input.permission_id,
            organization_id: input.organization_id,
            department_id: input.department_id,
            action,
            reason: input.reason,
            expires_at: input.expires_at,
            created_by: performed_by,
            created_at: Utc::now(),
        };

        // 変更は先に監査へ記録してからストアに反映する
        self.audit_service
            .log_override_created(performed_by, &user_override)
            .await?;
        let user_override = self.store.create_override(user_override).await?;

        self.cache_service
            .invalidate_user(
                user_override.user_id,
                user_override.organization_id,
                user_override.department_id,
            )
            .await;

        log_with_context!(
            tracing::Level::INFO,
            "Permission override created",
            "override_id" => user_override.id,
            "user_id" => user_override.user_id,
            "action" => user_override.action.as_str()
        );

        Ok(user_override)
    }

    /// オーバーライドを削除する
    pub async fn delete_override(&self, override_id: Uuid, performed_by: Uuid) -> AppResult<()> {
        const CONTEXT: &str = "permission_override_service::delete_override";

        let user_override = self
            .store
            .find_override_by_id(override_id)
            .await?
            .ok_or_else(|| not_found_error("Override", &override_id.to_string(), CONTEXT))?;

        self.audit_service
            .log_override_removed(performed_by, &user_override)
            .await?;
        self.store.delete_override(override_id).await?;

        self.cache_service
            .invalidate_user(
                user_override.user_id,
                user_override.organization_id,
                user_override.department_id,
            )
            .await;

        log_with_context!(
            tracing::Level::INFO,
            "Permission override deleted",
            "override_id" => override_id,
            "user_id" => user_override.user_id
        );

        Ok(())
    }

    /// ユーザーのオーバーライドを新しい順に一覧する（期限切れも含む）
    pub async fn list_user_overrides(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<UserPermissionOverride>> {
        let mut overrides = self.store.find_overrides_by_user(user_id).await?;
        overrides.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(overrides)
    }
}
