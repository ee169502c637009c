// authz-core/src/service/effective_permission_service.rs
//
// 実効権限の解決オーケストレータ
// キャッシュ参照 → ストア取得 → 継承展開 → オーバーライド適用 の順で解決する

use crate::domain::effective_permission_model::{
    EffectivePermissions, PermissionMatrix, PermissionProvenance, PermissionSummary,
    RoleMembershipSummary,
};
use crate::domain::permission_model::Permission;
use crate::domain::permission_override_model::OverrideAction;
use crate::domain::user_model::AuthUser;
use crate::domain::user_role_model::UserRole;
use crate::error::AppResult;
use crate::log_with_context;
use crate::repository::permission_store::PermissionStore;
use crate::repository::user_repository::UserRepository;
use crate::service::permission_cache_service::PermissionCacheService;
use crate::service::permission_override_service::PermissionOverrideService;
use crate::service::role_inheritance_service::RoleInheritanceService;
use crate::utils::error_helper::not_found_error;
use crate::utils::permission::PermissionChecker;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

pub struct EffectivePermissionService {
    store: Arc<dyn PermissionStore>,
    user_repository: Arc<dyn UserRepository>,
    inheritance_service: Arc<RoleInheritanceService>,
    override_service: Arc<PermissionOverrideService>,
    cache_service: Arc<PermissionCacheService>,
}

impl EffectivePermissionService {
    pub fn new(
        store: Arc<dyn PermissionStore>,
        user_repository: Arc<dyn UserRepository>,
        inheritance_service: Arc<RoleInheritanceService>,
        override_service: Arc<PermissionOverrideService>,
        cache_service: Arc<PermissionCacheService>,
    ) -> Self {
        Self {
            store,
            user_repository,
            inheritance_service,
            override_service,
            cache_service,
        }
    }

    async fn load_user(&self, user_id: Uuid, context: &str) -> AppResult<AuthUser> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| not_found_error("User", &user_id.to_string(), context))
    }

    /// リクエストスコープに一致するアクティブなメンバーシップを返す
    async fn scoped_memberships(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> AppResult<Vec<UserRole>> {
        let memberships = self.store.find_active_user_roles(user_id).await?;
        Ok(memberships
            .into_iter()
            .filter(|m| m.scope().matches(organization_id, department_id))
            .collect())
    }

    /// ユーザーの実効権限セットを解決する
    pub async fn get_effective_permissions(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> AppResult<EffectivePermissions> {
        if let Some(cached) = self
            .cache_service
            .get_effective_permissions(user_id, organization_id, department_id)
            .await
        {
            return Ok(cached);
        }

        let effective = self
            .resolve(user_id, organization_id, department_id)
            .await?;

        self.cache_service
            .store_effective_permissions(&effective, organization_id, department_id)
            .await;

        Ok(effective)
    }

    async fn resolve(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> AppResult<EffectivePermissions> {
        const CONTEXT: &str = "effective_permission_service::resolve";

        let user = self.load_user(user_id, CONTEXT).await?;

        // スーパーユーザーは全権限マーカーで短絡する
        if user.is_superuser {
            return Ok(EffectivePermissions::superuser(user_id));
        }
        if !user.is_active {
            return Ok(EffectivePermissions::new(user_id, BTreeSet::new()));
        }

        log_with_context!(
            tracing::Level::DEBUG,
            "Resolving effective permissions",
            "user_id" => user_id,
            "organization_id" => organization_id,
            "department_id" => department_id
        );

        let mut codes: BTreeSet<String> = BTreeSet::new();
        for membership in self
            .scoped_memberships(user_id, organization_id, department_id)
            .await?
        {
            let role = match self.store.find_role_by_id(membership.role_id).await? {
                Some(role) if role.is_active => role,
                _ => continue,
            };

            // ロールの直接付与
            let grants = self.store.find_role_permissions(role.id).await?;
            let ids: Vec<Uuid> = grants.iter().map(|g| g.permission_id).collect();
            for permission in self.store.find_permissions_by_ids(&ids).await? {
                if permission.is_active {
                    codes.insert(permission.code);
                }
            }

            // 継承による取り込み
            for inherited in self.inheritance_service.expand(role.id).await? {
                codes.insert(inherited.code);
            }
        }

        let adjusted = self
            .override_service
            .apply(codes, user_id, organization_id, department_id)
            .await?;

        Ok(EffectivePermissions::new(user_id, adjusted))
    }

    /// 由来情報付きで実効権限を解決する
    ///
    /// 直接付与は深度 0、継承は発見深度、オーバーライドは寄与ロール無し
    /// として記録する。剥奪されたコードも `granted = false` で残す。
    pub async fn get_effective_permissions_with_source(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> AppResult<BTreeMap<String, PermissionProvenance>> {
        const CONTEXT: &str = "effective_permission_service::get_effective_permissions_with_source";

        let user = self.load_user(user_id, CONTEXT).await?;
        let mut sources: BTreeMap<String, PermissionProvenance> = BTreeMap::new();

        if user.is_superuser {
            for permission in self.store.find_active_permissions().await? {
                sources.insert(
                    permission.code,
                    PermissionProvenance {
                        granted: true,
                        source_role_code: None,
                        inheritance_depth: 0,
                    },
                );
            }
            return Ok(sources);
        }
        if !user.is_active {
            return Ok(sources);
        }

        for membership in self
            .scoped_memberships(user_id, organization_id, department_id)
            .await?
        {
            let role = match self.store.find_role_by_id(membership.role_id).await? {
                Some(role) if role.is_active => role,
                _ => continue,
            };

            let grants = self.store.find_role_permissions(role.id).await?;
            let ids: Vec<Uuid> = grants.iter().map(|g| g.permission_id).collect();
            for permission in self.store.find_permissions_by_ids(&ids).await? {
                if permission.is_active {
                    sources.insert(
                        permission.code,
                        PermissionProvenance {
                            granted: true,
                            source_role_code: Some(role.code.clone()),
                            inheritance_depth: 0,
                        },
                    );
                }
            }

            for inherited in self.inheritance_service.expand(role.id).await? {
                let candidate = PermissionProvenance {
                    granted: true,
                    source_role_code: Some(inherited.source_role_code),
                    inheritance_depth: inherited.depth,
                };
                sources
                    .entry(inherited.code)
                    .and_modify(|existing| {
                        // 複数経路で得られる場合は最も浅い由来を残す
                        if candidate.inheritance_depth < existing.inheritance_depth {
                            *existing = candidate.clone();
                        }
                    })
                    .or_insert(candidate);
            }
        }

        for (user_override, code) in self
            .override_service
            .active_overrides(user_id, organization_id, department_id)
            .await?
        {
            match user_override.action {
                OverrideAction::Grant => {
                    sources.insert(
                        code,
                        PermissionProvenance {
                            granted: true,
                            source_role_code: None,
                            inheritance_depth: 0,
                        },
                    );
                }
                OverrideAction::Revoke => {
                    sources
                        .entry(code)
                        .and_modify(|existing| existing.granted = false)
                        .or_insert(PermissionProvenance {
                            granted: false,
                            source_role_code: None,
                            inheritance_depth: 0,
                        });
                }
            }
        }

        Ok(sources)
    }

    /// 単一権限のチェック
    pub async fn check_permission(
        &self,
        user_id: Uuid,
        code: &str,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> AppResult<bool> {
        if let Some(cached) = self
            .cache_service
            .get_check(user_id, code, organization_id, department_id)
            .await
        {
            return Ok(cached);
        }

        let effective = self
            .get_effective_permissions(user_id, organization_id, department_id)
            .await?;
        let granted = effective.contains(code);

        self.cache_service
            .store_check(user_id, code, organization_id, department_id, granted)
            .await;

        Ok(granted)
    }

    /// 複数権限のチェック（require_all: AND / OR の切り替え）
    pub async fn check_permissions(
        &self,
        user_id: Uuid,
        codes: &[String],
        require_all: bool,
    ) -> AppResult<bool> {
        let mut results = Vec::with_capacity(codes.len());
        for code in codes {
            results.push(self.check_permission(user_id, code, None, None).await?);
        }

        Ok(if require_all {
            results.iter().all(|granted| *granted)
        } else {
            results.iter().any(|granted| *granted)
        })
    }

    /// 単一演算子の権限式を評価する
    pub async fn evaluate_permission_expression(
        &self,
        user_id: Uuid,
        expression: &str,
    ) -> AppResult<bool> {
        let effective = self.get_effective_permissions(user_id, None, None).await?;
        PermissionChecker::evaluate_expression(&effective, expression)
    }

    /// カテゴリ別の権限マトリックスを生成する
    pub async fn get_permission_matrix(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
    ) -> AppResult<PermissionMatrix> {
        let effective = self
            .get_effective_permissions(user_id, organization_id, None)
            .await?;
        let catalogue = self.store.find_active_permissions().await?;

        let mut categories: BTreeMap<String, BTreeMap<String, bool>> = BTreeMap::new();
        for permission in catalogue {
            let granted = effective.contains(&permission.code);
            categories
                .entry(permission.category().to_string())
                .or_default()
                .insert(permission.code, granted);
        }

        Ok(PermissionMatrix {
            user_id,
            categories,
            generated_at: Utc::now(),
        })
    }

    /// 管理画面向けの権限サマリーを生成する
    pub async fn get_permission_summary(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
    ) -> AppResult<PermissionSummary> {
        let effective = self
            .get_effective_permissions(user_id, organization_id, None)
            .await?;

        let mut roles = Vec::new();
        for membership in self
            .scoped_memberships(user_id, organization_id, None)
            .await?
        {
            if let Some(role) = self.store.find_role_by_id(membership.role_id).await? {
                roles.push(RoleMembershipSummary {
                    role_id: role.id,
                    role_code: role.code,
                    organization_id: membership.organization_id,
                    department_id: membership.department_id,
                    is_primary: membership.is_primary,
                });
            }
        }

        // スーパーユーザーはカタログ全体を保持しているとみなす
        let permission_codes: Vec<String> = if effective.superuser {
            self.store
                .find_active_permissions()
                .await?
                .into_iter()
                .map(|p| p.code)
                .collect()
        } else {
            effective.sorted_codes()
        };

        let mut category_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for code in &permission_codes {
            *category_breakdown
                .entry(Permission::category_of(code).to_string())
                .or_default() += 1;
        }

        Ok(PermissionSummary {
            user_id,
            superuser: effective.superuser,
            total_permissions: permission_codes.len(),
            permission_codes,
            category_breakdown,
            roles,
        })
    }

    /// ユーザーのキャッシュを無効化する
    pub async fn invalidate_user_cache(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) {
        self.cache_service
            .invalidate_user(user_id, organization_id, department_id)
            .await;
    }

    /// ロールの全アクティブ保持者のキャッシュを無効化する
    pub async fn invalidate_role_cache(&self, role_id: Uuid) -> AppResult<()> {
        let memberships = self.store.find_user_roles_by_role(role_id).await?;
        let mut invalidated = 0usize;
        for membership in memberships {
            if membership.is_active {
                self.cache_service
                    .invalidate_user(
                        membership.user_id,
                        membership.organization_id,
                        membership.department_id,
                    )
                    .await;
                invalidated += 1;
            }
        }

        log_with_context!(
            tracing::Level::DEBUG,
            "Invalidated role holder caches",
            "role_id" => role_id,
            "invalidated" => invalidated
        );
        Ok(())
    }
}
