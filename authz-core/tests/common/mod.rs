// tests/common/mod.rs
//
// インメモリポートでサービス一式を組み立てるテストフィクスチャ

#![allow(dead_code)]

use async_trait::async_trait;
use authz_core::cache::{
    CacheError, CacheResult, InMemoryPermissionCache, PermissionCacheBackend,
};
use authz_core::config::AuthzConfig;
use authz_core::domain::permission_model::Permission;
use authz_core::domain::role_model::Role;
use authz_core::domain::user_model::AuthUser;
use authz_core::domain::user_role_model::RoleScope;
use authz_core::repository::in_memory::{
    InMemoryInheritanceAuditRepository, InMemoryPermissionStore, InMemoryUserRepository,
};
use authz_core::service::audit_log_service::InheritanceAuditService;
use authz_core::service::bulk_operation_service::BulkPermissionOperationService;
use authz_core::service::effective_permission_service::EffectivePermissionService;
use authz_core::service::permission_admin_service::PermissionAdminService;
use authz_core::service::permission_cache_service::PermissionCacheService;
use authz_core::service::permission_override_service::PermissionOverrideService;
use authz_core::service::role_inheritance_service::RoleInheritanceService;
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

/// 常に失敗するキャッシュバックエンド（フェイルオープン検証用）
pub struct FailingCacheBackend;

#[async_trait]
impl PermissionCacheBackend for FailingCacheBackend {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> CacheResult<u64> {
        Err(CacheError::Backend("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub store: Arc<InMemoryPermissionStore>,
    pub user_repository: Arc<InMemoryUserRepository>,
    pub audit_repository: Arc<InMemoryInheritanceAuditRepository>,
    pub cache_service: Arc<PermissionCacheService>,
    pub audit_service: Arc<InheritanceAuditService>,
    pub inheritance_service: Arc<RoleInheritanceService>,
    pub override_service: Arc<PermissionOverrideService>,
    pub effective_service: Arc<EffectivePermissionService>,
    pub bulk_service: Arc<BulkPermissionOperationService>,
    pub admin_service: Arc<PermissionAdminService>,
    /// 管理操作の実行者
    pub actor: Uuid,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(
            Arc::new(InMemoryPermissionCache::new()),
            AuthzConfig::default(),
        )
    }

    pub fn with_failing_cache() -> Self {
        Self::build(Arc::new(FailingCacheBackend), AuthzConfig::default())
    }

    pub fn with_config(config: AuthzConfig) -> Self {
        Self::build(Arc::new(InMemoryPermissionCache::new()), config)
    }

    fn build(backend: Arc<dyn PermissionCacheBackend>, config: AuthzConfig) -> Self {
        let store = Arc::new(InMemoryPermissionStore::new());
        let user_repository = Arc::new(InMemoryUserRepository::new());
        let audit_repository = Arc::new(InMemoryInheritanceAuditRepository::new());

        let cache_service = Arc::new(PermissionCacheService::new(backend, &config));
        let audit_service = Arc::new(InheritanceAuditService::new(audit_repository.clone()));
        let inheritance_service = Arc::new(RoleInheritanceService::new(
            store.clone(),
            audit_service.clone(),
            cache_service.clone(),
            &config,
        ));
        let override_service = Arc::new(PermissionOverrideService::new(
            store.clone(),
            user_repository.clone(),
            audit_service.clone(),
            cache_service.clone(),
        ));
        let effective_service = Arc::new(EffectivePermissionService::new(
            store.clone(),
            user_repository.clone(),
            inheritance_service.clone(),
            override_service.clone(),
            cache_service.clone(),
        ));
        let bulk_service = Arc::new(BulkPermissionOperationService::new(
            store.clone(),
            user_repository.clone(),
            inheritance_service.clone(),
            audit_service.clone(),
            cache_service.clone(),
        ));
        let admin_service = Arc::new(PermissionAdminService::new(
            store.clone(),
            user_repository.clone(),
            inheritance_service.clone(),
            audit_service.clone(),
            cache_service.clone(),
        ));

        Self {
            store,
            user_repository,
            audit_repository,
            cache_service,
            audit_service,
            inheritance_service,
            override_service,
            effective_service,
            bulk_service,
            admin_service,
            actor: Uuid::new_v4(),
        }
    }

    pub async fn create_user(&self) -> Uuid {
        let user = AuthUser::new(Uuid::new_v4());
        let id = user.id;
        self.user_repository.insert(user).await;
        id
    }

    pub async fn create_superuser(&self) -> Uuid {
        let user = AuthUser::superuser(Uuid::new_v4());
        let id = user.id;
        self.user_repository.insert(user).await;
        id
    }

    pub async fn create_permission(&self, code: &str) -> Permission {
        self.admin_service
            .create_permission(code, code, None)
            .await
            .unwrap()
    }

    pub async fn create_role(&self, code: &str) -> Role {
        self.admin_service.create_role(code, code, None).await.unwrap()
    }

    pub async fn grant(&self, role_id: Uuid, permission_id: Uuid) {
        self.admin_service
            .grant_permission_to_role(role_id, permission_id, self.actor)
            .await
            .unwrap();
    }

    pub async fn assign(&self, user_id: Uuid, role_id: Uuid) {
        self.admin_service
            .assign_role_to_user(user_id, role_id, RoleScope::unscoped(), false, self.actor)
            .await
            .unwrap();
    }

    pub async fn assign_scoped(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) {
        self.admin_service
            .assign_role_to_user(
                user_id,
                role_id,
                RoleScope::new(organization_id, department_id),
                false,
                self.actor,
            )
            .await
            .unwrap();
    }

    /// 継承ルールを inherit_all で作成する
    pub async fn inherit_all(&self, parent_role_id: Uuid, child_role_id: Uuid) {
        self.inheritance_service
            .create_inheritance_rule(parent_role_id, child_role_id, true, Vec::new(), 0, self.actor)
            .await
            .unwrap();
    }
}
