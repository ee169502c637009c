// authz-core/src/service/permission_cache_service.rs
//
// 権限解決結果のTTLキャッシュ
// バックエンド障害は捕捉してミス扱いとし、解決経路を失敗させない

use crate::cache::PermissionCacheBackend;
use crate::config::AuthzConfig;
use crate::domain::effective_permission_model::EffectivePermissions;
use crate::log_with_context;
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

/// 権限キャッシュサービス
///
/// キー体系は2系統:
/// - 全権限セット: `authz:perms:{user}:{org|-}:{dept|-}`
/// - 単一チェック: `authz:check:{user}:{code}:{org|-}:{dept|-}`
#[derive(Clone)]
pub struct PermissionCacheService {
    backend: Arc<dyn PermissionCacheBackend>,
    ttl: Duration,
}

fn scope_part(id: Option<Uuid>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

impl PermissionCacheService {
    pub fn new(backend: Arc<dyn PermissionCacheBackend>, config: &AuthzConfig) -> Self {
        Self {
            backend,
            ttl: Duration::seconds(config.cache_ttl_secs as i64),
        }
    }

    fn effective_permissions_key(
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> String {
        format!(
            "authz:perms:{}:{}:{}",
            user_id,
            scope_part(organization_id),
            scope_part(department_id)
        )
    }

    fn check_key(
        user_id: Uuid,
        code: &str,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> String {
        format!(
            "authz:check:{}:{}:{}:{}",
            user_id,
            code,
            scope_part(organization_id),
            scope_part(department_id)
        )
    }

    /// 全権限セットのキャッシュ参照（障害時はミス扱い）
    pub async fn get_effective_permissions(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> Option<EffectivePermissions> {
        let key = Self::effective_permissions_key(user_id, organization_id, department_id);
        let raw = match self.backend.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                log_with_context!(
                    tracing::Level::WARN,
                    "Cache read failed, treating as miss",
                    "key" => &key,
                    "error" => &e.to_string()
                );
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(cached) => {
                log_with_context!(
                    tracing::Level::DEBUG,
                    "Cache hit for effective permissions",
                    "user_id" => user_id
                );
                Some(cached)
            }
            Err(e) => {
                log_with_context!(
                    tracing::Level::WARN,
                    "Cached value was not decodable, treating as miss",
                    "key" => &key,
                    "error" => &e.to_string()
                );
                None
            }
        }
    }

    /// 全権限セットのキャッシュ書き込み（障害時は何もしない）
    pub async fn store_effective_permissions(
        &self,
        effective: &EffectivePermissions,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) {
        let key =
            Self::effective_permissions_key(effective.user_id, organization_id, department_id);
        let value = match serde_json::to_string(effective) {
            Ok(value) => value,
            Err(e) => {
                log_with_context!(
                    tracing::Level::WARN,
                    "Failed to encode effective permissions for cache",
                    "error" => &e.to_string()
                );
                return;
            }
        };

        if let Err(e) = self.backend.set(&key, value, self.ttl).await {
            log_with_context!(
                tracing::Level::WARN,
                "Cache write failed, continuing without cache",
                "key" => &key,
                "error" => &e.to_string()
            );
        }
    }

    /// 単一チェック結果のキャッシュ参照
    pub async fn get_check(
        &self,
        user_id: Uuid,
        code: &str,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> Option<bool> {
        let key = Self::check_key(user_id, code, organization_id, department_id);
        match self.backend.get(&key).await {
            Ok(Some(raw)) => match raw.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Ok(None) => None,
            Err(e) => {
                log_with_context!(
                    tracing::Level::WARN,
                    "Cache read failed, treating as miss",
                    "key" => &key,
                    "error" => &e.to_string()
                );
                None
            }
        }
    }

    /// 単一チェック結果のキャッシュ書き込み
    pub async fn store_check(
        &self,
        user_id: Uuid,
        code: &str,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
        granted: bool,
    ) {
        let key = Self::check_key(user_id, code, organization_id, department_id);
        if let Err(e) = self.backend.set(&key, granted.to_string(), self.ttl).await {
            log_with_context!(
                tracing::Level::WARN,
                "Cache write failed, continuing without cache",
                "key" => &key,
                "error" => &e.to_string()
            );
        }
    }

    /// 対象ユーザーのキャッシュを無効化する
    ///
    /// 指定スコープの全権限セットキーを削除したうえで、スコープ違いの
    /// 全権限セットキーと単一チェックキーもパターン削除で残さない。
    pub async fn invalidate_user(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) {
        log_with_context!(
            tracing::Level::DEBUG,
            "Invalidating user cache",
            "user_id" => user_id
        );

        let full_key = Self::effective_permissions_key(user_id, organization_id, department_id);
        if let Err(e) = self.backend.delete(&full_key).await {
            log_with_context!(
                tracing::Level::WARN,
                "Cache delete failed, entry will expire via TTL",
                "key" => &full_key,
                "error" => &e.to_string()
            );
        }

        for pattern in [
            format!("authz:perms:{}:*", user_id),
            format!("authz:check:{}:*", user_id),
        ] {
            if let Err(e) = self.backend.delete_by_pattern(&pattern).await {
                log_with_context!(
                    tracing::Level::WARN,
                    "Cache pattern delete failed, entries will expire via TTL",
                    "pattern" => &pattern,
                    "error" => &e.to_string()
                );
            }
        }
    }
}
