// src/cache/mod.rs
//
// キーバリューキャッシュのバックエンドポート
// 本番ではネットワーク越しのキャッシュ、テストではインメモリ実装を注入する

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// キャッシュ境界の内部エラー
///
/// サービス層で捕捉・ログされ、呼び出し元へは伝播しない。
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// TTL付きキーバリューキャッシュのポート
#[async_trait]
pub trait PermissionCacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;
    async fn delete(&self, key: &str) -> CacheResult<()>;
    /// 末尾の `*` をプレフィックス一致として扱い、一致したキーを全て削除する
    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<u64>;
}

struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// `PermissionCacheBackend` のインメモリ実装
#[derive(Default)]
pub struct InMemoryPermissionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryPermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 期限切れエントリを掃き出す（テスト・運用補助用）
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PermissionCacheBackend for InMemoryPermissionCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(Utc::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = InMemoryPermissionCache::new();
        cache
            .set("authz:perms:u1:-:-", "value".to_string(), Duration::seconds(60))
            .await
            .unwrap();

        assert_eq!(
            cache.get("authz:perms:u1:-:-").await.unwrap(),
            Some("value".to_string())
        );
        assert_eq!(cache.get("authz:perms:u2:-:-").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = InMemoryPermissionCache::new();
        cache
            .set("key", "value".to_string(), Duration::seconds(-1))
            .await
            .unwrap();

        assert_eq!(cache.get("key").await.unwrap(), None);
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_by_pattern_removes_prefix_matches() {
        let cache = InMemoryPermissionCache::new();
        let ttl = Duration::seconds(60);
        cache.set("authz:check:u1:doc.read:-:-", "true".to_string(), ttl).await.unwrap();
        cache.set("authz:check:u1:doc.write:-:-", "false".to_string(), ttl).await.unwrap();
        cache.set("authz:check:u2:doc.read:-:-", "true".to_string(), ttl).await.unwrap();

        let deleted = cache.delete_by_pattern("authz:check:u1:*").await.unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(cache.get("authz:check:u1:doc.read:-:-").await.unwrap(), None);
        assert_eq!(
            cache.get("authz:check:u2:doc.read:-:-").await.unwrap(),
            Some("true".to_string())
        );
    }
}
