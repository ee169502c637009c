// src/config.rs
use dotenvy::dotenv;
use std::env;

/// 権限解決コアの動作設定
#[derive(Debug, Clone)]
pub struct AuthzConfig {
    /// キャッシュエントリの有効期間（秒）
    pub cache_ttl_secs: u64,
    /// 継承探索の最大深度（循環は書き込み時に拒否されるため防御的な上限）
    pub max_inheritance_depth: usize,
}

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_MAX_INHERITANCE_DEPTH: usize = 10;

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_inheritance_depth: DEFAULT_MAX_INHERITANCE_DEPTH,
        }
    }
}

impl AuthzConfig {
    pub fn from_env() -> Self {
        dotenv().ok(); // .env ファイルを読み込む (存在しなくてもエラーにしない)

        let cache_ttl_secs = env::var("AUTHZ_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);
        let max_inheritance_depth = env::var("AUTHZ_MAX_INHERITANCE_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_INHERITANCE_DEPTH);

        AuthzConfig {
            cache_ttl_secs,
            max_inheritance_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthzConfig::default();
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.max_inheritance_depth, 10);
    }
}
