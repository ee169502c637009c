// authz-core/src/repository/user_repository.rs

use crate::domain::user_model::AuthUser;
use crate::error::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

/// 認証モジュールが所有するユーザー参照のポート
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<AuthUser>>;
}
