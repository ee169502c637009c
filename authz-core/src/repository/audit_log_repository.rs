// authz-core/src/repository/audit_log_repository.rs

use crate::domain::inheritance_audit_model::InheritanceAuditEntry;
use crate::error::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

/// 追記専用の監査シンクのポート
#[async_trait]
pub trait InheritanceAuditRepository: Send + Sync {
    async fn append(&self, entry: InheritanceAuditEntry) -> AppResult<()>;
    /// 対象ロールに関わるエントリを新しい順に返す
    async fn find_by_role(&self, role_id: Uuid, limit: usize)
        -> AppResult<Vec<InheritanceAuditEntry>>;
    /// 対象ユーザーに関わるエントリを新しい順に返す
    async fn find_by_user(&self, user_id: Uuid, limit: usize)
        -> AppResult<Vec<InheritanceAuditEntry>>;
}
