// authz-core/src/domain/permission_dependency_model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 権限間の依存宣言（A は B を必要とする）
///
/// 参考情報としての記録のみで、付与時の自動展開や強制は行わない。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDependency {
    pub id: Uuid,
    pub permission_id: Uuid,
    pub requires_permission_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PermissionDependency {
    pub fn new(permission_id: Uuid, requires_permission_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            permission_id,
            requires_permission_id,
            created_at: Utc::now(),
        }
    }
}
