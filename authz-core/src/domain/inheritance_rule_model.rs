// authz-core/src/domain/inheritance_rule_model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ロール継承ルール（親ロール → 子ロールの有向エッジ）
///
/// `inherit_all` の場合、子は親の保持・継承する全権限を受け取る。
/// そうでない場合は `permission_ids` の許可リストのみを受け取る。
/// `priority` は表示順のヒントであり、解決結果には影響しない。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInheritanceRule {
    pub id: Uuid,
    pub parent_role_id: Uuid,
    pub child_role_id: Uuid,
    pub inherit_all: bool,
    pub permission_ids: Vec<Uuid>,
    pub priority: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl RoleInheritanceRule {
    pub fn new(
        parent_role_id: Uuid,
        child_role_id: Uuid,
        inherit_all: bool,
        permission_ids: Vec<Uuid>,
        priority: i32,
        created_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_role_id,
            child_role_id,
            inherit_all,
            // inherit_all のときの許可リストは無意味なので持たない
            permission_ids: if inherit_all { Vec::new() } else { permission_ids },
            priority,
            created_by,
            created_at: Utc::now(),
        }
    }
}
