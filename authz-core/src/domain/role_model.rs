// authz-core/src/domain/role_model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ロールエンティティ
///
/// コードは組織スコープ内で一意（organization_id が None ならグローバル）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        organization_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            description: None,
            organization_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// ロールへの直接権限付与
///
/// (role_id, permission_id) の組で一意。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub granted_by: Uuid,
    pub granted_at: DateTime<Utc>,
}

impl RolePermission {
    pub fn new(role_id: Uuid, permission_id: Uuid, granted_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            role_id,
            permission_id,
            granted_by,
            granted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_role_defaults() {
        let role = Role::new("editor", "Editor", None);
        assert!(role.is_active);
        assert!(role.organization_id.is_none());
    }

    #[test]
    fn test_role_permission_records_grantor() {
        let granted_by = Uuid::new_v4();
        let grant = RolePermission::new(Uuid::new_v4(), Uuid::new_v4(), granted_by);
        assert_eq!(grant.granted_by, granted_by);
    }
}
