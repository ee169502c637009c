// authz-core/src/domain/user_role_model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ロール割り当てや権限チェックが適用される (組織, 部門) コンテキスト
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleScope {
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

impl RoleScope {
    pub fn new(organization_id: Option<Uuid>, department_id: Option<Uuid>) -> Self {
        Self {
            organization_id,
            department_id,
        }
    }

    pub fn unscoped() -> Self {
        Self::default()
    }

    /// リクエストされたスコープに一致するか
    ///
    /// リクエスト側で未指定の条件は常に一致（全スコープを対象とする）。
    pub fn matches(&self, organization_id: Option<Uuid>, department_id: Option<Uuid>) -> bool {
        let organization_ok =
            organization_id.is_none_or(|org| self.organization_id == Some(org));
        let department_ok =
            department_id.is_none_or(|dept| self.department_id == Some(dept));
        organization_ok && department_ok
    }
}

/// ユーザーのロールメンバーシップ
///
/// 同一ユーザーが複数のスコープで複数のメンバーシップを同時に持てる。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    pub is_primary: bool,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
}

impl UserRole {
    pub fn new(user_id: Uuid, role_id: Uuid, scope: RoleScope, assigned_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role_id,
            organization_id: scope.organization_id,
            department_id: scope.department_id,
            is_active: true,
            is_primary: false,
            assigned_by,
            assigned_at: Utc::now(),
        }
    }

    pub fn scope(&self) -> RoleScope {
        RoleScope::new(self.organization_id, self.department_id)
    }
}
