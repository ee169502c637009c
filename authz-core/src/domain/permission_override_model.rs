// authz-core/src/domain/permission_override_model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// オーバーライドの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideAction {
    Grant,
    Revoke,
}

impl OverrideAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideAction::Grant => "grant",
            OverrideAction::Revoke => "revoke",
        }
    }

    /// 文字列からオーバーライド種別を解析
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "grant" => Some(OverrideAction::Grant),
            "revoke" => Some(OverrideAction::Revoke),
            _ => None,
        }
    }
}

impl std::fmt::Display for OverrideAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OverrideAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s).ok_or_else(|| format!("Invalid override action: {}", s))
    }
}

/// ユーザー単位の権限オーバーライド
///
/// ロール由来の権限に対する例外。同一 (user, permission, scope) に複数の
/// オーバーライドが存在する場合は、期限切れでない最新のものが優先される。
/// 期限切れの掃き出しは行わず、解決時に遅延評価する。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissionOverride {
    pub id: Uuid,
    pub user_id: Uuid,
    pub permission_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub action: OverrideAction,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl UserPermissionOverride {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// リクエストされたスコープに適用されるか
    ///
    /// スコープ未設定のオーバーライドは全スコープに適用される。
    pub fn applies_to_scope(
        &self,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> bool {
        let organization_ok = self.organization_id.is_none()
            || organization_id.is_none()
            || self.organization_id == organization_id;
        let department_ok = self.department_id.is_none()
            || department_id.is_none()
            || self.department_id == department_id;
        organization_ok && department_ok
    }
}

/// オーバーライド作成の入力
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOverrideInput {
    pub user_id: Uuid,
    pub permission_id: Uuid,
    pub action: String,
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_override(action: OverrideAction) -> UserPermissionOverride {
        UserPermissionOverride {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            permission_id: Uuid::new_v4(),
            organization_id: None,
            department_id: None,
            action,
            reason: None,
            expires_at: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_override_action_conversion() {
        assert_eq!(OverrideAction::Grant.as_str(), "grant");
        assert_eq!(OverrideAction::from_str("REVOKE"), Some(OverrideAction::Revoke));
        assert_eq!(OverrideAction::from_str("deny"), None);
    }

    #[test]
    fn test_expiry_is_lazy() {
        let now = Utc::now();
        let mut ov = sample_override(OverrideAction::Grant);
        assert!(!ov.is_expired(now));

        ov.expires_at = Some(now - Duration::seconds(1));
        assert!(ov.is_expired(now));

        ov.expires_at = Some(now + Duration::hours(1));
        assert!(!ov.is_expired(now));
    }

    #[test]
    fn test_unscoped_override_applies_everywhere() {
        let ov = sample_override(OverrideAction::Revoke);
        assert!(ov.applies_to_scope(None, None));
        assert!(ov.applies_to_scope(Some(Uuid::new_v4()), Some(Uuid::new_v4())));
    }

    #[test]
    fn test_scoped_override_requires_matching_scope() {
        let org = Uuid::new_v4();
        let mut ov = sample_override(OverrideAction::Revoke);
        ov.organization_id = Some(org);

        assert!(ov.applies_to_scope(Some(org), None));
        assert!(!ov.applies_to_scope(Some(Uuid::new_v4()), None));
        // 未指定のリクエストは全スコープを対象とするため適用される
        assert!(ov.applies_to_scope(None, None));
    }
}
