// authz-core/src/domain/inheritance_audit_model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 監査対象の操作種別
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum InheritanceAuditAction {
    // 継承ルール関連
    InheritanceCreated,
    InheritanceRemoved,

    // オーバーライド関連
    OverrideCreated,
    OverrideRemoved,

    // ロールへの直接付与関連
    PermissionGranted,
    PermissionRevoked,
}

impl InheritanceAuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InheritanceAuditAction::InheritanceCreated => "inheritance_created",
            InheritanceAuditAction::InheritanceRemoved => "inheritance_removed",
            InheritanceAuditAction::OverrideCreated => "override_created",
            InheritanceAuditAction::OverrideRemoved => "override_removed",
            InheritanceAuditAction::PermissionGranted => "permission_granted",
            InheritanceAuditAction::PermissionRevoked => "permission_revoked",
        }
    }
}

impl std::fmt::Display for InheritanceAuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 継承・オーバーライド変更の不変レコード
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InheritanceAuditEntry {
    pub id: Uuid,
    pub action: String,
    pub performed_by: Uuid,
    pub role_id: Option<Uuid>,
    pub parent_role_id: Option<Uuid>,
    pub child_role_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub permission_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// 監査エントリービルダー
pub struct InheritanceAuditBuilder {
    action: InheritanceAuditAction,
    performed_by: Uuid,
    role_id: Option<Uuid>,
    parent_role_id: Option<Uuid>,
    child_role_id: Option<Uuid>,
    user_id: Option<Uuid>,
    permission_id: Option<Uuid>,
    details: Option<serde_json::Value>,
}

impl InheritanceAuditBuilder {
    pub fn new(performed_by: Uuid, action: InheritanceAuditAction) -> Self {
        Self {
            action,
            performed_by,
            role_id: None,
            parent_role_id: None,
            child_role_id: None,
            user_id: None,
            permission_id: None,
            details: None,
        }
    }

    pub fn role_id(mut self, id: Uuid) -> Self {
        self.role_id = Some(id);
        self
    }

    pub fn parent_role_id(mut self, id: Uuid) -> Self {
        self.parent_role_id = Some(id);
        self
    }

    pub fn child_role_id(mut self, id: Uuid) -> Self {
        self.child_role_id = Some(id);
        self
    }

    pub fn user_id(mut self, id: Uuid) -> Self {
        self.user_id = Some(id);
        self
    }

    pub fn permission_id(mut self, id: Uuid) -> Self {
        self.permission_id = Some(id);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn build(self) -> InheritanceAuditEntry {
        InheritanceAuditEntry {
            id: Uuid::new_v4(),
            action: self.action.as_str().to_string(),
            performed_by: self.performed_by,
            role_id: self.role_id,
            parent_role_id: self.parent_role_id,
            child_role_id: self.child_role_id,
            user_id: self.user_id,
            permission_id: self.permission_id,
            details: self.details,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_action_string() {
        let actor = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();

        let entry = InheritanceAuditBuilder::new(actor, InheritanceAuditAction::InheritanceCreated)
            .parent_role_id(parent)
            .child_role_id(child)
            .details(serde_json::json!({ "inherit_all": true }))
            .build();

        assert_eq!(entry.action, "inheritance_created");
        assert_eq!(entry.performed_by, actor);
        assert_eq!(entry.parent_role_id, Some(parent));
        assert_eq!(entry.child_role_id, Some(child));
        assert!(entry.details.is_some());
    }
}
