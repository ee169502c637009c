// authz-core/src/domain/bulk_operation_model.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// 一括操作の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkPermissionOperation {
    Grant,
    Revoke,
}

impl BulkPermissionOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkPermissionOperation::Grant => "grant",
            BulkPermissionOperation::Revoke => "revoke",
        }
    }

    /// 文字列から操作種別を解析
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "grant" => Some(BulkPermissionOperation::Grant),
            "revoke" => Some(BulkPermissionOperation::Revoke),
            _ => None,
        }
    }
}

impl std::fmt::Display for BulkPermissionOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 一括操作の対象種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkTargetType {
    Roles,
    Users,
}

impl BulkTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkTargetType::Roles => "roles",
            BulkTargetType::Users => "users",
        }
    }

    /// 文字列から対象種別を解析
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "roles" => Some(BulkTargetType::Roles),
            "users" => Some(BulkTargetType::Users),
            _ => None,
        }
    }
}

impl std::fmt::Display for BulkTargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 一括操作の入力
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkPermissionOperationInput {
    pub operation: String,
    pub target_type: String,
    #[validate(length(min = 1, message = "At least one target id is required"))]
    pub target_ids: Vec<Uuid>,
    #[validate(length(min = 1, message = "At least one permission id is required"))]
    pub permission_ids: Vec<Uuid>,
    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: Option<String>,
}

/// 一括操作中の個別失敗
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperationFailure {
    pub target_id: Uuid,
    pub error_message: String,
}

/// 一括操作の結果
///
/// 個別の失敗はエラーではなくデータとして返す。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkOperationResult {
    pub operation: String,
    pub target_type: String,
    pub success_count: usize,
    pub failure_count: usize,
    pub failures: Vec<BulkOperationFailure>,
}

impl BulkOperationResult {
    pub fn status(&self) -> &'static str {
        if self.failure_count == 0 {
            "completed"
        } else if self.success_count == 0 {
            "failed"
        } else {
            "partially_completed"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_conversion() {
        assert_eq!(
            BulkPermissionOperation::from_str("GRANT"),
            Some(BulkPermissionOperation::Grant)
        );
        assert_eq!(BulkPermissionOperation::from_str("delete"), None);
        assert_eq!(BulkPermissionOperation::Revoke.to_string(), "revoke");
    }

    #[test]
    fn test_target_type_conversion() {
        assert_eq!(BulkTargetType::from_str("roles"), Some(BulkTargetType::Roles));
        assert_eq!(BulkTargetType::from_str("Users"), Some(BulkTargetType::Users));
        assert_eq!(BulkTargetType::from_str("teams"), None);
    }

    #[test]
    fn test_result_status() {
        let mut result = BulkOperationResult {
            operation: "grant".to_string(),
            target_type: "roles".to_string(),
            success_count: 3,
            failure_count: 0,
            failures: Vec::new(),
        };
        assert_eq!(result.status(), "completed");

        result.failure_count = 1;
        assert_eq!(result.status(), "partially_completed");

        result.success_count = 0;
        assert_eq!(result.status(), "failed");
    }

    #[test]
    fn test_input_validation_rejects_empty_targets() {
        let input = BulkPermissionOperationInput {
            operation: "grant".to_string(),
            target_type: "roles".to_string(),
            target_ids: Vec::new(),
            permission_ids: vec![Uuid::new_v4()],
            reason: None,
        };
        assert!(input.validate().is_err());
    }
}
