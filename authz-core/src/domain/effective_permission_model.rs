// authz-core/src/domain/effective_permission_model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// 解決済みの実効権限セット
///
/// `superuser` が立っている場合は全権限を持つマーカーであり、
/// `codes` の内容にかかわらず `contains` は常に真を返す。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    pub user_id: Uuid,
    pub superuser: bool,
    pub codes: BTreeSet<String>,
    pub resolved_at: DateTime<Utc>,
}

impl EffectivePermissions {
    pub fn new(user_id: Uuid, codes: BTreeSet<String>) -> Self {
        Self {
            user_id,
            superuser: false,
            codes,
            resolved_at: Utc::now(),
        }
    }

    /// スーパーユーザーの「全権限」マーカー
    pub fn superuser(user_id: Uuid) -> Self {
        Self {
            user_id,
            superuser: true,
            codes: BTreeSet::new(),
            resolved_at: Utc::now(),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.superuser || self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn sorted_codes(&self) -> Vec<String> {
        self.codes.iter().cloned().collect()
    }
}

/// 権限コードの由来情報
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionProvenance {
    pub granted: bool,
    /// 最も近い寄与ロールのコード（オーバーライド由来の場合は None）
    pub source_role_code: Option<String>,
    /// 発見された探索深度（直接付与は 0）
    pub inheritance_depth: u32,
}

/// カテゴリごとに全権限コードの保持状況をまとめたビュー
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionMatrix {
    pub user_id: Uuid,
    pub categories: BTreeMap<String, BTreeMap<String, bool>>,
    pub generated_at: DateTime<Utc>,
}

/// ロールメンバーシップの要約
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMembershipSummary {
    pub role_id: Uuid,
    pub role_code: String,
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub is_primary: bool,
}

/// 管理画面向けの権限サマリー
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSummary {
    pub user_id: Uuid,
    pub superuser: bool,
    pub roles: Vec<RoleMembershipSummary>,
    pub total_permissions: usize,
    pub permission_codes: Vec<String>,
    pub category_breakdown: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_checks_code_set() {
        let mut codes = BTreeSet::new();
        codes.insert("doc.read".to_string());
        let effective = EffectivePermissions::new(Uuid::new_v4(), codes);

        assert!(effective.contains("doc.read"));
        assert!(!effective.contains("doc.write"));
    }

    #[test]
    fn test_superuser_marker_grants_everything() {
        let effective = EffectivePermissions::superuser(Uuid::new_v4());
        assert!(effective.contains("doc.read"));
        assert!(effective.contains("never.registered"));
        assert!(effective.is_empty());
    }

    #[test]
    fn test_sorted_codes_are_ordered() {
        let mut codes = BTreeSet::new();
        codes.insert("user.view".to_string());
        codes.insert("doc.read".to_string());
        let effective = EffectivePermissions::new(Uuid::new_v4(), codes);

        assert_eq!(
            effective.sorted_codes(),
            vec!["doc.read".to_string(), "user.view".to_string()]
        );
    }
}
