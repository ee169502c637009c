// authz-core/src/domain/permission_model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 権限エンティティ
///
/// コードは `category.action` 形式（例: `user.view`）で一意。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// コードの最初のドットより前をカテゴリとして返す
    pub fn category(&self) -> &str {
        Self::category_of(&self.code)
    }

    /// 任意のコード文字列からカテゴリを導出する（ドットが無い場合はコード全体）
    pub fn category_of(code: &str) -> &str {
        code.split_once('.').map_or(code, |(category, _)| category)
    }
}
