// authz-core/src/domain/user_model.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 認証モジュールが提供するユーザー情報の最小形
///
/// 本クレートはユーザーの登録・認証を扱わない。権限解決に必要な
/// フィールドのみを参照する。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl AuthUser {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            is_active: true,
            is_superuser: false,
        }
    }

    pub fn superuser(id: Uuid) -> Self {
        Self {
            id,
            is_active: true,
            is_superuser: true,
        }
    }
}
