// authz-core/src/utils/permission.rs

use crate::domain::effective_permission_model::EffectivePermissions;
use crate::error::AppResult;
use crate::utils::error_helper::validation_error;

/// 解決済み権限セットに対する純粋なチェック機能
pub struct PermissionChecker;

impl PermissionChecker {
    /// 単一演算子の権限式を評価する
    ///
    /// 式が `" AND "` を含む場合は分割した全コードの保持を要求し、
    /// そうでなく `" OR "` を含む場合はいずれかの保持で真とする。
    /// 演算子を含まない式は単一コードとして直接チェックする。
    ///
    /// 括弧によるグループ化と演算子の混在は対応しない。混在した式は
    /// 最初に `" AND "` で分割されるため、残りの演算子はコードの一部と
    /// して扱われる（既知の制約）。
    pub fn evaluate_expression(
        effective: &EffectivePermissions,
        expression: &str,
    ) -> AppResult<bool> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(validation_error("expression", "Expression must not be empty"));
        }

        if expression.contains(" AND ") {
            Ok(expression
                .split(" AND ")
                .map(str::trim)
                .all(|code| effective.contains(code)))
        } else if expression.contains(" OR ") {
            Ok(expression
                .split(" OR ")
                .map(str::trim)
                .any(|code| effective.contains(code)))
        } else {
            Ok(effective.contains(expression))
        }
    }
}
