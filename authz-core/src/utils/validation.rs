// authz-core/src/utils/validation.rs
use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// 権限コード用正規表現（`category.action` 形式、小文字・数字・アンダースコア）
pub static PERMISSION_CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*\.[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").unwrap());

/// ロールコード用正規表現（小文字・数字・アンダースコア）
pub static ROLE_CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

/// 権限コードバリデーション
pub fn validate_permission_code(code: &str) -> Result<(), ValidationError> {
    if PERMISSION_CODE_REGEX.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_permission_code"))
    }
}

/// ロールコードバリデーション
pub fn validate_role_code(code: &str) -> Result<(), ValidationError> {
    if ROLE_CODE_REGEX.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_role_code"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_code_regex() {
        assert!(PERMISSION_CODE_REGEX.is_match("user.view"));
        assert!(PERMISSION_CODE_REGEX.is_match("doc.share_external"));
        assert!(PERMISSION_CODE_REGEX.is_match("report.export.csv"));
        assert!(!PERMISSION_CODE_REGEX.is_match("user"));
        assert!(!PERMISSION_CODE_REGEX.is_match("User.View"));
        assert!(!PERMISSION_CODE_REGEX.is_match("user..view"));
        assert!(!PERMISSION_CODE_REGEX.is_match(".view"));
        assert!(!PERMISSION_CODE_REGEX.is_match("user.view "));
    }

    #[test]
    fn test_role_code_regex() {
        assert!(ROLE_CODE_REGEX.is_match("editor"));
        assert!(ROLE_CODE_REGEX.is_match("org_admin2"));
        assert!(!ROLE_CODE_REGEX.is_match("Editor"));
        assert!(!ROLE_CODE_REGEX.is_match("org-admin"));
        assert!(!ROLE_CODE_REGEX.is_match(""));
    }

    #[test]
    fn test_validate_permission_code() {
        assert!(validate_permission_code("task.create").is_ok());
        assert!(validate_permission_code("task").is_err());
    }
}
