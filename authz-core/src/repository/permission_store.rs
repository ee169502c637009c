// authz-core/src/repository/permission_store.rs

use crate::domain::inheritance_rule_model::RoleInheritanceRule;
use crate::domain::permission_dependency_model::PermissionDependency;
use crate::domain::permission_model::Permission;
use crate::domain::permission_override_model::UserPermissionOverride;
use crate::domain::role_model::{Role, RolePermission};
use crate::domain::user_role_model::UserRole;
use crate::error::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

/// 権限エンティティ群への読み書きポート
///
/// ビジネスルールは持たない。永続化技術は利用側が選択し、
/// テストや組み込み用途には `in_memory` 実装を使う。
#[async_trait]
pub trait PermissionStore: Send + Sync {
    // --- 権限 ---
    async fn find_permission_by_id(&self, id: Uuid) -> AppResult<Option<Permission>>;
    async fn find_permission_by_code(&self, code: &str) -> AppResult<Option<Permission>>;
    async fn find_permissions_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Permission>>;
    async fn find_active_permissions(&self) -> AppResult<Vec<Permission>>;
    async fn create_permission(&self, permission: Permission) -> AppResult<Permission>;
    async fn update_permission(&self, permission: Permission) -> AppResult<Permission>;

    // --- ロール ---
    async fn find_role_by_id(&self, id: Uuid) -> AppResult<Option<Role>>;
    async fn find_role_by_code(
        &self,
        code: &str,
        organization_id: Option<Uuid>,
    ) -> AppResult<Option<Role>>;
    async fn create_role(&self, role: Role) -> AppResult<Role>;
    async fn update_role(&self, role: Role) -> AppResult<Role>;

    // --- ロールへの直接付与 ---
    async fn find_role_permissions(&self, role_id: Uuid) -> AppResult<Vec<RolePermission>>;
    /// 既に同じ組が存在する場合は既存の行を返す
    async fn add_role_permission(&self, grant: RolePermission) -> AppResult<RolePermission>;
    /// 削除された場合は true、該当行が無い場合は false
    async fn remove_role_permission(&self, role_id: Uuid, permission_id: Uuid)
        -> AppResult<bool>;

    // --- ユーザーのロールメンバーシップ ---
    async fn find_active_user_roles(&self, user_id: Uuid) -> AppResult<Vec<UserRole>>;
    async fn find_user_roles_by_role(&self, role_id: Uuid) -> AppResult<Vec<UserRole>>;
    async fn add_user_role(&self, user_role: UserRole) -> AppResult<UserRole>;
    async fn remove_user_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<bool>;

    // --- 継承ルール ---
    async fn find_inheritance_rule_by_id(
        &self,
        id: Uuid,
    ) -> AppResult<Option<RoleInheritanceRule>>;
    /// 指定ロールが子であるルール（このロールが継承する側）
    async fn find_rules_by_child(&self, child_role_id: Uuid)
        -> AppResult<Vec<RoleInheritanceRule>>;
    /// 指定ロールが親であるルール（このロールが継承される側）
    async fn find_rules_by_parent(
        &self,
        parent_role_id: Uuid,
    ) -> AppResult<Vec<RoleInheritanceRule>>;
    async fn create_inheritance_rule(
        &self,
        rule: RoleInheritanceRule,
    ) -> AppResult<RoleInheritanceRule>;
    async fn delete_inheritance_rule(&self, id: Uuid) -> AppResult<bool>;

    // --- オーバーライド ---
    async fn find_override_by_id(&self, id: Uuid) -> AppResult<Option<UserPermissionOverride>>;
    async fn find_overrides_by_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<UserPermissionOverride>>;
    async fn create_override(
        &self,
        user_override: UserPermissionOverride,
    ) -> AppResult<UserPermissionOverride>;
    async fn delete_override(&self, id: Uuid) -> AppResult<bool>;

    // --- 依存宣言 ---
    async fn create_permission_dependency(
        &self,
        dependency: PermissionDependency,
    ) -> AppResult<PermissionDependency>;
    async fn find_dependencies_for_permission(
        &self,
        permission_id: Uuid,
    ) -> AppResult<Vec<PermissionDependency>>;
}
