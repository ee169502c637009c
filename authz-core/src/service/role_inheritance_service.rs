// authz-core/src/service/role_inheritance_service.rs
//
// ロール継承の解決と継承ルールの管理
// 循環は書き込み時に拒否し、読み取り時は訪問済みセットと深度上限で防御する

use crate::config::AuthzConfig;
use crate::domain::inheritance_rule_model::RoleInheritanceRule;
use crate::domain::role_model::Role;
use crate::error::AppResult;
use crate::log_with_context;
use crate::repository::permission_store::PermissionStore;
use crate::service::audit_log_service::InheritanceAuditService;
use crate::service::permission_cache_service::PermissionCacheService;
use crate::utils::error_helper::{business_logic_error, conflict_error, not_found_error};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

/// 継承によって得られた権限とその由来
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InheritedPermission {
    pub permission_id: Uuid,
    pub code: String,
    /// 最も近い寄与ロールのコード
    pub source_role_code: String,
    /// 発見された探索深度（直接の親は 1）
    pub depth: u32,
}

pub struct RoleInheritanceService {
    store: Arc<dyn PermissionStore>,
    audit_service: Arc<InheritanceAuditService>,
    cache_service: Arc<PermissionCacheService>,
    max_depth: usize,
}

impl RoleInheritanceService {
    pub fn new(
        store: Arc<dyn PermissionStore>,
        audit_service: Arc<InheritanceAuditService>,
        cache_service: Arc<PermissionCacheService>,
        config: &AuthzConfig,
    ) -> Self {
        Self {
            store,
            audit_service,
            cache_service,
            max_depth: config.max_inheritance_depth,
        }
    }

    /// 指定ロールが継承する権限の推移閉包を計算する
    ///
    /// 子として現れる継承エッジを幅優先で辿る。`inherit_all` エッジは
    /// 親の直接付与を取り込んだうえで親の先祖へ探索を続け、許可リスト
    /// エッジは宣言された権限のみを加えて親より先へは進まない。
    /// 各コードの由来は最初に発見した（= 最も近い）寄与ロールを記録する。
    pub async fn expand(&self, role_id: Uuid) -> AppResult<Vec<InheritedPermission>> {
        let mut collected: HashMap<String, InheritedPermission> = HashMap::new();
        let mut visited: HashSet<Uuid> = HashSet::from([role_id]);
        let mut queue: VecDeque<(Uuid, u32)> = VecDeque::from([(role_id, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth as usize >= self.max_depth {
                log_with_context!(
                    tracing::Level::WARN,
                    "Inheritance depth cap reached, stopping traversal",
                    "role_id" => role_id,
                    "depth" => depth
                );
                continue;
            }

            for rule in self.store.find_rules_by_child(current).await? {
                let parent = match self.store.find_role_by_id(rule.parent_role_id).await? {
                    Some(parent) if parent.is_active => parent,
                    _ => continue,
                };

                if rule.inherit_all {
                    if !visited.insert(parent.id) {
                        continue;
                    }
                    let grants = self.store.find_role_permissions(parent.id).await?;
                    let ids: Vec<Uuid> = grants.iter().map(|g| g.permission_id).collect();
                    self.collect_permissions(&mut collected, &ids, &parent, depth + 1)
                        .await?;
                    queue.push_back((parent.id, depth + 1));
                } else {
                    self.collect_permissions(
                        &mut collected,
                        &rule.permission_ids,
                        &parent,
                        depth + 1,
                    )
                    .await?;
                }
            }
        }

        Ok(collected.into_values().collect())
    }

    async fn collect_permissions(
        &self,
        collected: &mut HashMap<String, InheritedPermission>,
        permission_ids: &[Uuid],
        source: &Role,
        depth: u32,
    ) -> AppResult<()> {
        for permission in self.store.find_permissions_by_ids(permission_ids).await? {
            if !permission.is_active {
                continue;
            }
            collected
                .entry(permission.code.clone())
                .or_insert(InheritedPermission {
                    permission_id: permission.id,
                    code: permission.code,
                    source_role_code: source.code.clone(),
                    depth,
                });
        }
        Ok(())
    }

    /// 新しい継承エッジが循環を作らないことを検証する
    ///
    /// `parent == child` は構造エラー。そうでなければ `child` を起点に
    /// 子孫グラフを辿り、`parent` に到達する場合は循環として拒否する。
    pub async fn validate_new_edge(&self, parent_role_id: Uuid, child_role_id: Uuid) -> AppResult<()> {
        if parent_role_id == child_role_id {
            return Err(business_logic_error(
                "A role cannot inherit from itself",
                "role_inheritance_service::validate_new_edge",
            ));
        }

        let mut visited: HashSet<Uuid> = HashSet::from([child_role_id]);
        let mut queue: VecDeque<Uuid> = VecDeque::from([child_role_id]);

        while let Some(current) = queue.pop_front() {
            for rule in self.store.find_rules_by_parent(current).await? {
                if rule.child_role_id == parent_role_id {
                    return Err(business_logic_error(
                        "Circular inheritance detected",
                        "role_inheritance_service::validate_new_edge",
                    ));
                }
                if visited.insert(rule.child_role_id) {
                    queue.push_back(rule.child_role_id);
                }
            }
        }

        Ok(())
    }

    /// 継承ルールを作成する
    pub async fn create_inheritance_rule(
        &self,
        parent_role_id: Uuid,
        child_role_id: Uuid,
        inherit_all: bool,
        permission_ids: Vec<Uuid>,
        priority: i32,
        performed_by: Uuid,
    ) -> AppResult<RoleInheritanceRule> {
        const CONTEXT: &str = "role_inheritance_service::create_inheritance_rule";

        log_with_context!(
            tracing::Level::DEBUG,
            "Creating inheritance rule",
            "parent_role_id" => parent_role_id,
            "child_role_id" => child_role_id,
            "inherit_all" => inherit_all,
            "performed_by" => performed_by
        );

        self.store
            .find_role_by_id(parent_role_id)
            .await?
            .ok_or_else(|| not_found_error("Role", &parent_role_id.to_string(), CONTEXT))?;
        self.store
            .find_role_by_id(child_role_id)
            .await?
            .ok_or_else(|| not_found_error("Role", &child_role_id.to_string(), CONTEXT))?;

        if self
            .store
            .find_rules_by_child(child_role_id)
            .await?
            .iter()
            .any(|rule| rule.parent_role_id == parent_role_id)
        {
            return Err(conflict_error(
                "Inheritance rule already exists for this role pair",
                CONTEXT,
            ));
        }

        self.validate_new_edge(parent_role_id, child_role_id).await?;

        if !inherit_all {
            let found = self.store.find_permissions_by_ids(&permission_ids).await?;
            if found.len() != permission_ids.len() {
                return Err(not_found_error(
                    "Permission",
                    "one or more ids in the allow list",
                    CONTEXT,
                ));
            }
        }

        let rule = RoleInheritanceRule::new(
            parent_role_id,
            child_role_id,
            inherit_all,
            permission_ids,
            priority,
            performed_by,
        );

        // 変更は先に監査へ記録してからストアに反映する
        self.audit_service
            .log_inheritance_created(performed_by, &rule)
            .await?;
        let rule = self.store.create_inheritance_rule(rule).await?;

        self.invalidate_affected_users(child_role_id).await?;

        log_with_context!(
            tracing::Level::INFO,
            "Inheritance rule created",
            "rule_id" => rule.id,
            "parent_role_id" => parent_role_id,
            "child_role_id" => child_role_id
        );

        Ok(rule)
    }

    /// 継承ルールを削除する
    pub async fn delete_inheritance_rule(
        &self,
        rule_id: Uuid,
        performed_by: Uuid,
    ) -> AppResult<()> {
        const CONTEXT: &str = "role_inheritance_service::delete_inheritance_rule";

        let rule = self
            .store
            .find_inheritance_rule_by_id(rule_id)
            .await?
            .ok_or_else(|| not_found_error("Inheritance rule", &rule_id.to_string(), CONTEXT))?;

        self.audit_service
            .log_inheritance_removed(performed_by, &rule)
            .await?;
        self.store.delete_inheritance_rule(rule_id).await?;

        self.invalidate_affected_users(rule.child_role_id).await?;

        log_with_context!(
            tracing::Level::INFO,
            "Inheritance rule deleted",
            "rule_id" => rule_id,
            "child_role_id" => rule.child_role_id
        );

        Ok(())
    }

    /// ロールが関与する継承ルールを一覧する（priority 降順の表示順）
    pub async fn list_rules_for_role(&self, role_id: Uuid) -> AppResult<Vec<RoleInheritanceRule>> {
        let mut rules = self.store.find_rules_by_child(role_id).await?;
        rules.extend(self.store.find_rules_by_parent(role_id).await?);
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        rules.dedup_by_key(|rule| rule.id);
        Ok(rules)
    }

    /// ロール変更の影響を受ける全ユーザーを収集する
    ///
    /// ロール自身の保持者に加えて、このロールを推移的に継承する
    /// 子孫ロールの保持者も対象になる。
    pub async fn affected_user_ids(&self, role_id: Uuid) -> AppResult<HashSet<Uuid>> {
        let mut roles: HashSet<Uuid> = HashSet::from([role_id]);
        let mut queue: VecDeque<Uuid> = VecDeque::from([role_id]);

        while let Some(current) = queue.pop_front() {
            for rule in self.store.find_rules_by_parent(current).await? {
                if roles.insert(rule.child_role_id) {
                    queue.push_back(rule.child_role_id);
                }
            }
        }

        let mut users = HashSet::new();
        for role in roles {
            for membership in self.store.find_user_roles_by_role(role).await? {
                if membership.is_active {
                    users.insert(membership.user_id);
                }
            }
        }
        Ok(users)
    }

    /// ロール変更の影響を受ける全ユーザーのキャッシュを無効化する
    pub async fn invalidate_affected_users(&self, role_id: Uuid) -> AppResult<()> {
        let users = self.affected_user_ids(role_id).await?;
        let affected = users.len();
        for user_id in users {
            self.cache_service.invalidate_user(user_id, None, None).await;
        }

        log_with_context!(
            tracing::Level::DEBUG,
            "Invalidated caches for role change",
            "role_id" => role_id,
            "affected_users" => affected
        );
        Ok(())
    }
}
