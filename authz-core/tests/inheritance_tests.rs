// tests/inheritance_tests.rs
use authz_core::error::AppError;
use authz_core::repository::permission_store::PermissionStore;
use uuid::Uuid;

mod common;
use common::TestApp;

// 自分自身を親にするルールは構造エラーになる。
#[tokio::test]
async fn test_self_parent_rule_is_rejected() {
    let app = TestApp::new();
    let role = app.create_role("editor").await;

    let result = app
        .inheritance_service
        .create_inheritance_rule(role.id, role.id, true, Vec::new(), 0, app.actor)
        .await;

    assert!(matches!(result, Err(AppError::BusinessLogicError(_))));
}

// 直接の循環（A→B があるときの B→A）は拒否される。
#[tokio::test]
async fn test_direct_cycle_is_rejected() {
    let app = TestApp::new();
    let role_a = app.create_role("role_a").await;
    let role_b = app.create_role("role_b").await;

    app.inherit_all(role_a.id, role_b.id).await;

    let result = app
        .inheritance_service
        .create_inheritance_rule(role_b.id, role_a.id, true, Vec::new(), 0, app.actor)
        .await;

    assert!(matches!(result, Err(AppError::BusinessLogicError(_))));
}

// 推移的な循環も拒否され、ストアは変更されない。
#[tokio::test]
async fn test_transitive_cycle_is_rejected_and_store_unchanged() {
    let app = TestApp::new();
    let role_a = app.create_role("role_a").await;
    let role_b = app.create_role("role_b").await;
    let role_c = app.create_role("role_c").await;

    // b は a から、c は b から継承する
    app.inherit_all(role_a.id, role_b.id).await;
    app.inherit_all(role_b.id, role_c.id).await;

    let audit_before = app.audit_repository.len().await;

    // a が c から継承すると a→b→c→a の循環になる
    let result = app
        .inheritance_service
        .create_inheritance_rule(role_c.id, role_a.id, true, Vec::new(), 0, app.actor)
        .await;

    assert!(matches!(result, Err(AppError::BusinessLogicError(_))));
    assert!(app
        .store
        .find_rules_by_child(role_a.id)
        .await
        .unwrap()
        .is_empty());
    // 拒否された変更は監査にも残らない
    assert_eq!(app.audit_repository.len().await, audit_before);
}

// 同じロール組への重複エッジは競合になる。
#[tokio::test]
async fn test_duplicate_edge_is_a_conflict() {
    let app = TestApp::new();
    let parent = app.create_role("parent").await;
    let child = app.create_role("child").await;

    app.inherit_all(parent.id, child.id).await;

    let result = app
        .inheritance_service
        .create_inheritance_rule(parent.id, child.id, false, Vec::new(), 0, app.actor)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

// 未知のロールはNotFoundになる。
#[tokio::test]
async fn test_unknown_role_is_not_found() {
    let app = TestApp::new();
    let role = app.create_role("editor").await;

    let result = app
        .inheritance_service
        .create_inheritance_rule(Uuid::new_v4(), role.id, true, Vec::new(), 0, app.actor)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// 許可リストに未知の権限idを含むルールはNotFoundになる。
#[tokio::test]
async fn test_unknown_permission_in_allow_list_is_not_found() {
    let app = TestApp::new();
    let parent = app.create_role("parent").await;
    let child = app.create_role("child").await;

    let result = app
        .inheritance_service
        .create_inheritance_rule(
            parent.id,
            child.id,
            false,
            vec![Uuid::new_v4()],
            0,
            app.actor,
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// expand は最も近い寄与ロールと深度を記録する。
#[tokio::test]
async fn test_expand_reports_nearest_source_and_depth() {
    let app = TestApp::new();

    let p_near = app.create_permission("doc.read").await;
    let p_far = app.create_permission("doc.archive").await;
    let child = app.create_role("junior").await;
    let parent = app.create_role("senior").await;
    let grandparent = app.create_role("principal").await;

    app.grant(parent.id, p_near.id).await;
    app.grant(grandparent.id, p_far.id).await;
    // 同じ権限を複数経路で得る: grandparent にも doc.read を付与
    app.grant(grandparent.id, p_near.id).await;

    app.inherit_all(parent.id, child.id).await;
    app.inherit_all(grandparent.id, parent.id).await;

    let inherited = app.inheritance_service.expand(child.id).await.unwrap();

    let near = inherited.iter().find(|i| i.code == "doc.read").unwrap();
    assert_eq!(near.source_role_code, "senior");
    assert_eq!(near.depth, 1);

    let far = inherited.iter().find(|i| i.code == "doc.archive").unwrap();
    assert_eq!(far.source_role_code, "principal");
    assert_eq!(far.depth, 2);
}

// 非アクティブな親ロールは継承に寄与しない。
#[tokio::test]
async fn test_inactive_parent_contributes_nothing() {
    let app = TestApp::new();

    let permission = app.create_permission("doc.read").await;
    let parent = app.create_role("parent").await;
    let child = app.create_role("child").await;

    app.grant(parent.id, permission.id).await;
    app.inherit_all(parent.id, child.id).await;
    app.admin_service.deactivate_role(parent.id).await.unwrap();

    let inherited = app.inheritance_service.expand(child.id).await.unwrap();
    assert!(inherited.is_empty());
}

// ルールの作成と削除はそれぞれ監査エントリを残し、ロール単位で引ける。
#[tokio::test]
async fn test_rule_mutations_are_audited() {
    let app = TestApp::new();
    let parent = app.create_role("parent").await;
    let child = app.create_role("child").await;

    let rule = app
        .inheritance_service
        .create_inheritance_rule(parent.id, child.id, true, Vec::new(), 0, app.actor)
        .await
        .unwrap();
    app.inheritance_service
        .delete_inheritance_rule(rule.id, app.actor)
        .await
        .unwrap();

    let entries = app
        .audit_service
        .get_role_audit_logs(child.id, 10)
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "inheritance_removed");
    assert_eq!(entries[1].action, "inheritance_created");
    assert_eq!(entries[0].performed_by, app.actor);
}

// 存在しないルールの削除はNotFoundになる。
#[tokio::test]
async fn test_delete_unknown_rule_is_not_found() {
    let app = TestApp::new();
    let result = app
        .inheritance_service
        .delete_inheritance_rule(Uuid::new_v4(), app.actor)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// ルール一覧は子・親どちらの立場のルールも含む。
#[tokio::test]
async fn test_list_rules_for_role() {
    let app = TestApp::new();
    let upper = app.create_role("upper").await;
    let middle = app.create_role("middle").await;
    let lower = app.create_role("lower").await;

    app.inherit_all(upper.id, middle.id).await;
    app.inherit_all(middle.id, lower.id).await;

    let rules = app
        .inheritance_service
        .list_rules_for_role(middle.id)
        .await
        .unwrap();

    assert_eq!(rules.len(), 2);
}

// ルール削除後は継承由来の権限が失われる（キャッシュも追随する）。
#[tokio::test]
async fn test_rule_deletion_revokes_inherited_permissions() {
    let app = TestApp::new();
    let user = app.create_user().await;

    let permission = app.create_permission("doc.read").await;
    let parent = app.create_role("parent").await;
    let child = app.create_role("child").await;
    app.grant(parent.id, permission.id).await;
    app.inherit_all(parent.id, child.id).await;
    app.assign(user, child.id).await;

    assert!(app
        .effective_service
        .check_permission(user, "doc.read", None, None)
        .await
        .unwrap());

    let rule = app.store.find_rules_by_child(child.id).await.unwrap()[0].clone();
    app.inheritance_service
        .delete_inheritance_rule(rule.id, app.actor)
        .await
        .unwrap();

    assert!(!app
        .effective_service
        .check_permission(user, "doc.read", None, None)
        .await
        .unwrap());
}
