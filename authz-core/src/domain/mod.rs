// src/domain/mod.rs
pub mod bulk_operation_model;
pub mod effective_permission_model;
pub mod inheritance_audit_model;
pub mod inheritance_rule_model;
pub mod permission_dependency_model;
pub mod permission_model;
pub mod permission_override_model;
pub mod role_model;
pub mod user_model;
pub mod user_role_model;
