// src/service/mod.rs
pub mod audit_log_service;
pub mod bulk_operation_service;
pub mod effective_permission_service;
pub mod permission_admin_service;
pub mod permission_cache_service;
pub mod permission_override_service;
pub mod role_inheritance_service;
