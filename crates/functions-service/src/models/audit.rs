//! 审计日志

use serde_json::Value;
use uuid::Uuid;

/// 待写入的审计记录
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor_id: Uuid,
    pub action: &'static str,
    pub target_type: &'static str,
    pub target_id: Option<Uuid>,
    pub details: Value,
}

impl AuditEntry {
    pub fn new(
        actor_id: Uuid,
        action: &'static str,
        target_type: &'static str,
        target_id: Option<Uuid>,
    ) -> Self {
        Self {
            actor_id,
            action,
            target_type,
            target_id,
            details: serde_json::json!({}),
        }
    }

    /// 目标 ID 在写入时才确定（例如新建记录）
    pub fn with_target(mut self, target_id: Uuid) -> Self {
        self.target_id = Some(target_id);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}
