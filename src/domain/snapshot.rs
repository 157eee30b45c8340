// ==========================================
// 教学大纲管理系统 - 版本快照领域模型
// ==========================================
// 红线: 快照只插入，创建后永不修改
// 用途: 审计追溯、版本对比 (对比逻辑委托外部 AI 服务)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// SyllabusSnapshot - 全聚合时点快照
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyllabusSnapshot {
    pub snapshot_id: String,           // 快照ID
    pub syllabus_id: String,           // 所属大纲
    pub version: String,               // 捕获时的版本号
    pub payload_json: serde_json::Value, // 完整聚合 JSON (不透明)
    pub created_by: String,            // 触发者
    pub created_at: NaiveDateTime,     // 捕获时间
}

impl SyllabusSnapshot {
    /// 构造一条新快照
    pub fn new(
        syllabus_id: &str,
        version: &str,
        payload_json: serde_json::Value,
        created_by: &str,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            syllabus_id: syllabus_id.to_string(),
            version: version.to_string(),
            payload_json,
            created_by: created_by.to_string(),
            created_at: now,
        }
    }
}
