// ==========================================
// 教学大纲管理系统 - 工作流领域模型
// ==========================================
// 红线: workflow_log 只追加，审计轨迹不得回溯修改
// 红线: 每份在途大纲至多一条 current_workflow 记录
// ==========================================

use crate::domain::types::{SyllabusStatus, WorkflowAction};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// WorkflowLog - 审批操作日志（只追加）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowLog {
    pub log_id: String,             // 日志ID
    pub syllabus_id: String,        // 所属大纲
    pub actor_id: String,           // 操作者
    pub action: WorkflowAction,     // 动作 (SUBMIT/APPROVE/RETURN/REJECT)
    pub from_status: SyllabusStatus, // 转换前状态
    pub to_status: SyllabusStatus,  // 转换后状态
    pub comment: Option<String>,    // 意见 (RETURN/REJECT 必填)
    pub created_at: NaiveDateTime,  // 操作时间
}

impl WorkflowLog {
    /// 构造一条新日志
    pub fn new(
        syllabus_id: &str,
        actor_id: &str,
        action: WorkflowAction,
        from_status: SyllabusStatus,
        to_status: SyllabusStatus,
        comment: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            log_id: uuid::Uuid::new_v4().to_string(),
            syllabus_id: syllabus_id.to_string(),
            actor_id: actor_id.to_string(),
            action,
            from_status,
            to_status,
            comment,
            created_at: now,
        }
    }
}

// ==========================================
// CurrentWorkflow - 在途流程记录
// ==========================================
// 仅在大纲处于流水线中段时存在；到达终态即删除整行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWorkflow {
    pub syllabus_id: String,        // 大纲ID (主键)
    pub status: SyllabusStatus,     // 当前在途状态
    pub due_date: NaiveDateTime,    // 处理截止时间
    pub last_action_at: NaiveDateTime, // 最近一次操作时间
}
