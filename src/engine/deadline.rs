// ==========================================
// 教学大纲管理系统 - 审批时限扫描
// ==========================================
// 职责: 扫描在途记录，对已逾期的环节向责任角色催办
// 红线: 扫描只读，不修改任何大纲/在途状态；重复执行重复催办
// ==========================================

use crate::domain::types::{Role, SyllabusStatus};
use crate::engine::error::WorkflowResult;
use crate::engine::events::{Notification, OptionalNotificationSink};
use crate::repository::CurrentWorkflowRepository;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 在途状态对应的催办角色（ADMIN 始终抄送）
fn escalation_roles(status: SyllabusStatus) -> Option<Vec<Role>> {
    match status {
        SyllabusStatus::PendingReview => Some(vec![Role::HeadOfDepartment, Role::Admin]),
        SyllabusStatus::PendingApproval => Some(vec![Role::AcademicAffairs, Role::Admin]),
        SyllabusStatus::Approved => Some(vec![Role::Principal, Role::Admin]),
        _ => None,
    }
}

// ==========================================
// DeadlineScanner - 时限扫描器
// ==========================================
pub struct DeadlineScanner {
    current_workflow_repo: CurrentWorkflowRepository,
}

impl DeadlineScanner {
    /// 创建时限扫描器
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            current_workflow_repo: CurrentWorkflowRepository::new(conn),
        }
    }

    /// 扫描截至给定时刻已逾期的在途记录并逐条催办
    ///
    /// # 返回
    /// - Ok(count): 本次发现的逾期记录数（与通知是否送达无关）
    pub fn check_overdue(
        &self,
        now: NaiveDateTime,
        notifier: &OptionalNotificationSink,
    ) -> WorkflowResult<usize> {
        let overdue = self.current_workflow_repo.list_overdue(now)?;
        for record in &overdue {
            let roles = match escalation_roles(record.status) {
                Some(roles) => roles,
                None => {
                    // 在途表不应出现非待办状态，出现即为数据异常
                    tracing::warn!(
                        "在途记录状态异常，跳过催办: syllabus_id={}, status={}",
                        record.syllabus_id,
                        record.status
                    );
                    continue;
                }
            };
            notifier.notify(Notification::to_roles(
                roles,
                "审批已逾期",
                &format!(
                    "大纲 {} 处于 {} 环节，截止时间 {} 已过，请尽快处理",
                    record.syllabus_id,
                    record.status,
                    record.due_date.format("%Y-%m-%d %H:%M:%S")
                ),
                Some(format!("/syllabus/{}", record.syllabus_id)),
            ));
        }
        if !overdue.is_empty() {
            tracing::info!("时限扫描完成: 发现 {} 条逾期记录", overdue.len());
        }
        Ok(overdue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_roles_cover_all_pending_steps() {
        assert_eq!(
            escalation_roles(SyllabusStatus::PendingReview),
            Some(vec![Role::HeadOfDepartment, Role::Admin])
        );
        assert_eq!(
            escalation_roles(SyllabusStatus::PendingApproval),
            Some(vec![Role::AcademicAffairs, Role::Admin])
        );
        assert_eq!(
            escalation_roles(SyllabusStatus::Approved),
            Some(vec![Role::Principal, Role::Admin])
        );
        assert_eq!(escalation_roles(SyllabusStatus::Draft), None);
        assert_eq!(escalation_roles(SyllabusStatus::Published), None);
    }
}
