// ==========================================
// 教学大纲管理系统 - 审批工作流引擎
// ==========================================
// 流水线: DRAFT -> PENDING_REVIEW -> PENDING_APPROVAL -> APPROVED -> PUBLISHED
// 分支:   RETURN -> RETURNED (可修订重提) / REJECT -> REJECTED (终态,可重提)
// 红线: 转换表封闭，无默认分支；状态+动作+角色不匹配一律拒绝
// 红线: 状态更新/日志追加/在途记录/快照在同一 IMMEDIATE 事务内落盘
// 红线: APPROVE 的目标状态只由当前状态推导，调用方不得指定
// ==========================================

use crate::domain::snapshot::SyllabusSnapshot;
use crate::domain::syllabus::SyllabusAggregate;
use crate::domain::types::{Actor, Role, SyllabusStatus, WorkflowAction};
use crate::domain::workflow::{CurrentWorkflow, WorkflowLog};
use crate::engine::config::WorkflowConfig;
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::validation::validate_submission_readiness;
use crate::repository::error::RepositoryError;
use crate::repository::{
    fetch_aggregate, CurrentWorkflowRepository, SnapshotRepository, SyllabusRepository,
    WorkflowLogRepository,
};
use chrono::{Duration, Local};
use rusqlite::{Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

// ==========================================
// 转换表（纯函数）
// ==========================================

/// 当前状态下 APPROVE 的目标状态与责任角色
///
/// 无匹配即无转换，不存在默认分支
pub fn approve_step(current: SyllabusStatus) -> Option<(SyllabusStatus, Role)> {
    match current {
        SyllabusStatus::PendingReview => {
            Some((SyllabusStatus::PendingApproval, Role::HeadOfDepartment))
        }
        SyllabusStatus::PendingApproval => {
            Some((SyllabusStatus::Approved, Role::AcademicAffairs))
        }
        SyllabusStatus::Approved => Some((SyllabusStatus::Published, Role::Principal)),
        _ => None,
    }
}

/// RETURN/REJECT 在当前状态下的责任角色
///
/// 仅评审中段 (PENDING_*) 允许退回/驳回；APPROVED 之后只能继续前进
fn reverse_step_role(current: SyllabusStatus) -> Option<Role> {
    match current {
        SyllabusStatus::PendingReview => Some(Role::HeadOfDepartment),
        SyllabusStatus::PendingApproval => Some(Role::AcademicAffairs),
        _ => None,
    }
}

/// 解析一次评审转换: (当前状态, 动作, 角色) -> 目标状态
///
/// # 错误
/// - InvalidAction: SUBMIT 不是评审动作
/// - InvalidState: 转换表中无该 (状态, 动作) 组合
/// - Permission: 角色与当前环节的责任角色不符（ADMIN 豁免）
pub fn resolve_transition(
    current: SyllabusStatus,
    action: WorkflowAction,
    role: Role,
) -> WorkflowResult<SyllabusStatus> {
    let (target, required) = match action {
        WorkflowAction::Submit => {
            return Err(WorkflowError::InvalidAction(
                "SUBMIT 不属于评审动作，请走提交接口".to_string(),
            ));
        }
        WorkflowAction::Approve => approve_step(current)
            .ok_or_else(|| WorkflowError::invalid_state(current, "APPROVE"))?,
        WorkflowAction::Return => {
            let required = reverse_step_role(current)
                .ok_or_else(|| WorkflowError::invalid_state(current, "RETURN"))?;
            (SyllabusStatus::Returned, required)
        }
        WorkflowAction::Reject => {
            let required = reverse_step_role(current)
                .ok_or_else(|| WorkflowError::invalid_state(current, "REJECT"))?;
            (SyllabusStatus::Rejected, required)
        }
    };

    if role != required && role != Role::Admin {
        return Err(WorkflowError::Permission(format!(
            "当前环节 {} 需要 {} 角色执行 {}，实际角色为 {}",
            current, required, action, role
        )));
    }
    Ok(target)
}

// ==========================================
// 转换结果
// ==========================================

/// 一次状态转换的结果，供外观层做通知/索引扇出
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub syllabus_id: String,
    pub action: WorkflowAction,
    pub from_status: SyllabusStatus,
    pub to_status: SyllabusStatus,
    pub snapshot_id: Option<String>, // 到达公开状态时捕获的快照
    pub aggregate: SyllabusAggregate, // 转换后的完整聚合
}

// ==========================================
// WorkflowEngine - 工作流引擎
// ==========================================
pub struct WorkflowEngine {
    conn: Arc<Mutex<Connection>>,
    config: WorkflowConfig,
}

impl WorkflowEngine {
    /// 创建工作流引擎
    pub fn new(conn: Arc<Mutex<Connection>>, config: WorkflowConfig) -> Self {
        Self { conn, config }
    }

    /// 提交大纲进入审批流水线
    ///
    /// 前置条件（按序检查）:
    /// 1. 大纲存在
    /// 2. 操作者为所有者讲师或 ADMIN
    /// 3. 当前状态允许提交 (DRAFT/RETURNED/REJECTED)
    /// 4. 内容完整性校验通过
    ///
    /// 事务内写入: 状态 -> PENDING_REVIEW、追加日志、创建在途记录（7 天时限）
    pub fn submit(&self, syllabus_id: &str, actor: &Actor) -> WorkflowResult<TransitionOutcome> {
        let now = Local::now().naive_local();
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        let syllabus = SyllabusRepository::find_by_id_tx(&tx, syllabus_id)?
            .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))?;

        if !syllabus.is_owned_by(&actor.user_id) && !actor.is_admin() {
            return Err(WorkflowError::Ownership(format!(
                "大纲 {} 属于讲师 {}，用户 {} 无权提交",
                syllabus_id, syllabus.lecturer_id, actor.user_id
            )));
        }
        if !syllabus.status.is_submittable() {
            return Err(WorkflowError::invalid_state(syllabus.status, "SUBMIT"));
        }

        let mut aggregate = fetch_aggregate(&tx, syllabus_id)?
            .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))?;
        validate_submission_readiness(&aggregate, &self.config)?;

        let from_status = syllabus.status;
        let to_status = SyllabusStatus::PendingReview;

        SyllabusRepository::update_status_tx(&tx, syllabus_id, to_status, now)?;
        let log = WorkflowLog::new(
            syllabus_id,
            &actor.user_id,
            WorkflowAction::Submit,
            from_status,
            to_status,
            None,
            now,
        );
        WorkflowLogRepository::insert_tx(&tx, &log)?;
        CurrentWorkflowRepository::upsert_tx(
            &tx,
            &CurrentWorkflow {
                syllabus_id: syllabus_id.to_string(),
                status: to_status,
                due_date: now + Duration::days(self.config.submit_due_days),
                last_action_at: now,
            },
        )?;
        tx.commit().map_err(RepositoryError::from)?;

        aggregate.syllabus.status = to_status;
        aggregate.syllabus.updated_at = now;

        tracing::info!(
            "大纲提交成功: syllabus_id={}, actor={}, {} -> {}",
            syllabus_id,
            actor.user_id,
            from_status,
            to_status
        );
        Ok(TransitionOutcome {
            syllabus_id: syllabus_id.to_string(),
            action: WorkflowAction::Submit,
            from_status,
            to_status,
            snapshot_id: None,
            aggregate,
        })
    }

    /// 执行一次评审动作 (APPROVE/RETURN/REJECT)
    ///
    /// 并发约束: IMMEDIATE 事务内重读状态再转换，两个评审者对同一份
    /// 大纲并发操作时只有先提交者成功，后者因状态已变而收到 InvalidState
    ///
    /// 事务内写入: 状态更新、日志追加、在途记录刷新或删除、
    /// 到达公开状态 (APPROVED/PUBLISHED) 时的全聚合快照
    pub fn evaluate(
        &self,
        syllabus_id: &str,
        actor: &Actor,
        action: WorkflowAction,
        comment: Option<&str>,
    ) -> WorkflowResult<TransitionOutcome> {
        let now = Local::now().naive_local();
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        let syllabus = SyllabusRepository::find_by_id_tx(&tx, syllabus_id)?
            .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))?;

        let from_status = syllabus.status;
        let to_status = resolve_transition(from_status, action, actor.role)?;

        if action.requires_comment() {
            let has_comment = comment.map(str::trim).filter(|c| !c.is_empty()).is_some();
            if !has_comment {
                return Err(WorkflowError::Validation(format!(
                    "{} 动作必须附带意见",
                    action
                )));
            }
        }

        SyllabusRepository::update_status_tx(&tx, syllabus_id, to_status, now)?;
        let log = WorkflowLog::new(
            syllabus_id,
            &actor.user_id,
            action,
            from_status,
            to_status,
            comment.map(|c| c.trim().to_string()),
            now,
        );
        WorkflowLogRepository::insert_tx(&tx, &log)?;

        // 在途记录: 仍有责任角色待办则刷新时限，否则整行删除
        if approve_step(to_status).is_some() {
            CurrentWorkflowRepository::upsert_tx(
                &tx,
                &CurrentWorkflow {
                    syllabus_id: syllabus_id.to_string(),
                    status: to_status,
                    due_date: now + Duration::days(self.config.evaluate_due_days),
                    last_action_at: now,
                },
            )?;
        } else {
            CurrentWorkflowRepository::delete_tx(&tx, syllabus_id)?;
        }

        let aggregate = fetch_aggregate(&tx, syllabus_id)?
            .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))?;
        let snapshot_id = if to_status.is_public() {
            let snapshot = SyllabusSnapshot::new(
                syllabus_id,
                &aggregate.syllabus.version,
                aggregate.to_snapshot_payload(),
                &actor.user_id,
                now,
            );
            SnapshotRepository::insert_tx(&tx, &snapshot)?;
            Some(snapshot.snapshot_id)
        } else {
            None
        };
        tx.commit().map_err(RepositoryError::from)?;

        tracing::info!(
            "评审动作完成: syllabus_id={}, actor={}, action={}, {} -> {}",
            syllabus_id,
            actor.user_id,
            action,
            from_status,
            to_status
        );
        Ok(TransitionOutcome {
            syllabus_id: syllabus_id.to_string(),
            action,
            from_status,
            to_status,
            snapshot_id,
            aggregate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_chain_targets() {
        assert_eq!(
            approve_step(SyllabusStatus::PendingReview),
            Some((SyllabusStatus::PendingApproval, Role::HeadOfDepartment))
        );
        assert_eq!(
            approve_step(SyllabusStatus::PendingApproval),
            Some((SyllabusStatus::Approved, Role::AcademicAffairs))
        );
        assert_eq!(
            approve_step(SyllabusStatus::Approved),
            Some((SyllabusStatus::Published, Role::Principal))
        );
        // 起点与终态无 APPROVE 转换
        assert_eq!(approve_step(SyllabusStatus::Draft), None);
        assert_eq!(approve_step(SyllabusStatus::Published), None);
        assert_eq!(approve_step(SyllabusStatus::Rejected), None);
    }

    #[test]
    fn test_resolve_transition_role_match() {
        let to = resolve_transition(
            SyllabusStatus::PendingReview,
            WorkflowAction::Approve,
            Role::HeadOfDepartment,
        )
        .unwrap();
        assert_eq!(to, SyllabusStatus::PendingApproval);
    }

    #[test]
    fn test_resolve_transition_admin_bypass() {
        for current in [
            SyllabusStatus::PendingReview,
            SyllabusStatus::PendingApproval,
            SyllabusStatus::Approved,
        ] {
            assert!(resolve_transition(current, WorkflowAction::Approve, Role::Admin).is_ok());
        }
    }

    #[test]
    fn test_lecturer_approve_is_permission_error() {
        for current in [SyllabusStatus::PendingReview, SyllabusStatus::PendingApproval] {
            let err =
                resolve_transition(current, WorkflowAction::Approve, Role::Lecturer).unwrap_err();
            assert!(matches!(err, WorkflowError::Permission(_)));
        }
    }

    #[test]
    fn test_wrong_step_role_rejected() {
        // 校长不能越过系审环节
        let err = resolve_transition(
            SyllabusStatus::PendingReview,
            WorkflowAction::Approve,
            Role::Principal,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Permission(_)));
    }

    #[test]
    fn test_return_and_reject_targets() {
        assert_eq!(
            resolve_transition(
                SyllabusStatus::PendingReview,
                WorkflowAction::Return,
                Role::HeadOfDepartment,
            )
            .unwrap(),
            SyllabusStatus::Returned
        );
        assert_eq!(
            resolve_transition(
                SyllabusStatus::PendingApproval,
                WorkflowAction::Reject,
                Role::AcademicAffairs,
            )
            .unwrap(),
            SyllabusStatus::Rejected
        );
    }

    #[test]
    fn test_approved_cannot_be_returned() {
        // APPROVED 之后只能前进到发布，不再接受退回/驳回
        for action in [WorkflowAction::Return, WorkflowAction::Reject] {
            let err =
                resolve_transition(SyllabusStatus::Approved, action, Role::Principal).unwrap_err();
            assert!(matches!(err, WorkflowError::InvalidState { .. }));
        }
    }

    #[test]
    fn test_submit_action_rejected_in_evaluate_path() {
        let err = resolve_transition(
            SyllabusStatus::Draft,
            WorkflowAction::Submit,
            Role::Lecturer,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidAction(_)));
    }

    #[test]
    fn test_draft_has_no_evaluate_transition() {
        let err = resolve_transition(
            SyllabusStatus::Draft,
            WorkflowAction::Approve,
            Role::Admin,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }
}
