// ==========================================
// 教学大纲管理系统 - 大纲服务外观
// ==========================================
// 职责: 组合引擎与仓储，暴露统一的服务入口
// 红线: 业务裁决全部委托引擎层，外观只做编排与副作用扇出
// 红线: 通知/索引失败只告警，绝不影响已提交的事务结果
// ==========================================

use crate::domain::snapshot::SyllabusSnapshot;
use crate::domain::syllabus::{Syllabus, SyllabusAggregate};
use crate::domain::types::{Actor, Role, SyllabusStatus, WorkflowAction};
use crate::domain::workflow::{CurrentWorkflow, WorkflowLog};
use crate::engine::config::WorkflowConfig;
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::{
    AiComparator, Notification, NotificationSink, OptionalNotificationSink,
    OptionalSearchIndexer, SearchIndexer,
};
use crate::engine::payload::{CreateSyllabusPayload, UpdateSyllabusPayload};
use crate::engine::workflow::approve_step;
use crate::engine::{
    AggregateBuilder, DeadlineScanner, SnapshotService, TransitionOutcome, WorkflowEngine,
};
use crate::repository::error::RepositoryError;
use crate::repository::{
    fetch_aggregate, CurrentWorkflowRepository, ReferenceRepository, SyllabusRepository,
    WorkflowLogRepository,
};
use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// SyllabusApi - 大纲服务外观
// ==========================================
pub struct SyllabusApi {
    conn: Arc<Mutex<Connection>>,
    builder: AggregateBuilder,
    engine: WorkflowEngine,
    scanner: DeadlineScanner,
    snapshot_service: SnapshotService,
    syllabus_repo: SyllabusRepository,
    workflow_log_repo: WorkflowLogRepository,
    current_workflow_repo: CurrentWorkflowRepository,
    reference_repo: ReferenceRepository,
    notifier: OptionalNotificationSink,
    indexer: OptionalSearchIndexer,
    comparator: Option<Arc<dyn AiComparator>>,
}

impl SyllabusApi {
    /// 创建大纲服务（配置从 config_kv 读取，读取失败回退默认值）
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let config = WorkflowConfig::load(&conn).unwrap_or_else(|e| {
            tracing::warn!("加载工作流配置失败，使用默认值: {}", e);
            WorkflowConfig::default()
        });
        Self::with_config(conn, config)
    }

    /// 使用显式配置创建大纲服务
    pub fn with_config(conn: Arc<Mutex<Connection>>, config: WorkflowConfig) -> Self {
        Self {
            builder: AggregateBuilder::new(Arc::clone(&conn), config.clone()),
            engine: WorkflowEngine::new(Arc::clone(&conn), config),
            scanner: DeadlineScanner::new(Arc::clone(&conn)),
            snapshot_service: SnapshotService::new(Arc::clone(&conn)),
            syllabus_repo: SyllabusRepository::new(Arc::clone(&conn)),
            workflow_log_repo: WorkflowLogRepository::new(Arc::clone(&conn)),
            current_workflow_repo: CurrentWorkflowRepository::new(Arc::clone(&conn)),
            reference_repo: ReferenceRepository::new(Arc::clone(&conn)),
            notifier: OptionalNotificationSink::none(),
            indexer: OptionalSearchIndexer::none(),
            comparator: None,
            conn,
        }
    }

    /// 挂接通知服务
    pub fn with_notifier(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifier = OptionalNotificationSink::with_sink(sink);
        self
    }

    /// 挂接搜索索引服务
    pub fn with_indexer(mut self, indexer: Arc<dyn SearchIndexer>) -> Self {
        self.indexer = OptionalSearchIndexer::with_indexer(indexer);
        self
    }

    /// 挂接 AI 版本对比服务
    pub fn with_comparator(mut self, comparator: Arc<dyn AiComparator>) -> Self {
        self.comparator = Some(comparator);
        self
    }

    // ==========================================
    // 聚合生命周期
    // ==========================================

    /// 创建大纲草稿（含全部嵌套子实体，单事务落盘）
    pub fn create_syllabus(
        &self,
        payload: &CreateSyllabusPayload,
    ) -> WorkflowResult<SyllabusAggregate> {
        let aggregate = self.builder.create(payload)?;
        self.indexer
            .index(&aggregate.syllabus.syllabus_id, &aggregate.to_search_text());
        Ok(aggregate)
    }

    /// 部分更新大纲内容（仅 DRAFT/RETURNED 可编辑）
    pub fn update_syllabus(
        &self,
        syllabus_id: &str,
        actor: &Actor,
        payload: &UpdateSyllabusPayload,
    ) -> WorkflowResult<SyllabusAggregate> {
        let aggregate = self.builder.update(syllabus_id, actor, payload)?;
        self.indexer.index(syllabus_id, &aggregate.to_search_text());
        Ok(aggregate)
    }

    /// 删除大纲（级联删除全部子实体与流程记录）
    ///
    /// 仅所有者讲师或 ADMIN 可删除，且大纲不得处于审批中或公开状态
    pub fn delete_syllabus(&self, syllabus_id: &str, actor: &Actor) -> WorkflowResult<()> {
        let syllabus = self
            .syllabus_repo
            .find_by_id(syllabus_id)?
            .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))?;
        if !syllabus.is_owned_by(&actor.user_id) && !actor.is_admin() {
            return Err(WorkflowError::Ownership(format!(
                "大纲 {} 属于讲师 {}，用户 {} 无权删除",
                syllabus_id, syllabus.lecturer_id, actor.user_id
            )));
        }
        if !matches!(
            syllabus.status,
            SyllabusStatus::Draft | SyllabusStatus::Returned | SyllabusStatus::Rejected
        ) {
            return Err(WorkflowError::invalid_state(syllabus.status, "DELETE"));
        }
        self.syllabus_repo.delete(syllabus_id)?;
        self.indexer.delete(syllabus_id);
        tracing::info!(
            "大纲删除成功: syllabus_id={}, actor={}",
            syllabus_id,
            actor.user_id
        );
        Ok(())
    }

    // ==========================================
    // 审批工作流
    // ==========================================

    /// 提交大纲进入审批流水线
    pub fn submit_syllabus(
        &self,
        syllabus_id: &str,
        actor: &Actor,
    ) -> WorkflowResult<TransitionOutcome> {
        let outcome = self.engine.submit(syllabus_id, actor)?;
        self.fan_out(&outcome);
        Ok(outcome)
    }

    /// 执行一次评审动作
    ///
    /// action 为外部传入的动作字符串 (APPROVE/RETURN/REJECT)，
    /// 无法识别即返回 InvalidAction
    pub fn evaluate_syllabus(
        &self,
        syllabus_id: &str,
        actor: &Actor,
        action: &str,
        comment: Option<&str>,
    ) -> WorkflowResult<TransitionOutcome> {
        let action = WorkflowAction::from_db_str(action)
            .ok_or_else(|| WorkflowError::InvalidAction(action.to_string()))?;
        let outcome = self.engine.evaluate(syllabus_id, actor, action, comment)?;
        self.fan_out(&outcome);
        Ok(outcome)
    }

    /// 扫描逾期的审批环节并催办，返回逾期条数
    pub fn check_overdue(&self) -> WorkflowResult<usize> {
        self.check_overdue_at(Local::now().naive_local())
    }

    /// 按给定时刻扫描逾期环节（测试与补偿任务入口）
    pub fn check_overdue_at(&self, now: NaiveDateTime) -> WorkflowResult<usize> {
        self.scanner.check_overdue(now, &self.notifier)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询大纲完整聚合
    pub fn get_details(&self, syllabus_id: &str) -> WorkflowResult<SyllabusAggregate> {
        let guard = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        fetch_aggregate(&guard, syllabus_id)?
            .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))
    }

    /// 查询讲师名下全部大纲头
    pub fn list_by_lecturer(&self, lecturer_id: &str) -> WorkflowResult<Vec<Syllabus>> {
        Ok(self.syllabus_repo.list_by_lecturer(lecturer_id)?)
    }

    /// 查询大纲的完整审批历史（按时间正序）
    pub fn get_workflow_history(&self, syllabus_id: &str) -> WorkflowResult<Vec<WorkflowLog>> {
        Ok(self.workflow_log_repo.list_by_syllabus(syllabus_id)?)
    }

    /// 查询大纲的在途流程记录（不在途返回 None）
    pub fn get_current_workflow(
        &self,
        syllabus_id: &str,
    ) -> WorkflowResult<Option<CurrentWorkflow>> {
        Ok(self.current_workflow_repo.find_by_syllabus(syllabus_id)?)
    }

    // ==========================================
    // 快照与版本对比
    // ==========================================

    /// 手工捕获一份快照
    pub fn create_snapshot(
        &self,
        syllabus_id: &str,
        actor: &Actor,
    ) -> WorkflowResult<SyllabusSnapshot> {
        self.snapshot_service.create_snapshot(syllabus_id, actor)
    }

    /// 查询大纲的全部快照
    pub fn list_snapshots(&self, syllabus_id: &str) -> WorkflowResult<Vec<SyllabusSnapshot>> {
        self.snapshot_service.list_snapshots(syllabus_id)
    }

    /// 对比两个版本（version_b 缺省时与当前在库聚合对比）
    pub fn compare_versions(
        &self,
        syllabus_id: &str,
        version_a: &str,
        version_b: Option<&str>,
    ) -> WorkflowResult<serde_json::Value> {
        let comparator = self.comparator.as_deref().ok_or_else(|| {
            WorkflowError::Validation("未配置版本对比服务，无法执行对比".to_string())
        })?;
        self.snapshot_service
            .compare_versions(syllabus_id, version_a, version_b, comparator)
    }

    // ==========================================
    // 副作用扇出
    // ==========================================

    /// 转换成功后的索引同步与通知扇出（尽力而为）
    fn fan_out(&self, outcome: &TransitionOutcome) {
        let syllabus_id = &outcome.syllabus_id;
        self.indexer.index(syllabus_id, &outcome.aggregate.to_search_text());

        let link = Some(format!("/syllabus/{}", syllabus_id));
        match outcome.action {
            WorkflowAction::Submit => {
                // 系审由系主任负责，教务与管理员同步知悉
                self.notifier.notify(Notification::to_roles(
                    vec![Role::HeadOfDepartment, Role::AcademicAffairs, Role::Admin],
                    "新大纲待审",
                    &format!("大纲 {} 已提交，请在时限内完成系审", syllabus_id),
                    link,
                ));
            }
            WorkflowAction::Approve => {
                // 通知所有者进展，并催办下一环节的责任角色
                self.notify_lecturer(
                    outcome,
                    "大纲审批进展",
                    &format!("大纲 {} 已进入 {} 状态", syllabus_id, outcome.to_status),
                );
                if let Some((_, next_role)) = approve_step(outcome.to_status) {
                    self.notifier.notify(Notification::to_roles(
                        vec![next_role],
                        "大纲待处理",
                        &format!("大纲 {} 已到达 {} 环节", syllabus_id, outcome.to_status),
                        Some(format!("/syllabus/{}", syllabus_id)),
                    ));
                }
                if outcome.to_status == SyllabusStatus::Published {
                    self.notify_subscribers(outcome);
                }
            }
            WorkflowAction::Return | WorkflowAction::Reject => {
                self.notify_lecturer(
                    outcome,
                    "大纲被退回/驳回",
                    &format!(
                        "大纲 {} 已被{}，请查看审批意见",
                        syllabus_id,
                        if outcome.to_status == SyllabusStatus::Returned {
                            "退回修订"
                        } else {
                            "驳回"
                        }
                    ),
                );
            }
        }
    }

    /// 通知大纲所有者讲师
    fn notify_lecturer(&self, outcome: &TransitionOutcome, title: &str, message: &str) {
        self.notifier.notify(Notification::to_users(
            vec![outcome.aggregate.syllabus.lecturer_id.clone()],
            title,
            message,
            Some(format!("/syllabus/{}", outcome.syllabus_id)),
        ));
    }

    /// 发布时向订阅了该课程的学生扇出通知
    fn notify_subscribers(&self, outcome: &TransitionOutcome) {
        let subject_id = &outcome.aggregate.syllabus.subject_id;
        match self.reference_repo.list_subscribers(subject_id) {
            Ok(students) if !students.is_empty() => {
                self.notifier.notify(Notification::to_users(
                    students,
                    "课程大纲已发布",
                    &format!("课程 {} 的新版大纲已发布", subject_id),
                    Some(format!("/syllabus/{}", outcome.syllabus_id)),
                ));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("查询课程订阅名单失败 (subject_id={}): {}", subject_id, e);
            }
        }
    }
}
