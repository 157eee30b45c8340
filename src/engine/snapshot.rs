// ==========================================
// 教学大纲管理系统 - 版本快照服务
// ==========================================
// 职责: 快照的手工捕获与版本对比编排
// 红线: 快照只插入不修改；对比的 diff 逻辑完全委托外部 AI 服务
// ==========================================

use crate::domain::snapshot::SyllabusSnapshot;
use crate::domain::types::Actor;
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::AiComparator;
use crate::repository::error::RepositoryError;
use crate::repository::{fetch_aggregate, SnapshotRepository};
use chrono::Local;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// SnapshotService - 快照服务
// ==========================================
pub struct SnapshotService {
    conn: Arc<Mutex<Connection>>,
    snapshot_repo: SnapshotRepository,
}

impl SnapshotService {
    /// 创建快照服务
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let snapshot_repo = SnapshotRepository::new(Arc::clone(&conn));
        Self {
            conn,
            snapshot_repo,
        }
    }

    /// 手工捕获一份当前聚合的快照
    ///
    /// 审批到达公开状态时的快照由工作流引擎在转换事务内自动捕获，
    /// 此入口供审计留痕等场景主动触发
    pub fn create_snapshot(
        &self,
        syllabus_id: &str,
        actor: &Actor,
    ) -> WorkflowResult<SyllabusSnapshot> {
        let now = Local::now().naive_local();
        let aggregate = {
            let guard = self
                .conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            fetch_aggregate(&guard, syllabus_id)?
                .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))?
        };
        let snapshot = SyllabusSnapshot::new(
            syllabus_id,
            &aggregate.syllabus.version,
            aggregate.to_snapshot_payload(),
            &actor.user_id,
            now,
        );
        self.snapshot_repo.insert(&snapshot)?;
        tracing::info!(
            "快照捕获成功: syllabus_id={}, snapshot_id={}, version={}",
            syllabus_id,
            snapshot.snapshot_id,
            snapshot.version
        );
        Ok(snapshot)
    }

    /// 查询大纲的全部快照（按时间倒序）
    pub fn list_snapshots(&self, syllabus_id: &str) -> WorkflowResult<Vec<SyllabusSnapshot>> {
        Ok(self.snapshot_repo.list_by_syllabus(syllabus_id)?)
    }

    /// 对比两个版本的快照载荷
    ///
    /// - version_b 给定: 取两个版本各自的最新快照对比
    /// - version_b 缺省: version_a 的快照与当前在库聚合对比
    ///
    /// diff 报告的结构由外部 AI 对比服务决定，这里原样透传
    pub fn compare_versions(
        &self,
        syllabus_id: &str,
        version_a: &str,
        version_b: Option<&str>,
        comparator: &dyn AiComparator,
    ) -> WorkflowResult<serde_json::Value> {
        let snapshot_a = self
            .snapshot_repo
            .find_by_version(syllabus_id, version_a)?
            .ok_or_else(|| {
                WorkflowError::not_found("SyllabusSnapshot", &format!("{}@{}", syllabus_id, version_a))
            })?;

        let payload_b = match version_b {
            Some(version) => {
                let snapshot_b = self
                    .snapshot_repo
                    .find_by_version(syllabus_id, version)?
                    .ok_or_else(|| {
                        WorkflowError::not_found(
                            "SyllabusSnapshot",
                            &format!("{}@{}", syllabus_id, version),
                        )
                    })?;
                snapshot_b.payload_json
            }
            None => {
                let guard = self
                    .conn
                    .lock()
                    .map_err(|e| RepositoryError::LockError(e.to_string()))?;
                let aggregate = fetch_aggregate(&guard, syllabus_id)?
                    .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))?;
                aggregate.to_snapshot_payload()
            }
        };

        comparator
            .diff(&snapshot_a.payload_json, &payload_b)
            .map_err(|e| WorkflowError::Other(anyhow::anyhow!("版本对比服务调用失败: {}", e)))
    }
}
