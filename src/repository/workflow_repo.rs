// ==========================================
// 教学大纲管理系统 - 工作流仓储
// ==========================================
// 覆盖 workflow_log 与 current_workflow 两张表
// 红线: workflow_log 只提供插入与查询，不存在 update/delete 方法
// ==========================================

use crate::domain::types::{SyllabusStatus, WorkflowAction};
use crate::domain::workflow::{CurrentWorkflow, WorkflowLog};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::invalid_enum;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// WorkflowLogRepository - 审批日志仓储（只追加）
// ==========================================
pub struct WorkflowLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkflowLogRepository {
    /// 创建新的审批日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入审批日志（状态转换事务内调用）
    ///
    /// 约束: created_at 必须带微秒，秒级精度下同一秒内的多次转换无法按追加顺序回放
    pub fn insert_tx(conn: &Connection, log: &WorkflowLog) -> RepositoryResult<String> {
        conn.execute(
            r#"INSERT INTO workflow_log (
                log_id, syllabus_id, actor_id, action,
                from_status, to_status, comment, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &log.log_id,
                &log.syllabus_id,
                &log.actor_id,
                log.action.to_db_str(),
                log.from_status.to_db_str(),
                log.to_status.to_db_str(),
                &log.comment,
                log.created_at.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            ],
        )?;
        Ok(log.log_id.clone())
    }

    /// 查询大纲的完整审批历史（按时间正序）
    pub fn list_by_syllabus(&self, syllabus_id: &str) -> RepositoryResult<Vec<WorkflowLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT log_id, syllabus_id, actor_id, action,
                      from_status, to_status, comment, created_at
               FROM workflow_log WHERE syllabus_id = ?
               ORDER BY created_at, log_id"#,
        )?;
        let rows = stmt
            .query_map(params![syllabus_id], map_log_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// 日志行映射
fn map_log_row(row: &Row<'_>) -> rusqlite::Result<WorkflowLog> {
    let action_str: String = row.get(3)?;
    let action = WorkflowAction::from_db_str(&action_str)
        .ok_or_else(|| invalid_enum(3, &action_str, "工作流动作"))?;
    let from_str: String = row.get(4)?;
    let from_status = SyllabusStatus::from_db_str(&from_str)
        .ok_or_else(|| invalid_enum(4, &from_str, "大纲状态"))?;
    let to_str: String = row.get(5)?;
    let to_status = SyllabusStatus::from_db_str(&to_str)
        .ok_or_else(|| invalid_enum(5, &to_str, "大纲状态"))?;
    Ok(WorkflowLog {
        log_id: row.get(0)?,
        syllabus_id: row.get(1)?,
        actor_id: row.get(2)?,
        action,
        from_status,
        to_status,
        comment: row.get(6)?,
        created_at: row.get(7)?,
    })
}

// ==========================================
// CurrentWorkflowRepository - 在途流程仓储
// ==========================================
pub struct CurrentWorkflowRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CurrentWorkflowRepository {
    /// 创建新的在途流程仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建或刷新在途记录（主键冲突即覆盖，保证每份大纲至多一行）
    pub fn upsert_tx(conn: &Connection, workflow: &CurrentWorkflow) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO current_workflow (syllabus_id, status, due_date, last_action_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(syllabus_id) DO UPDATE SET
                   status = excluded.status,
                   due_date = excluded.due_date,
                   last_action_at = excluded.last_action_at"#,
            params![
                &workflow.syllabus_id,
                workflow.status.to_db_str(),
                workflow.due_date.format("%Y-%m-%d %H:%M:%S").to_string(),
                workflow.last_action_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    /// 删除在途记录（到达终态时调用）
    pub fn delete_tx(conn: &Connection, syllabus_id: &str) -> RepositoryResult<bool> {
        let rows = conn.execute(
            "DELETE FROM current_workflow WHERE syllabus_id = ?",
            params![syllabus_id],
        )?;
        Ok(rows > 0)
    }

    /// 查询大纲的在途记录
    pub fn find_by_syllabus(&self, syllabus_id: &str) -> RepositoryResult<Option<CurrentWorkflow>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            r#"SELECT syllabus_id, status, due_date, last_action_at
               FROM current_workflow WHERE syllabus_id = ?"#,
            params![syllabus_id],
            map_workflow_row,
        ) {
            Ok(w) => Ok(Some(w)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部已逾期的在途记录（截止时间早于给定时刻）
    ///
    /// 说明: 只读扫描，不修改任何状态；重复执行会重复返回同一批记录
    pub fn list_overdue(&self, now: NaiveDateTime) -> RepositoryResult<Vec<CurrentWorkflow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT syllabus_id, status, due_date, last_action_at
               FROM current_workflow WHERE due_date < ?
               ORDER BY due_date"#,
        )?;
        let rows = stmt
            .query_map(
                params![now.format("%Y-%m-%d %H:%M:%S").to_string()],
                map_workflow_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// 在途记录行映射
fn map_workflow_row(row: &Row<'_>) -> rusqlite::Result<CurrentWorkflow> {
    let status_str: String = row.get(1)?;
    let status = SyllabusStatus::from_db_str(&status_str)
        .ok_or_else(|| invalid_enum(1, &status_str, "大纲状态"))?;
    Ok(CurrentWorkflow {
        syllabus_id: row.get(0)?,
        status,
        due_date: row.get(2)?,
        last_action_at: row.get(3)?,
    })
}
