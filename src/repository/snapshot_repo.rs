// ==========================================
// 教学大纲管理系统 - 版本快照仓储
// ==========================================
// 红线: 只插入与查询，快照创建后永不修改
// ==========================================

use crate::domain::snapshot::SyllabusSnapshot;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// SnapshotRepository - 快照仓储
// ==========================================
pub struct SnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotRepository {
    /// 创建新的快照仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入快照
    pub fn insert_tx(conn: &Connection, snapshot: &SyllabusSnapshot) -> RepositoryResult<String> {
        conn.execute(
            r#"INSERT INTO syllabus_snapshot (
                snapshot_id, syllabus_id, version, payload_json, created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &snapshot.snapshot_id,
                &snapshot.syllabus_id,
                &snapshot.version,
                snapshot.payload_json.to_string(),
                &snapshot.created_by,
                snapshot.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(snapshot.snapshot_id.clone())
    }

    /// 独立插入快照（引擎外部触发的手工留痕）
    pub fn insert(&self, snapshot: &SyllabusSnapshot) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, snapshot)
    }

    /// 查询某大纲某版本的最新快照
    pub fn find_by_version(
        &self,
        syllabus_id: &str,
        version: &str,
    ) -> RepositoryResult<Option<SyllabusSnapshot>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            &format!(
                "{} WHERE syllabus_id = ? AND version = ? ORDER BY created_at DESC LIMIT 1",
                SELECT_SNAPSHOT
            ),
            params![syllabus_id, version],
            map_row,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询大纲的全部快照（按时间倒序）
    pub fn list_by_syllabus(&self, syllabus_id: &str) -> RepositoryResult<Vec<SyllabusSnapshot>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE syllabus_id = ? ORDER BY created_at DESC, snapshot_id",
            SELECT_SNAPSHOT
        ))?;
        let rows = stmt
            .query_map(params![syllabus_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

const SELECT_SNAPSHOT: &str = r#"SELECT snapshot_id, syllabus_id, version, payload_json, created_by, created_at
FROM syllabus_snapshot"#;

/// 快照行映射
fn map_row(row: &Row<'_>) -> rusqlite::Result<SyllabusSnapshot> {
    let payload_str: String = row.get(3)?;
    let payload_json =
        serde_json::from_str(&payload_str).unwrap_or(serde_json::Value::Null);
    Ok(SyllabusSnapshot {
        snapshot_id: row.get(0)?,
        syllabus_id: row.get(1)?,
        version: row.get(2)?,
        payload_json,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}
