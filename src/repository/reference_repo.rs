// ==========================================
// 教学大纲管理系统 - 参照数据仓储
// ==========================================
// 职责: 课程/专业/学年/用户的存在性校验、PLO 编码解析、订阅名单查询
// 说明: 参照数据本身由外部 CRUD 服务维护，这里只读
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ReferenceRepository - 参照数据仓储
// ==========================================
pub struct ReferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceRepository {
    /// 创建新的参照数据仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 通用存在性检查
    fn exists(conn: &Connection, sql: &str, id: &str) -> RepositoryResult<bool> {
        let found: Option<i64> = match conn.query_row(sql, params![id], |row| row.get(0)) {
            Ok(v) => Some(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(found.is_some())
    }

    /// 课程是否存在
    pub fn subject_exists_tx(conn: &Connection, subject_id: &str) -> RepositoryResult<bool> {
        Self::exists(conn, "SELECT 1 FROM subject WHERE subject_id = ?", subject_id)
    }

    /// 专业是否存在
    pub fn program_exists_tx(conn: &Connection, program_id: &str) -> RepositoryResult<bool> {
        Self::exists(conn, "SELECT 1 FROM program WHERE program_id = ?", program_id)
    }

    /// 学年是否存在
    pub fn academic_year_exists_tx(
        conn: &Connection,
        academic_year_id: &str,
    ) -> RepositoryResult<bool> {
        Self::exists(
            conn,
            "SELECT 1 FROM academic_year WHERE academic_year_id = ?",
            academic_year_id,
        )
    }

    /// 用户是否存在
    pub fn user_exists_tx(conn: &Connection, user_id: &str) -> RepositoryResult<bool> {
        Self::exists(conn, "SELECT 1 FROM app_user WHERE user_id = ?", user_id)
    }

    /// 专业 PLO 是否存在
    pub fn plo_exists_tx(conn: &Connection, plo_id: &str) -> RepositoryResult<bool> {
        Self::exists(conn, "SELECT 1 FROM program_plo WHERE plo_id = ?", plo_id)
    }

    /// 按 (专业, 编码) 解析 PLO ID（历史 {plo_code: level} 载荷的解析路径）
    pub fn find_plo_id_by_code_tx(
        conn: &Connection,
        program_id: &str,
        plo_code: &str,
    ) -> RepositoryResult<Option<String>> {
        match conn.query_row(
            "SELECT plo_id FROM program_plo WHERE program_id = ? AND plo_code = ?",
            params![program_id, plo_code],
            |row| row.get::<_, String>(0),
        ) {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询订阅了某课程的学生名单（发布时通知扇出）
    pub fn list_subscribers(&self, subject_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT student_id FROM subject_subscription WHERE subject_id = ? ORDER BY student_id",
        )?;
        let rows = stmt
            .query_map(params![subject_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
