// ==========================================
// 教学大纲管理系统 - 大纲头仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 说明: 写操作提供 *_tx 关联函数，由引擎层在统一事务内组合
// ==========================================

use crate::domain::syllabus::Syllabus;
use crate::domain::types::SyllabusStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::invalid_enum;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// SyllabusRepository - 大纲头仓储
// ==========================================
pub struct SyllabusRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SyllabusRepository {
    /// 创建新的大纲头仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事务内写操作（由引擎层统一事务调用）
    // ==========================================

    /// 插入大纲头
    pub fn insert_tx(conn: &Connection, syllabus: &Syllabus) -> RepositoryResult<String> {
        conn.execute(
            r#"INSERT INTO syllabus (
                syllabus_id, subject_id, program_id, academic_year_id, lecturer_id,
                status, version, description, objectives_json,
                time_allocation_json, prerequisites, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &syllabus.syllabus_id,
                &syllabus.subject_id,
                &syllabus.program_id,
                &syllabus.academic_year_id,
                &syllabus.lecturer_id,
                syllabus.status.to_db_str(),
                &syllabus.version,
                &syllabus.description,
                syllabus.objectives_json.as_ref().map(|v| v.to_string()),
                syllabus.time_allocation_json.as_ref().map(|v| v.to_string()),
                &syllabus.prerequisites,
                syllabus.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                syllabus.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(syllabus.syllabus_id.clone())
    }

    /// 更新大纲内容字段（四个参照外键与状态不在此处变更）
    pub fn update_content_tx(conn: &Connection, syllabus: &Syllabus) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE syllabus
               SET version = ?, description = ?, objectives_json = ?,
                   time_allocation_json = ?, prerequisites = ?, updated_at = ?
               WHERE syllabus_id = ?"#,
            params![
                &syllabus.version,
                &syllabus.description,
                syllabus.objectives_json.as_ref().map(|v| v.to_string()),
                syllabus.time_allocation_json.as_ref().map(|v| v.to_string()),
                &syllabus.prerequisites,
                syllabus.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                &syllabus.syllabus_id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Syllabus".to_string(),
                id: syllabus.syllabus_id.clone(),
            });
        }
        Ok(())
    }

    /// 更新大纲状态（状态转换的唯一写入点）
    pub fn update_status_tx(
        conn: &Connection,
        syllabus_id: &str,
        status: SyllabusStatus,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE syllabus SET status = ?, updated_at = ? WHERE syllabus_id = ?",
            params![
                status.to_db_str(),
                updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                syllabus_id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Syllabus".to_string(),
                id: syllabus_id.to_string(),
            });
        }
        Ok(())
    }

    /// 事务内按 ID 查询大纲头
    pub fn find_by_id_tx(
        conn: &Connection,
        syllabus_id: &str,
    ) -> RepositoryResult<Option<Syllabus>> {
        match conn.query_row(
            &format!("{} WHERE syllabus_id = ?", SELECT_HEADER),
            params![syllabus_id],
            map_row,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查找同 (课程, 专业, 学年, 状态) 组合的已有大纲
    ///
    /// # 返回
    /// - Ok(Some(syllabus_id)): 存在冲突记录
    pub fn find_duplicate_tx(
        conn: &Connection,
        subject_id: &str,
        program_id: &str,
        academic_year_id: &str,
        status: SyllabusStatus,
    ) -> RepositoryResult<Option<String>> {
        match conn.query_row(
            r#"SELECT syllabus_id FROM syllabus
               WHERE subject_id = ? AND program_id = ? AND academic_year_id = ? AND status = ?
               LIMIT 1"#,
            params![subject_id, program_id, academic_year_id, status.to_db_str()],
            |row| row.get::<_, String>(0),
        ) {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ==========================================
    // 独立读/删操作
    // ==========================================

    /// 按 ID 查询大纲头
    pub fn find_by_id(&self, syllabus_id: &str) -> RepositoryResult<Option<Syllabus>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, syllabus_id)
    }

    /// 查询讲师名下全部大纲
    pub fn list_by_lecturer(&self, lecturer_id: &str) -> RepositoryResult<Vec<Syllabus>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE lecturer_id = ? ORDER BY created_at DESC",
            SELECT_HEADER
        ))?;
        let rows = stmt
            .query_map(params![lecturer_id], map_row)?
            .collect::<Result<Vec<Syllabus>, _>>()?;
        Ok(rows)
    }

    /// 硬删除大纲（外键级联删除全部子表）
    ///
    /// # 返回
    /// - Ok(true): 删除了一行
    /// - Ok(false): 记录不存在
    pub fn delete(&self, syllabus_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM syllabus WHERE syllabus_id = ?",
            params![syllabus_id],
        )?;
        Ok(rows > 0)
    }
}

// 统一的 SELECT 列清单（与 map_row 下标对齐）
const SELECT_HEADER: &str = r#"SELECT syllabus_id, subject_id, program_id, academic_year_id,
       lecturer_id, status, version, description, objectives_json,
       time_allocation_json, prerequisites, created_at, updated_at
FROM syllabus"#;

/// 行映射
fn map_row(row: &Row<'_>) -> rusqlite::Result<Syllabus> {
    let status_str: String = row.get(5)?;
    let status = SyllabusStatus::from_db_str(&status_str)
        .ok_or_else(|| invalid_enum(5, &status_str, "大纲状态"))?;
    let objectives_json: Option<String> = row.get(8)?;
    let time_allocation_json: Option<String> = row.get(9)?;
    Ok(Syllabus {
        syllabus_id: row.get(0)?,
        subject_id: row.get(1)?,
        program_id: row.get(2)?,
        academic_year_id: row.get(3)?,
        lecturer_id: row.get(4)?,
        status,
        version: row.get(6)?,
        description: row.get(7)?,
        objectives_json: objectives_json.and_then(|s| serde_json::from_str(&s).ok()),
        time_allocation_json: time_allocation_json.and_then(|s| serde_json::from_str(&s).ok()),
        prerequisites: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
