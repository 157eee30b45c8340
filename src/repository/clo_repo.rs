// ==========================================
// 教学大纲管理系统 - CLO 仓储
// ==========================================
// 覆盖 syllabus_clo 与 clo_plo_mapping 两张表
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::syllabus::{Clo, CloPloMapping};
use crate::domain::types::PloLevel;
use crate::repository::error::RepositoryResult;
use crate::repository::invalid_enum;
use rusqlite::{params, Connection};

// ==========================================
// CloRepository - 课程学习成果仓储
// ==========================================
// 说明: 全部为事务内关联函数，CLO 的差量调和由引擎层编排
pub struct CloRepository;

impl CloRepository {
    /// 插入 CLO（不含映射）
    pub fn insert_tx(conn: &Connection, clo: &Clo) -> RepositoryResult<String> {
        conn.execute(
            "INSERT INTO syllabus_clo (clo_id, syllabus_id, clo_code, description) VALUES (?, ?, ?, ?)",
            params![&clo.clo_id, &clo.syllabus_id, &clo.clo_code, &clo.description],
        )?;
        Ok(clo.clo_id.clone())
    }

    /// 更新 CLO 基本字段（保留 clo_id，差量调和的“原位更新”路径）
    pub fn update_tx(
        conn: &Connection,
        clo_id: &str,
        clo_code: &str,
        description: Option<&str>,
    ) -> RepositoryResult<()> {
        conn.execute(
            "UPDATE syllabus_clo SET clo_code = ?, description = ? WHERE clo_id = ?",
            params![clo_code, description, clo_id],
        )?;
        Ok(())
    }

    /// 删除单个 CLO（级联删除其映射与 assessment_clo 链接）
    pub fn delete_tx(conn: &Connection, clo_id: &str) -> RepositoryResult<()> {
        conn.execute("DELETE FROM syllabus_clo WHERE clo_id = ?", params![clo_id])?;
        Ok(())
    }

    /// 插入一条 CLO->PLO 映射
    pub fn insert_mapping_tx(conn: &Connection, mapping: &CloPloMapping) -> RepositoryResult<()> {
        conn.execute(
            "INSERT INTO clo_plo_mapping (mapping_id, clo_id, plo_id, level) VALUES (?, ?, ?, ?)",
            params![
                &mapping.mapping_id,
                &mapping.clo_id,
                &mapping.plo_id,
                mapping.level.to_db_str(),
            ],
        )?;
        Ok(())
    }

    /// 清空某 CLO 的全部映射（原位更新 CLO 时整体重建映射）
    pub fn delete_mappings_tx(conn: &Connection, clo_id: &str) -> RepositoryResult<()> {
        conn.execute(
            "DELETE FROM clo_plo_mapping WHERE clo_id = ?",
            params![clo_id],
        )?;
        Ok(())
    }

    /// 查询大纲下现存的 (clo_id, clo_code) 清单（差量调和的比对基准）
    pub fn list_ids_tx(
        conn: &Connection,
        syllabus_id: &str,
    ) -> RepositoryResult<Vec<(String, String)>> {
        let mut stmt = conn.prepare(
            "SELECT clo_id, clo_code FROM syllabus_clo WHERE syllabus_id = ? ORDER BY clo_code",
        )?;
        let rows = stmt
            .query_map(params![syllabus_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 查询大纲下全部 CLO（含映射）
    pub fn list_by_syllabus(conn: &Connection, syllabus_id: &str) -> RepositoryResult<Vec<Clo>> {
        let mut stmt = conn.prepare(
            r#"SELECT clo_id, syllabus_id, clo_code, description
               FROM syllabus_clo WHERE syllabus_id = ? ORDER BY clo_code"#,
        )?;
        let mut clos = stmt
            .query_map(params![syllabus_id], |row| {
                Ok(Clo {
                    clo_id: row.get(0)?,
                    syllabus_id: row.get(1)?,
                    clo_code: row.get(2)?,
                    description: row.get(3)?,
                    plo_mappings: Vec::new(),
                })
            })?
            .collect::<Result<Vec<Clo>, _>>()?;

        for clo in &mut clos {
            clo.plo_mappings = Self::list_mappings(conn, &clo.clo_id)?;
        }
        Ok(clos)
    }

    /// 查询某 CLO 的全部映射
    fn list_mappings(conn: &Connection, clo_id: &str) -> RepositoryResult<Vec<CloPloMapping>> {
        let mut stmt = conn.prepare(
            "SELECT mapping_id, clo_id, plo_id, level FROM clo_plo_mapping WHERE clo_id = ?",
        )?;
        let rows = stmt
            .query_map(params![clo_id], |row| {
                let level_str: String = row.get(3)?;
                let level = PloLevel::from_db_str(&level_str)
                    .ok_or_else(|| invalid_enum(3, &level_str, "映射等级"))?;
                Ok(CloPloMapping {
                    mapping_id: row.get(0)?,
                    clo_id: row.get(1)?,
                    plo_id: row.get(2)?,
                    level,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
