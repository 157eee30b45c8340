// ==========================================
// 教学大纲管理系统 - 教材/教学周计划仓储
// ==========================================
// 两类子实体均为“整体删除后重建”的简单实体（无下游 ID 依赖）
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::syllabus::{Material, TeachingPlan};
use crate::domain::types::MaterialType;
use crate::repository::error::RepositoryResult;
use crate::repository::invalid_enum;
use rusqlite::{params, Connection};

// ==========================================
// MaterialRepository - 教材仓储
// ==========================================
pub struct MaterialRepository;

impl MaterialRepository {
    /// 插入教材
    pub fn insert_tx(conn: &Connection, material: &Material) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO syllabus_material (
                material_id, syllabus_id, material_type, title, author, publisher, isbn, url
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &material.material_id,
                &material.syllabus_id,
                material.material_type.to_db_str(),
                &material.title,
                &material.author,
                &material.publisher,
                &material.isbn,
                &material.url,
            ],
        )?;
        Ok(())
    }

    /// 清空大纲下全部教材（更新时整体重建）
    pub fn delete_by_syllabus_tx(conn: &Connection, syllabus_id: &str) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM syllabus_material WHERE syllabus_id = ?",
            params![syllabus_id],
        )?;
        Ok(rows)
    }

    /// 查询大纲下全部教材
    pub fn list_by_syllabus(
        conn: &Connection,
        syllabus_id: &str,
    ) -> RepositoryResult<Vec<Material>> {
        let mut stmt = conn.prepare(
            r#"SELECT material_id, syllabus_id, material_type, title, author, publisher, isbn, url
               FROM syllabus_material WHERE syllabus_id = ? ORDER BY material_type, title"#,
        )?;
        let rows = stmt
            .query_map(params![syllabus_id], |row| {
                let type_str: String = row.get(2)?;
                let material_type = MaterialType::from_db_str(&type_str)
                    .ok_or_else(|| invalid_enum(2, &type_str, "教材类型"))?;
                Ok(Material {
                    material_id: row.get(0)?,
                    syllabus_id: row.get(1)?,
                    material_type,
                    title: row.get(3)?,
                    author: row.get(4)?,
                    publisher: row.get(5)?,
                    isbn: row.get(6)?,
                    url: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ==========================================
// TeachingPlanRepository - 教学周计划仓储
// ==========================================
pub struct TeachingPlanRepository;

impl TeachingPlanRepository {
    /// 插入周计划
    pub fn insert_tx(conn: &Connection, plan: &TeachingPlan) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO teaching_plan (
                plan_id, syllabus_id, week_no, topic, activity, assessment_note
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &plan.plan_id,
                &plan.syllabus_id,
                &plan.week_no,
                &plan.topic,
                &plan.activity,
                &plan.assessment_note,
            ],
        )?;
        Ok(())
    }

    /// 清空大纲下全部周计划（更新时整体重建）
    pub fn delete_by_syllabus_tx(conn: &Connection, syllabus_id: &str) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM teaching_plan WHERE syllabus_id = ?",
            params![syllabus_id],
        )?;
        Ok(rows)
    }

    /// 查询大纲下全部周计划（按周次排序）
    pub fn list_by_syllabus(
        conn: &Connection,
        syllabus_id: &str,
    ) -> RepositoryResult<Vec<TeachingPlan>> {
        let mut stmt = conn.prepare(
            r#"SELECT plan_id, syllabus_id, week_no, topic, activity, assessment_note
               FROM teaching_plan WHERE syllabus_id = ? ORDER BY week_no"#,
        )?;
        let rows = stmt
            .query_map(params![syllabus_id], |row| {
                Ok(TeachingPlan {
                    plan_id: row.get(0)?,
                    syllabus_id: row.get(1)?,
                    week_no: row.get(2)?,
                    topic: row.get(3)?,
                    activity: row.get(4)?,
                    assessment_note: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
