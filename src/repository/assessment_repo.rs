// ==========================================
// 教学大纲管理系统 - 考核方案仓储
// ==========================================
// 覆盖 assessment_scheme / assessment_component / assessment_rubric / assessment_clo
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::syllabus::{AssessmentComponent, AssessmentScheme, Rubric};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection};

// ==========================================
// AssessmentRepository - 考核方案树仓储
// ==========================================
pub struct AssessmentRepository;

impl AssessmentRepository {
    /// 插入考核方案（不含子级）
    pub fn insert_scheme_tx(conn: &Connection, scheme: &AssessmentScheme) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO assessment_scheme (scheme_id, syllabus_id, scheme_name, weight_pct)
               VALUES (?, ?, ?, ?)"#,
            params![
                &scheme.scheme_id,
                &scheme.syllabus_id,
                &scheme.scheme_name,
                &scheme.weight_pct,
            ],
        )?;
        Ok(())
    }

    /// 插入考核组件（不含子级）
    pub fn insert_component_tx(
        conn: &Connection,
        component: &AssessmentComponent,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO assessment_component (
                component_id, scheme_id, component_name, weight_pct, criteria
            ) VALUES (?, ?, ?, ?, ?)"#,
            params![
                &component.component_id,
                &component.scheme_id,
                &component.component_name,
                &component.weight_pct,
                &component.criteria,
            ],
        )?;
        Ok(())
    }

    /// 插入评分细则
    pub fn insert_rubric_tx(conn: &Connection, rubric: &Rubric) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO assessment_rubric (
                rubric_id, component_id, criteria, max_score, pass_desc, fail_desc
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &rubric.rubric_id,
                &rubric.component_id,
                &rubric.criteria,
                &rubric.max_score,
                &rubric.pass_desc,
                &rubric.fail_desc,
            ],
        )?;
        Ok(())
    }

    /// 插入组件与 CLO 的考核链接
    pub fn insert_clo_link_tx(
        conn: &Connection,
        component_id: &str,
        clo_id: &str,
    ) -> RepositoryResult<()> {
        conn.execute(
            "INSERT INTO assessment_clo (component_id, clo_id) VALUES (?, ?)",
            params![component_id, clo_id],
        )?;
        Ok(())
    }

    /// 清空大纲下全部考核方案（级联删除组件/细则/链接，更新时整体重建）
    pub fn delete_by_syllabus_tx(conn: &Connection, syllabus_id: &str) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM assessment_scheme WHERE syllabus_id = ?",
            params![syllabus_id],
        )?;
        Ok(rows)
    }

    /// 查询大纲下全部考核方案树
    pub fn list_by_syllabus(
        conn: &Connection,
        syllabus_id: &str,
    ) -> RepositoryResult<Vec<AssessmentScheme>> {
        let mut stmt = conn.prepare(
            r#"SELECT scheme_id, syllabus_id, scheme_name, weight_pct
               FROM assessment_scheme WHERE syllabus_id = ? ORDER BY scheme_name"#,
        )?;
        let mut schemes = stmt
            .query_map(params![syllabus_id], |row| {
                Ok(AssessmentScheme {
                    scheme_id: row.get(0)?,
                    syllabus_id: row.get(1)?,
                    scheme_name: row.get(2)?,
                    weight_pct: row.get(3)?,
                    components: Vec::new(),
                })
            })?
            .collect::<Result<Vec<AssessmentScheme>, _>>()?;

        for scheme in &mut schemes {
            scheme.components = Self::list_components(conn, &scheme.scheme_id)?;
        }
        Ok(schemes)
    }

    /// 查询方案下全部组件（含细则与 CLO 链接）
    fn list_components(
        conn: &Connection,
        scheme_id: &str,
    ) -> RepositoryResult<Vec<AssessmentComponent>> {
        let mut stmt = conn.prepare(
            r#"SELECT component_id, scheme_id, component_name, weight_pct, criteria
               FROM assessment_component WHERE scheme_id = ? ORDER BY component_name"#,
        )?;
        let mut components = stmt
            .query_map(params![scheme_id], |row| {
                Ok(AssessmentComponent {
                    component_id: row.get(0)?,
                    scheme_id: row.get(1)?,
                    component_name: row.get(2)?,
                    weight_pct: row.get(3)?,
                    criteria: row.get(4)?,
                    rubrics: Vec::new(),
                    clo_ids: Vec::new(),
                })
            })?
            .collect::<Result<Vec<AssessmentComponent>, _>>()?;

        for component in &mut components {
            component.rubrics = Self::list_rubrics(conn, &component.component_id)?;
            component.clo_ids = Self::list_clo_links(conn, &component.component_id)?;
        }
        Ok(components)
    }

    /// 查询组件下全部评分细则
    fn list_rubrics(conn: &Connection, component_id: &str) -> RepositoryResult<Vec<Rubric>> {
        let mut stmt = conn.prepare(
            r#"SELECT rubric_id, component_id, criteria, max_score, pass_desc, fail_desc
               FROM assessment_rubric WHERE component_id = ?"#,
        )?;
        let rows = stmt
            .query_map(params![component_id], |row| {
                Ok(Rubric {
                    rubric_id: row.get(0)?,
                    component_id: row.get(1)?,
                    criteria: row.get(2)?,
                    max_score: row.get(3)?,
                    pass_desc: row.get(4)?,
                    fail_desc: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 查询组件考核的 CLO ID 列表
    fn list_clo_links(conn: &Connection, component_id: &str) -> RepositoryResult<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT clo_id FROM assessment_clo WHERE component_id = ?")?;
        let rows = stmt
            .query_map(params![component_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
