// ==========================================
// 教学大纲管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 多表写操作以 *_tx 关联函数暴露，由引擎层在统一事务内组合
// ==========================================

pub mod assessment_repo;
pub mod clo_repo;
pub mod error;
pub mod material_repo;
pub mod reference_repo;
pub mod snapshot_repo;
pub mod syllabus_repo;
pub mod workflow_repo;

// 重导出核心仓储
pub use assessment_repo::AssessmentRepository;
pub use clo_repo::CloRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use material_repo::{MaterialRepository, TeachingPlanRepository};
pub use reference_repo::ReferenceRepository;
pub use snapshot_repo::SnapshotRepository;
pub use syllabus_repo::SyllabusRepository;
pub use workflow_repo::{CurrentWorkflowRepository, WorkflowLogRepository};

use crate::domain::syllabus::SyllabusAggregate;
use rusqlite::Connection;

/// 构造“数据库枚举字符串无法解析”的列转换错误
pub(crate) fn invalid_enum(idx: usize, value: &str, what: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("无法解析{}: {}", what, value).into(),
    )
}

/// 读取完整聚合视图（同一连接上组装，保证一致性）
pub fn fetch_aggregate(
    conn: &Connection,
    syllabus_id: &str,
) -> RepositoryResult<Option<SyllabusAggregate>> {
    let syllabus = match SyllabusRepository::find_by_id_tx(conn, syllabus_id)? {
        Some(s) => s,
        None => return Ok(None),
    };
    Ok(Some(SyllabusAggregate {
        clos: CloRepository::list_by_syllabus(conn, syllabus_id)?,
        materials: MaterialRepository::list_by_syllabus(conn, syllabus_id)?,
        teaching_plans: TeachingPlanRepository::list_by_syllabus(conn, syllabus_id)?,
        assessment_schemes: AssessmentRepository::list_by_syllabus(conn, syllabus_id)?,
        syllabus,
    }))
}
