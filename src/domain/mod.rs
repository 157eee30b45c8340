// ==========================================
// 教学大纲管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、封闭枚举、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod snapshot;
pub mod syllabus;
pub mod types;
pub mod workflow;

// 重导出核心类型
pub use snapshot::SyllabusSnapshot;
pub use syllabus::{
    AssessmentComponent, AssessmentScheme, Clo, CloPloMapping, Material, Rubric, Syllabus,
    SyllabusAggregate, TeachingPlan,
};
pub use types::{Actor, MaterialType, PloLevel, Role, SyllabusStatus, WorkflowAction};
pub use workflow::{CurrentWorkflow, WorkflowLog};
