// ==========================================
// 教学大纲管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 大纲审批工作流核心 (外部服务通过协作者契约接入)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Actor, MaterialType, PloLevel, Role, SyllabusStatus, WorkflowAction};

// 领域实体
pub use domain::{
    AssessmentComponent, AssessmentScheme, Clo, CloPloMapping, CurrentWorkflow, Material, Rubric,
    Syllabus, SyllabusAggregate, SyllabusSnapshot, TeachingPlan, WorkflowLog,
};

// 引擎
pub use engine::{
    AggregateBuilder, AiComparator, CreateSyllabusPayload, DeadlineScanner, NotificationSink,
    SearchIndexer, SnapshotService, TransitionOutcome, UpdateSyllabusPayload, WorkflowConfig,
    WorkflowEngine, WorkflowError, WorkflowResult,
};

// API
pub use api::SyllabusApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "教学大纲管理系统";

// ==========================================
// 预编译检查
// ==========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
