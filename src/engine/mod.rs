// ==========================================
// 教学大纲管理系统 - 业务引擎层
// ==========================================
// 职责: 审批状态机、聚合构建、内容校验、时限扫描、快照服务
// 红线: 引擎层是业务规则的唯一裁决点，API 层不得复制校验逻辑
// ==========================================

pub mod builder;
pub mod config;
pub mod deadline;
pub mod error;
pub mod events;
pub mod payload;
pub mod snapshot;
pub mod validation;
pub mod workflow;

// 重导出核心类型
pub use builder::AggregateBuilder;
pub use config::WorkflowConfig;
pub use deadline::DeadlineScanner;
pub use error::{WorkflowError, WorkflowResult};
pub use events::{
    AiComparator, DeliveryOutcome, NoOpNotificationSink, NoOpSearchIndexer, Notification,
    NotificationSink, OptionalNotificationSink, OptionalSearchIndexer, Recipient, SearchIndexer,
};
pub use payload::{
    CloPayload, CloRef, ComponentPayload, CreateSyllabusPayload, MaterialPayload,
    PloMappingPayload, RubricPayload, SchemePayload, TeachingPlanPayload, UpdateSyllabusPayload,
};
pub use snapshot::SnapshotService;
pub use workflow::{TransitionOutcome, WorkflowEngine};
