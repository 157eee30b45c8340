// ==========================================
// 教学大纲管理系统 - 服务外观层
// ==========================================
// 职责: 面向调用方的统一入口，屏蔽引擎与仓储的组装细节
// ==========================================

pub mod syllabus_api;

pub use syllabus_api::SyllabusApi;
