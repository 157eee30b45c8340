// ==========================================
// 教学大纲管理系统 - 引擎层错误类型
// ==========================================
// 职责: 定义审批工作流的核心错误分类
// 说明: 边界层（HTTP 等，不在本库范围内）负责将这些错误翻译为协议响应；
//       核心只负责同步抛出带可读信息的分类错误
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 工作流核心错误类型
#[derive(Error, Debug)]
pub enum WorkflowError {
    // ===== 内容/规则校验 =====
    /// 内容完整性或权重规则违反（聚合后的完整错误清单）
    #[error("校验失败: {0}")]
    Validation(String),

    // ===== 状态机 =====
    /// 当前状态不允许该动作
    #[error("无效的状态: 当前={current}, 动作={action}")]
    InvalidState { current: String, action: String },

    /// 动作字符串无法识别
    #[error("无效的动作: {0}")]
    InvalidAction(String),

    // ===== 权限 =====
    /// 非所有者（且非管理员）尝试修改/提交
    #[error("无所有权: {0}")]
    Ownership(String),

    /// 角色与当前审批环节不匹配
    #[error("无权限: {0}")]
    Permission(String),

    // ===== 数据冲突 =====
    /// 同 (课程, 专业, 学年, 状态) 组合已存在
    #[error("记录冲突: {0}")]
    Conflict(String),

    /// 引用的实体不存在
    #[error("实体未找到: {entity} (id={id})")]
    NotFound { entity: String, id: String },

    // ===== 基础设施 =====
    #[error("数据访问失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkflowError {
    /// 构造状态错误
    pub fn invalid_state(current: impl ToString, action: &str) -> Self {
        WorkflowError::InvalidState {
            current: current.to_string(),
            action: action.to_string(),
        }
    }

    /// 构造实体未找到错误
    pub fn not_found(entity: &str, id: &str) -> Self {
        WorkflowError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result 类型别名
pub type WorkflowResult<T> = Result<T, WorkflowError>;
