// ==========================================
// 教学大纲管理系统 - 外部协作者契约
// ==========================================
// 职责: 定义通知/搜索索引/AI 对比三类协作者的 trait，实现依赖倒置
// 说明: 引擎层定义 trait，外部基础设施实现适配器
// 红线: 副作用失败只记录日志并返回类型化结果，绝不回滚或阻断主事务
// ==========================================

use crate::domain::types::Role;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 通知
// ==========================================

/// 通知接收方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// 指定用户
    Users(Vec<String>),
    /// 指定角色下的全部用户（名单解析由通知服务完成）
    Roles(Vec<Role>),
}

/// 一条待投递的通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,   // 接收方
    pub title: String,          // 标题
    pub message: String,        // 正文
    pub link: Option<String>,   // 跳转链接
}

impl Notification {
    /// 构造发往指定角色集合的通知
    pub fn to_roles(roles: Vec<Role>, title: &str, message: &str, link: Option<String>) -> Self {
        Self {
            recipient: Recipient::Roles(roles),
            title: title.to_string(),
            message: message.to_string(),
            link,
        }
    }

    /// 构造发往指定用户的通知
    pub fn to_users(user_ids: Vec<String>, title: &str, message: &str, link: Option<String>) -> Self {
        Self {
            recipient: Recipient::Users(user_ids),
            title: title.to_string(),
            message: message.to_string(),
            link,
        }
    }
}

/// 投递结果（类型化，供观测使用；失败不向调用方抛错）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 已交付通知服务
    Delivered,
    /// 投递失败（已记录日志）
    Failed,
    /// 未配置通知服务，跳过
    Skipped,
}

/// 通知投递 Trait
///
/// 引擎层定义，邮件/SocketIO 等投递机制由外部实现
pub trait NotificationSink: Send + Sync {
    /// 投递一条通知
    fn notify(&self, notification: Notification) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作通知投递（单元测试或未接通知服务的场景）
#[derive(Debug, Clone, Default)]
pub struct NoOpNotificationSink;

impl NotificationSink for NoOpNotificationSink {
    fn notify(&self, notification: Notification) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpNotificationSink: 跳过通知投递 - title={}", notification.title);
        Ok(())
    }
}

/// 可选通知投递包装
///
/// 简化 Option<Arc<dyn NotificationSink>> 的使用；失败吞掉并告警
pub struct OptionalNotificationSink {
    inner: Option<Arc<dyn NotificationSink>>,
}

impl OptionalNotificationSink {
    /// 创建带投递器的实例
    pub fn with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        Self { inner: Some(sink) }
    }

    /// 创建空实例（不投递）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 投递通知（尽力而为）
    pub fn notify(&self, notification: Notification) -> DeliveryOutcome {
        match &self.inner {
            Some(sink) => {
                let title = notification.title.clone();
                match sink.notify(notification) {
                    Ok(()) => DeliveryOutcome::Delivered,
                    Err(e) => {
                        tracing::warn!("通知投递失败 (title={}): {}", title, e);
                        DeliveryOutcome::Failed
                    }
                }
            }
            None => {
                tracing::debug!("未配置通知服务，跳过通知 - title={}", notification.title);
                DeliveryOutcome::Skipped
            }
        }
    }

    /// 检查是否配置了投递器
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalNotificationSink {
    fn default() -> Self {
        Self::none()
    }
}

// ==========================================
// 搜索索引
// ==========================================

/// 搜索索引同步 Trait
///
/// 每次影响状态的写入后尽力同步；索引服务内部结构不在本库范围
pub trait SearchIndexer: Send + Sync {
    /// 重建某大纲的索引
    fn index(&self, syllabus_id: &str, content: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// 删除某大纲的索引
    fn delete(&self, syllabus_id: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作搜索索引
#[derive(Debug, Clone, Default)]
pub struct NoOpSearchIndexer;

impl SearchIndexer for NoOpSearchIndexer {
    fn index(&self, syllabus_id: &str, _content: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpSearchIndexer: 跳过索引 - syllabus_id={}", syllabus_id);
        Ok(())
    }

    fn delete(&self, syllabus_id: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpSearchIndexer: 跳过删除索引 - syllabus_id={}", syllabus_id);
        Ok(())
    }
}

/// 可选搜索索引包装（失败吞掉并告警）
pub struct OptionalSearchIndexer {
    inner: Option<Arc<dyn SearchIndexer>>,
}

impl OptionalSearchIndexer {
    /// 创建带索引器的实例
    pub fn with_indexer(indexer: Arc<dyn SearchIndexer>) -> Self {
        Self {
            inner: Some(indexer),
        }
    }

    /// 创建空实例
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 重建索引（尽力而为）
    pub fn index(&self, syllabus_id: &str, content: &str) -> DeliveryOutcome {
        match &self.inner {
            Some(indexer) => match indexer.index(syllabus_id, content) {
                Ok(()) => DeliveryOutcome::Delivered,
                Err(e) => {
                    tracing::warn!("搜索索引同步失败 (syllabus_id={}): {}", syllabus_id, e);
                    DeliveryOutcome::Failed
                }
            },
            None => DeliveryOutcome::Skipped,
        }
    }

    /// 删除索引（尽力而为）
    pub fn delete(&self, syllabus_id: &str) -> DeliveryOutcome {
        match &self.inner {
            Some(indexer) => match indexer.delete(syllabus_id) {
                Ok(()) => DeliveryOutcome::Delivered,
                Err(e) => {
                    tracing::warn!("搜索索引删除失败 (syllabus_id={}): {}", syllabus_id, e);
                    DeliveryOutcome::Failed
                }
            },
            None => DeliveryOutcome::Skipped,
        }
    }
}

impl Default for OptionalSearchIndexer {
    fn default() -> Self {
        Self::none()
    }
}

// ==========================================
// AI 版本对比
// ==========================================

/// AI 结构化对比 Trait
///
/// 快照服务只负责取出两份载荷并转发，diff 逻辑完全委托外部服务
pub trait AiComparator: Send + Sync {
    /// 对比两份聚合载荷，返回对比报告
    fn diff(
        &self,
        payload_a: &serde_json::Value,
        payload_b: &serde_json::Value,
    ) -> Result<serde_json::Value, Box<dyn Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_sink() {
        let sink = NoOpNotificationSink;
        let n = Notification::to_roles(vec![Role::Admin], "测试", "正文", None);
        assert!(sink.notify(n).is_ok());
    }

    #[test]
    fn test_optional_sink_none_skips() {
        let sink = OptionalNotificationSink::none();
        assert!(!sink.is_configured());
        let n = Notification::to_users(vec!["U1".to_string()], "测试", "正文", None);
        assert_eq!(sink.notify(n), DeliveryOutcome::Skipped);
    }

    #[test]
    fn test_optional_sink_failure_is_swallowed() {
        struct FailingSink;
        impl NotificationSink for FailingSink {
            fn notify(&self, _n: Notification) -> Result<(), Box<dyn Error + Send + Sync>> {
                Err("连接超时".into())
            }
        }

        let sink = OptionalNotificationSink::with_sink(Arc::new(FailingSink));
        let n = Notification::to_roles(vec![Role::Admin], "测试", "正文", None);
        // 失败只体现在返回值，不 panic 不抛错
        assert_eq!(sink.notify(n), DeliveryOutcome::Failed);
    }

    #[test]
    fn test_optional_indexer_none_skips() {
        let indexer = OptionalSearchIndexer::none();
        assert_eq!(indexer.index("SYL1", "内容"), DeliveryOutcome::Skipped);
        assert_eq!(indexer.delete("SYL1"), DeliveryOutcome::Skipped);
    }
}
