// ==========================================
// 教学大纲管理系统 - 工作流配置
// ==========================================
// 职责: 审批时限、校验阈值的集中配置
// 存储: config_kv 表 (key-value)，缺省值内置
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 提交后首个审批环节的处理时限（天）
pub const DEFAULT_SUBMIT_DUE_DAYS: i64 = 7;

/// 后续审批环节的处理时限（天）
pub const DEFAULT_EVALUATE_DUE_DAYS: i64 = 5;

/// 权重求和的浮点容差
pub const DEFAULT_WEIGHT_EPSILON: f64 = 0.1;

/// 课程描述最短字数
pub const DEFAULT_MIN_DESCRIPTION_LEN: usize = 50;

/// 教学周计划最少条数
pub const DEFAULT_MIN_TEACHING_PLANS: usize = 5;

// ==========================================
// WorkflowConfig - 工作流配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub submit_due_days: i64,        // 提交后处理时限（天）
    pub evaluate_due_days: i64,      // 评审后处理时限（天）
    pub weight_epsilon: f64,         // 权重求和容差
    pub min_description_len: usize,  // 描述最短字数
    pub min_teaching_plans: usize,   // 周计划最少条数
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            submit_due_days: DEFAULT_SUBMIT_DUE_DAYS,
            evaluate_due_days: DEFAULT_EVALUATE_DUE_DAYS,
            weight_epsilon: DEFAULT_WEIGHT_EPSILON,
            min_description_len: DEFAULT_MIN_DESCRIPTION_LEN,
            min_teaching_plans: DEFAULT_MIN_TEACHING_PLANS,
        }
    }
}

impl WorkflowConfig {
    /// 从 config_kv 表加载配置，缺失项使用内置默认值
    ///
    /// 说明: 单个键解析失败按缺失处理并告警，不让坏配置拖垮主流程
    pub fn load(conn: &Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let conn = conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut config = Self::default();
        if let Some(v) = Self::read_key(&conn, "workflow/submit_due_days")? {
            match v.parse::<i64>() {
                Ok(n) if n > 0 => config.submit_due_days = n,
                _ => tracing::warn!("配置 workflow/submit_due_days 非法: {}", v),
            }
        }
        if let Some(v) = Self::read_key(&conn, "workflow/evaluate_due_days")? {
            match v.parse::<i64>() {
                Ok(n) if n > 0 => config.evaluate_due_days = n,
                _ => tracing::warn!("配置 workflow/evaluate_due_days 非法: {}", v),
            }
        }
        if let Some(v) = Self::read_key(&conn, "workflow/weight_epsilon")? {
            match v.parse::<f64>() {
                Ok(n) if n.is_finite() && n >= 0.0 => config.weight_epsilon = n,
                _ => tracing::warn!("配置 workflow/weight_epsilon 非法: {}", v),
            }
        }
        if let Some(v) = Self::read_key(&conn, "workflow/min_description_len")? {
            match v.parse::<usize>() {
                Ok(n) => config.min_description_len = n,
                _ => tracing::warn!("配置 workflow/min_description_len 非法: {}", v),
            }
        }
        if let Some(v) = Self::read_key(&conn, "workflow/min_teaching_plans")? {
            match v.parse::<usize>() {
                Ok(n) => config.min_teaching_plans = n,
                _ => tracing::warn!("配置 workflow/min_teaching_plans 非法: {}", v),
            }
        }
        Ok(config)
    }

    /// 读取单个配置键
    fn read_key(conn: &Connection, key: &str) -> RepositoryResult<Option<String>> {
        match conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_load_defaults_when_table_empty() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let config = WorkflowConfig::load(&conn).unwrap();
        assert_eq!(config.submit_due_days, DEFAULT_SUBMIT_DUE_DAYS);
        assert_eq!(config.evaluate_due_days, DEFAULT_EVALUATE_DUE_DAYS);
    }

    #[test]
    fn test_load_overrides() {
        let raw = Connection::open_in_memory().unwrap();
        db::init_schema(&raw).unwrap();
        raw.execute(
            "INSERT INTO config_kv (key, value) VALUES ('workflow/evaluate_due_days', '3')",
            [],
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(raw));

        let config = WorkflowConfig::load(&conn).unwrap();
        assert_eq!(config.evaluate_due_days, 3);
        // 未覆写的键保持默认
        assert_eq!(config.submit_due_days, DEFAULT_SUBMIT_DUE_DAYS);
    }

    #[test]
    fn test_load_weight_epsilon_override() {
        let raw = Connection::open_in_memory().unwrap();
        db::init_schema(&raw).unwrap();
        raw.execute(
            "INSERT INTO config_kv (key, value) VALUES ('workflow/weight_epsilon', '0.5')",
            [],
        )
        .unwrap();
        raw.execute(
            "INSERT INTO config_kv (key, value) VALUES ('workflow/min_description_len', '30')",
            [],
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(raw));

        let config = WorkflowConfig::load(&conn).unwrap();
        assert_eq!(config.weight_epsilon, 0.5);
        assert_eq!(config.min_description_len, 30);
    }

    #[test]
    fn test_negative_weight_epsilon_rejected() {
        let raw = Connection::open_in_memory().unwrap();
        db::init_schema(&raw).unwrap();
        raw.execute(
            "INSERT INTO config_kv (key, value) VALUES ('workflow/weight_epsilon', '-1')",
            [],
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(raw));

        let config = WorkflowConfig::load(&conn).unwrap();
        assert_eq!(config.weight_epsilon, DEFAULT_WEIGHT_EPSILON);
    }

    #[test]
    fn test_bad_value_falls_back_to_default() {
        let raw = Connection::open_in_memory().unwrap();
        db::init_schema(&raw).unwrap();
        raw.execute(
            "INSERT INTO config_kv (key, value) VALUES ('workflow/submit_due_days', 'abc')",
            [],
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(raw));

        let config = WorkflowConfig::load(&conn).unwrap();
        assert_eq!(config.submit_due_days, DEFAULT_SUBMIT_DUE_DAYS);
    }
}
