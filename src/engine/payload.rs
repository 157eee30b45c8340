// ==========================================
// 教学大纲管理系统 - 聚合构建载荷
// ==========================================
// 职责: 定义 create/update 的类型化入参
// 红线: 部分更新使用显式可选字段，不做运行时反射式赋值
// ==========================================

use crate::domain::types::{MaterialType, PloLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// 创建载荷
// ==========================================

/// 创建大纲的完整载荷（单请求承载全部嵌套结构）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSyllabusPayload {
    pub subject_id: String,          // 课程ID
    pub program_id: String,          // 专业ID
    pub academic_year_id: String,    // 学年ID
    pub lecturer_id: String,         // 讲师ID
    pub version: Option<String>,     // 版本号 (默认 "1.0")
    pub description: Option<String>, // 课程描述
    pub objectives_json: Option<serde_json::Value>, // 课程目标
    pub time_allocation_json: Option<serde_json::Value>, // 学时分配
    pub prerequisites: Option<String>, // 先修要求
    #[serde(default)]
    pub clos: Vec<CloPayload>,       // CLO 列表
    #[serde(default)]
    pub materials: Vec<MaterialPayload>, // 教材列表
    #[serde(default)]
    pub teaching_plans: Vec<TeachingPlanPayload>, // 周计划列表
    #[serde(default)]
    pub assessment_schemes: Vec<SchemePayload>, // 考核方案树
}

// ==========================================
// 部分更新载荷
// ==========================================

/// 更新大纲的载荷
///
/// 字段语义: None = 不变更该部分; Some = 以载荷为准整体替换（CLO 走差量调和）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSyllabusPayload {
    pub version: Option<String>,
    pub description: Option<String>,
    pub objectives_json: Option<serde_json::Value>,
    pub time_allocation_json: Option<serde_json::Value>,
    pub prerequisites: Option<String>,
    pub clos: Option<Vec<CloPayload>>,
    pub materials: Option<Vec<MaterialPayload>>,
    pub teaching_plans: Option<Vec<TeachingPlanPayload>>,
    pub assessment_schemes: Option<Vec<SchemePayload>>,
}

// ==========================================
// 子实体载荷
// ==========================================

/// CLO 载荷
///
/// PLO 映射两种来源二选一:
/// - plo_mappings: 显式 {plo_id, level} 列表（推荐）
/// - legacy_plo_levels: 历史 {plo_code: level} 映射（level 可能携带 H/M/L 别名）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloPayload {
    pub clo_id: Option<String>, // update 时携带，用于原位匹配保留依赖链接
    pub clo_code: String,       // 编码 (大纲内唯一)
    pub description: Option<String>,
    #[serde(default)]
    pub plo_mappings: Vec<PloMappingPayload>,
    #[serde(default)]
    pub legacy_plo_levels: BTreeMap<String, String>,
}

/// 显式 PLO 映射载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PloMappingPayload {
    pub plo_id: String,  // 专业 PLO ID
    pub level: PloLevel, // 覆盖等级
}

/// 教材载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialPayload {
    pub material_type: MaterialType,
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
    pub url: Option<String>,
}

/// 教学周计划载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeachingPlanPayload {
    pub week_no: i32,
    pub topic: Option<String>,
    pub activity: Option<String>,
    pub assessment_note: Option<String>,
}

/// 考核方案载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemePayload {
    pub scheme_name: String,
    pub weight_pct: f64,
    #[serde(default)]
    pub components: Vec<ComponentPayload>,
}

/// 考核组件载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentPayload {
    pub component_name: String,
    pub weight_pct: f64,
    pub criteria: Option<String>,
    #[serde(default)]
    pub rubrics: Vec<RubricPayload>,
    #[serde(default)]
    pub clo_refs: Vec<CloRef>, // 该组件考核的 CLO 引用
}

/// 组件对 CLO 的引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CloRef {
    /// 按 CLO ID 引用
    Id(String),
    /// 按逗号分隔编码引用 (如 "CLO1,CLO3")
    Codes(String),
}

/// 评分细则载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricPayload {
    pub criteria: String,
    pub max_score: f64,
    pub pass_desc: Option<String>,
    pub fail_desc: Option<String>,
}

impl SchemePayload {
    /// 组件权重合计
    pub fn component_weight_total(&self) -> f64 {
        self.components.iter().map(|c| c.weight_pct).sum()
    }
}
