// ==========================================
// 教学大纲管理系统 - 大纲聚合领域模型
// ==========================================
// 红线: Syllabus 为聚合根，子实体随聚合级联删除
// 红线: PUBLISHED 状态的大纲不可变更，修改须另立新版本
// ==========================================

use crate::domain::types::{MaterialType, PloLevel, SyllabusStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Syllabus - 大纲头（聚合根）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Syllabus {
    pub syllabus_id: String,              // 大纲ID
    pub subject_id: String,               // 课程ID (创建后不可变)
    pub program_id: String,               // 专业ID (创建后不可变)
    pub academic_year_id: String,         // 学年ID (创建后不可变)
    pub lecturer_id: String,              // 讲师ID (创建后不可变)
    pub status: SyllabusStatus,           // 审批状态
    pub version: String,                  // 版本号 (如 "1.0")
    pub description: Option<String>,      // 课程描述
    pub objectives_json: Option<serde_json::Value>, // 课程目标 (JSON)
    pub time_allocation_json: Option<serde_json::Value>, // 学时分配 (JSON)
    pub prerequisites: Option<String>,    // 先修要求
    pub created_at: NaiveDateTime,        // 创建时间
    pub updated_at: NaiveDateTime,        // 更新时间
}

impl Syllabus {
    /// 判断指定用户是否为大纲所有者（讲师本人）
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.lecturer_id == user_id
    }
}

// ==========================================
// Clo - 课程学习成果 (Course Learning Outcome)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clo {
    pub clo_id: String,      // CLO ID
    pub syllabus_id: String, // 所属大纲
    pub clo_code: String,    // 编码 (同一大纲内唯一, 如 "CLO1")
    pub description: Option<String>, // 描述
    pub plo_mappings: Vec<CloPloMapping>, // CLO->PLO 映射
}

// ==========================================
// CloPloMapping - CLO 到专业学习成果的映射
// ==========================================
// 红线: (clo, plo) 组合唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloPloMapping {
    pub mapping_id: String, // 映射ID
    pub clo_id: String,     // CLO ID
    pub plo_id: String,     // 专业 PLO ID
    pub level: PloLevel,    // 覆盖等级 (I/R/M/A)
}

// ==========================================
// Material - 教材/参考资料
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub material_id: String,          // 教材ID
    pub syllabus_id: String,          // 所属大纲
    pub material_type: MaterialType,  // 类型 (MAIN/REFERENCE/...)
    pub title: String,                // 书名/标题
    pub author: Option<String>,       // 作者
    pub publisher: Option<String>,    // 出版社
    pub isbn: Option<String>,         // ISBN
    pub url: Option<String>,          // 链接
}

// ==========================================
// TeachingPlan - 教学周计划
// ==========================================
// 红线: week_no 同一大纲内唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeachingPlan {
    pub plan_id: String,                // 计划ID
    pub syllabus_id: String,            // 所属大纲
    pub week_no: i32,                   // 周次
    pub topic: Option<String>,          // 主题
    pub activity: Option<String>,       // 教学活动
    pub assessment_note: Option<String>, // 考核说明
}

// ==========================================
// AssessmentScheme - 考核方案
// ==========================================
// 红线: 方案下各组件权重之和必须为 100% (提交前校验)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentScheme {
    pub scheme_id: String,       // 方案ID
    pub syllabus_id: String,     // 所属大纲
    pub scheme_name: String,     // 方案名称 (如 "平时+期末")
    pub weight_pct: f64,         // 方案占总评权重 (%)
    pub components: Vec<AssessmentComponent>, // 考核组件
}

// ==========================================
// AssessmentComponent - 考核组件
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentComponent {
    pub component_id: String,     // 组件ID
    pub scheme_id: String,        // 所属方案
    pub component_name: String,   // 组件名称 (如 "期末考试")
    pub weight_pct: f64,          // 组件权重 (%)
    pub criteria: Option<String>, // 评分标准说明
    pub rubrics: Vec<Rubric>,     // 评分细则
    pub clo_ids: Vec<String>,     // 该组件考核的 CLO (多对多)
}

// ==========================================
// Rubric - 评分细则
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rubric {
    pub rubric_id: String,        // 细则ID
    pub component_id: String,     // 所属组件
    pub criteria: String,         // 评分点
    pub max_score: f64,           // 满分
    pub pass_desc: Option<String>, // 及格描述
    pub fail_desc: Option<String>, // 不及格描述
}

// ==========================================
// SyllabusAggregate - 完整聚合视图
// ==========================================
// 用途: get_details 出参、快照载荷、搜索索引扁平化的输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyllabusAggregate {
    pub syllabus: Syllabus,                 // 聚合根
    pub clos: Vec<Clo>,                     // CLO 及其 PLO 映射
    pub materials: Vec<Material>,           // 教材
    pub teaching_plans: Vec<TeachingPlan>,  // 教学周计划
    pub assessment_schemes: Vec<AssessmentScheme>, // 考核方案树
}

impl SyllabusAggregate {
    /// 序列化为快照载荷
    ///
    /// 快照是不透明 JSON，结构化 diff 交由外部 AI 对比服务
    pub fn to_snapshot_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// 扁平化为搜索索引文本
    ///
    /// 拼接描述性字段，供外部搜索服务建立全文索引
    pub fn to_search_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(desc) = &self.syllabus.description {
            parts.push(desc.clone());
        }
        if let Some(prereq) = &self.syllabus.prerequisites {
            parts.push(prereq.clone());
        }
        for clo in &self.clos {
            parts.push(clo.clo_code.clone());
            if let Some(d) = &clo.description {
                parts.push(d.clone());
            }
        }
        for m in &self.materials {
            parts.push(m.title.clone());
        }
        for p in &self.teaching_plans {
            if let Some(t) = &p.topic {
                parts.push(t.clone());
            }
        }
        for s in &self.assessment_schemes {
            parts.push(s.scheme_name.clone());
        }
        parts.join(" ")
    }
}
