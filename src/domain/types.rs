// ==========================================
// 教学大纲管理系统 - 领域类型定义
// ==========================================
// 红线: 状态/角色/等级一律使用封闭枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 大纲状态 (Syllabus Status)
// ==========================================
// 审批流水线: DRAFT -> PENDING_REVIEW -> PENDING_APPROVAL -> APPROVED -> PUBLISHED
// 分支: RETURNED (可恢复) / REJECTED (终态，但允许重新提交)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyllabusStatus {
    Draft,           // 草稿
    PendingReview,   // 待系审
    PendingApproval, // 待校审
    Approved,        // 已批准
    Published,       // 已发布
    Returned,        // 已退回
    Rejected,        // 已驳回
}

impl SyllabusStatus {
    /// 是否为终态（流水线上不再有前进转换）
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyllabusStatus::Published | SyllabusStatus::Rejected)
    }

    /// 是否允许编辑内容（update 入口）
    pub fn is_editable(&self) -> bool {
        matches!(self, SyllabusStatus::Draft | SyllabusStatus::Returned)
    }

    /// 是否允许提交（submit 入口）
    ///
    /// 说明: REJECTED 虽是终态，但允许修订后重新提交进入新一轮审批
    pub fn is_submittable(&self) -> bool {
        matches!(
            self,
            SyllabusStatus::Draft | SyllabusStatus::Returned | SyllabusStatus::Rejected
        )
    }

    /// 是否为对外可见状态（触发快照捕获）
    pub fn is_public(&self) -> bool {
        matches!(self, SyllabusStatus::Approved | SyllabusStatus::Published)
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(SyllabusStatus::Draft),
            "PENDING_REVIEW" => Some(SyllabusStatus::PendingReview),
            "PENDING_APPROVAL" => Some(SyllabusStatus::PendingApproval),
            "APPROVED" => Some(SyllabusStatus::Approved),
            "PUBLISHED" => Some(SyllabusStatus::Published),
            "RETURNED" => Some(SyllabusStatus::Returned),
            "REJECTED" => Some(SyllabusStatus::Rejected),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SyllabusStatus::Draft => "DRAFT",
            SyllabusStatus::PendingReview => "PENDING_REVIEW",
            SyllabusStatus::PendingApproval => "PENDING_APPROVAL",
            SyllabusStatus::Approved => "APPROVED",
            SyllabusStatus::Published => "PUBLISHED",
            SyllabusStatus::Returned => "RETURNED",
            SyllabusStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for SyllabusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 工作流动作 (Workflow Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowAction {
    Submit,  // 提交
    Approve, // 通过
    Return,  // 退回（要求填写意见）
    Reject,  // 驳回（要求填写意见）
}

impl WorkflowAction {
    /// 该动作是否必须附带意见
    pub fn requires_comment(&self) -> bool {
        matches!(self, WorkflowAction::Return | WorkflowAction::Reject)
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "SUBMIT" => Some(WorkflowAction::Submit),
            "APPROVE" => Some(WorkflowAction::Approve),
            "RETURN" => Some(WorkflowAction::Return),
            "REJECT" => Some(WorkflowAction::Reject),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkflowAction::Submit => "SUBMIT",
            WorkflowAction::Approve => "APPROVE",
            WorkflowAction::Return => "RETURN",
            WorkflowAction::Reject => "REJECT",
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 用户角色 (Role)
// ==========================================
// 审批链: Lecturer -> HeadOfDepartment -> AcademicAffairs -> Principal
// Admin 在任意环节均有权限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Lecturer,         // 讲师（大纲所有者）
    HeadOfDepartment, // 系主任
    AcademicAffairs,  // 教务处
    Principal,        // 校长
    Admin,            // 管理员
    Student,          // 学生（只读/订阅通知）
}

impl Role {
    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "LECTURER" => Some(Role::Lecturer),
            "HEAD_OF_DEPARTMENT" => Some(Role::HeadOfDepartment),
            "ACADEMIC_AFFAIRS" => Some(Role::AcademicAffairs),
            "PRINCIPAL" => Some(Role::Principal),
            "ADMIN" => Some(Role::Admin),
            "STUDENT" => Some(Role::Student),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Role::Lecturer => "LECTURER",
            Role::HeadOfDepartment => "HEAD_OF_DEPARTMENT",
            Role::AcademicAffairs => "ACADEMIC_AFFAIRS",
            Role::Principal => "PRINCIPAL",
            Role::Admin => "ADMIN",
            Role::Student => "STUDENT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 操作者 (Actor)
// ==========================================
// 由外部身份服务提供，核心信任其已通过认证
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String, // 用户ID
    pub role: Role,      // 角色
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// 是否为管理员
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ==========================================
// CLO-PLO 映射等级 (IRMA Level)
// ==========================================
// Introduce / Reinforce / Master / Advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PloLevel {
    Introduce, // I - 引入
    Reinforce, // R - 强化
    Master,    // M - 掌握
    Advance,   // A - 进阶
}

impl PloLevel {
    /// 严格解析单字母 IRMA 等级
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "I" => Some(PloLevel::Introduce),
            "R" => Some(PloLevel::Reinforce),
            "M" => Some(PloLevel::Master),
            "A" => Some(PloLevel::Advance),
            _ => None,
        }
    }

    /// 宽容解析：先按 IRMA 直接解析，失败后套用历史 H/M/L 别名表
    ///
    /// 别名表 (继承自上游 AI 输出清洗逻辑): H->M, M->R, L->I
    /// 注意: "M" 会被 IRMA 直接解析命中 (Master)，因此 M->R 这一行
    /// 实际不可达；原样保留别名表并告警，待与运营方确认原始语义。
    pub fn parse_lenient(s: &str) -> Option<Self> {
        let trimmed = s.trim().to_uppercase();
        if let Some(level) = Self::from_db_str(&trimmed) {
            return Some(level);
        }
        let aliased = match trimmed.as_str() {
            "H" => Some(PloLevel::Master),
            "M" => Some(PloLevel::Reinforce),
            "L" => Some(PloLevel::Introduce),
            _ => None,
        };
        if let Some(level) = aliased {
            tracing::warn!("CLO-PLO 等级使用了历史别名: {} -> {}", s, level.to_db_str());
        }
        aliased
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PloLevel::Introduce => "I",
            PloLevel::Reinforce => "R",
            PloLevel::Master => "M",
            PloLevel::Advance => "A",
        }
    }
}

impl fmt::Display for PloLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 教材类型 (Material Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialType {
    Main,      // 主教材
    Reference, // 参考资料
    Online,    // 在线资源
    Other,     // 其他
}

impl MaterialType {
    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "MAIN" => Some(MaterialType::Main),
            "REFERENCE" => Some(MaterialType::Reference),
            "ONLINE" => Some(MaterialType::Online),
            "OTHER" => Some(MaterialType::Other),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MaterialType::Main => "MAIN",
            MaterialType::Reference => "REFERENCE",
            MaterialType::Online => "ONLINE",
            MaterialType::Other => "OTHER",
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            SyllabusStatus::Draft,
            SyllabusStatus::PendingReview,
            SyllabusStatus::PendingApproval,
            SyllabusStatus::Approved,
            SyllabusStatus::Published,
            SyllabusStatus::Returned,
            SyllabusStatus::Rejected,
        ] {
            assert_eq!(SyllabusStatus::from_db_str(status.to_db_str()), Some(status));
        }
        // 大小写不做隐式归一
        assert_eq!(SyllabusStatus::from_db_str("draft"), None);
    }

    #[test]
    fn test_status_predicates() {
        assert!(SyllabusStatus::Published.is_terminal());
        assert!(SyllabusStatus::Rejected.is_terminal());
        assert!(!SyllabusStatus::Returned.is_terminal());

        assert!(SyllabusStatus::Draft.is_submittable());
        assert!(SyllabusStatus::Returned.is_submittable());
        assert!(SyllabusStatus::Rejected.is_submittable());
        assert!(!SyllabusStatus::Published.is_submittable());
        assert!(!SyllabusStatus::PendingReview.is_submittable());
    }

    #[test]
    fn test_plo_level_lenient_parse() {
        // IRMA 直接解析优先
        assert_eq!(PloLevel::parse_lenient("M"), Some(PloLevel::Master));
        assert_eq!(PloLevel::parse_lenient("a"), Some(PloLevel::Advance));
        // 别名表兜底
        assert_eq!(PloLevel::parse_lenient("H"), Some(PloLevel::Master));
        assert_eq!(PloLevel::parse_lenient("L"), Some(PloLevel::Introduce));
        // 无法识别
        assert_eq!(PloLevel::parse_lenient("X"), None);
    }

    #[test]
    fn test_action_comment_requirement() {
        assert!(WorkflowAction::Return.requires_comment());
        assert!(WorkflowAction::Reject.requires_comment());
        assert!(!WorkflowAction::Approve.requires_comment());
        assert!(!WorkflowAction::Submit.requires_comment());
    }
}
