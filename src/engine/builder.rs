// ==========================================
// 教学大纲管理系统 - 聚合构建器
// ==========================================
// 职责: 大纲聚合的创建与部分更新（单事务落盘全部嵌套结构）
// 红线: 任一子实体写入失败即整体回滚，不留半成品聚合
// 红线: 权重校验先于任何删除动作执行
// 红线: CLO 调和按 clo_id 原位匹配，保留考核组件对 CLO 的既有链接
// ==========================================

use crate::domain::syllabus::{
    AssessmentComponent, AssessmentScheme, Clo, CloPloMapping, Material, Rubric, Syllabus,
    SyllabusAggregate, TeachingPlan,
};
use crate::domain::types::{Actor, PloLevel, SyllabusStatus};
use crate::engine::config::WorkflowConfig;
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::payload::{
    CloPayload, CloRef, CreateSyllabusPayload, MaterialPayload, SchemePayload,
    TeachingPlanPayload, UpdateSyllabusPayload,
};
use crate::repository::error::RepositoryError;
use crate::repository::{
    fetch_aggregate, AssessmentRepository, CloRepository, MaterialRepository,
    ReferenceRepository, SyllabusRepository, TeachingPlanRepository,
};
use chrono::Local;
use rusqlite::{Connection, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ==========================================
// AggregateBuilder - 聚合构建器
// ==========================================
pub struct AggregateBuilder {
    conn: Arc<Mutex<Connection>>,
    config: WorkflowConfig,
}

impl AggregateBuilder {
    /// 创建聚合构建器
    pub fn new(conn: Arc<Mutex<Connection>>, config: WorkflowConfig) -> Self {
        Self { conn, config }
    }

    /// 创建大纲草稿（含全部嵌套子实体）
    ///
    /// 前置检查:
    /// 1. 课程/专业/学年/讲师四个外键均存在
    /// 2. 同 (课程, 专业, 学年) 组合下不存在其他 DRAFT 大纲
    ///
    /// 说明: 草稿允许内容不完整，完整性校验延迟到提交时
    pub fn create(&self, payload: &CreateSyllabusPayload) -> WorkflowResult<SyllabusAggregate> {
        let now = Local::now().naive_local();
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        if !ReferenceRepository::subject_exists_tx(&tx, &payload.subject_id)? {
            return Err(WorkflowError::not_found("Subject", &payload.subject_id));
        }
        if !ReferenceRepository::program_exists_tx(&tx, &payload.program_id)? {
            return Err(WorkflowError::not_found("Program", &payload.program_id));
        }
        if !ReferenceRepository::academic_year_exists_tx(&tx, &payload.academic_year_id)? {
            return Err(WorkflowError::not_found(
                "AcademicYear",
                &payload.academic_year_id,
            ));
        }
        if !ReferenceRepository::user_exists_tx(&tx, &payload.lecturer_id)? {
            return Err(WorkflowError::not_found("User", &payload.lecturer_id));
        }

        if let Some(existing_id) = SyllabusRepository::find_duplicate_tx(
            &tx,
            &payload.subject_id,
            &payload.program_id,
            &payload.academic_year_id,
            SyllabusStatus::Draft,
        )? {
            return Err(WorkflowError::Conflict(format!(
                "同课程/专业/学年下已存在 DRAFT 状态的大纲: {}",
                existing_id
            )));
        }

        let syllabus = Syllabus {
            syllabus_id: new_id(),
            subject_id: payload.subject_id.clone(),
            program_id: payload.program_id.clone(),
            academic_year_id: payload.academic_year_id.clone(),
            lecturer_id: payload.lecturer_id.clone(),
            status: SyllabusStatus::Draft,
            version: payload.version.clone().unwrap_or_else(|| "1.0".to_string()),
            description: payload.description.clone(),
            objectives_json: payload.objectives_json.clone(),
            time_allocation_json: payload.time_allocation_json.clone(),
            prerequisites: payload.prerequisites.clone(),
            created_at: now,
            updated_at: now,
        };
        let syllabus_id = SyllabusRepository::insert_tx(&tx, &syllabus)?;

        let mut code_to_id: HashMap<String, String> = HashMap::new();
        for clo_payload in &payload.clos {
            let clo_id = Self::insert_clo(&tx, &syllabus_id, &payload.program_id, clo_payload)?;
            code_to_id.insert(clo_payload.clo_code.clone(), clo_id);
        }
        Self::insert_materials(&tx, &syllabus_id, &payload.materials)?;
        Self::insert_teaching_plans(&tx, &syllabus_id, &payload.teaching_plans)?;
        Self::insert_schemes(&tx, &syllabus_id, &payload.assessment_schemes, &code_to_id)?;

        tx.commit().map_err(RepositoryError::from)?;

        tracing::info!(
            "大纲创建成功: syllabus_id={}, subject={}, lecturer={}",
            syllabus_id,
            payload.subject_id,
            payload.lecturer_id
        );
        let aggregate = fetch_aggregate(&guard, &syllabus_id)?
            .ok_or_else(|| WorkflowError::not_found("Syllabus", &syllabus_id))?;
        Ok(aggregate)
    }

    /// 部分更新大纲内容
    ///
    /// 前置检查（按序）:
    /// 1. 大纲存在
    /// 2. 状态允许编辑 (DRAFT/RETURNED)；PUBLISHED 永久不可改，须另立新版本
    /// 3. 操作者为所有者讲师或 ADMIN
    /// 4. 载荷携带考核方案时先过权重校验，再执行任何删除
    ///
    /// 子实体策略:
    /// - CLO: 按 clo_id 差量调和，原位更新保留组件链接；落选者删除；新条目插入
    /// - 教材/周计划/考核方案: 整体删除后按载荷重建
    pub fn update(
        &self,
        syllabus_id: &str,
        actor: &Actor,
        payload: &UpdateSyllabusPayload,
    ) -> WorkflowResult<SyllabusAggregate> {
        let now = Local::now().naive_local();
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        let mut syllabus = SyllabusRepository::find_by_id_tx(&tx, syllabus_id)?
            .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))?;

        if !syllabus.status.is_editable() {
            return Err(WorkflowError::invalid_state(syllabus.status, "UPDATE"));
        }
        if !syllabus.is_owned_by(&actor.user_id) && !actor.is_admin() {
            return Err(WorkflowError::Ownership(format!(
                "大纲 {} 属于讲师 {}，用户 {} 无权修改",
                syllabus_id, syllabus.lecturer_id, actor.user_id
            )));
        }

        // 权重校验先行: 坏载荷不得触发任何删除
        if let Some(schemes) = &payload.assessment_schemes {
            Self::validate_payload_weights(schemes, self.config.weight_epsilon)?;
        }

        if let Some(v) = &payload.version {
            syllabus.version = v.clone();
        }
        if let Some(d) = &payload.description {
            syllabus.description = Some(d.clone());
        }
        if let Some(o) = &payload.objectives_json {
            syllabus.objectives_json = Some(o.clone());
        }
        if let Some(t) = &payload.time_allocation_json {
            syllabus.time_allocation_json = Some(t.clone());
        }
        if let Some(p) = &payload.prerequisites {
            syllabus.prerequisites = Some(p.clone());
        }
        syllabus.updated_at = now;
        SyllabusRepository::update_content_tx(&tx, &syllabus)?;

        if let Some(clos) = &payload.clos {
            Self::reconcile_clos(&tx, syllabus_id, &syllabus.program_id, clos)?;
        }
        if let Some(materials) = &payload.materials {
            MaterialRepository::delete_by_syllabus_tx(&tx, syllabus_id)?;
            Self::insert_materials(&tx, syllabus_id, materials)?;
        }
        if let Some(plans) = &payload.teaching_plans {
            TeachingPlanRepository::delete_by_syllabus_tx(&tx, syllabus_id)?;
            Self::insert_teaching_plans(&tx, syllabus_id, plans)?;
        }
        if let Some(schemes) = &payload.assessment_schemes {
            AssessmentRepository::delete_by_syllabus_tx(&tx, syllabus_id)?;
            // CLO 引用按调和后的现存集合解析
            let code_to_id: HashMap<String, String> = CloRepository::list_ids_tx(&tx, syllabus_id)?
                .into_iter()
                .map(|(id, code)| (code, id))
                .collect();
            Self::insert_schemes(&tx, syllabus_id, schemes, &code_to_id)?;
        }

        tx.commit().map_err(RepositoryError::from)?;

        tracing::info!(
            "大纲更新成功: syllabus_id={}, actor={}",
            syllabus_id,
            actor.user_id
        );
        let aggregate = fetch_aggregate(&guard, syllabus_id)?
            .ok_or_else(|| WorkflowError::not_found("Syllabus", syllabus_id))?;
        Ok(aggregate)
    }

    // ==========================================
    // 内部写入步骤
    // ==========================================

    /// 校验载荷中各方案的组件权重之和
    fn validate_payload_weights(schemes: &[SchemePayload], epsilon: f64) -> WorkflowResult<()> {
        for scheme in schemes {
            let total = scheme.component_weight_total();
            if (total - 100.0).abs() > epsilon {
                return Err(WorkflowError::Validation(format!(
                    "考核方案「{}」组件权重合计为 {:.1}%，应为 100%",
                    scheme.scheme_name, total
                )));
            }
        }
        Ok(())
    }

    /// 插入一条 CLO 及其全部 PLO 映射，返回新 clo_id
    fn insert_clo(
        conn: &Connection,
        syllabus_id: &str,
        program_id: &str,
        payload: &CloPayload,
    ) -> WorkflowResult<String> {
        let clo = Clo {
            clo_id: new_id(),
            syllabus_id: syllabus_id.to_string(),
            clo_code: payload.clo_code.clone(),
            description: payload.description.clone(),
            plo_mappings: Vec::new(),
        };
        CloRepository::insert_tx(conn, &clo)?;
        Self::insert_plo_mappings(conn, program_id, &clo.clo_id, payload)?;
        Ok(clo.clo_id)
    }

    /// 写入 CLO 的 PLO 映射（显式列表与历史编码映射两条路径）
    fn insert_plo_mappings(
        conn: &Connection,
        program_id: &str,
        clo_id: &str,
        payload: &CloPayload,
    ) -> WorkflowResult<()> {
        for mapping in &payload.plo_mappings {
            if !ReferenceRepository::plo_exists_tx(conn, &mapping.plo_id)? {
                return Err(WorkflowError::not_found("ProgramPlo", &mapping.plo_id));
            }
            CloRepository::insert_mapping_tx(
                conn,
                &CloPloMapping {
                    mapping_id: new_id(),
                    clo_id: clo_id.to_string(),
                    plo_id: mapping.plo_id.clone(),
                    level: mapping.level,
                },
            )?;
        }
        for (plo_code, level_str) in &payload.legacy_plo_levels {
            let level = PloLevel::parse_lenient(level_str).ok_or_else(|| {
                WorkflowError::Validation(format!(
                    "CLO {} 对 PLO {} 的映射等级无法识别: {}",
                    payload.clo_code, plo_code, level_str
                ))
            })?;
            let plo_id = ReferenceRepository::find_plo_id_by_code_tx(conn, program_id, plo_code)?
                .ok_or_else(|| WorkflowError::not_found("ProgramPlo", plo_code))?;
            CloRepository::insert_mapping_tx(
                conn,
                &CloPloMapping {
                    mapping_id: new_id(),
                    clo_id: clo_id.to_string(),
                    plo_id,
                    level,
                },
            )?;
        }
        Ok(())
    }

    /// CLO 差量调和
    ///
    /// - 载荷携带已存在的 clo_id: 原位更新基本字段并重建映射（clo_id 不变）
    /// - 载荷未携带 clo_id: 按新条目插入
    /// - 现存但载荷中落选的 CLO: 删除（级联清理其映射与组件链接）
    fn reconcile_clos(
        conn: &Connection,
        syllabus_id: &str,
        program_id: &str,
        payloads: &[CloPayload],
    ) -> WorkflowResult<()> {
        let existing_ids: HashSet<String> = CloRepository::list_ids_tx(conn, syllabus_id)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let mut retained: HashSet<String> = HashSet::new();

        for payload in payloads {
            match &payload.clo_id {
                Some(clo_id) if existing_ids.contains(clo_id) => {
                    CloRepository::update_tx(
                        conn,
                        clo_id,
                        &payload.clo_code,
                        payload.description.as_deref(),
                    )?;
                    CloRepository::delete_mappings_tx(conn, clo_id)?;
                    Self::insert_plo_mappings(conn, program_id, clo_id, payload)?;
                    retained.insert(clo_id.clone());
                }
                Some(clo_id) => {
                    return Err(WorkflowError::Validation(format!(
                        "载荷引用了不属于该大纲的 clo_id: {}",
                        clo_id
                    )));
                }
                None => {
                    Self::insert_clo(conn, syllabus_id, program_id, payload)?;
                }
            }
        }

        for clo_id in existing_ids.difference(&retained) {
            CloRepository::delete_tx(conn, clo_id)?;
        }
        Ok(())
    }

    /// 插入全部教材
    fn insert_materials(
        conn: &Connection,
        syllabus_id: &str,
        payloads: &[MaterialPayload],
    ) -> WorkflowResult<()> {
        for p in payloads {
            MaterialRepository::insert_tx(
                conn,
                &Material {
                    material_id: new_id(),
                    syllabus_id: syllabus_id.to_string(),
                    material_type: p.material_type,
                    title: p.title.clone(),
                    author: p.author.clone(),
                    publisher: p.publisher.clone(),
                    isbn: p.isbn.clone(),
                    url: p.url.clone(),
                },
            )?;
        }
        Ok(())
    }

    /// 插入全部教学周计划（week_no 唯一性由表约束兜底）
    fn insert_teaching_plans(
        conn: &Connection,
        syllabus_id: &str,
        payloads: &[TeachingPlanPayload],
    ) -> WorkflowResult<()> {
        for p in payloads {
            TeachingPlanRepository::insert_tx(
                conn,
                &TeachingPlan {
                    plan_id: new_id(),
                    syllabus_id: syllabus_id.to_string(),
                    week_no: p.week_no,
                    topic: p.topic.clone(),
                    activity: p.activity.clone(),
                    assessment_note: p.assessment_note.clone(),
                },
            )?;
        }
        Ok(())
    }

    /// 插入考核方案树（方案 -> 组件 -> 细则 / CLO 链接）
    fn insert_schemes(
        conn: &Connection,
        syllabus_id: &str,
        payloads: &[SchemePayload],
        code_to_id: &HashMap<String, String>,
    ) -> WorkflowResult<()> {
        let known_ids: HashSet<&String> = code_to_id.values().collect();
        for scheme_payload in payloads {
            let scheme = AssessmentScheme {
                scheme_id: new_id(),
                syllabus_id: syllabus_id.to_string(),
                scheme_name: scheme_payload.scheme_name.clone(),
                weight_pct: scheme_payload.weight_pct,
                components: Vec::new(),
            };
            AssessmentRepository::insert_scheme_tx(conn, &scheme)?;

            for component_payload in &scheme_payload.components {
                let component = AssessmentComponent {
                    component_id: new_id(),
                    scheme_id: scheme.scheme_id.clone(),
                    component_name: component_payload.component_name.clone(),
                    weight_pct: component_payload.weight_pct,
                    criteria: component_payload.criteria.clone(),
                    rubrics: Vec::new(),
                    clo_ids: Vec::new(),
                };
                AssessmentRepository::insert_component_tx(conn, &component)?;

                for rubric_payload in &component_payload.rubrics {
                    AssessmentRepository::insert_rubric_tx(
                        conn,
                        &Rubric {
                            rubric_id: new_id(),
                            component_id: component.component_id.clone(),
                            criteria: rubric_payload.criteria.clone(),
                            max_score: rubric_payload.max_score,
                            pass_desc: rubric_payload.pass_desc.clone(),
                            fail_desc: rubric_payload.fail_desc.clone(),
                        },
                    )?;
                }

                let clo_ids = Self::resolve_clo_refs(
                    &component_payload.clo_refs,
                    code_to_id,
                    &known_ids,
                )?;
                for clo_id in clo_ids {
                    AssessmentRepository::insert_clo_link_tx(
                        conn,
                        &component.component_id,
                        &clo_id,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// 解析组件的 CLO 引用（ID 直引或逗号分隔编码），去重保序
    fn resolve_clo_refs(
        refs: &[CloRef],
        code_to_id: &HashMap<String, String>,
        known_ids: &HashSet<&String>,
    ) -> WorkflowResult<Vec<String>> {
        let mut resolved: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for clo_ref in refs {
            match clo_ref {
                CloRef::Id(id) => {
                    if !known_ids.contains(id) {
                        return Err(WorkflowError::Validation(format!(
                            "组件引用了不属于该大纲的 clo_id: {}",
                            id
                        )));
                    }
                    if seen.insert(id.clone()) {
                        resolved.push(id.clone());
                    }
                }
                CloRef::Codes(codes) => {
                    for code in codes.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                        let id = code_to_id.get(code).ok_or_else(|| {
                            WorkflowError::Validation(format!(
                                "组件引用了不存在的 CLO 编码: {}",
                                code
                            ))
                        })?;
                        if seen.insert(id.clone()) {
                            resolved.push(id.clone());
                        }
                    }
                }
            }
        }
        Ok(resolved)
    }
}
