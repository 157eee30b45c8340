// ==========================================
// 教学大纲管理系统 - 内容校验规则
// ==========================================
// 职责: 提交前的内容完整性与权重校验（纯函数）
// 红线: 校验必须发生在任何破坏性写入之前，失败不得留下半替换状态
// 红线: 完整性校验收集全部违规项后一次性返回，不短路
// ==========================================

use crate::domain::syllabus::{AssessmentScheme, SyllabusAggregate};
use crate::domain::types::MaterialType;
use crate::engine::config::WorkflowConfig;
use crate::engine::error::{WorkflowError, WorkflowResult};

/// 校验各考核方案的组件权重之和为 100%（± 容差）
///
/// # 错误
/// - 返回首个违规方案的名称与实际合计
pub fn validate_assessment_weights(
    schemes: &[AssessmentScheme],
    epsilon: f64,
) -> WorkflowResult<()> {
    for scheme in schemes {
        let total: f64 = scheme.components.iter().map(|c| c.weight_pct).sum();
        if (total - 100.0).abs() > epsilon {
            return Err(WorkflowError::Validation(format!(
                "考核方案「{}」组件权重合计为 {:.1}%，应为 100%",
                scheme.scheme_name, total
            )));
        }
    }
    Ok(())
}

/// 收集各考核方案的权重违规项（不短路版本，供完整性校验复用）
fn collect_weight_violations(
    schemes: &[AssessmentScheme],
    epsilon: f64,
    violations: &mut Vec<String>,
) {
    for scheme in schemes {
        let total: f64 = scheme.components.iter().map(|c| c.weight_pct).sum();
        if (total - 100.0).abs() > epsilon {
            violations.push(format!(
                "考核方案「{}」组件权重合计为 {:.1}%，应为 100%",
                scheme.scheme_name, total
            ));
        }
    }
}

/// 提交就绪性校验
///
/// 检查项（全部执行，汇总返回）:
/// 1. 课程描述不少于配置的最短字数
/// 2. 至少一条 CLO
/// 3. 教学周计划不少于配置的最少条数
/// 4. 至少一本主教材 (MAIN)
/// 5. 至少一个考核方案
/// 6. 每个方案的组件权重合计 100%
///
/// # 错误
/// - WorkflowError::Validation: 所有违规项拼接为一条可读消息
pub fn validate_submission_readiness(
    aggregate: &SyllabusAggregate,
    config: &WorkflowConfig,
) -> WorkflowResult<()> {
    let mut violations: Vec<String> = Vec::new();

    let desc_len = aggregate
        .syllabus
        .description
        .as_deref()
        .map(|d| d.chars().count())
        .unwrap_or(0);
    if desc_len < config.min_description_len {
        violations.push(format!(
            "课程描述过短: 当前 {} 字，至少需要 {} 字",
            desc_len, config.min_description_len
        ));
    }

    if aggregate.clos.is_empty() {
        violations.push("至少需要一条课程学习成果 (CLO)".to_string());
    }

    if aggregate.teaching_plans.len() < config.min_teaching_plans {
        violations.push(format!(
            "教学周计划不足: 当前 {} 条，至少需要 {} 条",
            aggregate.teaching_plans.len(),
            config.min_teaching_plans
        ));
    }

    let has_main_material = aggregate
        .materials
        .iter()
        .any(|m| m.material_type == MaterialType::Main);
    if !has_main_material {
        violations.push("至少需要一本主教材 (MAIN)".to_string());
    }

    if aggregate.assessment_schemes.is_empty() {
        violations.push("至少需要一个考核方案".to_string());
    }

    collect_weight_violations(
        &aggregate.assessment_schemes,
        config.weight_epsilon,
        &mut violations,
    );

    if violations.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Validation(violations.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::syllabus::{
        AssessmentComponent, AssessmentScheme, Clo, Material, Syllabus, TeachingPlan,
    };
    use crate::domain::types::SyllabusStatus;
    use chrono::NaiveDate;

    fn base_time() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn scheme_with_weights(name: &str, weights: &[f64]) -> AssessmentScheme {
        AssessmentScheme {
            scheme_id: format!("S-{}", name),
            syllabus_id: "SYL1".to_string(),
            scheme_name: name.to_string(),
            weight_pct: 100.0,
            components: weights
                .iter()
                .enumerate()
                .map(|(i, w)| AssessmentComponent {
                    component_id: format!("C-{}-{}", name, i),
                    scheme_id: format!("S-{}", name),
                    component_name: format!("组件{}", i),
                    weight_pct: *w,
                    criteria: None,
                    rubrics: Vec::new(),
                    clo_ids: Vec::new(),
                })
                .collect(),
        }
    }

    fn complete_aggregate() -> SyllabusAggregate {
        SyllabusAggregate {
            syllabus: Syllabus {
                syllabus_id: "SYL1".to_string(),
                subject_id: "SUB1".to_string(),
                program_id: "PRG1".to_string(),
                academic_year_id: "AY1".to_string(),
                lecturer_id: "U1".to_string(),
                status: SyllabusStatus::Draft,
                version: "1.0".to_string(),
                description: Some(
                    "本课程系统讲授数据库系统的基本原理与应用技术，内容覆盖关系数据模型、\
                     SQL 语言、数据库设计方法、事务管理与并发控制、恢复技术以及数据库安全。"
                        .to_string(),
                ),
                objectives_json: None,
                time_allocation_json: None,
                prerequisites: None,
                created_at: base_time(),
                updated_at: base_time(),
            },
            clos: vec![Clo {
                clo_id: "CLO-1".to_string(),
                syllabus_id: "SYL1".to_string(),
                clo_code: "CLO1".to_string(),
                description: None,
                plo_mappings: Vec::new(),
            }],
            materials: vec![Material {
                material_id: "M-1".to_string(),
                syllabus_id: "SYL1".to_string(),
                material_type: MaterialType::Main,
                title: "数据库系统概论".to_string(),
                author: None,
                publisher: None,
                isbn: None,
                url: None,
            }],
            teaching_plans: (1..=5)
                .map(|week| TeachingPlan {
                    plan_id: format!("TP-{}", week),
                    syllabus_id: "SYL1".to_string(),
                    week_no: week,
                    topic: Some(format!("第{}周", week)),
                    activity: None,
                    assessment_note: None,
                })
                .collect(),
            assessment_schemes: vec![scheme_with_weights("总评", &[60.0, 40.0])],
        }
    }

    #[test]
    fn test_weights_exactly_100_pass() {
        let schemes = vec![scheme_with_weights("A", &[60.0, 40.0])];
        assert!(validate_assessment_weights(&schemes, 0.1).is_ok());
    }

    #[test]
    fn test_weights_within_epsilon_pass() {
        let schemes = vec![scheme_with_weights("A", &[33.33, 33.33, 33.34])];
        assert!(validate_assessment_weights(&schemes, 0.1).is_ok());
    }

    #[test]
    fn test_weights_99_and_101_fail() {
        for weights in [&[60.0, 39.0][..], &[60.0, 41.0][..]] {
            let schemes = vec![scheme_with_weights("期末", weights)];
            let err = validate_assessment_weights(&schemes, 0.1).unwrap_err();
            match err {
                WorkflowError::Validation(msg) => {
                    assert!(msg.contains("期末"), "错误信息应包含方案名: {}", msg);
                }
                other => panic!("应为 Validation 错误, 实际: {:?}", other),
            }
        }
    }

    #[test]
    fn test_complete_aggregate_passes() {
        let aggregate = complete_aggregate();
        let config = WorkflowConfig::default();
        assert!(validate_submission_readiness(&aggregate, &config).is_ok());
    }

    #[test]
    fn test_readiness_collects_all_violations() {
        let mut aggregate = complete_aggregate();
        aggregate.syllabus.description = Some("太短".to_string());
        aggregate.clos.clear();
        aggregate.materials.clear();
        aggregate.teaching_plans.truncate(2);
        aggregate.assessment_schemes = vec![scheme_with_weights("总评", &[50.0, 40.0])];

        let config = WorkflowConfig::default();
        let err = validate_submission_readiness(&aggregate, &config).unwrap_err();
        match err {
            WorkflowError::Validation(msg) => {
                // 不短路: 五类违规全部出现在同一条消息中
                assert!(msg.contains("课程描述过短"));
                assert!(msg.contains("CLO"));
                assert!(msg.contains("教学周计划不足"));
                assert!(msg.contains("主教材"));
                assert!(msg.contains("权重合计"));
            }
            other => panic!("应为 Validation 错误, 实际: {:?}", other),
        }
    }

    #[test]
    fn test_empty_scheme_list_is_violation() {
        let mut aggregate = complete_aggregate();
        aggregate.assessment_schemes.clear();
        let config = WorkflowConfig::default();
        let err = validate_submission_readiness(&aggregate, &config).unwrap_err();
        match err {
            WorkflowError::Validation(msg) => assert!(msg.contains("考核方案")),
            other => panic!("应为 Validation 错误, 实际: {:?}", other),
        }
    }
}
