// ==========================================
// 审批前置条件测试
// ==========================================
// 职责: 验证状态门禁、角色权限、所有权与意见必填约束
// ==========================================


#[cfg(test)]
mod workflow_guard_test {
    use syllabus_workflow::api::SyllabusApi;
    use syllabus_workflow::domain::types::{Actor, Role, SyllabusStatus};
    use syllabus_workflow::engine::error::WorkflowError;

    use crate::test_helpers::{
        academic_affairs, complete_draft_payload, create_test_db, head_of_department, lecturer,
        open_shared_conn,
    };

    fn setup_pending_review() -> (tempfile::NamedTempFile, SyllabusApi, String) {
        let (temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let api = SyllabusApi::new(conn);
        let created = api.create_syllabus(&complete_draft_payload()).unwrap();
        let syllabus_id = created.syllabus.syllabus_id.clone();
        api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();
        (temp_file, api, syllabus_id)
    }

    #[test]
    fn test_submit_from_pending_state_is_invalid() {
        let (_temp_file, api, syllabus_id) = setup_pending_review();
        let err = api.submit_syllabus(&syllabus_id, &lecturer()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    #[test]
    fn test_submit_by_non_owner_is_ownership_error() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let api = SyllabusApi::new(conn);
        let created = api.create_syllabus(&complete_draft_payload()).unwrap();

        let other_lecturer = Actor::new("U-LEC2", Role::Lecturer);
        let err = api
            .submit_syllabus(&created.syllabus.syllabus_id, &other_lecturer)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Ownership(_)));
    }

    #[test]
    fn test_submit_incomplete_content_is_validation_error() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let api = SyllabusApi::new(conn);

        let mut payload = complete_draft_payload();
        payload.description = Some("太短".to_string());
        payload.teaching_plans.truncate(2);
        let created = api.create_syllabus(&payload).unwrap();

        let err = api
            .submit_syllabus(&created.syllabus.syllabus_id, &lecturer())
            .unwrap_err();
        match err {
            WorkflowError::Validation(msg) => {
                // 违规项聚合到同一条消息
                assert!(msg.contains("课程描述过短"));
                assert!(msg.contains("教学周计划不足"));
            }
            other => panic!("应为 Validation 错误, 实际: {:?}", other),
        }
        // 校验失败不改变状态、不留日志
        assert_eq!(
            api.get_details(&created.syllabus.syllabus_id)
                .unwrap()
                .syllabus
                .status,
            SyllabusStatus::Draft
        );
        assert!(api
            .get_workflow_history(&created.syllabus.syllabus_id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_lecturer_cannot_approve() {
        let (_temp_file, api, syllabus_id) = setup_pending_review();
        let err = api
            .evaluate_syllabus(&syllabus_id, &lecturer(), "APPROVE", None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Permission(_)));
    }

    #[test]
    fn test_wrong_step_role_cannot_approve() {
        let (_temp_file, api, syllabus_id) = setup_pending_review();
        // 待系审环节教务处无权处理
        let err = api
            .evaluate_syllabus(&syllabus_id, &academic_affairs(), "APPROVE", None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Permission(_)));
    }

    #[test]
    fn test_return_without_comment_is_rejected() {
        let (_temp_file, api, syllabus_id) = setup_pending_review();
        for comment in [None, Some("   ")] {
            let err = api
                .evaluate_syllabus(&syllabus_id, &head_of_department(), "RETURN", comment)
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(_)));
        }
        // 门禁失败不落任何转换
        assert_eq!(
            api.get_details(&syllabus_id).unwrap().syllabus.status,
            SyllabusStatus::PendingReview
        );
    }

    #[test]
    fn test_unknown_action_is_invalid_action() {
        let (_temp_file, api, syllabus_id) = setup_pending_review();
        for action in ["PUBLISH", "approve", ""] {
            let err = api
                .evaluate_syllabus(&syllabus_id, &head_of_department(), action, None)
                .unwrap_err();
            assert!(matches!(err, WorkflowError::InvalidAction(_)));
        }
    }

    #[test]
    fn test_evaluate_draft_is_invalid_state() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let api = SyllabusApi::new(conn);
        let created = api.create_syllabus(&complete_draft_payload()).unwrap();

        let err = api
            .evaluate_syllabus(
                &created.syllabus.syllabus_id,
                &head_of_department(),
                "APPROVE",
                None,
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    #[test]
    fn test_update_pending_syllabus_is_invalid_state() {
        let (_temp_file, api, syllabus_id) = setup_pending_review();
        let payload = syllabus_workflow::engine::payload::UpdateSyllabusPayload {
            description: Some("审批中修改".to_string()),
            ..Default::default()
        };
        let err = api
            .update_syllabus(&syllabus_id, &lecturer(), &payload)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    #[test]
    fn test_delete_pending_syllabus_is_invalid_state() {
        let (_temp_file, api, syllabus_id) = setup_pending_review();
        let err = api.delete_syllabus(&syllabus_id, &lecturer()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }
}
