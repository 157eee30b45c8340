// ==========================================
// 审批流水线端到端测试
// ==========================================
// 职责: 验证 DRAFT -> PENDING_REVIEW -> PENDING_APPROVAL -> APPROVED -> PUBLISHED 全链路
// ==========================================


#[cfg(test)]
mod workflow_e2e_test {
    use syllabus_workflow::api::SyllabusApi;
    use syllabus_workflow::domain::types::{Role, SyllabusStatus, WorkflowAction};
    use syllabus_workflow::engine::events::Recipient;

    use crate::test_helpers::{
        academic_affairs, complete_draft_payload, create_test_db, head_of_department, lecturer,
        open_shared_conn, principal, RecordingSink,
    };

    #[test]
    fn test_full_approval_pipeline_to_published() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let api = SyllabusApi::new(conn);

        // 创建草稿
        let created = api.create_syllabus(&complete_draft_payload()).unwrap();
        let syllabus_id = created.syllabus.syllabus_id.clone();
        assert_eq!(created.syllabus.status, SyllabusStatus::Draft);
        assert!(api.get_current_workflow(&syllabus_id).unwrap().is_none());

        // 讲师提交
        let outcome = api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();
        assert_eq!(outcome.from_status, SyllabusStatus::Draft);
        assert_eq!(outcome.to_status, SyllabusStatus::PendingReview);
        assert!(outcome.snapshot_id.is_none());
        let in_flight = api.get_current_workflow(&syllabus_id).unwrap().unwrap();
        assert_eq!(in_flight.status, SyllabusStatus::PendingReview);

        // 系主任通过 -> 待校审
        let outcome = api
            .evaluate_syllabus(&syllabus_id, &head_of_department(), "APPROVE", None)
            .unwrap();
        assert_eq!(outcome.to_status, SyllabusStatus::PendingApproval);
        assert!(outcome.snapshot_id.is_none());

        // 教务处通过 -> 已批准（首次到达公开状态，捕获快照）
        let outcome = api
            .evaluate_syllabus(&syllabus_id, &academic_affairs(), "APPROVE", None)
            .unwrap();
        assert_eq!(outcome.to_status, SyllabusStatus::Approved);
        assert!(outcome.snapshot_id.is_some());

        // 校长通过 -> 已发布
        let outcome = api
            .evaluate_syllabus(&syllabus_id, &principal(), "APPROVE", None)
            .unwrap();
        assert_eq!(outcome.to_status, SyllabusStatus::Published);
        assert!(outcome.snapshot_id.is_some());

        // 终态: 在途记录清空，状态落库
        assert!(api.get_current_workflow(&syllabus_id).unwrap().is_none());
        let details = api.get_details(&syllabus_id).unwrap();
        assert_eq!(details.syllabus.status, SyllabusStatus::Published);

        // 审批历史: 四次操作按序留痕
        let history = api.get_workflow_history(&syllabus_id).unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].action, WorkflowAction::Submit);
        assert_eq!(history[0].from_status, SyllabusStatus::Draft);
        assert_eq!(history[3].to_status, SyllabusStatus::Published);
        assert_eq!(history[3].actor_id, "U-PRIN");

        // 快照: APPROVED 与 PUBLISHED 各一份
        let snapshots = api.list_snapshots(&syllabus_id).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|s| s.version == "1.0"));
    }

    #[test]
    fn test_history_preserves_transition_order_within_same_second() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let api = SyllabusApi::new(conn);

        let created = api.create_syllabus(&complete_draft_payload()).unwrap();
        let syllabus_id = created.syllabus.syllabus_id.clone();

        // 五次转换连续执行，大概率落在同一秒内
        api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();
        api.evaluate_syllabus(&syllabus_id, &head_of_department(), "RETURN", Some("补充"))
            .unwrap();
        api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();
        api.evaluate_syllabus(&syllabus_id, &head_of_department(), "APPROVE", None)
            .unwrap();
        api.evaluate_syllabus(&syllabus_id, &academic_affairs(), "APPROVE", None)
            .unwrap();

        let history = api.get_workflow_history(&syllabus_id).unwrap();
        let actions: Vec<WorkflowAction> = history.iter().map(|log| log.action).collect();
        assert_eq!(
            actions,
            vec![
                WorkflowAction::Submit,
                WorkflowAction::Return,
                WorkflowAction::Submit,
                WorkflowAction::Approve,
                WorkflowAction::Approve,
            ]
        );
        // 相邻两条日志首尾相接
        for pair in history.windows(2) {
            assert_eq!(pair[0].to_status, pair[1].from_status);
        }
    }

    #[test]
    fn test_submit_notifies_review_chain_roles() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let (sink, sent) = RecordingSink::new();
        let api = SyllabusApi::new(conn).with_notifier(sink);

        let created = api.create_syllabus(&complete_draft_payload()).unwrap();
        let syllabus_id = created.syllabus.syllabus_id.clone();
        api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();

        // 系主任负责系审，教务与管理员同步知悉
        let sent = sent.lock().unwrap();
        let to_roles = sent
            .iter()
            .find_map(|n| match &n.recipient {
                Recipient::Roles(roles) => Some(roles.clone()),
                Recipient::Users(_) => None,
            })
            .expect("提交后应产生面向角色的通知");
        assert!(to_roles.contains(&Role::HeadOfDepartment));
        assert!(to_roles.contains(&Role::AcademicAffairs));
        assert!(to_roles.contains(&Role::Admin));
    }

    #[test]
    fn test_publish_notifies_subscribed_students() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let (sink, sent) = RecordingSink::new();
        let api = SyllabusApi::new(conn).with_notifier(sink);

        let created = api.create_syllabus(&complete_draft_payload()).unwrap();
        let syllabus_id = created.syllabus.syllabus_id.clone();

        api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();
        api.evaluate_syllabus(&syllabus_id, &head_of_department(), "APPROVE", None)
            .unwrap();
        api.evaluate_syllabus(&syllabus_id, &academic_affairs(), "APPROVE", None)
            .unwrap();
        api.evaluate_syllabus(&syllabus_id, &principal(), "APPROVE", None)
            .unwrap();

        let sent = sent.lock().unwrap();
        // 提交时系主任收到待审通知
        assert!(sent.iter().any(|n| matches!(
            &n.recipient,
            Recipient::Roles(roles) if roles.contains(&Role::HeadOfDepartment)
        )));
        // 发布时订阅学生收到扇出通知
        let to_students = sent.iter().find(|n| {
            matches!(&n.recipient, Recipient::Users(users) if users.contains(&"U-STU1".to_string()))
                && n.title.contains("发布")
        });
        let to_students = to_students.expect("订阅学生应收到发布通知");
        match &to_students.recipient {
            Recipient::Users(users) => {
                assert_eq!(users.len(), 2);
                assert!(users.contains(&"U-STU2".to_string()));
            }
            other => panic!("应为用户接收方, 实际: {:?}", other),
        }
    }

    #[test]
    fn test_returned_syllabus_can_be_revised_and_resubmitted() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let api = SyllabusApi::new(conn);

        let created = api.create_syllabus(&complete_draft_payload()).unwrap();
        let syllabus_id = created.syllabus.syllabus_id.clone();

        api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();
        api.evaluate_syllabus(
            &syllabus_id,
            &head_of_department(),
            "RETURN",
            Some("描述需补充课程目标"),
        )
        .unwrap();

        let details = api.get_details(&syllabus_id).unwrap();
        assert_eq!(details.syllabus.status, SyllabusStatus::Returned);
        // 退回即离开在途集合
        assert!(api.get_current_workflow(&syllabus_id).unwrap().is_none());

        let before = api.get_workflow_history(&syllabus_id).unwrap().len();
        // 重新提交: 恰好新增一条日志
        let outcome = api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();
        assert_eq!(outcome.from_status, SyllabusStatus::Returned);
        assert_eq!(outcome.to_status, SyllabusStatus::PendingReview);
        let after = api.get_workflow_history(&syllabus_id).unwrap();
        assert_eq!(after.len(), before + 1);
        assert_eq!(after.last().unwrap().action, WorkflowAction::Submit);
    }

    #[test]
    fn test_rejected_syllabus_can_be_resubmitted() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let api = SyllabusApi::new(conn);

        let created = api.create_syllabus(&complete_draft_payload()).unwrap();
        let syllabus_id = created.syllabus.syllabus_id.clone();

        api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();
        api.evaluate_syllabus(
            &syllabus_id,
            &head_of_department(),
            "REJECT",
            Some("与培养方案不符"),
        )
        .unwrap();
        assert_eq!(
            api.get_details(&syllabus_id).unwrap().syllabus.status,
            SyllabusStatus::Rejected
        );

        // REJECTED 允许修订后重新进入流水线
        let outcome = api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();
        assert_eq!(outcome.to_status, SyllabusStatus::PendingReview);
    }
}
