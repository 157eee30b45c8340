// ==========================================
// 并发评审测试
// ==========================================
// 职责: 验证同一环节的并发评审只有一个胜者
// ==========================================


#[cfg(test)]
mod concurrent_evaluate_test {
    use std::sync::Arc;
    use std::thread;

    use syllabus_workflow::api::SyllabusApi;
    use syllabus_workflow::domain::types::{Actor, Role, SyllabusStatus, WorkflowAction};

    use crate::test_helpers::{complete_draft_payload, create_test_db, lecturer, open_shared_conn};

    #[test]
    fn test_concurrent_approve_has_single_winner() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared_conn(&db_path);
        let api = Arc::new(SyllabusApi::new(conn));

        let created = api.create_syllabus(&complete_draft_payload()).unwrap();
        let syllabus_id = created.syllabus.syllabus_id.clone();
        api.submit_syllabus(&syllabus_id, &lecturer()).unwrap();

        // 两名系主任并发对同一环节执行 APPROVE
        let mut handles = Vec::new();
        for i in 0..2 {
            let api = Arc::clone(&api);
            let syllabus_id = syllabus_id.clone();
            handles.push(thread::spawn(move || {
                let reviewer = Actor::new(format!("U-HOD-{}", i), Role::HeadOfDepartment);
                api.evaluate_syllabus(&syllabus_id, &reviewer, "APPROVE", None)
            }));
        }
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // 恰好一个成功；落败方因状态已前进而被拒绝
        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok_count, 1, "并发评审应只有一个胜者");

        // 状态只前进了一步
        assert_eq!(
            api.get_details(&syllabus_id).unwrap().syllabus.status,
            SyllabusStatus::PendingApproval
        );

        // 日志只多出一条 APPROVE
        let history = api.get_workflow_history(&syllabus_id).unwrap();
        let approve_count = history
            .iter()
            .filter(|log| log.action == WorkflowAction::Approve)
            .count();
        assert_eq!(approve_count, 1);
    }
}
