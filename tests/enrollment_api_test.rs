// ==========================================
// 报名 API 集成测试
// ==========================================
// 覆盖: 操作日志、事件发布、空操作、池删除后的审计保留
// ==========================================


#[cfg(test)]
mod enrollment_api_test {
    use enrollment_allocation::api::ApiError;
    use enrollment_allocation::domain::types::{EnrollmentAction, EnrollmentStatus};
    use enrollment_allocation::engine::EnrollmentEventType;

    use crate::test_helpers::{setup_env, setup_env_with, start_time, RecordingPublisher};

    const ADMIN: &str = "admin";

    fn action_types(env: &crate::test_helpers::TestEnv, pool_id: &str) -> Vec<String> {
        let mut types: Vec<String> = env
            .state
            .pool_api
            .list_action_logs(pool_id)
            .unwrap()
            .into_iter()
            .map(|l| l.action_type)
            .collect();
        types.sort();
        types
    }

    #[test]
    fn test_committed_operations_are_audited() {
        let env = setup_env();
        env.state
            .pool_api
            .create_pool("FAIR-1", "internal_fair", 2, ADMIN)
            .unwrap();
        let outcome = env
            .state
            .enrollment_api
            .submit("FAIR-1", "exh-1", "reviewer-a")
            .unwrap();
        env.state
            .enrollment_api
            .approve(&outcome.enrollment.enrollment_id, "reviewer-b")
            .unwrap();

        assert_eq!(
            action_types(&env, "FAIR-1"),
            vec!["APPROVE", "CREATE_POOL", "SUBMIT"]
        );

        let logs = env.state.pool_api.list_action_logs("FAIR-1").unwrap();
        let submit = logs.iter().find(|l| l.action_type == "SUBMIT").unwrap();
        assert_eq!(submit.actor, "reviewer-a");
        assert_eq!(submit.action_ts, start_time());
        assert_eq!(
            submit.enrollment_id.as_deref(),
            Some(outcome.enrollment.enrollment_id.as_str())
        );
        let payload = submit.payload_json.as_ref().unwrap();
        assert_eq!(payload["slot_code"], "A01");

        let approve = logs.iter().find(|l| l.action_type == "APPROVE").unwrap();
        assert_eq!(approve.actor, "reviewer-b");
        let payload = approve.payload_json.as_ref().unwrap();
        assert_eq!(payload["from"], "pending");
        assert_eq!(payload["to"], "approved");
    }

    #[test]
    fn test_events_follow_committed_operations() {
        let env = setup_env();
        env.state
            .pool_api
            .create_pool("ACT-1", "activity", 3, ADMIN)
            .unwrap();
        let outcome = env
            .state
            .enrollment_api
            .submit("ACT-1", "vol-1", ADMIN)
            .unwrap();
        env.state
            .enrollment_api
            .mark_attendance(&outcome.enrollment.enrollment_id, true, ADMIN)
            .unwrap();

        let events = env.publisher.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, EnrollmentEventType::PoolChanged);
        assert_eq!(events[1].event_type, EnrollmentEventType::EnrollmentSubmitted);
        assert_eq!(events[1].to_status, Some(EnrollmentStatus::Enrolled));
        assert_eq!(events[2].event_type, EnrollmentEventType::EnrollmentStatusChanged);
        assert_eq!(events[2].from_status, Some(EnrollmentStatus::Enrolled));
        assert_eq!(events[2].to_status, Some(EnrollmentStatus::Attended));
        assert_eq!(events[2].source.as_deref(), Some(ADMIN));
    }

    #[test]
    fn test_rejected_operation_writes_nothing() {
        let env = setup_env();
        env.state
            .pool_api
            .create_pool("FAIR-1", "internal_fair", 1, ADMIN)
            .unwrap();
        env.state
            .enrollment_api
            .submit("FAIR-1", "exh-1", ADMIN)
            .unwrap();

        let err = env
            .state
            .enrollment_api
            .submit("FAIR-1", "exh-2", ADMIN)
            .unwrap_err();
        assert!(matches!(err, ApiError::PoolExhausted { .. }));
        assert!(err.is_recoverable());

        assert_eq!(action_types(&env, "FAIR-1"), vec!["CREATE_POOL", "SUBMIT"]);
        assert_eq!(env.publisher.events().len(), 2);
    }

    #[test]
    fn test_failing_publisher_does_not_fail_operation() {
        let env = setup_env_with(&[], RecordingPublisher::failing());
        env.state
            .pool_api
            .create_pool("EXT-1", "external_fair", 5, ADMIN)
            .unwrap();
        let outcome = env
            .state
            .enrollment_api
            .submit("EXT-1", "exh-1", ADMIN)
            .unwrap();

        assert_eq!(outcome.enrollment.status, EnrollmentStatus::Pending);
        assert_eq!(env.publisher.events().len(), 2);
        assert_eq!(action_types(&env, "EXT-1"), vec!["CREATE_POOL", "SUBMIT"]);
        assert_eq!(env.state.pool_api.occupied_count("EXT-1").unwrap(), 1);
    }

    #[test]
    fn test_cancel_inactive_record_is_silent_noop() {
        let env = setup_env();
        env.state
            .pool_api
            .create_pool("FAIR-1", "internal_fair", 2, ADMIN)
            .unwrap();
        let outcome = env
            .state
            .enrollment_api
            .submit("FAIR-1", "exh-1", ADMIN)
            .unwrap();
        let id = outcome.enrollment.enrollment_id;
        env.state
            .enrollment_api
            .reject(&id, Some("资料不全"), ADMIN)
            .unwrap();

        let events_before = env.publisher.events().len();
        let noop = env.state.enrollment_api.cancel(&id, None, ADMIN).unwrap();
        assert!(!noop.changed);
        assert_eq!(noop.enrollment.status, EnrollmentStatus::Rejected);
        assert_eq!(noop.enrollment.decision_reason.as_deref(), Some("资料不全"));

        assert_eq!(
            action_types(&env, "FAIR-1"),
            vec!["CREATE_POOL", "REJECT", "SUBMIT"]
        );
        assert_eq!(env.publisher.events().len(), events_before);
    }

    #[test]
    fn test_cancel_releases_exactly_one_and_repeat_changes_nothing() {
        let env = setup_env();
        let pools = &env.state.pool_api;
        let api = &env.state.enrollment_api;
        pools.create_pool("FAIR-1", "internal_fair", 3, ADMIN).unwrap();
        pools.create_pool("ACT-1", "activity", 2, ADMIN).unwrap();

        let first = api.submit("FAIR-1", "exh-1", ADMIN).unwrap();
        api.submit("FAIR-1", "exh-2", ADMIN).unwrap();
        assert_eq!(pools.available_count("FAIR-1").unwrap(), (1, false));

        let cancelled = api
            .cancel(&first.enrollment.enrollment_id, None, ADMIN)
            .unwrap();
        assert!(cancelled.changed);
        assert_eq!(cancelled.previous_status, EnrollmentStatus::Pending);
        assert_eq!(pools.available_count("FAIR-1").unwrap(), (2, false));

        let again = api
            .cancel(&first.enrollment.enrollment_id, None, ADMIN)
            .unwrap();
        assert!(!again.changed);
        assert_eq!(pools.available_count("FAIR-1").unwrap(), (2, false));

        let volunteer = api.submit("ACT-1", "vol-1", ADMIN).unwrap();
        assert_eq!(pools.available_count("ACT-1").unwrap(), (1, false));
        api.cancel(&volunteer.enrollment.enrollment_id, None, ADMIN)
            .unwrap();
        assert_eq!(pools.available_count("ACT-1").unwrap(), (2, false));
        api.cancel(&volunteer.enrollment.enrollment_id, None, ADMIN)
            .unwrap();
        assert_eq!(pools.available_count("ACT-1").unwrap(), (2, false));
    }

    #[test]
    fn test_unchanged_resize_is_not_audited() {
        let env = setup_env();
        env.state
            .pool_api
            .create_pool("EXT-1", "external_fair", 5, ADMIN)
            .unwrap();

        let same = env.state.pool_api.resize("EXT-1", 5, ADMIN).unwrap();
        assert!(!same.changed);
        let grown = env.state.pool_api.resize("EXT-1", 8, ADMIN).unwrap();
        assert!(grown.changed);
        assert_eq!(grown.previous_capacity, 5);

        assert_eq!(
            action_types(&env, "EXT-1"),
            vec!["CREATE_POOL", "RESIZE_POOL"]
        );
    }

    #[test]
    fn test_destroy_pool_keeps_audit_trail() {
        let env = setup_env();
        env.state
            .pool_api
            .create_pool("FAIR-1", "internal_fair", 3, ADMIN)
            .unwrap();
        let outcome = env
            .state
            .enrollment_api
            .submit("FAIR-1", "exh-1", ADMIN)
            .unwrap();
        env.state
            .enrollment_api
            .submit("FAIR-1", "exh-2", ADMIN)
            .unwrap();

        let removed = env.state.pool_api.destroy_pool("FAIR-1", ADMIN).unwrap();
        assert_eq!(removed, 2);

        assert!(matches!(
            env.state.pool_api.get_pool("FAIR-1"),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            env.state
                .enrollment_api
                .get_enrollment(&outcome.enrollment.enrollment_id),
            Err(ApiError::NotFound(_))
        ));
        assert!(env
            .state
            .enrollment_api
            .list_enrollments_by_subject("exh-1")
            .unwrap()
            .is_empty());

        assert_eq!(
            action_types(&env, "FAIR-1"),
            vec!["CREATE_POOL", "DESTROY_POOL", "SUBMIT", "SUBMIT"]
        );
        let history = env
            .state
            .pool_api
            .enrollment_history(&outcome.enrollment.enrollment_id)
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action_type, "SUBMIT");

        let recent = env.state.pool_api.recent_action_logs(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(matches!(
            env.state.pool_api.recent_action_logs(0),
            Err(ApiError::InvalidInput(_))
        ));

        // 同名池可以重建, 展位从头编号
        env.state
            .pool_api
            .create_pool("FAIR-1", "internal_fair", 3, ADMIN)
            .unwrap();
        let again = env
            .state
            .enrollment_api
            .submit("FAIR-1", "exh-1", ADMIN)
            .unwrap();
        assert_eq!(again.slot_code.as_deref(), Some("A01"));
    }

    #[test]
    fn test_allowed_actions_follow_flow() {
        let env = setup_env();
        env.state
            .pool_api
            .create_pool("FAIR-1", "internal_fair", 2, ADMIN)
            .unwrap();
        env.state
            .pool_api
            .create_pool("ACT-1", "activity", 2, ADMIN)
            .unwrap();

        let fair = env
            .state
            .enrollment_api
            .submit("FAIR-1", "exh-1", ADMIN)
            .unwrap();
        let fair_actions = env
            .state
            .enrollment_api
            .allowed_actions(&fair.enrollment.enrollment_id)
            .unwrap();
        assert!(fair_actions.contains(&EnrollmentAction::Approve));
        assert!(fair_actions.contains(&EnrollmentAction::Reject));
        assert!(fair_actions.contains(&EnrollmentAction::Cancel));
        assert!(!fair_actions.contains(&EnrollmentAction::MarkAttended));

        env.state
            .enrollment_api
            .approve(&fair.enrollment.enrollment_id, ADMIN)
            .unwrap();
        assert!(env
            .state
            .enrollment_api
            .allowed_actions(&fair.enrollment.enrollment_id)
            .unwrap()
            .is_empty());

        let act = env
            .state
            .enrollment_api
            .submit("ACT-1", "vol-1", ADMIN)
            .unwrap();
        let act_actions = env
            .state
            .enrollment_api
            .allowed_actions(&act.enrollment.enrollment_id)
            .unwrap();
        assert!(act_actions.contains(&EnrollmentAction::MarkAttended));
        assert!(act_actions.contains(&EnrollmentAction::MarkNotAttended));
        assert!(act_actions.contains(&EnrollmentAction::Cancel));
        assert!(!act_actions.contains(&EnrollmentAction::Approve));
        assert!(!act_actions.contains(&EnrollmentAction::RevertAttendance));
    }

    #[test]
    fn test_invalid_transition_reports_state() {
        let env = setup_env();
        env.state
            .pool_api
            .create_pool("FAIR-1", "internal_fair", 2, ADMIN)
            .unwrap();
        let outcome = env
            .state
            .enrollment_api
            .submit("FAIR-1", "exh-1", ADMIN)
            .unwrap();
        let id = outcome.enrollment.enrollment_id;

        let err = env
            .state
            .enrollment_api
            .mark_attendance(&id, true, ADMIN)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
        assert!(!err.is_recoverable());

        let err = env
            .state
            .enrollment_api
            .approve(&id, "  ")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let record = env.state.enrollment_api.get_enrollment(&id).unwrap();
        assert_eq!(record.status, EnrollmentStatus::Pending);
    }
}
