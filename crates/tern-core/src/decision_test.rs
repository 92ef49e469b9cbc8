use super::*;
use crate::migration::SqlMigration;

#[test]
fn test_parse_error_decisions() {
    assert_eq!(
        "stop".parse::<ErrorDecision>().unwrap(),
        ErrorDecision::Stop
    );
    assert_eq!(
        "mark-anyway-and-continue".parse::<ErrorDecision>().unwrap(),
        ErrorDecision::MarkAnywayAndContinue
    );
    assert_eq!(
        " Continue ".parse::<ErrorDecision>().unwrap(),
        ErrorDecision::Continue
    );
}

#[test]
fn test_unknown_decision_is_unimplemented() {
    let err = "retry".parse::<ErrorDecision>().unwrap_err();
    match err {
        CoreError::UnimplementedDecision { hook, value, .. } => {
            assert_eq!(hook, "error");
            assert_eq!(value, "retry");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err_code("maybe".parse::<CompletionDecision>()).starts_with("[T003]"));
    assert!(err_code("sometimes".parse::<CommitPolicy>()).starts_with("[T003]"));
    assert!(err_code("walk".parse::<PreExecutionDecision>()).starts_with("[T003]"));
}

fn err_code<T: std::fmt::Debug>(result: Result<T, CoreError>) -> String {
    result.unwrap_err().to_string()
}

#[test]
fn test_display_round_trips_through_from_str() {
    for decision in [
        PreExecutionDecision::Run,
        PreExecutionDecision::Stop,
        PreExecutionDecision::Jump,
        PreExecutionDecision::JumpAndMark,
    ] {
        let parsed: PreExecutionDecision = decision.to_string().parse().unwrap();
        assert_eq!(parsed, decision);
    }
}

#[test]
fn test_defaults_fail_closed() {
    assert_eq!(PreExecutionDecision::default(), PreExecutionDecision::Run);
    assert_eq!(ErrorDecision::default(), ErrorDecision::Stop);
    assert_eq!(CompletionDecision::default(), CompletionDecision::Rollback);
}

#[test]
fn test_error_decision_flags() {
    assert!(!ErrorDecision::Stop.records());
    assert!(ErrorDecision::Stop.stops());
    assert!(ErrorDecision::MarkAnywayAndStop.records());
    assert!(ErrorDecision::MarkAnywayAndStop.stops());
    assert!(!ErrorDecision::Continue.records());
    assert!(!ErrorDecision::Continue.stops());
    assert!(ErrorDecision::MarkAnywayAndContinue.records());
    assert!(!ErrorDecision::MarkAnywayAndContinue.stops());
}

#[test]
fn test_commit_policy() {
    let commit = CompletionDecision::Commit;
    let rollback = CompletionDecision::Rollback;
    assert_eq!(CommitPolicy::OnSuccess.decide(false), commit);
    assert_eq!(CommitPolicy::OnSuccess.decide(true), rollback);
    assert_eq!(CommitPolicy::Always.decide(true), commit);
    assert_eq!(CommitPolicy::Never.decide(false), rollback);
}

#[test]
fn test_constant_policies() {
    let m = SqlMigration::new("a", "SELECT 1");
    let failure = StoreError::Execution("boom".to_string());
    assert_eq!(
        PreExecutionDecision::JumpAndMark.decide(&m),
        PreExecutionDecision::JumpAndMark
    );
    assert_eq!(
        ErrorDecision::Continue.decide(&m, &failure),
        ErrorDecision::Continue
    );
    assert_eq!(
        CompletionDecision::Commit.decide(true),
        CompletionDecision::Commit
    );
}

#[test]
fn test_closures_are_policies() {
    let m = SqlMigration::new("a", "SELECT 1");
    let mut seen = Vec::new();
    let mut policy = |migration: &dyn Migration| {
        seen.push(migration.id().to_string());
        PreExecutionDecision::Jump
    };
    assert_eq!(
        PreExecutionPolicy::decide(&mut policy, &m),
        PreExecutionDecision::Jump
    );
    drop(policy);
    assert_eq!(seen, vec!["a".to_string()]);
}

#[test]
fn test_stop_after_runs_target_then_stops() {
    let mut policy = StopAfter::new(MigrationId::new("b"));
    let a = SqlMigration::new("a", "");
    let b = SqlMigration::new("b", "");
    let c = SqlMigration::new("c", "");
    assert_eq!(policy.decide(&a), PreExecutionDecision::Run);
    assert_eq!(policy.decide(&b), PreExecutionDecision::Run);
    assert_eq!(policy.decide(&c), PreExecutionDecision::Stop);
}

#[test]
fn test_skip_listed_defers_to_inner() {
    let mut policy = SkipListed::new([MigrationId::new("b")], PreExecutionDecision::JumpAndMark);
    assert_eq!(
        policy.decide(&SqlMigration::new("a", "")),
        PreExecutionDecision::JumpAndMark
    );
    assert_eq!(
        policy.decide(&SqlMigration::new("b", "")),
        PreExecutionDecision::Jump
    );
}

#[test]
fn test_decisions_deserialize_snake_case() {
    let d: ErrorDecision = serde_yaml::from_str("mark_anyway_and_stop").unwrap();
    assert_eq!(d, ErrorDecision::MarkAnywayAndStop);
    let c: CommitPolicy = serde_yaml::from_str("never").unwrap();
    assert_eq!(c, CommitPolicy::Never);
}
