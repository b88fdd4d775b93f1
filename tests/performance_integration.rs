use resilience::performance::{ExecutionMetric, Goal, PerformanceTracker, SubjectKind};

fn metric(subject: &str, task_type: &str, success: bool, latency_ms: u64) -> ExecutionMetric {
    ExecutionMetric::new(subject, SubjectKind::Model, task_type, success, latency_ms).tokens(200, 100)
}

#[tokio::test]
async fn best_for_task_picks_the_faster_qualifying_model() {
    let tracker = PerformanceTracker::new(SubjectKind::Model);

    for _ in 0..8 {
        tracker.record(metric("gpt-3.5-turbo", "summarize", true, 80)).await.unwrap();
        tracker.record(metric("gpt-4", "summarize", true, 900)).await.unwrap();
    }

    let best = tracker.best_for_task("summarize", Goal::Speed).await;
    assert_eq!(best, Some("gpt-3.5-turbo".to_string()));
}

#[tokio::test]
async fn skill_gap_recorded_on_missing_capability() {
    let tracker = PerformanceTracker::new(SubjectKind::Skill);
    tracker.record_skill_gap("translate this contract", "legal_translation", vec!["translate".to_string()]).await;
    tracker.record_skill_gap("translate another contract", "legal_translation", vec![]).await;

    let gaps = tracker.get_skill_gaps(Some(0.0)).await;
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].failure_count, 2);
}

#[tokio::test]
async fn export_stats_reports_every_tracked_subject() {
    let tracker = PerformanceTracker::new(SubjectKind::Model);
    tracker.record(metric("gpt-4", "general", true, 120)).await.unwrap();

    let exported = tracker.export_stats().await;
    assert!(exported["subjects"]["gpt-4"]["total"].as_u64().unwrap() >= 1);
}
