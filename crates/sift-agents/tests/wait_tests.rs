mod common;

use common::{assistant_reply, ids, statuses, MockHost};
use sift_agents::{
    wait_for_agents, AgentOutcome, SessionStatus, Swarm, WaitOptions, MAX_STATUS_FAILURES,
};
use std::sync::Arc;
use std::time::Duration;

fn options(timeout: Option<u64>) -> WaitOptions {
    WaitOptions {
        poll_interval: Duration::from_millis(1500),
        timeout: timeout.map(Duration::from_secs),
    }
}

#[tokio::test(start_paused = true)]
async fn test_waits_until_all_idle_then_reports_and_deletes() {
    let host = MockHost::new();
    {
        let mut state = host.state();
        state.status_script.push_back(Ok(statuses(&[
            ("a", SessionStatus::Busy),
            ("b", SessionStatus::Retry),
        ])));
        state.status_script.push_back(Ok(statuses(&[
            ("a", SessionStatus::Idle),
            ("b", SessionStatus::Busy),
        ])));
        state.messages.insert("a".to_string(), assistant_reply("found 3 callers"));
    }

    let report = wait_for_agents(&host, &ids(&["a", "b", "a"]), &options(None)).await;

    assert_eq!(report.agents.len(), 2);
    assert_eq!(
        report.agents[0].outcome,
        AgentOutcome::Completed(Some("found 3 callers".to_string()))
    );
    assert_eq!(report.agents[1].outcome, AgentOutcome::Completed(None));

    let state = host.state();
    assert_eq!(state.status_calls, 3);
    assert_eq!(state.deleted, vec!["a", "b"]);

    let text = report.render();
    assert!(text.starts_with("## Swarm Execution Report\n\n**Total Agents**: 2\n\n---\n\n"));
    assert!(text.contains("### Session: a\n\nfound 3 callers\n\n---\n\n"));
    assert!(text.contains("### Session: b\n\n(No response from agent)\n\n---\n\n"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_status_counts_as_idle() {
    let host = MockHost::new();
    let report = wait_for_agents(&host, &ids(&["gone"]), &options(Some(5))).await;
    assert_eq!(report.agents[0].outcome, AgentOutcome::Completed(None));
    assert_eq!(host.state().status_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_reports_pending_without_deleting() {
    let host = MockHost::new();
    {
        let mut state = host.state();
        state.default_status = statuses(&[("slow", SessionStatus::Busy), ("fast", SessionStatus::Idle)]);
        state.messages.insert("fast".to_string(), assistant_reply("done"));
    }

    let start = tokio::time::Instant::now();
    let report = wait_for_agents(&host, &ids(&["slow", "fast"]), &options(Some(10))).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(12));
    assert_eq!(report.agents[0].outcome, AgentOutcome::TimedOut);
    assert!(matches!(report.agents[1].outcome, AgentOutcome::Completed(Some(_))));
    assert_eq!(host.state().deleted, vec!["fast"]);
    assert!(report.render().contains("**Timed out**"));
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_wait_keeps_polling() {
    let host = MockHost::new();
    {
        let mut state = host.state();
        for _ in 0..2000 {
            state
                .status_script
                .push_back(Ok(statuses(&[("long", SessionStatus::Busy)])));
        }
    }

    let start = tokio::time::Instant::now();
    let report = wait_for_agents(&host, &ids(&["long"]), &options(None)).await;

    // 2000 busy polls at 1.5s each is well past the default bound
    assert!(start.elapsed() > Duration::from_secs(1800));
    assert_eq!(report.agents[0].outcome, AgentOutcome::Completed(None));
    assert_eq!(host.state().status_calls, 2001);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_status_failures_give_up() {
    let host = MockHost::new();
    {
        let mut state = host.state();
        state.status_script.push_back(Err(502));
        state
            .status_script
            .push_back(Ok(statuses(&[("x", SessionStatus::Busy)])));
        for _ in 0..MAX_STATUS_FAILURES {
            state.status_script.push_back(Err(503));
        }
    }

    let report = wait_for_agents(&host, &ids(&["x"]), &options(None)).await;
    match &report.agents[0].outcome {
        AgentOutcome::Failed(error) => assert!(error.contains("503")),
        other => panic!("expected failure, got {:?}", other),
    }
    let state = host.state();
    assert_eq!(state.status_calls, 2 + MAX_STATUS_FAILURES as usize);
    assert!(state.deleted.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_result_fetch_failure_is_reported() {
    let host = MockHost::new();
    host.state().fail_messages.insert("broken".to_string());

    let report = wait_for_agents(&host, &ids(&["broken"]), &options(None)).await;
    let text = report.render();
    assert!(text.contains("**Error**: Failed to retrieve results"));
    assert!(host.state().deleted.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_list() {
    let host = MockHost::new();
    let report = wait_for_agents(&host, &[], &options(None)).await;
    assert!(report.render().starts_with("## No Sessions Provided"));
    assert_eq!(host.state().status_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn test_swarm_wait_untracks_finished_children() {
    let host = Arc::new(MockHost::new());
    let swarm = Swarm::new(host.clone(), options(Some(60)));
    let request = sift_agents::SpawnRequest {
        agent: "fixer".to_string(),
        prompt: "fix".to_string(),
        description: "fix it".to_string(),
    };
    swarm.spawn("ses_p", &request).await;
    swarm.spawn("ses_p", &request).await;
    host.state().default_status = statuses(&[("ses_child2", SessionStatus::Busy)]);

    let text = swarm
        .wait(&ids(&["ses_child1", "ses_child2"]), Some(Some(Duration::from_secs(3))))
        .await;
    assert!(text.contains("### Session: ses_child1"));
    assert!(text.contains("still running after 3s"));
    assert_eq!(swarm.tracked("ses_p"), vec!["ses_child2".to_string()]);
}
