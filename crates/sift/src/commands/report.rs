use sift_store::{read_jsonl, Paths, PruneRecord};
use std::collections::{BTreeMap, HashMap};

pub fn run() -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let records: Vec<PruneRecord> = read_jsonl(&paths.prune_log())?;
    println!("{}", build_report(&records));
    Ok(())
}

/// Each record describes the whole log at that pass, so only the latest
/// record per conversation counts toward totals.
fn latest_per_session(records: &[PruneRecord]) -> Vec<&PruneRecord> {
    let mut latest: HashMap<&str, &PruneRecord> = HashMap::new();
    for record in records {
        latest
            .entry(record.session_id.as_str())
            .and_modify(|seen| {
                if record.timestamp >= seen.timestamp {
                    *seen = record;
                }
            })
            .or_insert(record);
    }
    latest.into_values().collect()
}

fn build_report(records: &[PruneRecord]) -> String {
    if records.is_empty() {
        return "No pruning passes recorded yet.".to_string();
    }

    let mut sections = Vec::new();
    let mut latest = latest_per_session(records);

    let tool_calls: usize = latest.iter().map(|r| r.tool_calls).sum();
    let outputs: usize = latest.iter().map(|r| r.outputs_pruned).sum();
    let inputs: usize = latest.iter().map(|r| r.inputs_pruned).sum();
    let ratio = if tool_calls > 0 {
        outputs as f64 / tool_calls as f64
    } else {
        0.0
    };

    sections.push(format!(
        "Pruning Report\n==============\n\
         Passes: {}\nConversations: {}\nTool calls: {}\n\
         Outputs pruned: {} ({:.1}%)\nInputs pruned: {}",
        records.len(),
        latest.len(),
        tool_calls,
        outputs,
        ratio * 100.0,
        inputs
    ));

    let mut by_reason: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &latest {
        for (reason, count) in &record.by_reason {
            *by_reason.entry(reason.as_str()).or_default() += count;
        }
    }
    if !by_reason.is_empty() {
        let mut reasons: Vec<_> = by_reason.into_iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let lines: Vec<String> = reasons
            .iter()
            .map(|(reason, count)| format!("  {}: {}", reason, count))
            .collect();
        sections.push(format!("\nBy Reason\n---------\n{}", lines.join("\n")));
    }

    latest.sort_by(|a, b| {
        b.total_pruned()
            .cmp(&a.total_pruned())
            .then(a.session_id.cmp(&b.session_id))
    });
    let top: Vec<String> = latest
        .iter()
        .take(5)
        .map(|r| {
            format!(
                "  {} — {} of {} calls pruned",
                r.session_id,
                r.total_pruned(),
                r.tool_calls
            )
        })
        .collect();
    sections.push(format!("\nTop Conversations\n-----------------\n{}", top.join("\n")));

    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(session: &str, minutes_ago: i64, calls: usize, outputs: usize) -> PruneRecord {
        let mut by_reason = BTreeMap::new();
        by_reason.insert("deduplicated".to_string(), outputs);
        PruneRecord {
            session_id: session.to_string(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            tool_calls: calls,
            outputs_pruned: outputs,
            inputs_pruned: 0,
            by_reason,
        }
    }

    #[test]
    fn test_build_report_empty() {
        assert!(build_report(&[]).contains("No pruning passes"));
    }

    #[test]
    fn test_build_report_uses_latest_pass() {
        let records = vec![
            record("s1", 10, 4, 1),
            record("s1", 1, 10, 5),
            record("s2", 5, 10, 0),
        ];
        let report = build_report(&records);
        assert!(report.contains("Passes: 3"));
        assert!(report.contains("Conversations: 2"));
        assert!(report.contains("Tool calls: 20"));
        assert!(report.contains("Outputs pruned: 5 (25.0%)"));
        assert!(report.contains("deduplicated: 5"));
    }

    #[test]
    fn test_top_conversations_sorted() {
        let records = vec![record("quiet", 0, 3, 0), record("busy", 0, 9, 6)];
        let report = build_report(&records);
        let busy = report.find("busy —").unwrap();
        let quiet = report.find("quiet —").unwrap();
        assert!(busy < quiet);
    }
}
