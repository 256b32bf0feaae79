//! Playbook synthesis from the task log.
//!
//! The log is replayed in order; each maximal run of records with the same
//! host-target expression becomes one play. A target that comes back later
//! starts a new play, so the document always executes in the original order.

mod yaml;

pub use yaml::{from_yaml, to_yaml};

use std::collections::{BTreeSet, HashSet};

use crate::models::*;

/// Build a playbook from task records.
///
/// Arguments are copied verbatim; nothing about module semantics is checked.
/// An empty (or fully filtered) log yields a playbook with no plays. When an
/// inventory is given, target names it does not know are listed in
/// [`PlaybookStats::unknown_targets`].
pub fn synthesize(
    records: &[TaskRecord],
    name: &str,
    include_failed: bool,
    inventory: Option<&InventoryModel>,
) -> Playbook {
    let mut plays: Vec<Play> = Vec::new();
    let mut excluded_failed = 0;
    let mut modules = BTreeSet::new();
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for record in records {
        if !include_failed && record.status == TaskStatus::Failed {
            excluded_failed += 1;
            continue;
        }

        modules.insert(record.operation.clone());
        for target in record.target.names() {
            if seen.insert(target) {
                targets.push(target.to_string());
            }
        }

        let step = Step::new(record.operation.as_str(), record.args.clone());
        match plays.last_mut() {
            Some(play) if play.hosts == record.target => play.tasks.push(step),
            _ => plays.push(Play {
                name: String::new(),
                hosts: record.target.clone(),
                tasks: vec![step],
            }),
        }
    }

    let play_count = plays.len();
    for (index, play) in plays.iter_mut().enumerate() {
        play.name = play_name(name, index, play_count);
    }

    let unknown_targets = inventory
        .map(|inv| targets.iter().filter(|t| !inv.knows(t)).cloned().collect())
        .unwrap_or_default();

    let stats = PlaybookStats {
        total_steps: plays.iter().map(|p| p.tasks.len()).sum(),
        play_count,
        excluded_failed,
        modules_used: modules.into_iter().collect(),
        targets,
        unknown_targets,
    };

    tracing::info!(
        playbook = name,
        plays = stats.play_count,
        steps = stats.total_steps,
        excluded = stats.excluded_failed,
        "Playbook synthesized"
    );

    Playbook {
        name: name.to_string(),
        plays,
        stats,
    }
}

fn play_name(name: &str, index: usize, count: usize) -> String {
    if count == 1 {
        name.to_string()
    } else {
        format!("{} ({} of {})", name, index + 1, count)
    }
}
