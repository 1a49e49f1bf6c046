// replay.rs — Replay a YAML scenario against a fresh system.
//
// Scenario format:
//
//   start: 2024-01-01T00:00:00Z
//   admin: root            # optional; defaults to the first admin member
//   members:
//     - { id: root, name: Root, group: ops, role: admin }
//   steps:
//     - { op: add_policy, caller: root, role: primary_head, ... }
//     - { advance_secs: 120 }

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_audit::Journal;
use warden_core::{
    AccessControlSystem, Command, CommandOutput, InMemoryTokenLedger, ManualClock,
    MemberRegistry, Outcome, WardenConfig,
};
use warden_policy::{Member, Role};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub admin: Option<String>,
    pub members: Vec<Member>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Advance { advance_secs: i64 },
    Run(Command),
}

/// One line of replay output.
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: StepResult,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Advanced {
        secs: i64,
    },
    Ok {
        operation: String,
        caller: String,
        outcome: Outcome<CommandOutput>,
    },
    Error {
        operation: String,
        caller: String,
        message: String,
    },
}

pub struct Replay {
    pub system: AccessControlSystem,
    pub reports: Vec<StepReport>,
}

pub fn load(path: &Path) -> anyhow::Result<Scenario> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse scenario {}", path.display()))
}

/// Build the system described by `scenario` and run its steps. Hard errors
/// from individual steps are reported, not propagated.
pub fn run(scenario: &Scenario, config: WardenConfig) -> anyhow::Result<Replay> {
    let registry = Arc::new(MemberRegistry::new());
    for m in &scenario.members {
        registry.register(&m.id, &m.name, &m.group, m.role)?;
    }
    let admin = match &scenario.admin {
        Some(admin) => admin.clone(),
        None => match scenario.members.iter().find(|m| m.role == Role::Admin) {
            Some(m) => m.id.clone(),
            None => bail!("scenario has no admin member"),
        },
    };

    let clock = ManualClock::new(scenario.start);
    let mut system = AccessControlSystem::new(
        &admin,
        config,
        registry,
        Arc::new(InMemoryTokenLedger::new()),
        Arc::new(clock.clone()),
    )?;
    let funded = system.allocate_initial_balances();
    tracing::info!(members = scenario.members.len(), %funded, "initial balances allocated");

    let mut reports = Vec::with_capacity(scenario.steps.len());
    for (step, s) in scenario.steps.iter().enumerate() {
        let result = match s {
            Step::Advance { advance_secs } => {
                clock.advance_secs(*advance_secs);
                StepResult::Advanced {
                    secs: *advance_secs,
                }
            }
            Step::Run(command) => {
                let operation = command.operation().to_string();
                let caller = command.caller().to_string();
                match system.execute(command) {
                    Ok(outcome) => StepResult::Ok {
                        operation,
                        caller,
                        outcome,
                    },
                    Err(e) => StepResult::Error {
                        operation,
                        caller,
                        message: e.to_string(),
                    },
                }
            }
        };
        reports.push(StepReport {
            step,
            at: system.now(),
            result,
        });
    }

    Ok(Replay { system, reports })
}

pub fn execute(
    scenario_path: &Path,
    config_path: Option<&Path>,
    journal_path: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => WardenConfig::load(path)?,
        None => WardenConfig::default(),
    };
    let scenario = load(scenario_path)?;
    let replay = run(&scenario, config)?;

    for report in &replay.reports {
        if json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            println!("{}", describe(report));
        }
    }

    if let Some(path) = journal_path {
        replay.system.journal().export_jsonl(path)?;
        tracing::info!(path = %path.display(), entries = replay.system.journal().len(), "journal exported");
    }

    if !json {
        print_summary(&replay, &scenario.members);
    }
    Ok(())
}

fn describe(report: &StepReport) -> String {
    let prefix = format!("[{:>3}] {}", report.step, report.at.format("%Y-%m-%d %H:%M:%S"));
    match &report.result {
        StepResult::Advanced { secs } => format!("{}  clock advanced {}s", prefix, secs),
        StepResult::Error {
            operation,
            caller,
            message,
        } => format!("{}  {} {}: ERROR {}", prefix, caller, operation, message),
        StepResult::Ok {
            operation,
            caller,
            outcome,
        } => {
            let detail = match outcome {
                Outcome::Completed(output) => describe_output(output),
                Outcome::Blocked { until } => format!("blocked until {}", until),
                Outcome::Misbehavior(report) => format!(
                    "MISBEHAVIOR {} (penalty {}, burned {}, blocked until {})",
                    report.kind, report.penalty_amount, report.burned, report.blocking_end
                ),
            };
            format!("{}  {} {}: {}", prefix, caller, operation, detail)
        }
    }
}

fn describe_output(output: &CommandOutput) -> String {
    match output {
        CommandOutput::Done => "ok".to_string(),
        CommandOutput::PolicyWritten { replaced: None } => "policy written".to_string(),
        CommandOutput::PolicyWritten {
            replaced: Some(previous),
        } => format!("policy written (replaced {})", previous),
        CommandOutput::ScopeDeployed { scope_id } => format!("scope {} deployed", scope_id),
        CommandOutput::RequestCreated { id } => format!("request {} created", id),
        CommandOutput::Vote { approved } => {
            if *approved {
                "vote recorded, request approved".to_string()
            } else {
                "vote recorded, request pending".to_string()
            }
        }
        CommandOutput::Snapshot { members } => {
            let ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
            format!("snapshot [{}]", ids.join(", "))
        }
    }
}

fn print_summary(replay: &Replay, members: &[Member]) {
    let mut errors = 0;
    let mut misbehavior = 0;
    let mut blocked = 0;
    for report in &replay.reports {
        match &report.result {
            StepResult::Error { .. } => errors += 1,
            StepResult::Ok {
                outcome: Outcome::Misbehavior(_),
                ..
            } => misbehavior += 1,
            StepResult::Ok {
                outcome: Outcome::Blocked { .. },
                ..
            } => blocked += 1,
            _ => {}
        }
    }

    let journal: &Journal = replay.system.journal();
    println!();
    println!(
        "{} step(s): {} misbehavior, {} blocked, {} error(s)",
        replay.reports.len(),
        misbehavior,
        blocked,
        errors
    );
    println!(
        "Journal: {} entr{}, head {}",
        journal.len(),
        if journal.len() == 1 { "y" } else { "ies" },
        journal.head_hash().unwrap_or("-")
    );
    println!();
    println!("{:<12} {:<16} {:<11} {:>40}", "MEMBER", "ROLE", "STATUS", "BALANCE");
    for m in members {
        let Some(status) = replay.system.member_status(&m.id) else {
            println!("{:<12} (revoked)", m.id);
            continue;
        };
        println!(
            "{:<12} {:<16} {:<11} {:>40}",
            m.id,
            status.role,
            status.status.to_string(),
            replay.system.balance_of(&m.id)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::MisbehaviorKind;

    const SCENARIO: &str = r#"
start: 2024-01-01T00:00:00Z
members:
  - { id: root, name: Root, group: ops, role: admin }
  - { id: ph1, name: Primary 1, group: type1, role: primary_head }
  - { id: ph2, name: Primary 2, group: type2, role: primary_head }
  - { id: rm1, name: Member 1, group: type1, role: regular_member }
steps:
  - op: add_policy
    caller: root
    role: primary_head
    resource: GlobalResourceTable
    action: view
    permission: allow
  - op: create_access_request
    caller: ph1
    resource: GlobalResourceTable
    action: view
  - op: handle_access_request
    caller: ph2
    id: 0
    approve: true
  - advance_secs: 120
  - op: view_global_resource_table
    caller: ph1
  - op: view_global_resource_table
    caller: rm1
  - op: handle_access_request
    caller: rm1
    id: 0
    approve: true
"#;

    fn replay() -> Replay {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        run(&scenario, WardenConfig::default()).unwrap()
    }

    #[test]
    fn steps_parse_as_commands_or_clock_advances() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.steps.len(), 7);
        assert!(matches!(scenario.steps[3], Step::Advance { advance_secs: 120 }));
        assert!(matches!(scenario.steps[0], Step::Run(Command::AddPolicy { .. })));
    }

    #[test]
    fn replay_reports_every_step() {
        let replay = replay();
        assert_eq!(replay.reports.len(), 7);
        assert!(replay.system.request(0).unwrap().is_approved());

        match &replay.reports[4].result {
            StepResult::Ok { outcome, .. } => assert!(outcome.is_completed()),
            other => panic!("unexpected result: {:?}", other),
        }
        match &replay.reports[5].result {
            StepResult::Ok { outcome, .. } => assert_eq!(
                outcome.misbehavior().unwrap().kind,
                MisbehaviorKind::UnauthorizedAccess
            ),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(replay.reports[6].result, StepResult::Error { .. }));
    }

    #[test]
    fn json_lines_carry_status() {
        let replay = replay();
        let line = serde_json::to_value(&replay.reports[3]).unwrap();
        assert_eq!(line["status"], "advanced");
        assert_eq!(line["secs"], 120);
        let line = serde_json::to_value(&replay.reports[1]).unwrap();
        assert_eq!(line["status"], "ok");
        assert_eq!(line["outcome"]["outcome"], "completed");
    }

    #[test]
    fn missing_admin_is_rejected() {
        let scenario: Scenario = serde_yaml::from_str(
            "start: 2024-01-01T00:00:00Z\nmembers:\n  - { id: ph1, name: P, group: g, role: primary_head }\n",
        )
        .unwrap();
        assert!(run(&scenario, WardenConfig::default()).is_err());
    }

    #[test]
    fn exported_journal_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let replay = replay();
        replay.system.journal().export_jsonl(&path).unwrap();
        assert_eq!(Journal::verify_file(&path).unwrap(), replay.system.journal().len());
    }
}
