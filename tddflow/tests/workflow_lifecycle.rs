//! End-to-end workflow scenarios driven through `Flow::handle`.
//!
//! Each test builds a temp project with a task list, scripts the human's
//! answers and the test command's results, and feeds host events in the order
//! a real agent turn would produce them.

use serde_json::{Value, json};

use tddflow::core::events::{EventReply, HostEvent, ToolCall, ToolDecision, ToolResult, TurnEnd};
use tddflow::core::types::{SessionStatus, StateName, TddPhase};
use tddflow::flow::Flow;
use tddflow::io::config::{ClassifierMode, FlowConfig};
use tddflow::test_support::{
    ScriptedHost, ScriptedTestRunner, TestWorkspace, failing_run, passing_run,
};

fn command(name: &str) -> HostEvent {
    HostEvent::Command {
        name: name.to_string(),
    }
}

fn tool(name: &str, params: Value) -> HostEvent {
    HostEvent::Tool {
        name: name.to_string(),
        params,
    }
}

fn write(path: &str) -> HostEvent {
    HostEvent::ToolCall(ToolCall::new("write", json!({ "path": path, "content": "x" })))
}

fn write_done() -> HostEvent {
    HostEvent::ToolResult(ToolResult {
        tool_name: "write".to_string(),
        is_error: false,
    })
}

fn turn_end(message: &str) -> HostEvent {
    HostEvent::TurnEnd(TurnEnd {
        last_message: Some(message.to_string()),
    })
}

fn tool_text(reply: EventReply) -> (bool, String) {
    match reply {
        EventReply::ToolResponse { text, success } => (success, text),
        other => panic!("expected tool response, got {other:?}"),
    }
}

fn decision(reply: EventReply) -> ToolDecision {
    match reply {
        EventReply::Decision(decision) => decision,
        other => panic!("expected decision, got {other:?}"),
    }
}

/// Start the flow, select T1 and confirm requirements "R"; leaves the flow in Dev.
fn enter_dev(flow: &mut Flow, host: &mut ScriptedHost) {
    flow.handle(command("start-flow"), host).expect("start");
    let (ok, _) = tool_text(
        flow.handle(tool("select-task", json!({ "name": "T1" })), host)
            .expect("select"),
    );
    assert!(ok);
    let (ok, _) = tool_text(
        flow.handle(tool("start-dev", json!({ "requirements": "R" })), host)
            .expect("start-dev"),
    );
    assert!(ok);
    assert_eq!(flow.current_state(), Some(StateName::Dev));
}

/// Full lifecycle: select → plan → red → green → refactor → review → idle.
#[test]
fn task_runs_from_selection_to_approval() {
    let ws = TestWorkspace::new();
    ws.write_tasks("- [ ] T1 - first task\n- [ ] T2 - later\n");
    let runner = ScriptedTestRunner::new([failing_run(), passing_run()]);
    let mut flow = ws.flow_with(runner.clone());
    let mut host = ScriptedHost::new().confirming([true, true, true]);

    flow.handle(command("start-flow"), &mut host).expect("start");
    assert_eq!(flow.current_state(), Some(StateName::Idle));
    assert!(host.messages()[0].contains("Your current state is: IDLE."));

    let (ok, text) = tool_text(
        flow.handle(tool("list-tasks", Value::Null), &mut host)
            .expect("list"),
    );
    assert!(ok);
    assert_eq!(text, "SUCCESS: your current open tasks are: T1,T2");

    let (ok, text) = tool_text(
        flow.handle(tool("select-task", json!({ "name": "T1" })), &mut host)
            .expect("select"),
    );
    assert!(ok, "{text}");
    assert!(text.starts_with("SUCCESS: You selected task \"T1\"."));
    assert!(text.contains("Task description: first task"));
    assert_eq!(flow.current_state(), Some(StateName::Plan));
    let record = flow.session().read_session().expect("session");
    assert_eq!(record.status, SessionStatus::Planning);
    assert_eq!(record.task_name, "T1");

    let blocked = decision(flow.handle(write("src/t1.ts"), &mut host).expect("call"));
    assert!(blocked.is_blocked());

    let (ok, text) = tool_text(
        flow.handle(tool("start-dev", json!({ "requirements": "R" })), &mut host)
            .expect("start-dev"),
    );
    assert!(ok, "{text}");
    assert!(text.contains("You are now in RED DEV phase."));
    assert_eq!(flow.tdd_phase(), TddPhase::Red);
    let record = flow.session().read_session().expect("session");
    assert_eq!(record.requirements, "R");
    assert_eq!(record.status, SessionStatus::Developing);
    assert_eq!(
        host.confirms_asked()[1],
        (
            "Planning Complete".to_string(),
            "Has the task been properly analyzed?\n\nRequirements:\nR".to_string()
        )
    );

    // RED: src is off limits, the test file is not.
    let src = decision(flow.handle(write("src/t1.ts"), &mut host).expect("call"));
    assert!(matches!(src, ToolDecision::Block { ref reason } if reason.contains("RED")));
    let test = decision(flow.handle(write("test/t1.spec"), &mut host).expect("call"));
    assert_eq!(test, ToolDecision::Allow);

    flow.handle(write_done(), &mut host).expect("result");
    assert_eq!(runner.calls(), 1);
    assert_eq!(flow.tdd_phase(), TddPhase::Green);
    let report = host.messages().last().expect("report");
    assert!(report.starts_with("## Test Results (TDD RED phase)"));
    assert!(report.contains("**Status:** FAILED"));
    assert!(report.contains("Phase advances to GREEN"));

    // GREEN: the implementation makes the test pass.
    let src = decision(flow.handle(write("src/t1.ts"), &mut host).expect("call"));
    assert_eq!(src, ToolDecision::Allow);
    flow.handle(write_done(), &mut host).expect("result");
    assert_eq!(runner.calls(), 2);
    assert_eq!(flow.tdd_phase(), TddPhase::Refactor);

    let (ok, text) = tool_text(
        flow.handle(tool("review-task", Value::Null), &mut host)
            .expect("review"),
    );
    assert!(ok, "{text}");
    assert!(text.starts_with(
        "SUCCESS: User reviewed the code implementation and approved it. Full review pipeline passed. Task completed!"
    ));
    assert_eq!(flow.current_state(), Some(StateName::Idle));
    assert!(flow.bound_task().is_none());
    assert_eq!(ws.read_tasks(), "- [x] T1 - first task\n- [ ] T2 - later\n");
    assert!(flow.session().read_session().is_none());
    assert!(ws.read_session_file().is_empty());
}

#[test]
fn rejected_review_returns_to_dev_with_phase_kept() {
    let ws = TestWorkspace::new();
    ws.write_tasks("- [ ] T1 - first task\n");
    let runner = ScriptedTestRunner::new([failing_run()]);
    let mut flow = ws.flow_with(runner.clone());
    let mut host = ScriptedHost::new().confirming([true, true, false]);
    enter_dev(&mut flow, &mut host);

    flow.handle(write("test/t1.spec"), &mut host).expect("call");
    flow.handle(write_done(), &mut host).expect("result");
    assert_eq!(flow.tdd_phase(), TddPhase::Green);

    let (ok, text) = tool_text(
        flow.handle(tool("review-task", Value::Null), &mut host)
            .expect("review"),
    );
    assert!(!ok);
    assert!(text.starts_with(
        "FAILED: User reviewed the code implementation and denied it. Fix the issues and submit again."
    ));
    assert_eq!(flow.current_state(), Some(StateName::Dev));
    assert_eq!(flow.tdd_phase(), TddPhase::Green);
    assert_eq!(
        flow.session().read_session().map(|r| r.status),
        Some(SessionStatus::Developing)
    );
    assert_eq!(ws.read_tasks(), "- [ ] T1 - first task\n");
}

#[test]
fn tests_only_run_after_a_permitted_edit() {
    let ws = TestWorkspace::new();
    ws.write_tasks("- [ ] T1 - first task\n");
    let runner = ScriptedTestRunner::new([failing_run()]);
    let mut flow = ws.flow_with(runner.clone());
    let mut host = ScriptedHost::new().confirming([true, true]);
    enter_dev(&mut flow, &mut host);

    // Non-write tools and blocked writes never trigger a run.
    flow.handle(
        HostEvent::ToolCall(ToolCall::new("read", json!({ "path": "src/t1.ts" }))),
        &mut host,
    )
    .expect("call");
    flow.handle(write_done(), &mut host).expect("result");
    flow.handle(write("src/t1.ts"), &mut host).expect("call");
    flow.handle(write_done(), &mut host).expect("result");
    assert_eq!(runner.calls(), 0);

    // An allowed edit only counts for the turn it happened in.
    flow.handle(write("test/t1.spec"), &mut host).expect("call");
    flow.handle(turn_end("pausing"), &mut host).expect("turn end");
    flow.handle(write_done(), &mut host).expect("result");
    assert_eq!(runner.calls(), 0);

    flow.handle(write("test/t1.spec"), &mut host).expect("call");
    flow.handle(write_done(), &mut host).expect("result");
    assert_eq!(runner.calls(), 1);
}

#[test]
fn completed_cycle_waits_for_done_acknowledgment() {
    let ws = TestWorkspace::new();
    ws.write_tasks("- [ ] T1 - first task\n");
    let runner = ScriptedTestRunner::new([failing_run(), passing_run(), passing_run()]);
    let mut flow = ws.flow_with(runner.clone());
    let mut host = ScriptedHost::new().confirming([true, true]);
    enter_dev(&mut flow, &mut host);

    for path in ["test/t1.spec", "src/t1.ts", "src/t1.ts"] {
        flow.handle(write(path), &mut host).expect("call");
        flow.handle(write_done(), &mut host).expect("result");
    }
    assert_eq!(runner.calls(), 3);
    assert_eq!(flow.tdd_phase(), TddPhase::Refactor);
    assert!(flow.awaiting_cycle_ack());
    assert!(host.messages().last().expect("report").contains("[DONE]"));

    // Suspended: further edits do not run the tests.
    flow.handle(write("src/t1.ts"), &mut host).expect("call");
    flow.handle(write_done(), &mut host).expect("result");
    assert_eq!(runner.calls(), 3);

    flow.handle(turn_end("Refactoring finished. [DONE]"), &mut host)
        .expect("turn end");
    assert!(!flow.awaiting_cycle_ack());
    assert_eq!(flow.tdd_phase(), TddPhase::Red);
    assert!(
        host.notifications()
            .iter()
            .any(|n| n == "TDD cycle complete. Starting a new RED phase.")
    );
    let nudge = host.messages().last().expect("nudge");
    assert!(nudge.starts_with("You are not done yet. Your current state is: DEV."));
}

#[test]
fn failed_test_command_counts_as_failure() {
    let ws = TestWorkspace::new();
    ws.write_tasks("- [ ] T1 - first task\n");
    // Nothing queued: the scripted runner errors like a command that cannot spawn.
    let runner = ScriptedTestRunner::default();
    let mut flow = ws.flow_with(runner.clone());
    let mut host = ScriptedHost::new().confirming([true, true]);
    enter_dev(&mut flow, &mut host);

    flow.handle(write("test/t1.spec"), &mut host).expect("call");
    flow.handle(write_done(), &mut host).expect("result");
    assert_eq!(runner.calls(), 1);
    assert_eq!(flow.tdd_phase(), TddPhase::Green);
    let report = host.messages().last().expect("report");
    assert!(report.contains("**Status:** FAILED"));
    assert!(report.contains("no scripted test run left"));
}

#[test]
fn stop_flow_deactivates_and_silences_hooks() {
    let ws = TestWorkspace::new();
    ws.write_tasks("- [ ] T1 - first task\n");
    let mut flow = ws.flow();
    let mut host = ScriptedHost::new().confirming([true]);
    flow.handle(command("start-flow"), &mut host).expect("start");
    flow.handle(tool("select-task", json!({ "name": "T1" })), &mut host)
        .expect("select");

    flow.handle(command("stop-flow"), &mut host).expect("stop");
    assert_eq!(flow.current_state(), None);
    assert!(!flow.plan_blocking());
    assert!(host.notifications().iter().any(|n| n == "Flow: Leaving PLAN"));

    let allowed = decision(flow.handle(write("src/t1.ts"), &mut host).expect("call"));
    assert_eq!(allowed, ToolDecision::Allow);
    let before = host.messages().len();
    flow.handle(turn_end("bye"), &mut host).expect("turn end");
    assert_eq!(host.messages().len(), before);

    // The session survives a stop so it can be resumed.
    assert!(flow.session().has_active_session());
}

#[test]
fn idle_blocks_writes_and_lists_no_tasks() {
    let ws = TestWorkspace::new();
    let mut flow = ws.flow();
    let mut host = ScriptedHost::new();
    flow.handle(command("start-flow"), &mut host).expect("start");

    let blocked = decision(flow.handle(write("test/a.spec"), &mut host).expect("call"));
    assert_eq!(
        blocked,
        ToolDecision::block("You are not allowed to write or edit files in IDLE state.")
    );
    let (ok, text) = tool_text(
        flow.handle(tool("list-tasks", Value::Null), &mut host)
            .expect("list"),
    );
    assert!(ok);
    assert!(text.starts_with("SUCCESS: no open tasks found."));

    flow.handle(command("list-tasks"), &mut host).expect("list command");
    assert_eq!(
        host.notifications().last().map(String::as_str),
        Some("No open tasks found")
    );
}

#[test]
fn folder_rules_gate_absolute_paths_under_the_root() {
    let mut config = FlowConfig::default();
    config.classifier.mode = ClassifierMode::Folders;
    let ws = TestWorkspace::with_config(config);
    ws.write_tasks("- [ ] T1 - first task\n");
    let mut flow = ws.flow();
    let mut host = ScriptedHost::new().confirming([true, true]);
    enter_dev(&mut flow, &mut host);

    let src = ws.root().join("src").join("a.ts");
    let blocked = decision(
        flow.handle(write(&src.to_string_lossy()), &mut host)
            .expect("call"),
    );
    assert!(blocked.is_blocked());

    let test = ws.root().join("test").join("a.spec");
    let allowed = decision(
        flow.handle(write(&test.to_string_lossy()), &mut host)
            .expect("call"),
    );
    assert_eq!(allowed, ToolDecision::Allow);
}

#[test]
fn failed_write_does_not_run_the_tests() {
    let ws = TestWorkspace::new();
    ws.write_tasks("- [ ] T1 - first task\n");
    let runner = ScriptedTestRunner::new([failing_run()]);
    let mut flow = ws.flow_with(runner.clone());
    let mut host = ScriptedHost::new().confirming([true, true]);
    enter_dev(&mut flow, &mut host);

    flow.handle(write("test/t1.spec"), &mut host).expect("call");
    flow.handle(
        HostEvent::ToolResult(ToolResult {
            tool_name: "write".to_string(),
            is_error: true,
        }),
        &mut host,
    )
    .expect("result");
    assert_eq!(runner.calls(), 0);
    assert_eq!(flow.tdd_phase(), TddPhase::Red);

    flow.handle(write("test/t1.spec"), &mut host).expect("call");
    flow.handle(write_done(), &mut host).expect("result");
    assert_eq!(runner.calls(), 1);
}
