//! Tests for recording a run and navigating its history.
//!
//! Sessions are driven against a `MemoryHost`, which records every
//! highlight, cue and error the session reports.

extern crate manual_stepper;

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

use manual_stepper::analysis::Linkage;
use manual_stepper::session::{
    BreakpointPayload, Host, ManualConfig, MemoryHost, Session, SessionState, VariableRole,
    VariableSpec,
};

const LOOP_PROGRAM: &str =
    "var s = 0;\nfor (var i = 0; i < 3; i++) {\n  s = s + i;\n}\nview([[\"s\", \"total\"]]);";

const LOOP_VIEW_PROGRAM: &str = "var total = 0;\nfor (var i = 0; i < 3; i++) {\n  total += i;\n  view([[\"total\", \"running\"], [\"i\", \"index\"]]);\n}";

const SPEED_FUNCTION: &str = "function({ speed }) {\n  var local = vars.speed;\n  local = local + 1;\n  // @view local->\"Local\"\n  return local * 10;\n}";

fn session() -> Session<MemoryHost> {
    Session::new(MemoryHost::default())
}

fn variable(id: &str, role: VariableRole, default: Value) -> VariableSpec {
    VariableSpec {
        id: id.to_string(),
        role,
        default,
        member_of: None,
    }
}

fn speed_config() -> ManualConfig {
    ManualConfig {
        manual_function: Some(SPEED_FUNCTION.to_string()),
        variables: vec![
            variable("speed", VariableRole::Input, json!(3)),
            variable("result", VariableRole::Computed, Value::Null),
        ],
        output: Some("result".to_string()),
        ..Default::default()
    }
}

/// Helper to refresh a fresh session with a raw program.
fn recorded(program: &str) -> Session<MemoryHost> {
    let mut session = session();
    session.refresh(program, &ManualConfig::default());
    session
}

/// The history as JSON with the timestamps removed.
fn snapshot(session: &Session<MemoryHost>) -> Vec<Value> {
    session
        .history()
        .steps()
        .iter()
        .map(|step| {
            let mut value = serde_json::to_value(step).unwrap();
            if let Value::Object(map) = &mut value {
                map.remove("timestamp");
            }
            value
        })
        .collect()
}

fn strictly_increasing(points: &[usize]) -> bool {
    points.windows(2).all(|pair| pair[0] < pair[1])
}

// ============================================================================
// Recording
// ============================================================================

mod recording_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_run_records_one_breakpoint() {
        let mut session = recorded(LOOP_PROGRAM);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.execution_error(), None);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.breakpoint_points().len(), 1);

        assert!(session.step_to_next_breakpoint());
        let step = session.current_step().unwrap();
        assert_eq!(step.index, session.breakpoint_points()[0]);
        assert_eq!(step.variables.get("s"), Some(&json!(3)));
        match &step.breakpoint {
            Some(BreakpointPayload::View(entries)) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].expression, "s");
                assert_eq!(entries[0].description, "total");
                assert_eq!(entries[0].value, json!(3));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_first_entry_is_the_initial_state() {
        let session = recorded(LOOP_PROGRAM);
        let first = session.history().get(0).unwrap();
        assert_eq!(first.node_type, "Program");
        assert_eq!(first.stack_trace, vec!["Frame 0: Program".to_string()]);
        assert!(first.breakpoint.is_none());
    }

    #[test]
    fn test_refresh_is_repeatable() {
        let mut session = recorded(LOOP_PROGRAM);
        let first = snapshot(&session);
        session.refresh(LOOP_PROGRAM, &ManualConfig::default());
        assert_eq!(snapshot(&session), first);
    }

    #[test]
    fn test_breakpoints_in_a_loop() {
        let mut session = recorded(LOOP_VIEW_PROGRAM);
        let points = session.breakpoint_points().to_vec();
        assert_eq!(points.len(), 3);
        assert!(strictly_increasing(&points));
        assert!(strictly_increasing(session.block_points()));
        assert!(!session.block_points().is_empty());

        let mut totals = vec![];
        while session.step_to_next_breakpoint() {
            if let Some(BreakpointPayload::View(entries)) = &session.current_step().unwrap().breakpoint {
                assert_eq!(entries.len(), 2);
                totals.push(entries[0].value.clone());
            }
        }
        assert_eq!(totals, vec![json!(0), json!(1), json!(3)]);
    }

    #[test]
    fn test_step_payload() {
        let program = "var x = 4;\nstep({value: \"x * 2\", description: \"Double\", formulas: [[\"2x\", \"twice\"]]});";
        let session = recorded(program);
        let index = session.breakpoint_points()[0];
        match &session.history().get(index).unwrap().breakpoint {
            Some(BreakpointPayload::Step(payload)) => {
                assert_eq!(payload.value, json!(8));
                assert_eq!(payload.description.as_deref(), Some("Double"));
                assert_eq!(payload.formulas, vec![("2x".to_string(), "twice".to_string())]);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_payload_becomes_view_error() {
        let session = recorded("var a = 1;\nview([[\"nope + 1\", \"broken\"]]);");
        let index = session.breakpoint_points()[0];
        match &session.history().get(index).unwrap().breakpoint {
            Some(BreakpointPayload::View(entries)) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].expression, "[View Error]");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
        assert_eq!(session.execution_error(), None);
    }

    #[test]
    fn test_payload_lands_on_the_next_block_entry() {
        let session = recorded("function f() { var a = 1; view([[\"a\", \"A\"]]); var b = 2; }\nf();");
        let points = session.breakpoint_points();
        assert_eq!(points.len(), 1);
        assert!(points[0] < session.history_len() - 1);
        for point in points {
            assert!(session.block_points().contains(point));
        }
        let step = session.history().get(points[0]).unwrap();
        assert_eq!(step.node_type, "BlockStatement");
        assert_eq!(step.variables.get("a"), Some(&json!(1)));
        assert_eq!(step.variables.get("b"), Some(&Value::Null));
    }

    #[test]
    fn test_breakpoints_in_loops_are_block_points() {
        let session = recorded(LOOP_VIEW_PROGRAM);
        assert!(session
            .breakpoint_points()
            .iter()
            .all(|point| session.block_points().contains(point)));
    }

    #[test]
    fn test_top_level_payload_falls_back_to_the_last_entry() {
        let session = recorded(LOOP_PROGRAM);
        assert_eq!(session.breakpoint_points(), &[session.history_len() - 1]);
    }

    #[test]
    fn test_breakpoint_as_last_statement_of_function() {
        let session = recorded("function f() {\n  var a = 2;\n  view([[\"a\", \"A\"]]);\n}\nf();");
        assert_eq!(session.breakpoint_points().len(), 1);
        assert!(session.breakpoint_points()[0] < session.history_len());
    }

    #[test]
    fn test_stack_trace_names_functions() {
        let mut session = recorded("function inner() {\n  return 1;\n}\ninner();");
        let mut saw_inner = false;
        while session.step_forward() {
            let trace = &session.current_step().unwrap().stack_trace;
            if trace.first().map(|l| l.ends_with("(inner)")).unwrap_or(false) {
                assert!(trace.last().unwrap().starts_with(&format!("Frame {}: Program", trace.len() - 1)));
                saw_inner = true;
            }
        }
        assert!(saw_inner);
    }

    #[test]
    fn test_runtime_error_keeps_partial_history() {
        let mut session = recorded("var a = 1;\nvar b = missing + 1;\nvar c = 3;");
        let error = session.execution_error().unwrap().to_string();
        assert!(error.contains("missing is not defined"));
        assert_eq!(session.host().errors, vec![error]);
        assert!(session.history_len() > 1);
        assert!(session.step_to_index(session.history_len() - 1));
        let last = session.current_step().unwrap();
        assert_eq!(last.variables.get("a"), Some(&json!(1)));
        assert_eq!(last.variables.get("c"), Some(&Value::Null));
    }

    #[test]
    fn test_step_budget() {
        let config = ManualConfig {
            max_steps: Some(20),
            ..Default::default()
        };
        let mut session = session();
        session.refresh("while (true) {}", &config);
        assert_eq!(
            session.execution_error(),
            Some("Execution stopped after 20 steps")
        );
        assert_eq!(session.history_len(), 21);
    }

    #[test]
    fn test_unparsable_program_has_empty_history() {
        let mut session = recorded("var = ;");
        assert!(session.execution_error().is_some());
        assert_eq!(session.history_len(), 0);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.step_forward());
        assert!(!session.step_to_index(0));
    }

    #[test]
    fn test_blank_program_is_not_ready() {
        let mut session = recorded("   ");
        assert_eq!(
            session.execution_error(),
            Some("Uncaught syntax error: Program text is empty.")
        );
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.host().highlighted, None);
        assert!(!session.step_to_next_breakpoint());
    }
}

// ============================================================================
// Navigation
// ============================================================================

mod navigation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_idle_session_does_not_move() {
        let mut session = session();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.step_forward());
        assert!(!session.step_to_next_breakpoint());
        assert!(!session.step_to_index(0));
    }

    #[test]
    fn test_forward_and_back() {
        let mut session = recorded(LOOP_PROGRAM);
        assert!(!session.step_backward());
        assert!(session.step_forward());
        assert!(session.step_forward());
        assert!(session.step_forward());
        assert!(session.step_backward());
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn test_step_to_index_bounds() {
        let mut session = recorded(LOOP_PROGRAM);
        let len = session.history_len();
        assert!(!session.step_to_index(len));
        assert_eq!(session.current_index(), 0);
        assert!(session.step_to_index(len - 1));
        assert_eq!(session.current_index(), len - 1);
        assert!(!session.step_forward());
        assert!(session.step_to_index(0));
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_block_navigation() {
        let mut session = recorded(LOOP_PROGRAM);
        let blocks = session.block_points().to_vec();
        assert!(blocks.len() >= 2);
        assert!(!session.step_to_prev_block());

        assert!(session.step_to_next_block());
        assert_eq!(session.current_index(), blocks[0]);
        assert_eq!(session.current_step().unwrap().node_type, "BlockStatement");

        let body_start = LOOP_PROGRAM.find('{').unwrap();
        let body_entry = session
            .history()
            .steps()
            .iter()
            .find(|step| step.node_type == "BlockStatement" && step.highlight.start == body_start)
            .unwrap();
        assert!(blocks.contains(&body_entry.index));

        assert!(session.step_to_next_block());
        assert_eq!(session.current_index(), blocks[1]);
        assert!(session.step_to_prev_block());
        assert_eq!(session.current_index(), blocks[0]);
    }

    #[test]
    fn test_breakpoint_navigation_stops_at_the_ends() {
        let mut session = recorded(LOOP_VIEW_PROGRAM);
        let points = session.breakpoint_points().to_vec();
        assert!(!session.step_to_prev_breakpoint());
        assert!(session.step_to_index(points[2]));
        assert!(!session.step_to_next_breakpoint());
        assert!(session.step_to_index(session.history_len() - 1));
        assert!(session.step_to_prev_breakpoint());
        assert_eq!(session.current_index(), points[2]);
        assert!(session.step_to_prev_breakpoint());
        assert_eq!(session.current_index(), points[1]);
    }

    #[test]
    fn test_highlight_follows_the_index() {
        let mut session = recorded(LOOP_PROGRAM);
        assert_eq!(session.host().highlighted, None);
        assert!(session.step_to_next_breakpoint());
        let step = session.current_step().unwrap();
        assert_eq!(session.host().highlighted, Some(step.highlight));
        assert!(step.highlight.start <= step.highlight.end);
        assert!(step.highlight.end <= session.program_text().len());
    }
}

// ============================================================================
// Host interaction
// ============================================================================

mod host_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loaded() -> Session<MemoryHost> {
        let config = speed_config();
        let mut session = Session::new(MemoryHost::new(config.default_values()));
        assert!(session.load(&config));
        session
    }

    #[test]
    fn test_load_without_config_function() {
        let mut session = session();
        assert!(!session.load(&ManualConfig::default()));
        assert_eq!(
            session.execution_error(),
            Some("The configuration does not define a manual function")
        );
        assert_eq!(session.host().errors.len(), 1);
    }

    #[test]
    fn test_result_is_published() {
        let session = loaded();
        assert_eq!(session.execution_error(), None);
        assert_eq!(session.host().values.get("result"), Some(&json!(40)));
        assert_eq!(session.linkage().get("__result"), Some(&Linkage::Single("result".to_string())));
        assert_eq!(session.linkage().get("local"), Some(&Linkage::Single("speed".to_string())));
    }

    #[test]
    fn test_arrival_restores_linked_locals() {
        let mut session = loaded();
        assert!(session.step_to_next_breakpoint());
        assert_eq!(session.current_step().unwrap().variables.get("local"), Some(&json!(4)));
        assert_eq!(session.host().values.get("speed"), Some(&json!(4)));
        assert!(session.active_variables().contains(&"speed".to_string()));
    }

    #[test]
    fn test_refresh_resets_inputs_only() {
        let mut session = loaded();
        assert!(session.step_to_next_breakpoint());
        session.host_mut().set_external_value("result", json!("stale"));
        let config = speed_config();
        let program = session.program_text().to_string();
        session.refresh(&program, &config);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.active_variables(), &[] as &[String]);
        assert_eq!(session.host().values.get("speed"), Some(&json!(3)));
        assert_eq!(session.host().values.get("result"), Some(&json!(40)));
        assert_eq!(session.host().highlighted, None);
    }

    #[test]
    fn test_cue_waits_for_flush() {
        let mut session = loaded();
        let mut previous = session.current_step().unwrap().variables.get("local").cloned();
        loop {
            assert!(session.step_forward());
            let current = session.current_step().unwrap().variables.get("local").cloned();
            if current != previous {
                break;
            }
            previous = current;
        }
        assert!(session.host().cued.is_empty());
        session.flush_visual_cues();
        assert_eq!(session.host().cued, vec!["speed".to_string()]);

        session.step_backward();
        session.flush_visual_cues();
        assert_eq!(session.host().cued, vec!["speed".to_string()]);
    }

    #[test]
    fn test_highlight_maps_into_display_text() {
        let mut session = loaded();
        let display = session.display_text().unwrap().to_string();
        assert!(display.starts_with("function({ speed }) {"));
        assert!(session.step_to_next_breakpoint());
        let range = session.host().highlighted.unwrap();
        assert!(range.end <= display.len());
        assert!(display[range.start..range.end].contains("view([["));

        assert!(session.step_backward());
        let range = session.host().highlighted.unwrap();
        let line = &display[range.start..range.end];
        assert!(!line.contains('\n'));
        assert!(line.contains("view([["));
    }

    #[test]
    fn test_autoplay_walks_breakpoints() {
        let mut session = loaded();
        let start = Instant::now();
        let interval = Duration::from_millis(10);
        session.play(interval, start);
        assert!(session.is_playing());
        assert!(!session.tick(start));
        assert!(session.tick(start + interval));
        assert_eq!(session.current_index(), session.breakpoint_points()[0]);
        assert!(!session.tick(start + interval * 2));
        assert!(!session.is_playing());
    }

    #[test]
    fn test_refresh_stops_autoplay() {
        let mut session = loaded();
        session.play(Duration::from_millis(10), Instant::now());
        let program = session.program_text().to_string();
        session.refresh(&program, &speed_config());
        assert!(!session.is_playing());
        session.play(Duration::from_millis(10), Instant::now());
        session.pause();
        assert!(!session.is_playing());
    }

    #[test]
    fn test_computed_values_are_not_restored() {
        let mut values = Map::new();
        values.insert("speed".to_string(), json!(3));
        values.insert("result".to_string(), json!(-1));
        let mut session = Session::new(MemoryHost::new(values));
        let mut config = speed_config();
        config.output = None;
        assert!(session.load(&config));
        assert_eq!(session.host().values.get("result"), Some(&json!(-1)));
    }
}
