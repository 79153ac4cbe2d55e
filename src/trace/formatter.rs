use super::{RunTrace, TraceEvent};
use itertools::Itertools;

/// Formats run traces into human-readable strings.
pub struct TraceFormatter;

impl TraceFormatter {
    /// One line per event, numbered in order.
    pub fn format_trace(trace: &RunTrace) -> String {
        trace
            .events()
            .iter()
            .enumerate()
            .map(|(i, event)| format!("{:>3}. {}", i + 1, Self::format_event(event)))
            .join("\n")
    }

    fn format_event(event: &TraceEvent) -> String {
        match event {
            TraceEvent::EntryPoint {
                invocation,
                passed: true,
            } => format!("entry point '{}' accepted the trigger", invocation),
            TraceEvent::EntryPoint {
                invocation,
                passed: false,
            } => format!("entry point '{}' rejected the record type", invocation),
            TraceEvent::Executed(name) => format!("executed '{}'", name),
            TraceEvent::Blocked {
                invocation,
                awaiting,
            } => format!(
                "'{}' blocked, waiting for {{{}}}",
                invocation,
                awaiting.join(", ")
            ),
            TraceEvent::Resumed(name) => format!("resumed '{}'", name),
            TraceEvent::Branch {
                invocation,
                outcome,
                targets,
            } if targets.is_empty() => {
                format!("'{}' evaluated {}, no branch declared", invocation, outcome)
            }
            TraceEvent::Branch {
                invocation,
                outcome,
                targets,
            } => format!(
                "'{}' evaluated {}, continuing with {}",
                invocation,
                outcome,
                targets.iter().map(|t| format!("'{}'", t)).join(", ")
            ),
            TraceEvent::SubProcess {
                invocation,
                process,
            } => format!("'{}' ran sub-process '{}'", invocation, process),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbered_lines() {
        let mut trace = RunTrace::default();
        trace.push(TraceEvent::EntryPoint {
            invocation: "Start".into(),
            passed: true,
        });
        trace.push(TraceEvent::Branch {
            invocation: "Check".into(),
            outcome: false,
            targets: vec![],
        });
        let text = TraceFormatter::format_trace(&trace);
        assert_eq!(
            text,
            "  1. entry point 'Start' accepted the trigger\n  2. 'Check' evaluated false, no branch declared"
        );
    }
}
