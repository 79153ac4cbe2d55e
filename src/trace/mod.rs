//! Per-run execution trace.

mod formatter;

pub use formatter::TraceFormatter;

use serde::{Deserialize, Serialize};

/// One observable step of a process run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceEvent {
    EntryPoint { invocation: String, passed: bool },
    Executed(String),
    Blocked { invocation: String, awaiting: Vec<String> },
    Resumed(String),
    Branch {
        invocation: String,
        outcome: bool,
        targets: Vec<String>,
    },
    SubProcess { invocation: String, process: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTrace {
    events: Vec<TraceEvent>,
}

impl RunTrace {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Names of the invocations that ran, in execution order.
    /// Conditionals count as executed once their condition is evaluated.
    pub fn executed(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::EntryPoint {
                    invocation,
                    passed: true,
                } => Some(invocation.as_str()),
                TraceEvent::Executed(name) => Some(name.as_str()),
                TraceEvent::Branch { invocation, .. } => Some(invocation.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn was_executed(&self, invocation: &str) -> bool {
        self.executed().contains(&invocation)
    }
}
