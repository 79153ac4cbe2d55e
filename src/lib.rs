//! # Tejun - Process Graph Compiler and Dataflow Engine
//!
//! **Tejun** validates and executes record-triggered business processes. A
//! process is a graph of invocations of reusable actions (or of other
//! processes), ordered by transitions and wired together by parameter
//! assignments.
//!
//! ## Core Workflow
//!
//! 1.  **Model**: Build a [`model::Process`] in code or load it from JSON.
//! 2.  **Validate**: Run it through [`compiler::ProcessValidator`]. Validation
//!     standardizes references, checks the entry point, detects ambiguous
//!     producers and narrows output types. Errors accumulate.
//! 3.  **Execute**: Prepare a [`executor::ProcessExecutor`] for the validated
//!     snapshot and run it with a trigger record as many times as needed.
//!
//! [`service::ProcessService`] bundles these steps with a repository and an
//! executor cache.
//!
//! ## Quick Start
//!
//! ```rust
//! use tejun::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let mut process = Process::new("p-1", "Stamp_Invoice")
//!     .with_input("trigger", DataType::Record("Invoice".into()))
//!     .with_invocation(Invocation::new("Created", Action::record_create()))
//!     .with_invocation(
//!         Invocation::new("Stamp", Action::field_update()).with_attribute("status", "stamped"),
//!     )
//!     .with_transition("Created", "Stamp")
//!     .with_assignment(ParamAssignment::from_process_input("trigger", "Created", "record"))
//!     .with_assignment(ParamAssignment::link("Created", "record", "Stamp", "record"));
//!
//! let catalog = TypeCatalog::new();
//! let validation = ProcessValidator::new(&catalog).validate(&mut process);
//! assert!(validation.is_valid(), "{:?}", validation.messages());
//!
//! let records = Arc::new(MemoryRecordStore::new());
//! let id = records.insert(Record::new("Invoice"))?;
//!
//! let mut executor = ProcessExecutor::builder(records.clone(), ActionRegistry::new()).build();
//! executor.prepare(Arc::new(process))?;
//!
//! let mut inputs = AHashMap::new();
//! inputs.insert("trigger".to_string(), Value::Record(Record::reference("Invoice", id.as_str())));
//! let result = executor.execute(inputs)?;
//!
//! assert!(result.passed_entry_point);
//! let stored = records.get("Invoice", &id).ok_or("missing record")?;
//! assert_eq!(stored.field("status"), Some(Value::from("stamped")));
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod condition;
pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod prelude;
pub mod service;
pub mod store;
pub mod trace;
