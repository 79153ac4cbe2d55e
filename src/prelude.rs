//! Prelude module for convenient imports
//!
//! Re-exports the types needed to build, validate and run a process.
//!
//! # Example
//!
//! ```rust,no_run
//! use tejun::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/process.json")?;
//! let mut process: Process = serde_json::from_str(&json)?;
//!
//! let catalog = TypeCatalog::new();
//! let validation = ProcessValidator::new(&catalog).validate(&mut process);
//! for message in validation.messages() {
//!     println!("{}", message);
//! }
//! # Ok(())
//! # }
//! ```

// Validation
pub use crate::compiler::{OutputNarrower, ProcessValidator, ValidationResult};

// Execution
pub use crate::config::EngineConfig;
pub use crate::executor::{
    ActionContext, ActionImplementation, ActionInstance, ActionRegistry, FnAction,
    ProcessExecutor, ProcessResult,
};
pub use crate::service::ProcessService;

// Model
pub use crate::model::{
    Action, ActionType, DataType, Invocation, ParamAssignment, Parameter, Process, Record,
    RecordType, TypeCatalog, Value,
};

// Storage
pub use crate::store::{
    MemoryProcessRepository, MemoryRecordStore, ProcessRepository, RecordService,
};

// Error types
pub use crate::error::{ActionError, DeclarationError, ExecutionError, ServiceError};

// Trace formatting
pub use crate::trace::{RunTrace, TraceEvent, TraceFormatter};

pub use ahash::AHashMap;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
