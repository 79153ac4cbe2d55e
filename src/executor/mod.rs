//! The dataflow executor.
//!
//! A [`ProcessExecutor`] is prepared once for a process snapshot and then run
//! any number of times. A run starts at the entry point, sweeps the graph
//! depth-first from every starting invocation, and resolves invocations that
//! blocked on missing inputs in a fixpoint loop until nothing is left blocked.

mod bindings;
mod builtins;
mod state;

pub use bindings::{ActionContext, ActionImplementation, ActionInstance, ActionRegistry, FnAction};

use crate::compiler::accepted_types;
use crate::condition::{CompiledCondition, PathRef, condition_key};
use crate::config::EngineConfig;
use crate::error::{AwaitedInput, BlockedInvocation, ConditionError, ExecutionError};
use crate::model::{
    Action, ActionType, CONDITION_ATTR, Callable, GraphIndex, IF_FALSE_ATTR, IF_TRUE_ATTR,
    Process, RECORD_PARAM, TypeCatalog, Value, ValueSource, ValueTarget,
};
use crate::store::RecordService;
use crate::trace::{RunTrace, TraceEvent};
use ahash::AHashMap;
use bindings::BindingCache;
use state::{Gathered, MissingInputs, RunState, Visit};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one process run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    /// False when the entry point's type filter rejected the trigger record.
    pub passed_entry_point: bool,
    pub outputs: AHashMap<String, Value>,
    pub trace: RunTrace,
}

/// Collaborators shared by an executor and its nested sub-process executors.
#[derive(Clone)]
pub(crate) struct ServiceHandles {
    pub(crate) records: Arc<dyn RecordService>,
    pub(crate) actions: ActionRegistry,
    pub(crate) conditions: Arc<crate::condition::ConditionCache>,
    pub(crate) catalog: Arc<TypeCatalog>,
    pub(crate) config: EngineConfig,
}

/// Immutable topology of the prepared process.
struct Prepared {
    process: Arc<Process>,
    graph: GraphIndex,
    starting: Vec<usize>,
    entry: usize,
    conditions: AHashMap<usize, Arc<CompiledCondition>>,
    /// Assignment indices feeding each invocation.
    assignments_by_target: Vec<Vec<usize>>,
}

pub struct ExecutorBuilder {
    records: Arc<dyn RecordService>,
    actions: ActionRegistry,
    conditions: Option<Arc<crate::condition::ConditionCache>>,
    catalog: Option<Arc<TypeCatalog>>,
    config: EngineConfig,
}

impl ExecutorBuilder {
    pub fn new(records: Arc<dyn RecordService>, actions: ActionRegistry) -> Self {
        Self {
            records,
            actions,
            conditions: None,
            catalog: None,
            config: EngineConfig::default(),
        }
    }

    /// Shares a condition cache with other executors.
    pub fn with_conditions(mut self, conditions: Arc<crate::condition::ConditionCache>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<TypeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ProcessExecutor {
        let services = ServiceHandles {
            records: self.records,
            actions: self.actions,
            conditions: self.conditions.unwrap_or_default(),
            catalog: self.catalog.unwrap_or_default(),
            config: self.config,
        };
        ProcessExecutor::with_services(services, 0)
    }
}

pub struct ProcessExecutor {
    services: ServiceHandles,
    prepared: Option<Arc<Prepared>>,
    bindings: BindingCache,
    /// Nested executors by sub-process id, kept for the executor's lifetime.
    sub_executors: AHashMap<String, ProcessExecutor>,
    depth: usize,
    state: RunState,
}

impl ProcessExecutor {
    pub fn builder(records: Arc<dyn RecordService>, actions: ActionRegistry) -> ExecutorBuilder {
        ExecutorBuilder::new(records, actions)
    }

    fn with_services(services: ServiceHandles, depth: usize) -> Self {
        Self {
            services,
            prepared: None,
            bindings: BindingCache::default(),
            sub_executors: AHashMap::new(),
            depth,
            state: RunState::default(),
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    /// `last_modified` of the snapshot this executor is bound to.
    pub fn prepared_version(&self) -> Option<u64> {
        self.prepared.as_ref().map(|p| p.process.last_modified)
    }

    pub fn sub_executor_count(&self) -> usize {
        self.sub_executors.len()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Forgets every resolved accessor binding, here and in nested executors.
    /// Required after action implementations are re-registered.
    pub fn invalidate_bindings(&mut self) {
        self.bindings.clear();
        for sub in self.sub_executors.values_mut() {
            sub.invalidate_bindings();
        }
    }

    /// Binds the executor to one process snapshot.
    pub fn prepare(&mut self, process: Arc<Process>) -> Result<(), ExecutionError> {
        if process.invocations.is_empty() {
            return Err(ExecutionError::EmptyProcess(process.name.clone()));
        }

        let graph = GraphIndex::build(&process);
        let starting = graph.starting_points();
        let entries: Vec<usize> = starting
            .iter()
            .copied()
            .filter(|&idx| {
                process.invocations[idx]
                    .action_type()
                    .is_some_and(ActionType::is_trigger)
            })
            .collect();
        let entry = match entries.as_slice() {
            [single] => *single,
            [] => return Err(ExecutionError::NoEntryPoint(process.name.clone())),
            many => {
                return Err(ExecutionError::MultipleEntryPoints {
                    process: process.name.clone(),
                    names: many
                        .iter()
                        .map(|&idx| process.invocations[idx].name.clone())
                        .collect(),
                });
            }
        };

        let mut conditions = AHashMap::new();
        for (idx, invocation) in process.invocations.iter().enumerate() {
            if !invocation.is_conditional() {
                continue;
            }
            let source = invocation
                .attribute(CONDITION_ATTR)
                .ok_or_else(|| ExecutionError::MissingCondition(invocation.name.clone()))?;
            let key = condition_key(&process.id, invocation.id.as_deref(), &invocation.name);
            let compiled = self
                .services
                .conditions
                .compile(&key, source)
                .map_err(|source| ExecutionError::Condition {
                    invocation: invocation.name.clone(),
                    source,
                })?;
            conditions.insert(idx, compiled);
        }

        let mut assignments_by_target = vec![Vec::new(); process.invocations.len()];
        for (a, assignment) in process.param_assignments.iter().enumerate() {
            if let Some(idx) = assignment
                .target_invocation()
                .and_then(|name| graph.index_of(name))
            {
                assignments_by_target[idx].push(a);
            }
        }

        debug!(
            process = %process.name,
            version = process.last_modified,
            entry = %process.invocations[entry].name,
            "prepared executor"
        );
        // Pooled sub-executors are bound to the previous snapshot's callees.
        self.sub_executors.clear();
        self.prepared = Some(Arc::new(Prepared {
            process,
            graph,
            starting,
            entry,
            conditions,
            assignments_by_target,
        }));
        Ok(())
    }

    /// Prepares on first use, then executes. Fails when `process` is a
    /// different version than the one this executor was prepared for.
    pub fn run(
        &mut self,
        process: Arc<Process>,
        inputs: AHashMap<String, Value>,
    ) -> Result<ProcessResult, ExecutionError> {
        match &self.prepared {
            None => self.prepare(process)?,
            Some(prepared) => {
                let bound = &prepared.process;
                if bound.id != process.id || bound.last_modified != process.last_modified {
                    return Err(ExecutionError::StaleProcess {
                        process: process.name.clone(),
                        prepared: bound.last_modified,
                        requested: process.last_modified,
                    });
                }
            }
        }
        self.execute(inputs)
    }

    /// Runs the prepared process with the given process inputs.
    pub fn execute(
        &mut self,
        inputs: AHashMap<String, Value>,
    ) -> Result<ProcessResult, ExecutionError> {
        let prepared = Arc::clone(self.prepared.as_ref().ok_or(ExecutionError::NotPrepared)?);
        self.state = RunState::default();
        if self.services.config.refresh_bindings_each_run {
            self.bindings.clear();
        }
        info!(process = %prepared.process.name, depth = self.depth, "executing process");

        if !self.run_entry_point(&prepared, &inputs)? {
            return Ok(ProcessResult {
                passed_entry_point: false,
                outputs: AHashMap::new(),
                trace: std::mem::take(&mut self.state.trace),
            });
        }

        let mut proceed = vec![(prepared.entry, None)];
        for &start in &prepared.starting {
            if start == prepared.entry {
                continue;
            }
            if let Visit::Proceed(filter) = self.visit(&prepared, start, &inputs)? {
                proceed.push((start, filter));
            }
        }
        for (start, filter) in proceed {
            self.descend(&prepared, start, filter.as_deref(), &inputs)?;
        }

        self.resolve_blocked(&prepared, &inputs)?;
        let outputs = self.collect_outputs(&prepared)?;
        info!(process = %prepared.process.name, outputs = outputs.len(), "process finished");
        Ok(ProcessResult {
            passed_entry_point: true,
            outputs,
            trace: std::mem::take(&mut self.state.trace),
        })
    }

    /// Binds the trigger record and applies the entry point's type filter.
    fn run_entry_point(
        &mut self,
        prepared: &Prepared,
        inputs: &AHashMap<String, Value>,
    ) -> Result<bool, ExecutionError> {
        let entry = &prepared.process.invocations[prepared.entry];
        if !entry.action_type().is_some_and(ActionType::is_trigger) {
            return Err(ExecutionError::UnsupportedEntryPoint {
                invocation: entry.name.clone(),
            });
        }

        let mut record = Value::Null;
        for &a in &prepared.assignments_by_target[prepared.entry] {
            let assignment = &prepared.process.param_assignments[a];
            match &assignment.source {
                ValueSource::ProcessInput(param)
                    if assignment.targets_input(&entry.name, RECORD_PARAM) =>
                {
                    record = inputs
                        .get(&param.name)
                        .cloned()
                        .ok_or_else(|| ExecutionError::MissingProcessInput(param.name.clone()))?;
                }
                _ => {
                    return Err(ExecutionError::InvalidEntryPointAssignment {
                        invocation: entry.name.clone(),
                    });
                }
            }
        }

        let accepted = accepted_types(entry);
        if !accepted.is_empty() {
            let type_name = match &record {
                Value::Record(r) => r.type_name.as_str(),
                other => {
                    return Err(ExecutionError::EntryPointNotRecord {
                        invocation: entry.name.clone(),
                        found: other.kind(),
                    });
                }
            };
            if !accepted.iter().any(|t| t == type_name) {
                info!(entry = %entry.name, record_type = type_name, "record type not accepted by entry point");
                self.state.trace.push(TraceEvent::EntryPoint {
                    invocation: entry.name.clone(),
                    passed: false,
                });
                return Ok(false);
            }
        }

        if let Value::Record(r) = record {
            record = Value::Record(builtins::hydrate(&self.services, entry, r)?);
        }
        let mut outputs = AHashMap::new();
        outputs.insert(RECORD_PARAM.to_string(), record);
        self.state.results.insert(prepared.entry, outputs);
        self.state.trace.push(TraceEvent::EntryPoint {
            invocation: entry.name.clone(),
            passed: true,
        });
        Ok(true)
    }

    /// Follows the outgoing transitions of `from`, depth-first.
    fn descend(
        &mut self,
        prepared: &Prepared,
        from: usize,
        filter: Option<&[usize]>,
        inputs: &AHashMap<String, Value>,
    ) -> Result<(), ExecutionError> {
        for &next in prepared.graph.successors(from) {
            if filter.is_some_and(|allowed| !allowed.contains(&next)) {
                continue;
            }
            if let Visit::Proceed(next_filter) = self.visit(prepared, next, inputs)? {
                self.descend(prepared, next, next_filter.as_deref(), inputs)?;
            }
        }
        Ok(())
    }

    fn visit(
        &mut self,
        prepared: &Prepared,
        idx: usize,
        inputs: &AHashMap<String, Value>,
    ) -> Result<Visit, ExecutionError> {
        if self.state.has_executed(idx) {
            return Ok(Visit::Done);
        }

        let outcome = if prepared.process.invocations[idx].is_conditional() {
            self.evaluate_conditional(prepared, idx)?
        } else {
            self.execute_invocation(prepared, idx, inputs)?
        };

        match outcome {
            Ok(filter) => {
                self.state.blocked.remove(&idx);
                Ok(Visit::Proceed(filter))
            }
            Err(missing) => {
                self.block(prepared, idx, missing)?;
                Ok(Visit::Blocked)
            }
        }
    }

    fn block(
        &mut self,
        prepared: &Prepared,
        idx: usize,
        missing: MissingInputs,
    ) -> Result<(), ExecutionError> {
        let name = &prepared.process.invocations[idx].name;
        if missing.values().any(|producers| producers.contains(&idx)) {
            return Err(ExecutionError::SelfBlocked(name.clone()));
        }
        let awaiting: Vec<String> = missing
            .values()
            .flatten()
            .map(|&p| prepared.process.invocations[p].name.clone())
            .collect();
        debug!(invocation = %name, awaiting = ?awaiting, "invocation blocked");
        self.state.trace.push(TraceEvent::Blocked {
            invocation: name.clone(),
            awaiting,
        });
        self.state.blocked.insert(idx, missing);
        Ok(())
    }

    /// Resumes blocked invocations until none is left, or fails with a
    /// deadlock when a pass makes no progress.
    fn resolve_blocked(
        &mut self,
        prepared: &Prepared,
        inputs: &AHashMap<String, Value>,
    ) -> Result<(), ExecutionError> {
        while !self.state.blocked.is_empty() {
            self.state.prune_blocked();
            let resumable = self.state.resumable();
            if resumable.is_empty() {
                let blocked = self.describe_blocked(prepared);
                warn!(process = %prepared.process.name, blocked = blocked.len(), "process deadlocked");
                return Err(ExecutionError::Deadlock { blocked });
            }

            for idx in resumable {
                // An earlier resumption in this pass may already have run it.
                if self.state.blocked.remove(&idx).is_none() {
                    continue;
                }
                let name = prepared.process.invocations[idx].name.clone();
                debug!(invocation = %name, "resuming invocation");
                self.state.trace.push(TraceEvent::Resumed(name));
                if let Visit::Proceed(filter) = self.visit(prepared, idx, inputs)? {
                    self.descend(prepared, idx, filter.as_deref(), inputs)?;
                }
            }
        }
        Ok(())
    }

    fn describe_blocked(&self, prepared: &Prepared) -> Vec<BlockedInvocation> {
        let name = |idx: usize| prepared.process.invocations[idx].name.clone();
        self.state
            .blocked
            .iter()
            .map(|(&idx, missing)| BlockedInvocation {
                invocation: name(idx),
                awaiting: missing
                    .iter()
                    .map(|(input, producers)| AwaitedInput {
                        input: input.clone(),
                        producers: producers.iter().map(|&p| name(p)).collect(),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Collects the inputs of `idx` from assignments, process inputs and literal defaults.
    fn gather_inputs(
        &self,
        prepared: &Prepared,
        idx: usize,
        inputs: &AHashMap<String, Value>,
    ) -> Result<Gathered, ExecutionError> {
        let invocation = &prepared.process.invocations[idx];
        let mut values = AHashMap::new();
        let mut missing = MissingInputs::new();

        for &a in &prepared.assignments_by_target[idx] {
            let assignment = &prepared.process.param_assignments[a];
            let ValueTarget::Input { input, .. } = &assignment.target else {
                continue;
            };
            match &assignment.source {
                ValueSource::Output {
                    invocation: source,
                    output,
                } => {
                    let Some(source_idx) = prepared.graph.index_of(&source.name) else {
                        continue;
                    };
                    match self.state.results.get(&source_idx) {
                        Some(result) => {
                            let value = result.get(&output.name).cloned().unwrap_or_default();
                            values.insert(input.name.clone(), value);
                        }
                        None => {
                            missing
                                .entry(input.name.clone())
                                .or_default()
                                .insert(source_idx);
                        }
                    }
                }
                ValueSource::ProcessInput(param) => {
                    let value = inputs
                        .get(&param.name)
                        .cloned()
                        .ok_or_else(|| ExecutionError::MissingProcessInput(param.name.clone()))?;
                    values.insert(input.name.clone(), value);
                }
            }
        }

        for declared in invocation.inputs() {
            if values.contains_key(&declared.name) {
                // One exclusive branch delivered it.
                missing.remove(&declared.name);
                continue;
            }
            if missing.contains_key(&declared.name) {
                continue;
            }
            match invocation.attribute(&declared.name) {
                Some(raw) => {
                    values.insert(
                        declared.name.clone(),
                        Value::from_literal(raw, &declared.data_type),
                    );
                }
                None => {
                    return Err(ExecutionError::UnassignedInput {
                        invocation: invocation.name.clone(),
                        input: declared.name.clone(),
                    });
                }
            }
        }

        if missing.is_empty() {
            Ok(Gathered::Ready(values))
        } else {
            Ok(Gathered::Missing(missing))
        }
    }

    /// Runs one non-conditional invocation. The inner `Err` carries the
    /// inputs it is still waiting for.
    fn execute_invocation(
        &mut self,
        prepared: &Prepared,
        idx: usize,
        inputs: &AHashMap<String, Value>,
    ) -> Result<Result<Option<Vec<usize>>, MissingInputs>, ExecutionError> {
        let values = match self.gather_inputs(prepared, idx, inputs)? {
            Gathered::Ready(values) => values,
            Gathered::Missing(missing) => return Ok(Err(missing)),
        };

        let invocation = &prepared.process.invocations[idx];
        let outputs = match &invocation.callable {
            Callable::Process(sub) => self.run_sub_process(&invocation.name, sub, values)?,
            Callable::Action(action) => match action.action_type {
                ActionType::FieldUpdate => builtins::field_update(&self.services, invocation, values)?,
                ActionType::FieldRead => builtins::field_read(&self.services, invocation, values)?,
                // Past the entry point a record action hands its record on.
                ActionType::RecordCreate | ActionType::RecordUpdate | ActionType::RecordSave => values
                    .get(RECORD_PARAM)
                    .map(|record| (RECORD_PARAM.to_string(), record.clone()))
                    .into_iter()
                    .collect(),
                ActionType::Conditional => AHashMap::new(),
                ActionType::Generic => self.run_action(&invocation.name, action, values)?,
            },
        };

        debug!(invocation = %invocation.name, outputs = outputs.len(), "executed invocation");
        self.state.results.insert(idx, outputs);
        self.state
            .trace
            .push(TraceEvent::Executed(invocation.name.clone()));
        Ok(Ok(None))
    }

    /// Evaluates a conditional and returns the winning branch targets.
    fn evaluate_conditional(
        &mut self,
        prepared: &Prepared,
        idx: usize,
    ) -> Result<Result<Option<Vec<usize>>, MissingInputs>, ExecutionError> {
        let invocation = &prepared.process.invocations[idx];
        let condition = prepared
            .conditions
            .get(&idx)
            .ok_or_else(|| ExecutionError::MissingCondition(invocation.name.clone()))?;
        let condition_error = |source: ConditionError| ExecutionError::Condition {
            invocation: invocation.name.clone(),
            source,
        };

        let mut missing = MissingInputs::new();
        for required in condition.required_invocations() {
            let source_idx = prepared
                .graph
                .index_of(required)
                .ok_or_else(|| condition_error(ConditionError::Unresolved(required.to_string())))?;
            if !self.state.has_executed(source_idx) {
                missing
                    .entry(CONDITION_ATTR.to_string())
                    .or_default()
                    .insert(source_idx);
            }
        }
        if !missing.is_empty() {
            return Ok(Err(missing));
        }

        let mut resolved: AHashMap<PathRef, Value> = AHashMap::new();
        for reference in condition.references() {
            if let Some(value) = self.resolve_reference(prepared, reference, &invocation.name)? {
                resolved.insert(reference.clone(), value);
            }
        }
        let outcome = condition
            .evaluate(&|path: &PathRef| resolved.get(path).cloned())
            .map_err(condition_error)?;

        let branch = if outcome { IF_TRUE_ATTR } else { IF_FALSE_ATTR };
        let targets = invocation.attribute_values(branch).to_vec();
        if targets.is_empty() {
            debug!(invocation = %invocation.name, outcome, "no branch declared for outcome");
        }
        let winners: Vec<usize> = targets
            .iter()
            .filter_map(|name| prepared.graph.index_of(name))
            .collect();

        self.state.results.insert(idx, AHashMap::new());
        self.state.trace.push(TraceEvent::Branch {
            invocation: invocation.name.clone(),
            outcome,
            targets,
        });
        Ok(Ok(Some(winners)))
    }

    /// Value of a `{invocation}.output.field...` reference from earlier results.
    fn resolve_reference(
        &self,
        prepared: &Prepared,
        reference: &PathRef,
        invocation: &str,
    ) -> Result<Option<Value>, ExecutionError> {
        let Some(value) = prepared
            .graph
            .index_of(&reference.invocation)
            .and_then(|idx| self.state.results.get(&idx))
            .and_then(|result| result.get(&reference.output))
            .cloned()
        else {
            return Ok(None);
        };

        let mut current = value;
        for field in &reference.fields {
            current = match &current {
                Value::Record(record) => builtins::read_field(&self.services, record, field)
                    .map_err(|source| ExecutionError::Record {
                        invocation: invocation.to_string(),
                        source,
                    })?,
                _ => Value::Null,
            };
        }
        Ok(Some(current))
    }

    fn run_sub_process(
        &mut self,
        invocation: &str,
        sub: &Arc<Process>,
        values: AHashMap<String, Value>,
    ) -> Result<AHashMap<String, Value>, ExecutionError> {
        let limit = self.services.config.max_subprocess_depth;
        if self.depth + 1 > limit {
            return Err(ExecutionError::SubProcessDepth {
                invocation: invocation.to_string(),
                limit,
            });
        }

        let services = self.services.clone();
        let depth = self.depth + 1;
        let executor = self
            .sub_executors
            .entry(sub.id.clone())
            .or_insert_with(|| ProcessExecutor::with_services(services, depth));
        let result = executor
            .run(Arc::clone(sub), values)
            .map_err(|e| ExecutionError::SubProcess {
                invocation: invocation.to_string(),
                source: Box::new(e),
            })?;

        self.state.trace.push(TraceEvent::SubProcess {
            invocation: invocation.to_string(),
            process: sub.name.clone(),
        });
        Ok(result.outputs)
    }

    /// Delegates to a registered implementation through cached bindings.
    fn run_action(
        &mut self,
        invocation: &str,
        action: &Action,
        mut values: AHashMap<String, Value>,
    ) -> Result<AHashMap<String, Value>, ExecutionError> {
        let binding = self
            .bindings
            .bind(action, &self.services.actions, invocation)?;
        let tag = |source: crate::error::ActionError| ExecutionError::Action {
            invocation: invocation.to_string(),
            source,
        };

        let mut instance = binding.implementation.instantiate();
        for (name, slot) in &binding.inputs {
            let value = values.remove(name).unwrap_or_default();
            instance.set_input(*slot, value).map_err(tag)?;
        }
        let ctx = ActionContext {
            invocation,
            records: self.services.records.as_ref(),
        };
        instance.execute(&ctx).map_err(tag)?;

        binding
            .outputs
            .iter()
            .map(|(name, slot)| Ok((name.clone(), instance.get_output(*slot).map_err(tag)?)))
            .collect()
    }

    fn collect_outputs(&self, prepared: &Prepared) -> Result<AHashMap<String, Value>, ExecutionError> {
        let process = &prepared.process;
        let mut outputs = AHashMap::new();
        for output in &process.outputs {
            let source = process
                .param_assignments
                .iter()
                .find(|a| matches!(&a.target, ValueTarget::ProcessOutput(p) if p.matches(output)))
                .map(|a| &a.source)
                .ok_or_else(|| ExecutionError::UnboundOutput(output.name.clone()))?;

            let value = match source {
                ValueSource::ProcessInput(_) => {
                    return Err(ExecutionError::InputPassedToOutput(output.name.clone()));
                }
                ValueSource::Output {
                    invocation,
                    output: param,
                } => {
                    let result = prepared
                        .graph
                        .index_of(&invocation.name)
                        .and_then(|idx| self.state.results.get(&idx));
                    match result {
                        Some(result) => result.get(&param.name).cloned().unwrap_or_default(),
                        None => {
                            debug!(output = %output.name, source = %invocation.name, "output source did not run");
                            Value::Null
                        }
                    }
                }
            };
            outputs.insert(output.name.clone(), value);
        }
        Ok(outputs)
    }
}
