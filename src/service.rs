//! Save and execute processes against a repository.
//!
//! [`ProcessService`] is the lifecycle entry point: it validates a submitted
//! process, protects the signature of callables other processes depend on,
//! compiles changed conditions, persists through the repository and keeps one
//! prepared executor per process id.

use crate::compiler::{OutputNarrower, ProcessValidator, ValidationResult};
use crate::condition::{ConditionCache, condition_key};
use crate::config::EngineConfig;
use crate::error::{DeclarationError, ServiceError};
use crate::executor::{ActionRegistry, ProcessExecutor, ProcessResult};
use crate::model::{CONDITION_ATTR, Parameter, Process, TypeCatalog, Value};
use crate::store::{ProcessRepository, RecordService, callers_of};
use ahash::AHashMap;
use itertools::Itertools;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Outcome of [`ProcessService::save`].
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub validation: ValidationResult,
    /// The persisted process, absent when validation failed.
    pub saved: Option<Process>,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        self.saved.is_some()
    }
}

pub struct ProcessService<R: ProcessRepository> {
    repository: R,
    catalog: Arc<TypeCatalog>,
    records: Arc<dyn RecordService>,
    actions: ActionRegistry,
    conditions: Arc<ConditionCache>,
    config: EngineConfig,
    narrowers: Vec<Arc<dyn OutputNarrower>>,
    executors: AHashMap<String, (Arc<Process>, ProcessExecutor)>,
}

impl<R: ProcessRepository> ProcessService<R> {
    pub fn new(
        repository: R,
        catalog: TypeCatalog,
        records: Arc<dyn RecordService>,
        actions: ActionRegistry,
    ) -> Self {
        Self {
            repository,
            catalog: Arc::new(catalog),
            records,
            actions,
            conditions: Arc::new(ConditionCache::new()),
            config: EngineConfig::default(),
            narrowers: Vec::new(),
            executors: AHashMap::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an output type narrower used by every validation.
    pub fn with_output_narrower(mut self, narrower: Arc<dyn OutputNarrower>) -> Self {
        self.narrowers.push(narrower);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn conditions(&self) -> &ConditionCache {
        &self.conditions
    }

    pub fn cached_executors(&self) -> usize {
        self.executors.len()
    }

    pub fn validate(&self, process: &mut Process) -> ValidationResult {
        let mut builder = ProcessValidator::builder(&self.catalog);
        for narrower in &self.narrowers {
            builder = builder.with_output_narrower(Box::new(SharedNarrower(Arc::clone(narrower))));
        }
        builder.build().validate(process)
    }

    /// Validates and, when valid, persists the process.
    ///
    /// Nothing is stored when validation reports errors.
    pub fn save(&mut self, mut process: Process) -> Result<SaveOutcome, ServiceError> {
        let mut validation = self.validate(&mut process);
        let previous = self.repository.load(&process.id)?;

        if let Some(previous) = &previous {
            validation
                .errors
                .extend(self.check_used_callable(previous, &process)?);
        }
        if !validation.is_valid() {
            info!(process = %process.name, errors = validation.errors.len(), "process rejected");
            return Ok(SaveOutcome {
                validation,
                saved: None,
            });
        }

        process.last_modified = next_version(previous.as_ref());
        let stored = self.repository.save(&process)?;
        if !stored.is_draft {
            self.compile_conditions(previous.as_ref(), &stored)?;
        }
        self.executors.remove(&stored.id);

        info!(
            process = %stored.name,
            version = stored.last_modified,
            draft = stored.is_draft,
            "process saved"
        );
        Ok(SaveOutcome {
            validation,
            saved: Some(stored),
        })
    }

    pub fn load(&self, id: &str) -> Result<Option<Process>, ServiceError> {
        Ok(self.repository.load(id)?)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, ServiceError> {
        self.executors.remove(id);
        Ok(self.repository.delete(id)?)
    }

    /// Runs the stored process, reusing the executor prepared for its
    /// current version.
    pub fn execute(
        &mut self,
        id: &str,
        inputs: AHashMap<String, Value>,
    ) -> Result<ProcessResult, ServiceError> {
        if !self.executors.contains_key(id) {
            let process = self
                .repository
                .load(id)?
                .ok_or_else(|| crate::error::RepositoryError::NotFound(id.to_string()))?;
            if process.is_draft {
                return Err(ServiceError::DraftProcess(process.name));
            }
            let mut executor = ProcessExecutor::builder(Arc::clone(&self.records), self.actions.clone())
                .with_conditions(Arc::clone(&self.conditions))
                .with_catalog(Arc::clone(&self.catalog))
                .with_config(self.config.clone())
                .build();
            let process = Arc::new(process);
            executor.prepare(Arc::clone(&process))?;
            debug!(process = %process.name, "cached executor");
            self.executors.insert(id.to_string(), (process, executor));
        }

        let (process, executor) = self
            .executors
            .get_mut(id)
            .ok_or_else(|| crate::error::RepositoryError::NotFound(id.to_string()))?;
        Ok(executor.run(Arc::clone(process), inputs)?)
    }

    /// Drops cached accessor bindings of every executor, for use after
    /// action implementations were re-registered.
    pub fn invalidate_bindings(&mut self) {
        for (_, executor) in self.executors.values_mut() {
            executor.invalidate_bindings();
        }
    }

    fn check_used_callable(
        &self,
        previous: &Process,
        process: &Process,
    ) -> Result<Vec<DeclarationError>, ServiceError> {
        if !previous.is_callable {
            return Ok(Vec::new());
        }
        let callers: Vec<String> = callers_of(&self.repository, &previous.id)?
            .into_iter()
            .filter(|caller| *caller != previous.name)
            .collect();
        if callers.is_empty() {
            return Ok(Vec::new());
        }

        let change = |change: String| DeclarationError::UsedCallableChanged {
            process: process.name.clone(),
            change,
        };
        let mut errors = Vec::new();
        if !process.is_callable {
            errors.push(change("no longer callable".to_string()));
        }
        if signature(&previous.inputs) != signature(&process.inputs) {
            errors.push(change("inputs changed".to_string()));
        }
        if signature(&previous.outputs) != signature(&process.outputs) {
            errors.push(change("outputs changed".to_string()));
        }
        if !errors.is_empty() {
            debug!(process = %process.name, callers = ?callers, "used callable changed");
        }
        Ok(errors)
    }

    /// Compiles conditions whose text changed, or all of them when the
    /// previous version was a draft.
    fn compile_conditions(&self, previous: Option<&Process>, stored: &Process) -> Result<(), ServiceError> {
        let recompile_all = previous.is_none_or(|p| p.is_draft);
        for invocation in stored.invocations.iter().filter(|i| i.is_conditional()) {
            let Some(source) = invocation.attribute(CONDITION_ATTR) else {
                continue;
            };
            let unchanged = previous
                .and_then(|p| p.find_invocation(&invocation.name))
                .and_then(|old| old.attribute(CONDITION_ATTR))
                .is_some_and(|old| old == source);
            if unchanged && !recompile_all {
                continue;
            }

            let key = condition_key(&stored.id, invocation.id.as_deref(), &invocation.name);
            self.conditions
                .compile(&key, source)
                .map_err(|source| crate::error::ExecutionError::Condition {
                    invocation: invocation.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// Lets one shared narrower back several validators.
struct SharedNarrower(Arc<dyn OutputNarrower>);

impl OutputNarrower for SharedNarrower {
    fn action_name(&self) -> &str {
        self.0.action_name()
    }

    fn narrow(
        &self,
        invocation: &crate::model::Invocation,
        inputs: &mut crate::compiler::InputTypes<'_, '_>,
    ) -> Result<Vec<(String, crate::model::DataType)>, DeclarationError> {
        self.0.narrow(invocation, inputs)
    }
}

fn signature(parameters: &[Parameter]) -> Vec<(String, String)> {
    parameters
        .iter()
        .map(|p| (p.name.clone(), p.data_type.to_string()))
        .sorted()
        .collect()
}

fn next_version(previous: Option<&Process>) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    match previous {
        Some(previous) => now.max(previous.last_modified + 1),
        None => now,
    }
}
