use crate::compiler::Standardizer;
use crate::error::RepositoryError;
use crate::model::{Invocation, ParamAssignment, Parameter, Process, ProcessArchive, Transition};
use itertools::Itertools;
use tracing::debug;

/// Storage of process graphs.
///
/// Every save replaces the whole sub-object graph of the process: the stored
/// invocations, transitions, inputs, outputs and assignments are deleted and
/// recreated from the supplied process.
pub trait ProcessRepository {
    fn load(&self, id: &str) -> Result<Option<Process>, RepositoryError>;

    fn save(&mut self, process: &Process) -> Result<Process, RepositoryError>;

    fn delete(&mut self, id: &str) -> Result<bool, RepositoryError>;

    fn list(&self) -> Result<Vec<Process>, RepositoryError>;
}

#[derive(Debug, Clone)]
struct Header {
    id: String,
    name: String,
    label: String,
    is_draft: bool,
    is_active: bool,
    is_callable: bool,
    is_triggerable: bool,
    last_modified: u64,
}

/// In-memory repository keeping each sub-object kind in its own table,
/// the way a relational store would.
#[derive(Debug, Default)]
pub struct MemoryProcessRepository {
    headers: Vec<Header>,
    invocations: Vec<(String, Invocation)>,
    transitions: Vec<(String, Transition)>,
    inputs: Vec<(String, Parameter)>,
    outputs: Vec<(String, Parameter)>,
    assignments: Vec<(String, ParamAssignment)>,
    next_id: u64,
}

impl MemoryProcessRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored sub-object rows, across all processes.
    pub fn row_count(&self) -> usize {
        self.invocations.len()
            + self.transitions.len()
            + self.inputs.len()
            + self.outputs.len()
            + self.assignments.len()
    }

    pub fn to_archive(&self) -> Result<ProcessArchive, RepositoryError> {
        Ok(ProcessArchive::new(self.list()?))
    }

    pub fn from_archive(archive: ProcessArchive) -> Result<Self, RepositoryError> {
        let mut repository = Self::new();
        for process in &archive.processes {
            repository.save(process)?;
        }
        Ok(repository)
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn delete_rows(&mut self, id: &str) -> usize {
        let before = self.row_count();
        self.invocations.retain(|(owner, _)| owner != id);
        self.transitions.retain(|(owner, _)| owner != id);
        self.inputs.retain(|(owner, _)| owner != id);
        self.outputs.retain(|(owner, _)| owner != id);
        self.assignments.retain(|(owner, _)| owner != id);
        before - self.row_count()
    }

    fn assemble(&self, header: &Header) -> Process {
        fn rows<T: Clone>(table: &[(String, T)], id: &str) -> Vec<T> {
            table
                .iter()
                .filter(|(owner, _)| owner == id)
                .map(|(_, row)| row.clone())
                .collect()
        }

        Process {
            id: header.id.clone(),
            name: header.name.clone(),
            label: header.label.clone(),
            is_draft: header.is_draft,
            is_active: header.is_active,
            is_callable: header.is_callable,
            is_triggerable: header.is_triggerable,
            last_modified: header.last_modified,
            invocations: rows(&self.invocations, &header.id),
            transitions: rows(&self.transitions, &header.id),
            inputs: rows(&self.inputs, &header.id),
            outputs: rows(&self.outputs, &header.id),
            param_assignments: rows(&self.assignments, &header.id),
        }
    }
}

impl ProcessRepository for MemoryProcessRepository {
    fn load(&self, id: &str) -> Result<Option<Process>, RepositoryError> {
        Ok(self
            .headers
            .iter()
            .find(|h| h.id == id)
            .map(|h| self.assemble(h)))
    }

    fn save(&mut self, process: &Process) -> Result<Process, RepositoryError> {
        let mut stored = process.clone();

        // Recreated rows get fresh identities; references are re-pointed at them.
        for invocation in &mut stored.invocations {
            if invocation.id.is_none() {
                invocation.id = Some(self.fresh_id("inv"));
            }
        }
        for parameter in stored.inputs.iter_mut().chain(stored.outputs.iter_mut()) {
            if parameter.id.is_none() {
                parameter.id = Some(self.fresh_id("param"));
            }
        }
        let unresolved = Standardizer::standardize(&mut stored);
        if !unresolved.is_empty() {
            return Err(RepositoryError::Storage(format!(
                "process '{}' has {} unresolved references",
                stored.name,
                unresolved.len()
            )));
        }
        for transition in &mut stored.transitions {
            transition.id = Some(self.fresh_id("tr"));
        }
        for assignment in &mut stored.param_assignments {
            assignment.id = Some(self.fresh_id("pa"));
        }

        let deleted = self.delete_rows(&stored.id);
        self.headers.retain(|h| h.id != stored.id);
        self.headers.push(Header {
            id: stored.id.clone(),
            name: stored.name.clone(),
            label: stored.label.clone(),
            is_draft: stored.is_draft,
            is_active: stored.is_active,
            is_callable: stored.is_callable,
            is_triggerable: stored.is_triggerable,
            last_modified: stored.last_modified,
        });

        let id = stored.id.clone();
        self.invocations
            .extend(stored.invocations.iter().map(|r| (id.clone(), r.clone())));
        self.transitions
            .extend(stored.transitions.iter().map(|r| (id.clone(), r.clone())));
        self.inputs
            .extend(stored.inputs.iter().map(|r| (id.clone(), r.clone())));
        self.outputs
            .extend(stored.outputs.iter().map(|r| (id.clone(), r.clone())));
        self.assignments
            .extend(stored.param_assignments.iter().map(|r| (id.clone(), r.clone())));

        debug!(process = %stored.name, deleted, "recreated process rows");
        Ok(stored)
    }

    fn delete(&mut self, id: &str) -> Result<bool, RepositoryError> {
        let existed = self.headers.iter().any(|h| h.id == id);
        self.headers.retain(|h| h.id != id);
        self.delete_rows(id);
        Ok(existed)
    }

    fn list(&self) -> Result<Vec<Process>, RepositoryError> {
        Ok(self.headers.iter().map(|h| self.assemble(h)).collect())
    }
}

/// Processes that invoke `callee_id` as a sub-process, by name.
pub fn callers_of(
    repository: &dyn ProcessRepository,
    callee_id: &str,
) -> Result<Vec<String>, RepositoryError> {
    Ok(repository
        .list()?
        .into_iter()
        .filter(|process| process.sub_processes().any(|sub| sub.id == callee_id))
        .map(|process| process.name)
        .sorted()
        .dedup()
        .collect())
}
