use crate::error::{ActionError, ExecutionError};
use crate::model::{Action, Value};
use crate::store::RecordService;
use ahash::AHashMap;
use std::sync::{Arc, RwLock};

/// What an action implementation sees while it executes.
pub struct ActionContext<'a> {
    pub invocation: &'a str,
    pub records: &'a dyn RecordService,
}

/// One instantiated action, addressed through resolved accessor slots.
pub trait ActionInstance {
    fn set_input(&mut self, slot: usize, value: Value) -> Result<(), ActionError>;

    fn get_output(&self, slot: usize) -> Result<Value, ActionError>;

    fn execute(&mut self, ctx: &ActionContext<'_>) -> Result<(), ActionError>;
}

/// A user-provided action, bound by the names of its declared parameters.
pub trait ActionImplementation: Send + Sync {
    /// Name of the action this implementation serves.
    fn action_name(&self) -> &str;

    fn input_slot(&self, name: &str) -> Option<usize>;

    fn output_slot(&self, name: &str) -> Option<usize>;

    fn instantiate(&self) -> Box<dyn ActionInstance>;
}

/// Implementations by action name. Re-registering a name replaces the
/// implementation; executors must then invalidate their bindings.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    implementations: Arc<RwLock<AHashMap<String, Arc<dyn ActionImplementation>>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, implementation: Arc<dyn ActionImplementation>) {
        let mut implementations = self
            .implementations
            .write()
            .unwrap_or_else(|e| e.into_inner());
        implementations.insert(implementation.action_name().to_string(), implementation);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionImplementation>> {
        let implementations = self
            .implementations
            .read()
            .unwrap_or_else(|e| e.into_inner());
        implementations.get(name).cloned()
    }
}

/// The accessor slots of one action, resolved from its declared parameters.
pub(crate) struct ActionBinding {
    pub(crate) implementation: Arc<dyn ActionImplementation>,
    pub(crate) inputs: Vec<(String, usize)>,
    pub(crate) outputs: Vec<(String, usize)>,
}

/// Resolved bindings by action id, owned by one executor.
#[derive(Default)]
pub(crate) struct BindingCache {
    bindings: AHashMap<String, Arc<ActionBinding>>,
}

impl BindingCache {
    pub(crate) fn bind(
        &mut self,
        action: &Action,
        registry: &ActionRegistry,
        invocation: &str,
    ) -> Result<Arc<ActionBinding>, ExecutionError> {
        if let Some(binding) = self.bindings.get(&action.id) {
            return Ok(Arc::clone(binding));
        }

        let implementation =
            registry
                .get(&action.name)
                .ok_or_else(|| ExecutionError::UnknownAction {
                    invocation: invocation.to_string(),
                    action: action.name.clone(),
                })?;

        let tag = |source: ActionError| ExecutionError::Action {
            invocation: invocation.to_string(),
            source,
        };
        let inputs = action
            .inputs
            .iter()
            .map(|p| {
                implementation
                    .input_slot(&p.name)
                    .map(|slot| (p.name.clone(), slot))
                    .ok_or_else(|| {
                        tag(ActionError::UnknownInput {
                            action: action.name.clone(),
                            input: p.name.clone(),
                        })
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = action
            .outputs
            .iter()
            .map(|p| {
                implementation
                    .output_slot(&p.name)
                    .map(|slot| (p.name.clone(), slot))
                    .ok_or_else(|| {
                        tag(ActionError::UnknownOutput {
                            action: action.name.clone(),
                            output: p.name.clone(),
                        })
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let binding = Arc::new(ActionBinding {
            implementation,
            inputs,
            outputs,
        });
        self.bindings
            .insert(action.id.clone(), Arc::clone(&binding));
        Ok(binding)
    }

    pub(crate) fn clear(&mut self) {
        self.bindings.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }
}

type InputSetter<S> = Arc<dyn Fn(&mut S, Value) -> Result<(), ActionError> + Send + Sync>;
type OutputGetter<S> = Arc<dyn Fn(&S) -> Value + Send + Sync>;
type Body<S> = Arc<dyn Fn(&mut S, &ActionContext<'_>) -> Result<(), ActionError> + Send + Sync>;

/// An action implementation assembled from closures over a state type `S`.
///
/// ```
/// use tejun::executor::FnAction;
/// use tejun::model::Value;
///
/// #[derive(Default)]
/// struct Doubler {
///     input: f64,
///     output: f64,
/// }
///
/// let action = FnAction::new("Double", |s: &mut Doubler, _ctx| {
///     s.output = s.input * 2.0;
///     Ok(())
/// })
/// .input("amount", |s, v| {
///     s.input = v.as_f64().unwrap_or_default();
///     Ok(())
/// })
/// .output("doubled", |s| Value::Number(s.output));
/// # let _ = action;
/// ```
pub struct FnAction<S> {
    name: String,
    inputs: Vec<(String, InputSetter<S>)>,
    outputs: Vec<(String, OutputGetter<S>)>,
    body: Body<S>,
}

impl<S: Default + 'static> FnAction<S> {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&mut S, &ActionContext<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            body: Arc::new(body),
        }
    }

    pub fn input(
        mut self,
        name: impl Into<String>,
        setter: impl Fn(&mut S, Value) -> Result<(), ActionError> + Send + Sync + 'static,
    ) -> Self {
        self.inputs.push((name.into(), Arc::new(setter)));
        self
    }

    pub fn output(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&S) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.outputs.push((name.into(), Arc::new(getter)));
        self
    }
}

struct FnInstance<S> {
    state: S,
    inputs: Vec<InputSetter<S>>,
    outputs: Vec<OutputGetter<S>>,
    body: Body<S>,
}

impl<S> ActionInstance for FnInstance<S> {
    fn set_input(&mut self, slot: usize, value: Value) -> Result<(), ActionError> {
        let setter = self
            .inputs
            .get(slot)
            .ok_or_else(|| ActionError::Failed(format!("no input slot {}", slot)))?;
        setter(&mut self.state, value)
    }

    fn get_output(&self, slot: usize) -> Result<Value, ActionError> {
        let getter = self
            .outputs
            .get(slot)
            .ok_or_else(|| ActionError::Failed(format!("no output slot {}", slot)))?;
        Ok(getter(&self.state))
    }

    fn execute(&mut self, ctx: &ActionContext<'_>) -> Result<(), ActionError> {
        (self.body)(&mut self.state, ctx)
    }
}

impl<S: Default + 'static> ActionImplementation for FnAction<S> {
    fn action_name(&self) -> &str {
        &self.name
    }

    fn input_slot(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|(n, _)| n == name)
    }

    fn output_slot(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|(n, _)| n == name)
    }

    fn instantiate(&self) -> Box<dyn ActionInstance> {
        Box::new(FnInstance {
            state: S::default(),
            inputs: self.inputs.iter().map(|(_, f)| Arc::clone(f)).collect(),
            outputs: self.outputs.iter().map(|(_, f)| Arc::clone(f)).collect(),
            body: Arc::clone(&self.body),
        })
    }
}
