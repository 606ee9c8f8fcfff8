//! Explicit case registration.
//!
//! Cases are described by the caller through a builder (method identity,
//! named variable values, async body, lifecycle hooks) instead of being
//! discovered by reflection. The registry stores the descriptors and hands
//! them to the sampling controller.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use regatta_core::TestCaseId;

/// A case body: one operation of the code under measurement.
///
/// The body is invoked once per operation; the sampling controller handles
/// warmup, repetition and timing around it. Returning an error marks the
/// surrounding iteration as failed without corrupting already-collected
/// timings.
pub type CaseBody =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync>;

/// A synchronous lifecycle hook run immediately before or after the timed
/// region of each iteration.
pub type CaseHook = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Errors raised while building or registering cases.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A descriptor was built without a body.
    #[error("Case '{0}' has no body")]
    MissingBody(String),

    /// Two descriptors share the same identity.
    #[error("Case '{0}' is already registered")]
    DuplicateCase(String),

    /// The scaling variable is not among the declared variables.
    #[error("Case '{0}' marks scaling variable '{1}' which is not declared")]
    UnknownScalingVariable(String, String),
}

/// Full description of one runnable test case.
pub struct CaseDescriptor {
    id: TestCaseId,
    scaling_variable: Option<String>,
    pub(crate) body: CaseBody,
    pub(crate) iteration_setup: Option<CaseHook>,
    pub(crate) iteration_teardown: Option<CaseHook>,
}

impl CaseDescriptor {
    /// Start building a descriptor for the given qualified method name.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let case = CaseDescriptor::builder("SortBench.sort_random")
    ///     .variable("n", 1000)
    ///     .scaling_variable("n")
    ///     .body(|| async {
    ///         // ... one operation ...
    ///         Ok(())
    ///     })
    ///     .build()?;
    /// ```
    pub fn builder(method: impl Into<String>) -> CaseDescriptorBuilder {
        CaseDescriptorBuilder {
            method: method.into(),
            variables: Vec::new(),
            scaling_variable: None,
            body: None,
            iteration_setup: None,
            iteration_teardown: None,
        }
    }

    pub fn id(&self) -> &TestCaseId {
        &self.id
    }

    /// Name of the variable this case scales over, if any. Cases sharing a
    /// method and scaling variable feed the complexity estimator.
    pub fn scaling_variable(&self) -> Option<&str> {
        self.scaling_variable.as_deref()
    }
}

impl std::fmt::Debug for CaseDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseDescriptor")
            .field("id", &self.id)
            .field("scaling_variable", &self.scaling_variable)
            .field("has_setup", &self.iteration_setup.is_some())
            .field("has_teardown", &self.iteration_teardown.is_some())
            .finish()
    }
}

/// Builder for [`CaseDescriptor`].
pub struct CaseDescriptorBuilder {
    method: String,
    variables: Vec<(String, i64)>,
    scaling_variable: Option<String>,
    body: Option<CaseBody>,
    iteration_setup: Option<CaseHook>,
    iteration_teardown: Option<CaseHook>,
}

impl CaseDescriptorBuilder {
    /// Attach a named variable value. Order of calls is preserved in the
    /// case identity.
    pub fn variable(mut self, name: impl Into<String>, value: i64) -> Self {
        self.variables.push((name.into(), value));
        self
    }

    /// Mark one declared variable as the scaling dimension for complexity
    /// estimation.
    pub fn scaling_variable(mut self, name: impl Into<String>) -> Self {
        self.scaling_variable = Some(name.into());
        self
    }

    /// Set the async case body.
    pub fn body<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.body = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// Hook run immediately before the timed region of each iteration.
    pub fn iteration_setup<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.iteration_setup = Some(Arc::new(f));
        self
    }

    /// Hook run immediately after the timed region of each iteration.
    pub fn iteration_teardown<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.iteration_teardown = Some(Arc::new(f));
        self
    }

    /// Finalize the descriptor.
    ///
    /// # Errors
    ///
    /// Returns `MissingBody` when no body was set, or
    /// `UnknownScalingVariable` when the scaling variable was never declared.
    pub fn build(self) -> Result<CaseDescriptor, RegistryError> {
        let body = self
            .body
            .ok_or_else(|| RegistryError::MissingBody(self.method.clone()))?;

        if let Some(ref scaling) = self.scaling_variable {
            if !self.variables.iter().any(|(name, _)| name == scaling) {
                return Err(RegistryError::UnknownScalingVariable(
                    self.method.clone(),
                    scaling.clone(),
                ));
            }
        }

        Ok(CaseDescriptor {
            id: TestCaseId::with_variables(self.method, self.variables),
            scaling_variable: self.scaling_variable,
            body,
            iteration_setup: self.iteration_setup,
            iteration_teardown: self.iteration_teardown,
        })
    }
}

/// Registry of runnable cases.
#[derive(Default)]
pub struct CaseRegistry {
    cases: Vec<CaseDescriptor>,
}

impl CaseRegistry {
    /// Create a new empty case registry.
    pub fn new() -> Self {
        Self { cases: Vec::new() }
    }

    /// Register a case.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCase` if a case with the same identity exists.
    pub fn register(&mut self, case: CaseDescriptor) -> Result<(), RegistryError> {
        if self.contains(case.id()) {
            return Err(RegistryError::DuplicateCase(case.id().to_string()));
        }
        self.cases.push(case);
        Ok(())
    }

    /// List the identities of all registered cases, in registration order.
    pub fn list(&self) -> Vec<TestCaseId> {
        self.cases.iter().map(|c| c.id().clone()).collect()
    }

    /// Look up a case by identity.
    pub fn get(&self, id: &TestCaseId) -> Option<&CaseDescriptor> {
        self.cases.iter().find(|c| c.id() == id)
    }

    /// Check whether a case with the given identity exists.
    pub fn contains(&self, id: &TestCaseId) -> bool {
        self.cases.iter().any(|c| c.id() == id)
    }

    /// Iterate over registered cases in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CaseDescriptor> {
        self.cases.iter()
    }

    /// Get the number of registered cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
