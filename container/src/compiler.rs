//! Compiler passes and the ordered pass pipeline.
//!
//! Passes are grouped by [`PassType`]. Phases run in declaration order and
//! passes inside a phase run in the order they were added, so a pass added
//! later never runs before one that was already present in its phase.

use std::collections::BTreeMap;
use std::fmt;

use crate::builder::ContainerBuilder;
use crate::error::Result;
use crate::passes::{
    CheckCircularReferencesPass, CheckDefinitionValidityPass, CheckReferencesPass,
    RemoveAbstractDefinitionsPass, RemovePrivateAliasesPass, RemoveUnusedDefinitionsPass,
    ResolveParameterPlaceholdersPass, ResolveReferencesToAliasesPass,
};

/// A mutation step applied to the container before it is frozen.
#[cfg_attr(test, mockall::automock)]
pub trait CompilerPass {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Inspects or rewrites the container definitions.
    fn process(&self, container: &mut ContainerBuilder) -> Result<()>;
}

/// Phase of the pipeline a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PassType {
    BeforeOptimization,
    Optimize,
    BeforeRemoving,
    Remove,
    AfterRemoving,
}

/// Adapts a closure into a named [`CompilerPass`].
///
/// # Examples
///
/// ```
/// use pli_container::{ContainerBuilder, FnPass, PassType};
/// use serde_json::json;
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_compiler_pass(
///     Box::new(FnPass::new("set-env", |c: &mut ContainerBuilder| {
///         c.set_parameter("env", json!("prod"));
///         Ok(())
///     })),
///     PassType::AfterRemoving,
/// );
///
/// let container = builder.compile().unwrap();
/// assert_eq!(container.parameter("env").unwrap(), &json!("prod"));
/// ```
pub struct FnPass<F> {
    name: &'static str,
    process: F,
}

impl<F> FnPass<F>
where
    F: Fn(&mut ContainerBuilder) -> Result<()>,
{
    pub fn new(name: &'static str, process: F) -> Self {
        Self {
            name,
            process,
        }
    }
}

impl<F> CompilerPass for FnPass<F>
where
    F: Fn(&mut ContainerBuilder) -> Result<()>,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&self, container: &mut ContainerBuilder) -> Result<()> {
        (self.process)(container)
    }
}

/// Ordered pass pipeline of a container.
///
/// [`PassConfig::default`] holds the built-in passes; [`PassConfig::empty`]
/// holds none.
pub struct PassConfig {
    phases: BTreeMap<PassType, Vec<Box<dyn CompilerPass>>>,
}

impl PassConfig {
    /// Creates a pipeline without any pass.
    pub fn empty() -> Self {
        Self {
            phases: BTreeMap::new(),
        }
    }

    /// Returns the built-in passes in execution order.
    pub fn builtin_passes() -> Vec<(PassType, Box<dyn CompilerPass>)> {
        vec![
            (
                PassType::Optimize,
                Box::new(ResolveParameterPlaceholdersPass) as Box<dyn CompilerPass>,
            ),
            (PassType::Optimize, Box::new(CheckDefinitionValidityPass)),
            (PassType::Optimize, Box::new(ResolveReferencesToAliasesPass)),
            (PassType::Optimize, Box::new(CheckReferencesPass)),
            (PassType::Optimize, Box::new(CheckCircularReferencesPass)),
            (PassType::Remove, Box::new(RemovePrivateAliasesPass)),
            (PassType::Remove, Box::new(RemoveAbstractDefinitionsPass)),
            (PassType::Remove, Box::new(RemoveUnusedDefinitionsPass)),
        ]
    }

    /// Appends `pass` to the end of its phase.
    pub fn add_pass(&mut self, pass: Box<dyn CompilerPass>, pass_type: PassType) {
        self.phases.entry(pass_type).or_default().push(pass);
    }

    /// Returns every pass in execution order.
    pub fn passes(&self) -> Vec<&dyn CompilerPass> {
        self.phases
            .values()
            .flat_map(|passes| passes.iter().map(|pass| &**pass))
            .collect()
    }

    /// Returns the passes of one phase in execution order.
    pub fn passes_of(&self, pass_type: PassType) -> Vec<&dyn CompilerPass> {
        self.phases
            .get(&pass_type)
            .map(|passes| passes.iter().map(|pass| &**pass).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.phases.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn into_passes(self) -> Vec<Box<dyn CompilerPass>> {
        self.phases.into_values().flatten().collect()
    }
}

impl Default for PassConfig {
    fn default() -> Self {
        let mut config = Self::empty();
        for (pass_type, pass) in Self::builtin_passes() {
            config.add_pass(pass, pass_type);
        }
        config
    }
}

impl fmt::Debug for PassConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (pass_type, passes) in &self.phases {
            let names: Vec<&'static str> = passes.iter().map(|pass| pass.name()).collect();
            map.entry(pass_type, &names);
        }
        map.finish()
    }
}
