//! Mutable container under construction.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::compiler::{CompilerPass, PassConfig, PassType};
use crate::container::Container;
use crate::definition::{Alias, Definition, TagAttributes};
use crate::error::{ContainerError, Result};
use crate::parameters::ParameterBag;

/// A container being assembled: parameters, definitions, aliases and the
/// compiler pass pipeline.
///
/// Nothing is instantiated until [`compile`](Self::compile) has run every
/// pass and frozen the result into a [`Container`].
///
/// # Examples
///
/// ```
/// use pli_container::{ContainerBuilder, Definition, PassConfig};
/// use serde_json::json;
///
/// let mut builder = ContainerBuilder::new();
/// builder.set_parameter("foo", json!("bar"));
/// builder.set_definition("clock", Definition::new(|_| Ok(42_u64)).with_tag("probe"));
///
/// assert_eq!(builder.parameter("foo").unwrap(), &json!("bar"));
/// assert_eq!(builder.find_tagged_service_ids("probe").len(), 1);
/// assert_eq!(builder.pass_config().len(), PassConfig::builtin_passes().len());
/// ```
#[derive(Debug)]
pub struct ContainerBuilder {
    parameters: ParameterBag,
    definitions: BTreeMap<String, Definition>,
    aliases: BTreeMap<String, Alias>,
    pass_config: PassConfig,
}

impl ContainerBuilder {
    /// Creates an empty builder carrying the built-in passes.
    pub fn new() -> Self {
        Self::with_pass_config(PassConfig::default())
    }

    /// Creates an empty builder with a custom pipeline.
    pub fn with_pass_config(pass_config: PassConfig) -> Self {
        Self {
            parameters: ParameterBag::new(),
            definitions: BTreeMap::new(),
            aliases: BTreeMap::new(),
            pass_config,
        }
    }

    /// Sets a parameter. The last value written for a name wins.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if self.parameters.set(name.clone(), value).is_some() {
            debug!(parameter = %name, "Overwrote container parameter");
        }
    }

    /// Returns a parameter value as currently set (placeholders unresolved
    /// until compile).
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ParameterNotFound`] if `name` is not set.
    pub fn parameter(&self, name: &str) -> Result<&Value> {
        self.parameters.get(name)
    }

    /// Returns `true` if `name` is set.
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.has(name)
    }

    /// All parameters, placeholders unresolved until compile.
    pub fn parameters(&self) -> &ParameterBag {
        &self.parameters
    }

    /// Mutable access for passes that rewrite parameters.
    pub fn parameters_mut(&mut self) -> &mut ParameterBag {
        &mut self.parameters
    }

    /// Registers a definition, replacing any definition or alias with the
    /// same id.
    pub fn set_definition(&mut self, id: impl Into<String>, definition: Definition) -> &mut Definition {
        let id = id.into();
        self.aliases.remove(&id);
        let slot = self.definitions.entry(id).or_insert_with(Definition::template);
        *slot = definition;
        slot
    }

    /// Returns the definition registered under `id`, ignoring aliases.
    pub fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    /// Mutable access to the definition registered under `id`.
    pub fn definition_mut(&mut self, id: &str) -> Option<&mut Definition> {
        self.definitions.get_mut(id)
    }

    /// Returns `true` if a definition (not an alias) is registered under `id`.
    pub fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Removes and returns the definition registered under `id`.
    pub fn remove_definition(&mut self, id: &str) -> Option<Definition> {
        self.definitions.remove(id)
    }

    /// Iterates over definitions in id order.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.definitions.iter().map(|(id, def)| (id.as_str(), def))
    }

    /// Iterates mutably over definitions in id order.
    pub fn definitions_mut(&mut self) -> impl Iterator<Item = (&str, &mut Definition)> {
        self.definitions
            .iter_mut()
            .map(|(id, def)| (id.as_str(), def))
    }

    /// Keeps only the definitions for which `keep` returns `true`.
    pub fn retain_definitions(&mut self, mut keep: impl FnMut(&str, &Definition) -> bool) {
        self.definitions.retain(|id, def| keep(id, def));
    }

    /// Registers an alias, replacing any definition or alias with the same
    /// id.
    pub fn set_alias(&mut self, id: impl Into<String>, alias: Alias) {
        let id = id.into();
        self.definitions.remove(&id);
        self.aliases.insert(id, alias);
    }

    /// Returns the alias registered under `id`.
    pub fn alias(&self, id: &str) -> Option<&Alias> {
        self.aliases.get(id)
    }

    /// Removes and returns the alias registered under `id`.
    pub fn remove_alias(&mut self, id: &str) -> Option<Alias> {
        self.aliases.remove(id)
    }

    /// Iterates over aliases in id order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &Alias)> {
        self.aliases.iter().map(|(id, alias)| (id.as_str(), alias))
    }

    /// Keeps only the aliases for which `keep` returns `true`.
    pub fn retain_aliases(&mut self, mut keep: impl FnMut(&str, &Alias) -> bool) {
        self.aliases.retain(|id, alias| keep(id, alias));
    }

    pub(crate) fn alias_map(&self) -> &BTreeMap<String, Alias> {
        &self.aliases
    }

    /// Returns `true` if `id` names a definition or an alias.
    pub fn has(&self, id: &str) -> bool {
        self.definitions.contains_key(id) || self.aliases.contains_key(id)
    }

    /// Returns the ids of definitions carrying `tag`, in id order, with the
    /// attributes of every occurrence of the tag.
    pub fn find_tagged_service_ids(&self, tag: &str) -> Vec<(String, Vec<TagAttributes>)> {
        tagged_ids(&self.definitions, tag)
    }

    /// Appends `pass` to the end of the `pass_type` phase.
    ///
    /// Passes already present in that phase, built-in or not, keep running
    /// before it.
    pub fn add_compiler_pass(&mut self, pass: Box<dyn CompilerPass>, pass_type: PassType) {
        debug!(pass = pass.name(), ?pass_type, "Added compiler pass");
        self.pass_config.add_pass(pass, pass_type);
    }

    /// The pass pipeline `compile` will run.
    pub fn pass_config(&self) -> &PassConfig {
        &self.pass_config
    }

    /// Runs every compiler pass in order and freezes the result.
    ///
    /// Passes added while compiling are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a pass, unchanged.
    pub fn compile(mut self) -> Result<Container> {
        let passes = std::mem::replace(&mut self.pass_config, PassConfig::empty()).into_passes();
        for pass in &passes {
            debug!(pass = pass.name(), "Running compiler pass");
            pass.process(&mut self)?;
        }

        info!(
            services = self.definitions.len(),
            aliases = self.aliases.len(),
            parameters = self.parameters.len(),
            "Compiled container"
        );

        let aliases = self
            .aliases
            .into_iter()
            .map(|(id, alias)| (id, alias.target().to_string()))
            .collect();
        Ok(Container::new(self.parameters, self.definitions, aliases))
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn tagged_ids(
    definitions: &BTreeMap<String, Definition>,
    tag: &str,
) -> Vec<(String, Vec<TagAttributes>)> {
    definitions
        .iter()
        .filter(|(_, def)| def.has_tag(tag))
        .map(|(id, def)| (id.clone(), def.tag(tag).to_vec()))
        .collect()
}

/// Follows an alias chain to the id it finally names.
pub(crate) fn resolve_alias(aliases: &BTreeMap<String, Alias>, id: &str) -> Result<String> {
    let mut path = vec![id.to_string()];
    let mut current = id;
    while let Some(alias) = aliases.get(current) {
        current = alias.target();
        if path.iter().any(|seen| seen == current) {
            path.push(current.to_string());
            return Err(ContainerError::CircularAlias {
                path: path.join(" -> "),
            });
        }
        path.push(current.to_string());
    }
    Ok(current.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_alias_replaces_definition() {
        let mut builder = ContainerBuilder::new();
        builder.set_definition("mailer", Definition::new(|_| Ok(())));
        builder.set_alias("mailer", Alias::new("smtp"));
        assert!(!builder.has_definition("mailer"));
        assert!(builder.alias("mailer").is_some());
        assert!(builder.has("mailer"));
    }

    #[test]
    fn test_definition_replaces_alias() {
        let mut builder = ContainerBuilder::new();
        builder.set_alias("mailer", Alias::new("smtp"));
        builder.set_definition("mailer", Definition::new(|_| Ok(())));
        assert!(builder.alias("mailer").is_none());
        assert!(builder.has_definition("mailer"));
    }

    #[test]
    fn test_parameter_last_writer_wins() {
        let mut builder = ContainerBuilder::new();
        builder.set_parameter("foo", json!("bar"));
        builder.set_parameter("foo", json!("baz"));
        assert_eq!(builder.parameter("foo").unwrap(), &json!("baz"));
    }

    #[test]
    fn test_find_tagged_service_ids_sorted_by_id() {
        let mut builder = ContainerBuilder::new();
        builder.set_definition("b", Definition::new(|_| Ok(())).with_tag("command"));
        builder.set_definition("a", Definition::new(|_| Ok(())).with_tag("command"));
        builder.set_definition("c", Definition::new(|_| Ok(())));

        let ids: Vec<String> = builder
            .find_tagged_service_ids("command")
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_resolve_alias_chain_and_cycle() {
        let mut aliases = BTreeMap::new();
        aliases.insert("a".to_string(), Alias::new("b"));
        aliases.insert("b".to_string(), Alias::new("c"));
        assert_eq!(resolve_alias(&aliases, "a").unwrap(), "c");
        assert_eq!(resolve_alias(&aliases, "c").unwrap(), "c");

        aliases.insert("c".to_string(), Alias::new("a"));
        let err = resolve_alias(&aliases, "a").unwrap_err();
        assert!(
            matches!(err, ContainerError::CircularAlias { path } if path == "a -> b -> c -> a")
        );
    }
}
