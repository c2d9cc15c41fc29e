//! Built-in compiler passes.
//!
//! The optimization phase resolves placeholders and aliases and rejects
//! broken wiring; the removal phase drops everything that cannot or need not
//! be instantiated.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::builder::{ContainerBuilder, resolve_alias};
use crate::compiler::CompilerPass;
use crate::definition::Alias;
use crate::error::{ContainerError, Result};

/// Resolves `%name%` placeholders in parameters and definition arguments.
pub struct ResolveParameterPlaceholdersPass;

impl CompilerPass for ResolveParameterPlaceholdersPass {
    fn name(&self) -> &'static str {
        "ResolveParameterPlaceholdersPass"
    }

    fn process(&self, container: &mut ContainerBuilder) -> Result<()> {
        container.parameters_mut().resolve()?;
        let parameters = container.parameters().clone();
        for (_, definition) in container.definitions_mut() {
            for argument in definition.arguments_mut() {
                *argument = parameters.resolve_value(argument)?;
            }
        }
        Ok(())
    }
}

/// Rejects definitions that cannot be instantiated.
pub struct CheckDefinitionValidityPass;

impl CompilerPass for CheckDefinitionValidityPass {
    fn name(&self) -> &'static str {
        "CheckDefinitionValidityPass"
    }

    fn process(&self, container: &mut ContainerBuilder) -> Result<()> {
        for (id, definition) in container.definitions() {
            let invalid = |reason: &str| ContainerError::InvalidDefinition {
                id: id.to_string(),
                reason: reason.to_string(),
            };

            if id.trim().is_empty() || id.chars().any(char::is_whitespace) {
                return Err(invalid("service ids cannot be empty or contain whitespace"));
            }
            if !definition.is_abstract() && definition.factory().is_none() {
                return Err(invalid("a concrete service needs a factory"));
            }
            if definition.tags().keys().any(|tag| tag.trim().is_empty()) {
                return Err(invalid("tag names cannot be empty"));
            }
        }

        for (id, alias) in container.aliases() {
            if id == alias.target() {
                return Err(ContainerError::CircularAlias {
                    path: format!("{id} -> {id}"),
                });
            }
        }
        Ok(())
    }
}

/// Points aliases and definition references directly at the final service
/// id of every alias chain.
pub struct ResolveReferencesToAliasesPass;

impl CompilerPass for ResolveReferencesToAliasesPass {
    fn name(&self) -> &'static str {
        "ResolveReferencesToAliasesPass"
    }

    fn process(&self, container: &mut ContainerBuilder) -> Result<()> {
        let aliases = container.alias_map().clone();

        for (id, alias) in &aliases {
            let target = resolve_alias(&aliases, id)?;
            if target != alias.target() {
                let rewritten = if alias.is_public() {
                    Alias::new(target)
                } else {
                    Alias::new(target).private()
                };
                container.set_alias(id.clone(), rewritten);
            }
        }

        for (_, definition) in container.definitions_mut() {
            for reference in definition.references_mut() {
                if aliases.contains_key(reference.as_str()) {
                    *reference = resolve_alias(&aliases, reference.as_str())?;
                }
            }
        }
        Ok(())
    }
}

/// Rejects references and aliases pointing at unknown or abstract services.
pub struct CheckReferencesPass;

impl CompilerPass for CheckReferencesPass {
    fn name(&self) -> &'static str {
        "CheckReferencesPass"
    }

    fn process(&self, container: &mut ContainerBuilder) -> Result<()> {
        for (id, definition) in container.definitions() {
            for reference in definition.references() {
                match container.definition(reference) {
                    None => {
                        return Err(ContainerError::InvalidReference {
                            id: id.to_string(),
                            reference: reference.clone(),
                        });
                    }
                    Some(target) if target.is_abstract() => {
                        return Err(ContainerError::InvalidDefinition {
                            id: id.to_string(),
                            reason: format!("references abstract service \"{reference}\""),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for (id, alias) in container.aliases() {
            if !container.has_definition(alias.target()) {
                return Err(ContainerError::InvalidReference {
                    id: id.to_string(),
                    reference: alias.target().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Rejects services that depend on themselves through their references.
pub struct CheckCircularReferencesPass;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

impl CheckCircularReferencesPass {
    fn visit<'a>(
        graph: &BTreeMap<&'a str, Vec<&'a str>>,
        id: &'a str,
        state: &mut BTreeMap<&'a str, Visit>,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        match state.get(id) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                let start = path.iter().position(|entry| *entry == id).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].to_vec();
                cycle.push(id);
                return Err(ContainerError::CircularReference {
                    path: cycle.join(" -> "),
                });
            }
            None => {}
        }

        state.insert(id, Visit::InProgress);
        path.push(id);
        for next in graph.get(id).into_iter().flatten() {
            Self::visit(graph, *next, state, path)?;
        }
        path.pop();
        state.insert(id, Visit::Done);
        Ok(())
    }
}

impl CompilerPass for CheckCircularReferencesPass {
    fn name(&self) -> &'static str {
        "CheckCircularReferencesPass"
    }

    fn process(&self, container: &mut ContainerBuilder) -> Result<()> {
        let graph: BTreeMap<&str, Vec<&str>> = container
            .definitions()
            .map(|(id, def)| (id, def.references().iter().map(String::as_str).collect()))
            .collect();

        let mut state = BTreeMap::new();
        for id in graph.keys() {
            Self::visit(&graph, *id, &mut state, &mut Vec::new())?;
        }
        Ok(())
    }
}

/// Drops private aliases once references no longer go through them.
pub struct RemovePrivateAliasesPass;

impl CompilerPass for RemovePrivateAliasesPass {
    fn name(&self) -> &'static str {
        "RemovePrivateAliasesPass"
    }

    fn process(&self, container: &mut ContainerBuilder) -> Result<()> {
        container.retain_aliases(|id, alias| {
            if !alias.is_public() {
                debug!(alias = id, "Removed private alias");
            }
            alias.is_public()
        });
        Ok(())
    }
}

/// Drops abstract definitions.
pub struct RemoveAbstractDefinitionsPass;

impl CompilerPass for RemoveAbstractDefinitionsPass {
    fn name(&self) -> &'static str {
        "RemoveAbstractDefinitionsPass"
    }

    fn process(&self, container: &mut ContainerBuilder) -> Result<()> {
        container.retain_definitions(|id, definition| {
            if definition.is_abstract() {
                debug!(service = id, "Removed abstract definition");
            }
            !definition.is_abstract()
        });
        Ok(())
    }
}

/// Drops private definitions that no public service, public alias or tag
/// can reach.
pub struct RemoveUnusedDefinitionsPass;

impl CompilerPass for RemoveUnusedDefinitionsPass {
    fn name(&self) -> &'static str {
        "RemoveUnusedDefinitionsPass"
    }

    fn process(&self, container: &mut ContainerBuilder) -> Result<()> {
        let mut queue: VecDeque<String> = container
            .definitions()
            .filter(|(_, def)| def.is_public() || !def.tags().is_empty())
            .map(|(id, _)| id.to_string())
            .chain(
                container
                    .aliases()
                    .map(|(_, alias)| alias.target().to_string()),
            )
            .collect();

        let mut reachable = BTreeSet::new();
        while let Some(id) = queue.pop_front() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            if let Some(definition) = container.definition(&id) {
                queue.extend(definition.references().iter().cloned());
            }
        }

        container.retain_definitions(|id, _| {
            let keep = reachable.contains(id);
            if !keep {
                debug!(service = id, "Removed unused private definition");
            }
            keep
        });
        Ok(())
    }
}
