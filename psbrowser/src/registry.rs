//! Command registry: name -> descriptor, in registration order.

use std::collections::HashMap;

use strsim::levenshtein;

use crate::error::RegistryError;

/// Maximum edit distance for "did you mean" suggestions.
const SUGGESTION_DISTANCE: usize = 2;

/// A registered command. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor<H> {
    pub name: String,
    pub min_params: usize,
    pub help: String,
    pub handler: H,
}

/// Commands known to the shell.
///
/// Populated once at startup; lookups never mutate it. Iteration order is
/// the registration order so `help` output is stable.
#[derive(Debug, Clone)]
pub struct CommandRegistry<H> {
    commands: Vec<CommandDescriptor<H>>,
    by_name: HashMap<String, usize>,
}

impl<H> Default for CommandRegistry<H> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<H> CommandRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        min_params: usize,
        help: impl Into<String>,
        handler: H,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateCommand(name));
        }
        self.by_name.insert(name.clone(), self.commands.len());
        self.commands.push(CommandDescriptor {
            name,
            min_params,
            help: help.into(),
            handler,
        });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&CommandDescriptor<H>, RegistryError> {
        self.by_name
            .get(name)
            .map(|&idx| &self.commands[idx])
            .ok_or_else(|| RegistryError::CommandNotFound(name.to_string()))
    }

    /// Look up `name` and check that `given` parameters satisfy it.
    pub fn resolve(&self, name: &str, given: usize) -> Result<&CommandDescriptor<H>, RegistryError> {
        let descriptor = self.lookup(name)?;
        if given < descriptor.min_params {
            return Err(RegistryError::InsufficientParams {
                name: name.to_string(),
                min_params: descriptor.min_params,
                given,
            });
        }
        Ok(descriptor)
    }

    /// All commands in registration order.
    pub fn list(&self) -> &[CommandDescriptor<H>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Closest registered name within a small edit distance, if any.
    pub fn suggest(&self, input: &str) -> Option<&str> {
        let input = input.to_lowercase();
        let mut best: Option<(&str, usize)> = None;
        for cmd in &self.commands {
            let distance = levenshtein(&input, &cmd.name);
            if distance > SUGGESTION_DISTANCE {
                continue;
            }
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((cmd.name.as_str(), distance)),
            }
        }
        best.map(|(name, _)| name)
    }
}
