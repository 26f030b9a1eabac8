//! The graph handed to the executor, and its ninja rendering.
//!
//! Stages don't write to the graph directly. Each returns a [`Fragment`] of
//! comments, edges and transient files that [`Graph::merge`] checks and
//! appends. Nothing reaches disk until the whole graph is known to be sound.

use std::{
    collections::HashMap,
    fmt::Write as _,
    io::Write as _,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use log::debug;
use tempfile::NamedTempFile;

use crate::{transient::Transients, Error};

/// A reusable command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub comment: String,
    pub command: String,
}

/// The rules of a graph, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: IndexMap<String, Rule>,
}

impl RuleRegistry {
    pub fn register(&mut self, name: &str, comment: &str, command: &str) -> Result<(), Error> {
        if self.rules.contains_key(name) {
            return Err(Error::DuplicateRule(name.to_string()));
        }
        self.rules.insert(
            name.to_string(),
            Rule {
                name: name.to_string(),
                comment: comment.to_string(),
                command: command.to_string(),
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }
}

/// One build statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub outputs: Vec<PathBuf>,
    pub rule: String,
    pub inputs: Vec<PathBuf>,
    /// Ordering only, never passed to the command
    pub implicit: Vec<PathBuf>,
    pub variables: IndexMap<String, String>,
}

impl Edge {
    pub fn new(rule: &str, outputs: Vec<PathBuf>, inputs: Vec<PathBuf>) -> Edge {
        Edge {
            outputs,
            rule: rule.to_string(),
            inputs,
            implicit: Vec::new(),
            variables: IndexMap::new(),
        }
    }

    pub fn with_implicit(mut self, implicit: Vec<PathBuf>) -> Edge {
        self.implicit = implicit;
        self
    }

    pub fn with_variable(mut self, name: &str, value: impl Into<String>) -> Edge {
        self.variables.insert(name.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    Comment(String),
    Newline,
    Build(Edge),
}

/// What a stage contributes to the graph.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    statements: Vec<Statement>,
    transients: Transients,
}

impl Fragment {
    pub fn comment(&mut self, text: impl Into<String>) {
        self.statements.push(Statement::Comment(text.into()));
    }

    pub fn newline(&mut self) {
        self.statements.push(Statement::Newline);
    }

    pub fn edge(&mut self, edge: Edge) {
        debug!("{} {:?} <= {:?}", edge.rule, edge.outputs, edge.inputs);
        self.statements.push(Statement::Build(edge));
    }

    pub fn transient(&mut self, path: impl Into<PathBuf>) {
        self.transients.record(path);
    }

    pub fn append(&mut self, other: Fragment) {
        self.statements.extend(other.statements);
        self.transients.merge(other.transients);
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Build(edge) => Some(edge),
            _ => None,
        })
    }

    pub fn transients(&self) -> &Transients {
        &self.transients
    }
}

/// Rules plus every edge the stages produced.
#[derive(Debug)]
pub struct Graph {
    rules: RuleRegistry,
    statements: Vec<Statement>,
    transients: Transients,
    /// output => index into statements
    producers: HashMap<PathBuf, usize>,
}

impl Graph {
    pub fn new(rules: RuleRegistry) -> Graph {
        Graph {
            rules,
            statements: Vec::new(),
            transients: Transients::default(),
            producers: HashMap::new(),
        }
    }

    /// Append a fragment, rejecting edges that use unknown rules or produce
    /// something another edge already produces.
    ///
    /// Nothing from the fragment is kept if any edge is rejected.
    pub fn merge(&mut self, fragment: Fragment) -> Result<(), Error> {
        let mut claimed = HashMap::new();
        for (idx, statement) in fragment.statements.iter().enumerate() {
            let Statement::Build(edge) = statement else {
                continue;
            };
            if !self.rules.contains(&edge.rule) {
                return Err(Error::UnknownRule(edge.rule.clone()));
            }
            for output in edge.outputs.iter() {
                if self.producers.contains_key(output)
                    || claimed
                        .insert(output.clone(), self.statements.len() + idx)
                        .is_some()
                {
                    return Err(Error::DuplicateOutput(output.clone()));
                }
            }
        }
        self.producers.extend(claimed);
        self.statements.extend(fragment.statements);
        self.transients.merge(fragment.transients);
        Ok(())
    }

    /// Every implicit input must be made by some edge of this graph.
    pub fn validate(&self) -> Result<(), Error> {
        for edge in self.edges() {
            for dependency in edge.implicit.iter() {
                if !self.producers.contains_key(dependency) {
                    return Err(Error::DanglingDependency {
                        dependency: dependency.clone(),
                        consumer: edge.outputs.first().cloned().unwrap_or_default(),
                    });
                }
            }
        }
        let consumed: Vec<_> = self.edges().flat_map(|e| e.implicit.iter()).collect();
        for transient in self.transients.iter() {
            if self.producers.contains_key(transient) && !consumed.contains(&transient) {
                debug!("Nothing waits for {transient:?}");
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Build(edge) => Some(edge),
            _ => None,
        })
    }

    /// The edge that writes a file
    pub fn producer(&self, output: &Path) -> Option<&Edge> {
        match self.producers.get(output).map(|idx| &self.statements[*idx]) {
            Some(Statement::Build(edge)) => Some(edge),
            _ => None,
        }
    }

    pub fn transients(&self) -> &Transients {
        &self.transients
    }

    pub fn to_ninja(&self) -> String {
        let mut ninja = String::new();
        ninja.push_str("# Rules\n\n");
        for rule in self.rules.iter() {
            let _ = writeln!(ninja, "# {}", rule.comment);
            let _ = writeln!(ninja, "rule {}", rule.name);
            let _ = writeln!(ninja, "  command = {}", rule.command);
        }
        ninja.push('\n');

        for statement in self.statements.iter() {
            match statement {
                Statement::Comment(text) => {
                    let _ = writeln!(ninja, "# {text}");
                }
                Statement::Newline => ninja.push('\n'),
                Statement::Build(edge) => write_edge(&mut ninja, edge),
            }
        }
        ninja
    }

    /// Render, then swap the file in, there is never a partial graph on disk
    pub fn write(&self, file: &Path) -> Result<(), Error> {
        let io_error = |source| Error::FileIo {
            path: file.to_path_buf(),
            source,
        };
        let dir = file
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut staged = NamedTempFile::new_in(dir).map_err(io_error)?;
        staged
            .write_all(self.to_ninja().as_bytes())
            .map_err(io_error)?;
        staged.persist(file).map_err(|e| io_error(e.error))?;
        Ok(())
    }
}

fn write_edge(ninja: &mut String, edge: &Edge) {
    let join = |paths: &[PathBuf]| {
        paths
            .iter()
            .map(|p| escape_path(p))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let _ = write!(
        ninja,
        "build {}: {} {}",
        join(&edge.outputs),
        edge.rule,
        join(&edge.inputs)
    );
    if !edge.implicit.is_empty() {
        let _ = write!(ninja, " | {}", join(&edge.implicit));
    }
    ninja.push('\n');
    for (name, value) in edge.variables.iter() {
        let _ = writeln!(ninja, "  {name} = {}", escape(value));
    }
}

/// Escape `$` in a ninja value
pub fn escape(value: &str) -> String {
    value.replace('$', "$$")
}

/// Escape a path for a build line, where space and colon are significant
pub fn escape_path(path: &Path) -> String {
    escape(&path.to_string_lossy())
        .replace(' ', "$ ")
        .replace(':', "$:")
}
