//! Compiles a font family build recipe into a ninja graph of tool invocations.

mod args;
pub mod builder;
mod config;
pub mod design;
mod error;
pub mod executor;
pub mod ninja;
pub mod operations;
mod paths;
pub mod recipe;
pub mod rules;
pub mod source;
pub mod transient;

pub use args::Args;
pub use builder::GraphBuilder;
pub use config::{Config, Recipe};
pub use error::Error;
pub use executor::{Executor, Ninja};
pub use paths::Paths;

use std::path::PathBuf;

use log::{error, info};

/// How a run ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The graph was written and, unless only emitting, executed
    Built { graph: PathBuf, executed: bool },
    /// The recipe needs a builder that doesn't use a graph. Nothing was written.
    Fallback(Vec<String>),
}

/// Read the recipe, plan and write the graph, then hand it to the executor.
pub fn run(args: &Args, executor: &dyn Executor) -> Result<Outcome, Error> {
    let recipe = Recipe::load(&args.recipe)?;
    let unsupported = recipe.unsupported_features();
    if !unsupported.is_empty() {
        for key in unsupported.iter() {
            error!("{key} is not supported by the ninja builder, use the classic builder");
        }
        return Ok(Outcome::Fallback(unsupported));
    }
    let config = recipe.config()?;
    let paths = Paths::new(&args.root());

    let graph = GraphBuilder::new(&config, &paths).build()?;
    let graph_file = paths.on_disk(paths.build_file());
    graph.write(&graph_file)?;
    info!(
        "Wrote {} edges to {graph_file:?}",
        graph.edges().count()
    );
    if args.emit_only {
        return Ok(Outcome::Built {
            graph: graph_file,
            executed: false,
        });
    }

    executor.execute(&paths, config.is_debug())?;
    if config.clean_up {
        let removed = graph.transients().clean_up(paths.root());
        info!("Removed {removed} transient files");
    }
    Ok(Outcome::Built {
        graph: graph_file,
        executed: true,
    })
}
