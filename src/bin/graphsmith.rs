//! Graphsmith CLI — assemble recipes into engine-ready job graphs.
//!
//! Usage:
//!   graphsmith assemble <recipe> --catalog <file> [--params <file>] [--set k=v]
//!   graphsmith recipes list
//!   graphsmith recipes show <name>

use clap::{Parser, Subcommand};
use graphsmith::{Assembler, ParamMap, RecipeStore, TemplateCatalog};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "graphsmith",
    version,
    about = "Recipe-driven job graph assembler"
)]
struct Cli {
    /// Directory containing base recipe documents
    #[arg(long, global = true, default_value = "recipes")]
    recipes: PathBuf,

    /// Directory containing override documents
    /// (default: <config dir>/graphsmith/recipes)
    #[arg(long, global = true)]
    overrides: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a recipe and print the job graph as JSON
    Assemble {
        /// Name of the recipe to assemble
        recipe: String,
        /// Path to the engine's operation catalog (YAML or JSON)
        #[arg(long)]
        catalog: PathBuf,
        /// JSON file with the parameter map
        #[arg(long)]
        params: Option<PathBuf>,
        /// Set a single parameter (KEY=VALUE; VALUE parsed as JSON,
        /// falling back to a plain string)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        sets: Vec<String>,
        /// Write the graph here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inspect available recipes
    Recipes {
        #[command(subcommand)]
        action: RecipesAction,
    },
}

#[derive(Subcommand)]
enum RecipesAction {
    /// List recipe names from the base and override directories
    List,
    /// Show a recipe's nodes and chains after merging
    Show {
        /// Recipe name
        name: String,
    },
}

/// Default override directory (<config dir>/graphsmith/recipes)
fn default_override_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("graphsmith").join("recipes"))
}

fn open_store(recipes: &PathBuf, overrides: &Option<PathBuf>) -> RecipeStore {
    let mut store = RecipeStore::new(recipes);
    let override_dir = overrides.clone().or_else(default_override_dir);
    if let Some(dir) = override_dir {
        if dir.is_dir() {
            store = store.with_override_dir(dir);
        }
    }
    store
}

fn load_params(file: Option<&PathBuf>, sets: &[String]) -> Result<ParamMap, String> {
    let mut params = ParamMap::new();

    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let loaded: ParamMap = serde_json::from_str(&text)
            .map_err(|e| format!("cannot parse {}: {}", path.display(), e))?;
        params.extend(loaded);
    }

    for set in sets {
        let (key, raw) = set
            .split_once('=')
            .ok_or_else(|| format!("--set expects KEY=VALUE, got '{}'", set))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        params.insert(key.to_string(), value);
    }

    Ok(params)
}

fn cmd_assemble(
    store: RecipeStore,
    recipe: &str,
    catalog: &PathBuf,
    params_file: Option<&PathBuf>,
    sets: &[String],
    output: Option<&PathBuf>,
) -> i32 {
    let catalog = match TemplateCatalog::from_path(catalog) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let params = match load_params(params_file, sets) {
        Ok(params) => params,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let assembler = Assembler::new(store, Arc::new(catalog));
    match assembler.assemble(recipe, &params) {
        Ok(graph) => {
            let json = serde_json::to_string_pretty(&graph)
                .expect("assembled graphs always serialize");
            match output {
                Some(path) => {
                    if let Err(e) = std::fs::write(path, json) {
                        eprintln!("Error: cannot write {}: {}", path.display(), e);
                        return 1;
                    }
                    println!("Wrote {} nodes to {}", graph.node_count(), path.display());
                }
                None => println!("{}", json),
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_recipes_list(store: RecipeStore) -> i32 {
    let names = store.available();
    if names.is_empty() {
        println!("No recipes found");
    }
    for name in names {
        println!("{}", name);
    }
    0
}

fn cmd_recipes_show(store: RecipeStore, name: &str) -> i32 {
    match store.load(name) {
        Ok(recipe) => {
            let overridden = if recipe.meta.overridden {
                " (with override)"
            } else {
                ""
            };
            println!(
                "{}: {} nodes, {} chains{}",
                recipe.name,
                recipe.nodes.len(),
                recipe.chains.len(),
                overridden
            );
            for (symbolic, decl) in &recipe.nodes {
                println!("  {} -> {}", symbolic, decl.op);
            }
            for chain in &recipe.chains {
                println!(
                    "  chain {} on ${{{}}}: {} -> {}",
                    chain.kind,
                    chain.param,
                    chain.start.node,
                    chain
                        .ends
                        .iter()
                        .map(|e| format!("{}.{}", e.node, e.input))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = open_store(&cli.recipes, &cli.overrides);

    let code = match &cli.command {
        Commands::Assemble {
            recipe,
            catalog,
            params,
            sets,
            output,
        } => cmd_assemble(
            store,
            recipe,
            catalog,
            params.as_ref(),
            sets,
            output.as_ref(),
        ),
        Commands::Recipes { action } => match action {
            RecipesAction::List => cmd_recipes_list(store),
            RecipesAction::Show { name } => cmd_recipes_show(store, name),
        },
    };

    std::process::exit(code);
}
