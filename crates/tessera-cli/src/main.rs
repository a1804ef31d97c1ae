//! Tessera command-line tools.
//!
//! Provides the `tessera` binary for working with a model database without
//! running the HTTP server. `batch` runs a batch file through the same
//! [`BatchEngine`](tessera_server::service::BatchEngine) the server uses, so
//! both entry points behave identically.

use std::process;

use clap::{Parser, Subcommand};

use tessera_core::{ModelId, UserId};
use tessera_server::config::EngineConfig;
use tessera_server::schema::batch::BatchRequest;
use tessera_server::state::AppState;
use tessera_storage::{ModelStore, ModelSummary, SqliteStore, StorageError};

/// Tessera model tools.
#[derive(Parser)]
#[command(name = "tessera", about = "Tessera model tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run a batch JSON file against the models of a database.
    Batch {
        /// Path to the model database file.
        #[arg(short, long)]
        db: String,

        /// Acting user (recorded as contributor).
        #[arg(short, long)]
        user: Option<String>,

        /// Save the batch's model after a successful run.
        #[arg(long)]
        save: bool,

        /// Batch request file.
        file: String,
    },
    /// List the stored models.
    Models {
        /// Path to the model database file.
        #[arg(short, long)]
        db: String,

        /// Only list models importing this ontology IRI.
        #[arg(long)]
        imports: Option<String>,
    },
    /// Delete a stored model.
    Delete {
        /// Path to the model database file.
        #[arg(short, long)]
        db: String,

        /// Id of the model to delete.
        #[arg(short, long)]
        model: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Batch {
            db,
            user,
            save,
            file,
        } => run_batch(&db, user, save, &file),
        Commands::Models { db, imports } => run_models(&db, imports.as_deref()),
        Commands::Delete { db, model } => run_delete(&db, &model),
    };
    process::exit(exit_code);
}

/// Execute the batch subcommand.
///
/// Returns exit code: 0 = success, 1 = the batch failed, 3 = I/O or
/// storage error.
fn run_batch(db_path: &str, user: Option<String>, save: bool, file: &str) -> i32 {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", file, e);
            return 3;
        }
    };
    let request: BatchRequest = match serde_json::from_str(&text) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: '{}' is not a batch request: {}", file, e);
            return 1;
        }
    };

    let config = EngineConfig {
        db_path: Some(db_path.to_string()),
        ..EngineConfig::from_env()
    };
    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", db_path, e);
            return 3;
        }
    };

    let response = match state.engine.execute(request, user.map(UserId::new)) {
        Ok(response) => response,
        Err(failure) => {
            match failure.operation_index {
                Some(index) => eprintln!("Batch failed at operation {}: {}", index, failure.error),
                None => eprintln!("Batch failed: {}", failure.error),
            }
            if let Some(commentary) = &failure.commentary {
                for line in commentary.lines() {
                    eprintln!("  - {}", line);
                }
            }
            return 1;
        }
    };

    if save {
        if let Some(id) = &response.model_id {
            if let Err(e) = state.engine.save_model(&ModelId::new(id.as_str())) {
                eprintln!("Error: failed to save model {}: {}", id, e);
                return 3;
            }
        }
    }

    print_json(&response);
    0
}

/// Execute the models subcommand.
fn run_models(db_path: &str, imports: Option<&str>) -> i32 {
    let store = match SqliteStore::new(db_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", db_path, e);
            return 3;
        }
    };
    match stored_models(&store, imports) {
        Ok(models) => {
            print_json(&models);
            0
        }
        Err(e) => {
            eprintln!("Error: failed to list models: {}", e);
            3
        }
    }
}

/// Stored model summaries, optionally narrowed to models importing `iri`.
fn stored_models(
    store: &SqliteStore,
    imports: Option<&str>,
) -> Result<Vec<ModelSummary>, StorageError> {
    let mut models = store.list()?;
    if let Some(iri) = imports {
        let importing = store.models_importing(iri)?;
        models.retain(|m| importing.contains(&m.id));
    }
    Ok(models)
}

/// Execute the delete subcommand.
fn run_delete(db_path: &str, model: &str) -> i32 {
    let mut store = match SqliteStore::new(db_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", db_path, e);
            return 3;
        }
    };
    match store.delete(&ModelId::from(model)) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: failed to delete model {}: {}", model, e);
            1
        }
    }
}

/// Prints a value as pretty JSON to stdout for machine-readable output.
fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{GraphChange, Iri, ModelGraph};

    fn save_model(store: &mut SqliteStore, id: &str, imports: &[&str]) {
        let mut graph = ModelGraph::new(id.into(), Iri::new(format!("http://x/{}", id)));
        graph
            .apply(&GraphChange::ImportsReplaced {
                previous: Vec::new(),
                next: imports.iter().map(|i| (*i).into()).collect(),
            })
            .unwrap();
        store.save(&graph.snapshot()).unwrap();
    }

    #[test]
    fn models_can_be_filtered_by_import() {
        let mut store = SqliteStore::in_memory().unwrap();
        save_model(&mut store, "model:1", &["http://go"]);
        save_model(&mut store, "model:2", &["http://ro"]);

        assert_eq!(stored_models(&store, None).unwrap().len(), 2);
        let importing = stored_models(&store, Some("http://ro")).unwrap();
        assert_eq!(importing.len(), 1);
        assert_eq!(importing[0].id, ModelId::from("model:2"));
        assert!(stored_models(&store, Some("http://none")).unwrap().is_empty());
    }
}
