use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proji::config::ProjiConfig;
use proji::db::Database;
use proji::models::{Class, CreateStatusInput, ScriptKind, UpdateStatusInput};
use proji::storage::StorageService;

#[derive(Parser)]
#[command(name = "proji")]
#[command(about = "Create projects from reusable class templates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage classes
    #[command(subcommand)]
    Class(ClassCommand),
    /// Manage statuses
    #[command(subcommand)]
    Status(StatusCommand),
}

#[derive(Subcommand)]
enum ClassCommand {
    /// Import a class from a directory or a config file
    Import(ImportArgs),
    /// Export a class to a config file
    Export {
        /// Label or name of the class
        class: String,
        /// Directory to write the config file into
        #[arg(short, long, default_value = ".")]
        destination: PathBuf,
    },
    /// List all classes
    Ls,
    /// Show a class in detail
    Show {
        /// Label or name of the class
        class: String,
    },
    /// Remove a class
    Rm {
        /// Label or name of the class
        class: String,
    },
}

#[derive(Args)]
struct ImportArgs {
    /// Directory whose structure becomes the class
    #[arg(long, conflicts_with = "config", required_unless_present = "config")]
    directory: Option<PathBuf>,
    /// Config file describing the class
    #[arg(long)]
    config: Option<PathBuf>,
    /// Glob patterns to exclude from a directory import
    #[arg(short, long, requires = "directory")]
    exclude: Vec<String>,
    /// Replace a stored class with the same label
    #[arg(long)]
    replace: bool,
}

#[derive(Subcommand)]
enum StatusCommand {
    /// Add a status
    Add {
        title: String,
        #[arg(default_value = "")]
        comment: String,
    },
    /// List all statuses
    Ls,
    /// Update a status
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Remove a status
    Rm { id: i64 },
}

/// Initialize tracing on stderr so stdout only carries command output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "proji=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = ProjiConfig::load_default().context("Failed to load configuration")?;
    let db_path = config.database_path()?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    db.migrate()?;

    match cli.command {
        Commands::Class(command) => run_class(&db, &config, command),
        Commands::Status(command) => run_status(&db, command),
    }
}

fn run_class(
    svc: &impl StorageService,
    config: &ProjiConfig,
    command: ClassCommand,
) -> anyhow::Result<()> {
    match command {
        ClassCommand::Import(args) => {
            let mut class = Class::default();
            if let Some(dir) = args.directory {
                let mut exclude = config.import.exclude.clone();
                exclude.extend(args.exclude);
                class
                    .import_from_directory(&dir, &exclude)
                    .with_context(|| format!("Failed to import {}", dir.display()))?;
            } else if let Some(path) = args.config {
                class
                    .import_from_config(&path)
                    .with_context(|| format!("Failed to import {}", path.display()))?;
            }

            if args.replace {
                svc.replace_class(&class)?;
            } else {
                svc.save_class(&class)?;
            }
            println!("Class '{}' ({}) imported", class.name, class.label);
        }
        ClassCommand::Export { class, destination } => {
            let class = svc.load_class(&class)?;
            let path = class.export(&destination)?;
            println!("Exported class '{}' to {}", class.name, path.display());
        }
        ClassCommand::Ls => {
            let classes = svc.load_all_classes()?;
            println!("{:<24} {:<8} {}", "NAME", "LABEL", "DEFAULT");
            for class in classes {
                println!(
                    "{:<24} {:<8} {}",
                    class.name,
                    class.label,
                    if class.is_default { "yes" } else { "" }
                );
            }
        }
        ClassCommand::Show { class } => {
            let class = svc.load_class(&class)?;
            print_class(&class);
        }
        ClassCommand::Rm { class } => {
            svc.delete_class(&class)?;
            println!("Class '{}' removed", class);
        }
    }
    Ok(())
}

fn print_class(class: &Class) {
    println!("Name:    {}", class.name);
    println!("Label:   {}", class.label);
    println!("Default: {}", class.is_default);

    println!("\nFolders:");
    for folder in &class.folders {
        print_entry(&folder.destination, &folder.template);
    }

    println!("\nFiles:");
    for file in &class.files {
        print_entry(&file.destination, &file.template);
    }

    for kind in [ScriptKind::Pre, ScriptKind::Post] {
        println!("\nScripts ({}):", kind);
        for script in class.scripts_in_exec_order(kind) {
            println!(
                "  {}. {}{}{}",
                script.exec_number,
                if script.run_as_sudo { "sudo " } else { "" },
                script.name,
                if script.args.is_empty() {
                    String::new()
                } else {
                    format!(" {}", script.args.join(" "))
                }
            );
        }
    }
}

fn print_entry(destination: &str, template: &str) {
    if template.is_empty() {
        println!("  {}", destination);
    } else {
        println!("  {} <- {}", destination, template);
    }
}

fn run_status(svc: &impl StorageService, command: StatusCommand) -> anyhow::Result<()> {
    match command {
        StatusCommand::Add { title, comment } => {
            let status = svc.save_status(CreateStatusInput { title, comment })?;
            println!("Status '{}' added with id {}", status.title, status.id);
        }
        StatusCommand::Ls => {
            let mut statuses = svc.load_all_statuses()?;
            statuses.sort_by_key(|s| s.id);
            println!("{:<4} {:<12} {}", "ID", "TITLE", "COMMENT");
            for status in statuses {
                println!("{:<4} {:<12} {}", status.id, status.title, status.comment);
            }
        }
        StatusCommand::Update { id, title, comment } => {
            let status = svc.update_status(id, UpdateStatusInput { title, comment })?;
            println!("Status {} updated to '{}'", status.id, status.title);
        }
        StatusCommand::Rm { id } => {
            svc.delete_status(id)?;
            println!("Status {} removed", id);
        }
    }
    Ok(())
}
