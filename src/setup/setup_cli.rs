use clap::{Parser, Subcommand};
use redb::Database;
use society_site::config::Config;
use society_site::helper::admin_helpers;
use society_site::setup::db_setup;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file. Required for database commands.
    #[arg(long, global = true, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Create the content store.
    Setup,
    /// Write the starter posts and FAQs where none exist yet.
    Seed,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    /// Print a bcrypt hash to put in ADMIN_PASSWORD_HASH.
    HashPassword {
        #[arg(long)]
        password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Db { action } => {
            let Some(env_file) = &cli.env_file else {
                eprintln!("❌ Error: --env-file is required for database commands.");
                std::process::exit(1);
            };
            let config = match Config::from_env(env_file) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Error: Failed to load or parse configuration: {}", e);
                    std::process::exit(1);
                }
            };
            match action {
                DbAction::Setup => setup_content_database(&config),
                DbAction::Seed => seed_content_database(&config),
            }
        }
        Commands::Admin { action } => match action {
            AdminAction::HashPassword { password } => match admin_helpers::hash_admin_password(password) {
                Ok(hashed) => println!("{}", hashed),
                Err(e) => eprintln!("❌ Error hashing password: {}", e),
            },
        },
    }
}

fn setup_content_database(config: &Config) {
    let db_path = config.content_db_path();
    if db_path.exists() {
        println!("ℹ️ Content database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up content database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        if let Err(e) = fs::create_dir_all(parent_dir) {
            eprintln!("❌ Error: Could not create database directory: {}", e);
            return;
        }
    }

    let result = Database::create(&db_path)
        .map_err(db_setup::SetupError::from)
        .and_then(|db| db_setup::setup_content_db(&db));
    match result {
        Ok(_) => println!("✅ Content database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up content database: {}", e),
    }
}

fn seed_content_database(config: &Config) {
    let db_path = config.content_db_path();
    if !db_path.exists() {
        eprintln!("❌ Error: Content database not found at '{}'. Please run `setup_cli db setup` first.", db_path.display());
        return;
    }

    let result = Database::open(&db_path)
        .map_err(db_setup::SetupError::from)
        .and_then(|db| db_setup::seed_content(&db));
    match result {
        Ok(report) => {
            let outcome = |seeded: bool| if seeded { "written" } else { "already present, left alone" };
            println!("✅ Default posts {}.", outcome(report.posts));
            println!("✅ Default FAQs {}.", outcome(report.faqs));
        }
        Err(e) => eprintln!("❌ Error seeding content database: {}", e),
    }
}
