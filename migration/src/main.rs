use colored::Colorize;
use migration::Migrator;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::path::Path;

fn database_url() -> String {
    let path = common::config::database_path();
    if path.starts_with("sqlite:") {
        return path;
    }
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    format!("sqlite://{path}?mode=rwc")
}

#[tokio::main]
async fn main() {
    let command = std::env::args().nth(1).unwrap_or_else(|| "up".into());
    let url = database_url();

    let db = match Database::connect(&url).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{} {e}", "Failed to connect to database:".red());
            std::process::exit(1);
        }
    };

    let result = match command.as_str() {
        "up" => Migrator::up(&db, None).await,
        "down" => Migrator::down(&db, Some(1)).await,
        "fresh" => Migrator::fresh(&db).await,
        "status" => Migrator::status(&db).await,
        other => {
            eprintln!(
                "{} unknown command `{other}` (expected up | down | fresh | status)",
                "Error:".red()
            );
            std::process::exit(2);
        }
    };

    match result {
        Ok(()) => println!("{} migration `{command}` complete", "OK".green()),
        Err(e) => {
            eprintln!("{} migration `{command}` failed: {e}", "ERROR".red());
            std::process::exit(1);
        }
    }
}
