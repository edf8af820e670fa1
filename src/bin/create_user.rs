//! Creates a dashboard user, or resets the password and role of an existing one.
//!
//! Usage:
//!   cargo run --bin create_user -- --username maria --password 's3nha' --role owner

use anyhow::{Context, Result};
use clap::Parser;
use imoveis_backend::{
    auth::hash_password,
    database,
    models::Role,
    store::{PgStore, UserStore},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Login name.
    #[arg(long)]
    username: String,

    /// Plain-text password; stored as an argon2 hash.
    #[arg(long, env = "CREATE_USER_PASSWORD")]
    password: String,

    /// owner, admin or agent.
    #[arg(long, default_value = "agent")]
    role: Role,

    /// Defaults to the DATABASE_URL environment variable.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if args.username.trim().is_empty() || args.password.is_empty() {
        anyhow::bail!("username and password must not be empty");
    }

    let pool = database::create_pool(&args.database_url, 1)
        .await
        .context("Failed to connect to PostgreSQL")?;
    database::run_migrations(&pool).await?;

    let hash = hash_password(&args.password)?;
    let store = PgStore::new(pool);
    let user = store
        .upsert_user(args.username.trim(), &hash, args.role)
        .await
        .context("Failed to save user")?;

    println!("✅ User '{}' saved with id {} and role {}", user.username, user.id, user.role);
    Ok(())
}
