/// Remove expired admin sessions.
/// Logins already purge the signing-in admin's own expired sessions; this job
/// covers admins who never come back. Run daily, e.g. `0 3 * * * /app/purge-sessions`.
///
/// Usage: purge-sessions [--admin-id ID] [--dry-run]

use chrono::Utc;
use clap::Parser;
use jadwal_imam_api::db::{self, PgStore, Store};

#[derive(Parser)]
#[command(name = "purge-sessions", about = "Delete expired admin sessions")]
struct Args {
    /// Only purge sessions belonging to this admin
    #[arg(long)]
    admin_id: Option<i64>,

    /// Count expired sessions without deleting them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

    let pool = db::create_pool(&database_url).await?;
    let now = Utc::now();

    if args.dry_run {
        let expired: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM admin_sessions
             WHERE expires_at < $1 AND ($2::BIGINT IS NULL OR admin_id = $2)",
        )
        .bind(now)
        .bind(args.admin_id)
        .fetch_one(&pool)
        .await?;
        tracing::info!("{expired} expired session(s) would be purged");
        return Ok(());
    }

    let store = PgStore::new(pool);
    let purged = store.purge_expired_sessions(args.admin_id, now).await?;
    tracing::info!("Purged {purged} expired session(s)");

    Ok(())
}
