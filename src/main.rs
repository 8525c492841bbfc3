use budget_workflow::{
    config::{database, seed},
    core::report::{format_company_overview, generate_company_overview},
    errors::Result,
};
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load seed configuration, if present
    let config_path =
        PathBuf::from(std::env::var("BUDGET_CONFIG").unwrap_or_else(|_| "config.toml".into()));
    let config = if config_path.exists() {
        seed::load_config(&config_path)
            .inspect_err(|e| error!("Failed to load {}: {}", config_path.display(), e))?
    } else {
        warn!("{} not found, starting without seed data", config_path.display());
        seed::Config::default()
    };

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Seed rules and team budgets
    seed::seed_from_config(&db, &config)
        .await
        .inspect_err(|e| error!("Failed to seed database: {}", e))?;

    // 6. Report where each configured company stands
    for company in &config.companies {
        let overview = generate_company_overview(&db, &company.company_id).await?;
        info!("\n{}", format_company_overview(&overview));
    }

    Ok(())
}
