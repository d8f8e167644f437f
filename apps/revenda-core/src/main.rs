use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use revenda_core::provisioner::{PanelProvisioner, Provisioner};
use revenda_core::services::quota_service::QuotaService;
use revenda_core::services::usage_sync_service::UsageSyncService;
use revenda_core::services::wallet_billing_service::WalletBillingService;
use revenda_core::settings::SettingsService;
use std::io;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "revenda-core", about = "Reseller pricing and quota ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the background workers (usage sync + wallet billing)
    Run,
    /// Run one usage sync cycle and exit
    SyncUsage,
    /// Run one wallet billing cycle and exit
    BillWallets,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        println!("Warning: failed to load .env file: {}", e);
    }

    let cli = Cli::parse();

    let file_appender = tracing_appender::rolling::never(".", "revenda.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revenda_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    let pool = revenda_db::db::init_db().await?;

    match cli.command {
        Commands::Run => {
            let (usage_sync, wallet_billing) = build_workers(pool).await?;
            info!("revenda-core {} starting workers", env!("CARGO_PKG_VERSION"));
            tokio::select! {
                _ = usage_sync.start() => {}
                _ = wallet_billing.start() => {}
            }
        }
        Commands::SyncUsage => {
            let (usage_sync, _) = build_workers(pool).await?;
            usage_sync.sync_once().await?;
        }
        Commands::BillWallets => {
            let (_, wallet_billing) = build_workers(pool).await?;
            wallet_billing.bill_once().await?;
        }
        Commands::Migrate => {
            // init_db already applied migrations.
            println!("Migrations applied.");
        }
    }

    Ok(())
}

async fn build_workers(pool: sqlx::PgPool) -> Result<(UsageSyncService, WalletBillingService)> {
    let settings = Arc::new(SettingsService::new(pool.clone()).await?);
    let panel_url = std::env::var("PANEL_BASE_URL").context("PANEL_BASE_URL must be set")?;
    let panel_token = std::env::var("PANEL_API_TOKEN").context("PANEL_API_TOKEN must be set")?;
    let provisioner: Arc<dyn Provisioner> =
        Arc::new(PanelProvisioner::new(panel_url, panel_token));

    let quota = QuotaService::new(pool.clone(), settings.clone());
    let usage_sync = UsageSyncService::new(
        pool.clone(),
        quota.clone(),
        settings.clone(),
        provisioner.clone(),
    );
    let wallet_billing = WalletBillingService::new(pool, settings);
    Ok((usage_sync, wallet_billing))
}
