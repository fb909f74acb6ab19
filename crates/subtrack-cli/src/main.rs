use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use subtrack_core::{
    backup, AlertEngine, Clock, Config, ExportFormat, Exporter, FixedClock, NewSubscription,
    Settings, SharedStore, Subscription, SubscriptionStore, SubscriptionUpdate, SystemClock,
    ALL_CATEGORIES,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "subtrack")]
#[command(version, about = "Keep an eye on recurring subscriptions and their renewal dates", long_about = None)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "SUBTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the data directory from the config file
    #[arg(long, global = true, env = "SUBTRACK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Add a new subscription
    Add {
        name: String,
        /// Renewal date (YYYY-MM-DD)
        date: String,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long, default_value = subtrack_core::DEFAULT_CATEGORY)]
        category: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List all subscriptions, soonest renewal first
    List,
    /// Show a single subscription
    Show { id: i64 },
    /// Change fields of an existing subscription
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a subscription (unknown ids are ignored)
    Delete { id: i64 },
    /// Search by name, optionally within one category
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(long, default_value = ALL_CATEGORIES)]
        category: String,
    },
    /// Subscriptions renewing within N days
    Expiring {
        #[arg(long)]
        days: Option<i64>,
    },
    /// List known categories
    Categories,
    /// Total monthly cost
    Cost,
    /// Counts and cost breakdown
    Stats {
        #[arg(long)]
        category: Option<String>,
    },
    /// Show renewal alerts
    Alerts,
    /// Export to .csv or .json
    Export {
        path: PathBuf,
        /// Force a format instead of guessing from the extension
        #[arg(long)]
        format: Option<String>,
    },
    /// Copy the data file somewhere safe (default: timestamped file in the backup dir)
    Backup { path: Option<PathBuf> },
    /// Replace the data file with a backup
    Restore { path: PathBuf },
    /// List automatic backups, newest first
    Backups,
    /// Read or change user settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(clap::Subcommand)]
enum SettingsAction {
    /// Print every setting
    Show,
    /// Print one setting
    Get { key: String },
    /// Set one setting; the value is parsed as JSON, falling back to a plain string
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = Some(dir.clone());
    }

    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let clock: Arc<dyn Clock> = match cli.today {
        Some(date) => Arc::new(FixedClock::on(date)),
        None => Arc::new(SystemClock),
    };

    let store = SubscriptionStore::with_clock(config.store_path()?, Arc::clone(&clock))
        .context("Failed to open subscription store")?;
    let store = SharedStore::new(store, config.io.timeout());
    let mut settings = Settings::load(config.settings_path()?);

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    // Auto-backup runs alongside the command; the shared handle keeps them
    // from writing the file at the same time.
    let backup_task = spawn_auto_backup(&store, &settings, &config)?;

    let outcome = run_command(command, &store, &mut settings, &config).await;

    if let Some(task) = backup_task {
        match task.await {
            Ok(Ok(Some(done))) => {
                settings.mark_backed_up(done.taken_at)?;
                tracing::info!("Automatic backup saved to {}", done.path.display());
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => tracing::warn!("Automatic backup failed: {}", e),
            Err(e) => tracing::warn!("Automatic backup task panicked: {}", e),
        }
    }

    outcome
}

type BackupTask = tokio::task::JoinHandle<subtrack_core::Result<Option<backup::AutoBackup>>>;

fn spawn_auto_backup(
    store: &SharedStore,
    settings: &Settings,
    config: &Config,
) -> anyhow::Result<Option<BackupTask>> {
    if !settings.auto_backup() {
        return Ok(None);
    }

    let dir = config.backup_dir()?;
    let settings = settings.clone();
    let store = store.clone();

    Ok(Some(tokio::spawn(async move {
        store
            .run(move |s| backup::backup_if_due(s, &settings, &dir))
            .await
    })))
}

async fn run_command(
    command: Commands,
    store: &SharedStore,
    settings: &mut Settings,
    config: &Config,
) -> anyhow::Result<()> {
    match command {
        Commands::Add {
            name,
            date,
            price,
            category,
            notes,
        } => {
            let draft = NewSubscription::new(name, date)
                .price(price)
                .category(category)
                .notes(notes);
            let sub = store
                .run(move |s| s.add(draft))
                .await
                .context("Could not add subscription")?;
            println!("Added {} (id {})", sub.name, sub.id);
        }
        Commands::List => {
            let (subs, today) = store.run(|s| Ok((s.load_all()?, s.today()))).await?;
            print_table(&subs, today);
        }
        Commands::Show { id } => {
            let (sub, today) = store.run(move |s| Ok((s.get(id)?, s.today()))).await?;
            println!("Id:        {}", sub.id);
            println!("Name:      {}", sub.name);
            println!("Renews:    {}", sub.date_str());
            println!("Price:     {:.2}", sub.price);
            println!("Category:  {}", sub.category);
            println!("Status:    {} ({} days)", sub.status(today), sub.days_remaining(today));
            println!("Notes:     {}", sub.notes);
            println!("Created:   {}", sub.created_at.format("%Y-%m-%d %H:%M"));
        }
        Commands::Update {
            id,
            name,
            date,
            price,
            category,
            notes,
        } => {
            let updated = store
                .run(move |s| {
                    let mut update = SubscriptionUpdate::from(&s.get(id)?);
                    if let Some(name) = name {
                        update.name = name;
                    }
                    if let Some(date) = date {
                        update.date = date;
                    }
                    if let Some(price) = price {
                        update.price = price;
                    }
                    if let Some(category) = category {
                        update.category = category;
                    }
                    if let Some(notes) = notes {
                        update.notes = notes;
                    }
                    s.update(id, update)
                })
                .await
                .context("Could not update subscription")?;
            println!("Updated {} (id {})", updated.name, updated.id);
        }
        Commands::Delete { id } => {
            if store.run(move |s| s.delete(id)).await? {
                println!("Deleted {}", id);
            } else {
                println!("No subscription with id {}", id);
            }
        }
        Commands::Search { query, category } => {
            let (subs, today) = store
                .run(move |s| Ok((s.search(&query, &category)?, s.today())))
                .await?;
            print_table(&subs, today);
        }
        Commands::Expiring { days } => {
            let days = days.unwrap_or(config.alerts.expiring_days);
            let (subs, today) = store
                .run(move |s| Ok((s.expiring_within(days)?, s.today())))
                .await?;
            print_table(&subs, today);
        }
        Commands::Categories => {
            for category in store.run(|s| s.categories()).await? {
                println!("{}", category);
            }
        }
        Commands::Cost => {
            let total = store.run(|s| s.total_monthly_cost()).await?;
            println!("Monthly: {:.2}", total);
            println!("Yearly:  {:.2}", total * 12.0);
        }
        Commands::Stats { category } => {
            let stats = store
                .run(move |s| s.statistics(category.as_deref()))
                .await?;
            println!("Total:          {}", stats.total);
            println!("Active:         {}", stats.active);
            println!("Expiring soon:  {}", stats.expiring);
            println!("Expired:        {}", stats.expired);
            println!();
            println!("By category:");
            for c in &stats.by_category {
                println!("  {:<20} {}", c.category, c.count);
            }
            println!();
            println!("Monthly cost:   {:.2}", stats.monthly_cost);
            println!("Yearly cost:    {:.2}", stats.yearly_cost);
            for c in stats.paid_categories() {
                println!("  {:<20} {:>10.2} ({:.1}%)", c.category, c.cost, c.percentage);
            }
        }
        Commands::Alerts => {
            let summary = store.run(|s| AlertEngine::new(s).summary()).await?;
            if summary.total_alerts == 0 {
                println!("Nothing needs attention");
            } else {
                println!(
                    "{} alerts ({} high, {} medium, {} low)",
                    summary.total_alerts,
                    summary.high_priority,
                    summary.medium_priority,
                    summary.low_priority
                );
                for alert in &summary.alerts {
                    println!("[{}] {}: {}", alert.priority, alert.kind, alert.message);
                }
            }
        }
        Commands::Export { path, format } => {
            let format = match format.as_deref() {
                Some(f) => match ExportFormat::from_extension(f) {
                    Some(format) => Some(format),
                    None => bail!("Unknown export format '{}'. Use csv or json", f),
                },
                None => None,
            };
            let target = path.clone();
            let count = store
                .run(move |s| {
                    let subs = s.load_all()?;
                    match format {
                        Some(format) => {
                            Exporter::export_to_file_with_format(&subs, &target, format, s.today())?
                        }
                        None => Exporter::export_to_file(&subs, &target, s.today())?,
                    }
                    Ok(subs.len())
                })
                .await
                .context("Export failed")?;
            println!("Exported {} subscriptions to {}", count, path.display());
        }
        Commands::Backup { path } => {
            let dir = config.backup_dir()?;
            let written = store
                .run(move |s| match path {
                    Some(path) => Ok(s.backup(&path)?.then_some(path)),
                    None => backup::create_backup(s, &dir, s.clock().now()),
                })
                .await
                .context("Backup failed")?;
            match written {
                Some(path) => println!("Backup written to {}", path.display()),
                None => println!("Nothing to back up yet"),
            }
        }
        Commands::Restore { path } => {
            let source = path.clone();
            if store
                .run(move |s| s.restore(&source))
                .await
                .context("Restore failed")?
            {
                println!("Restored from {}", path.display());
            } else {
                bail!("Backup file {} does not exist", path.display());
            }
        }
        Commands::Backups => {
            for path in backup::list_backups(&config.backup_dir()?)? {
                println!("{}", path.display());
            }
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                println!("{}", serde_json::to_string_pretty(settings.data())?);
            }
            SettingsAction::Get { key } => match settings.get(&key) {
                Some(value) => println!("{}", value),
                None => println!("(not set)"),
            },
            SettingsAction::Set { key, value } => {
                let value = serde_json::from_str(&value)
                    .unwrap_or_else(|_| serde_json::Value::String(value));
                settings
                    .set(&key, value)
                    .with_context(|| format!("Could not change setting '{}'", key))?;
                println!("Saved {}", key);
            }
        },
    }

    Ok(())
}

fn print_table(subs: &[Subscription], today: NaiveDate) {
    if subs.is_empty() {
        println!("No subscriptions found");
        return;
    }

    println!(
        "{:<15} {:<24} {:<11} {:>10} {:<16} {:>5}  {:<13}",
        "ID", "NAME", "RENEWS", "PRICE", "CATEGORY", "DAYS", "STATUS"
    );
    for sub in subs {
        println!(
            "{:<15} {:<24} {:<11} {:>10.2} {:<16} {:>5}  {:<13}",
            sub.id,
            truncate(&sub.name, 24),
            sub.date_str(),
            sub.price,
            truncate(&sub.category, 16),
            sub.days_remaining(today),
            sub.status(today).label()
        );
    }

    let total: f64 = subs.iter().map(|s| s.price).sum();
    println!("\n{} subscriptions, {:.2} per month", subs.len(), total);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
