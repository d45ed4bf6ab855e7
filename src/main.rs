use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beymeta::analysis::{parse_combo, Analyzer, ComboSpec, SparklineTarget, MAX_WEEKS};
use beymeta::api::state::AppState;
use beymeta::config::AppConfig;
use beymeta::models::{PartKind, Region};
use beymeta::normalize::ComboKey;
use beymeta::storage::{JsonlSource, RowFilter, RowSource, StorageConfig};

#[derive(Parser)]
#[command(name = "beymeta")]
#[command(about = "Recency-weighted Beyblade X tournament meta analytics")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Reference date for recency weighting (YYYY-MM-DD); defaults to today
    #[arg(long)]
    reference_date: Option<NaiveDate>,

    /// Restrict every report to one region (NA, EU, JAPAN, ASIA, OCEANIA, SA)
    #[arg(long)]
    region: Option<Region>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,
    },

    /// Database summary
    Summary,

    /// Rank blades by recency-weighted score
    Blades {
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        min_uses: Option<u32>,
    },

    /// Rank full combos
    Combos {
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        min_uses: Option<u32>,
    },

    /// Rank one part kind (ratchet, bit, assist, lock_chip)
    Parts {
        kind: PartKind,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        min_uses: Option<u32>,
    },

    /// Best combos for one blade
    BladeCombos {
        blade: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Compare two blades, or two combos written as blade|ratchet|bit
    Compare {
        a: String,
        b: String,

        /// Treat both arguments as combos
        #[arg(long)]
        combos: bool,
    },

    /// Usage in a trailing window
    Snapshot {
        #[arg(long)]
        days: Option<i64>,
    },

    /// Champion, risers and fallers around the latest tournament
    Spotlight,

    /// Blade share distribution
    Distribution {
        /// Trailing window; all time when omitted
        #[arg(long)]
        days: Option<i64>,

        #[arg(long)]
        top: Option<usize>,
    },

    /// Monthly blade share series
    Share {
        #[arg(long)]
        top: Option<usize>,
    },

    /// Era and month breakdown of the meta
    Evolution {
        #[arg(long)]
        top: Option<usize>,
    },

    /// Weekly score series for a blade or combo
    Sparkline {
        #[arg(long)]
        blade: Option<String>,

        /// blade|ratchet|bit[|assist]
        #[arg(long)]
        combo: Option<String>,

        #[arg(long)]
        weeks: Option<usize>,
    },

    /// Hidden gem combos
    Gems,

    /// Rate a deck of three combos written as blade|ratchet|bit[|assist]
    RateDeck {
        #[arg(required = true, num_args = 3)]
        combos: Vec<String>,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = PathBuf::from(&cli.config);
    let mut config = if path.exists() {
        AppConfig::from_file(&path).with_context(|| format!("Loading {}", path.display()))?
    } else {
        AppConfig::default()
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if cli.reference_date.is_some() {
        config.reference_date = cli.reference_date;
    }
    Ok(config)
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn combo_arg(value: &str) -> Result<ComboKey> {
    match parse_combo(value) {
        Some(key) => Ok(key),
        None => bail!("Invalid combo {:?}, expected blade|ratchet|bit", value),
    }
}

fn combo_spec(value: &str) -> Result<ComboSpec> {
    let parts: Vec<&str> = value.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [blade, ratchet, bit] => Ok(ComboSpec::new(*blade, *ratchet, *bit)),
        [blade, ratchet, bit, assist] => {
            let mut spec = ComboSpec::new(*blade, *ratchet, *bit);
            spec.assist = Some(assist.to_string());
            Ok(spec)
        }
        _ => bail!("Invalid combo {:?}, expected blade|ratchet|bit", value),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.log_level, cli.json_logs);
    tracing::info!("Starting beymeta v{}", env!("CARGO_PKG_VERSION"));

    let storage = StorageConfig::new(config.data_dir.clone());
    let source: Arc<dyn RowSource> = Arc::new(JsonlSource::from_config(&storage));
    let filter = match cli.region {
        Some(region) => RowFilter::all().with_region(region),
        None => RowFilter::all(),
    };

    let mut analyzer = Analyzer::new(Arc::clone(&source));
    if let Some(date) = config.reference_date {
        analyzer = analyzer.with_reference_date(date);
    }
    let defaults = config.analysis.clone();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let app = beymeta::api::build_router(AppState::new(source, config));
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Summary => print_json(&analyzer.database_summary(&filter).await?)?,
        Commands::Blades { limit, min_uses } => print_json(
            &analyzer
                .ranked_blades(
                    &filter,
                    limit.unwrap_or(defaults.blade_limit),
                    min_uses.unwrap_or(defaults.blade_min_uses),
                )
                .await?,
        )?,
        Commands::Combos { limit, min_uses } => print_json(
            &analyzer
                .ranked_combos(
                    &filter,
                    limit.unwrap_or(defaults.combo_limit),
                    min_uses.unwrap_or(defaults.combo_min_uses),
                )
                .await?,
        )?,
        Commands::Parts {
            kind,
            limit,
            min_uses,
        } => print_json(
            &analyzer
                .ranked_parts(
                    kind,
                    &filter,
                    limit.unwrap_or(defaults.part_limit),
                    min_uses.unwrap_or(defaults.part_min_uses),
                )
                .await?,
        )?,
        Commands::BladeCombos { blade, limit } => print_json(
            &analyzer
                .best_combos_for_blade(&blade, &filter, limit.unwrap_or(defaults.blade_combo_limit))
                .await?,
        )?,
        Commands::Compare { a, b, combos } => {
            let comparison = if combos {
                analyzer
                    .compare_combos(&combo_arg(&a)?, &combo_arg(&b)?, &filter)
                    .await?
            } else {
                analyzer.compare_blades(&a, &b, &filter).await?
            };
            print_json(&comparison)?;
        }
        Commands::Snapshot { days } => print_json(
            &analyzer
                .meta_snapshot(&filter, days.unwrap_or(defaults.snapshot_days))
                .await?,
        )?,
        Commands::Spotlight => print_json(&analyzer.meta_spotlight(&filter).await?)?,
        Commands::Distribution { days, top } => print_json(
            &analyzer
                .meta_distribution(&filter, days, top.unwrap_or(defaults.distribution_top))
                .await?,
        )?,
        Commands::Share { top } => print_json(
            &analyzer
                .meta_share_over_time(&filter, top.unwrap_or(defaults.share_top))
                .await?,
        )?,
        Commands::Evolution { top } => print_json(
            &analyzer
                .meta_evolution(&filter, top.unwrap_or(defaults.evolution_top))
                .await?,
        )?,
        Commands::Sparkline {
            blade,
            combo,
            weeks,
        } => {
            let target = match (blade, combo) {
                (Some(blade), None) => SparklineTarget::blade(&blade),
                (None, Some(combo)) => SparklineTarget::Combo(combo_arg(&combo)?),
                _ => bail!("Specify exactly one of --blade or --combo"),
            };
            let weeks = weeks.unwrap_or(defaults.sparkline_weeks);
            if weeks == 0 || weeks > MAX_WEEKS {
                bail!("--weeks must be between 1 and {}", MAX_WEEKS);
            }
            print_json(&analyzer.sparkline(&target, weeks, &filter).await?)?;
        }
        Commands::Gems => print_json(&analyzer.hidden_gems(&filter).await?)?,
        Commands::RateDeck { combos } => {
            let specs = combos
                .iter()
                .map(|c| combo_spec(c))
                .collect::<Result<Vec<_>>>()?;
            print_json(&analyzer.rate_deck(&specs, &filter).await?)?;
        }
    }

    Ok(())
}
