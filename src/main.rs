//! CLI entry point for the disaster forecast tool.
//!
//! Provides subcommands for building the occurrence-table cache, printing a
//! year's forecast, serving forecasts over HTTP, and publishing them to S3.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use disaster_forecast::{
    config::PipelineConfig,
    output::{print_pretty, render_json, summary_lines, write_json},
    pipeline::{self, FittedPipeline, predict_by_year},
    publish::{PublishedForecast, upload_forecast},
    server,
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "disaster_forecast")]
#[command(about = "Forecast disaster declarations per US state", long_about = None)]
struct Cli {
    /// JSON pipeline config; the flags below override its values
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    /// Raw declarations CSV, as a path or URL
    #[arg(short, long, global = true, env = "DISASTER_INPUT")]
    input: Option<String>,

    /// Occurrence table cache, reused when it exists
    #[arg(long, global = true, env = "DISASTER_CACHE")]
    cache: Option<PathBuf>,

    /// Number of most common incident types to model
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Seed for the train/test shuffle
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Keep territories and other non-state codes in the source
    #[arg(long, global = true, default_value_t = false)]
    keep_territories: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the occurrence table cache from the raw source
    Build {
        /// Rebuild even if the cache already exists
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
    /// Fit the model and print one year's forecast as JSON
    Predict {
        /// Fiscal year to forecast (defaults to next year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Write the JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print one line per state with its average instead of JSON
        #[arg(long, default_value_t = false)]
        summary: bool,
    },
    /// Fit the model and serve forecasts over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
        bind: String,
    },
    /// Fit the model and publish one year's forecast to a file and/or S3
    Publish {
        /// Fiscal year to forecast
        #[arg(short, long)]
        year: i32,

        /// S3 bucket name to upload the forecast JSON to (e.g., "my-bucket")
        #[arg(long, env = "S3_BUCKET")]
        s3_bucket: Option<String>,

        /// Gzip compress the JSON before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Also write the forecast JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(cache) = &self.cache {
            config.cache_path = cache.clone();
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.keep_territories {
            config.filter_states = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/disaster_forecast.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("disaster_forecast.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = cli.pipeline_config()?;

    match cli.command {
        Commands::Build { force } => {
            let table = if force {
                pipeline::rebuild_table(&config).await?
            } else {
                pipeline::load_or_build_table(&config).await?
            };
            info!(
                cache = %config.cache_path.display(),
                rows = table.rows().len(),
                pairs = table.pair_count(),
                common = ?table.common_incidents(),
                "Occurrence table ready"
            );
        }
        Commands::Predict {
            year,
            output,
            summary,
        } => {
            let year = year.unwrap_or_else(|| Utc::now().year() + 1);
            let fitted = pipeline::initialize(&config).await?;
            let predictions = predict_by_year(&fitted, year)?;
            print_pretty(&predictions);

            match output {
                Some(path) => {
                    write_json(&path, &predictions)?;
                    info!(path = %path.display(), year, "Forecast written");
                }
                None if summary => {
                    for line in summary_lines(&predictions) {
                        println!("{line}");
                    }
                }
                None => println!("{}", render_json(&predictions)?),
            }
        }
        Commands::Serve { bind } => {
            let fitted = pipeline::initialize(&config).await?;
            server::serve(Arc::new(fitted), &bind).await?;
        }
        Commands::Publish {
            year,
            s3_bucket,
            gzip,
            output,
        } => {
            let fitted = pipeline::initialize(&config).await?;
            publish(&fitted, year, s3_bucket, gzip, output).await?;
        }
    }

    Ok(())
}

/// Writes the forecast for `year` to a local file and/or uploads it to S3.
#[tracing::instrument(skip(fitted, s3_bucket, output))]
async fn publish(
    fitted: &FittedPipeline,
    year: i32,
    s3_bucket: Option<String>,
    gzip: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let forecast = PublishedForecast::generate(fitted, year)?;

    if let Some(path) = &output {
        write_json(path, &forecast)?;
        info!(path = %path.display(), "Forecast written");
    }

    match s3_bucket.filter(|b| !b.is_empty()) {
        Some(bucket) => {
            let aws = aws_config::load_from_env().await;
            let client = aws_sdk_s3::Client::new(&aws);
            let key = upload_forecast(&client, &bucket, &forecast, gzip).await?;
            info!(bucket = %bucket, key = %key, "S3 upload complete");
        }
        None if output.is_none() => {
            warn!("Neither --s3-bucket nor --output given, printing forecast");
            println!("{}", render_json(&forecast)?);
        }
        None => info!("S3 bucket not specified, skipping upload"),
    }

    Ok(())
}
