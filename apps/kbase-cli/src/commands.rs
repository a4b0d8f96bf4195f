use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kbase_geo::{aggregate_by_country, parse_geo_counts, IpLocator, RangeTableSearcher};
use kbase_indexnow::IndexNowClient;
use kbase_license::{JsonFileLicenseRepository, LicenseUpload, LicenseUsecase};
use kbase_ops::RequestTimer;
use kbase_share::ShareClient;
use kbase_types::config::KbaseConfig;
use serde::Serialize;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "kbase")]
#[command(author, version, about = "Knowledge-base backend tooling", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "KBASE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Notify search engines about changed pages.
    #[command(subcommand)]
    Indexnow(IndexNowCommand),
    /// Visit distribution helpers.
    #[command(subcommand)]
    Geo(GeoCommand),
    /// Manage the installed license.
    #[command(subcommand)]
    License(LicenseCommand),
    /// Load a document page through the share API and report call timings.
    Page {
        node_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum IndexNowCommand {
    /// Submit absolute urls.
    Submit {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Submit the document urls of the given node ids.
    Nodes {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GeoCommand {
    /// Aggregate a `country|province|city -> count` JSON file by country.
    Aggregate { file: PathBuf },
    /// Resolve an IPv4 address against an ip2region source table.
    Lookup {
        #[arg(long)]
        table: Option<PathBuf>,
        ip: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum LicenseCommand {
    Show,
    UploadCode { code: String },
    UploadFile { path: PathBuf },
    Delete,
}

pub async fn execute(command: Commands, config: &KbaseConfig) -> Result<()> {
    match command {
        Commands::Indexnow(cmd) => indexnow(cmd, config).await,
        Commands::Geo(cmd) => geo(cmd, config),
        Commands::License(cmd) => license(cmd, config).await,
        Commands::Page { node_id } => page(&node_id, config).await,
    }
}

async fn indexnow(cmd: IndexNowCommand, config: &KbaseConfig) -> Result<()> {
    let client = IndexNowClient::new(config.indexnow.clone())?;
    let urls = match cmd {
        IndexNowCommand::Submit { urls } => urls,
        IndexNowCommand::Nodes { ids } => client.build_document_urls(&ids),
    };
    let outcomes = if urls.len() == 1 {
        vec![client.submit_url(urls[0].clone()).await]
    } else {
        client.submit_urls(&urls).await
    };
    print_json(&outcomes)
}

fn geo(cmd: GeoCommand, config: &KbaseConfig) -> Result<()> {
    match cmd {
        GeoCommand::Aggregate { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let counts = parse_geo_counts(&raw)?;
            print_json(&aggregate_by_country(&counts))
        }
        GeoCommand::Lookup { table, ip } => {
            let table = table
                .or_else(|| config.geo.region_table.as_ref().map(PathBuf::from))
                .context("no region table given (use --table or geo.region_table)")?;
            let locator = IpLocator::new(RangeTableSearcher::from_file(&table)?);
            let address = locator.lookup(&ip);
            print_json(&json!({ "address": address, "geo_key": address.geo_key() }))
        }
    }
}

async fn license(cmd: LicenseCommand, config: &KbaseConfig) -> Result<()> {
    let usecase = LicenseUsecase::new(JsonFileLicenseRepository::new(
        &config.license.store_path,
    ));
    match cmd {
        LicenseCommand::Show => print_json(&usecase.get_license().await?),
        LicenseCommand::UploadCode { code } => {
            print_json(&usecase.upload_license(LicenseUpload::Code(code)).await?)
        }
        LicenseCommand::UploadFile { path } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            print_json(&usecase.upload_license(LicenseUpload::File(data)).await?)
        }
        LicenseCommand::Delete => {
            usecase.delete_license().await?;
            print_json(&usecase.get_license().await?)
        }
    }
}

async fn page(node_id: &str, config: &KbaseConfig) -> Result<()> {
    let timer = Arc::new(RequestTimer::from_config(&config.timer));
    let client = ShareClient::new(&config.share, timer.clone())?;
    let (document, layout) = tokio::join!(client.load_document(node_id), client.load_layout());
    print_json(&json!({
        "document": document,
        "layout": layout,
        "timings": timer.get_stats(),
    }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
