use catalog_facets::app::selections::{query_from_selections, selections_from_query, Selections};
use catalog_facets::adapters::search::InMemorySearchIndex;
use catalog_facets::core::{ConfigProvider, SearchSink, Storage};
use catalog_facets::domain::hierarchy::HierarchyMode;
use catalog_facets::domain::query::QueryFilter;
use catalog_facets::utils::error::{CatalogError, ErrorSeverity};
use catalog_facets::utils::{logger, validation::Validate};
use catalog_facets::{resolve_sub_level, CatalogConfig, CliConfig, Command, LocalStorage, Result};
use clap::Parser;
use serde_json::{json, Value};

async fn read_json<T: serde::de::DeserializeOwned>(storage: &LocalStorage, path: &str) -> Result<T> {
    let data = storage.read_file(path).await?;
    Ok(serde_json::from_slice(&data)?)
}

fn load_config(cli: &CliConfig) -> Result<CatalogConfig> {
    let config = match &cli.config {
        Some(path) => CatalogConfig::from_file(path)?,
        None => CatalogConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

async fn run(cli: &CliConfig, config: &CatalogConfig, storage: &LocalStorage) -> Result<Value> {
    match &cli.command {
        Command::BuildQuery { selections } => {
            let selections: Selections = read_json(storage, selections).await?;
            let query = query_from_selections(config, &selections);
            Ok(serde_json::to_value(query)?)
        }
        Command::Recover { query } => {
            let query: Option<QueryFilter> = read_json(storage, query).await?;
            let selections = selections_from_query(config, query.as_ref());
            Ok(serde_json::to_value(selections)?)
        }
        Command::NextBucket {
            database,
            key,
            value,
        } => {
            let mode = if *database {
                HierarchyMode::Database
            } else {
                config.default_mode()
            };
            let chain = config.hierarchy_chain(mode);
            let level = resolve_sub_level(&chain, key.as_deref(), value.as_deref());
            Ok(serde_json::to_value(level)?)
        }
        Command::Search { docs, selections } => {
            let docs: Vec<Value> = read_json(storage, docs).await?;
            let index = InMemorySearchIndex::new();
            for doc in docs {
                index.index(uuid::Uuid::new_v4(), doc).await?;
            }

            let query = match selections {
                Some(path) => {
                    let selections: Selections = read_json(storage, path).await?;
                    query_from_selections(config, &selections)
                }
                None => None,
            };
            let hits = index.search(query.as_ref()).await;
            tracing::info!("🔍 {} of {} document(s) matched", hits.len(), index.len().await);
            Ok(json!({ "total": hits.len(), "hits": hits }))
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 先載入配置，`[logging]` 才能參與日誌設定
    let loaded = load_config(&cli);
    let (verbose, json_logs) = match &loaded {
        Ok(config) => config.logging_flags(cli.verbose, cli.json_logs),
        Err(_) => (cli.verbose, cli.json_logs),
    };

    // 初始化日誌
    if json_logs {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting catalog-facets CLI");
    if verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }
    if let Some(path) = &cli.config {
        tracing::info!("📄 Catalog config from {}", path);
    }

    let storage = LocalStorage::new(cli.base_path.clone());
    let outcome = match loaded {
        Ok(config) => run(&cli, &config, &storage).await,
        Err(e) => Err(e),
    };

    let result = match outcome {
        Ok(value) => {
            let rendered = serde_json::to_string_pretty(&value)?;
            match &cli.output {
                Some(path) => storage
                    .write_file(path, rendered.as_bytes())
                    .await
                    .map(|_| tracing::info!("📁 Output saved to: {}", path)),
                None => {
                    println!("{}", rendered);
                    Ok(())
                }
            }
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        report_failure(&e);
    }

    Ok(())
}

fn report_failure(e: &CatalogError) {
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}
