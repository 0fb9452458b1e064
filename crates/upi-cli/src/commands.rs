use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};
use upi_identifier::{
    AddressNormalizer, CoordinateHasher, GazetteerGeocoder, Identifier, IdentifierConfig,
};
use upi_ledger::{LogEntry, LogQuery, LogRecord, Meta};
use upi_node::{LocalBackend, Node, NodeConfig};
use upi_types::{ContentAddress, Upi};

use crate::cli::*;

const DEFAULT_DATA_DIR: &str = ".upi";

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Normalize(args) => cmd_normalize(args, format),
        Command::Derive(args) => cmd_derive(args, format),
        Command::Resolve(args) => cmd_resolve(args, format).await,
        Command::Put(args) => {
            let node = open_node(cli.config, cli.data_dir).await?;
            cmd_put(&node, args, format).await
        }
        Command::Get(args) => {
            let node = open_node(cli.config, cli.data_dir).await?;
            cmd_get(&node, args, format).await
        }
        Command::Log(args) => {
            let node = open_node(cli.config, cli.data_dir).await?;
            match args.action {
                LogAction::Add {
                    upi,
                    content_address,
                    owner,
                    meta,
                } => cmd_log_add(&node, &upi, &content_address, owner, meta, format).await,
                LogAction::List {
                    owner,
                    id,
                    limit,
                    reverse,
                } => cmd_log_list(&node, owner, id, limit, reverse, format).await,
                LogAction::Verify => cmd_log_verify(&node, format).await,
            }
        }
    }
}

async fn open_node(config: Option<PathBuf>, data_dir: Option<PathBuf>) -> anyhow::Result<Node> {
    let config = match config {
        Some(path) => NodeConfig::load(&path)?,
        None => NodeConfig::default(),
    };
    let root = data_dir
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let node = Node::new(config, Arc::new(LocalBackend::new(&root)))?;
    node.initialize()
        .await
        .with_context(|| format!("opening storage at {}", root.display()))?;
    Ok(node)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_normalize(args: NormalizeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let normalized = AddressNormalizer::default().normalize(&args.address);
    match format {
        OutputFormat::Json => print_json(&json!({
            "address": args.address,
            "normalized": normalized,
        })),
        OutputFormat::Text => {
            println!("{normalized}");
            Ok(())
        }
    }
}

fn cmd_derive(args: DeriveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let hasher = CoordinateHasher::new(args.min_digits)?;
    let lat = Some(args.lat);
    let lng = Some(args.lng);
    let unit = args.unit.as_deref();
    let source = hasher.canonical_source(lat, lng, unit)?;
    let upi = hasher.derive_upi(lat, lng, unit)?;
    match format {
        OutputFormat::Json => print_json(&json!({ "upi": upi, "source": source })),
        OutputFormat::Text => {
            println!("{}", upi.to_string().green().bold());
            println!("  source: {}", source.dimmed());
            Ok(())
        }
    }
}

async fn cmd_resolve(args: ResolveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let gazetteer = GazetteerGeocoder::load(&args.gazetteer)
        .with_context(|| format!("loading gazetteer {}", args.gazetteer.display()))?;
    let identifier = Identifier::new(IdentifierConfig::default(), Arc::new(gazetteer))?;
    identifier.initialize().await;

    let normalized = identifier.normalize_address(&args.address);
    let upi = identifier.resolve_to_upi(&args.address).await?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "address": args.address,
            "normalized": normalized,
            "upi": upi,
        })),
        OutputFormat::Text => {
            println!("{}", upi.to_string().green().bold());
            println!("  address: {}", normalized.dimmed());
            Ok(())
        }
    }
}

async fn cmd_put(node: &Node, args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let Some(address) = node.add_data(&json!(args.data)).await? else {
        bail!("payload must be a non-empty string");
    };
    match format {
        OutputFormat::Json => print_json(&json!({ "address": address, "bytes": args.data.len() })),
        OutputFormat::Text => {
            println!("{} {}", "✓".green().bold(), address.to_string().yellow());
            Ok(())
        }
    }
}

async fn cmd_get(node: &Node, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let address: ContentAddress = args
        .address
        .parse()
        .with_context(|| format!("`{}` is not a content address", args.address))?;
    let Some(data) = node.get(&address).await? else {
        bail!("no object stored under {}", address.short_hex());
    };
    match format {
        OutputFormat::Json => print_json(&json!({
            "address": address,
            "data": String::from_utf8_lossy(&data),
        })),
        OutputFormat::Text => {
            println!("{}", String::from_utf8_lossy(&data));
            Ok(())
        }
    }
}

async fn cmd_log_add(
    node: &Node,
    upi: &str,
    content_address: &str,
    owner: Option<String>,
    pairs: Vec<(String, String)>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let id: Upi = upi
        .parse()
        .with_context(|| format!("`{upi}` is not a UPI"))?;
    let hash: ContentAddress = content_address
        .parse()
        .with_context(|| format!("`{content_address}` is not a content address"))?;

    let mut meta: Meta = pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    if let Some(owner) = owner {
        meta.insert(node.config().owner_key.clone(), Value::String(owner));
    }

    let record = node.append(LogEntry::new(id, hash, meta)?).await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&record)?),
        OutputFormat::Text => {
            println!(
                "{} Appended #{} for {}",
                "✓".green().bold(),
                record.seq.to_string().bold(),
                record.entry.id.short_hex().yellow()
            );
            Ok(())
        }
    }
}

async fn cmd_log_list(
    node: &Node,
    owner: Option<String>,
    id: Option<String>,
    limit: Option<usize>,
    reverse: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut query = LogQuery::all();
    query.owner = owner;
    query.limit = limit;
    query.reverse = reverse;
    if let Some(id) = id {
        let id: Upi = id.parse().with_context(|| format!("`{id}` is not a UPI"))?;
        query = query.with_id(id);
    }

    let records = node.records(&query).await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&records)?),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No log entries.");
            }
            for record in &records {
                print_record(record, &node.config().owner_key);
            }
            Ok(())
        }
    }
}

fn print_record(record: &LogRecord, owner_key: &str) {
    let owner = record.entry.meta_str(owner_key).unwrap_or("-");
    println!(
        "{}  {}  {}  {}  {}",
        format!("#{}", record.seq).yellow().bold(),
        record.entry.id.short_hex().cyan(),
        record.entry.hash.short_hex().dimmed(),
        owner.green(),
        record.appended_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
    );
}

async fn cmd_log_verify(node: &Node, format: OutputFormat) -> anyhow::Result<()> {
    let report = node.verify_log().await?;
    if format == OutputFormat::Json {
        print_json(&serde_json::to_value(&report)?)?;
    } else if report.is_valid() {
        println!(
            "{} {} records, hash chain intact",
            "✓".green().bold(),
            report.record_count
        );
    } else {
        println!(
            "{} {} violations in {} records",
            "✗".red().bold(),
            report.violations.len(),
            report.record_count
        );
        for v in &report.violations {
            println!("  #{} {:?}: {}", v.seq, v.kind, v.description);
        }
    }
    if !report.is_valid() {
        bail!("record log failed verification");
    }
    Ok(())
}
