//! spore-cli: query Spore records from the command line.
//!
//! Results are printed to stdout as pretty JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use spore_query::{
    parse_h256, HashType, HexBytes, QueryOptions, Script, SporeConfig, SporeQueryApi,
    SporeService, H256,
};

/// spore-cli: Spore record queries
#[derive(Parser, Debug)]
#[command(name = "spore-cli")]
#[command(about = "Query Spore records on CKB through an indexer and a node")]
struct Args {
    /// Indexer JSON-RPC endpoint (overrides SPORE_INDEXER_URL)
    #[arg(long)]
    indexer: Option<String>,

    /// Node JSON-RPC endpoint (overrides SPORE_NODE_URL)
    #[arg(long)]
    node: Option<String>,

    /// Spore script code hash (overrides SPORE_CODE_HASH)
    #[arg(long, value_parser = parse_h256)]
    spore_code_hash: Option<H256>,

    /// Spore script hash type (overrides SPORE_HASH_TYPE)
    #[arg(long)]
    spore_hash_type: Option<HashType>,

    /// Log filter used when RUST_LOG is unset (falls back to SPORE_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Listing flags shared by `list` and `list-by-lock`.
#[derive(ClapArgs, Debug, Default)]
struct ListFlags {
    /// Only records in this cluster
    #[arg(long)]
    cluster: Option<HexBytes>,

    /// Cells to skip from the newest end
    #[arg(long)]
    skip: Option<usize>,

    /// Maximum records to return
    #[arg(long)]
    limit: Option<usize>,

    /// Accepted content types (repeatable)
    #[arg(long = "content-type")]
    content_types: Vec<String>,

    /// Include content bytes
    #[arg(long)]
    content: bool,
}

impl ListFlags {
    fn options(&self) -> QueryOptions {
        QueryOptions {
            skip: self.skip,
            limit: self.limit,
            content_types: (!self.content_types.is_empty()).then(|| self.content_types.clone()),
            include_content: self.content,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up one record by id
    Get {
        /// Record id (0x-prefixed hex)
        id: HexBytes,

        /// Include content bytes
        #[arg(long)]
        content: bool,
    },

    /// List records, newest first
    List(ListFlags),

    /// List records owned by a lock script
    ListByLock {
        /// Lock script code hash
        #[arg(long, value_parser = parse_h256)]
        code_hash: H256,

        /// Lock script hash type
        #[arg(long)]
        hash_type: HashType,

        /// Lock script args
        #[arg(long)]
        args: HexBytes,

        #[command(flatten)]
        flags: ListFlags,
    },

    /// Most recently created records that are still live
    Recent {
        /// Records wanted
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Only records that belong to a cluster
        #[arg(long)]
        with_cluster: bool,
    },
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let fallback = level
        .map(str::to_string)
        .or_else(|| std::env::var("SPORE_LOG_LEVEL").ok())
        .unwrap_or_else(|| "warn".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

/// Environment configuration with command-line overrides applied.
fn resolve_config(args: &Args) -> Result<SporeConfig> {
    let mut config = SporeConfig::from_env().context("failed to load configuration")?;

    if let Some(url) = &args.indexer {
        config.indexer_url = url.clone();
    }
    if let Some(url) = &args.node {
        config.node_url = url.clone();
    }
    if let Some(code_hash) = args.spore_code_hash {
        config.spore_script.code_hash = code_hash;
    }
    if let Some(hash_type) = args.spore_hash_type {
        config.spore_script.hash_type = hash_type;
    }

    config.validate()?;
    Ok(config)
}

async fn run(service: &dyn SporeQueryApi, command: Command) -> Result<serde_json::Value> {
    let value = match command {
        Command::Get { id, content } => {
            let options = QueryOptions {
                include_content: content,
                ..Default::default()
            };
            serde_json::to_value(service.get(&id, &options).await?)?
        }
        Command::List(flags) => {
            let page = service.list(flags.cluster.as_ref(), &flags.options()).await?;
            serde_json::to_value(page)?
        }
        Command::ListByLock {
            code_hash,
            hash_type,
            args,
            flags,
        } => {
            let lock = Script::new(code_hash, hash_type, args);
            let page = service
                .list_by_lock(&lock, flags.cluster.as_ref(), &flags.options())
                .await?;
            serde_json::to_value(page)?
        }
        Command::Recent {
            limit,
            with_cluster,
        } => serde_json::to_value(service.recent(limit, with_cluster).await?)?,
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref())?;

    let config = resolve_config(&args)?;
    info!(
        "[spore] Querying indexer {} / node {}",
        config.indexer_url, config.node_url
    );
    let service = SporeService::new(config).context("failed to build Spore service")?;

    let output = run(&service, args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
