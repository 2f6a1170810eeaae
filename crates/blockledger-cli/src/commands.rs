use std::io::Read;

use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use blockledger::{Block, Chain, CreateChainResult, Ledger, ValidationReport};

use crate::cli::*;

/// A block as printed: binary fields in base64, ISO-8601 timestamp.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    pub index: u64,
    pub hash: String,
    pub previous_hash: String,
    pub timestamp: String,
    pub data: String,
}

impl From<&Block> for BlockView {
    fn from(block: &Block) -> Self {
        Self {
            index: block.index(),
            hash: STANDARD.encode(block.hash().as_bytes()),
            previous_hash: STANDARD.encode(block.previous_hash().as_bytes()),
            timestamp: block.timestamp().to_rfc3339(),
            data: STANDARD.encode(block.data()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationView {
    chain: String,
    valid: bool,
    blocks_checked: u64,
    broken_at: Option<u64>,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = cli.ledger_config()?;
    let ledger = Ledger::open(&config).context("failed to open storage")?;

    match cli.command {
        Command::Create(args) => cmd_create(&ledger, args).await,
        Command::Append(args) => cmd_append(&ledger, args).await,
        Command::List(args) => cmd_list(&ledger, args).await,
        Command::Show(args) => cmd_show(&ledger, args).await,
        Command::Validate(args) => cmd_validate(&ledger, args).await,
    }
}

async fn open_chain(ledger: &Ledger, name: &str) -> anyhow::Result<Chain> {
    match ledger.get_chain(name).await.into_chain() {
        Some(chain) => Ok(chain),
        None => bail!("chain {:?} not found", name),
    }
}

fn print_block(block: &Block) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(&BlockView::from(block))?);
    Ok(())
}

async fn cmd_create(ledger: &Ledger, args: ChainArgs) -> anyhow::Result<()> {
    match ledger.create_chain(&args.chain).await {
        CreateChainResult::Created(chain) => {
            println!("created chain {}", chain.name());
            Ok(())
        }
        CreateChainResult::AlreadyExists => bail!("chain {:?} already exists", args.chain),
        CreateChainResult::Failed => bail!("failed to create chain {:?}", args.chain),
    }
}

fn read_payload(args: &AppendArgs) -> anyhow::Result<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.clone().into_bytes());
    }
    if let Some(file) = &args.file {
        return std::fs::read(file).with_context(|| format!("failed to read {}", file.display()));
    }

    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .context("failed to read payload from stdin")?;
    Ok(buf)
}

async fn cmd_append(ledger: &Ledger, args: AppendArgs) -> anyhow::Result<()> {
    let chain = open_chain(ledger, &args.chain).await?;
    let mut block = Block::new(read_payload(&args)?);

    chain
        .try_add_block(&mut block)
        .await
        .with_context(|| format!("failed to append to chain {}", chain.name()))?;

    print_block(&block)
}

/// Collect one page of blocks using `each` and `cancel`.
pub async fn page(chain: &Chain, offset: u64, limit: u64) -> Vec<Block> {
    let mut blocks = Vec::new();
    if limit == 0 {
        return blocks;
    }

    chain
        .each(offset, |context| {
            blocks.push(context.block().clone());
            if context.index() + 1 >= limit {
                context.cancel();
            }
        })
        .await;

    blocks
}

async fn cmd_list(ledger: &Ledger, args: ListArgs) -> anyhow::Result<()> {
    let chain = open_chain(ledger, &args.chain).await?;
    for block in page(&chain, args.offset, args.limit).await {
        print_block(&block)?;
    }
    Ok(())
}

async fn cmd_show(ledger: &Ledger, args: ShowArgs) -> anyhow::Result<()> {
    let chain = open_chain(ledger, &args.chain).await?;
    match chain.block_at(args.index).await {
        Some(block) => print_block(&block),
        None => bail!("chain {} has no block {}", chain.name(), args.index),
    }
}

async fn cmd_validate(ledger: &Ledger, args: ChainArgs) -> anyhow::Result<()> {
    let chain = open_chain(ledger, &args.chain).await?;
    let ValidationReport {
        valid,
        blocks_checked,
        broken_at,
    } = chain.verify().await;

    let view = ValidationView {
        chain: chain.name().to_string(),
        valid,
        blocks_checked,
        broken_at,
    };
    println!("{}", serde_json::to_string(&view)?);

    if !valid {
        bail!("chain {} is broken", chain.name());
    }
    Ok(())
}
