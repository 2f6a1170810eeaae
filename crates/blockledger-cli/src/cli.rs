use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use blockledger::{LedgerConfig, StorageKind, ENV_PATH, ENV_STORAGE};

#[derive(Parser, Debug)]
#[command(
    name = "blockledger",
    about = "Named, append-only chains of hash-linked blocks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage backend: memory, filesystem or database (and their aliases).
    /// Memory storage does not outlive the process.
    #[arg(long, global = true, env = ENV_STORAGE)]
    pub storage: Option<String>,

    /// Filesystem root or database file.
    #[arg(long, global = true, env = ENV_PATH)]
    pub path: Option<PathBuf>,
}

impl Cli {
    /// Storage selection from flags, falling back to the environment.
    pub fn ledger_config(&self) -> blockledger::Result<LedgerConfig> {
        let storage = match &self.storage {
            Some(kind) => kind.parse()?,
            None => StorageKind::default(),
        };
        let path = self.path.clone().filter(|p| !p.as_os_str().is_empty());

        Ok(LedgerConfig { storage, path })
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a chain with its genesis block
    Create(ChainArgs),
    /// Append a block to a chain
    Append(AppendArgs),
    /// Print blocks as JSON lines
    List(ListArgs),
    /// Print one block
    Show(ShowArgs),
    /// Check every hash and link of a chain
    Validate(ChainArgs),
}

#[derive(Args, Debug)]
pub struct ChainArgs {
    pub chain: String,
}

#[derive(Args, Debug)]
pub struct AppendArgs {
    pub chain: String,
    /// Block payload; read from --file or stdin when omitted.
    pub data: Option<String>,
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    pub chain: String,
    #[arg(long, default_value = "0")]
    pub offset: u64,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: u64,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub chain: String,
    pub index: u64,
}
