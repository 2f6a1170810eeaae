//! The ledger: the entry point that creates and looks up chains.

use std::fmt;
use std::sync::Arc;

use blockledger_core::ChainName;
use blockledger_store::{CreateResult, Storage};

use crate::chain::Chain;
use crate::config::LedgerConfig;
use crate::error::Result;

/// Result of [`Ledger::create_chain`].
#[derive(Debug)]
pub enum CreateChainResult {
    /// The chain was created with its genesis block.
    Created(Chain),
    /// A chain with the normalized name already exists.
    AlreadyExists,
    /// The name was unusable or the backend failed; nothing was created.
    Failed,
}

impl CreateChainResult {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateChainResult::Created(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, CreateChainResult::AlreadyExists)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CreateChainResult::Failed)
    }

    /// The new chain, if one was created.
    pub fn into_chain(self) -> Option<Chain> {
        match self {
            CreateChainResult::Created(chain) => Some(chain),
            _ => None,
        }
    }
}

/// Result of [`Ledger::get_chain`].
#[derive(Debug)]
pub enum GetChainResult {
    Found(Chain),
    /// No such chain, or it could not be looked up.
    NotFound,
}

impl GetChainResult {
    pub fn is_found(&self) -> bool {
        matches!(self, GetChainResult::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GetChainResult::NotFound)
    }

    pub fn into_chain(self) -> Option<Chain> {
        match self {
            GetChainResult::Found(chain) => Some(chain),
            GetChainResult::NotFound => None,
        }
    }
}

/// Creates and looks up chains in one shared storage.
///
/// Construct once at startup and pass it to whatever needs it; clones
/// share the storage.
#[derive(Clone)]
pub struct Ledger {
    storage: Arc<dyn Storage>,
}

impl Ledger {
    /// Create a ledger over a storage instance.
    pub fn new<S: Storage + 'static>(storage: S) -> Self {
        Self::from_shared(Arc::new(storage))
    }

    /// Create a ledger over an already shared storage.
    pub fn from_shared(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Open the storage described by `config`.
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        Ok(Self::from_shared(config.open_storage()?))
    }

    /// The shared storage.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Create a chain with its genesis block.
    ///
    /// The name is trimmed and lower-cased first.
    pub async fn create_chain(&self, name: &str) -> CreateChainResult {
        let name = match ChainName::new(name) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "rejected chain name");
                return CreateChainResult::Failed;
            }
        };

        match self.storage.create_chain(&name).await {
            Ok(CreateResult::Created) => {
                CreateChainResult::Created(Chain::new(name, self.storage.clone()))
            }
            Ok(CreateResult::AlreadyExists) => CreateChainResult::AlreadyExists,
            Err(e) => {
                tracing::warn!(
                    backend = self.storage.kind(),
                    chain = %name,
                    error = %e,
                    "failed to create chain"
                );
                CreateChainResult::Failed
            }
        }
    }

    /// Look up an existing chain.
    pub async fn get_chain(&self, name: &str) -> GetChainResult {
        let Ok(name) = ChainName::new(name) else {
            return GetChainResult::NotFound;
        };

        match self.storage.has_chain(&name).await {
            Ok(true) => GetChainResult::Found(Chain::new(name, self.storage.clone())),
            Ok(false) => GetChainResult::NotFound,
            Err(e) => {
                tracing::warn!(
                    backend = self.storage.kind(),
                    chain = %name,
                    error = %e,
                    "failed to look up chain"
                );
                GetChainResult::NotFound
            }
        }
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("backend", &self.storage.kind())
            .finish()
    }
}
