//! Filesystem implementation of the Storage trait.
//!
//! Layout: `<root>/<sanitized-chain-name>/<index>.json`, one pretty-printed
//! [`BlockRecord`] per file. File presence is the existence proof for that
//! index.
//!
//! Mutations and tail lookups for one chain run under that chain's async
//! mutex, so "read tail, compute next index, write" never interleaves for
//! the same chain while unrelated chains proceed in parallel.
//!
//! Block files are written to a uniquely named hidden temporary file,
//! fsynced, then persisted without clobbering. Persisting fails if the
//! target exists, so a block file is never overwritten and readers never
//! see a partial file.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use blockledger_core::{Block, ChainName, CoreError};

use crate::cursor::BlockCursor;
use crate::error::{Result, StoreError};
use crate::record::BlockRecord;
use crate::traits::{BlockIterator, CreateResult, Storage};

/// Maximum length of a chain directory name, in bytes.
const MAX_SEGMENT_LEN: usize = 255;

/// Filesystem-based storage.
///
/// Cheap to clone; clones share the root and the per-chain lock table.
#[derive(Clone)]
pub struct FileStorage {
    inner: Arc<FileStorageInner>,
}

struct FileStorageInner {
    /// Absolute root directory.
    root: PathBuf,

    /// One async mutex per chain directory, created on first use.
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileStorage {
    /// Open a storage rooted at `root`, creating the directory if needed.
    ///
    /// An empty path means the current directory; a relative path is
    /// resolved against it.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = resolve_root(root.as_ref())?;
        std::fs::create_dir_all(&root)?;
        tracing::info!(backend = "fs", root = %root.display(), "file storage opened");

        Ok(Self {
            inner: Arc::new(FileStorageInner {
                root,
                locks: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// The absolute root directory.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Directory holding a chain's block files.
    pub fn chain_dir(&self, name: &ChainName) -> Result<PathBuf> {
        let segment = sanitize_segment(name.as_str());
        if segment.is_empty() {
            return Err(StoreError::Core(CoreError::EmptyChainName));
        }
        Ok(self.inner.root.join(segment))
    }

    /// The async mutex serializing operations on one chain directory.
    fn chain_lock(&self, dir: &Path) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self.inner.locks.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(locks.entry(dir.to_path_buf()).or_default().clone())
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn kind(&self) -> &'static str {
        "fs"
    }

    async fn create_chain(&self, name: &ChainName) -> Result<CreateResult> {
        let dir = self.chain_dir(name)?;
        let lock = self.chain_lock(&dir)?;
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.inner.root).await?;
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(CreateResult::AlreadyExists);
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = write_block_file(&dir, &Block::genesis()).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                tracing::warn!(dir = %dir.display(), error = %cleanup, "failed to remove half-created chain");
            }
            return Err(e);
        }

        tracing::debug!(backend = "fs", chain = %name, "chain created");
        Ok(CreateResult::Created)
    }

    async fn has_chain(&self, name: &ChainName) -> Result<bool> {
        let dir = self.chain_dir(name)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn append_block(&self, chain: &ChainName, block: &mut Block) -> Result<()> {
        let dir = self.chain_dir(chain)?;
        let lock = self.chain_lock(&dir)?;
        let _guard = lock.lock().await;

        let latest = read_latest_block(&dir)
            .await?
            .ok_or_else(|| StoreError::ChainNotFound(chain.to_string()))?;

        block.link(latest.index() + 1, *latest.hash());
        write_block_file(&dir, block).await?;

        tracing::debug!(backend = "fs", chain = %chain, index = block.index(), "block appended");
        Ok(())
    }

    async fn latest_block(&self, chain: &ChainName) -> Result<Option<Block>> {
        let dir = self.chain_dir(chain)?;
        let lock = self.chain_lock(&dir)?;
        let _guard = lock.lock().await;

        read_latest_block(&dir).await
    }

    async fn block_at(&self, chain: &ChainName, index: u64) -> Result<Option<Block>> {
        let dir = self.chain_dir(chain)?;
        read_block_file(&dir, index).await
    }

    fn get_iterator(&self, chain: &ChainName, offset: u64) -> Box<dyn BlockIterator> {
        Box::new(BlockCursor::new(self.clone(), chain.clone(), offset))
    }
}

/// Path of the block file for `index`.
pub fn block_file_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{}.json", index))
}

/// Read and validate one block file. A missing file is `None`.
async fn read_block_file(dir: &Path, index: u64) -> Result<Option<Block>> {
    let path = block_file_path(dir, index);
    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let record = BlockRecord::parse(&contents)
        .map_err(|e| StoreError::MalformedRecord(format!("{}: {}", path.display(), e)))?;

    if record.index != index {
        return Err(StoreError::MalformedRecord(format!(
            "{}: record claims index {}",
            path.display(),
            record.index
        )));
    }

    record.into_block().map(Some)
}

/// Read the highest-indexed block of a chain directory.
///
/// `None` if the directory does not exist or holds no block files.
async fn read_latest_block(dir: &Path) -> Result<Option<Block>> {
    match latest_index(dir).await? {
        Some(index) => read_block_file(dir, index).await,
        None => Ok(None),
    }
}

/// Highest index among `<digits>.json` files in `dir`.
async fn latest_index(dir: &Path) -> Result<Option<u64>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut latest: Option<u64> = None;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        if let Some(index) = file_name.to_str().and_then(parse_block_file_name) {
            latest = Some(latest.map_or(index, |current| current.max(index)));
        }
    }

    Ok(latest)
}

/// Parse `<digits>.json` (extension case-insensitive) into an index.
fn parse_block_file_name(name: &str) -> Option<u64> {
    let (stem, ext) = name.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case("json") || stem.is_empty() {
        return None;
    }
    if !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Write a block file without ever replacing an existing one.
///
/// Each write gets its own uniquely named temporary file, so concurrent
/// writers of the same index never share an inode.
async fn write_block_file(dir: &Path, block: &Block) -> Result<()> {
    let index = block.index();
    let target = block_file_path(dir, index);
    let json = BlockRecord::from_block(block).to_json()?;
    let temp_dir = dir.to_path_buf();

    let persisted = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".json.tmp")
            .tempfile_in(&temp_dir)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist_noclobber(&target).map(|_| ()).map_err(|e| e.error)
    })
    .await
    .map_err(|e| StoreError::Task(e.to_string()))?;

    match persisted {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::Conflict {
            chain: dir.display().to_string(),
            index,
        }),
        Err(e) => Err(e.into()),
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    let cwd = std::env::current_dir()?;
    if root.as_os_str().is_empty() {
        Ok(cwd)
    } else {
        Ok(cwd.join(root))
    }
}

/// Turn a chain name into a safe single path segment.
///
/// Removes path separators, characters reserved on common filesystems and
/// control characters; rejects `.`/`..` and Windows device names; strips
/// trailing dots and spaces; truncates to 255 bytes. May return an empty
/// string, which callers must reject.
pub fn sanitize_segment(name: &str) -> String {
    let mut segment: String = name.chars().filter(|c| !is_illegal_char(*c)).collect();

    if segment.chars().all(|c| c == '.') || is_windows_reserved(&segment) {
        segment.clear();
    }

    let trimmed = segment.trim_end_matches(|c| c == '.' || c == ' ').len();
    segment.truncate(trimmed);

    if segment.len() > MAX_SEGMENT_LEN {
        let mut end = MAX_SEGMENT_LEN;
        while !segment.is_char_boundary(end) {
            end -= 1;
        }
        segment.truncate(end);
    }

    segment
}

fn is_illegal_char(c: char) -> bool {
    matches!(c, '/' | '\\' | '?' | '<' | '>' | ':' | '*' | '|' | '"')
        || ('\u{0000}'..='\u{001f}').contains(&c)
        || ('\u{0080}'..='\u{009f}').contains(&c)
}

fn is_windows_reserved(segment: &str) -> bool {
    let base = segment.split('.').next().unwrap_or("").to_ascii_lowercase();
    match base.as_str() {
        "con" | "prn" | "aux" | "nul" => true,
        b if b.len() == 4 && (b.starts_with("com") || b.starts_with("lpt")) => {
            b.as_bytes()[3].is_ascii_digit()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn name(s: &str) -> ChainName {
        ChainName::new(s).unwrap()
    }

    fn open() -> (TempDir, FileStorage) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("ledger"), "ledger");
        assert_eq!(sanitize_segment("../etc/passwd"), "..etcpasswd");
        assert_eq!(sanitize_segment("a:b*c?d"), "abcd");
        assert_eq!(sanitize_segment(".."), "");
        assert_eq!(sanitize_segment("con"), "");
        assert_eq!(sanitize_segment("com1.txt"), "");
        assert_eq!(sanitize_segment("console"), "console");
        assert_eq!(sanitize_segment("trailing. . "), "trailing");
        assert_eq!(sanitize_segment(&"x".repeat(300)).len(), 255);
    }

    #[test]
    fn test_parse_block_file_name() {
        assert_eq!(parse_block_file_name("0.json"), Some(0));
        assert_eq!(parse_block_file_name("42.JSON"), Some(42));
        assert_eq!(parse_block_file_name(".3.json.tmp"), None);
        assert_eq!(parse_block_file_name("x.json"), None);
        assert_eq!(parse_block_file_name("1.txt"), None);
        assert_eq!(parse_block_file_name(".json"), None);
    }

    #[tokio::test]
    async fn test_create_writes_genesis_file() {
        let (_dir, storage) = open();
        let chain = name("Ledger");

        assert_eq!(storage.create_chain(&chain).await.unwrap(), CreateResult::Created);

        let path = block_file_path(&storage.chain_dir(&chain).unwrap(), 0);
        assert!(path.ends_with("ledger/0.json"));
        let record = BlockRecord::parse(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(record, BlockRecord::from_block(&Block::genesis()));
    }

    #[tokio::test]
    async fn test_create_existing_directory() {
        let (_dir, storage) = open();
        let chain = name("ledger");

        storage.create_chain(&chain).await.unwrap();
        assert_eq!(storage.create_chain(&chain).await.unwrap(), CreateResult::AlreadyExists);
    }

    #[tokio::test]
    async fn test_unsanitizable_name() {
        let (_dir, storage) = open();
        assert!(storage.create_chain(&name("..")).await.is_err());
        assert!(storage.has_chain(&name("..")).await.is_err());
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let (_dir, storage) = open();
        let chain = name("ledger");
        storage.create_chain(&chain).await.unwrap();

        let mut block = Block::new(vec![0u8, 159, 146, 150]);
        storage.append_block(&chain, &mut block).await.unwrap();
        assert_eq!(block.index(), 1);

        let read = storage.block_at(&chain, 1).await.unwrap().unwrap();
        assert_eq!(read, block);
        assert_eq!(storage.latest_block(&chain).await.unwrap(), Some(block));
    }

    #[tokio::test]
    async fn test_append_unknown_chain() {
        let (_dir, storage) = open();
        let result = storage.append_block(&name("missing"), &mut Block::new("x")).await;
        assert!(matches!(result, Err(StoreError::ChainNotFound(_))));
    }

    #[tokio::test]
    async fn test_never_overwrites_block_file() {
        let (_dir, storage) = open();
        let chain = name("ledger");
        storage.create_chain(&chain).await.unwrap();
        let dir = storage.chain_dir(&chain).unwrap();

        let result = write_block_file(&dir, &Block::genesis()).await;
        assert!(matches!(result, Err(StoreError::Conflict { index: 0, .. })));

        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_file_reads_as_error() {
        let (_dir, storage) = open();
        let chain = name("ledger");
        storage.create_chain(&chain).await.unwrap();
        storage.append_block(&chain, &mut Block::new("a")).await.unwrap();

        let dir = storage.chain_dir(&chain).unwrap();
        std::fs::write(block_file_path(&dir, 1), "{ not json").unwrap();

        assert!(matches!(
            storage.block_at(&chain, 1).await,
            Err(StoreError::MalformedRecord(_))
        ));

        // The cursor treats the broken file as the end of the sequence.
        let mut iter = storage.get_iterator(&chain, 0);
        assert_eq!(iter.next().await.unwrap().index(), 0);
        assert!(iter.next().await.is_none());

        // Appending on a corrupt tail fails rather than guessing.
        assert!(storage.append_block(&chain, &mut Block::new("b")).await.is_err());
    }

    #[tokio::test]
    async fn test_mismatched_index_is_malformed() {
        let (_dir, storage) = open();
        let chain = name("ledger");
        storage.create_chain(&chain).await.unwrap();
        let dir = storage.chain_dir(&chain).unwrap();

        std::fs::copy(block_file_path(&dir, 0), block_file_path(&dir, 7)).unwrap();
        assert!(matches!(
            storage.block_at(&chain, 7).await,
            Err(StoreError::MalformedRecord(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_serialized() {
        let (_dir, storage) = open();
        let chain = name("ledger");
        storage.create_chain(&chain).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let storage = storage.clone();
            let chain = chain.clone();
            handles.push(tokio::spawn(async move {
                let mut block = Block::new(format!("block {}", i));
                storage.append_block(&chain, &mut block).await.map(|_| block.index())
            }));
        }

        let mut indices = Vec::new();
        for handle in handles {
            indices.push(handle.await.unwrap().unwrap());
        }
        indices.sort_unstable();
        assert_eq!(indices, (1..=20).collect::<Vec<u64>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_instances_never_lose_a_block() {
        let dir = TempDir::new().unwrap();
        let first = FileStorage::open(dir.path()).unwrap();
        let second = FileStorage::open(dir.path()).unwrap();
        let chain = name("shared");
        first.create_chain(&chain).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..24 {
            let storage = if i % 2 == 0 { first.clone() } else { second.clone() };
            let chain = chain.clone();
            handles.push(tokio::spawn(async move {
                let mut block = Block::new(format!("racer {}", i));
                storage.append_block(&chain, &mut block).await.map(|_| block)
            }));
        }

        let mut stored = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(block) => stored.push(block),
                Err(StoreError::Conflict { .. }) => {}
                Err(e) => panic!("unexpected append error: {}", e),
            }
        }

        assert!(!stored.is_empty());
        for block in &stored {
            let read = first.block_at(&chain, block.index()).await.unwrap();
            assert_eq!(read.as_ref(), Some(block), "block {} was replaced", block.index());
        }

        let mut indices: Vec<u64> = stored.iter().map(|b| b.index()).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), stored.len());

        let leftovers: Vec<String> = std::fs::read_dir(first.chain_dir(&chain).unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|file| file.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temporary files left: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_reopen_sees_existing_chains() {
        let dir = TempDir::new().unwrap();
        let chain = name("ledger");
        {
            let storage = FileStorage::open(dir.path()).unwrap();
            storage.create_chain(&chain).await.unwrap();
            storage.append_block(&chain, &mut Block::new("persisted")).await.unwrap();
        }

        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(storage.has_chain(&chain).await.unwrap());
        let latest = storage.latest_block(&chain).await.unwrap().unwrap();
        assert_eq!(&latest.data()[..], b"persisted");
    }
}
