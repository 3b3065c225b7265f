use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};

/// Persistent string-keyed store of serialized text values.
///
/// `clear` wipes every key in the store. Use a `CacheNamespace` for a clear
/// that only touches one consumer's keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
    fn clear(&self) -> Result<()>;
}

/// File extension for cache entries. Other files in the directory are ignored.
const ENTRY_EXTENSION: &str = "cache";

/// Longest encoded key used directly as a file stem. Longer keys are stored
/// under a digest name so the file name stays within filesystem limits.
const MAX_ENCODED_STEM: usize = 200;

/// Stem prefix of digest-named entries. `encode_key` never emits it.
const HASHED_PREFIX: char = '~';

/// One file per key under a single directory.
///
/// Short keys map to `<encoded key>.cache` holding the value as-is. Long keys
/// map to `~<sha256>.cache`, whose first line is the encoded key followed by
/// the value.
pub struct FileStore {
    dir: PathBuf,
}

enum EntryName {
    Plain(PathBuf),
    Hashed { path: PathBuf, encoded_key: String },
}

impl EntryName {
    fn path(&self) -> &Path {
        match self {
            EntryName::Plain(path) | EntryName::Hashed { path, .. } => path,
        }
    }
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_name(&self, key: &str) -> EntryName {
        let encoded_key = encode_key(key);
        if encoded_key.len() <= MAX_ENCODED_STEM {
            return EntryName::Plain(
                self.dir.join(format!("{}.{}", encoded_key, ENTRY_EXTENSION)),
            );
        }
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        EntryName::Hashed {
            path: self
                .dir
                .join(format!("{}{}.{}", HASHED_PREFIX, digest, ENTRY_EXTENSION)),
            encoded_key,
        }
    }

    /// Recover the key of a digest-named entry from its first line.
    fn read_hashed_key(path: &Path) -> Result<Option<String>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cache file: {}", path.display()))?;
        Ok(contents
            .split_once('\n')
            .and_then(|(encoded, _)| decode_key(encoded)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = self.entry_name(key);
        if !entry.path().exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read cache file: {}", key))?;

        match entry {
            EntryName::Plain(_) => Ok(Some(contents)),
            EntryName::Hashed { encoded_key, .. } => match contents.split_once('\n') {
                Some((stored, value)) if stored == encoded_key => Ok(Some(value.to_string())),
                Some(_) => Ok(None),
                None => Err(anyhow!("Cache file for {} is missing its key line", key)),
            },
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let entry = self.entry_name(key);
        let result = match &entry {
            EntryName::Plain(path) => std::fs::write(path, value),
            EntryName::Hashed { path, encoded_key } => {
                std::fs::write(path, format!("{}\n{}", encoded_key, value))
            }
        };
        result.with_context(|| format!("Failed to write cache file: {}", key))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let entry = self.entry_name(key);
        if entry.path().exists() {
            std::fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove cache file: {}", key))?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key = if stem.starts_with(HASHED_PREFIX) {
                Self::read_hashed_key(&path)?
            } else {
                decode_key(stem)
            };
            // Foreign files with undecodable names are not ours
            if let Some(key) = key {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn clear(&self) -> Result<()> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}

/// In-process store. Contents are lost when dropped.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}

/// Encode an arbitrary key into a file-name-safe string.
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes `%XX`.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
