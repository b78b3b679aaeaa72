//! A token cache persisted as a JSON file

use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use encore_clock::{Clock, System, UnixTime};

use super::{cache_key, CacheError, TokenCache};
use crate::{scope::Scopes, tokens::TokenRecord, IdentityRef, Token};

/// Name of the cache file within the cache directory
pub const CACHE_FILE_NAME: &str = "token_cache.json";

/// A token cache backed by a single JSON file
///
/// The whole file is read when the cache is loaded and rewritten on every
/// [`put`][TokenCache::put]. There is no locking, so two processes sharing a
/// cache directory will overwrite each other's entries.
#[derive(Debug)]
pub struct FileTokenCache {
    path: PathBuf,
    entries: BTreeMap<String, TokenRecord>,
}

impl FileTokenCache {
    /// Loads the cache stored in `dir`
    ///
    /// A missing cache file yields an empty cache. A file that cannot be
    /// parsed is an error.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        Self::load_with_clock(dir, &System)
    }

    /// Loads the cache stored in `dir`, dating records that lack
    /// `time_obtained` with `clock`
    ///
    /// Such records are stamped once, here, so they expire like any other
    /// entry. The stamp is written back on the next flush.
    pub fn load_with_clock<C: Clock>(
        dir: impl AsRef<Path>,
        clock: &C,
    ) -> Result<Self, CacheError> {
        let path = dir.as_ref().join(CACHE_FILE_NAME);
        let mut entries = read_entries(&path)?;

        let now = clock.now();
        for (key, record) in &mut entries {
            if record.time_obtained.map_or(true, UnixTime::is_zero) {
                tracing::warn!(
                    %key,
                    issued = now.0,
                    "token record has no time_obtained, treating it as issued at load"
                );
                record.time_obtained = Some(now);
            }
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded token cache");

        Ok(Self { path, entries })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of cached tokens
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> Result<(), CacheError> {
        let data = serde_json::to_string_pretty(&self.entries).map_err(CacheError::Encode)?;

        let mut file_opts = OpenOptions::new();
        file_opts.create(true).truncate(true).write(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            file_opts.mode(0o600);
        }

        file_opts
            .open(&self.path)
            .and_then(|mut file| file.write_all(data.as_bytes()))
            .map_err(|source| CacheError::Io {
                path: self.path.clone(),
                source,
            })?;

        tracing::trace!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "flushed token cache"
        );
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, TokenRecord>, CacheError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no token cache file, starting empty");
            return Ok(BTreeMap::new());
        }
        Err(source) => {
            return Err(CacheError::Io {
                path: path.to_owned(),
                source,
            })
        }
    };

    serde_json::from_str(&data).map_err(|source| CacheError::Decode {
        path: path.to_owned(),
        source,
    })
}

impl TokenCache for FileTokenCache {
    fn get(&self, identity: &IdentityRef, scopes: &Scopes) -> Result<Token, CacheError> {
        let key = cache_key(identity, scopes);
        match self.entries.get(&key) {
            Some(record) => {
                tracing::trace!(%key, "found token in file cache");
                Ok(Token::from_record(record.clone()))
            }
            None => Err(CacheError::NotFound { key }),
        }
    }

    fn contains(&self, identity: &IdentityRef, scopes: &Scopes) -> bool {
        self.entries.contains_key(&cache_key(identity, scopes))
    }

    fn put(&mut self, token: &Token) -> Result<(), CacheError> {
        let key = cache_key(token.identity(), token.scopes());
        tracing::trace!(%key, "storing token in file cache");
        self.entries.insert(key, token.to_record());
        self.flush()
    }
}
