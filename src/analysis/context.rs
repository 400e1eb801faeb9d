//! Content-addressed cache of parsed source units.
//!
//! Units are keyed by the SHA-256 of language and text, so two files with
//! identical content share one parse. Cached units are re-stamped with the
//! requesting path on the way out; spans do not depend on the path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use sha2::{Digest, Sha256};

use crate::analysis::{LanguageAdapter, SourceUnit};
use crate::error::CheckError;
use crate::language::Language;

type ContentKey = [u8; 32];

/// Cache of parsed units for the duration of one run.
#[derive(Default)]
pub struct UnitCache {
    units: RwLock<HashMap<ContentKey, SourceUnit>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl UnitCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(language: Language, source: &str) -> ContentKey {
        let mut hasher = Sha256::new();
        hasher.update(language.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        let digest = hasher.finalize();

        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        key
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ContentKey, SourceUnit>> {
        self.units.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ContentKey, SourceUnit>> {
        self.units.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Parse `source` with `adapter`, reusing an earlier parse of identical text.
    ///
    /// Parse failures are not cached; they are cheap to reproduce and carry
    /// the failing path.
    pub fn parse(
        &self,
        adapter: &dyn LanguageAdapter,
        path: &str,
        source: &str,
    ) -> Result<SourceUnit, CheckError> {
        let key = Self::key(adapter.language(), source);

        if let Some(unit) = self.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            let mut unit = unit.clone();
            unit.path = path.to_string();
            return Ok(unit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let unit = adapter.parse(path, source)?;
        self.write().insert(key, unit.clone());
        Ok(unit)
    }

    /// (hits, misses) so far.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
