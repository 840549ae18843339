//! JSON file-backed record store.
//!
//! The file is the source of truth. Every mutation re-reads the snapshot
//! under the write lock, applies the change to that fresh copy, writes it to
//! a sibling temp file and renames it over the target. The cached tables are
//! replaced only once the rename succeeds. Reads serve the cache and reload
//! it whenever the file's modification stamp has moved, so changes written by
//! another process (such as `guardctl`) become visible without a restart.
//!
//! Writers in different processes are not serialized against each other;
//! each one holds the file only for the read-modify-rename of a single call.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GuardError, GuardResult};
use crate::store::{MemoryRecordStore, RecordStore};
use crate::subject::{AbuseRecord, Subject, Tier};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    #[serde(default)]
    attempts: Vec<AbuseRecord>,
    #[serde(default)]
    lockouts: Vec<AbuseRecord>,
    #[serde(default)]
    bans: Vec<AbuseRecord>,
}

/// Identity of one version of the snapshot file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    /// Stamp of the file at `path`, or `None` if it does not exist.
    fn of(path: &Path) -> GuardResult<Option<Self>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(Self {
                modified: meta.modified()?,
                len: meta.len(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug)]
struct Cache {
    tables: MemoryRecordStore,
    stamp: Option<FileStamp>,
}

/// Durable record store persisted as a single JSON document.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    cache: RwLock<Cache>,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonRecordStore {
    /// Open the store at `path`, loading any existing snapshot.
    ///
    /// A missing file is treated as an empty store; it is created on the
    /// first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// was written by a newer snapshot version.
    pub fn open(path: impl AsRef<Path>) -> GuardResult<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = load(&path)?;

        if cache.stamp.is_some() {
            info!(
                path = %path.display(),
                attempts = cache.tables.len(Tier::Attempt),
                lockouts = cache.tables.len(Tier::Lockout),
                bans = cache.tables.len(Tier::Ban),
                "loaded guard records"
            );
        } else {
            debug!(path = %path.display(), "no guard snapshot yet, starting empty");
        }

        Ok(Self {
            path,
            cache: RwLock::new(cache),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload the cache if the file changed since it was last read.
    fn refresh(&self) -> GuardResult<()> {
        let stamp = FileStamp::of(&self.path)?;
        if self.cache.read().stamp == stamp {
            return Ok(());
        }
        let fresh = load(&self.path)?;
        debug!(path = %self.path.display(), "guard snapshot changed on disk, reloaded");
        *self.cache.write() = fresh;
        Ok(())
    }

    /// Run `apply` against the current on-disk state and persist the result
    /// when it reports a change. The cache is left untouched on failure.
    fn mutate<T>(
        &self,
        tier: Tier,
        apply: impl FnOnce(&MemoryRecordStore) -> GuardResult<(T, bool)>,
    ) -> GuardResult<T> {
        let _guard = self.write_lock.lock();
        let mut staged = load(&self.path)?;
        let (out, changed) = apply(&staged.tables)?;
        if changed {
            self.persist(&staged.tables, tier)?;
            staged.stamp = FileStamp::of(&self.path)?;
        }
        *self.cache.write() = staged;
        Ok(out)
    }

    fn persist(&self, tables: &MemoryRecordStore, tier: Tier) -> GuardResult<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            attempts: tables.export(Tier::Attempt),
            lockouts: tables.export(Tier::Lockout),
            bans: tables.export(Tier::Ban),
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| GuardError::storage(tier, e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| GuardError::storage(tier, e.to_string()))?;
        Ok(())
    }
}

/// Read the snapshot at `path` into fresh tables.
fn load(path: &Path) -> GuardResult<Cache> {
    let tables = MemoryRecordStore::new();
    let Some(stamp) = FileStamp::of(path)? else {
        return Ok(Cache {
            tables,
            stamp: None,
        });
    };

    let raw = fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&raw)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(GuardError::storage(
            Tier::Attempt,
            format!(
                "snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                snapshot.version
            ),
        ));
    }
    tables.import(Tier::Attempt, snapshot.attempts);
    tables.import(Tier::Lockout, snapshot.lockouts);
    tables.import(Tier::Ban, snapshot.bans);

    Ok(Cache {
        tables,
        stamp: Some(stamp),
    })
}

impl RecordStore for JsonRecordStore {
    fn record(&self, tier: Tier, subject: &Subject, at: DateTime<Utc>) -> GuardResult<()> {
        self.mutate(tier, |tables| {
            tables.record(tier, subject, at)?;
            Ok(((), true))
        })
    }

    fn records(&self, tier: Tier, subject: &Subject) -> GuardResult<Vec<DateTime<Utc>>> {
        self.refresh()?;
        self.cache.read().tables.records(tier, subject)
    }

    fn clear(&self, tier: Tier, subject: &Subject) -> GuardResult<u64> {
        self.mutate(tier, |tables| {
            let removed = tables.clear(tier, subject)?;
            Ok((removed, removed > 0))
        })
    }

    fn subjects(&self, tier: Tier) -> GuardResult<Vec<Subject>> {
        self.refresh()?;
        self.cache.read().tables.subjects(tier)
    }

    fn count_since(
        &self,
        tier: Tier,
        subject: &Subject,
        since: Option<DateTime<Utc>>,
    ) -> GuardResult<u64> {
        self.refresh()?;
        self.cache.read().tables.count_since(tier, subject, since)
    }

    fn latest(&self, tier: Tier, subject: &Subject) -> GuardResult<Option<DateTime<Utc>>> {
        self.refresh()?;
        self.cache.read().tables.latest(tier, subject)
    }
}
