//! Matcher address rotation store.
//!
//! Maps a calendar date to the set of fee addresses handed out that day. An
//! operator job publishes each day's set; request handling only reads.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use chrono::NaiveDate;

use crate::address::BitcoinAddress;
use crate::BritError;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<StoreError> for BritError {
    fn from(e: StoreError) -> Self {
        BritError::Store(e.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Date-keyed fee address sets.
///
/// Implementations must allow many concurrent readers while one writer
/// replaces a date's set. A reader sees either the old set or the new one.
pub trait AddressRotationStore: Send + Sync {
    /// Replace the set recorded for `date`.
    fn store_addresses_for_date(
        &self,
        date: NaiveDate,
        addresses: &BTreeSet<BitcoinAddress>,
    ) -> StoreResult<()>;

    /// The set recorded for `date`, or an empty set.
    fn addresses_for_date(&self, date: NaiveDate) -> StoreResult<BTreeSet<BitcoinAddress>>;

    /// Every date with a recorded set, oldest first.
    fn dates(&self) -> StoreResult<Vec<NaiveDate>>;
}

/// In-memory store.
///
/// This is useful for testing and short-lived processes.
/// Data is not persisted across restarts.
#[derive(Debug, Default)]
pub struct InMemoryAddressStore {
    sets: RwLock<HashMap<NaiveDate, BTreeSet<BitcoinAddress>>>,
}

impl InMemoryAddressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AddressRotationStore for InMemoryAddressStore {
    fn store_addresses_for_date(
        &self,
        date: NaiveDate,
        addresses: &BTreeSet<BitcoinAddress>,
    ) -> StoreResult<()> {
        let mut sets = self
            .sets
            .write()
            .map_err(|e| StoreError::Other(e.to_string()))?;
        sets.insert(date, addresses.clone());
        Ok(())
    }

    fn addresses_for_date(&self, date: NaiveDate) -> StoreResult<BTreeSet<BitcoinAddress>> {
        let sets = self
            .sets
            .read()
            .map_err(|e| StoreError::Other(e.to_string()))?;
        Ok(sets.get(&date).cloned().unwrap_or_default())
    }

    fn dates(&self) -> StoreResult<Vec<NaiveDate>> {
        let sets = self
            .sets
            .read()
            .map_err(|e| StoreError::Other(e.to_string()))?;
        let mut dates: Vec<_> = sets.keys().copied().collect();
        dates.sort();
        Ok(dates)
    }
}

/// Directory-backed store: `<root>/by-date/YYYY-MM-DD.txt`, one address per line.
///
/// Each publish writes a temporary file and renames it over the old one.
#[derive(Debug)]
pub struct FileAddressStore {
    by_date: PathBuf,
    writer: Mutex<()>,
}

const BY_DATE_DIR: &str = "by-date";
const DATE_FORMAT: &str = "%Y-%m-%d";

impl FileAddressStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let by_date = root.as_ref().join(BY_DATE_DIR);
        std::fs::create_dir_all(&by_date)?;
        Ok(Self {
            by_date,
            writer: Mutex::new(()),
        })
    }

    fn date_path(&self, date: NaiveDate) -> PathBuf {
        self.by_date
            .join(format!("{}.txt", date.format(DATE_FORMAT)))
    }
}

impl AddressRotationStore for FileAddressStore {
    fn store_addresses_for_date(
        &self,
        date: NaiveDate,
        addresses: &BTreeSet<BitcoinAddress>,
    ) -> StoreResult<()> {
        let _guard = self
            .writer
            .lock()
            .map_err(|e| StoreError::Other(e.to_string()))?;

        let mut contents = String::new();
        for address in addresses {
            contents.push_str(address.as_str());
            contents.push('\n');
        }

        let path = self.date_path(date);
        let tmp = path.with_extension("txt.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(%date, count = addresses.len(), "published fee addresses");
        Ok(())
    }

    fn addresses_for_date(&self, date: NaiveDate) -> StoreResult<BTreeSet<BitcoinAddress>> {
        let path = self.date_path(date);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut addresses = BTreeSet::new();
        for row in contents.lines().map(str::trim).filter(|r| !r.is_empty()) {
            match BitcoinAddress::new(row) {
                Ok(address) => {
                    addresses.insert(address);
                }
                Err(e) => tracing::warn!(%date, row, error = %e, "ignoring unreadable stored address"),
            }
        }
        Ok(addresses)
    }

    fn dates(&self) -> StoreResult<Vec<NaiveDate>> {
        let mut dates = Vec::new();
        for entry in std::fs::read_dir(&self.by_date)? {
            let path = entry?.path();
            if path.extension().map(|e| e != "txt").unwrap_or(true) {
                continue;
            }
            let parsed = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok());
            if let Some(date) = parsed {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }
}
