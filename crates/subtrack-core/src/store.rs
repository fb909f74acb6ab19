// The one and only writer of the subscriptions file
use crate::clock::{Clock, SystemClock};
use crate::files::{copy_atomic, ensure_parent, write_atomic};
use crate::models::{normalize_category, NewSubscription, Subscription, SubscriptionUpdate};
use crate::stats::Statistics;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Category filter value that means "don't filter"
pub const ALL_CATEGORIES: &str = "all";

const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// File-backed subscription collection
///
/// Every operation is a full read-modify-write of the JSON array. Writes
/// go through a temp file and a rename, so a failed write leaves the
/// previous file untouched.
///
/// Not safe for concurrent writers - wrap it in a [`crate::SharedStore`]
/// if more than one task can touch the same file.
pub struct SubscriptionStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SubscriptionStore {
    /// Open (or initialize) a store using the wall clock
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    /// Open (or initialize) a store with an injected clock
    pub fn with_clock(
        path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let store = Self {
            path: path.into(),
            clock,
        };
        store.ensure_file_exists()?;
        Ok(store)
    }

    fn ensure_file_exists(&self) -> Result<()> {
        if !self.path.exists() {
            ensure_parent(&self.path)?;
            write_atomic(&self.path, b"[]")?;
            info!("Initialized empty store at {}", self.path.display());
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Validate and append a new subscription
    ///
    /// Returns the subscription exactly as it was persisted, id included.
    pub fn add(&self, draft: NewSubscription) -> Result<Subscription> {
        let mut records = self.read_records()?;
        let now = self.clock.now();

        let existing: BTreeSet<i64> = records.iter().filter_map(record_id).collect();
        let mut id = draft.id.unwrap_or_else(|| now.and_utc().timestamp_millis());
        if existing.contains(&id) {
            let max = existing.iter().next_back().copied().unwrap_or(id);
            let fresh = max.checked_add(1).ok_or_else(|| {
                Error::ValidationError(format!("No free id after {}", max))
            })?;
            debug!("Id {} already taken, using {}", id, fresh);
            id = fresh;
        }

        let subscription = draft.into_subscription(id, now)?;
        records.push(serde_json::to_value(&subscription)?);
        self.write_records(&records)?;

        info!("Added subscription {} ({})", subscription.id, subscription.name);
        Ok(subscription)
    }

    /// Overwrite the mutable fields of an existing subscription
    pub fn update(&self, id: i64, update: SubscriptionUpdate) -> Result<Subscription> {
        let renewal_date = update.validate()?;
        let mut records = self.read_records()?;

        let record = records
            .iter_mut()
            .find(|r| record_id(r) == Some(id))
            .and_then(Value::as_object_mut)
            .ok_or(Error::NotFound(id))?;
        fill_created_at(record);

        record.insert("name".into(), Value::from(update.name.trim()));
        record.insert(
            "date".into(),
            Value::from(renewal_date.format(crate::validation::DATE_FORMAT).to_string()),
        );
        record.insert("price".into(), Value::from(update.price));
        record.insert(
            "category".into(),
            Value::from(normalize_category(update.category)),
        );
        record.insert("notes".into(), Value::from(update.notes));

        let updated: Subscription = serde_json::from_value(Value::Object(record.clone()))?;
        self.write_records(&records)?;

        info!("Updated subscription {}", id);
        Ok(updated)
    }

    /// Remove every entry with this id. Unknown ids are a no-op.
    ///
    /// Returns whether anything was actually removed.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let mut records = self.read_records()?;
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));

        if records.len() == before {
            debug!("Delete of unknown id {} ignored", id);
            return Ok(false);
        }

        self.write_records(&records)?;
        info!("Deleted subscription {}", id);
        Ok(true)
    }

    /// Every readable subscription, soonest renewal first
    ///
    /// Records that don't deserialize are skipped with a warning so one bad
    /// entry can't hide the rest.
    pub fn load_all(&self) -> Result<Vec<Subscription>> {
        let mut subscriptions: Vec<Subscription> = self
            .read_records()?
            .into_iter()
            .enumerate()
            .filter_map(|(index, mut record)| {
                if let Some(fields) = record.as_object_mut() {
                    fill_created_at(fields);
                }
                match serde_json::from_value::<Subscription>(record) {
                    Ok(sub) => Some(sub),
                    Err(e) => {
                        warn!("Skipping malformed subscription record #{}: {}", index, e);
                        None
                    }
                }
            })
            .collect();

        subscriptions.sort_by_key(|s| s.renewal_date);
        Ok(subscriptions)
    }

    pub fn get(&self, id: i64) -> Result<Subscription> {
        self.load_all()?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or(Error::NotFound(id))
    }

    /// Name substring search (case-insensitive) AND category filter
    ///
    /// Pass [`ALL_CATEGORIES`] to skip the category filter.
    pub fn search(&self, query: &str, category: &str) -> Result<Vec<Subscription>> {
        let results = self
            .load_all()?
            .into_iter()
            .filter(|s| query.is_empty() || s.name_contains(query))
            .filter(|s| category == ALL_CATEGORIES || s.category == category)
            .collect();
        Ok(results)
    }

    /// Subscriptions renewing in `0..=days` days. Already expired ones are out.
    pub fn expiring_within(&self, days: i64) -> Result<Vec<Subscription>> {
        let today = self.today();
        let results = self
            .load_all()?
            .into_iter()
            .filter(|s| (0..=days).contains(&s.days_remaining(today)))
            .collect();
        Ok(results)
    }

    /// Distinct categories, sorted
    pub fn categories(&self) -> Result<Vec<String>> {
        let categories: BTreeSet<String> =
            self.load_all()?.into_iter().map(|s| s.category).collect();
        Ok(categories.into_iter().collect())
    }

    /// Sum of all prices. Every price is treated as a monthly charge.
    pub fn total_monthly_cost(&self) -> Result<f64> {
        Ok(self.load_all()?.iter().map(|s| s.price).sum())
    }

    /// Counts and cost breakdown, optionally narrowed to one category
    pub fn statistics(&self, category: Option<&str>) -> Result<Statistics> {
        Ok(Statistics::compute(&self.load_all()?, self.today(), category))
    }

    /// Copy the store file verbatim to `backup_path`
    ///
    /// Returns `Ok(false)` when there's no store file to copy.
    pub fn backup(&self, backup_path: &Path) -> Result<bool> {
        if !self.path.exists() {
            warn!("Nothing to back up, {} is missing", self.path.display());
            return Ok(false);
        }

        copy_atomic(&self.path, backup_path)?;
        info!("Backed up store to {}", backup_path.display());
        Ok(true)
    }

    /// Replace the store file with a verbatim copy of `backup_path`
    ///
    /// Returns `Ok(false)` when the backup doesn't exist.
    pub fn restore(&self, backup_path: &Path) -> Result<bool> {
        if !backup_path.exists() {
            warn!("Backup {} not found, nothing restored", backup_path.display());
            return Ok(false);
        }

        copy_atomic(backup_path, &self.path)?;
        info!("Restored store from {}", backup_path.display());
        Ok(true)
    }

    /// Raw records straight from disk
    ///
    /// Missing or garbled file means "empty", not an error. First run
    /// shouldn't blow up because nobody has saved anything yet.
    fn read_records(&self) -> Result<Vec<Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Vec<Value>>(&contents) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(
                    "Store file {} is not a valid subscription list, treating as empty: {}",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn write_records(&self, records: &[Value]) -> Result<()> {
        let data = serde_json::to_vec_pretty(records)?;
        write_atomic(&self.path, &data)?;
        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Older records may lack `created_at`. Ids are creation timestamps in
/// milliseconds, so derive it from the id instead of guessing.
fn fill_created_at(record: &mut Map<String, Value>) {
    if !record.get("created_at").map_or(true, Value::is_null) {
        return;
    }
    let created = record
        .get("id")
        .and_then(Value::as_i64)
        .and_then(DateTime::from_timestamp_millis)
        .map(|at| at.naive_utc())
        .unwrap_or_default();
    record.insert(
        "created_at".into(),
        Value::from(created.format(CREATED_AT_FORMAT).to_string()),
    );
}
