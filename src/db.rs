use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::parser::{CaseRecord, DocumentRecords, Listing, ListingEntry};

/// Court code used as the prefix of every cause list cache id.
const COURT_CODE: &str = "10";
const KEY_PREFIX: &str = "causelist__";

/// `10-<category>-<hearing date>-<link id>`
pub fn unique_id(entry: &ListingEntry, link_id: &str) -> String {
    format!(
        "{}-{}-{}-{}",
        COURT_CODE,
        entry.category_label(),
        entry.hearing_date,
        link_id
    )
}

pub fn cache_key(unique_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, unique_id)
}

/// Key-value cache and record store over one SQLite connection.
pub struct CacheStore {
    conn: Connection,
}

pub struct Stats {
    pub cached: usize,
    pub expired: usize,
    pub records: usize,
    pub documents: usize,
    pub runs: usize,
}

impl CacheStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {:?}", dir))?;
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = CacheStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let store = CacheStore {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS cache (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                expires_at INTEGER,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS cache_ids (
                key       TEXT PRIMARY KEY,
                unique_id TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS case_records (
                id              INTEGER PRIMARY KEY,
                run_at          TEXT NOT NULL,
                document_id     TEXT NOT NULL,
                serial_no       TEXT NOT NULL,
                case_no         TEXT NOT NULL,
                diary_no        TEXT NOT NULL,
                case_no_display TEXT NOT NULL,
                judge_names     TEXT NOT NULL,
                court_no        TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_records_run ON case_records(run_at);
            CREATE INDEX IF NOT EXISTS idx_records_case ON case_records(case_no_display);
            ",
        )?;
        Ok(())
    }

    // ── Cache ──

    pub fn set_value<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let json = serde_json::to_string(value).context("error marshalling value")?;
        self.conn.execute(
            "INSERT OR REPLACE INTO cache (key, value, expires_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, json, expiry(ttl)],
        )?;
        Ok(())
    }

    /// `None` for missing or expired keys.
    pub fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM cache
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                rusqlite::params![key, now()],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).context("error unmarshalling value"))
            .transpose()
    }

    pub fn set_many<T: Serialize>(
        &self,
        values: &BTreeMap<String, T>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let expires_at = expiry(ttl);
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT OR REPLACE INTO cache (key, value, expires_at) VALUES (?1, ?2, ?3)")?;
            for (key, value) in values {
                let json = serde_json::to_string(value).context("error marshalling value")?;
                stmt.execute(rusqlite::params![key, json, expires_at])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Present keys only; missing and expired keys are left out.
    pub fn get_many<T: DeserializeOwned>(&self, keys: &[String]) -> Result<BTreeMap<String, T>> {
        let mut stmt = self.conn.prepare(
            "SELECT value FROM cache
             WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
        )?;
        let now = now();
        let mut out = BTreeMap::new();
        for key in keys {
            let json: Option<String> = stmt
                .query_row(rusqlite::params![key, now], |row| row.get(0))
                .optional()?;
            if let Some(json) = json {
                let value = serde_json::from_str(&json)
                    .with_context(|| format!("error unmarshalling value for {}", key))?;
                out.insert(key.clone(), value);
            }
        }
        Ok(out)
    }

    /// Store every listing entry under its cache key and record the
    /// key -> unique id mapping. Returns the unique ids written.
    pub fn save_listing(&self, listing: &Listing, ttl: Option<Duration>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(listing.len());
        let mut values = BTreeMap::new();
        for (link_id, entry) in listing {
            let id = unique_id(entry, link_id);
            values.insert(cache_key(&id), entry);
            ids.push(id);
        }
        self.set_many(&values, ttl)?;

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT OR REPLACE INTO cache_ids (key, unique_id) VALUES (?1, ?2)")?;
            for id in &ids {
                stmt.execute(rusqlite::params![cache_key(id), id])?;
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    pub fn cached_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT unique_id FROM cache_ids ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    // ── Records ──

    pub fn save_records(&self, run_at: &str, docs: &[DocumentRecords]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO case_records
                 (run_at, document_id, serial_no, case_no, diary_no, case_no_display, judge_names, court_no)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for doc in docs {
                for r in &doc.records {
                    count += stmt.execute(rusqlite::params![
                        run_at, doc.id, r.serial_no, r.case_no, r.diary_no,
                        r.case_no_display, r.judge_names, r.court_no,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn latest_run(&self) -> Result<Option<String>> {
        let run = self
            .conn
            .query_row("SELECT MAX(run_at) FROM case_records", [], |row| row.get(0))?;
        Ok(run)
    }

    /// Records of one run in the order they were saved.
    pub fn fetch_records(&self, run_at: &str) -> Result<Vec<CaseRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT serial_no, case_no, diary_no, case_no_display, judge_names, court_no
             FROM case_records WHERE run_at = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([run_at], |row| {
                Ok(CaseRecord {
                    serial_no: row.get(0)?,
                    case_no: row.get(1)?,
                    diary_no: row.get(2)?,
                    case_no_display: row.get(3)?,
                    judge_names: row.get(4)?,
                    court_no: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn stats(&self) -> Result<Stats> {
        let now = now();
        let count = |sql: &str, params: &[&dyn rusqlite::ToSql]| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(Stats {
            cached: count(
                "SELECT COUNT(*) FROM cache WHERE expires_at IS NULL OR expires_at > ?1",
                &[&now],
            )?,
            expired: count("SELECT COUNT(*) FROM cache WHERE expires_at <= ?1", &[&now])?,
            records: count("SELECT COUNT(*) FROM case_records", &[])?,
            documents: count("SELECT COUNT(DISTINCT document_id) FROM case_records", &[])?,
            runs: count("SELECT COUNT(DISTINCT run_at) FROM case_records", &[])?,
        })
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn expiry(ttl: Option<Duration>) -> Option<i64> {
    ttl.filter(|d| !d.is_zero())
        .map(|d| now() + d.as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Category, ListingEntry};

    fn entry(link: &str) -> ListingEntry {
        ListingEntry::from_link(link)
    }

    #[test]
    fn unique_id_format() {
        let e = entry("https://x/2024-10-16/M_R_2.pdf");
        assert_eq!(
            unique_id(&e, "2024-10-16/M_R_2"),
            "10-REGISTRAR SUPPL-2024-10-16-2024-10-16/M_R_2"
        );
        assert_eq!(
            cache_key("10-REGISTRAR SUPPL-2024-10-16-2024-10-16/M_R_2"),
            "causelist__10-REGISTRAR SUPPL-2024-10-16-2024-10-16/M_R_2"
        );
    }

    #[test]
    fn set_and_get_value() {
        let store = CacheStore::open_in_memory().unwrap();
        let e = entry("https://x/2024-10-16/M_J_1.pdf");
        store.set_value("k", &e, None).unwrap();
        let back: Option<ListingEntry> = store.get_value("k").unwrap();
        assert_eq!(back, Some(e));
        let missing: Option<ListingEntry> = store.get_value("nope").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn many_values_skip_missing_keys() {
        let store = CacheStore::open_in_memory().unwrap();
        let mut values = BTreeMap::new();
        values.insert("a".to_string(), entry("https://x/2024-10-16/M_C_1.pdf"));
        values.insert("b".to_string(), entry("https://x/2024-10-16/M_C_2.pdf"));
        store.set_many(&values, Some(Duration::from_secs(3600))).unwrap();

        let got: BTreeMap<String, ListingEntry> = store
            .get_many(&["a".to_string(), "zzz".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got["b"].category, Some(Category::ChamberSuppl));
    }

    #[test]
    fn expired_values_read_as_absent() {
        let store = CacheStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO cache (key, value, expires_at) VALUES ('old', '\"x\"', ?1)",
                [now() - 10],
            )
            .unwrap();
        let v: Option<String> = store.get_value("old").unwrap();
        assert!(v.is_none());
        assert_eq!(store.stats().unwrap().expired, 1);
    }

    #[test]
    fn listing_saved_with_id_mapping() {
        let store = CacheStore::open_in_memory().unwrap();
        let html = std::fs::read_to_string("tests/fixtures/listing.html").unwrap();
        let listing = crate::parser::ListingScanner::for_year(2024).scan(&html);
        let ids = store.save_listing(&listing, None).unwrap();
        assert_eq!(ids.len(), listing.len());

        let first = &ids[0];
        let cached: Option<ListingEntry> = store.get_value(&cache_key(first)).unwrap();
        assert_eq!(cached.as_ref(), listing.values().next());

        let mut mapped = store.cached_ids().unwrap();
        let mut expected = ids.clone();
        mapped.sort();
        expected.sort();
        assert_eq!(mapped, expected);
    }

    #[test]
    fn records_round_trip_in_order() {
        let store = CacheStore::open_in_memory().unwrap();
        let text = std::fs::read_to_string("tests/fixtures/two_courts.txt").unwrap();
        let docs = vec![DocumentRecords {
            id: "2024-10-16/M_J_1".to_string(),
            records: crate::parser::extract_records(&text),
        }];
        let saved = store.save_records("2024-10-16T10:00:00Z", &docs).unwrap();
        assert_eq!(saved, 4);

        let run = store.latest_run().unwrap().unwrap();
        let back = store.fetch_records(&run).unwrap();
        assert_eq!(back, docs[0].records);

        let s = store.stats().unwrap();
        assert_eq!((s.records, s.documents, s.runs), (4, 1, 1));
    }
}
