use std::collections::{HashMap, HashSet};

use anyhow::Context as _;
use sqlx::{MySqlPool, Row as _};

/// Index key ceiling for utf8mb4 columns (4 bytes/char under a 767-byte
/// InnoDB key limit).
pub const INDEXED_MAX_CHARS: u32 = 191;
/// Slack added on top of the required length when growing an unindexed column.
pub const GROWTH_HEADROOM: u32 = 100;
/// VARCHAR row-size ceiling.
pub const VARCHAR_MAX_CHARS: u32 = 65535;

#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: String,
    /// Declared character length; 0 for non-character columns.
    pub max_chars: u32,
    pub has_index: bool,
}

/// Per-run cache of column metadata, keyed by table then column. Populated
/// at table init, patched in place after a successful widening ALTER, and
/// dropped with the database handle at process exit.
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: HashMap<String, HashMap<String, ColumnInfo>>,
}

impl SchemaCache {
    pub fn insert_table(&mut self, table: &str, columns: HashMap<String, ColumnInfo>) {
        self.tables.insert(table.to_owned(), columns);
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnInfo> {
        self.tables.get(table)?.get(column)
    }

    pub fn set_max_chars(&mut self, table: &str, column: &str, max_chars: u32) {
        if let Some(info) = self.tables.get_mut(table).and_then(|t| t.get_mut(column)) {
            info.max_chars = max_chars;
        }
    }
}

/// Outcome of a capacity check against a column's cached metadata.
#[derive(Debug, PartialEq, Eq)]
pub enum Capacity {
    Sufficient,
    Widen {
        new_len: u32,
        /// The indexed-column cap is below what the text needs; the
        /// database will truncate on write.
        truncates: bool,
    },
}

/// Index-aware growth policy: indexed columns never exceed
/// [`INDEXED_MAX_CHARS`], unindexed columns grow to required plus headroom,
/// capped at the VARCHAR ceiling.
pub fn plan_capacity(info: &ColumnInfo, required: u32) -> Capacity {
    if required <= info.max_chars {
        return Capacity::Sufficient;
    }
    let (new_len, truncates) = if info.has_index {
        (required.min(INDEXED_MAX_CHARS), required > INDEXED_MAX_CHARS)
    } else {
        ((required.saturating_add(GROWTH_HEADROOM)).min(VARCHAR_MAX_CHARS), false)
    };
    Capacity::Widen { new_len, truncates }
}

pub async fn table_exists(pool: &MySqlPool, table: &str) -> anyhow::Result<bool> {
    let hit: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_name = ?",
    )
    .bind(table)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("checking table {table}"))?;
    Ok(hit.is_some())
}

/// Loads ColumnInfo for every column of `table`, with index membership from
/// the statistics view. Callers pick out the columns they were configured
/// with; anything absent from the returned map does not exist.
pub async fn load_columns(
    pool: &MySqlPool,
    table: &str,
) -> anyhow::Result<HashMap<String, ColumnInfo>> {
    let rows = sqlx::query(
        "SELECT COLUMN_NAME, COLUMN_TYPE, CHARACTER_MAXIMUM_LENGTH \
         FROM information_schema.columns \
         WHERE table_schema = DATABASE() AND table_name = ?",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .with_context(|| format!("reading columns of {table}"))?;

    let indexed = indexed_columns(pool, table).await?;

    let mut columns = HashMap::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("COLUMN_NAME")?;
        let column_type: String = row.try_get("COLUMN_TYPE")?;
        // BIGINT UNSIGNED in the catalog; NULL for non-character columns.
        // TEXT variants can report more than the VARCHAR ceiling; the
        // capacity policy never needs to see past it.
        let max_chars: Option<u64> = row.try_get("CHARACTER_MAXIMUM_LENGTH")?;
        let has_index = indexed.contains(&name);
        columns.insert(
            name.clone(),
            ColumnInfo {
                name,
                column_type,
                max_chars: max_chars.unwrap_or(0).min(VARCHAR_MAX_CHARS.into()) as u32,
                has_index,
            },
        );
    }
    Ok(columns)
}

/// A column counts as indexed if any statistics row mentions it, whatever
/// the index type or its position in a composite key.
async fn indexed_columns(pool: &MySqlPool, table: &str) -> anyhow::Result<HashSet<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT COLUMN_NAME FROM information_schema.statistics \
         WHERE table_schema = DATABASE() AND table_name = ?",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .with_context(|| format!("reading indexes of {table}"))?;
    Ok(names.into_iter().collect())
}
