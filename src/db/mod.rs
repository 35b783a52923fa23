pub mod records;
pub mod schema;

use std::collections::HashMap;

use anyhow::{bail, ensure, Context as _};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySqlPool, Row as _};
use tracing::{info, warn};

use crate::config::{DatabaseConfig, TableSpec};
use records::TranslationRecord;
use schema::{Capacity, ColumnInfo, SchemaCache};

/// Database handle for one run: a single-connection pool plus the per-run
/// schema cache. Nothing here is shared; the job is strictly sequential.
pub struct Database {
    pool: MySqlPool,
    cache: SchemaCache,
}

impl Database {
    pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<Self> {
        let opts = MySqlConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.username)
            .password(&cfg.password)
            .database(&cfg.dbname)
            .charset("utf8mb4");

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .with_context(|| format!("connecting to database {} at {}:{}", cfg.dbname, cfg.host, cfg.port))?;

        Ok(Self { pool, cache: SchemaCache::default() })
    }

    /// Verifies the configured table and every configured column against the
    /// catalog, then caches their metadata. Identifiers that fail this check
    /// never reach a statement string.
    pub async fn init_table(&mut self, spec: &TableSpec) -> anyhow::Result<()> {
        ensure!(
            schema::table_exists(&self.pool, &spec.table_name).await?,
            "table {} does not exist",
            spec.table_name
        );

        let columns = schema::load_columns(&self.pool, &spec.table_name).await?;

        let mut needed = vec![spec.primary_key.as_str()];
        for field in &spec.fields {
            needed.push(&field.name);
            needed.push(&field.translated_name);
        }
        for name in needed {
            ensure!(
                columns.contains_key(name),
                "column {name} does not exist in table {}",
                spec.table_name
            );
        }

        self.cache.insert_table(&spec.table_name, columns);
        Ok(())
    }

    fn require_column(&self, table: &str, column: &str) -> anyhow::Result<&ColumnInfo> {
        self.cache
            .column(table, column)
            .with_context(|| format!("column {column} not found in table {table}"))
    }

    /// Loads every row with at least one usable source text. The whole
    /// result set is materialized at once; runs are expected to be bounded
    /// by what a batch job can hold in memory.
    pub async fn fetch_records(&self, spec: &TableSpec) -> anyhow::Result<Vec<TranslationRecord>> {
        self.require_column(&spec.table_name, &spec.primary_key)?;
        for field in &spec.fields {
            self.require_column(&spec.table_name, &field.name)?;
        }

        let sql = records::fetch_sql(&spec.table_name, &spec.primary_key, &spec.fields);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("querying table {}", spec.table_name))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            // keys are expected unsigned, but tolerate signed declarations
            let id: u64 = match row.try_get::<u64, _>(0) {
                Ok(id) => id,
                Err(_) => u64::try_from(row.try_get::<i64, _>(0)?).with_context(|| {
                    format!("negative {} value in table {}", spec.primary_key, spec.table_name)
                })?,
            };
            let mut fields = HashMap::with_capacity(spec.fields.len());
            for (i, field) in spec.fields.iter().enumerate() {
                let text: Option<String> = row.try_get(i + 1)?;
                fields.insert(field.name.clone(), text.unwrap_or_default());
            }
            out.push(TranslationRecord { id, fields });
        }
        Ok(out)
    }

    /// Widens `column` if `required` characters will not fit, per the
    /// index-aware growth policy. A successful ALTER is reflected in the
    /// cache so later checks in the same run skip the catalog.
    async fn ensure_capacity(&mut self, table: &str, column: &str, required: u32) -> anyhow::Result<()> {
        let (current, plan) = {
            let info = self.require_column(table, column)?;
            (info.max_chars, schema::plan_capacity(info, required))
        };

        let Capacity::Widen { new_len, truncates } = plan else {
            return Ok(());
        };

        if truncates {
            warn!(
                table, column, required, cap = new_len,
                "indexed column cannot grow past its cap; text will be truncated on write"
            );
        }
        if new_len <= current {
            return Ok(());
        }

        let sql = records::alter_sql(table, column, new_len);
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("widening column {table}.{column} to {new_len}"))?;

        self.cache.set_max_chars(table, column, new_len);
        info!(table, column, from = current, to = new_len, "widened column");
        Ok(())
    }

    /// Writes translated texts back in one UPDATE keyed by the primary key.
    /// `pairs` is the ordered (target column, text) sequence for one record.
    pub async fn update_translations(
        &mut self,
        spec: &TableSpec,
        id: u64,
        pairs: &[(String, String)],
    ) -> anyhow::Result<()> {
        ensure!(!pairs.is_empty(), "no translations provided for record {id}");

        for (column, text) in pairs {
            let required = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
            self.ensure_capacity(&spec.table_name, column, required).await?;
        }

        let surviving = records::surviving_translations(pairs);
        ensure!(!surviving.is_empty(), "no valid translations for record {id}");

        let columns: Vec<&str> = surviving.iter().map(|(column, _)| *column).collect();
        let sql = records::update_sql(&spec.table_name, &spec.primary_key, &columns);

        let mut query = sqlx::query(&sql);
        for (_, text) in &surviving {
            query = query.bind(*text);
        }
        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("updating table {}", spec.table_name))?;

        if result.rows_affected() == 0 {
            bail!(
                "no record found with {} = {id} in table {}",
                spec.primary_key,
                spec.table_name
            );
        }
        Ok(())
    }
}
