use std::{fs, path::Path};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub translation_tables: Vec<TableSpec>,
    pub translation_api: TranslationApi,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub dbname: String,
}

/// One table to translate: its primary key plus the ordered
/// (source column, target column) pairs.
#[derive(Debug, Deserialize)]
pub struct TableSpec {
    pub table_name: String,
    pub primary_key: String,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub translated_name: String,
}

#[derive(Debug, Deserialize)]
pub struct TranslationApi {
    pub url: String,
}

pub fn load(path: &Path) -> anyhow::Result<Config> {
    let raw = fs::read(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("parsing config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_job_config() {
        let cfg: Config = serde_json::from_str(r#"{
            "database": {
                "host": "127.0.0.1",
                "port": 3306,
                "username": "scan",
                "password": "secret",
                "dbname": "site"
            },
            "translation_tables": [
                {
                    "table_name": "posts",
                    "primary_key": "id",
                    "fields": [
                        { "name": "title", "translated_name": "title_translated" },
                        { "name": "summary", "translated_name": "summary_translated" }
                    ]
                }
            ],
            "translation_api": { "url": "http://localhost:8080/translate" }
        }"#).unwrap();

        assert_eq!(cfg.database.port, 3306);
        assert_eq!(cfg.translation_tables.len(), 1);
        let table = &cfg.translation_tables[0];
        assert_eq!(table.table_name, "posts");
        assert_eq!(table.primary_key, "id");
        assert_eq!(table.fields[1].name, "summary");
        assert_eq!(table.fields[1].translated_name, "summary_translated");
        assert_eq!(cfg.translation_api.url, "http://localhost:8080/translate");
    }

    #[test]
    fn rejects_missing_sections() {
        assert!(serde_json::from_str::<Config>(r#"{ "database": {} }"#).is_err());
    }
}
