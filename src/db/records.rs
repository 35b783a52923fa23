use std::collections::HashMap;

use crate::config::FieldSpec;

/// One fetched row: primary-key value plus source column texts. Consumed by
/// the translate-and-update step, never persisted.
#[derive(Debug)]
pub struct TranslationRecord {
    pub id: u64,
    pub fields: HashMap<String, String>,
}

/// Identifiers passed to the builders below must already be allow-listed
/// against the schema cache; the backticks only guard against reserved
/// words, not hostile input.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// SELECT of the primary key plus every source column, keeping any row
/// where at least one source column holds usable text (non-NULL, non-empty,
/// no embedded NUL marker). Qualifying on one column pulls the whole row.
pub fn fetch_sql(table: &str, primary_key: &str, fields: &[FieldSpec]) -> String {
    let mut columns = vec![quote_ident(primary_key)];
    columns.extend(fields.iter().map(|f| quote_ident(&f.name)));

    let conditions: Vec<String> = fields
        .iter()
        .map(|f| {
            let c = quote_ident(&f.name);
            format!("({c} IS NOT NULL AND {c} != '' AND {c} NOT LIKE '%\\0%')")
        })
        .collect();

    format!(
        "SELECT {} FROM {} WHERE {}",
        columns.join(", "),
        quote_ident(table),
        conditions.join(" OR ")
    )
}

pub fn update_sql(table: &str, primary_key: &str, fields: &[&str]) -> String {
    let sets: Vec<String> = fields
        .iter()
        .map(|f| format!("{} = ?", quote_ident(f)))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quote_ident(table),
        sets.join(", "),
        quote_ident(primary_key)
    )
}

pub fn alter_sql(table: &str, column: &str, new_len: u32) -> String {
    format!(
        "ALTER TABLE {} MODIFY COLUMN {} VARCHAR({new_len}) \
         CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
        quote_ident(table),
        quote_ident(column)
    )
}

/// Trims every translated value and drops the ones that end up empty, so an
/// all-whitespace translation never overwrites stored text. Order is
/// preserved.
pub fn surviving_translations(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs
        .iter()
        .filter_map(|(field, text)| {
            let text = text.trim();
            (!text.is_empty()).then_some((field.as_str(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, translated: &str) -> FieldSpec {
        FieldSpec { name: name.to_owned(), translated_name: translated.to_owned() }
    }

    #[test]
    fn fetch_sql_ors_the_source_column_filters() {
        let fields = [field("title", "title_translated"), field("summary", "summary_translated")];
        assert_eq!(
            fetch_sql("posts", "id", &fields),
            "SELECT `id`, `title`, `summary` FROM `posts` WHERE \
             (`title` IS NOT NULL AND `title` != '' AND `title` NOT LIKE '%\\0%') OR \
             (`summary` IS NOT NULL AND `summary` != '' AND `summary` NOT LIKE '%\\0%')"
        );
    }

    #[test]
    fn update_sql_binds_values_and_keys_on_the_primary_key() {
        assert_eq!(
            update_sql("posts", "id", &["title_translated", "summary_translated"]),
            "UPDATE `posts` SET `title_translated` = ?, `summary_translated` = ? WHERE `id` = ?"
        );
    }

    #[test]
    fn alter_sql_declares_charset_and_collation() {
        assert_eq!(
            alter_sql("posts", "title_translated", 191),
            "ALTER TABLE `posts` MODIFY COLUMN `title_translated` VARCHAR(191) \
             CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"
        );
    }

    #[test]
    fn whitespace_only_translations_are_dropped() {
        let pairs = vec![
            ("title_translated".to_owned(), "  Bonjour  ".to_owned()),
            ("summary_translated".to_owned(), "   ".to_owned()),
            ("body_translated".to_owned(), "".to_owned()),
        ];
        assert_eq!(surviving_translations(&pairs), vec![("title_translated", "Bonjour")]);
    }

    #[test]
    fn all_empty_translations_survive_as_nothing() {
        let pairs = vec![("title_translated".to_owned(), " \t\n".to_owned())];
        assert!(surviving_translations(&pairs).is_empty());
    }
}
