use std::iter;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use crate::config::{FieldSpec, TableSpec};
use crate::db::records::TranslationRecord;
use crate::db::Database;
use crate::translate::Translator;

pub const BATCH_SIZE: usize = 10;
const BATCH_DELAY: Duration = Duration::from_millis(100);

/// Runs every configured table in order. A table that fails to initialize
/// or fetch is logged and skipped; only startup failures abort the run.
pub async fn run(
    db: &mut Database,
    translator: &Translator,
    tables: &[TableSpec],
) -> anyhow::Result<()> {
    for spec in tables {
        info!(table = %spec.table_name, "processing table");
        match process_table(db, translator, spec).await {
            Ok(()) => info!(table = %spec.table_name, "completed table"),
            Err(e) => error!(table = %spec.table_name, "skipping table: {e:#}"),
        }
    }
    Ok(())
}

async fn process_table(
    db: &mut Database,
    translator: &Translator,
    spec: &TableSpec,
) -> anyhow::Result<()> {
    db.init_table(spec).await?;

    let records = db.fetch_records(spec).await?;
    if records.is_empty() {
        info!(table = %spec.table_name, "no texts to translate");
        return Ok(());
    }
    info!(table = %spec.table_name, count = records.len(), "records to translate");

    for (i, batch) in records.chunks(BATCH_SIZE).enumerate() {
        // pacing against the translation endpoint, between batches only
        if i > 0 {
            sleep(BATCH_DELAY).await;
        }
        info!(batch = i + 1, size = batch.len(), "processing batch");

        for record in batch {
            match process_record(db, translator, spec, record).await {
                Ok(true) => info!(id = record.id, "translated and updated record"),
                Ok(false) => info!(id = record.id, "no texts to translate for record"),
                Err(e) => error!(id = record.id, "skipping record: {e:#}"),
            }
        }
    }
    Ok(())
}

/// Translates one record. Returns false when no source field held text.
async fn process_record(
    db: &mut Database,
    translator: &Translator,
    spec: &TableSpec,
    record: &TranslationRecord,
) -> anyhow::Result<bool> {
    let pairs = collect_texts(&spec.fields, record);
    if pairs.is_empty() {
        return Ok(false);
    }

    let texts: Vec<String> = pairs.iter().map(|(_, text)| (*text).to_owned()).collect();
    let translated = translator.translate(&texts).await?;

    // one ordered pairing drives both the request and the write-back
    let translations: Vec<(String, String)> = iter::zip(&pairs, translated)
        .map(|((target, _), text)| ((*target).to_owned(), text))
        .collect();

    db.update_translations(spec, record.id, &translations).await?;
    Ok(true)
}

/// Collects (target column, source text) pairs in field order, skipping
/// sources with no text. This ordered sequence is carried through the
/// translation call so results map back without re-deriving positions.
fn collect_texts<'a>(
    fields: &'a [FieldSpec],
    record: &'a TranslationRecord,
) -> Vec<(&'a str, &'a str)> {
    fields
        .iter()
        .filter_map(|field| {
            let text = record.fields.get(&field.name)?;
            (!text.is_empty()).then_some((field.translated_name.as_str(), text.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn record(id: u64, fields: &[(&str, &str)]) -> TranslationRecord {
        TranslationRecord {
            id,
            fields: fields
                .iter()
                .map(|&(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        }
    }

    fn field(name: &str, translated: &str) -> FieldSpec {
        FieldSpec { name: name.to_owned(), translated_name: translated.to_owned() }
    }

    #[test]
    fn pairs_follow_field_order_and_skip_empty_sources() {
        let fields = [
            field("title", "title_translated"),
            field("summary", "summary_translated"),
            field("body", "body_translated"),
        ];
        let record = record(7, &[("title", "Hello"), ("summary", ""), ("body", "World")]);

        assert_eq!(
            collect_texts(&fields, &record),
            vec![("title_translated", "Hello"), ("body_translated", "World")]
        );
    }

    #[test]
    fn record_with_no_text_yields_no_pairs() {
        let fields = [field("title", "title_translated")];
        assert!(collect_texts(&fields, &record(1, &[("title", "")])).is_empty());
        assert!(collect_texts(&fields, &record(2, &[])).is_empty());
    }

    #[test]
    fn missing_field_values_are_skipped_not_fatal() {
        let fields = [field("title", "title_translated"), field("summary", "summary_translated")];
        let record = TranslationRecord {
            id: 3,
            fields: HashMap::from([("title".to_owned(), "Hello".to_owned())]),
        };
        assert_eq!(collect_texts(&fields, &record), vec![("title_translated", "Hello")]);
    }

    #[test]
    fn twenty_five_records_split_into_10_10_5() {
        let records: Vec<u32> = (0..25).collect();
        let sizes: Vec<usize> = records.chunks(BATCH_SIZE).map(<[u32]>::len).collect();
        assert_eq!(sizes, [10, 10, 5]);
    }
}
