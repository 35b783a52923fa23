use anyhow::{bail, ensure, Context as _};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct TranslationResponse {
    original_text: Vec<String>,
    translated_text: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Translator {
    client: Client,
    url: String,
}

impl Translator {
    pub fn new(url: String) -> Self {
        Self { client: Client::new(), url }
    }

    /// Sends every text as a repeated `list` query parameter and returns the
    /// translations in request order. The caller pairs results with target
    /// columns positionally, so a short response is an error here rather
    /// than a silent partial mapping downstream.
    pub async fn translate(&self, texts: &[String]) -> anyhow::Result<Vec<String>> {
        let params: Vec<(&str, &str)> = texts.iter().map(|t| ("list", t.as_str())).collect();

        let res = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .context("sending translation request")?;

        let status = res.status();
        let body = res.text().await.context("reading translation response")?;
        if !status.is_success() {
            bail!("translation API returned {status}: {body}");
        }

        let parsed = parse_response(&body)?;
        if parsed.original_text.len() != texts.len() {
            warn!(
                sent = texts.len(),
                echoed = parsed.original_text.len(),
                "translation API echoed a different number of originals"
            );
        }
        ensure!(
            parsed.translated_text.len() >= texts.len(),
            "translation API returned {} translations for {} texts",
            parsed.translated_text.len(),
            texts.len()
        );
        Ok(parsed.translated_text)
    }
}

fn parse_response(body: &str) -> anyhow::Result<TranslationResponse> {
    serde_json::from_str(body).with_context(|| format!("decoding translation response: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_parallel_arrays() {
        let res = parse_response(
            r#"{ "original_text": ["Hello", "World"],
                 "translated_text": ["Bonjour", "Monde"] }"#,
        )
        .unwrap();
        assert_eq!(res.original_text, ["Hello", "World"]);
        assert_eq!(res.translated_text, ["Bonjour", "Monde"]);
    }

    #[test]
    fn decode_error_carries_the_body() {
        let err = parse_response("not json").unwrap_err();
        assert!(format!("{err:#}").contains("not json"));
    }

    #[test]
    fn missing_arrays_are_an_error() {
        assert!(parse_response(r#"{ "translated_text": [] }"#).is_err());
    }
}
