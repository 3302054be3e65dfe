//! Best-effort machine translation into the dashboard language.
//!
//! The module follows the same decorator layout as the rest of the remote
//! calls in this crate:
//! - [`TranslationApi`]: Core trait for one remote translation request
//! - [`MyMemoryApi`]: HTTP implementation against a MyMemory-compatible endpoint
//! - [`Translator`]: Wraps any [`TranslationApi`] and never fails
//!
//! # Degradation
//!
//! [`Translator::translate`] returns the input unchanged when it is empty,
//! when it already contains Cyrillic letters, or when the remote call fails
//! in any way. There is no retry and no timeout beyond the HTTP client's own.

use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, instrument};

/// Default MyMemory `get` endpoint.
pub const DEFAULT_TRANSLATE_ENDPOINT: &str = "https://api.mymemory.translated.net/get";

/// Default `source|target` language pair.
pub const DEFAULT_LANGPAIR: &str = "en|uk";

/// Letters of the target script. Any one of them means "already translated".
static TARGET_SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[а-яіїєґ]").unwrap());

/// Reasons a single translation request produced nothing usable.
///
/// These never leave the [`Translator`]; they only show up in debug logs.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response carried no translated text")]
    EmptyField,
}

/// Trait for one remote translation request.
///
/// Implementors send `text` to a translation service and return the
/// translated string, or the reason there is none.
pub trait TranslationApi {
    async fn request(&self, text: &str) -> Result<String, TranslationError>;
}

/// Returns `true` when `text` already contains target-script letters.
///
/// Mixed-script and transliterated text also counts as translated.
pub fn looks_translated(text: &str) -> bool {
    TARGET_SCRIPT.is_match(text)
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: Option<ResponseData>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

/// HTTP client for a MyMemory-compatible `get` endpoint.
///
/// Issues `GET {endpoint}?q={text}&langpair={langpair}` and reads
/// `responseData.translatedText` from the JSON body.
#[derive(Debug, Clone)]
pub struct MyMemoryApi {
    client: reqwest::Client,
    endpoint: String,
    langpair: String,
}

impl MyMemoryApi {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, langpair: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            langpair: langpair.into(),
        }
    }

    fn request_url(&self, text: &str) -> String {
        format!(
            "{}?q={}&langpair={}",
            self.endpoint,
            urlencoding::encode(text),
            urlencoding::encode(&self.langpair)
        )
    }
}

impl TranslationApi for MyMemoryApi {
    #[instrument(level = "debug", skip_all, fields(chars = text.chars().count()))]
    async fn request(&self, text: &str) -> Result<String, TranslationError> {
        let t0 = Instant::now();
        let resp = self.client.get(self.request_url(text)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TranslationError::HttpStatus(status.as_u16()));
        }
        let body = resp.text().await?;
        let parsed: MyMemoryResponse = serde_json::from_str(&body)?;
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Translation response received");

        parsed
            .response_data
            .and_then(|d| d.translated_text)
            .filter(|t| !t.is_empty())
            .ok_or(TranslationError::EmptyField)
    }
}

/// Never-failing translator around a [`TranslationApi`].
#[derive(Debug, Clone)]
pub struct Translator<A> {
    api: A,
}

impl<A> Translator<A>
where
    A: TranslationApi,
{
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Translate `text`, or return it unchanged.
    pub async fn translate(&self, text: &str) -> String {
        if text.is_empty() || looks_translated(text) {
            return text.to_string();
        }
        match self.api.request(text).await {
            Ok(translated) => translated,
            Err(e) => {
                debug!(
                    error = %e,
                    text = %truncate_for_log(text, 80),
                    "Translation failed; keeping original text"
                );
                text.to_string()
            }
        }
    }
}
