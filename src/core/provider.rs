//! Translation provider client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::core::config::TranslatorConfig;
use crate::core::errors::ProviderError;

/// External translation service
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Translate one piece of text
    async fn translate(
        &self,
        source: &str,
        target: &str,
        text: &str,
    ) -> Result<String, ProviderError>;

    /// Language codes the provider currently supports
    async fn list_languages(&self) -> Result<HashSet<String>, ProviderError>;
}

/// Body of a `/translate` call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateBody<'a> {
    /// Source language code
    pub source_language_code: &'a str,
    /// Target language code
    pub target_language_code: &'a str,
    /// Texts to translate; one word per call here
    pub texts: Vec<&'a str>,
    /// Cloud folder, omitted when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<&'a str>,
}

/// Body of a `/languages` call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguagesBody<'a> {
    /// Cloud folder, omitted when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Option<Vec<TranslatedText>>,
}

#[derive(Debug, Deserialize)]
struct LanguageEntry {
    code: String,
}

#[derive(Debug, Deserialize)]
struct LanguagesResponse {
    languages: Option<Vec<LanguageEntry>>,
}

/// Extract the first translation from a `/translate` response body
pub fn parse_translation(body: &str) -> Result<String, ProviderError> {
    let response: TranslateResponse = serde_json::from_str(body)?;
    response
        .translations
        .and_then(|translations| translations.into_iter().next())
        .map(|t| t.text)
        .ok_or(ProviderError::EmptyTranslation)
}

/// Extract lowercase language codes from a `/languages` response body
pub fn parse_languages(body: &str) -> Result<HashSet<String>, ProviderError> {
    let response: LanguagesResponse = serde_json::from_str(body)?;
    let languages = response
        .languages
        .ok_or_else(|| ProviderError::InvalidResponseError {
            message: "No languages in response".to_string(),
        })?;

    Ok(languages
        .into_iter()
        .map(|l| l.code.trim().to_lowercase())
        .filter(|code| !code.is_empty())
        .collect())
}

/// Yandex Cloud Translate REST client
#[derive(Debug, Clone)]
pub struct YandexCloudClient {
    client: reqwest::Client,
    api_key: String,
    api_endpoint: String,
    folder_id: Option<String>,
}

impl YandexCloudClient {
    /// Create a client from configuration
    pub fn new(config: &TranslatorConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(config.pool_threads)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
            folder_id: config.folder_id.clone(),
        })
    }

    /// Send a JSON body and return the raw success body
    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String, ProviderError> {
        let url = format!("{}/{}", self.api_endpoint, path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::InvalidResponseError {
                message: e.to_string(),
            })?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl ProviderClient for YandexCloudClient {
    async fn translate(
        &self,
        source: &str,
        target: &str,
        text: &str,
    ) -> Result<String, ProviderError> {
        let body = TranslateBody {
            source_language_code: source,
            target_language_code: target,
            texts: vec![text],
            folder_id: self.folder_id.as_deref(),
        };

        let response = self.post("translate", &body).await?;
        let translation = parse_translation(&response)?;
        debug!(source, target, "Provider translated {:?} -> {:?}", text, translation);
        Ok(translation)
    }

    async fn list_languages(&self) -> Result<HashSet<String>, ProviderError> {
        let body = LanguagesBody {
            folder_id: self.folder_id.as_deref(),
        };

        let response = self.post("languages", &body).await?;
        parse_languages(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn test_translate_body_wire_format() {
        let body = TranslateBody {
            source_language_code: "en",
            target_language_code: "ru",
            texts: vec!["one"],
            folder_id: None,
        };

        assert_json_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "sourceLanguageCode": "en",
                "targetLanguageCode": "ru",
                "texts": ["one"]
            })
        );
    }

    #[test]
    fn test_folder_id_sent_when_configured() {
        let body = LanguagesBody {
            folder_id: Some("b1g-folder"),
        };

        assert_json_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "folderId": "b1g-folder" })
        );
    }

    #[test]
    fn test_parse_translation_takes_first() {
        let body = r#"{"translations": [{"text": "один"}, {"text": "два"}]}"#;
        assert_eq!(parse_translation(body).unwrap(), "один");
    }

    #[test]
    fn test_parse_translation_missing() {
        assert!(matches!(
            parse_translation(r#"{"translations": []}"#),
            Err(ProviderError::EmptyTranslation)
        ));
        assert!(matches!(
            parse_translation("{}"),
            Err(ProviderError::EmptyTranslation)
        ));
        assert!(matches!(
            parse_translation("not json"),
            Err(ProviderError::JsonError(_))
        ));
    }

    #[test]
    fn test_parse_languages_lowercases() {
        let body = r#"{"languages": [{"code": "EN", "name": "English"}, {"code": "ru"}, {"code": " "}]}"#;
        let languages = parse_languages(body).unwrap();

        assert_eq!(languages.len(), 2);
        assert!(languages.contains("en"));
        assert!(languages.contains("ru"));
    }

    #[test]
    fn test_parse_languages_missing_list() {
        assert!(parse_languages("{}").is_err());
    }

    #[test]
    fn test_client_creation_trims_endpoint() {
        let config = TranslatorConfig {
            api_key: "test_key".to_string(),
            api_endpoint: "https://example.test/translate/v2/".to_string(),
            ..Default::default()
        };

        let client = YandexCloudClient::new(&config).unwrap();
        assert_eq!(client.api_endpoint, "https://example.test/translate/v2");
    }
}
