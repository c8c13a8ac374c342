//! X/Twitter client: OAuth 1.0a signing, media upload, and posting.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tracing::{debug, info};

use crate::config::TwitterCredentials;
use crate::scheduler::{Draft, PublishError, Publisher};

const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";
const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";

pub struct TwitterClient {
    credentials: TwitterCredentials,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia<'a>>,
}

#[derive(Serialize)]
struct TweetMedia<'a> {
    media_ids: &'a [String],
}

#[derive(Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Deserialize)]
struct MediaResponse {
    media_id_string: String,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials) -> Self {
        Self {
            credentials,
            http: reqwest::Client::new(),
        }
    }

    /// Upload an image and return its media id.
    pub async fn upload_media(&self, path: &Path) -> Result<String, Error> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());
        debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        let form = reqwest::multipart::Form::new()
            .part("media", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .http
            .post(MEDIA_UPLOAD_URL)
            .header("authorization", self.authorization("POST", MEDIA_UPLOAD_URL)?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let media: MediaResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;
        Ok(media.media_id_string)
    }

    /// Create a post, optionally with attached media. Returns the post id.
    pub async fn post(&self, text: &str, media_ids: &[String]) -> Result<String, Error> {
        let request = TweetRequest {
            text,
            media: (!media_ids.is_empty()).then_some(TweetMedia { media_ids }),
        };

        let response = self
            .http
            .post(TWEETS_URL)
            .header("authorization", self.authorization("POST", TWEETS_URL)?)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let tweet: TweetResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;
        Ok(tweet.data.id)
    }

    fn authorization(&self, method: &str, url: &str) -> Result<String, Error> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        authorization_header(&self.credentials, method, url, &nonce, &timestamp)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api(format!("{status}: {body}")));
    }
    Ok(response)
}

/// RFC 3986 percent-encoding as OAuth 1.0a requires.
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// HMAC-SHA1 signature over the OAuth base string.
fn signature(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, Error> {
    let mut encoded: Vec<(String, String)> = params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!("{}&{}&{}", method.to_uppercase(), encode(url), encode(&param_string));
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).map_err(|e| Error::Signing(e.to_string()))?;
    mac.update(base.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build the `Authorization: OAuth ...` header. Only oauth parameters are
/// signed; JSON and multipart bodies are not part of the base string.
fn authorization_header(
    credentials: &TwitterCredentials,
    method: &str,
    url: &str,
    nonce: &str,
    timestamp: &str,
) -> Result<String, Error> {
    let mut params = vec![
        ("oauth_consumer_key", credentials.app_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];
    let signature = signature(
        method,
        url,
        &params,
        &credentials.app_secret,
        &credentials.access_secret,
    )?;
    params.push(("oauth_signature", signature.as_str()));

    let header = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {header}"))
}

#[async_trait]
impl Publisher for TwitterClient {
    async fn publish(&self, draft: &Draft) -> Result<(), PublishError> {
        let mut media_ids = Vec::new();
        if let Some(ref image) = draft.image {
            media_ids.push(self.upload_media(image).await?);
        }
        let id = self.post(&draft.text, &media_ids).await?;
        info!("🐦 Posted {} (media: {})", id, media_ids.len());
        Ok(())
    }
}

#[derive(Debug)]
pub enum Error {
    /// HTTP 429 from the platform.
    RateLimited,
    Http(String),
    Api(String),
    Parse(String),
    Io(String),
    Signing(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::RateLimited => write!(f, "Rate limited"),
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Signing(e) => write!(f, "Signing error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<Error> for PublishError {
    fn from(e: Error) -> Self {
        match e {
            Error::RateLimited => PublishError::RateLimited,
            other => PublishError::Failed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matches_reference_example() {
        // Worked example from the platform's OAuth documentation
        let params = [
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            ("oauth_version", "1.0"),
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
        ];
        let sig = signature(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
        .unwrap();
        assert_eq!(sig, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_authorization_header_shape() {
        let credentials = TwitterCredentials {
            app_key: "key".to_string(),
            app_secret: "secret".to_string(),
            access_token: "token".to_string(),
            access_secret: "token-secret".to_string(),
        };
        let header = authorization_header(&credentials, "POST", TWEETS_URL, "abc123", "1700000000").unwrap();
        assert!(header.starts_with("OAuth "));
        assert!(header.contains(r#"oauth_consumer_key="key""#));
        assert!(header.contains(r#"oauth_nonce="abc123""#));
        assert!(header.contains(r#"oauth_signature=""#));
        assert!(!header.contains("secret"));
    }

    #[test]
    fn test_tweet_request_without_media() {
        let json = serde_json::to_value(TweetRequest { text: "hi", media: None }).unwrap();
        assert_eq!(json, serde_json::json!({"text": "hi"}));
    }

    #[test]
    fn test_tweet_request_with_media() {
        let ids = vec!["42".to_string()];
        let json = serde_json::to_value(TweetRequest {
            text: "hi",
            media: Some(TweetMedia { media_ids: &ids }),
        })
        .unwrap();
        assert_eq!(json["media"]["media_ids"][0], "42");
    }

    #[test]
    fn test_rate_limit_maps_to_publish_signal() {
        assert!(matches!(PublishError::from(Error::RateLimited), PublishError::RateLimited));
        assert!(matches!(
            PublishError::from(Error::Api("500".into())),
            PublishError::Failed(_)
        ));
    }
}
