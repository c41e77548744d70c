//! Google Drive v3 client for the application data folder.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use super::RemoteStore;
use crate::config::BackupConfig;
use crate::util::{compact_text, is_http_url, normalize_text_option};
use crate::{Error, Result};

const APP_DATA_FOLDER: &str = "appDataFolder";
const JSON_MIME: &str = "application/json";

/// Drive REST client; one instance can serve any number of tokens.
#[derive(Clone, Debug)]
pub struct DriveClient {
    api_url: String,
    upload_url: String,
    client: reqwest::Client,
}

impl DriveClient {
    pub fn new(config: &BackupConfig) -> Result<Self> {
        Self::with_endpoints(&config.drive_api_url, &config.drive_upload_url)
    }

    pub fn with_endpoints(api_url: &str, upload_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: normalize_endpoint(api_url)?,
            upload_url: normalize_endpoint(upload_url)?,
            client: reqwest::Client::builder().build()?,
        })
    }

    fn file_url(&self, base: &str, file_id: &str) -> Result<String> {
        let file_id = normalize_text_option(Some(file_id.to_string()))
            .ok_or_else(|| Error::InvalidInput("file id must not be empty".to_string()))?;
        Ok(format!("{base}/files/{}", urlencoding::encode(&file_id)))
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
}

impl RemoteStore for DriveClient {
    async fn find_file(&self, token: &str, name: &str) -> Result<Option<String>> {
        let token = require_token(token)?;
        let query = format!(
            "name = '{}' and trashed = false",
            escape_query_value(name)
        );
        let url = format!(
            "{}/files?spaces={APP_DATA_FOLDER}&q={}&fields={}&orderBy={}&pageSize=10",
            self.api_url,
            urlencoding::encode(&query),
            urlencoding::encode("files(id,name,modifiedTime)"),
            urlencoding::encode("modifiedTime desc")
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, JSON_MIME)
            .send()
            .await?;
        let listing = ensure_success(response).await?.json::<FileList>().await?;

        Ok(listing
            .files
            .into_iter()
            .map(|file| file.id)
            .find(|id| !id.trim().is_empty()))
    }

    async fn read_file(&self, token: &str, file_id: &str) -> Result<String> {
        let token = require_token(token)?;
        let url = format!("{}?alt=media", self.file_url(&self.api_url, file_id)?);

        let response = self.client.get(url).bearer_auth(token).send().await?;
        Ok(ensure_success(response).await?.text().await?)
    }

    async fn create_file(&self, token: &str, name: &str, body: &str) -> Result<String> {
        let token = require_token(token)?;
        let metadata = serde_json::json!({
            "name": name,
            "parents": [APP_DATA_FOLDER],
            "mimeType": JSON_MIME,
        });
        let boundary = format!("tally_backup_{}", Uuid::now_v7().simple());
        let payload = multipart_related(&boundary, &metadata.to_string(), body);
        let url = format!("{}/files?uploadType=multipart&fields=id", self.upload_url);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .header(ACCEPT, JSON_MIME)
            .body(payload)
            .send()
            .await?;
        let created = ensure_success(response).await?.json::<FileEntry>().await?;
        tracing::debug!("Created remote file {name} as {}", created.id);
        Ok(created.id)
    }

    async fn update_file(&self, token: &str, file_id: &str, body: &str) -> Result<()> {
        let token = require_token(token)?;
        let url = format!(
            "{}?uploadType=media",
            self.file_url(&self.upload_url, file_id)?
        );

        let response = self
            .client
            .patch(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, JSON_MIME)
            .body(body.to_string())
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

fn multipart_related(boundary: &str, metadata: &str, body: &str) -> String {
    format!(
        "--{boundary}\r\n\
         Content-Type: {JSON_MIME}; charset=UTF-8\r\n\r\n\
         {metadata}\r\n\
         --{boundary}\r\n\
         Content-Type: {JSON_MIME}\r\n\r\n\
         {body}\r\n\
         --{boundary}--"
    )
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Remote(parse_api_error(status, &body)))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorBody {
    Nested { error: ApiErrorDetail },
    Flat {
        error: String,
        error_description: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        let message = match payload {
            ApiErrorBody::Nested { error } => error.message,
            ApiErrorBody::Flat {
                error,
                error_description,
            } => Some(error_description.unwrap_or(error)),
        };
        if let Some(message) = message {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn require_token(token: &str) -> Result<&str> {
    let token = token.trim();
    if token.is_empty() {
        Err(Error::InvalidInput(
            "access token must not be empty".to_string(),
        ))
    } else {
        Ok(token)
    }
}

fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn normalize_endpoint(raw: &str) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| Error::Config("drive endpoint must not be empty".to_string()))?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "drive endpoint must include http:// or https://".to_string(),
        ))
    }
}
