use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::error::{InstallerError, InstallerResult};

use super::backend::{BackendConfig, BackendKind};

/// `ListObjectsV2` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_continuation_token: Option<String>,
    #[serde(default)]
    contents: Vec<ObjectEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectEntry {
    key: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Key relative to the bucket prefix.
    pub key: String,
    pub size: u64,
}

/// Keys below a bucket prefix. Directory placeholders (`foo/`) are dropped.
#[instrument(skip(client))]
pub async fn list_objects(client: &Client, backend: &BackendConfig) -> InstallerResult<Vec<ObjectInfo>> {
    if backend.kind != BackendKind::ObjectStorage {
        return Err(InstallerError::Configuration(format!(
            "{:?} backend cannot list objects",
            backend.kind
        )));
    }

    let prefix = backend
        .bucket
        .as_deref()
        .map(|bucket| format!("{}/", bucket.trim_matches('/')))
        .unwrap_or_default();
    let list_url = format!("{}/", backend.base_url);

    let mut objects = Vec::new();
    let mut continuation: Option<String> = None;
    loop {
        let mut query = vec![("list-type", "2".to_string()), ("prefix", prefix.clone())];
        if let Some(token) = &continuation {
            query.push(("continuation-token", token.clone()));
        }

        let response = client.get(&list_url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InstallerError::DownloadFailed {
                url: list_url,
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        let page = parse_listing(&body)?;

        objects.extend(page.contents.into_iter().filter_map(|entry| {
            let key = entry.key.strip_prefix(&prefix)?.to_string();
            if key.is_empty() || key.ends_with('/') {
                return None;
            }
            Some(ObjectInfo {
                key,
                size: entry.size,
            })
        }));

        match (page.is_truncated, page.next_continuation_token) {
            (true, Some(token)) => continuation = Some(token),
            _ => break,
        }
    }

    debug!("Listed {} objects under '{}'", objects.len(), prefix);
    Ok(objects)
}

fn parse_listing(body: &str) -> InstallerResult<ListBucketResult> {
    Ok(quick_xml::de::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>leadme-tools</Name>
  <Prefix>leadme-launcher/</Prefix>
  <KeyCount>3</KeyCount>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>abc123</NextContinuationToken>
  <Contents><Key>leadme-launcher/latest.yml</Key><Size>344</Size></Contents>
  <Contents><Key>leadme-launcher/win-unpacked/</Key><Size>0</Size></Contents>
  <Contents><Key>leadme-launcher/win-unpacked/ffmpeg.dll</Key><Size>2809344</Size></Contents>
</ListBucketResult>"#;

    #[test]
    fn parses_listing_page() {
        let page = parse_listing(PAGE).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token.as_deref(), Some("abc123"));
        assert_eq!(page.contents.len(), 3);
        assert_eq!(page.contents[2].size, 2_809_344);
    }

    #[test]
    fn empty_listing_has_no_contents() {
        let page = parse_listing(
            "<ListBucketResult><IsTruncated>false</IsTruncated></ListBucketResult>",
        )
        .unwrap();
        assert!(page.contents.is_empty());
        assert!(!page.is_truncated);
    }
}
