use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::error::{InstallerError, InstallerResult};

/// Path of the root listing on a folder-listing host.
pub const FOLDER_LISTING_ROOT: &str = "download-folder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
    /// A named entry of a type this installer does not fetch.
    Other,
}

/// One entry of a directory listing, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub name: String,
    pub kind: NodeKind,
}

/// A parsed listing level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderListing {
    pub nodes: Vec<FolderNode>,
    /// Length of the raw JSON array, malformed entries included.
    pub entry_count: usize,
}

/// GET a folder listing and parse its entries.
#[instrument(skip(client))]
pub async fn fetch_listing(client: &Client, url: &str) -> InstallerResult<FolderListing> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(InstallerError::DownloadFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.text().await?;
    parse_listing(&body)
}

/// Parse a JSON array of `{type, name}` objects.
///
/// Entries without a string `type`/`name` are skipped but still counted in
/// `entry_count`. A body that is not a JSON array is an error.
pub fn parse_listing(body: &str) -> InstallerResult<FolderListing> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(items) = value else {
        return Err(InstallerError::MalformedData(
            "folder listing is not a JSON array".into(),
        ));
    };

    let mut nodes = Vec::with_capacity(items.len());
    for item in &items {
        match parse_node(item) {
            Some(node) => nodes.push(node),
            None => debug!("Skipping malformed listing entry: {}", item),
        }
    }
    Ok(FolderListing {
        nodes,
        entry_count: items.len(),
    })
}

fn parse_node(item: &Value) -> Option<FolderNode> {
    let name = item.get("name")?.as_str()?;
    let kind = match item.get("type")?.as_str()? {
        "file" => NodeKind::File,
        "folder" => NodeKind::Folder,
        _ => NodeKind::Other,
    };
    if name.is_empty() {
        return None;
    }
    Some(FolderNode {
        name: name.to_string(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_skips_malformed_entries() {
        let listing = parse_listing(
            r#"[
                {"type": "file", "name": "latest.yml"},
                {"type": "folder"},
                {"name": "orphan"},
                {"type": "symlink", "name": "x"},
                42,
                {"type": "folder", "name": "win-unpacked"}
            ]"#,
        )
        .unwrap();

        assert_eq!(listing.entry_count, 6);
        let kinds: Vec<_> = listing
            .nodes
            .iter()
            .map(|node| (node.name.as_str(), node.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("latest.yml", NodeKind::File),
                ("x", NodeKind::Other),
                ("win-unpacked", NodeKind::Folder),
            ]
        );
    }

    #[test]
    fn empty_listing_has_no_entries() {
        let listing = parse_listing("[]").unwrap();
        assert!(listing.nodes.is_empty());
        assert_eq!(listing.entry_count, 0);
    }

    #[test]
    fn object_body_is_rejected() {
        let err = parse_listing(r#"{"type": "file", "name": "a"}"#).unwrap_err();
        assert!(matches!(err, InstallerError::MalformedData(_)));
    }
}
