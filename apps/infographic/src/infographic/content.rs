//! Request content → per-label content queues.
//!
//! Resolution happens in two steps: stored images are downloaded on the async
//! side, then everything is decoded inside the blocking paint task.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::layout::{ContentItem, ContentQueues};
use crate::storage::ObjectStore;

/// One content item as sent by the client.
///
/// Images are either inline (`data`, base64) or a key in the configured bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSpec {
    Text {
        text: String,
    },
    Image {
        #[serde(default)]
        data: Option<String>,
        #[serde(default)]
        key: Option<String>,
    },
}

/// Label id → items in placement order.
pub type ContentMap = BTreeMap<u32, Vec<ContentSpec>>;

/// Content with every remote reference fetched, not yet decoded.
#[derive(Debug, Clone)]
pub enum ResolvedContent {
    Text(String),
    Image(Bytes),
}

/// Downloads stored images and base64-decodes inline ones.
pub async fn resolve_contents(
    contents: ContentMap,
    store: &dyn ObjectStore,
    bucket: &str,
) -> Result<Vec<(u32, ResolvedContent)>, AppError> {
    let mut resolved = Vec::new();
    for (label, items) in contents {
        for item in items {
            let content = match item {
                ContentSpec::Text { text } => ResolvedContent::Text(text),
                ContentSpec::Image {
                    data: Some(data),
                    key: None,
                } => ResolvedContent::Image(Bytes::from(STANDARD.decode(data.trim()).map_err(
                    |e| AppError::Validation(format!("label {label}: invalid base64 image: {e}")),
                )?)),
                ContentSpec::Image {
                    data: None,
                    key: Some(key),
                } => {
                    let bytes = store.download(bucket, &key).await.ok_or_else(|| {
                        AppError::NotFound(format!("image s3://{bucket}/{key} not fetched"))
                    })?;
                    ResolvedContent::Image(bytes)
                }
                ContentSpec::Image { .. } => {
                    return Err(AppError::Validation(format!(
                        "label {label}: an image needs exactly one of `data` or `key`"
                    )));
                }
            };
            resolved.push((label, content));
        }
    }
    Ok(resolved)
}

/// Decodes images and fills the queues, keeping per-label order.
pub fn build_queues(resolved: Vec<(u32, ResolvedContent)>) -> Result<ContentQueues, AppError> {
    let mut queues = ContentQueues::new();
    for (label, content) in resolved {
        let item = match content {
            ResolvedContent::Text(text) => ContentItem::Text(text),
            ResolvedContent::Image(bytes) => ContentItem::Image(image::load_from_memory(&bytes)?),
        };
        queues.push(label, item);
    }
    Ok(queues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::test_support::png_bytes;
    use serde_json::json;

    #[test]
    fn test_content_spec_deserializes_tagged_items() {
        let map: ContentMap = serde_json::from_value(json!({
            "0": [{"type": "text", "text": "Headline"}],
            "1": [{"type": "image", "key": "uploads/a.png"}, {"type": "image", "data": "AAAA"}]
        }))
        .unwrap();
        assert_eq!(map[&1].len(), 2);
        assert!(matches!(&map[&0][0], ContentSpec::Text { text } if text == "Headline"));
    }

    #[tokio::test]
    async fn test_resolve_downloads_keys_and_decodes_base64() {
        let store = MemoryStore::with_bucket("b");
        let png = png_bytes(4, 4, [0, 255, 0]);
        assert!(store.upload(png.clone(), "b", "img.png").await);

        let contents: ContentMap = BTreeMap::from([
            (
                1,
                vec![
                    ContentSpec::Image {
                        data: None,
                        key: Some("img.png".into()),
                    },
                    ContentSpec::Image {
                        data: Some(STANDARD.encode(&png)),
                        key: None,
                    },
                ],
            ),
            (0, vec![ContentSpec::Text { text: "hi".into() }]),
        ]);

        let resolved = resolve_contents(contents, &store, "b").await.unwrap();
        assert_eq!(resolved.len(), 3);
        let mut queues = build_queues(resolved).unwrap();
        assert_eq!(queues.remaining(1), 2);
        assert!(matches!(queues.pop(0), Some(ContentItem::Text(t)) if t == "hi"));
        match queues.pop(1) {
            Some(ContentItem::Image(img)) => assert_eq!((img.width(), img.height()), (4, 4)),
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_missing_key_is_not_found() {
        let store = MemoryStore::with_bucket("b");
        let contents: ContentMap = BTreeMap::from([(
            2,
            vec![ContentSpec::Image {
                data: None,
                key: Some("nope.png".into()),
            }],
        )]);
        let err = resolve_contents(contents, &store, "b").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_rejects_ambiguous_image() {
        let store = MemoryStore::with_bucket("b");
        let contents: ContentMap = BTreeMap::from([(
            1,
            vec![ContentSpec::Image {
                data: None,
                key: None,
            }],
        )]);
        let err = resolve_contents(contents, &store, "b").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_build_queues_rejects_undecodable_image() {
        let resolved = vec![(1, ResolvedContent::Image(Bytes::from_static(b"not a png")))];
        assert!(matches!(build_queues(resolved), Err(AppError::Image(_))));
    }
}
