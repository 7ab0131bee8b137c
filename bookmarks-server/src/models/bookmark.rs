//! Bookmark entity and its request/response shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Tag, TagNames};

/// Upper bound on description length, in characters
pub const DESCRIPTION_MAX_LEN: usize = 1000;

/// Bookmark record with its attached tags.
///
/// Tags are owned one way: the bookmark lists its tags, and the reverse
/// lookup (tag -> bookmarks) goes through the join table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    /// Sorted by name
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}

/// Create/update request body.
///
/// Update is a full replace: a field left out of the body is written as
/// null/empty, and the store's NOT NULL constraints decide whether that is
/// accepted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag_names: Option<Vec<String>>,
}

/// Write model handed to the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkDraft {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag_names: TagNames,
}

impl From<BookmarkRequest> for BookmarkDraft {
    fn from(req: BookmarkRequest) -> Self {
        Self {
            url: req.url,
            title: req.title,
            description: req.description,
            tag_names: TagNames::from_request(req.tag_names),
        }
    }
}

/// Bookmark response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkResponse {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub tag_names: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Bookmark> for BookmarkResponse {
    fn from(b: Bookmark) -> Self {
        let tag_names = b.tag_names();
        Self {
            id: b.id,
            url: b.url,
            title: b.title,
            description: b.description,
            tag_names,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bookmark {
        let now = Utc::now();
        Bookmark {
            id: 7,
            url: "https://example.com".into(),
            title: "Example".into(),
            description: None,
            tags: vec![
                Tag { id: 2, name: "a".into() },
                Tag { id: 1, name: "b".into() },
            ],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn response_carries_tag_names() {
        let response = BookmarkResponse::from(sample());
        assert_eq!(response.id, 7);
        assert_eq!(response.tag_names, vec!["a", "b"]);
    }

    #[test]
    fn response_serializes_camel_case() {
        let json = serde_json::to_value(BookmarkResponse::from(sample())).unwrap();
        assert!(json.get("tagNames").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json["description"].is_null());
    }

    #[test]
    fn request_fields_are_optional() {
        let req: BookmarkRequest = serde_json::from_str(r#"{"title": "only title"}"#).unwrap();
        let draft = BookmarkDraft::from(req);
        assert_eq!(draft.title.as_deref(), Some("only title"));
        assert!(draft.url.is_none());
        assert!(draft.tag_names.is_empty());
    }

    #[test]
    fn request_tag_names_deduplicated() {
        let req: BookmarkRequest =
            serde_json::from_str(r#"{"url": "u", "title": "t", "tagNames": ["x", "x", "y"]}"#)
                .unwrap();
        let draft = BookmarkDraft::from(req);
        assert_eq!(draft.tag_names.to_vec(), vec!["x", "y"]);
    }
}
