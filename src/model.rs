use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{RepositoryError, RepositoryResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
}

impl Post {
    pub fn new(id: u64, title: &str, content: &str) -> Post {
        Post {
            id,
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    fn field(&self, key: SortKey) -> &str {
        match key {
            SortKey::Title => &self.title,
            SortKey::Content => &self.content,
        }
    }

    /// Lower-cased value of `key`, used as the sort key.
    pub fn sort_value(&self, key: SortKey) -> String {
        self.field(key).to_lowercase()
    }
}

/// The posts every fresh repository starts with.
pub fn seed_posts() -> Vec<Post> {
    vec![
        Post::new(1, "First post", "This is the first post."),
        Post::new(2, "Second post", "This is the second post."),
    ]
}

/// Validated input for creating a post.
///
/// The payload must be a JSON object with non-empty string `title` and
/// `content`. An `id` key is tolerated and discarded, since the repository
/// always assigns its own. Any other key rejects the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

impl NewPost {
    pub fn from_payload(payload: &Value) -> RepositoryResult<NewPost> {
        let object = payload.as_object().ok_or(RepositoryError::Validation)?;

        if object
            .keys()
            .any(|key| !matches!(key.as_str(), "title" | "content" | "id"))
        {
            return Err(RepositoryError::Validation);
        }

        match (
            non_empty_str(object.get("title")),
            non_empty_str(object.get("content")),
        ) {
            (Some(title), Some(content)) => Ok(NewPost {
                title: title.to_string(),
                content: content.to_string(),
            }),
            _ => Err(RepositoryError::Validation),
        }
    }

    pub fn into_post(self, id: u64) -> Post {
        Post {
            id,
            title: self.title,
            content: self.content,
        }
    }
}

/// Fields to overwrite on update. Only present, non-empty strings count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PostPatch {
    pub fn from_payload(payload: &Value) -> RepositoryResult<PostPatch> {
        let object = payload.as_object().ok_or(RepositoryError::Validation)?;
        Ok(PostPatch {
            title: non_empty_str(object.get("title")).map(str::to_string),
            content: non_empty_str(object.get("content")).map(str::to_string),
        })
    }

    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Content,
}

impl FromStr for SortKey {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortKey::Title),
            "content" => Ok(SortKey::Content),
            _ => Err(RepositoryError::InvalidParameter("sort")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(RepositoryError::InvalidParameter("direction")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_post_accepts_title_and_content() {
        let new_post = NewPost::from_payload(&json!({"title": "A", "content": "B"})).unwrap();
        assert_eq!(new_post.title, "A");
        assert_eq!(new_post.content, "B");
    }

    #[test]
    fn new_post_ignores_client_id() {
        let new_post =
            NewPost::from_payload(&json!({"title": "A", "content": "B", "id": 42})).unwrap();
        assert_eq!(new_post.into_post(7).id, 7);
    }

    #[test]
    fn new_post_rejects_extra_fields() {
        let err = NewPost::from_payload(&json!({"title": "A", "content": "B", "extra": "x"}))
            .unwrap_err();
        assert_eq!(err, RepositoryError::Validation);
    }

    #[test]
    fn new_post_rejects_missing_or_empty_fields() {
        for payload in [
            json!({"title": "A"}),
            json!({"content": "B"}),
            json!({"title": "", "content": "B"}),
            json!({"title": "A", "content": ""}),
            json!({"title": 1, "content": "B"}),
            json!(["title", "content"]),
            json!(null),
        ] {
            assert_eq!(
                NewPost::from_payload(&payload),
                Err(RepositoryError::Validation),
                "payload {} should be rejected",
                payload
            );
        }
    }

    #[test]
    fn patch_skips_absent_and_empty_fields() {
        let patch =
            PostPatch::from_payload(&json!({"title": "", "content": "new", "extra": 1})).unwrap();
        assert_eq!(patch.title, None);
        assert_eq!(patch.content.as_deref(), Some("new"));

        let mut post = Post::new(1, "old title", "old content");
        patch.apply(&mut post);
        assert_eq!(post, Post::new(1, "old title", "new"));
    }

    #[test]
    fn parses_sort_parameters() {
        assert_eq!("title".parse::<SortKey>(), Ok(SortKey::Title));
        assert_eq!("content".parse::<SortKey>(), Ok(SortKey::Content));
        assert_eq!(
            "Title".parse::<SortKey>(),
            Err(RepositoryError::InvalidParameter("sort"))
        );
        assert_eq!("desc".parse::<Direction>(), Ok(Direction::Desc));
        assert_eq!(
            "down".parse::<Direction>(),
            Err(RepositoryError::InvalidParameter("direction"))
        );
    }

    #[test]
    fn post_serializes_with_exactly_three_fields() {
        let value = serde_json::to_value(Post::new(3, "A", "B")).unwrap();
        assert_eq!(value, json!({"id": 3, "title": "A", "content": "B"}));
    }
}
