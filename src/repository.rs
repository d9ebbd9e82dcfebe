use serde_json::Value;

use crate::error::{RepositoryError, RepositoryResult};
use crate::model::{seed_posts, Direction, NewPost, Post, PostPatch, SortKey};

/// In-memory post collection, kept in insertion order.
#[derive(Clone, Debug, Default)]
pub struct PostRepository {
    posts: Vec<Post>,
}

impl PostRepository {
    pub fn new() -> PostRepository {
        PostRepository { posts: vec![] }
    }

    pub fn seeded() -> PostRepository {
        PostRepository { posts: seed_posts() }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// One past the largest id in the collection; 1 when empty.
    fn next_id(&self) -> u64 {
        self.posts.iter().map(|post| post.id).max().unwrap_or(0) + 1
    }

    /// Validates `payload` and appends the resulting post with a fresh id.
    pub fn create(&mut self, payload: &Value) -> RepositoryResult<Post> {
        let post = NewPost::from_payload(payload)?.into_post(self.next_id());
        self.posts.push(post.clone());
        Ok(post)
    }

    /// Lists posts, optionally sorted case-insensitively by `sort`.
    ///
    /// `sort` is checked before `direction`. A `direction` without `sort`
    /// is still validated but leaves insertion order untouched. Descending
    /// order is the exact reverse of the stable ascending order.
    pub fn list(&self, sort: Option<&str>, direction: Option<&str>) -> RepositoryResult<Vec<Post>> {
        let sort = sort.map(str::parse::<SortKey>).transpose()?;
        let direction = direction
            .map(str::parse::<Direction>)
            .transpose()?
            .unwrap_or_default();

        let mut posts = self.posts.clone();
        if let Some(key) = sort {
            posts.sort_by_cached_key(|post| post.sort_value(key));
            if direction == Direction::Desc {
                posts.reverse();
            }
        }
        Ok(posts)
    }

    pub fn get(&self, id: u64) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    /// Overwrites `title` and/or `content` with the non-empty strings in `payload`.
    pub fn update(&mut self, id: u64, payload: &Value) -> RepositoryResult<Post> {
        let post = self
            .posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepositoryError::NotFound(id))?;
        PostPatch::from_payload(payload)?.apply(post);
        Ok(post.clone())
    }

    /// Removes the post with `id` and returns it.
    pub fn delete(&mut self, id: u64) -> RepositoryResult<Post> {
        let index = self
            .posts
            .iter()
            .position(|post| post.id == id)
            .ok_or(RepositoryError::NotFound(id))?;
        Ok(self.posts.remove(index))
    }

    /// Case-sensitive substring search. Both filters must match when both
    /// are given; with no (non-empty) filter the result is empty.
    pub fn search(&self, title: Option<&str>, content: Option<&str>) -> Vec<Post> {
        let title = title.filter(|t| !t.is_empty());
        let content = content.filter(|c| !c.is_empty());
        if title.is_none() && content.is_none() {
            return vec![];
        }

        self.posts
            .iter()
            .filter(|post| title.map_or(true, |t| post.title.contains(t)))
            .filter(|post| content.map_or(true, |c| post.content.contains(c)))
            .cloned()
            .collect()
    }
}
