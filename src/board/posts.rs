use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::db::models::{Comment, Id, Post};
use crate::ids::IdClock;
use crate::storage::{Repository, RepositoryError, Snapshot};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("{0}")]
    Invalid(String),

    #[error("Post {0} not found")]
    NotFound(Id),

    #[error("Comment {comment_id} not found on post {post_id}")]
    CommentNotFound { post_id: Id, comment_id: Id },

    #[error("Sign in to like posts")]
    NoActiveUser,

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[serde(default)]
    pub category: Option<String>,
    pub title: String,
    pub content: String,
    pub author: String,
    pub author_id: Id,
}

/// Shallow patch; `None` keeps the current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub category: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub author: String,
    pub author_id: Id,
    pub content: String,
}

/// All posts, newest first, each owning its comments and like-set.
pub struct PostStore {
    posts: Mutex<Vec<Post>>,
    repo: Repository<Vec<Post>>,
    ids: Arc<IdClock>,
    default_category: String,
}

impl PostStore {
    pub async fn open(
        repo: Repository<Vec<Post>>,
        ids: Arc<IdClock>,
        default_category: impl Into<String>,
    ) -> Result<Self, RepositoryError> {
        let default_category = default_category.into();

        let posts = match repo.load_snapshot().await? {
            Snapshot::Found(mut posts) => {
                let repaired = posts
                    .iter_mut()
                    .map(repair_likes)
                    .filter(|changed| *changed)
                    .count();
                if repaired > 0 {
                    tracing::warn!("Repaired like counts on {} posts", repaired);
                }
                if let Some(max) = max_id(&posts) {
                    ids.observe(max);
                }
                posts
            }
            Snapshot::Missing => vec![welcome_post(&default_category)],
            Snapshot::Corrupt(reason) => {
                tracing::warn!("Unreadable post snapshot, starting from sample data: {}", reason);
                vec![welcome_post(&default_category)]
            }
        };

        tracing::info!("Loaded {} posts", posts.len());

        Ok(Self {
            posts: Mutex::new(posts),
            repo,
            ids,
            default_category,
        })
    }

    pub async fn all(&self) -> Vec<Post> {
        self.posts.lock().await.clone()
    }

    pub async fn get(&self, id: Id) -> Option<Post> {
        self.posts.lock().await.iter().find(|p| p.id == id).cloned()
    }

    /// Store a new post. Id and timestamp are always assigned here.
    pub async fn create(&self, data: NewPost) -> Result<Post, PostError> {
        let title = non_blank("Title", &data.title)?;
        let content = non_blank("Content", &data.content)?;
        let category = data
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.default_category.as_str())
            .to_string();

        let post = Post {
            id: self.ids.next_id(),
            category,
            title,
            content,
            author: data.author,
            author_id: data.author_id,
            likes: 0,
            liked_by: Vec::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        };

        let created = self
            .mutate(|posts| {
                posts.insert(0, post.clone());
                Ok(post)
            })
            .await?;
        tracing::info!(id = created.id, author_id = created.author_id, "Created post");
        Ok(created)
    }

    pub async fn update(&self, id: Id, data: PostUpdate) -> Result<Post, PostError> {
        let category = data
            .category
            .as_deref()
            .map(|c| non_blank("Category", c))
            .transpose()?;
        let title = data.title.as_deref().map(|t| non_blank("Title", t)).transpose()?;
        let content = data
            .content
            .as_deref()
            .map(|c| non_blank("Content", c))
            .transpose()?;

        self.mutate(|posts| {
            let post = find_mut(posts, id)?;
            if let Some(category) = category {
                post.category = category;
            }
            if let Some(title) = title {
                post.title = title;
            }
            if let Some(content) = content {
                post.content = content;
            }
            post.updated_at = Some(Utc::now());
            Ok(post.clone())
        })
        .await
    }

    pub async fn delete(&self, id: Id) -> Result<Post, PostError> {
        let removed = self
            .mutate(|posts| {
                let pos = posts
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or(PostError::NotFound(id))?;
                Ok(posts.remove(pos))
            })
            .await?;
        tracing::info!(id, "Deleted post");
        Ok(removed)
    }

    /// Flip `user_id`'s like. Count and like-set change together.
    pub async fn toggle_like(&self, post_id: Id, user_id: Option<Id>) -> Result<Post, PostError> {
        let user_id = user_id.ok_or(PostError::NoActiveUser)?;

        self.mutate(|posts| {
            let post = find_mut(posts, post_id)?;
            match post.liked_by.iter().position(|&u| u == user_id) {
                Some(i) => {
                    post.liked_by.remove(i);
                    post.likes = post.likes.saturating_sub(1);
                }
                None => {
                    post.liked_by.push(user_id);
                    post.likes += 1;
                }
            }
            debug_assert_eq!(post.likes as usize, post.liked_by.len());
            Ok(post.clone())
        })
        .await
    }

    pub async fn has_liked(&self, post_id: Id, user_id: Id) -> bool {
        self.posts
            .lock()
            .await
            .iter()
            .find(|p| p.id == post_id)
            .is_some_and(|p| p.is_liked_by(user_id))
    }

    /// Append a comment; insertion order is display order.
    pub async fn add_comment(&self, post_id: Id, data: NewComment) -> Result<Comment, PostError> {
        let content = non_blank("Comment", &data.content)?;
        let comment = Comment {
            id: self.ids.next_id(),
            author: data.author,
            author_id: data.author_id,
            content,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.mutate(|posts| {
            find_mut(posts, post_id)?.comments.push(comment.clone());
            Ok(comment)
        })
        .await
    }

    pub async fn update_comment(
        &self,
        post_id: Id,
        comment_id: Id,
        text: &str,
    ) -> Result<Comment, PostError> {
        let content = non_blank("Comment", text)?;

        self.mutate(|posts| {
            let comment = find_mut(posts, post_id)?
                .comments
                .iter_mut()
                .find(|c| c.id == comment_id)
                .ok_or(PostError::CommentNotFound {
                    post_id,
                    comment_id,
                })?;
            comment.content = content;
            comment.updated_at = Some(Utc::now());
            Ok(comment.clone())
        })
        .await
    }

    pub async fn delete_comment(&self, post_id: Id, comment_id: Id) -> Result<Comment, PostError> {
        self.mutate(|posts| {
            let comments = &mut find_mut(posts, post_id)?.comments;
            let pos = comments
                .iter()
                .position(|c| c.id == comment_id)
                .ok_or(PostError::CommentNotFound {
                    post_id,
                    comment_id,
                })?;
            Ok(comments.remove(pos))
        })
        .await
    }

    pub async fn posts_by_author(&self, user_id: Id) -> Vec<Post> {
        self.posts
            .lock()
            .await
            .iter()
            .filter(|p| p.author_id == user_id)
            .cloned()
            .collect()
    }

    /// Case-insensitive substring match on title, content or author name.
    pub async fn search(&self, query: &str) -> Vec<Post> {
        let needle = query.to_lowercase();
        self.posts
            .lock()
            .await
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.content.to_lowercase().contains(&needle)
                    || p.author.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Apply `f` to a copy of the collection, persist it, then publish it.
    /// The lock is held throughout so read-modify-write is atomic.
    async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Vec<Post>) -> Result<R, PostError>,
    ) -> Result<R, PostError> {
        let mut posts = self.posts.lock().await;
        let mut next = posts.clone();
        let result = f(&mut next)?;
        self.repo.save(&next).await?;
        *posts = next;
        Ok(result)
    }
}

fn find_mut(posts: &mut [Post], id: Id) -> Result<&mut Post, PostError> {
    posts
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(PostError::NotFound(id))
}

fn non_blank(field: &str, value: &str) -> Result<String, PostError> {
    if value.trim().is_empty() {
        Err(PostError::Invalid(format!("{} is required", field)))
    } else {
        Ok(value.to_string())
    }
}

/// Drop duplicate likers and make the counter agree with the set.
/// Returns whether anything changed.
fn repair_likes(post: &mut Post) -> bool {
    let before = (post.likes, post.liked_by.len());
    let mut seen = Vec::with_capacity(post.liked_by.len());
    post.liked_by.retain(|id| {
        if seen.contains(id) {
            false
        } else {
            seen.push(*id);
            true
        }
    });
    post.likes = post.liked_by.len() as u32;
    before != (post.likes, post.liked_by.len())
}

fn max_id(posts: &[Post]) -> Option<Id> {
    posts
        .iter()
        .flat_map(|p| std::iter::once(p.id).chain(p.comments.iter().map(|c| c.id)))
        .max()
}

fn welcome_post(category: &str) -> Post {
    Post {
        id: 1,
        category: category.to_string(),
        title: "Welcome to the board".to_string(),
        content: "Introduce yourself, ask questions and share what you are working on."
            .to_string(),
        author: "admin".to_string(),
        author_id: 1,
        likes: 0,
        liked_by: Vec::new(),
        comments: Vec::new(),
        created_at: Utc::now(),
        updated_at: None,
    }
}
