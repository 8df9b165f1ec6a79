use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::db::models::{Category, Id};
use crate::ids::IdClock;
use crate::storage::{Repository, RepositoryError, Snapshot};

/// Seeded on first run, in rank order.
pub const DEFAULT_CATEGORIES: [&str; 2] = ["Free Board", "Q&A"];

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Category name is required")]
    BlankName,

    #[error("Category \"{0}\" already exists")]
    DuplicateName(String),

    #[error("Category {0} not found")]
    NotFound(Id),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl CategoryError {
    /// Errors the caller should render as inline form feedback.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::BlankName | Self::DuplicateName(_))
    }
}

struct Inner {
    categories: Vec<Category>,
    last_error: Option<String>,
}

/// Ordered category list; ranks are always exactly 1..=N.
pub struct CategoryStore {
    inner: Mutex<Inner>,
    repo: Repository<Vec<Category>>,
    ids: Arc<IdClock>,
}

impl CategoryStore {
    pub async fn open(
        repo: Repository<Vec<Category>>,
        ids: Arc<IdClock>,
    ) -> Result<Self, RepositoryError> {
        let categories = match repo.load_snapshot().await? {
            Snapshot::Found(mut categories) if !categories.is_empty() => {
                categories.sort_by_key(|c| c.order);
                if !has_dense_ranks(&categories) {
                    tracing::warn!("Category ranks were not contiguous, renumbering");
                    renumber(&mut categories);
                    repo.save(&categories).await?;
                }
                if let Some(max) = categories.iter().map(|c| c.id).max() {
                    ids.observe(max);
                }
                categories
            }
            Snapshot::Found(_) | Snapshot::Missing => {
                let defaults = default_categories();
                repo.save(&defaults).await?;
                defaults
            }
            Snapshot::Corrupt(reason) => {
                tracing::warn!("Unreadable category snapshot, restoring defaults: {}", reason);
                let defaults = default_categories();
                repo.save(&defaults).await?;
                defaults
            }
        };

        tracing::info!("Loaded {} categories", categories.len());

        Ok(Self {
            inner: Mutex::new(Inner {
                categories,
                last_error: None,
            }),
            repo,
            ids,
        })
    }

    /// Categories sorted by rank.
    pub async fn list(&self) -> Vec<Category> {
        self.inner.lock().await.categories.clone()
    }

    pub async fn get(&self, id: Id) -> Option<Category> {
        self.inner
            .lock()
            .await
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Most recent validation message, kept until [`CategoryStore::reset_error`].
    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    pub async fn reset_error(&self) {
        self.inner.lock().await.last_error = None;
    }

    pub async fn create(&self, name: &str) -> Result<Category, CategoryError> {
        let mut inner = self.inner.lock().await;
        let name = validate_name(&mut inner, name, None)?;

        let category = Category {
            id: self.ids.next_id(),
            name,
            order: inner.categories.len() as u32 + 1,
        };
        let mut next = inner.categories.clone();
        next.push(category.clone());

        self.repo.save(&next).await?;
        inner.categories = next;
        tracing::info!(id = category.id, "Created category {}", category.name);
        Ok(category)
    }

    /// Rename. Posts keep the old name; nothing cascades.
    pub async fn update(&self, id: Id, name: &str) -> Result<Category, CategoryError> {
        let mut inner = self.inner.lock().await;
        let name = validate_name(&mut inner, name, Some(id))?;

        let mut next = inner.categories.clone();
        let category = next
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CategoryError::NotFound(id))?;
        category.name = name;
        let updated = category.clone();

        self.repo.save(&next).await?;
        inner.categories = next;
        tracing::info!(id, "Renamed category to {}", updated.name);
        Ok(updated)
    }

    /// Remove a category and close the gap in the ranks.
    pub async fn delete(&self, id: Id) -> Result<Category, CategoryError> {
        let mut inner = self.inner.lock().await;

        let pos = position(&inner.categories, id)?;
        let mut next = inner.categories.clone();
        let removed = next.remove(pos);
        renumber(&mut next);

        self.repo.save(&next).await?;
        inner.categories = next;
        tracing::info!(id, "Deleted category {}", removed.name);
        Ok(removed)
    }

    /// Move a category so it lands at `target_rank`, shifting the others.
    ///
    /// The rank is not clamped. Like an array splice, an index past the end
    /// appends and a negative index counts back from the end of the list that
    /// remains after the category is taken out.
    pub async fn reorder(&self, id: Id, target_rank: i64) -> Result<Category, CategoryError> {
        let mut inner = self.inner.lock().await;

        let pos = position(&inner.categories, id)?;
        let mut next = inner.categories.clone();
        let moved = next.remove(pos);
        let index = splice_index(target_rank.saturating_sub(1), next.len());
        next.insert(index, moved);
        renumber(&mut next);
        let moved = next[index].clone();

        self.repo.save(&next).await?;
        inner.categories = next;
        tracing::debug!(id, rank = moved.order, "Reordered category");
        Ok(moved)
    }
}

fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES
        .iter()
        .enumerate()
        .map(|(i, name)| Category {
            id: i as Id + 1,
            name: name.to_string(),
            order: i as u32 + 1,
        })
        .collect()
}

fn validate_name(inner: &mut Inner, name: &str, exclude: Option<Id>) -> Result<String, CategoryError> {
    let trimmed = name.trim();
    let result = if trimmed.is_empty() {
        Err(CategoryError::BlankName)
    } else if inner
        .categories
        .iter()
        .any(|c| c.name == trimmed && Some(c.id) != exclude)
    {
        Err(CategoryError::DuplicateName(trimmed.to_string()))
    } else {
        Ok(trimmed.to_string())
    };

    if let Err(e) = &result {
        inner.last_error = Some(e.to_string());
    }
    result
}

fn position(categories: &[Category], id: Id) -> Result<usize, CategoryError> {
    categories
        .iter()
        .position(|c| c.id == id)
        .ok_or(CategoryError::NotFound(id))
}

fn renumber(categories: &mut [Category]) {
    for (i, category) in categories.iter_mut().enumerate() {
        category.order = i as u32 + 1;
    }
}

fn has_dense_ranks(categories: &[Category]) -> bool {
    categories
        .iter()
        .enumerate()
        .all(|(i, c)| c.order == i as u32 + 1)
}

fn splice_index(start: i64, len: usize) -> usize {
    let len = len as i64;
    if start < 0 {
        len.saturating_add(start).max(0) as usize
    } else {
        start.min(len) as usize
    }
}
