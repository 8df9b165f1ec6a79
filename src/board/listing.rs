use serde::{Deserialize, Serialize};

use crate::db::models::Post;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Newest first
    #[default]
    Latest,
    /// Most liked first; ties keep their current order
    Likes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoardQuery {
    /// Category name; `None` or `"all"` shows every post
    pub category: Option<String>,
    pub sort: SortOrder,
    /// 1-based
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPage {
    pub posts: Vec<Post>,
    pub page: usize,
    pub total_pages: usize,
    pub total_posts: usize,
}

/// Filter, sort and slice one page of the board.
pub fn board_page(mut posts: Vec<Post>, query: &BoardQuery, per_page: usize) -> BoardPage {
    let per_page = per_page.max(1);

    if let Some(category) = query.category.as_deref().filter(|c| *c != "all") {
        posts.retain(|p| p.category == category);
    }

    match query.sort {
        SortOrder::Latest => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Likes => posts.sort_by(|a, b| b.likes.cmp(&a.likes)),
    }

    let total_posts = posts.len();
    let total_pages = total_posts.div_ceil(per_page).max(1);
    let page = query.page.unwrap_or(1).max(1);

    let posts = posts
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    BoardPage {
        posts,
        page,
        total_pages,
        total_posts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn post(id: i64, category: &str, likes: u32, minutes: i64) -> Post {
        Post {
            id,
            category: category.into(),
            title: format!("post {}", id),
            content: String::new(),
            author: "kim".into(),
            author_id: 1,
            likes,
            liked_by: (0..likes as i64).collect(),
            comments: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
            updated_at: None,
        }
    }

    fn ids(page: &BoardPage) -> Vec<i64> {
        page.posts.iter().map(|p| p.id).collect()
    }

    #[test]
    fn latest_sorts_by_creation_time() {
        let posts = vec![post(1, "a", 0, 5), post(2, "a", 0, 10), post(3, "a", 0, 1)];
        let page = board_page(posts, &BoardQuery::default(), 5);
        assert_eq!(ids(&page), vec![2, 1, 3]);
    }

    #[test]
    fn likes_sort_is_stable() {
        let posts = vec![post(1, "a", 1, 0), post(2, "a", 3, 0), post(3, "a", 1, 0)];
        let query = BoardQuery {
            sort: SortOrder::Likes,
            ..BoardQuery::default()
        };
        assert_eq!(ids(&board_page(posts, &query, 5)), vec![2, 1, 3]);
    }

    #[test]
    fn category_filter_and_all() {
        let posts = vec![post(1, "a", 0, 1), post(2, "b", 0, 2)];

        let only_b = BoardQuery {
            category: Some("b".into()),
            ..BoardQuery::default()
        };
        assert_eq!(ids(&board_page(posts.clone(), &only_b, 5)), vec![2]);

        let all = BoardQuery {
            category: Some("all".into()),
            ..BoardQuery::default()
        };
        assert_eq!(board_page(posts, &all, 5).total_posts, 2);
    }

    #[test]
    fn pagination_slices_pages() {
        let posts: Vec<Post> = (1..=12).map(|i| post(i, "a", 0, i)).collect();

        let second = BoardQuery {
            page: Some(2),
            ..BoardQuery::default()
        };
        let page = board_page(posts.clone(), &second, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_posts, 12);
        assert_eq!(ids(&page), vec![7, 6, 5, 4, 3]);

        let past_end = BoardQuery {
            page: Some(9),
            ..BoardQuery::default()
        };
        assert!(board_page(posts, &past_end, 5).posts.is_empty());
    }

    #[test]
    fn empty_board_has_one_page() {
        let page = board_page(Vec::new(), &BoardQuery::default(), 5);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn query_deserializes_from_query_string_shape() {
        let query: BoardQuery =
            serde_json::from_value(serde_json::json!({"sort": "likes", "page": 2})).unwrap();
        assert_eq!(query.sort, SortOrder::Likes);
        assert_eq!(query.page, Some(2));
        assert!(query.category.is_none());
    }
}
