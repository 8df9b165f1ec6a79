pub mod categories;
pub mod listing;
pub mod posts;
pub mod search;

pub use categories::{CategoryError, CategoryStore, DEFAULT_CATEGORIES};
pub use listing::{board_page, BoardPage, BoardQuery, SortOrder};
pub use posts::{NewComment, NewPost, PostError, PostStore, PostUpdate};
pub use search::{SearchDebouncer, SearchOutcome};
