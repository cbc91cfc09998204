mod error;
pub use error::Error;

mod post;
pub use post::{Post, PostId, PostsResponse, RawPost, RawTime, Time, POSTS_RETRIEVED_MESSAGE};

mod tree;
pub use tree::{Branch, GroupingMode, SortOrder, Tree};
