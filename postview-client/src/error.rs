use crate::api::PostId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed fetching posts: {0:#}")]
    FetchFailure(#[source] anyhow::Error),

    #[error("Post {0} does not exist")]
    NotFound(PostId),

    #[error("Posts have not been loaded yet")]
    NotReady,
}
