use std::path::Path;

use anyhow::Context;
use axum::{extract::State, http::Uri, Json};
use postview_api::{PostsResponse, RawPost, POSTS_RETRIEVED_MESSAGE};

use crate::{AppState, Error};

pub async fn read_posts(file: &Path) -> anyhow::Result<Vec<RawPost>> {
    let contents = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading posts file {file:?}"))?;
    serde_json::from_slice(&contents).with_context(|| format!("parsing posts file {file:?}"))
}

pub async fn get_posts(State(state): State<AppState>) -> Result<Json<PostsResponse>, Error> {
    let data = read_posts(&state.posts_file).await?;
    tracing::info!(num_posts = data.len(), "{POSTS_RETRIEVED_MESSAGE}");
    Ok(Json(PostsResponse {
        messages: vec![String::from(POSTS_RETRIEVED_MESSAGE)],
        data,
    }))
}

pub async fn not_found(uri: Uri) -> Error {
    Error::not_found(uri.path())
}
