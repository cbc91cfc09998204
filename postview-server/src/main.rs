use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

mod error;
mod fuzz;
mod handlers;

pub use error::Error;

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON file holding the array of posts to serve
    #[structopt(long, parse(from_os_str))]
    posts_file: PathBuf,

    #[structopt(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
}

#[derive(Clone)]
pub struct AppState {
    /// Read again on every request, so edits show up without a restart
    posts_file: Arc<PathBuf>,
}

pub fn app(posts_file: PathBuf) -> Router {
    Router::new()
        .route("/api/posts", get(handlers::get_posts))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            posts_file: Arc::new(posts_file),
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let posts = handlers::read_posts(&opt.posts_file).await?;
    tracing::info!(num_posts = posts.len(), file = ?opt.posts_file, "posts file is valid");

    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app(opt.posts_file).into_make_service())
        .await
        .context("serving axum webserver")
}
