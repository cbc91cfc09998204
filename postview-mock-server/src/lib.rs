use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use postview_client::{
    api::{self, PostId, RawPost},
    PostSource,
};

/// In-memory stand-in for the posts server
pub struct MockServer(Mutex<MockDb>);

#[derive(Debug, Default)]
struct MockDb {
    posts: BTreeMap<PostId, RawPost>,
    failures: Vec<api::Error>,
    num_fetches: usize,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer(Mutex::new(MockDb::default()))
    }

    pub fn with_posts(posts: Vec<RawPost>) -> MockServer {
        let this = MockServer::new();
        for p in posts {
            this.admin_add_post(p);
        }
        this
    }

    /// Adds `post`, replacing any post with the same id
    pub fn admin_add_post(&self, post: RawPost) {
        self.0.lock().posts.insert(post.id, post);
    }

    pub fn admin_remove_post(&self, id: PostId) -> Result<RawPost, api::Error> {
        self.0
            .lock()
            .posts
            .remove(&id)
            .ok_or_else(|| api::Error::NotFound(format!("post {id}")))
    }

    /// Makes the next fetch fail with `err`
    ///
    /// Failures queue up: calling this twice makes the next two fetches fail.
    pub fn admin_fail_next_fetch(&self, err: api::Error) {
        self.0.lock().failures.push(err);
    }

    /// Return the number of fetches so far, failed ones included
    pub fn test_num_fetches(&self) -> usize {
        self.0.lock().num_fetches
    }

    /// What the posts server would answer, ordered by id
    pub fn get_posts(&self) -> Result<Vec<RawPost>, api::Error> {
        let mut db = self.0.lock();
        db.num_fetches += 1;
        if !db.failures.is_empty() {
            return Err(db.failures.remove(0));
        }
        Ok(db.posts.values().cloned().collect())
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

#[async_trait]
impl PostSource for MockServer {
    async fn fetch_posts(&self) -> anyhow::Result<Vec<RawPost>> {
        self.get_posts()
            .map_err(|err| anyhow!("server answered {}: {err}", err.status_code()))
    }
}
