use std::sync::Arc;

use anyhow::Context;
use chrono::Local;

use crate::{
    api::{GroupingMode, Post, PostId, SortOrder, Tree},
    build_tree, week_branch_key, Action, ClientConfig, Error, PostCollection, PostSource,
    PostTreeState, Store,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Uninitialized,
    Loading,
    Ready,
}

/// Keeps the tree of the store in sync with its posts
///
/// This is the only thing that should write the tree and grouping mode of
/// the store. Every change that could move a post to another branch is
/// followed by a full rebuild of the tree.
pub struct TreeCoordinator<S> {
    store: Arc<Store>,
    source: S,
    timezone: Option<chrono_tz::Tz>,
    status: Status,
}

impl<S: PostSource> TreeCoordinator<S> {
    pub fn new(store: Arc<Store>, source: S, config: &ClientConfig) -> TreeCoordinator<S> {
        TreeCoordinator {
            store,
            source,
            timezone: config.timezone,
            status: Status::Uninitialized,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Fetches all posts and replaces the ones in the store
    ///
    /// On failure, or if the returned future is dropped before completion,
    /// the store is left untouched.
    pub async fn load_posts(&mut self) -> Result<(), Error> {
        let previous = match self.status {
            Status::Ready => Status::Ready,
            _ => Status::Uninitialized,
        };
        let fetched = {
            let _loading = LoadingGuard::new(&mut self.status, previous);
            fetch(&self.source).await
        };
        let posts = match fetched {
            Ok(posts) => posts,
            Err(err) => {
                tracing::warn!(?err, "failed loading posts");
                return Err(Error::FetchFailure(err));
            }
        };
        tracing::info!(num_posts = posts.len(), "loaded posts");
        let mode = self.store.get_state().grouped_by;
        let tree = self.build(&posts, mode);
        self.store.apply([
            Action::SetPosts(posts),
            Action::SetGroupedBy(mode),
            Action::SetTree(tree),
        ]);
        self.status = Status::Ready;
        Ok(())
    }

    pub fn set_grouping_mode(&mut self, mode: GroupingMode) -> Result<(), Error> {
        self.check_ready()?;
        let tree = self.build(&self.store.get_state().posts, mode);
        tracing::debug!(%mode, num_branches = tree.len(), "regrouped posts");
        self.store
            .apply([Action::SetGroupedBy(mode), Action::SetTree(tree)]);
        Ok(())
    }

    pub fn set_post_author(&mut self, id: PostId, author: impl Into<String>) -> Result<(), Error> {
        self.check_post(id)?;
        self.rebuild_tree(Action::SetPostAuthor {
            id,
            author: author.into(),
        });
        Ok(())
    }

    pub fn set_post_location(
        &mut self,
        id: PostId,
        location: impl Into<String>,
    ) -> Result<(), Error> {
        self.check_post(id)?;
        self.rebuild_tree(Action::SetPostLocation {
            id,
            location: location.into(),
        });
        Ok(())
    }

    /// Opening or closing a post never moves it, so the tree is kept as-is
    pub fn set_post_open(&mut self, id: PostId, open: bool) -> Result<(), Error> {
        self.check_post(id)?;
        self.store.dispatch(Action::SetPostOpen { id, open });
        Ok(())
    }

    pub fn open_post(&mut self, id: PostId) -> Result<(), Error> {
        self.set_post_open(id, true)
    }

    pub fn close_post(&mut self, id: PostId) -> Result<(), Error> {
        self.set_post_open(id, false)
    }

    /// Publishes `patch` along with the tree of the patched posts
    fn rebuild_tree(&mut self, patch: Action) {
        let mut next = PostTreeState::clone(&self.store.get_state());
        next.apply(patch.clone());
        let mode = next.grouped_by;
        let tree = self.build(&next.posts, mode);
        tracing::debug!(%mode, num_branches = tree.len(), "rebuilt tree after edit");
        self.store
            .apply([patch, Action::SetGroupedBy(mode), Action::SetTree(tree)]);
    }

    fn build(&self, posts: &PostCollection, mode: GroupingMode) -> Tree {
        match mode {
            GroupingMode::Week => {
                let key: Box<dyn Fn(&Post) -> String> = match self.timezone {
                    Some(tz) => Box::new(move |p: &Post| week_branch_key(p, &tz)),
                    None => Box::new(|p: &Post| week_branch_key(p, &Local)),
                };
                build_tree(posts, mode, SortOrder::Ascending, Some(&*key))
            }
            GroupingMode::Author | GroupingMode::Location => {
                build_tree(posts, mode, SortOrder::Descending, None)
            }
        }
    }

    fn check_ready(&self) -> Result<(), Error> {
        match self.status {
            Status::Ready => Ok(()),
            Status::Uninitialized | Status::Loading => Err(Error::NotReady),
        }
    }

    fn check_post(&self, id: PostId) -> Result<(), Error> {
        self.check_ready()?;
        match self.store.get_state().posts.contains_key(&id) {
            true => Ok(()),
            false => Err(Error::NotFound(id)),
        }
    }
}

/// Marks the coordinator as loading, and puts `previous` back when dropped
struct LoadingGuard<'a> {
    status: &'a mut Status,
    previous: Status,
}

impl<'a> LoadingGuard<'a> {
    fn new(status: &'a mut Status, previous: Status) -> LoadingGuard<'a> {
        *status = Status::Loading;
        LoadingGuard { status, previous }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        *self.status = self.previous;
    }
}

async fn fetch<S: PostSource>(source: &S) -> anyhow::Result<PostCollection> {
    let raw = source.fetch_posts().await.context("fetching raw posts")?;
    let mut posts = PostCollection::with_capacity(raw.len());
    for r in raw {
        let p = Post::from_raw(r)?;
        if let Some(dup) = posts.insert(p.id, p) {
            tracing::warn!(post = %dup.id, "duplicate post id, keeping the last one");
        }
    }
    Ok(posts)
}
