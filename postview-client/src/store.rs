use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{
    api::{Branch, GroupingMode, Post, PostId, Tree},
    PostCollection,
};

/// Snapshot of everything the post tree view needs
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PostTreeState {
    pub posts: Arc<PostCollection>,
    pub tree: Arc<Tree>,
    pub grouped_by: GroupingMode,
}

impl PostTreeState {
    pub fn initial() -> PostTreeState {
        PostTreeState {
            posts: Arc::new(PostCollection::new()),
            tree: Arc::new(Tree::new()),
            grouped_by: GroupingMode::default(),
        }
    }

    pub fn post(&self, id: &PostId) -> Option<&Post> {
        self.posts.get(id)
    }

    /// Posts of `branch`, in branch order
    ///
    /// Ids that are not in the collection are skipped.
    pub fn branch_posts<'a>(&'a self, branch: &'a Branch) -> impl 'a + Iterator<Item = &'a Post> {
        branch.post_ids.iter().filter_map(|id| self.posts.get(id))
    }

    pub(crate) fn apply(&mut self, action: Action) {
        match action {
            Action::SetPosts(posts) => self.posts = Arc::new(posts),
            Action::SetTree(tree) => self.tree = Arc::new(tree),
            Action::SetGroupedBy(mode) => self.grouped_by = mode,
            Action::SetPostAuthor { id, author } => self.patch_post(id, |p| p.author = author),
            Action::SetPostLocation { id, location } => {
                self.patch_post(id, |p| p.location = location)
            }
            Action::SetPostOpen { id, open } => self.patch_post(id, |p| p.open = open),
        }
    }

    fn patch_post(&mut self, id: PostId, patch: impl FnOnce(&mut Post)) {
        if !self.posts.contains_key(&id) {
            tracing::warn!(post = %id, "ignoring patch of a post that is not in the store");
            return;
        }
        if let Some(p) = Arc::make_mut(&mut self.posts).get_mut(&id) {
            patch(p);
        }
    }
}

impl Default for PostTreeState {
    fn default() -> PostTreeState {
        PostTreeState::initial()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    SetPosts(PostCollection),
    SetTree(Tree),
    SetGroupedBy(GroupingMode),
    SetPostAuthor { id: PostId, author: String },
    SetPostLocation { id: PostId, location: String },
    SetPostOpen { id: PostId, open: bool },
}

struct StoreInner {
    state: Arc<PostTreeState>,
    feeds: Vec<mpsc::UnboundedSender<Arc<PostTreeState>>>,
}

impl StoreInner {
    fn replace(&mut self, state: PostTreeState) {
        let state = Arc::new(state);
        self.state = state.clone();
        self.feeds.retain(|f| f.send(state.clone()).is_ok());
    }
}

/// Holds the current [`PostTreeState`]
///
/// Updates never modify a published snapshot: they build the next one and
/// swap it in, so readers always see a consistent state. Every update is
/// relayed to the subscribers.
pub struct Store(Mutex<StoreInner>);

impl Store {
    pub fn new() -> Store {
        Store(Mutex::new(StoreInner {
            state: Arc::new(PostTreeState::initial()),
            feeds: Vec::new(),
        }))
    }

    pub fn get_state(&self) -> Arc<PostTreeState> {
        self.0.lock().state.clone()
    }

    /// Applies all `actions` as a single update
    pub fn apply(&self, actions: impl IntoIterator<Item = Action>) {
        let mut inner = self.0.lock();
        let mut state = PostTreeState::clone(&inner.state);
        for a in actions {
            state.apply(a);
        }
        inner.replace(state);
    }

    pub fn dispatch(&self, action: Action) {
        self.apply([action])
    }

    /// Receives every state published after this call
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<PostTreeState>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.0.lock().feeds.push(sender);
        receiver
    }

    /// Forgets everything that happened since the store was created
    pub fn destroy_session(&self) {
        self.0.lock().replace(PostTreeState::initial());
    }
}

impl Default for Store {
    fn default() -> Store {
        Store::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::tests::{collection, post};

    fn loaded_store() -> Store {
        let store = Store::new();
        store.dispatch(Action::SetPosts(collection(vec![
            post(1, 100, "Alice", "Paris"),
            post(2, 200, "Bob", "Oslo"),
        ])));
        store
    }

    #[test]
    fn starts_empty() {
        let state = Store::new().get_state();
        assert!(state.posts.is_empty());
        assert!(state.tree.is_empty());
        assert_eq!(state.grouped_by, GroupingMode::Week);
    }

    #[test]
    fn patches_only_the_targeted_post() {
        let store = loaded_store();
        store.dispatch(Action::SetPostLocation {
            id: PostId(1),
            location: String::from("Rome"),
        });
        store.dispatch(Action::SetPostAuthor {
            id: PostId(1),
            author: String::from("Carol"),
        });
        store.dispatch(Action::SetPostOpen {
            id: PostId(2),
            open: true,
        });
        let state = store.get_state();
        let p1 = state.post(&PostId(1)).unwrap();
        assert_eq!((&p1.author as &str, &p1.location as &str, p1.open), ("Carol", "Rome", false));
        let p2 = state.post(&PostId(2)).unwrap();
        assert_eq!((&p2.author as &str, &p2.location as &str, p2.open), ("Bob", "Oslo", true));
    }

    #[test]
    fn patching_unknown_post_is_ignored() {
        let store = loaded_store();
        let before = store.get_state();
        store.dispatch(Action::SetPostAuthor {
            id: PostId(42),
            author: String::from("Nobody"),
        });
        assert_eq!(*store.get_state(), *before);
    }

    #[test]
    fn published_snapshots_are_never_modified() {
        let store = loaded_store();
        let before = store.get_state();
        store.dispatch(Action::SetPostOpen {
            id: PostId(1),
            open: true,
        });
        assert!(!before.post(&PostId(1)).unwrap().open);
        assert!(store.get_state().post(&PostId(1)).unwrap().open);
    }

    #[test]
    fn subscribers_see_one_update_per_apply() {
        let store = loaded_store();
        let mut feed = store.subscribe();
        store.apply([
            Action::SetGroupedBy(GroupingMode::Location),
            Action::SetTree(vec![Branch::new("Oslo", vec![PostId(2)])]),
        ]);
        let state = feed.try_recv().unwrap();
        assert_eq!(state.grouped_by, GroupingMode::Location);
        assert_eq!(state.tree.len(), 1);
        assert!(feed.try_recv().is_err());
    }

    #[test]
    fn closed_subscribers_are_dropped() {
        let store = Store::new();
        let feed = store.subscribe();
        drop(feed);
        store.dispatch(Action::SetGroupedBy(GroupingMode::Author));
        assert!(store.0.lock().feeds.is_empty());
    }

    #[test]
    fn destroy_session_resets_state() {
        let store = loaded_store();
        store.dispatch(Action::SetGroupedBy(GroupingMode::Author));
        let mut feed = store.subscribe();
        store.destroy_session();
        assert_eq!(*store.get_state(), PostTreeState::initial());
        assert_eq!(*feed.try_recv().unwrap(), PostTreeState::initial());
    }

    #[test]
    fn branch_posts_follow_branch_order() {
        let store = loaded_store();
        let state = store.get_state();
        let branch = Branch::new("all", vec![PostId(2), PostId(7), PostId(1)]);
        let ids = state.branch_posts(&branch).map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![PostId(2), PostId(1)]);
    }
}
