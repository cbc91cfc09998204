use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap},
};

use chrono::{TimeZone, Utc};

use crate::{
    api::{Branch, GroupingMode, Post, PostId, SortOrder, Tree},
    week_of_year,
};

pub type PostCollection = HashMap<PostId, Post>;

/// Label of the branch `post` belongs to when grouped by `mode`
///
/// Week keys are computed in UTC here; use [`week_branch_key`] to pick
/// another timezone.
pub fn default_branch_key(mode: GroupingMode, post: &Post) -> String {
    match mode {
        GroupingMode::Week => week_branch_key(post, &Utc),
        GroupingMode::Author => post.author.clone(),
        GroupingMode::Location => post.location.clone(),
    }
}

pub fn week_branch_key<Tz: TimeZone>(post: &Post, tz: &Tz) -> String {
    match week_of_year(post.time, tz) {
        Some(w) => format!("Week {w}"),
        None => {
            tracing::warn!(post = %post.id, time = post.time, "post time is out of the calendar range");
            String::from("Week ?")
        }
    }
}

/// Groups `posts` into branches
///
/// Posts are labelled with `branch_key` if set, and with
/// [`default_branch_key`] for `mode` otherwise. Posts of a branch are
/// ordered from the most recent to the oldest, whatever `order` says.
/// Branches are sorted by key, then reversed if `order` is
/// [`SortOrder::Ascending`].
pub fn build_tree(
    posts: &PostCollection,
    mode: GroupingMode,
    order: SortOrder,
    branch_key: Option<&dyn Fn(&Post) -> String>,
) -> Tree {
    let mut groups = BTreeMap::<String, Vec<&Post>>::new();
    for p in posts.values() {
        let key = match branch_key {
            Some(f) => f(p),
            None => default_branch_key(mode, p),
        };
        groups.entry(key).or_insert_with(Vec::new).push(p);
    }
    let tree = groups.into_iter().map(|(key, mut leaves)| {
        leaves.sort_unstable_by_key(|p| (Reverse(p.time), p.id));
        Branch::new(key, leaves.into_iter().map(|p| p.id).collect())
    });
    match order {
        SortOrder::Descending => tree.collect(),
        SortOrder::Ascending => tree.rev().collect(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;

    use super::*;

    pub fn post(id: i64, time: i64, author: &str, location: &str) -> Post {
        Post {
            id: PostId(id),
            location: String::from(location),
            time,
            author: String::from(author),
            text: format!("post number {id}"),
            open: false,
        }
    }

    pub fn collection(posts: Vec<Post>) -> PostCollection {
        posts.into_iter().map(|p| (p.id, p)).collect()
    }

    fn ids(ids: &[i64]) -> Vec<PostId> {
        ids.iter().copied().map(PostId).collect()
    }

    #[test]
    fn groups_by_location() {
        let posts = collection(vec![
            post(1, 100, "x", "A"),
            post(2, 200, "y", "B"),
            post(3, 50, "z", "A"),
        ]);
        assert_eq!(
            build_tree(&posts, GroupingMode::Location, SortOrder::Descending, None),
            vec![Branch::new("A", ids(&[1, 3])), Branch::new("B", ids(&[2]))],
        );
    }

    #[test]
    fn ascending_reverses_branches_but_not_leaves() {
        let posts = collection(vec![
            post(1, 100, "x", "A"),
            post(2, 200, "y", "B"),
            post(3, 50, "z", "A"),
            post(4, 300, "z", "C"),
        ]);
        assert_eq!(
            build_tree(&posts, GroupingMode::Location, SortOrder::Ascending, None),
            vec![
                Branch::new("C", ids(&[4])),
                Branch::new("B", ids(&[2])),
                Branch::new("A", ids(&[1, 3])),
            ],
        );
    }

    #[test]
    fn groups_by_author() {
        let posts = collection(vec![
            post(1, 10, "Zoe", "A"),
            post(2, 30, "Adam", "B"),
            post(3, 20, "Adam", "C"),
            post(4, 40, "Zoe", "A"),
        ]);
        assert_eq!(
            build_tree(&posts, GroupingMode::Author, SortOrder::Descending, None),
            vec![
                Branch::new("Adam", ids(&[2, 3])),
                Branch::new("Zoe", ids(&[4, 1])),
            ],
        );
    }

    #[test]
    fn branch_keys_compare_as_strings() {
        let posts = collection(vec![
            post(1, 0, "x", "b"),
            post(2, 0, "x", "B"),
            post(3, 0, "x", "ab"),
            post(4, 0, "x", "a"),
            post(5, 0, "x", ""),
        ]);
        let keys = build_tree(&posts, GroupingMode::Location, SortOrder::Descending, None)
            .into_iter()
            .map(|b| b.key)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["", "B", "a", "ab", "b"]);
    }

    #[test]
    fn same_time_leaves_are_ordered_by_id() {
        let posts = collection(vec![
            post(9, 100, "x", "A"),
            post(3, 100, "x", "A"),
            post(5, 200, "x", "A"),
        ]);
        assert_eq!(
            build_tree(&posts, GroupingMode::Location, SortOrder::Descending, None),
            vec![Branch::new("A", ids(&[5, 3, 9]))],
        );
    }

    #[test]
    fn custom_branch_key() {
        let posts = collection(vec![
            post(1, 100, "Alice", "A"),
            post(2, 200, "bob", "B"),
            post(3, 50, "ALICE", "A"),
        ]);
        let lowercase_author = |p: &Post| p.author.to_lowercase();
        assert_eq!(
            build_tree(
                &posts,
                GroupingMode::Author,
                SortOrder::Descending,
                Some(&lowercase_author),
            ),
            vec![Branch::new("alice", ids(&[1, 3])), Branch::new("bob", ids(&[2]))],
        );
    }

    #[test]
    fn week_keys() {
        // 2019-03-15 12:00 UTC and 2019-03-04 12:00 UTC
        let posts = collection(vec![post(1, 1552651200, "x", "A"), post(2, 1551700800, "x", "A")]);
        assert_eq!(
            build_tree(&posts, GroupingMode::Week, SortOrder::Ascending, None),
            vec![Branch::new("Week 11", ids(&[1])), Branch::new("Week 10", ids(&[2]))],
        );
        let in_utc = |p: &Post| week_branch_key(p, &chrono_tz::UTC);
        assert_eq!(
            build_tree(&posts, GroupingMode::Week, SortOrder::Ascending, Some(&in_utc)),
            build_tree(&posts, GroupingMode::Week, SortOrder::Ascending, None),
        );
    }

    #[test]
    fn empty_collection() {
        let posts = PostCollection::new();
        for mode in GroupingMode::ALL {
            for order in [SortOrder::Ascending, SortOrder::Descending] {
                assert!(build_tree(&posts, mode, order, None).is_empty());
            }
        }
    }

    #[test]
    fn out_of_range_time_has_placeholder_week() {
        let p = post(1, i64::MIN, "x", "A");
        assert_eq!(week_branch_key(&p, &Utc), "Week ?");

        // representable in UTC, but past the last date once in Tokyo
        let last = chrono::NaiveDate::MAX
            .and_hms_opt(23, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();
        let p = post(2, last, "x", "A");
        assert_eq!(week_branch_key(&p, &chrono_tz::Asia::Tokyo), "Week ?");
    }

    fn gen_posts(raw: &[(u8, u8, u8, i32)]) -> PostCollection {
        raw.iter()
            .enumerate()
            .map(|(i, (author, location, _, time))| {
                post(
                    i as i64,
                    i64::from(*time),
                    &format!("author {}", author % 5),
                    &format!("location {}", location % 7),
                )
            })
            .map(|p| (p.id, p))
            .collect()
    }

    #[test]
    fn build_tree_invariants() {
        bolero::check!()
            .with_type::<Vec<(u8, u8, u8, i32)>>()
            .for_each(|raw| {
                let posts = gen_posts(raw);
                let mode = GroupingMode::ALL[raw.first().map(|r| r.2 as usize).unwrap_or(0) % 3];
                for order in [SortOrder::Ascending, SortOrder::Descending] {
                    let tree = build_tree(&posts, mode, order, None);

                    // deterministic
                    assert_eq!(tree, build_tree(&posts, mode, order, None));

                    // every post is in exactly one branch
                    let mut seen = HashSet::new();
                    for id in tree.iter().flat_map(|b| b.post_ids.iter()) {
                        assert!(seen.insert(*id), "post {id} is in multiple branches");
                    }
                    assert_eq!(seen, posts.keys().copied().collect::<HashSet<_>>());

                    // leaves are the most recent first, and all share the branch key
                    for b in tree.iter() {
                        assert!(!b.post_ids.is_empty());
                        for w in b.post_ids.windows(2) {
                            assert!(posts[&w[0]].time >= posts[&w[1]].time);
                        }
                        for id in b.post_ids.iter() {
                            assert_eq!(default_branch_key(mode, &posts[id]), b.key);
                        }
                    }

                    // branches are sorted by key in the preserved direction
                    for w in tree.windows(2) {
                        match order {
                            SortOrder::Descending => assert!(w[0].key < w[1].key),
                            SortOrder::Ascending => assert!(w[0].key > w[1].key),
                        }
                    }
                }
            });
    }
}
