//! In-memory view of the tag forest.
//!
//! Tags are held in an arena keyed by [`TagId`]; the parent pointer lives on
//! each [`Tag`] and the child lists are a derived index. Every traversal uses
//! an explicit worklist so deep hierarchies never grow the call stack.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Tag, TagId};

/// Separator between segments of a tag path such as `finance/revenue`.
pub const PATH_SEPARATOR: char = '/';

/// A tag together with its ordered children, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNode {
    pub tag: Tag,
    pub children: Vec<TagNode>,
}

/// Arena of tags plus a parent -> children index.
#[derive(Debug, Clone, Default)]
pub struct TagTree {
    tags: HashMap<TagId, Tag>,
    children: HashMap<Option<TagId>, Vec<TagId>>,
}

impl TagTree {
    /// Builds the tree from a flat list of tags.
    ///
    /// Child lists are sorted by name then id. A tag whose parent is missing
    /// from the input is treated as a root.
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        let tags: HashMap<TagId, Tag> = tags.into_iter().map(|t| (t.id(), t)).collect();

        let mut children: HashMap<Option<TagId>, Vec<TagId>> = HashMap::new();
        for tag in tags.values() {
            let parent = tag.parent_id().filter(|p| tags.contains_key(p));
            children.entry(parent).or_default().push(tag.id());
        }
        for ids in children.values_mut() {
            ids.sort_by(|a, b| {
                let (ta, tb) = (&tags[a], &tags[b]);
                ta.name().cmp(tb.name()).then(a.cmp(b))
            });
        }

        Self { tags, children }
    }

    /// Number of tags in the tree.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(&id)
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.tags.contains_key(&id)
    }

    /// Root tags in display order.
    pub fn roots(&self) -> &[TagId] {
        self.children_in(None)
    }

    /// Direct children of `id` in display order.
    pub fn children_of(&self, id: TagId) -> &[TagId] {
        self.children_in(Some(id))
    }

    fn children_in(&self, parent: Option<TagId>) -> &[TagId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `id` plus every transitive child.
    ///
    /// Returns an empty set when `id` is not in the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use reportdb::{Tag, TagId, TagTree};
    ///
    /// let tree = TagTree::from_tags([
    ///     Tag::new(TagId::new(1), "finance"),
    ///     Tag::with_parent(TagId::new(2), "revenue", Some(TagId::new(1))),
    ///     Tag::new(TagId::new(3), "ops"),
    /// ]);
    ///
    /// let closure = tree.descendants(TagId::new(1));
    /// assert!(closure.contains(&TagId::new(1)));
    /// assert!(closure.contains(&TagId::new(2)));
    /// assert!(!closure.contains(&TagId::new(3)));
    /// ```
    pub fn descendants(&self, id: TagId) -> BTreeSet<TagId> {
        let mut found = BTreeSet::new();
        if !self.contains(id) {
            return found;
        }

        found.insert(id);
        let mut worklist = vec![id];
        while let Some(current) = worklist.pop() {
            for &child in self.children_of(current) {
                if found.insert(child) {
                    worklist.push(child);
                }
            }
        }
        found
    }

    /// Returns the subtree rooted at `id` with every child listed before its
    /// parent, so deleting in this order never orphans a row.
    pub fn subtree_post_order(&self, id: TagId) -> Vec<TagId> {
        if !self.contains(id) {
            return Vec::new();
        }

        let mut pre_order = Vec::new();
        let mut seen = HashSet::new();
        let mut worklist = vec![id];
        while let Some(current) = worklist.pop() {
            if !seen.insert(current) {
                continue;
            }
            pre_order.push(current);
            worklist.extend(self.children_of(current).iter().rev().copied());
        }

        // Reversed pre-order puts every descendant ahead of its ancestors.
        pre_order.reverse();
        pre_order
    }

    /// Walks parent pointers from `id` up to its root, nearest first.
    /// Stops early if a corrupt parent chain loops back on itself.
    pub fn ancestors(&self, id: TagId) -> Vec<TagId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.get(id).and_then(Tag::parent_id);
        while let Some(parent) = current {
            if !seen.insert(parent) || !self.contains(parent) {
                break;
            }
            chain.push(parent);
            current = self.get(parent).and_then(Tag::parent_id);
        }
        chain
    }

    /// Renders the slash path of a tag, e.g. `finance/revenue`.
    pub fn path_of(&self, id: TagId) -> Option<String> {
        let tag = self.get(id)?;
        let mut segments: Vec<&str> = self
            .ancestors(id)
            .into_iter()
            .rev()
            .filter_map(|a| self.get(a).map(Tag::name))
            .collect();
        segments.push(tag.name());
        Some(segments.join(&PATH_SEPARATOR.to_string()))
    }

    /// Finds the child called `name` directly under `parent` (`None` = roots).
    pub fn child_named(&self, parent: Option<TagId>, name: &str) -> Option<TagId> {
        self.children_in(parent)
            .iter()
            .copied()
            .find(|id| self.tags[id].name() == name)
    }

    /// Resolves a slash path segment by segment from the roots.
    pub fn find_by_path(&self, path: &str) -> Option<TagId> {
        let mut current = None;
        let mut matched = false;
        for segment in crate::utils::tag_path_segments(path) {
            current = Some(self.child_named(current, segment)?);
            matched = true;
        }
        if matched { current } else { None }
    }

    /// Every tag called `name`, in any scope, ordered by id.
    pub fn find_by_name(&self, name: &str) -> Vec<TagId> {
        let mut ids: Vec<TagId> = self
            .tags
            .values()
            .filter(|t| t.name() == name)
            .map(Tag::id)
            .collect();
        ids.sort();
        ids
    }

    /// Builds the nested display forest.
    ///
    /// Nodes are assembled bottom-up from a post-order walk, so no recursion
    /// is involved regardless of depth.
    pub fn forest(&self) -> Vec<TagNode> {
        let mut built: HashMap<TagId, TagNode> = HashMap::with_capacity(self.tags.len());
        for &root in self.roots() {
            for id in self.subtree_post_order(root) {
                let children = self
                    .children_of(id)
                    .iter()
                    .filter_map(|child| built.remove(child))
                    .collect();
                built.insert(
                    id,
                    TagNode {
                        tag: self.tags[&id].clone(),
                        children,
                    },
                );
            }
        }

        self.roots()
            .iter()
            .filter_map(|root| built.remove(root))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: i64, name: &str, parent: Option<i64>) -> Tag {
        Tag::with_parent(TagId::new(id), name, parent.map(TagId::new))
    }

    /// finance(1) -> revenue(2) -> domestic(4)
    ///            -> costs(3)
    /// ops(5)
    fn sample() -> TagTree {
        TagTree::from_tags([
            tag(1, "finance", None),
            tag(2, "revenue", Some(1)),
            tag(3, "costs", Some(1)),
            tag(4, "domestic", Some(2)),
            tag(5, "ops", None),
        ])
    }

    fn ids(raw: &[i64]) -> Vec<TagId> {
        raw.iter().copied().map(TagId::new).collect()
    }

    #[test]
    fn children_are_sorted_by_name_then_id() {
        let tree = TagTree::from_tags([
            tag(1, "b", None),
            tag(2, "a", None),
            tag(3, "a", Some(1)),
            tag(4, "a", Some(2)),
        ]);

        assert_eq!(tree.roots(), ids(&[2, 1]).as_slice());
        assert_eq!(tree.children_of(TagId::new(1)), ids(&[3]).as_slice());
    }

    #[test]
    fn descendants_include_self_and_all_levels() {
        let tree = sample();
        let closure = tree.descendants(TagId::new(1));

        assert_eq!(closure.into_iter().collect::<Vec<_>>(), ids(&[1, 2, 3, 4]));
    }

    #[test]
    fn descendants_of_leaf_is_just_the_leaf() {
        let tree = sample();
        let closure = tree.descendants(TagId::new(4));

        assert_eq!(closure.into_iter().collect::<Vec<_>>(), ids(&[4]));
    }

    #[test]
    fn descendants_of_unknown_tag_is_empty() {
        assert!(sample().descendants(TagId::new(99)).is_empty());
    }

    #[test]
    fn descendants_are_superset_of_each_child_closure() {
        let tree = sample();
        for id in ids(&[1, 2, 3, 4, 5]) {
            let parent_closure = tree.descendants(id);
            assert!(parent_closure.contains(&id));
            for &child in tree.children_of(id) {
                assert!(tree.descendants(child).is_subset(&parent_closure));
            }
        }
    }

    #[test]
    fn post_order_lists_children_before_parents() {
        let tree = sample();
        let order = tree.subtree_post_order(TagId::new(1));

        assert_eq!(order.len(), 4);
        let position = |id: i64| order.iter().position(|t| *t == TagId::new(id)).unwrap();
        assert!(position(4) < position(2));
        assert!(position(2) < position(1));
        assert!(position(3) < position(1));
        assert_eq!(*order.last().unwrap(), TagId::new(1));
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let depth = 50_000;
        let tags = (1..=depth).map(|i| tag(i, &format!("t{i}"), (i > 1).then(|| i - 1)));
        let tree = TagTree::from_tags(tags);

        assert_eq!(tree.descendants(TagId::new(1)).len(), depth as usize);
        assert_eq!(tree.subtree_post_order(TagId::new(1)).len(), depth as usize);
        assert_eq!(tree.ancestors(TagId::new(depth)).len(), depth as usize - 1);
    }

    #[test]
    fn path_of_joins_ancestor_names() {
        let tree = sample();

        assert_eq!(tree.path_of(TagId::new(4)).as_deref(), Some("finance/revenue/domestic"));
        assert_eq!(tree.path_of(TagId::new(5)).as_deref(), Some("ops"));
        assert_eq!(tree.path_of(TagId::new(42)), None);
    }

    #[test]
    fn find_by_path_walks_segments() {
        let tree = sample();

        assert_eq!(tree.find_by_path("finance/revenue/domestic"), Some(TagId::new(4)));
        assert_eq!(tree.find_by_path("finance"), Some(TagId::new(1)));
        assert_eq!(tree.find_by_path("revenue"), None, "paths start at a root");
        assert_eq!(tree.find_by_path("finance/ops"), None);
        assert_eq!(tree.find_by_path("/"), None);
    }

    #[test]
    fn find_by_name_searches_every_scope() {
        let tree = TagTree::from_tags([
            tag(1, "2024", None),
            tag(2, "finance", None),
            tag(3, "2024", Some(2)),
        ]);

        assert_eq!(tree.find_by_name("2024"), ids(&[1, 3]));
        assert!(tree.find_by_name("missing").is_empty());
    }

    #[test]
    fn forest_nests_children_in_display_order() {
        let forest = sample().forest();

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].tag.name(), "finance");
        assert_eq!(forest[1].tag.name(), "ops");

        let finance_children: Vec<&str> =
            forest[0].children.iter().map(|n| n.tag.name()).collect();
        assert_eq!(finance_children, vec!["costs", "revenue"]);
        assert_eq!(forest[0].children[1].children[0].tag.name(), "domestic");
    }

    #[test]
    fn orphaned_parent_reference_becomes_root() {
        let tree = TagTree::from_tags([tag(2, "child", Some(1))]);

        assert_eq!(tree.roots(), ids(&[2]).as_slice());
        assert!(tree.ancestors(TagId::new(2)).is_empty());
    }
}
