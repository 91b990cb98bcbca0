//! Per-method segment trie.
//!
//! # Responsibilities
//! - Store routes as a tree keyed by path segments
//! - Resolve request paths with static > param > catch-all precedence
//! - Merge trees when independently built routers are composed
//!
//! # Data Flow
//! ```text
//! insert("/users/:id", chain)
//!     → split into ["users", ":id"]
//!     → descend from root, creating nodes
//!     → attach chain at the ":id" node
//!
//! match_path("/users/42")
//!     → split into ["users", "42"]
//!     → root → static "users" → param ":id" (binds id=42)
//!     → node has a chain → RouteMatch { chain, params }
//! ```
//!
//! # Design Decisions
//! - Nodes live in an arena (`Vec<Node>`) and refer to each other by index;
//!   merge copies subtrees without ownership gymnastics
//! - Static children get a first-byte index with a linear fallback scan, so
//!   siblings sharing a first byte ("list", "latest") still resolve
//! - A catch-all consumes the joined remainder and ends the descent; any
//!   segments declared after it are ignored at insert time
//! - Descent never backtracks: once a static child is taken, a deeper
//!   mismatch is a miss even if a param sibling would have matched
//! - Re-inserting a path replaces its chain; last registration wins
//! - Built during setup, read-only while serving; no locks on the match path

use std::collections::HashMap;

use crate::context::Params;
use crate::handler::HandlerChain;
use crate::routing::path::{self, SegmentKind};

/// Index of a node within the tree's arena.
type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Root,
    Static,
    Param,
    CatchAll,
}

struct Node {
    segment: String,
    kind: NodeKind,
    /// Bound name for param/catch-all nodes; empty for static nodes.
    param_name: String,
    static_children: Vec<NodeId>,
    static_index: HashMap<u8, NodeId>,
    param_child: Option<NodeId>,
    catch_all_child: Option<NodeId>,
    chain: Option<HandlerChain>,
    /// Largest number of parameters any route below this node can bind.
    max_params: u8,
}

impl Node {
    fn new(segment: &str, kind: NodeKind, param_name: &str) -> Self {
        Self {
            segment: segment.to_string(),
            kind,
            param_name: param_name.to_string(),
            static_children: Vec::new(),
            static_index: HashMap::new(),
            param_child: None,
            catch_all_child: None,
            chain: None,
            max_params: 0,
        }
    }
}

/// The result of a successful lookup: the route's chain plus bound params.
pub struct RouteMatch {
    pub chain: HandlerChain,
    pub params: Params,
}

/// Segment trie for one HTTP method.
pub struct RouteTree {
    nodes: Vec<Node>,
    slash_insensitive: bool,
}

impl RouteTree {
    pub fn new(slash_insensitive: bool) -> Self {
        Self {
            nodes: vec![Node::new("", NodeKind::Root, "")],
            slash_insensitive,
        }
    }

    /// Register a chain under `path`, overwriting any previous registration.
    pub fn insert(&mut self, path: &str, chain: HandlerChain) {
        let segments = path::split(path, self.slash_insensitive);
        let mut current = ROOT;
        for segment in segments {
            match path::classify(segment) {
                SegmentKind::Param => {
                    // An existing param child keeps its original name.
                    current = match self.nodes[current].param_child {
                        Some(child) => child,
                        None => self.add_param_child(current, path::param_name(segment)),
                    };
                }
                SegmentKind::CatchAll => {
                    current = match self.nodes[current].catch_all_child {
                        Some(child) => child,
                        None => self.add_catch_all_child(current, path::param_name(segment)),
                    };
                    // Consumes to the end of the path; stop descending.
                    break;
                }
                SegmentKind::Static => {
                    current = match self.find_static(current, segment) {
                        Some(child) => child,
                        None => self.add_static_child(current, segment),
                    };
                }
            }
        }
        self.nodes[current].chain = Some(chain);
        self.refresh_max_params(ROOT);
    }

    /// Resolve a request path.
    ///
    /// Precedence per level: exact static child, then param child, then
    /// catch-all. A node reached without an attached chain is a miss even
    /// though the node exists.
    pub fn match_path(&self, request_path: &str) -> Option<RouteMatch> {
        let segments = path::split(request_path, self.slash_insensitive);
        let mut params = Params::with_capacity(self.nodes[ROOT].max_params as usize);
        let mut current = ROOT;

        let mut idx = 0;
        while idx < segments.len() {
            let segment = segments[idx];
            if let Some(child) = self.find_static(current, segment) {
                current = child;
            } else if let Some(child) = self.nodes[current].param_child {
                params.push(&self.nodes[child].param_name, segment);
                current = child;
            } else if let Some(child) = self.nodes[current].catch_all_child {
                params.push(&self.nodes[child].param_name, &segments[idx..].join("/"));
                current = child;
                break;
            } else {
                return None;
            }
            idx += 1;
        }

        let chain = self.nodes[current].chain.clone()?;
        Some(RouteMatch { chain, params })
    }

    /// Union `other` into this tree. Where both sides attach a chain to the
    /// same node, the merged-in chain wins.
    pub fn merge(&mut self, other: RouteTree) {
        self.merge_nodes(ROOT, &other, ROOT);
        self.refresh_max_params(ROOT);
    }

    /// Number of registered routes (nodes with an attached chain).
    pub fn route_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.chain.is_some()).count()
    }

    fn merge_nodes(&mut self, dst: NodeId, other: &RouteTree, src: NodeId) {
        if let Some(chain) = &other.nodes[src].chain {
            self.nodes[dst].chain = Some(chain.clone());
        }

        for i in 0..other.nodes[src].static_children.len() {
            let src_child = other.nodes[src].static_children[i];
            let segment = other.nodes[src_child].segment.clone();
            let dst_child = match self.find_static(dst, &segment) {
                Some(child) => child,
                None => self.add_static_child(dst, &segment),
            };
            self.merge_nodes(dst_child, other, src_child);
        }

        if let Some(src_child) = other.nodes[src].param_child {
            let name = other.nodes[src_child].param_name.clone();
            let dst_child = match self.nodes[dst].param_child {
                Some(child) => child,
                None => self.add_param_child(dst, &name),
            };
            self.merge_nodes(dst_child, other, src_child);
        }

        if let Some(src_child) = other.nodes[src].catch_all_child {
            let name = other.nodes[src_child].param_name.clone();
            let dst_child = match self.nodes[dst].catch_all_child {
                Some(child) => child,
                None => self.add_catch_all_child(dst, &name),
            };
            self.merge_nodes(dst_child, other, src_child);
        }
    }

    fn find_static(&self, parent: NodeId, segment: &str) -> Option<NodeId> {
        if let Some(&first) = segment.as_bytes().first() {
            if let Some(&child) = self.nodes[parent].static_index.get(&first) {
                if self.nodes[child].segment == segment {
                    return Some(child);
                }
            }
        }
        // First-byte collisions and empty segments fall through to a scan.
        self.nodes[parent]
            .static_children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].segment == segment)
    }

    fn add_static_child(&mut self, parent: NodeId, segment: &str) -> NodeId {
        let id = self.push_node(Node::new(segment, NodeKind::Static, ""));
        self.nodes[parent].static_children.push(id);
        if let Some(&first) = segment.as_bytes().first() {
            self.nodes[parent].static_index.insert(first, id);
        }
        id
    }

    fn add_param_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.push_node(Node::new("", NodeKind::Param, name));
        self.nodes[parent].param_child = Some(id);
        id
    }

    fn add_catch_all_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.push_node(Node::new("", NodeKind::CatchAll, name));
        self.nodes[parent].catch_all_child = Some(id);
        id
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn refresh_max_params(&mut self, node: NodeId) -> u8 {
        let own = matches!(
            self.nodes[node].kind,
            NodeKind::Param | NodeKind::CatchAll
        ) as u8;

        let mut children = self.nodes[node].static_children.clone();
        children.extend(self.nodes[node].param_child);
        children.extend(self.nodes[node].catch_all_child);

        let mut deepest = 0;
        for child in children {
            deepest = deepest.max(self.refresh_max_params(child));
        }

        let total = own.saturating_add(deepest);
        self.nodes[node].max_params = total;
        total
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::Context;
    use crate::handler::{chain, handler, HandlerChain};

    fn tagged_chain(tag: &'static str) -> HandlerChain {
        chain(vec![handler(move |ctx: &mut Context| {
            ctx.store().set("route", tag);
        })])
    }

    fn same_chain(a: &HandlerChain, b: &HandlerChain) -> bool {
        Arc::ptr_eq(a, b)
    }

    #[test]
    fn test_param_route_binds_segment() {
        let mut tree = RouteTree::new(false);
        tree.insert("/users/:id", tagged_chain("user"));

        let m = tree.match_path("/users/42").unwrap();
        assert_eq!(m.params.get("id"), Some("42"));
        assert_eq!(m.params.len(), 1);
    }

    #[test]
    fn test_param_binds_verbatim_without_decoding() {
        let mut tree = RouteTree::new(false);
        tree.insert("/users/:id", tagged_chain("user"));

        let m = tree.match_path("/users/a%20b").unwrap();
        assert_eq!(m.params.get("id"), Some("a%20b"));
    }

    #[test]
    fn test_catch_all_joins_remainder() {
        let mut tree = RouteTree::new(false);
        tree.insert("/files/*path", tagged_chain("files"));

        let m = tree.match_path("/files/a/b/c.txt").unwrap();
        assert_eq!(m.params.get("path"), Some("a/b/c.txt"));

        let m = tree.match_path("/files/single").unwrap();
        assert_eq!(m.params.get("path"), Some("single"));
    }

    #[test]
    fn test_catch_all_requires_at_least_one_segment() {
        let mut tree = RouteTree::new(false);
        tree.insert("/files/*path", tagged_chain("files"));

        // "/files" stops at a node with no chain attached.
        assert!(tree.match_path("/files").is_none());
    }

    #[test]
    fn test_catch_all_swallows_later_declared_segments() {
        let mut tree = RouteTree::new(false);
        tree.insert("/files/*path/ignored", tagged_chain("files"));

        let m = tree.match_path("/files/a/b").unwrap();
        assert_eq!(m.params.get("path"), Some("a/b"));
    }

    #[test]
    fn test_static_wins_over_param() {
        let list = tagged_chain("list");
        let by_id = tagged_chain("by_id");

        let mut tree = RouteTree::new(false);
        tree.insert("/users/list", list.clone());
        tree.insert("/users/:id", by_id.clone());

        let m = tree.match_path("/users/list").unwrap();
        assert!(same_chain(&m.chain, &list));
        assert!(m.params.is_empty());

        let m = tree.match_path("/users/7").unwrap();
        assert!(same_chain(&m.chain, &by_id));
        assert_eq!(m.params.get("id"), Some("7"));
    }

    #[test]
    fn test_static_wins_regardless_of_insertion_order() {
        let list = tagged_chain("list");
        let by_id = tagged_chain("by_id");

        let mut tree = RouteTree::new(false);
        tree.insert("/users/:id", by_id);
        tree.insert("/users/list", list.clone());

        let m = tree.match_path("/users/list").unwrap();
        assert!(same_chain(&m.chain, &list));
    }

    #[test]
    fn test_param_wins_over_catch_all() {
        let one = tagged_chain("one");
        let rest = tagged_chain("rest");

        let mut tree = RouteTree::new(false);
        tree.insert("/docs/*path", rest.clone());
        tree.insert("/docs/:page", one.clone());

        let m = tree.match_path("/docs/intro").unwrap();
        assert!(same_chain(&m.chain, &one));
        assert_eq!(m.params.get("page"), Some("intro"));

        // Two remaining segments cannot take the param branch to a chain,
        // but the catch-all was registered one level up, so the descent
        // through the param child simply misses.
        let m = tree.match_path("/docs/a/b");
        assert!(m.is_none());
    }

    #[test]
    fn test_catch_all_taken_when_no_static_or_param_matches() {
        let exact = tagged_chain("exact");
        let rest = tagged_chain("rest");

        let mut tree = RouteTree::new(false);
        tree.insert("/assets/app.js", exact.clone());
        tree.insert("/assets/*file", rest.clone());

        let m = tree.match_path("/assets/app.js").unwrap();
        assert!(same_chain(&m.chain, &exact));

        let m = tree.match_path("/assets/css/site.css").unwrap();
        assert!(same_chain(&m.chain, &rest));
        assert_eq!(m.params.get("file"), Some("css/site.css"));
    }

    #[test]
    fn test_no_backtracking_after_static_descent() {
        let mut tree = RouteTree::new(false);
        tree.insert("/users/list", tagged_chain("list"));
        tree.insert("/users/:id/posts", tagged_chain("posts"));

        // "list" descends the static branch, which has no "posts" child;
        // the param branch is not revisited.
        assert!(tree.match_path("/users/list/posts").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let first = tagged_chain("first");
        let second = tagged_chain("second");

        let mut tree = RouteTree::new(false);
        tree.insert("/dup", first);
        tree.insert("/dup", second.clone());

        let m = tree.match_path("/dup").unwrap();
        assert!(same_chain(&m.chain, &second));
    }

    #[test]
    fn test_root_path_routes_via_root_node() {
        let root = tagged_chain("root");

        let mut tree = RouteTree::new(false);
        tree.insert("/", root.clone());

        let m = tree.match_path("/").unwrap();
        assert!(same_chain(&m.chain, &root));
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_node_existence_is_not_route_existence() {
        let mut tree = RouteTree::new(false);
        tree.insert("/a/b/c", tagged_chain("deep"));

        // "/a" and "/a/b" exist as nodes but carry no chain.
        assert!(tree.match_path("/a").is_none());
        assert!(tree.match_path("/a/b").is_none());
        assert!(tree.match_path("/a/b/c").is_some());
    }

    #[test]
    fn test_trailing_slash_routes_are_distinct() {
        let bare = tagged_chain("bare");
        let slashed = tagged_chain("slashed");

        let mut tree = RouteTree::new(false);
        tree.insert("/foo", bare.clone());
        tree.insert("/foo/", slashed.clone());

        let m = tree.match_path("/foo").unwrap();
        assert!(same_chain(&m.chain, &bare));

        let m = tree.match_path("/foo/").unwrap();
        assert!(same_chain(&m.chain, &slashed));
    }

    #[test]
    fn test_slash_insensitive_mode_collapses_variants() {
        let only = tagged_chain("only");

        let mut tree = RouteTree::new(true);
        tree.insert("/foo", only.clone());

        let m = tree.match_path("/foo/").unwrap();
        assert!(same_chain(&m.chain, &only));

        let m = tree.match_path("//foo").unwrap();
        assert!(same_chain(&m.chain, &only));
    }

    #[test]
    fn test_static_siblings_sharing_first_byte() {
        let list = tagged_chain("list");
        let latest = tagged_chain("latest");
        let login = tagged_chain("login");

        let mut tree = RouteTree::new(false);
        tree.insert("/users/list", list.clone());
        tree.insert("/users/latest", latest.clone());
        tree.insert("/users/login", login.clone());

        assert!(same_chain(&tree.match_path("/users/list").unwrap().chain, &list));
        assert!(same_chain(
            &tree.match_path("/users/latest").unwrap().chain,
            &latest
        ));
        assert!(same_chain(&tree.match_path("/users/login").unwrap().chain, &login));
    }

    #[test]
    fn test_merge_adopts_disjoint_routes() {
        let a = tagged_chain("a");
        let b = tagged_chain("b");

        let mut left = RouteTree::new(false);
        left.insert("/a", a.clone());

        let mut right = RouteTree::new(false);
        right.insert("/b/:id", b.clone());

        left.merge(right);

        assert!(same_chain(&left.match_path("/a").unwrap().chain, &a));
        let m = left.match_path("/b/9").unwrap();
        assert!(same_chain(&m.chain, &b));
        assert_eq!(m.params.get("id"), Some("9"));
    }

    #[test]
    fn test_merge_conflict_merged_in_side_wins() {
        let mine = tagged_chain("mine");
        let theirs = tagged_chain("theirs");

        let mut left = RouteTree::new(false);
        left.insert("/a", mine);

        let mut right = RouteTree::new(false);
        right.insert("/a", theirs.clone());

        left.merge(right);
        assert!(same_chain(&left.match_path("/a").unwrap().chain, &theirs));
    }

    #[test]
    fn test_merge_recurses_through_shared_prefixes() {
        let users = tagged_chain("users");
        let orders = tagged_chain("orders");

        let mut left = RouteTree::new(false);
        left.insert("/api/users", users.clone());

        let mut right = RouteTree::new(false);
        right.insert("/api/orders/:id", orders.clone());

        left.merge(right);

        assert!(same_chain(&left.match_path("/api/users").unwrap().chain, &users));
        let m = left.match_path("/api/orders/5").unwrap();
        assert!(same_chain(&m.chain, &orders));
        assert_eq!(m.params.get("id"), Some("5"));
        assert_eq!(left.route_count(), 2);
    }

    #[test]
    fn test_merge_preserves_param_capacity_tracking() {
        let mut left = RouteTree::new(false);
        left.insert("/one/:a", tagged_chain("one"));

        let mut right = RouteTree::new(false);
        right.insert("/two/:a/:b/:c", tagged_chain("two"));

        left.merge(right);

        let m = left.match_path("/two/1/2/3").unwrap();
        assert_eq!(m.params.len(), 3);
        assert_eq!(m.params.get("a"), Some("1"));
        assert_eq!(m.params.get("c"), Some("3"));
    }

    #[test]
    fn test_multi_param_routes() {
        let mut tree = RouteTree::new(false);
        tree.insert("/orgs/:org/repos/:repo", tagged_chain("repo"));

        let m = tree.match_path("/orgs/acme/repos/widget").unwrap();
        assert_eq!(m.params.get("org"), Some("acme"));
        assert_eq!(m.params.get("repo"), Some("widget"));
    }

    #[test]
    fn test_miss_on_unregistered_sibling() {
        let mut tree = RouteTree::new(false);
        tree.insert("/users", tagged_chain("users"));

        assert!(tree.match_path("/orders").is_none());
        assert!(tree.match_path("/users/extra").is_none());
    }
}
