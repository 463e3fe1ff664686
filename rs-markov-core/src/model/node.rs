use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Index of a node inside a [`Tree`](super::tree::Tree) arena.
///
/// Ids are only meaningful for the tree that produced them.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
	/// Position of the node in the arena.
	pub fn index(self) -> usize {
		self.0
	}
}

/// A node of the prefix tree.
///
/// A `Node` stands for one token at one position of a training window.
/// The path from the root to the node spells the token sequence, and
/// `count` says how many times that sequence was observed.
///
/// ## Invariants
/// - `token` is `None` for the root only
/// - `count >= 1` for every non-root node, and it never decreases
/// - `parent` is `None` for the root only
/// - every key of `children` is the lookup key (case-folded when the
///   tree ignores case) of the child's token
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Node {
	/// Token as first seen at this position.
	pub(crate) token: Option<String>,
	/// Number of times this path was observed.
	pub(crate) count: u32,
	/// Children indexed by lookup key.
	/// Ordered so that iteration (and thus seeded sampling) is reproducible.
	pub(crate) children: BTreeMap<String, NodeId>,
	/// Set when the token opened a training sentence.
	pub(crate) is_sentence_start: bool,
	/// Back-reference used only to rebuild paths.
	pub(crate) parent: Option<NodeId>,
}

impl Node {
	pub(crate) fn root() -> Self {
		Self {
			token: None,
			count: 0,
			children: BTreeMap::new(),
			is_sentence_start: false,
			parent: None,
		}
	}

	pub(crate) fn new(parent: NodeId, token: &str, initial_count: u32) -> Self {
		Self {
			token: Some(token.to_owned()),
			count: initial_count,
			children: BTreeMap::new(),
			is_sentence_start: false,
			parent: Some(parent),
		}
	}

	/// The node's token, `None` for the root.
	pub fn token(&self) -> Option<&str> {
		self.token.as_deref()
	}

	pub fn count(&self) -> u32 {
		self.count
	}

	pub fn is_sentence_start(&self) -> bool {
		self.is_sentence_start
	}

	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	pub fn is_root(&self) -> bool {
		self.parent.is_none()
	}

	pub fn is_leaf(&self) -> bool {
		self.children.is_empty()
	}

	pub fn has_children(&self) -> bool {
		!self.children.is_empty()
	}

	/// Number of distinct children.
	pub fn unique_count(&self) -> usize {
		self.children.len()
	}

	pub(crate) fn increment(&mut self) -> u32 {
		self.count += 1;
		self.count
	}

	/// Frequency ordering: higher counts first, ties broken by token.
	///
	/// Used for sorted dumps and completion lists.
	pub fn rank(&self, other: &Self) -> Ordering {
		other
			.count
			.cmp(&self.count)
			.then_with(|| self.token.cmp(&other.token))
	}
}
