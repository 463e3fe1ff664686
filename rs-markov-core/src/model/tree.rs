use std::borrow::Cow;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::node::{Node, NodeId};

/// Growth-only prefix tree stored as a flat arena.
///
/// Nodes live in a `Vec` and refer to each other by [`NodeId`]. Children
/// maps own the downward links, `parent` is a plain index used to rebuild
/// paths. Nodes are never removed; the whole tree is dropped at once.
///
/// ## Responsibilities
/// - Create-or-increment children (`add_child`)
/// - Case-policy-aware child lookup
/// - Weighted or uniform child selection with an injected RNG
/// - Path reconstruction and a textual dump for debugging
///
/// ## Invariants
/// - Index 0 is the root
/// - `ignore_case` is fixed at construction
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Tree {
	nodes: Vec<Node>,
	ignore_case: bool,
}

impl Tree {
	/// Id of the root node of every tree.
	pub const ROOT: NodeId = NodeId(0);

	/// Creates a tree holding only a root.
	pub fn new(ignore_case: bool) -> Self {
		Self { nodes: vec![Node::root()], ignore_case }
	}

	pub fn root(&self) -> NodeId {
		Self::ROOT
	}

	pub fn is_ignoring_case(&self) -> bool {
		self.ignore_case
	}

	/// Returns the node for `id`.
	///
	/// # Panics
	/// If `id` was not produced by this tree.
	pub fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id.0]
	}

	/// Number of nodes, root included.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// True when nothing was ever inserted below the root.
	pub fn is_empty(&self) -> bool {
		self.nodes[0].is_leaf()
	}

	fn lookup_key<'t>(&self, token: &'t str) -> Cow<'t, str> {
		if self.ignore_case {
			Cow::Owned(token.to_lowercase())
		} else {
			Cow::Borrowed(token)
		}
	}

	/// Records one occurrence of `token` below `parent`.
	///
	/// - Unknown token: a child is created with `initial_count`.
	/// - Known token: the existing child's count is increased by one.
	///
	/// Returns the child's id in both cases.
	pub fn add_child(&mut self, parent: NodeId, token: &str, initial_count: u32) -> NodeId {
		debug_assert!(!token.is_empty(), "empty tokens are never inserted");
		debug_assert!(initial_count >= 1, "nodes start with a positive count");

		if let Some(existing) = self.lookup(parent, token) {
			self.nodes[existing.0].increment();
			return existing;
		}

		let id = NodeId(self.nodes.len());
		let key = self.lookup_key(token).into_owned();
		self.nodes.push(Node::new(parent, token, initial_count));
		self.nodes[parent.0].children.insert(key, id);
		id
	}

	/// Exact (case-policy-aware) lookup among the direct children of `parent`.
	pub fn lookup(&self, parent: NodeId, token: &str) -> Option<NodeId> {
		if token.is_empty() {
			return None;
		}
		let key = self.lookup_key(token);
		self.nodes[parent.0].children.get(key.as_ref()).copied()
	}

	/// Follows `path` down from `from`, one token per level.
	///
	/// Returns `None` as soon as a link is missing.
	pub fn resolve<S: AsRef<str>>(&self, from: NodeId, path: &[S]) -> Option<NodeId> {
		path.iter()
			.try_fold(from, |node, token| self.lookup(node, token.as_ref()))
	}

	/// Ids of the direct children of `id`, in key order.
	pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
		self.nodes[id.0].children.values().copied()
	}

	/// Children of `id` sorted by [`Node::rank`].
	pub fn sorted_children(&self, id: NodeId) -> Vec<NodeId> {
		let mut children: Vec<NodeId> = self.children(id).collect();
		children.sort_by(|a, b| self.node(*a).rank(self.node(*b)));
		children
	}

	/// Sum of the counts of `id` and all its siblings.
	pub fn sibling_count(&self, id: NodeId) -> u64 {
		match self.nodes[id.0].parent {
			Some(parent) => self.children(parent).map(|c| u64::from(self.node(c).count)).sum(),
			None => 1,
		}
	}

	/// `count / sibling_count`, the probability of reaching `id` from its parent.
	///
	/// The root has probability 1.
	pub fn probability(&self, id: NodeId) -> f32 {
		let node = &self.nodes[id.0];
		if node.is_root() {
			return 1.0;
		}
		node.count as f32 / self.sibling_count(id) as f32
	}

	/// Picks a child of `parent`.
	///
	/// - `probabilistic`: weighted by count (and so by probability) over the
	///   children accepted by `filter`
	/// - otherwise: uniform over the accepted children
	///
	/// Returns `None` when no child passes the filter.
	pub fn select_child<R>(
		&self,
		parent: NodeId,
		rng: &mut R,
		probabilistic: bool,
		filter: Option<&dyn Fn(&Node) -> bool>,
	) -> Option<NodeId>
	where
		R: Rng + ?Sized,
	{
		let candidates: Vec<NodeId> = self
			.children(parent)
			.filter(|c| filter.is_none_or(|f| f(self.node(*c))))
			.collect();

		if !probabilistic {
			return candidates.choose(rng).copied();
		}

		match candidates.len() {
			0 => None,
			1 => Some(candidates[0]),
			_ => {
				let total: u64 = candidates.iter().map(|c| u64::from(self.node(*c).count)).sum();
				if total == 0 {
					return None;
				}

				let mut r = rng.random_range(0..total);
				for candidate in &candidates {
					let count = u64::from(self.node(*candidate).count);
					if r < count {
						return Some(*candidate);
					}
					r -= count;
				}
				candidates.last().copied()
			}
		}
	}

	/// Tokens from the root down to `id` (root excluded).
	pub fn path_from_root(&self, id: NodeId) -> Vec<&str> {
		let mut path = Vec::new();
		let mut current = id;
		while let Some(parent) = self.nodes[current.0].parent {
			if let Some(token) = self.nodes[current.0].token() {
				path.push(token);
			}
			current = parent;
		}
		path.reverse();
		path
	}

	/// Depth of `id`: 0 for the root, 1 for its children, and so on.
	pub fn depth(&self, id: NodeId) -> usize {
		let mut depth = 0;
		let mut current = id;
		while let Some(parent) = self.nodes[current.0].parent {
			depth += 1;
			current = parent;
		}
		depth
	}

	pub(crate) fn set_sentence_start(&mut self, id: NodeId) {
		self.nodes[id.0].is_sentence_start = true;
	}

	/// Indented dump of the whole tree.
	///
	/// Every node prints as `'token' [count,p=probability]->{ ... }`.
	/// With `sort` the children are listed by [`Node::rank`], which makes the
	/// output deterministic and suitable for golden tests.
	pub fn as_tree(&self, sort: bool) -> String {
		let mut out = String::from("ROOT {");
		if self.is_empty() {
			out.push('}');
			return out;
		}
		self.children_to_string(Self::ROOT, &mut out, 1, sort);
		out
	}

	fn children_to_string(&self, id: NodeId, out: &mut String, depth: usize, sort: bool) {
		let children = if sort {
			self.sorted_children(id)
		} else {
			self.children(id).collect()
		};

		let indent = "  ".repeat(depth);
		for child in children {
			let node = self.node(child);
			debug_assert!(node.count > 0, "zero count below {:?}", self.node(id).token());

			out.push('\n');
			out.push_str(&indent);
			out.push_str(&format!(
				"'{}' [{},p={}]->{{",
				escape_token(node.token().unwrap_or_default()),
				node.count,
				format_probability(self.probability(child)),
			));
			if node.has_children() {
				self.children_to_string(child, out, depth + 1, sort);
			} else {
				out.push('}');
			}
		}
		out.push('\n');
		out.push_str(&"  ".repeat(depth - 1));
		out.push('}');
	}

	/// Adds every path of `other` into this tree.
	///
	/// When both trees were built with smoothing, a node present in both
	/// carries the creation bonus twice, so one is taken off.
	pub(crate) fn merge_from(&mut self, other: &Tree, smoothing: bool) {
		let mut pending = vec![(Self::ROOT, Self::ROOT)];
		while let Some((mine, theirs)) = pending.pop() {
			for their_child in other.children(theirs) {
				let source = other.node(their_child);
				let Some(token) = source.token() else { continue };

				let child = match self.lookup(mine, token) {
					Some(existing) => {
						let bonus = u32::from(smoothing);
						let node = &mut self.nodes[existing.0];
						node.count += source.count.saturating_sub(bonus);
						existing
					}
					None => self.add_child(mine, token, source.count),
				};
				if source.is_sentence_start {
					self.set_sentence_start(child);
				}
				pending.push((child, their_child));
			}
		}
	}

	/// Checks the structural invariants of the arena.
	///
	/// Returns a description of the first violation found.
	pub(crate) fn check(&self) -> Result<(), String> {
		let root = &self.nodes[0];
		if root.token.is_some() || root.parent.is_some() {
			return Err("root must have neither token nor parent".to_owned());
		}

		for (index, node) in self.nodes.iter().enumerate().skip(1) {
			let token = node
				.token()
				.ok_or_else(|| format!("node #{index} has no token"))?;
			if node.count == 0 {
				return Err(format!("node #{index} ('{token}') has a zero count"));
			}
			let parent = node
				.parent
				.ok_or_else(|| format!("node #{index} ('{token}') has no parent"))?;
			let key = self.lookup_key(token);
			match self.nodes.get(parent.0).and_then(|p| p.children.get(key.as_ref())) {
				Some(id) if id.0 == index => {}
				_ => return Err(format!("node #{index} ('{token}') is not linked from its parent")),
			}
		}
		Ok(())
	}
}

fn escape_token(token: &str) -> Cow<'_, str> {
	match token {
		"\n" => Cow::Borrowed("\\n"),
		"\r" => Cow::Borrowed("\\r"),
		"\t" => Cow::Borrowed("\\t"),
		"\r\n" => Cow::Borrowed("\\r\\n"),
		other => Cow::Borrowed(other),
	}
}

/// Formats a probability with at most three decimals and no leading zero,
/// e.g. `0.6` -> `.6`, `1.0` -> `1`, `1/3` -> `.333`.
fn format_probability(p: f32) -> String {
	let fixed = format!("{p:.3}");
	let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
	match trimmed.strip_prefix('0') {
		Some(rest) if !rest.is_empty() => rest.to_owned(),
		_ => trimmed.to_owned(),
	}
}
