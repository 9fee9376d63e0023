//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use bit_set::BitSet;

use super::NodeIndex;

//--------------------------------------------------------------------------------------------------

/// Set of nodes. Iterates in ascending index order, so anything built by
/// walking a `NodeSet` is deterministic.
#[derive(Clone, Default)]
pub struct NodeSet {
	bits: BitSet,
}

impl NodeSet {
	pub fn new() -> Self {
		Self { bits: BitSet::new() }
	}

	pub fn single(node: NodeIndex) -> Self {
		let mut set = Self::new();
		set.insert(node);
		set
	}

	/// Returns `true` if the node was not in the set yet.
	pub fn insert(&mut self, node: NodeIndex) -> bool {
		self.bits.insert(node.raw)
	}

	pub fn contains(&self, node: NodeIndex) -> bool {
		self.bits.contains(node.raw)
	}

	pub fn union_with(&mut self, other: &Self) {
		self.bits.union_with(&other.bits);
	}

	pub fn union(a: &Self, b: &Self) -> Self {
		let mut result = a.clone();
		result.union_with(b);
		result
	}

	pub fn is_subset(&self, other: &Self) -> bool {
		self.bits.is_subset(&other.bits)
	}

	pub fn len(&self) -> usize {
		self.bits.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bits.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = NodeIndex> + '_ {
		self.bits.iter().map(NodeIndex::new)
	}
}

impl PartialEq for NodeSet {
	fn eq(&self, other: &Self) -> bool {
		self.iter().eq(other.iter())
	}
}

impl Eq for NodeSet {
}

impl std::fmt::Debug for NodeSet {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_set().entries(self.iter()).finish()
	}
}

impl FromIterator<NodeIndex> for NodeSet {
	fn from_iter<I: IntoIterator<Item = NodeIndex>>(iter: I) -> Self {
		let mut set = Self::new();
		for node in iter {
			set.insert(node);
		}
		set
	}
}

impl Extend<NodeIndex> for NodeSet {
	fn extend<I: IntoIterator<Item = NodeIndex>>(&mut self, iter: I) {
		for node in iter {
			self.insert(node);
		}
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_union_is_ordered_and_deduplicated() {
		let a: NodeSet = [5, 1, 3].into_iter().map(NodeIndex::new).collect();
		let b: NodeSet = [3, 130, 0].into_iter().map(NodeIndex::new).collect();
		let u = NodeSet::union(&a, &b);
		let raw: Vec<usize> = u.iter().map(|n| n.raw).collect();
		assert_eq!(raw, vec![0, 1, 3, 5, 130]);
		assert!(a.is_subset(&u));
		assert!(b.is_subset(&u));
		assert_eq!(u.len(), 5);
	}

	#[test]
	fn test_equality_ignores_capacity() {
		let mut a = NodeSet::single(NodeIndex::new(200));
		a.union_with(&NodeSet::single(NodeIndex::new(2)));
		let b: NodeSet = [2, 200].into_iter().map(NodeIndex::new).collect();
		assert_eq!(a, b);
		assert_ne!(a, NodeSet::single(NodeIndex::new(2)));
	}
}

//--------------------------------------------------------------------------------------------------
