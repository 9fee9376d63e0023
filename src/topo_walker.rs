//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

//--------------------------------------------------------------------------------------------------

pub type NeighborVisitor<'a, N> = Box<dyn Fn(N, &mut dyn FnMut(N)) + 'a>;

/// Input-before-output walk over any graph described by two adjacency
/// callbacks.
///
/// A node is emitted once all of its inputs were emitted. Nodes with an input
/// that is not reachable from the start set are never emitted.
pub struct TopoWalker<'a, N> {
	visit_inputs: NeighborVisitor<'a, N>,
	visit_outputs: NeighborVisitor<'a, N>,
}

impl<'a, N: Copy + Eq + Hash> TopoWalker<'a, N> {
	pub fn new(
		visit_inputs: impl Fn(N, &mut dyn FnMut(N)) + 'a,
		visit_outputs: impl Fn(N, &mut dyn FnMut(N)) + 'a,
	) -> Self {
		Self {
			visit_inputs: Box::new(visit_inputs),
			visit_outputs: Box::new(visit_outputs),
		}
	}

	pub fn visit_inputs(&self, node: N, f: &mut dyn FnMut(N)) {
		(self.visit_inputs)(node, f);
	}

	pub fn visit_outputs(&self, node: N, f: &mut dyn FnMut(N)) {
		(self.visit_outputs)(node, f);
	}

	pub fn walk<I: IntoIterator<Item = N>>(&self, starts: I, f: &mut dyn FnMut(N)) {
		let mut visited: HashSet<N> = HashSet::new();
		let mut queue: VecDeque<N> = VecDeque::new();
		for start in starts {
			if visited.insert(start) {
				queue.push_back(start);
			}
		}
		let mut ready = Vec::new();
		while let Some(node) = queue.pop_front() {
			f(node);
			ready.clear();
			self.visit_outputs(node, &mut |output| {
				if visited.contains(&output) {
					return;
				}
				let mut all_inputs_visited = true;
				self.visit_inputs(output, &mut |input| {
					all_inputs_visited &= visited.contains(&input);
				});
				if all_inputs_visited {
					ready.push(output);
				}
			});
			for &output in &ready {
				if visited.insert(output) {
					queue.push_back(output);
				}
			}
		}
	}

	/// Collects the walk into a vector.
	pub fn order<I: IntoIterator<Item = N>>(&self, starts: I) -> Vec<N> {
		let mut result = Vec::new();
		self.walk(starts, &mut |node| result.push(node));
		result
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
