//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use super::node_set::NodeSet;
use super::{Graph, NodeIndex, OpKind, OpOracle};

//--------------------------------------------------------------------------------------------------

/// Read-only restriction of a `Graph` to a working set of nodes.
///
/// Adjacency is only reported between nodes of the set: an edge from or to a
/// node outside the set does not exist as far as the view is concerned.
#[derive(Clone)]
pub struct OpTopo<'g> {
	graph: &'g Graph,
	ops: NodeSet,
}

impl<'g> OpTopo<'g> {
	/// Nodes that do not belong to `graph` are ignored.
	pub fn new<I: IntoIterator<Item = NodeIndex>>(graph: &'g Graph, ops: I) -> Self {
		let ops = ops.into_iter().filter(|&node| graph.contains_node(node)).collect();
		Self { graph, ops }
	}

	pub fn whole(graph: &'g Graph) -> Self {
		Self { graph, ops: graph.nodes().collect() }
	}

	pub fn graph(&self) -> &'g Graph {
		self.graph
	}

	pub fn ops(&self) -> &NodeSet {
		&self.ops
	}

	pub fn contains(&self, node: NodeIndex) -> bool {
		self.ops.contains(node)
	}

	/// Calls `f` for the producer of every operand of `node`, in operand order.
	/// A producer feeding several operands is reported once per operand.
	pub fn visit_input_ops(&self, node: NodeIndex, f: &mut dyn FnMut(NodeIndex)) {
		for &operand in self.graph.operands(node) {
			let producer = self.graph.producer(operand);
			if self.ops.contains(producer) {
				f(producer);
			}
		}
	}

	/// Calls `f` for every user of every result of `node`, in result order.
	pub fn visit_output_ops(&self, node: NodeIndex, f: &mut dyn FnMut(NodeIndex)) {
		for &result in self.graph.results(node) {
			for user in self.graph.users(result) {
				if self.ops.contains(user.node) {
					f(user.node);
				}
			}
		}
	}

	pub fn input_count(&self, node: NodeIndex) -> usize {
		let mut count = 0;
		self.visit_input_ops(node, &mut |_| count += 1);
		count
	}

	/// `true` if `upstream` produces one of the operands of `downstream` and
	/// both are in the view.
	pub fn is_direct_upstream(&self, upstream: NodeIndex, downstream: NodeIndex) -> bool {
		if !self.ops.contains(downstream) {
			return false;
		}
		let mut found = false;
		self.visit_input_ops(downstream, &mut |input| found |= input == upstream);
		found
	}
}

impl OpOracle for OpTopo<'_> {
	fn op_kind(&self, node: NodeIndex) -> OpKind {
		self.graph.op_kind(node)
	}

	fn is_generally_injective(&self, node: NodeIndex) -> bool {
		self.graph.is_generally_injective(node)
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
