//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::collections::HashMap;
use std::collections::hash_map;

use smallvec::SmallVec;

use crate::util::cold_path;
use crate::util::index_vec::IndexVec;
use crate::{ErrPack, define_index_type};

pub mod node_set;
pub mod view;

//--------------------------------------------------------------------------------------------------

/// Structural classification of a node. The order matters: everything below
/// `Reduction` may be grouped into trivial patterns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpKind {
	ElementWise,
	Broadcast,
	Injective,
	Reduction,
	Unsupported,
}

impl OpKind {
	pub fn is_trivial(self) -> bool {
		self < Self::Reduction
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::ElementWise => "ElementWise",
			Self::Broadcast => "Broadcast",
			Self::Injective => "Injective",
			Self::Reduction => "Reduction",
			Self::Unsupported => "Unsupported",
		}
	}
}

/// Per-node structural facts supplied by the surrounding compiler.
pub trait OpOracle {
	fn op_kind(&self, node: NodeIndex) -> OpKind;
	fn is_generally_injective(&self, node: NodeIndex) -> bool;
}

//--------------------------------------------------------------------------------------------------

define_index_type!(NodeIndex);
define_index_type!(ValueIndex);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Use {
	pub node: NodeIndex,
	pub operand_index: usize,
}

struct ValueData {
	producer: NodeIndex,
	shape: SmallVec<[usize; 4]>,
	users: Vec<Use>,
}

struct NodeData {
	name: String,
	kind: OpKind,
	generally_injective: bool,
	operands: SmallVec<[ValueIndex; 2]>,
	results: SmallVec<[ValueIndex; 1]>,
}

type NodeVec = IndexVec<NodeIndex, NodeData>;
type ValueVec = IndexVec<ValueIndex, ValueData>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphConnectError;

/// Arena of nodes and values.
///
/// A node can only consume values that already exist, so node indexes are a
/// valid topological order and the graph is acyclic by construction.
pub struct Graph {
	nodes_by_name: HashMap<String, NodeIndex>,
	nodes: NodeVec,
	values: ValueVec,
}

impl Graph {
	pub fn new() -> Self {
		Self {
			nodes_by_name: HashMap::new(),
			nodes: NodeVec::new(),
			values: ValueVec::new(),
		}
	}

	/// Adds a node consuming `operands` and producing one value per entry of
	/// `result_shapes`. The node is generally injective iff its kind is trivial;
	/// use `set_generally_injective()` to override.
	pub fn add_node<S: Into<String>>(
		&mut self,
		name: S,
		kind: OpKind,
		operands: &[ValueIndex],
		result_shapes: &[&[usize]],
	) -> Result<NodeIndex, ErrPack<GraphConnectError>> {
		let name = name.into();
		for &operand in operands {
			if self.values.get(operand).is_none() {
				cold_path();
				return Err(ErrPack::with_message(
					GraphConnectError,
					format!("Node '{name}' uses unknown value {}", operand.raw),
				));
			}
		}
		let index = self.nodes.next_index();
		match self.nodes_by_name.entry(name.clone()) {
			hash_map::Entry::Occupied(_) => {
				cold_path();
				return Err(ErrPack::with_message(
					GraphConnectError,
					format!("Node name '{name}' is already used"),
				));
			},
			hash_map::Entry::Vacant(entry) => {
				entry.insert(index);
			},
		}

		for (operand_index, &operand) in operands.iter().enumerate() {
			self.values[operand].users.push(Use { node: index, operand_index });
		}
		let results = result_shapes
			.iter()
			.map(|shape| {
				self.values.push(ValueData {
					producer: index,
					shape: SmallVec::from_slice(shape),
					users: Vec::new(),
				})
			})
			.collect();
		let pushed = self.nodes.push(NodeData {
			name,
			kind,
			generally_injective: kind.is_trivial(),
			operands: SmallVec::from_slice(operands),
			results,
		});
		debug_assert!(pushed == index);
		Ok(index)
	}

	pub fn set_generally_injective(&mut self, node: NodeIndex, value: bool) {
		self.nodes[node].generally_injective = value;
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn value_count(&self) -> usize {
		self.values.len()
	}

	pub fn nodes(&self) -> impl DoubleEndedIterator<Item = NodeIndex> + use<> {
		self.nodes.indexes()
	}

	pub fn contains_node(&self, node: NodeIndex) -> bool {
		self.nodes.get(node).is_some()
	}

	pub fn node_by_name(&self, name: &str) -> Option<NodeIndex> {
		self.nodes_by_name.get(name).copied()
	}

	pub fn node_name(&self, node: NodeIndex) -> &str {
		match self.nodes.get(node) {
			Some(data) => data.name.as_str(),
			None => "<unknown>",
		}
	}

	pub fn operands(&self, node: NodeIndex) -> &[ValueIndex] {
		&self.nodes[node].operands
	}

	pub fn results(&self, node: NodeIndex) -> &[ValueIndex] {
		&self.nodes[node].results
	}

	pub fn producer(&self, value: ValueIndex) -> NodeIndex {
		self.values[value].producer
	}

	pub fn users(&self, value: ValueIndex) -> &[Use] {
		&self.values[value].users
	}

	pub fn shape(&self, value: ValueIndex) -> &[usize] {
		&self.values[value].shape
	}

	/// Number of elements of the value, saturating at `usize::MAX`. Used to
	/// compare values by size.
	pub fn numel(&self, value: ValueIndex) -> usize {
		self.values[value].shape.iter().fold(1, |acc, &dim| acc.saturating_mul(dim))
	}

	pub fn print_graphviz(&self) -> String {
		let mut s = String::new();
		let _ = self.__print_graphviz(&mut s);
		s
	}

	pub fn __print_graphviz<W: std::fmt::Write>(&self, w: &mut W) -> std::fmt::Result {
		writeln!(w, "digraph G {{")?;
		writeln!(w, "\trankdir=TB;")?;
		for (i, node) in self.nodes.iter_enumerated() {
			writeln!(w, "\tnode_{} [label=<<b>{}</b><br/>{}>];", i.raw, node.name, node.kind.name())?;
			if node.kind == OpKind::Reduction {
				writeln!(w, "\tnode_{} [style=filled, fillcolor=\"#ffccff\"];", i.raw)?;
			} else if node.kind == OpKind::Unsupported {
				writeln!(w, "\tnode_{} [style=filled, fillcolor=\"#cccccc\"];", i.raw)?;
			}
			for &operand in &node.operands {
				let value = &self.values[operand];
				writeln!(
					w,
					"\tnode_{} -> node_{} [label=\"{:?}\"];",
					value.producer.raw, i.raw, value.shape.as_slice()
				)?;
			}
		}
		writeln!(w, "}}")?;
		Ok(())
	}
}

impl Default for Graph {
	fn default() -> Self {
		Self::new()
	}
}

impl OpOracle for Graph {
	fn op_kind(&self, node: NodeIndex) -> OpKind {
		self.nodes[node].kind
	}

	fn is_generally_injective(&self, node: NodeIndex) -> bool {
		self.nodes[node].generally_injective
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_add_node_links_users() {
		let mut g = Graph::new();
		let a = g.add_node("a", OpKind::ElementWise, &[], &[&[4, 8]]).unwrap();
		let a_out = g.results(a)[0];
		let b = g.add_node("b", OpKind::Reduction, &[a_out], &[&[4, 1]]).unwrap();
		let b_out = g.results(b)[0];
		let c = g.add_node("c", OpKind::ElementWise, &[a_out, b_out], &[&[4, 8]]).unwrap();

		assert_eq!(g.producer(a_out), a);
		assert_eq!(
			g.users(a_out),
			&[Use { node: b, operand_index: 0 }, Use { node: c, operand_index: 0 }]
		);
		assert_eq!(g.numel(a_out), 32);
		assert_eq!(g.node_by_name("c"), Some(c));
		assert!(g.is_generally_injective(a));
		assert!(!g.is_generally_injective(b));
	}

	#[test]
	fn test_add_node_rejects_bad_input() {
		let mut g = Graph::new();
		let a = g.add_node("a", OpKind::ElementWise, &[], &[&[2]]).unwrap();
		let err = g.add_node("a", OpKind::ElementWise, &[], &[&[2]]).unwrap_err();
		assert!(err.message().contains("already used"));

		let err = g.add_node("b", OpKind::ElementWise, &[ValueIndex::new(7)], &[&[2]]).unwrap_err();
		assert!(err.message().contains("unknown value"));
		// A failed insertion leaves no trace.
		assert_eq!(g.node_count(), 1);
		assert!(g.users(g.results(a)[0]).is_empty());
	}

	#[test]
	fn test_numel_saturates() {
		let mut g = Graph::new();
		let huge = g
			.add_node("huge", OpKind::ElementWise, &[], &[&[usize::MAX, 2], &[0, usize::MAX]])
			.unwrap();
		let [big, empty] = [g.results(huge)[0], g.results(huge)[1]];
		assert_eq!(g.numel(big), usize::MAX);
		assert_eq!(g.numel(empty), 0);
	}

	#[test]
	fn test_graphviz() {
		let mut g = Graph::new();
		let a = g.add_node("a", OpKind::ElementWise, &[], &[&[3]]).unwrap();
		let a_out = g.results(a)[0];
		g.add_node("r", OpKind::Reduction, &[a_out], &[&[1]]).unwrap();
		let dot = g.print_graphviz();
		assert!(dot.starts_with("digraph G {"));
		assert!(dot.contains("node_0 -> node_1 [label=\"[3]\"];"));
		assert!(dot.contains("fillcolor=\"#ffccff\""));
	}
}

//--------------------------------------------------------------------------------------------------
