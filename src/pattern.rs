//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use smallvec::SmallVec;
use thin_vec::ThinVec;

use crate::ErrPack;
use crate::error::FusionError;
use crate::graph::node_set::NodeSet;
use crate::graph::view::OpTopo;
use crate::graph::{Graph, NodeIndex, OpKind, OpOracle, ValueIndex};
use crate::injectivity::InjectiveSources;
use crate::options::FusionOptions;
use crate::util::cold_path;

pub mod anchor;
pub mod merge;

pub use anchor::{AnchorPattern, AnchorState, ExprPromise};

//--------------------------------------------------------------------------------------------------

/// Group of non-reduction nodes whose value is represented by `sink`.
///
/// Invariant: `sink` is in `ops`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrivialPattern {
	ops: NodeSet,
	sink: NodeIndex,
}

impl TrivialPattern {
	pub fn new(mut ops: NodeSet, sink: NodeIndex) -> Self {
		ops.insert(sink);
		Self { ops, sink }
	}

	pub fn single(node: NodeIndex) -> Self {
		Self { ops: NodeSet::single(node), sink: node }
	}

	pub fn ops(&self) -> &NodeSet {
		&self.ops
	}

	pub fn sink(&self) -> NodeIndex {
		self.sink
	}
}

/// Trivial group feeding the input of a reduction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReduceUpstream {
	InjectiveSource(TrivialPattern),
	PartialShardable(TrivialPattern),
}

impl ReduceUpstream {
	pub fn trivial(&self) -> &TrivialPattern {
		match self {
			Self::InjectiveSource(t) | Self::PartialShardable(t) => t,
		}
	}
}

/// Invariant: `reduce_op` is in `ops`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReducePattern {
	ops: NodeSet,
	reduce_op: NodeIndex,
	upstream: Option<ReduceUpstream>,
}

impl ReducePattern {
	pub fn new(mut ops: NodeSet, reduce_op: NodeIndex) -> Self {
		ops.insert(reduce_op);
		Self { ops, reduce_op, upstream: None }
	}

	pub fn with_upstream(mut self, upstream: ReduceUpstream) -> Self {
		self.upstream = Some(upstream);
		self
	}

	pub fn reduce_op(&self) -> NodeIndex {
		self.reduce_op
	}

	pub fn upstream(&self) -> Option<&ReduceUpstream> {
		self.upstream.as_ref()
	}

	/// Nodes owned directly by this pattern, without the upstream group.
	pub fn own_ops(&self) -> &NodeSet {
		&self.ops
	}

	pub fn ops(&self) -> NodeSet {
		match &self.upstream {
			Some(upstream) => NodeSet::union(&self.ops, upstream.trivial().ops()),
			None => self.ops.clone(),
		}
	}

	/// Copy of `self` that also owns `extra`.
	pub fn extended(&self, extra: &NodeSet) -> Self {
		let mut result = self.clone();
		result.ops.union_with(extra);
		result
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReduceTreePattern {
	root: ReducePattern,
	children: ThinVec<ReduceTreePattern>,
}

impl ReduceTreePattern {
	pub fn new(root: ReducePattern) -> Self {
		Self { root, children: ThinVec::new() }
	}

	pub fn with_children(root: ReducePattern, children: ThinVec<Self>) -> Self {
		Self { root, children }
	}

	pub fn root(&self) -> &ReducePattern {
		&self.root
	}

	pub fn children(&self) -> &[Self] {
		&self.children
	}

	pub fn insert_child(&mut self, child: Self) {
		self.children.push(child);
	}

	pub fn ops(&self) -> NodeSet {
		let mut result = self.root.ops();
		for child in &self.children {
			result.union_with(&child.ops());
		}
		result
	}

	/// Root followed by all descendants, pre-order.
	pub fn flatten_reduce_patterns(&self) -> Vec<&ReducePattern> {
		let mut result = Vec::new();
		self.__flatten(&mut result);
		result
	}

	fn __flatten<'a>(&'a self, result: &mut Vec<&'a ReducePattern>) {
		result.push(&self.root);
		for child in &self.children {
			child.__flatten(result);
		}
	}

	pub fn depth(&self) -> usize {
		1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
	}

	/// Fuses `trivial` into the root of every tree node whose reduction takes
	/// `trivial.sink()` as a direct input. All children are visited, whether
	/// their parent matched or not, so one trivial pattern feeding several
	/// reductions fuses into all of them.
	///
	/// Returns the number of tree nodes that absorbed `trivial`.
	pub fn fuse_upstream_trivial(&mut self, topo: &OpTopo, trivial: &TrivialPattern) -> usize {
		let mut fused = 0;
		if topo.is_direct_upstream(trivial.sink(), self.root.reduce_op()) {
			self.root = self.root.extended(trivial.ops());
			fused += 1;
		}
		for child in &mut self.children {
			fused += child.fuse_upstream_trivial(topo, trivial);
		}
		fused
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReduceTreePlusTrivialPattern {
	tree: ReduceTreePattern,
	sink_trivial: TrivialPattern,

	/// Passed through to the consumer, not interpreted here.
	pub fake_reduce_iter_idx: Vec<usize>,
}

impl ReduceTreePlusTrivialPattern {
	pub fn new(tree: ReduceTreePattern, sink_trivial: TrivialPattern) -> Self {
		Self { tree, sink_trivial, fake_reduce_iter_idx: Vec::new() }
	}

	pub fn tree(&self) -> &ReduceTreePattern {
		&self.tree
	}

	pub fn sink_trivial(&self) -> &TrivialPattern {
		&self.sink_trivial
	}

	pub fn ops(&self) -> NodeSet {
		let mut result = self.tree.ops();
		result.union_with(self.sink_trivial.ops());
		result
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaddedPattern {
	pub pattern: Pattern,
	pub padding_pos: SmallVec<[i32; 4]>,
}

/// Independent patterns scheduled side by side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HorizontalPattern {
	pub members: Vec<PaddedPattern>,
}

impl HorizontalPattern {
	pub fn ops(&self) -> NodeSet {
		let mut result = NodeSet::new();
		for member in &self.members {
			result.union_with(&member.pattern.ops());
		}
		result
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsupportedPattern {
	pub ops: NodeSet,
}

//--------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
	InjectiveSource(TrivialPattern),
	PartialShardable(TrivialPattern),
	Reduce(ReducePattern),
	ReduceTree(ReduceTreePattern),
	ReduceTreePlusTrivial(ReduceTreePlusTrivialPattern),
	Horizontal(HorizontalPattern),
	Anchor(AnchorPattern),
	Unsupported(UnsupportedPattern),
}

impl Pattern {
	pub fn name(&self) -> &'static str {
		match self {
			Self::InjectiveSource(_) => "InjectiveSource",
			Self::PartialShardable(_) => "PartialShardable",
			Self::Reduce(_) => "Reduce",
			Self::ReduceTree(_) => "ReduceTree",
			Self::ReduceTreePlusTrivial(_) => "ReduceTree+Trivial",
			Self::Horizontal(_) => "Horizontal",
			Self::Anchor(_) => "Anchor",
			Self::Unsupported(_) => "Unsupported",
		}
	}

	pub fn ops(&self) -> NodeSet {
		match self {
			Self::InjectiveSource(t) | Self::PartialShardable(t) => t.ops().clone(),
			Self::Reduce(r) => r.ops(),
			Self::ReduceTree(tree) => tree.ops(),
			Self::ReduceTreePlusTrivial(p) => p.ops(),
			Self::Horizontal(h) => h.ops(),
			Self::Anchor(a) => a.ops().clone(),
			Self::Unsupported(u) => u.ops.clone(),
		}
	}

	/// The node whose output stands for the whole pattern.
	pub fn sole_sink(&self) -> Result<NodeIndex, ErrPack<FusionError>> {
		match self {
			Self::InjectiveSource(t) | Self::PartialShardable(t) => Ok(t.sink()),
			Self::Reduce(r) => Ok(r.reduce_op()),
			Self::ReduceTree(tree) => Ok(tree.root().reduce_op()),
			Self::ReduceTreePlusTrivial(p) => Ok(p.sink_trivial().sink()),
			Self::Horizontal(_) | Self::Anchor(_) | Self::Unsupported(_) => {
				cold_path();
				Err(ErrPack::with_message(
					FusionError::MissingSoleSink,
					format!("{} pattern has no sole sink", self.name()),
				))
			},
		}
	}

	pub fn is_injective_source(&self) -> bool {
		matches!(self, Self::InjectiveSource(_))
	}

	pub fn is_partial_shardable(&self) -> bool {
		matches!(self, Self::PartialShardable(_))
	}

	pub fn is_reduce(&self) -> bool {
		matches!(self, Self::Reduce(_))
	}
}

//--------------------------------------------------------------------------------------------------

/// Returns the pre-reduction operand of `reduce_op`.
pub fn reduce_operand(graph: &Graph, reduce_op: NodeIndex) -> Result<ValueIndex, ErrPack<FusionError>> {
	match graph.operands(reduce_op) {
		&[operand] => Ok(operand),
		operands => {
			cold_path();
			Err(ErrPack::with_message(
				FusionError::ReduceOperandCount,
				format!(
					"Reduction '{}' has {} operands, expected exactly one",
					graph.node_name(reduce_op),
					operands.len()
				),
			))
		},
	}
}

/// Builds the pattern for a single node.
///
/// Trivial nodes become `InjectiveSource` when `injective` is given and says
/// so, and `PartialShardable` otherwise.
pub fn classify_leaf(
	graph: &Graph,
	oracle: &dyn OpOracle,
	node: NodeIndex,
	injective: Option<&InjectiveSources>,
) -> Result<Pattern, ErrPack<FusionError>> {
	let kind = oracle.op_kind(node);
	let pattern = match kind {
		OpKind::Reduction => {
			reduce_operand(graph, node)?;
			Pattern::Reduce(ReducePattern::new(NodeSet::new(), node))
		},
		OpKind::ElementWise | OpKind::Broadcast | OpKind::Injective => {
			let is_source = match injective {
				Some(injective) => injective.is_injective_source(node)?,
				None => false,
			};
			if is_source {
				Pattern::InjectiveSource(TrivialPattern::single(node))
			} else {
				Pattern::PartialShardable(TrivialPattern::single(node))
			}
		},
		OpKind::Unsupported => Pattern::Unsupported(UnsupportedPattern { ops: NodeSet::single(node) }),
	};
	log::trace!("classify_leaf: '{}' {} -> {}", graph.node_name(node), kind.name(), pattern.name());
	Ok(pattern)
}

/// Classifies every node of the view, in ascending node order.
pub fn classify_graph(
	topo: &OpTopo,
	oracle: &dyn OpOracle,
	options: &FusionOptions,
) -> Result<Vec<Pattern>, ErrPack<FusionError>> {
	let injective = if options.detect_injective_sources {
		Some(InjectiveSources::new(topo, oracle))
	} else {
		None
	};
	topo.ops()
		.iter()
		.map(|node| classify_leaf(topo.graph(), oracle, node, injective.as_ref()))
		.collect()
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
