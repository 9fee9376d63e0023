//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use super::{Pattern, TrivialPattern};
use crate::ErrPack;
use crate::error::FusionError;
use crate::graph::node_set::NodeSet;
use crate::graph::{Graph, NodeIndex, OpOracle, ValueIndex};
use crate::util::cold_path;

//--------------------------------------------------------------------------------------------------

/// Commitment about how the value `anchor` is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExprPromise {
	pub anchor: ValueIndex,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AnchorState {
	pub promises: Vec<ExprPromise>,
}

impl AnchorState {
	pub fn new() -> Self {
		Self { promises: Vec::new() }
	}

	pub fn single(promise: ExprPromise) -> Self {
		Self { promises: vec![promise] }
	}

	pub fn add_promise(&mut self, promise: ExprPromise) {
		self.promises.push(promise);
	}
}

/// Only trivial and reduce patterns can promise a value.
pub fn init_expr_promise(
	pattern: &Pattern,
	anchor: ValueIndex,
) -> Result<ExprPromise, ErrPack<FusionError>> {
	match pattern {
		Pattern::InjectiveSource(_) | Pattern::PartialShardable(_) | Pattern::Reduce(_) => {
			Ok(ExprPromise { anchor })
		},
		Pattern::ReduceTree(_)
		| Pattern::ReduceTreePlusTrivial(_)
		| Pattern::Horizontal(_)
		| Pattern::Anchor(_)
		| Pattern::Unsupported(_) => {
			cold_path();
			Err(ErrPack::with_message(
				FusionError::IllegalPromise,
				format!("Cannot init an expression promise from a {} pattern", pattern.name()),
			))
		},
	}
}

//--------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorPattern {
	ops: NodeSet,
	anchor: ValueIndex,
	pub state: AnchorState,
}

impl AnchorPattern {
	pub fn new(ops: NodeSet, anchor: ValueIndex, state: AnchorState) -> Self {
		Self { ops, anchor, state }
	}

	/// Anchor pattern over the ops of `pattern` with a single promise for
	/// `anchor`.
	pub fn from_pattern(pattern: &Pattern, anchor: ValueIndex) -> Result<Self, ErrPack<FusionError>> {
		let promise = init_expr_promise(pattern, anchor)?;
		Ok(Self::new(pattern.ops(), anchor, AnchorState::single(promise)))
	}

	pub fn ops(&self) -> &NodeSet {
		&self.ops
	}

	pub fn anchor(&self) -> ValueIndex {
		self.anchor
	}

	/// A pattern can be recomputed if it was not produced by merging several
	/// promises and only contains trivial ops.
	pub fn can_recompute(&self, oracle: &dyn OpOracle) -> bool {
		if self.state.promises.len() > 1 {
			return false;
		}
		self.ops.iter().all(|op| oracle.op_kind(op).is_trivial())
	}

	/// Turns a recomputable anchor pattern back into a trivial pattern sinked at
	/// the producer of the anchor value.
	pub fn recover_trivial(
		&self,
		graph: &Graph,
		oracle: &dyn OpOracle,
	) -> Result<TrivialPattern, ErrPack<FusionError>> {
		let producer: NodeIndex = graph.producer(self.anchor);
		if !self.can_recompute(oracle) || !self.ops.contains(producer) {
			cold_path();
			return Err(ErrPack::with_message(
				FusionError::CannotRecompute,
				format!(
					"Anchor pattern at '{}' cannot be turned into a trivial pattern",
					graph.node_name(producer)
				),
			));
		}
		Ok(TrivialPattern::new(self.ops.clone(), producer))
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::OpKind;
	use crate::pattern::{HorizontalPattern, ReducePattern};

	#[test]
	fn test_promises_only_from_leaf_like_patterns() {
		let mut g = Graph::new();
		let a = g.add_node("a", OpKind::ElementWise, &[], &[&[8]]).unwrap();
		let a_out = g.results(a)[0];
		let r = g.add_node("r", OpKind::Reduction, &[a_out], &[&[1]]).unwrap();

		let trivial = Pattern::PartialShardable(TrivialPattern::single(a));
		assert_eq!(init_expr_promise(&trivial, a_out).unwrap(), ExprPromise { anchor: a_out });
		let reduce = Pattern::Reduce(ReducePattern::new(NodeSet::new(), r));
		assert!(init_expr_promise(&reduce, a_out).is_ok());

		let horizontal = Pattern::Horizontal(HorizontalPattern { members: Vec::new() });
		let err = init_expr_promise(&horizontal, a_out).unwrap_err();
		assert_eq!(err.code, FusionError::IllegalPromise);
	}

	#[test]
	fn test_recover_trivial() {
		let mut g = Graph::new();
		let a = g.add_node("a", OpKind::ElementWise, &[], &[&[8]]).unwrap();
		let a_out = g.results(a)[0];
		let b = g.add_node("b", OpKind::Broadcast, &[a_out], &[&[2, 8]]).unwrap();
		let b_out = g.results(b)[0];
		let r = g.add_node("r", OpKind::Reduction, &[b_out], &[&[2]]).unwrap();

		let ops: NodeSet = [a, b].into_iter().collect();
		let anchor = AnchorPattern::new(ops.clone(), b_out, AnchorState::new());
		let trivial = anchor.recover_trivial(&g, &g).unwrap();
		assert_eq!(trivial.sink(), b);
		assert_eq!(trivial.ops(), &ops);

		let mut with_reduce = ops;
		with_reduce.insert(r);
		let anchor = AnchorPattern::new(with_reduce, b_out, AnchorState::new());
		let err = anchor.recover_trivial(&g, &g).unwrap_err();
		assert_eq!(err.code, FusionError::CannotRecompute);
	}
}

//--------------------------------------------------------------------------------------------------
