//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use super::anchor::{AnchorPattern, AnchorState};
use super::{
	Pattern, ReducePattern, ReduceTreePattern, ReduceTreePlusTrivialPattern, TrivialPattern,
};
use crate::ErrPack;
use crate::error::FusionError;
use crate::graph::node_set::NodeSet;
use crate::graph::view::OpTopo;
use crate::util::cold_path;

//--------------------------------------------------------------------------------------------------

/// Merges `upstream` into `downstream`.
///
/// Only a handful of ordered pairs can be merged. Any other pair returns
/// `FusionError::IllegalMerge`; the fusion policy should treat that as "this
/// pairing does not apply". `topo` is used to find the reductions an upstream
/// trivial pattern feeds directly.
pub fn merge(
	topo: &OpTopo,
	upstream: &Pattern,
	downstream: &Pattern,
) -> Result<Pattern, ErrPack<FusionError>> {
	let result = match upstream {
		Pattern::PartialShardable(first) => match downstream {
			Pattern::PartialShardable(second) => {
				Pattern::PartialShardable(merge_trivial_trivial(first, second))
			},
			Pattern::Reduce(second) => Pattern::Reduce(merge_trivial_reduce(first, second)),
			Pattern::ReduceTree(second) => {
				Pattern::ReduceTree(merge_trivial_reduce_tree(topo, first, second))
			},
			Pattern::ReduceTreePlusTrivial(second) => {
				Pattern::ReduceTreePlusTrivial(merge_trivial_reduce_tree_plus_trivial(first, second))
			},
			Pattern::Anchor(second) => Pattern::Anchor(merge_trivial_anchor(first, second)),
			Pattern::InjectiveSource(_) | Pattern::Horizontal(_) | Pattern::Unsupported(_) => {
				return Err(illegal_merge(upstream, downstream));
			},
		},
		Pattern::Anchor(first) => match downstream {
			Pattern::Anchor(second) => Pattern::Anchor(merge_anchor_anchor(first, second)),
			Pattern::InjectiveSource(_)
			| Pattern::PartialShardable(_)
			| Pattern::Reduce(_)
			| Pattern::ReduceTree(_)
			| Pattern::ReduceTreePlusTrivial(_)
			| Pattern::Horizontal(_)
			| Pattern::Unsupported(_) => {
				return Err(illegal_merge(upstream, downstream));
			},
		},
		Pattern::ReduceTree(first) => match downstream {
			Pattern::PartialShardable(second) => Pattern::ReduceTreePlusTrivial(
				ReduceTreePlusTrivialPattern::new(first.clone(), second.clone()),
			),
			Pattern::InjectiveSource(_)
			| Pattern::Reduce(_)
			| Pattern::ReduceTree(_)
			| Pattern::ReduceTreePlusTrivial(_)
			| Pattern::Horizontal(_)
			| Pattern::Anchor(_)
			| Pattern::Unsupported(_) => {
				return Err(illegal_merge(upstream, downstream));
			},
		},
		Pattern::InjectiveSource(_)
		| Pattern::Reduce(_)
		| Pattern::ReduceTreePlusTrivial(_)
		| Pattern::Horizontal(_)
		| Pattern::Unsupported(_) => {
			return Err(illegal_merge(upstream, downstream));
		},
	};
	log::debug!(
		"merge: {} + {} -> {} ({} ops)",
		upstream.name(),
		downstream.name(),
		result.name(),
		result.ops().len()
	);
	Ok(result)
}

#[cold]
#[inline(never)]
fn illegal_merge(upstream: &Pattern, downstream: &Pattern) -> ErrPack<FusionError> {
	cold_path();
	log::trace!("merge: rejected {} + {}", upstream.name(), downstream.name());
	ErrPack::with_message(
		FusionError::IllegalMerge,
		format!("Cannot merge {} into {}", upstream.name(), downstream.name()),
	)
}

//--------------------------------------------------------------------------------------------------

pub fn merge_trivial_trivial(first: &TrivialPattern, second: &TrivialPattern) -> TrivialPattern {
	TrivialPattern::new(NodeSet::union(first.ops(), second.ops()), second.sink())
}

pub fn merge_trivial_reduce(first: &TrivialPattern, second: &ReducePattern) -> ReducePattern {
	second.extended(first.ops())
}

/// Fuses `first` into a copy of `second` wherever it feeds a reduction.
///
/// When no tree node takes `first.sink()` as a direct input, the ops of
/// `first` are added to the root so that no node is lost.
pub fn merge_trivial_reduce_tree(
	topo: &OpTopo,
	first: &TrivialPattern,
	second: &ReduceTreePattern,
) -> ReduceTreePattern {
	let mut result = second.clone();
	let fused = result.fuse_upstream_trivial(topo, first);
	if fused == 0 {
		log::debug!(
			"merge: '{}' feeds no reduction of the tree, fusing into the root",
			topo.graph().node_name(first.sink())
		);
		result = ReduceTreePattern::with_children(
			result.root().extended(first.ops()),
			result.children().iter().cloned().collect(),
		);
	} else if fused > 1 {
		log::debug!(
			"merge: '{}' fused into {fused} reductions of the tree",
			topo.graph().node_name(first.sink())
		);
	}
	result
}

pub fn merge_trivial_reduce_tree_plus_trivial(
	first: &TrivialPattern,
	second: &ReduceTreePlusTrivialPattern,
) -> ReduceTreePlusTrivialPattern {
	let old_tree = second.tree();
	let new_tree = ReduceTreePattern::with_children(
		old_tree.root().extended(first.ops()),
		old_tree.children().iter().cloned().collect(),
	);
	let mut result = ReduceTreePlusTrivialPattern::new(new_tree, second.sink_trivial().clone());
	result.fake_reduce_iter_idx.clone_from(&second.fake_reduce_iter_idx);
	result
}

/// Merging invalidates all promises of the anchor.
pub fn merge_trivial_anchor(first: &TrivialPattern, second: &AnchorPattern) -> AnchorPattern {
	AnchorPattern::new(NodeSet::union(first.ops(), second.ops()), second.anchor(), AnchorState::new())
}

pub fn merge_anchor_anchor(first: &AnchorPattern, second: &AnchorPattern) -> AnchorPattern {
	AnchorPattern::new(NodeSet::union(first.ops(), second.ops()), first.anchor(), AnchorState::new())
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{Graph, NodeIndex, OpKind};
	use crate::pattern::anchor::ExprPromise;
	use crate::pattern::{HorizontalPattern, PaddedPattern, UnsupportedPattern};

	struct Fixture {
		g: Graph,
		t: NodeIndex,
		r1: NodeIndex,
		r2: NodeIndex,
		e: NodeIndex,
	}

	// t -> r1 -> e
	//      r2 -> e   (r2 reads a separate source s)
	fn fixture() -> Fixture {
		let mut g = Graph::new();
		let s = g.add_node("s", OpKind::ElementWise, &[], &[&[4, 4]]).unwrap();
		let t = g.add_node("t", OpKind::ElementWise, &[], &[&[4, 4]]).unwrap();
		let s_out = g.results(s)[0];
		let t_out = g.results(t)[0];
		let r1 = g.add_node("r1", OpKind::Reduction, &[t_out], &[&[4]]).unwrap();
		let r2 = g.add_node("r2", OpKind::Reduction, &[s_out], &[&[4]]).unwrap();
		let r1_out = g.results(r1)[0];
		let r2_out = g.results(r2)[0];
		let e = g.add_node("e", OpKind::ElementWise, &[r1_out, r2_out], &[&[4]]).unwrap();
		Fixture { g, t, r1, r2, e }
	}

	fn reduce(node: NodeIndex) -> ReducePattern {
		ReducePattern::new(NodeSet::new(), node)
	}

	fn all_patterns(f: &Fixture) -> Vec<Pattern> {
		let trivial = TrivialPattern::single(f.t);
		let tree = ReduceTreePattern::new(reduce(f.r1));
		vec![
			Pattern::InjectiveSource(trivial.clone()),
			Pattern::PartialShardable(trivial.clone()),
			Pattern::Reduce(reduce(f.r1)),
			Pattern::ReduceTree(tree.clone()),
			Pattern::ReduceTreePlusTrivial(ReduceTreePlusTrivialPattern::new(
				tree,
				TrivialPattern::single(f.e),
			)),
			Pattern::Horizontal(HorizontalPattern {
				members: vec![PaddedPattern {
					pattern: Pattern::PartialShardable(trivial),
					padding_pos: smallvec::smallvec![0, 2],
				}],
			}),
			Pattern::Anchor(AnchorPattern::new(
				NodeSet::single(f.e),
				f.g.results(f.e)[0],
				AnchorState::new(),
			)),
			Pattern::Unsupported(UnsupportedPattern { ops: NodeSet::single(f.r2) }),
		]
	}

	#[test]
	fn test_defined_pairs_conserve_ops() {
		let f = fixture();
		let topo = OpTopo::whole(&f.g);
		let patterns = all_patterns(&f);
		let mut defined = 0;
		for a in &patterns {
			for b in &patterns {
				match merge(&topo, a, b) {
					Ok(merged) => {
						defined += 1;
						let expected = NodeSet::union(&a.ops(), &b.ops());
						assert_eq!(merged.ops(), expected, "{} + {}", a.name(), b.name());
					},
					Err(err) => {
						assert_eq!(err.code, FusionError::IllegalMerge);
						assert!(!err.code.is_precondition_violation());
						assert!(err.message().contains(a.name()));
					},
				}
			}
		}
		assert_eq!(defined, 7);
	}

	#[test]
	fn test_trivial_into_reduce_keeps_reduce_op() {
		let f = fixture();
		let topo = OpTopo::whole(&f.g);
		let merged = merge(
			&topo,
			&Pattern::PartialShardable(TrivialPattern::single(f.t)),
			&Pattern::Reduce(reduce(f.r1)),
		)
		.unwrap();
		let Pattern::Reduce(r) = merged else {
			panic!("expected Reduce, got {}", merged.name());
		};
		assert_eq!(r.reduce_op(), f.r1);
		assert_eq!(r.ops(), [f.t, f.r1].into_iter().collect::<NodeSet>());
	}

	#[test]
	fn test_unrelated_trivial_lands_in_tree_root() {
		let f = fixture();
		let topo = OpTopo::whole(&f.g);
		// Only r1 reads t; this tree never does.
		let tree = ReduceTreePattern::new(reduce(f.r2));
		let upstream = Pattern::PartialShardable(TrivialPattern::single(f.t));
		let downstream = Pattern::ReduceTree(tree);

		let merged = merge(&topo, &upstream, &downstream).unwrap();
		let Pattern::ReduceTree(m) = &merged else {
			panic!("expected ReduceTree, got {}", merged.name());
		};
		assert_eq!(merged.ops(), NodeSet::union(&upstream.ops(), &downstream.ops()));
		assert!(m.root().own_ops().contains(f.t));
		assert_eq!(m.root().reduce_op(), f.r2);
		assert!(m.children().is_empty());
	}

	#[test]
	fn test_trivial_into_reduce_tree_plus_trivial_touches_root_only() {
		let f = fixture();
		let topo = OpTopo::whole(&f.g);
		let mut tree = ReduceTreePattern::new(reduce(f.r1));
		tree.insert_child(ReduceTreePattern::new(reduce(f.r2)));
		let mut rtpt = ReduceTreePlusTrivialPattern::new(tree, TrivialPattern::single(f.e));
		rtpt.fake_reduce_iter_idx = vec![1, 3];

		let merged = merge(
			&topo,
			&Pattern::PartialShardable(TrivialPattern::single(f.t)),
			&Pattern::ReduceTreePlusTrivial(rtpt.clone()),
		)
		.unwrap();
		let Pattern::ReduceTreePlusTrivial(m) = merged else {
			panic!("expected ReduceTree+Trivial, got {}", merged.name());
		};
		assert!(m.tree().root().own_ops().contains(f.t));
		assert_eq!(m.tree().children(), rtpt.tree().children());
		assert_eq!(m.sink_trivial(), rtpt.sink_trivial());
		assert_eq!(m.fake_reduce_iter_idx, vec![1, 3]);
	}

	#[test]
	fn test_anchor_merges_reset_state() {
		let f = fixture();
		let topo = OpTopo::whole(&f.g);
		let t_out = f.g.results(f.t)[0];
		let e_out = f.g.results(f.e)[0];
		let a1 = AnchorPattern::new(
			NodeSet::single(f.t),
			t_out,
			AnchorState::single(ExprPromise { anchor: t_out }),
		);
		let a2 = AnchorPattern::new(
			NodeSet::single(f.e),
			e_out,
			AnchorState::single(ExprPromise { anchor: e_out }),
		);

		let Pattern::Anchor(m) = merge(&topo, &Pattern::Anchor(a1), &Pattern::Anchor(a2.clone())).unwrap()
		else {
			panic!("expected Anchor");
		};
		assert_eq!(m.anchor(), t_out);
		assert!(m.state.promises.is_empty());

		let trivial = Pattern::PartialShardable(TrivialPattern::single(f.r1));
		let Pattern::Anchor(m) = merge(&topo, &trivial, &Pattern::Anchor(a2)).unwrap() else {
			panic!("expected Anchor");
		};
		assert_eq!(m.anchor(), e_out);
		assert!(m.state.promises.is_empty());
	}

	#[test]
	fn test_reduce_tree_then_trivial() {
		let f = fixture();
		let topo = OpTopo::whole(&f.g);
		let tree = ReduceTreePattern::new(reduce(f.r1));
		let merged = merge(
			&topo,
			&Pattern::ReduceTree(tree.clone()),
			&Pattern::PartialShardable(TrivialPattern::single(f.e)),
		)
		.unwrap();
		let Pattern::ReduceTreePlusTrivial(m) = merged else {
			panic!("expected ReduceTree+Trivial");
		};
		assert_eq!(m.tree(), &tree);
		assert_eq!(m.sink_trivial().sink(), f.e);
		assert!(m.fake_reduce_iter_idx.is_empty());
	}
}

//--------------------------------------------------------------------------------------------------
