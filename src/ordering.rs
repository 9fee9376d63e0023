//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::ErrPack;
use crate::error::FusionError;
use crate::graph::{Graph, NodeIndex, ValueIndex};
use crate::options::FusionOptions;
use crate::pattern::{Pattern, ReducePattern, TrivialPattern, reduce_operand};
use crate::util::cold_path;

//--------------------------------------------------------------------------------------------------

/// Stable sort of statements by the order key of their sole sink.
///
/// Fails without touching `stmts` if any statement has no sole sink.
pub fn sort_by_sink_order<K: Ord>(
	stmts: &mut [&Pattern],
	order_key_of: impl Fn(NodeIndex) -> K,
) -> Result<(), ErrPack<FusionError>> {
	let mut keyed = Vec::with_capacity(stmts.len());
	for &stmt in stmts.iter() {
		keyed.push((order_key_of(stmt.sole_sink()?), stmt));
	}
	keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
	for (slot, (_, stmt)) in stmts.iter_mut().zip(keyed) {
		*slot = stmt;
	}
	Ok(())
}

//--------------------------------------------------------------------------------------------------

fn trivial_shape_value(
	graph: &Graph,
	trivial: &TrivialPattern,
	options: &FusionOptions,
) -> Result<ValueIndex, ErrPack<FusionError>> {
	let sink = trivial.sink();
	let idx = options.result_idx.select(graph, sink);
	match graph.results(sink).get(idx) {
		Some(&value) => Ok(value),
		None => {
			cold_path();
			Err(ErrPack::with_message(
				FusionError::ResultIndexOutOfBounds,
				format!(
					"Sink '{}' has {} results, result {idx} requested",
					graph.node_name(sink),
					graph.results(sink).len()
				),
			))
		},
	}
}

fn reduce_shape_value(
	graph: &Graph,
	reduce: &ReducePattern,
) -> Result<ValueIndex, ErrPack<FusionError>> {
	reduce_operand(graph, reduce.reduce_op())
}

/// Picks the value whose shape stands for the whole pattern.
///
/// For trivial patterns this is a result of the sink, for reductions the
/// pre-reduction input, which is generally the largest value involved.
pub fn representative_shape_value(
	graph: &Graph,
	pattern: &Pattern,
	options: &FusionOptions,
) -> Result<ValueIndex, ErrPack<FusionError>> {
	match pattern {
		Pattern::InjectiveSource(t) | Pattern::PartialShardable(t) => {
			trivial_shape_value(graph, t, options)
		},
		Pattern::Reduce(r) => reduce_shape_value(graph, r),
		Pattern::ReduceTree(tree) => reduce_shape_value(graph, tree.root()),
		Pattern::ReduceTreePlusTrivial(p) => reduce_shape_value(graph, p.tree().root()),
		Pattern::Anchor(a) => Ok(a.anchor()),
		Pattern::Horizontal(h) => {
			let mut best: Option<ValueIndex> = None;
			for member in &h.members {
				let value = representative_shape_value(graph, &member.pattern, options)?;
				match best {
					Some(b) if graph.numel(b) >= graph.numel(value) => {},
					_ => best = Some(value),
				}
			}
			best.ok_or_else(|| {
				cold_path();
				ErrPack::with_message(FusionError::MissingSoleSink, "Horizontal pattern has no members")
			})
		},
		Pattern::Unsupported(_) => {
			cold_path();
			Err(ErrPack::with_message(
				FusionError::MissingSoleSink,
				"Unsupported pattern has no representative value",
			))
		},
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
