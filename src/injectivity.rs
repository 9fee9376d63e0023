//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::ErrPack;
use crate::error::FusionError;
use crate::graph::view::OpTopo;
use crate::graph::{NodeIndex, OpOracle};
use crate::topo_walker::TopoWalker;
use crate::util::cold_path;
use crate::util::index_vec::IndexVec;

//--------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Injectivity {
	Unvisited,
	Injective,
	NotInjective,
}

/// Answers "is this node reachable from pure sources through generally
/// injective nodes only" for every node of a view.
///
/// The answer for all nodes is computed up front in a single topological pass,
/// so queries are a table lookup.
pub struct InjectiveSources {
	table: IndexVec<NodeIndex, Injectivity>,
}

impl InjectiveSources {
	pub fn new(topo: &OpTopo, oracle: &dyn OpOracle) -> Self {
		let graph = topo.graph();
		let mut table = IndexVec::from_elem(Injectivity::Unvisited, graph.node_count());

		let starts: Vec<NodeIndex> =
			topo.ops().iter().filter(|&node| topo.input_count(node) == 0).collect();

		let walker: TopoWalker<NodeIndex> = TopoWalker::new(
			|node, f| topo.visit_input_ops(node, f),
			|node, f| topo.visit_output_ops(node, f),
		);
		let mut injective_count = 0;
		walker.walk(starts.iter().copied(), &mut |node| {
			let mut is_injective = true;
			if topo.input_count(node) != 0 {
				is_injective = oracle.is_generally_injective(node);
				topo.visit_input_ops(node, &mut |input| {
					// Inputs are always visited first.
					debug_assert!(table[input] != Injectivity::Unvisited);
					is_injective &= table[input] == Injectivity::Injective;
				});
			}
			table[node] = if is_injective {
				injective_count += 1;
				Injectivity::Injective
			} else {
				Injectivity::NotInjective
			};
			log::trace!(
				"InjectiveSources: '{}' injective={is_injective}",
				graph.node_name(node)
			);
		});
		log::debug!(
			"InjectiveSources: {} sources, {injective_count} of {} nodes injective",
			starts.len(),
			topo.ops().len()
		);

		Self { table }
	}

	pub fn is_injective_source(&self, node: NodeIndex) -> Result<bool, ErrPack<FusionError>> {
		match self.table.get(node) {
			Some(Injectivity::Injective) => Ok(true),
			Some(Injectivity::NotInjective) => Ok(false),
			Some(Injectivity::Unvisited) | None => {
				cold_path();
				Err(ErrPack::with_message(
					FusionError::UnvisitedNode,
					format!(
						"InjectiveSources: node {} was not reached by the propagation pass",
						node.raw
					),
				))
			},
		}
	}

	/// All injective-source nodes, in ascending index order.
	pub fn injective_sources(&self) -> impl Iterator<Item = NodeIndex> + '_ {
		self.table
			.iter_enumerated()
			.filter(|(_, state)| **state == Injectivity::Injective)
			.map(|(node, _)| node)
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{Graph, OpKind};

	#[test]
	fn test_injectivity_stops_at_non_injective_node() {
		// a -> b -> r -> d
		//      c ------> d
		let mut g = Graph::new();
		let a = g.add_node("a", OpKind::ElementWise, &[], &[&[8]]).unwrap();
		let a_out = g.results(a)[0];
		let b = g.add_node("b", OpKind::Broadcast, &[a_out], &[&[4, 8]]).unwrap();
		let b_out = g.results(b)[0];
		let r = g.add_node("r", OpKind::Reduction, &[b_out], &[&[4]]).unwrap();
		let r_out = g.results(r)[0];
		let c = g.add_node("c", OpKind::Unsupported, &[], &[&[4]]).unwrap();
		let c_out = g.results(c)[0];
		let d = g.add_node("d", OpKind::ElementWise, &[r_out, c_out], &[&[4]]).unwrap();

		let topo = OpTopo::whole(&g);
		let inj = InjectiveSources::new(&topo, &g);
		assert!(inj.is_injective_source(a).unwrap());
		assert!(inj.is_injective_source(b).unwrap());
		assert!(!inj.is_injective_source(r).unwrap());
		// Sources are injective whatever their kind.
		assert!(inj.is_injective_source(c).unwrap());
		assert!(!inj.is_injective_source(d).unwrap());
		assert_eq!(inj.injective_sources().collect::<Vec<_>>(), vec![a, b, c]);
	}

	#[test]
	fn test_view_boundary_makes_new_sources() {
		let mut g = Graph::new();
		let a = g.add_node("a", OpKind::ElementWise, &[], &[&[8]]).unwrap();
		let a_out = g.results(a)[0];
		let r = g.add_node("r", OpKind::Reduction, &[a_out], &[&[1]]).unwrap();
		let r_out = g.results(r)[0];
		let e = g.add_node("e", OpKind::ElementWise, &[r_out], &[&[1]]).unwrap();

		let topo = OpTopo::new(&g, [e]);
		let inj = InjectiveSources::new(&topo, &g);
		assert!(inj.is_injective_source(e).unwrap());

		let err = inj.is_injective_source(a).unwrap_err();
		assert_eq!(err.code, FusionError::UnvisitedNode);
		assert!(err.code.is_precondition_violation());
	}

	#[test]
	fn test_oracle_override() {
		let mut g = Graph::new();
		let a = g.add_node("a", OpKind::ElementWise, &[], &[&[8]]).unwrap();
		let a_out = g.results(a)[0];
		let b = g.add_node("b", OpKind::Injective, &[a_out], &[&[8]]).unwrap();
		g.set_generally_injective(b, false);

		let topo = OpTopo::whole(&g);
		let inj = InjectiveSources::new(&topo, &g);
		assert!(!inj.is_injective_source(b).unwrap());
	}
}

//--------------------------------------------------------------------------------------------------
