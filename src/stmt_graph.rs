//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use smallvec::SmallVec;

use crate::error::FusionError;
use crate::graph::NodeIndex;
use crate::graph::node_set::NodeSet;
use crate::graph::view::OpTopo;
use crate::pattern::Pattern;
use crate::topo_walker::TopoWalker;
use crate::util::cold_path;
use crate::util::index_vec::IndexVec;
use crate::{ErrPack, define_index_type};

//--------------------------------------------------------------------------------------------------

define_index_type!(StmtIndex);

type StmtList = SmallVec<[StmtIndex; 4]>;

fn try_push_back(list: &mut StmtList, stmt: StmtIndex) {
	if !list.contains(&stmt) {
		list.push(stmt);
	}
}

/// Dependency graph over a set of statements (patterns) whose ops may overlap.
///
/// Edges are derived from the node-level adjacency of the view:
/// - a statement depends on the owner of each of its input nodes, but only
///   when that node has exactly one owner;
/// - every owner of every consumer of a statement's sole sink is a successor.
///
/// Both edge lists are computed once by `build()`.
pub struct StmtGraph<'p> {
	stmts: &'p [Pattern],
	stmt_ops: IndexVec<StmtIndex, NodeSet>,
	sinks: IndexVec<StmtIndex, NodeIndex>,
	inputs: IndexVec<StmtIndex, StmtList>,
	outputs: IndexVec<StmtIndex, StmtList>,
}

impl<'p> StmtGraph<'p> {
	pub fn build(topo: &OpTopo, stmts: &'p [Pattern]) -> Result<Self, ErrPack<FusionError>> {
		let graph = topo.graph();

		let mut stmt_ops = IndexVec::with_capacity(stmts.len());
		let mut sinks = IndexVec::with_capacity(stmts.len());
		for stmt in stmts {
			stmt_ops.push(stmt.ops());
			sinks.push(stmt.sole_sink()?);
		}

		let mut owners: IndexVec<NodeIndex, SmallVec<[StmtIndex; 1]>> =
			IndexVec::from_elem(SmallVec::new(), graph.node_count());
		for (stmt, ops) in stmt_ops.iter_enumerated() {
			for node in ops.iter() {
				let Some(node_owners) = owners.get_mut(node).filter(|_| topo.contains(node)) else {
					cold_path();
					return Err(ErrPack::with_message(
						FusionError::NodeNotInView,
						format!("{} statement uses node {} outside the view", stmts_name(stmts, stmt), node.raw),
					));
				};
				node_owners.push(stmt);
			}
		}

		let mut inputs: IndexVec<StmtIndex, StmtList> =
			IndexVec::from_elem(StmtList::new(), stmts.len());
		let mut outputs: IndexVec<StmtIndex, StmtList> =
			IndexVec::from_elem(StmtList::new(), stmts.len());
		for (stmt, ops) in stmt_ops.iter_enumerated() {
			let stmt_inputs = &mut inputs[stmt];
			for node in ops.iter() {
				topo.visit_input_ops(node, &mut |input| {
					if let [owner] = owners[input].as_slice()
						&& *owner != stmt
					{
						try_push_back(stmt_inputs, *owner);
					}
				});
			}

			let stmt_outputs = &mut outputs[stmt];
			topo.visit_output_ops(sinks[stmt], &mut |output| {
				for &owner in &owners[output] {
					try_push_back(stmt_outputs, owner);
				}
			});
		}

		let edges: usize = inputs.iter().map(SmallVec::len).sum();
		log::debug!("StmtGraph: {} statements, {edges} dependency edges", stmts.len());

		Ok(Self { stmts, stmt_ops, sinks, inputs, outputs })
	}

	pub fn len(&self) -> usize {
		self.stmts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stmts.is_empty()
	}

	pub fn stmt_indexes(&self) -> impl DoubleEndedIterator<Item = StmtIndex> + use<> {
		self.sinks.indexes()
	}

	#[allow(clippy::indexing_slicing)]
	pub fn stmt(&self, stmt: StmtIndex) -> &'p Pattern {
		let stmts: &'p [Pattern] = self.stmts;
		&stmts[stmt.raw]
	}

	pub fn ops(&self, stmt: StmtIndex) -> &NodeSet {
		&self.stmt_ops[stmt]
	}

	pub fn sole_sink(&self, stmt: StmtIndex) -> NodeIndex {
		self.sinks[stmt]
	}

	/// Cached predecessors.
	pub fn inputs(&self, stmt: StmtIndex) -> &[StmtIndex] {
		&self.inputs[stmt]
	}

	/// Cached successors.
	pub fn outputs(&self, stmt: StmtIndex) -> &[StmtIndex] {
		&self.outputs[stmt]
	}

	/// Statements without predecessors.
	pub fn sources(&self) -> Vec<StmtIndex> {
		self.inputs.iter_enumerated().filter(|(_, i)| i.is_empty()).map(|(s, _)| s).collect()
	}

	pub fn topo_walker(&self) -> TopoWalker<'_, StmtIndex> {
		TopoWalker::new(
			|stmt, f| {
				for &input in &self.inputs[stmt] {
					f(input);
				}
			},
			|stmt, f| {
				for &output in &self.outputs[stmt] {
					f(output);
				}
			},
		)
	}

	/// Walks everything reachable from `sources()`, inputs first.
	pub fn walk_all(&self, f: &mut dyn FnMut(StmtIndex)) {
		self.topo_walker().walk(self.sources(), f);
	}

	pub fn print_graphviz(&self, topo: &OpTopo) -> String {
		let mut s = String::new();
		let _ = self.__print_graphviz(topo, &mut s);
		s
	}

	pub fn __print_graphviz<W: std::fmt::Write>(&self, topo: &OpTopo, w: &mut W) -> std::fmt::Result {
		let graph = topo.graph();
		writeln!(w, "digraph G {{")?;
		writeln!(w, "\trankdir=TB;")?;
		for stmt in self.stmt_indexes() {
			writeln!(
				w,
				"\tsubgraph cluster_{} {{ label=\"{}\" labelloc=\"b\" labeljust=\"l\"",
				stmt.raw,
				self.stmt(stmt).name()
			)?;
			for node in self.stmt_ops[stmt].iter() {
				writeln!(w, "\t\tstmt_{}_node_{} [label=\"{}\"];", stmt.raw, node.raw, graph.node_name(node))?;
			}
			writeln!(w, "\t}}")?;
		}
		for stmt in self.stmt_indexes() {
			let sink = self.sinks[stmt];
			for &output in &self.outputs[stmt] {
				let style = if self.inputs[output].contains(&stmt) { "" } else { " [style=dashed]" };
				writeln!(
					w,
					"\tstmt_{}_node_{} -> stmt_{}_node_{}{style};",
					stmt.raw,
					sink.raw,
					output.raw,
					self.sinks[output].raw
				)?;
			}
		}
		writeln!(w, "}}")?;
		Ok(())
	}
}

fn stmts_name(stmts: &[Pattern], stmt: StmtIndex) -> &'static str {
	stmts.get(stmt.raw).map_or("<unknown>", Pattern::name)
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
