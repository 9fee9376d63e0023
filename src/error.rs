//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::ErrPack;
use crate::graph::GraphConnectError;

//--------------------------------------------------------------------------------------------------

/// Failure codes of the fusion core.
///
/// `IllegalMerge` is an ordinary answer to "can these two patterns be merged"
/// and the fusion policy is expected to handle it. Every other code means the
/// caller handed us something malformed, and the current fusion attempt should
/// be abandoned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FusionError {
	IllegalMerge,

	/// A reduction node does not have exactly one operand.
	ReduceOperandCount,
	MissingSoleSink,
	UnvisitedNode,
	NodeNotInView,
	IllegalPromise,
	CannotRecompute,
	ResultIndexOutOfBounds,
	GraphConnect,
}

impl FusionError {
	pub fn is_precondition_violation(self) -> bool {
		!matches!(self, Self::IllegalMerge)
	}
}

impl From<GraphConnectError> for FusionError {
	fn from(_: GraphConnectError) -> Self {
		Self::GraphConnect
	}
}

impl From<ErrPack<GraphConnectError>> for ErrPack<FusionError> {
	#[cold]
	#[inline(never)]
	fn from(err: ErrPack<GraphConnectError>) -> Self {
		Self {
			code: FusionError::GraphConnect,
			extra: err.extra,
		}
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{Graph, OpKind};

	fn build(g: &mut Graph) -> Result<(), ErrPack<FusionError>> {
		g.add_node("x", OpKind::ElementWise, &[], &[&[1]])?;
		g.add_node("x", OpKind::ElementWise, &[], &[&[1]])?;
		Ok(())
	}

	#[test]
	fn test_graph_errors_convert() {
		let mut g = Graph::new();
		let err = build(&mut g).unwrap_err();
		assert_eq!(err.code, FusionError::GraphConnect);
		assert!(err.code.is_precondition_violation());
		assert!(err.message().contains("'x'"));
		assert!(err.to_string().starts_with("(ErrPack: code=GraphConnect, message="));
		assert_eq!(FusionError::from(GraphConnectError), FusionError::GraphConnect);
	}
}

//--------------------------------------------------------------------------------------------------
