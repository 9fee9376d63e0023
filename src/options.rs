//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::sync::Arc;

use crate::graph::{Graph, NodeIndex};

//--------------------------------------------------------------------------------------------------

/// Picks which result of a sink node carries the shape of its pattern.
#[derive(Clone)]
pub enum ResultIdxSelector {
	Constant(usize),
	Custom(Arc<dyn Fn(&Graph, NodeIndex) -> usize + Send + Sync>),
}

impl ResultIdxSelector {
	pub fn custom(f: impl Fn(&Graph, NodeIndex) -> usize + Send + Sync + 'static) -> Self {
		Self::Custom(Arc::new(f))
	}

	pub fn select(&self, graph: &Graph, sink: NodeIndex) -> usize {
		match self {
			Self::Constant(idx) => *idx,
			Self::Custom(f) => f(graph, sink),
		}
	}
}

impl Default for ResultIdxSelector {
	fn default() -> Self {
		Self::Constant(0)
	}
}

impl std::fmt::Debug for ResultIdxSelector {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Constant(idx) => write!(f, "Constant({idx})"),
			Self::Custom(_) => write!(f, "Custom(..)"),
		}
	}
}

#[derive(Clone, Debug)]
pub struct FusionOptions {
	pub result_idx: ResultIdxSelector,

	/// When set, leaf classification turns trivial nodes that are injective
	/// sources into `InjectiveSource` patterns instead of `PartialShardable`.
	pub detect_injective_sources: bool,
}

impl FusionOptions {
	pub fn new() -> Self {
		Self {
			result_idx: ResultIdxSelector::default(),
			detect_injective_sources: false,
		}
	}

	pub fn with_injective_sources(mut self, detect: bool) -> Self {
		self.detect_injective_sources = detect;
		self
	}

	pub fn with_result_idx(mut self, selector: ResultIdxSelector) -> Self {
		self.result_idx = selector;
		self
	}
}

impl Default for FusionOptions {
	fn default() -> Self {
		Self::new()
	}
}

//--------------------------------------------------------------------------------------------------
