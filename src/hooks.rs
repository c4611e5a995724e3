//! Pluggable execution hooks with no-op defaults.

use std::any::Any;

use crate::graph::{InputPortKey, NodeIndex, OutputPortKey};

/// Tells the executor which nodes must run even when none of their outputs
/// are demanded. Consulted once per executor invocation series.
pub trait SideEffectProvider: Send + Sync {
    fn nodes_with_side_effects(
        &self,
        user_data: Option<&(dyn Any + Send + Sync)>,
    ) -> Vec<NodeIndex>;
}

/// Observation callbacks fired by the executor. Purely observational; a
/// logger never affects scheduling. All methods default to no-ops.
pub trait EvalLogger: Send + Sync {
    /// A unit invocation is starting.
    fn node_started(&self, _node: NodeIndex, _name: &str) {}

    /// A unit invocation returned.
    fn node_finished(&self, _node: NodeIndex, _name: &str) {}

    /// A committed value was forwarded along a link.
    fn value_forwarded(&self, _from: OutputPortKey, _to: InputPortKey) {}

    /// A unit broke the calling convention (double-set output, input
    /// delivered twice, marking a used input unused).
    fn contract_violation(&self, _node: NodeIndex, _message: &str) {}

    /// A unit invocation ended with demanded outputs unset while requesting
    /// no further inputs; the listed outputs will never be produced.
    fn outputs_missing(&self, _node: NodeIndex, _missing: &[String]) {}
}

/// Logger used when the caller installs none.
pub(crate) struct NullLogger;

impl EvalLogger for NullLogger {}
