//! Mutable per-node evaluation state owned by the executor.

use crate::graph::{Node, NodeIndex, OutputPortKey};
use crate::unit::{UnitStorage, ValueUsage};
use crate::value::BoxedValue;

/// Scheduling lifecycle of one node.
///
/// A node's unit is invoked by at most one thread at a time; a request to
/// re-run a node that is currently running is coalesced into
/// `RunningAndRescheduled` instead of being queued a second time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeScheduleState {
    NotScheduled,
    Scheduled,
    Running,
    RunningAndRescheduled,
}

pub(crate) struct InputState {
    /// The delivered value, if any. Temporarily taken out while it is
    /// loaned to a running invocation.
    pub value: Option<BoxedValue>,
    pub usage: ValueUsage,
    /// Set when a value is first delivered; never cleared, so a second
    /// delivery is detectable even while the value is loaned out.
    pub ready: bool,
}

pub(crate) struct OutputState {
    pub usage: ValueUsage,
    /// Targets that have not yet declared this value unused.
    pub remaining_targets: usize,
    pub computed: bool,
}

pub(crate) struct NodeState {
    pub inputs: Vec<InputState>,
    pub outputs: Vec<OutputState>,
    /// Inputs with usage `Used` whose value has not arrived yet.
    pub missing_required_inputs: usize,
    pub schedule_state: NodeScheduleState,
    pub finished: bool,
    pub has_side_effects: bool,
    /// Defaults loaded and usage hints applied.
    pub initialized: bool,
    /// The unit has been invoked at least once this series.
    pub ran: bool,
    pub storage: UnitStorage,
}

impl NodeState {
    pub fn for_node(node: &Node) -> Self {
        let inputs = node
            .inputs()
            .iter()
            .map(|_| InputState {
                value: None,
                usage: ValueUsage::Maybe,
                ready: false,
            })
            .collect();
        let outputs = node
            .outputs()
            .iter()
            .map(|port| OutputState {
                // An output with no links can never be demanded.
                usage: if port.targets().is_empty() {
                    ValueUsage::Unused
                } else {
                    ValueUsage::Maybe
                },
                remaining_targets: port.targets().len(),
                computed: false,
            })
            .collect();
        Self {
            inputs,
            outputs,
            missing_required_inputs: 0,
            schedule_state: NodeScheduleState::NotScheduled,
            finished: false,
            has_side_effects: false,
            initialized: false,
            ran: false,
            storage: UnitStorage::none(),
        }
    }

    /// Whether there is anything left for this node to do: a demanded,
    /// uncomputed output, or a forced side effect.
    pub fn wants_run(&self) -> bool {
        if self.finished {
            return false;
        }
        if self.has_side_effects {
            return true;
        }
        self.outputs
            .iter()
            .any(|out| out.usage == ValueUsage::Used && !out.computed)
    }
}

/// Cross-node effect produced inside a node-lock critical section.
///
/// Dispatched strictly after the lock is released, which keeps the
/// one-lock-at-a-time invariant structural instead of a matter of
/// discipline.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Notification {
    /// Run this node (or coalesce into its current run).
    Schedule(NodeIndex),
    /// A consumer now definitely needs this output.
    OutputRequired(OutputPortKey),
    /// A consumer will never read this output; it lost one target.
    OutputUnused(OutputPortKey),
}
