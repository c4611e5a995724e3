//! The concurrent, demand-driven graph evaluator.
//!
//! Values are pulled lazily: demand on a graph output walks backward to the
//! producing nodes, nodes are scheduled onto a worker pool once their
//! required inputs are present, and computed values are pushed forward along
//! links. A unit that cannot make progress returns early after requesting
//! more input and is re-invoked later, so no invocation ever blocks on
//! another node.
//!
//! Locking protocol: every node state has its own mutex, and no thread ever
//! holds two node locks at once. Cross-node effects produced inside a
//! critical section are buffered as [`Notification`]s and dispatched only
//! after the lock is released. The caller-facing io buffer has a leaf lock
//! that never acquires node locks itself.

mod state;

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, trace, warn};

use crate::error::EngineError;
use crate::graph::{GRAPH_INPUTS, GRAPH_OUTPUTS, Graph, InputPortKey, Node, NodeIndex, OutputPortKey};
use crate::hooks::{EvalLogger, NullLogger, SideEffectProvider};
use crate::params::{Context, Params};
use crate::timing::ScopedTimer;
use crate::unit::ValueUsage;
use crate::value::BoxedValue;

use state::{NodeScheduleState, NodeState, Notification};

static NULL_LOGGER: NullLogger = NullLogger;

/// Configuration for an [`Executor`].
pub struct ExecutorOptions {
    /// Worker thread count; `None` uses the global rayon pool.
    pub num_threads: Option<usize>,
    /// Run one newly ready successor inline instead of queueing it.
    /// Changes interleaving only, never results.
    pub inline_handoff: bool,
    pub side_effect_provider: Option<Arc<dyn SideEffectProvider>>,
    pub logger: Option<Arc<dyn EvalLogger>>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            num_threads: None,
            inline_handoff: true,
            side_effect_provider: None,
            logger: None,
        }
    }
}

/// Caller-facing value and demand buffers for one evaluation series,
/// indexed by graph input/output.
pub struct GraphIo {
    pub(crate) inputs: Vec<Option<BoxedValue>>,
    pub(crate) input_usages: Vec<ValueUsage>,
    pub(crate) output_usages: Vec<ValueUsage>,
    pub(crate) outputs: Vec<Option<BoxedValue>>,
    pub(crate) outputs_set: Vec<bool>,
}

impl GraphIo {
    pub fn for_graph(graph: &Graph) -> Self {
        Self {
            inputs: (0..graph.input_count()).map(|_| None).collect(),
            input_usages: vec![ValueUsage::Maybe; graph.input_count()],
            output_usages: vec![ValueUsage::Maybe; graph.output_count()],
            outputs: (0..graph.output_count()).map(|_| None).collect(),
            outputs_set: vec![false; graph.output_count()],
        }
    }

    /// Supply a value for graph input `i`. The engine takes it at most once.
    pub fn set_input<T: Send + Sync + 'static>(&mut self, i: usize, value: T) {
        self.inputs[i] = Some(BoxedValue::new(value));
    }

    pub fn set_input_value(&mut self, i: usize, value: BoxedValue) {
        self.inputs[i] = Some(value);
    }

    /// Declare that graph output `i` is wanted.
    pub fn want_output(&mut self, i: usize) {
        self.output_usages[i] = ValueUsage::Used;
    }

    /// Declare that graph output `i` will not be read.
    pub fn set_output_unused(&mut self, i: usize) {
        self.output_usages[i] = ValueUsage::Unused;
    }

    /// Engine-reported demand on graph input `i`: `Used` means the engine
    /// needs a value before it can make further progress, `Unused` means a
    /// value will never be read.
    pub fn input_usage(&self, i: usize) -> ValueUsage {
        self.input_usages[i]
    }

    pub fn output_is_set(&self, i: usize) -> bool {
        self.outputs_set[i]
    }

    pub fn output_ref<T: 'static>(&self, i: usize) -> Option<&T> {
        self.outputs[i].as_ref().and_then(|v| v.downcast_ref())
    }

    pub fn take_output(&mut self, i: usize) -> Option<BoxedValue> {
        self.outputs[i].take()
    }
}

/// Evaluates a [`Graph`] on demand across worker threads.
///
/// One executor drives one evaluation series: node states persist across
/// [`execute`](Executor::execute) calls, so the caller can supply inputs
/// incrementally and re-invoke until every wanted output is set.
pub struct Executor<'g> {
    graph: &'g Graph,
    states: Vec<Mutex<NodeState>>,
    options: ExecutorOptions,
    pool: Option<rayon::ThreadPool>,
    started: bool,
}

impl<'g> Executor<'g> {
    pub fn new(graph: &'g Graph, options: ExecutorOptions) -> Result<Self, EngineError> {
        if !graph.is_finalized() {
            return Err(EngineError::graph(
                "update_indices must be called before execution",
            ));
        }
        let pool = match options.num_threads {
            Some(count) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(count.max(1))
                    .build()
                    .map_err(|e| EngineError::execution(format!("thread pool: {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            graph,
            states: Vec::new(),
            options,
            pool,
            started: false,
        })
    }

    /// Run the graph until quiescence: every wanted output set, or the
    /// engine waiting on inputs the caller has not supplied yet (reported
    /// through [`GraphIo::input_usage`]).
    pub fn execute(
        &mut self,
        io: &mut GraphIo,
        user_data: Option<&(dyn Any + Send + Sync)>,
    ) -> Result<(), EngineError> {
        self.validate_io(io)?;
        let first = !self.started;
        self.started = true;
        if first {
            // Node states exist only once an evaluation series begins.
            self.states = self
                .graph
                .nodes()
                .map(|(_, node)| Mutex::new(NodeState::for_node(node)))
                .collect();
        }

        let io = Mutex::new(io);
        let run = Run {
            graph: self.graph,
            states: &self.states,
            io: &io,
            logger: self
                .options
                .logger
                .as_deref()
                .unwrap_or(&NULL_LOGGER),
            user_data,
            inline_handoff: self.options.inline_handoff,
        };
        let provider = self.options.side_effect_provider.as_deref();

        match &self.pool {
            Some(pool) => pool.in_place_scope(|scope| run.drive(first, provider, scope)),
            None => rayon::in_place_scope(|scope| run.drive(first, provider, scope)),
        }
        Ok(())
    }

    fn validate_io(&self, io: &GraphIo) -> Result<(), EngineError> {
        if io.inputs.len() != self.graph.input_count()
            || io.outputs.len() != self.graph.output_count()
        {
            return Err(EngineError::execution(format!(
                "io arity mismatch: graph has {} inputs / {} outputs, io has {} / {}",
                self.graph.input_count(),
                self.graph.output_count(),
                io.inputs.len(),
                io.outputs.len()
            )));
        }
        let interface = self.graph.node(GRAPH_INPUTS);
        for (i, value) in io.inputs.iter().enumerate() {
            if let Some(value) = value {
                let ty = interface.outputs()[i].ty();
                if !ty.accepts(value) {
                    return Err(EngineError::execution(format!(
                        "graph input {i} expects {}, got a different type",
                        ty.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Borrowed view of everything one `execute` call needs, shareable across
/// the worker scope.
struct Run<'r> {
    graph: &'r Graph,
    states: &'r [Mutex<NodeState>],
    io: &'r Mutex<&'r mut GraphIo>,
    logger: &'r dyn EvalLogger,
    user_data: Option<&'r (dyn Any + Send + Sync)>,
    inline_handoff: bool,
}

impl<'r> Run<'r> {
    /// Entry point of one `execute` call, running inside the worker scope.
    /// The calling thread seeds the work and then runs ready nodes itself
    /// before joining the pool.
    fn drive<'s>(
        &'s self,
        first: bool,
        provider: Option<&dyn SideEffectProvider>,
        scope: &rayon::Scope<'s>,
    ) {
        let mut pending = Vec::new();
        if first {
            self.first_run_setup(provider, &mut pending);
        }
        self.apply_caller_demand(&mut pending);
        self.forward_caller_inputs(&mut pending);
        let mut inline = None;
        self.dispatch(pending, scope, &mut inline);
        if let Some(node) = inline {
            self.run_node_task(node, scope);
        }
    }

    fn lock_state(&self, node: NodeIndex) -> MutexGuard<'_, NodeState> {
        self.states[node.index()]
            .lock()
            .expect("node state lock poisoned")
    }

    fn lock_io(&self) -> MutexGuard<'_, &'r mut GraphIo> {
        self.io.lock().expect("io lock poisoned")
    }

    /// One-time setup for the evaluation series.
    fn first_run_setup(
        &self,
        provider: Option<&dyn SideEffectProvider>,
        pending: &mut Vec<Notification>,
    ) {
        // Graph inputs nothing consumes are unused from the start.
        {
            let state = self.lock_state(GRAPH_INPUTS);
            let unused: Vec<usize> = state
                .outputs
                .iter()
                .enumerate()
                .filter(|(_, out)| out.usage == ValueUsage::Unused)
                .map(|(i, _)| i)
                .collect();
            drop(state);
            if !unused.is_empty() {
                let mut io = self.lock_io();
                for i in unused {
                    io.input_usages[i] = ValueUsage::Unused;
                }
            }
        }

        // Graph outputs with no producer link can never receive a value;
        // default-construct them unless the caller declared them unused.
        let interface = self.graph.node(GRAPH_OUTPUTS);
        for (i, port) in interface.inputs().iter().enumerate() {
            if port.origin().is_some() {
                continue;
            }
            let unused = self.lock_io().output_usages[i] == ValueUsage::Unused;
            if unused {
                continue;
            }
            self.lock_state(GRAPH_OUTPUTS).inputs[i].ready = true;
            let value = match &port.default_value {
                Some(default) => port.ty().duplicate(default),
                None => port.ty().default_value(),
            };
            let mut io = self.lock_io();
            io.outputs[i] = Some(value);
            io.outputs_set[i] = true;
        }

        if let Some(provider) = provider {
            for node in provider.nodes_with_side_effects(self.user_data) {
                if node.index() >= self.graph.node_count()
                    || self.graph.node(node).is_interface()
                {
                    warn!("side effect provider listed invalid node {node:?}");
                    continue;
                }
                self.lock_state(node).has_side_effects = true;
                pending.push(Notification::Schedule(node));
            }
        }
    }

    /// Pull demand backward from every wanted, still-unset graph output,
    /// and cascade unused-ness upstream from outputs the caller declared
    /// unused.
    fn apply_caller_demand(&self, pending: &mut Vec<Notification>) {
        let interface = self.graph.node(GRAPH_OUTPUTS);
        for i in 0..interface.inputs().len() {
            let port = &interface.inputs()[i];
            let caller_usage = {
                let io = self.lock_io();
                if io.outputs_set[i] {
                    continue;
                }
                io.output_usages[i]
            };
            match caller_usage {
                ValueUsage::Maybe => {}
                ValueUsage::Used => {
                    let mut state = self.lock_state(GRAPH_OUTPUTS);
                    let input = &mut state.inputs[i];
                    input.usage = ValueUsage::Used;
                    let request = !input.ready;
                    drop(state);
                    if !request {
                        continue;
                    }
                    match port.origin() {
                        Some(origin) => pending.push(Notification::OutputRequired(origin)),
                        None => {
                            // Unlinked output demanded after the first run
                            // declared it unused; construct the fallback now.
                            self.lock_state(GRAPH_OUTPUTS).inputs[i].ready = true;
                            let value = match &port.default_value {
                                Some(default) => port.ty().duplicate(default),
                                None => port.ty().default_value(),
                            };
                            let mut io = self.lock_io();
                            io.outputs[i] = Some(value);
                            io.outputs_set[i] = true;
                        }
                    }
                }
                ValueUsage::Unused => {
                    let mut state = self.lock_state(GRAPH_OUTPUTS);
                    let input = &mut state.inputs[i];
                    if input.usage != ValueUsage::Maybe {
                        continue;
                    }
                    input.usage = ValueUsage::Unused;
                    input.value = None;
                    drop(state);
                    if let Some(origin) = port.origin() {
                        pending.push(Notification::OutputUnused(origin));
                    }
                }
            }
        }
    }

    /// Push newly supplied caller values into the graph.
    fn forward_caller_inputs(&self, pending: &mut Vec<Notification>) {
        for i in 0..self.graph.input_count() {
            let Some(value) = self.lock_io().inputs[i].take() else {
                continue;
            };
            let from = OutputPortKey {
                node: GRAPH_INPUTS,
                port: i,
            };
            let mut state = self.lock_state(GRAPH_INPUTS);
            let out = &mut state.outputs[i];
            if out.computed {
                drop(state);
                let msg = format!("graph input {i} supplied twice");
                error!("{msg}");
                self.logger.contract_violation(GRAPH_INPUTS, &msg);
                continue;
            }
            out.computed = true;
            let wanted = out.usage != ValueUsage::Unused;
            drop(state);
            if wanted {
                self.forward_output(from, value, pending);
            }
        }
    }

    /// Deliver a committed output value to every link target: moved into
    /// the last target, duplicated via the type descriptor into the rest.
    fn forward_output(
        &self,
        from: OutputPortKey,
        value: BoxedValue,
        pending: &mut Vec<Notification>,
    ) {
        let port = self.graph.output_port(from);
        let targets = port.targets();
        trace!(
            "forwarding {}:{} to {} target(s)",
            from.node,
            port.name(),
            targets.len()
        );
        match targets.split_last() {
            None => {}
            Some((last, rest)) => {
                for target in rest {
                    let copy = port.ty().duplicate(&value);
                    self.deliver(from, *target, copy, pending);
                }
                self.deliver(from, *last, value, pending);
            }
        }
    }

    fn deliver(
        &self,
        from: OutputPortKey,
        to: InputPortKey,
        value: BoxedValue,
        pending: &mut Vec<Notification>,
    ) {
        self.logger.value_forwarded(from, to);

        if to.node == GRAPH_OUTPUTS {
            let mut state = self.lock_state(GRAPH_OUTPUTS);
            if state.inputs[to.port].ready {
                drop(state);
                let msg = format!("graph output {} delivered twice", to.port);
                error!("{msg}");
                self.logger.contract_violation(GRAPH_OUTPUTS, &msg);
                return;
            }
            state.inputs[to.port].ready = true;
            let mut io = self.lock_io();
            io.outputs[to.port] = Some(value);
            io.outputs_set[to.port] = true;
            return;
        }

        let mut state = self.lock_state(to.node);
        let input = &mut state.inputs[to.port];
        if input.ready {
            drop(state);
            let msg = format!("input {}:{} delivered twice", to.node, to.port);
            error!("{msg}");
            self.logger.contract_violation(to.node, &msg);
            return;
        }
        input.ready = true;
        if input.usage == ValueUsage::Unused {
            return;
        }
        input.value = Some(value);
        if input.usage == ValueUsage::Used {
            state.missing_required_inputs -= 1;
            if state.missing_required_inputs == 0 && state.wants_run() {
                pending.push(Notification::Schedule(to.node));
            }
        }
    }

    /// Drain buffered notifications, possibly producing more. `inline`
    /// receives at most one ready node for the caller to run directly.
    fn dispatch<'s>(
        &'s self,
        mut pending: Vec<Notification>,
        scope: &rayon::Scope<'s>,
        inline: &mut Option<NodeIndex>,
    ) {
        while let Some(notification) = pending.pop() {
            match notification {
                Notification::Schedule(node) => self.schedule_node(node, scope, inline),
                Notification::OutputRequired(key) => self.output_required(key, &mut pending),
                Notification::OutputUnused(key) => self.output_unused(key, &mut pending),
            }
        }
    }

    fn schedule_node<'s>(
        &'s self,
        node: NodeIndex,
        scope: &rayon::Scope<'s>,
        inline: &mut Option<NodeIndex>,
    ) {
        if self.graph.node(node).is_interface() {
            return;
        }
        let mut state = self.lock_state(node);
        match state.schedule_state {
            NodeScheduleState::NotScheduled => {
                state.schedule_state = NodeScheduleState::Scheduled;
                drop(state);
                trace!("scheduling node {node}");
                if self.inline_handoff && inline.is_none() {
                    *inline = Some(node);
                } else {
                    self.spawn_task(node, scope);
                }
            }
            NodeScheduleState::Scheduled | NodeScheduleState::RunningAndRescheduled => {}
            NodeScheduleState::Running => {
                state.schedule_state = NodeScheduleState::RunningAndRescheduled;
            }
        }
    }

    fn output_required(&self, key: OutputPortKey, pending: &mut Vec<Notification>) {
        let mut state = self.lock_state(key.node);
        let out = &mut state.outputs[key.port];
        match out.usage {
            ValueUsage::Used => {}
            ValueUsage::Maybe => {
                out.usage = ValueUsage::Used;
                let computed = out.computed;
                if key.node == GRAPH_INPUTS {
                    drop(state);
                    if !computed {
                        // The caller has to supply this input before the
                        // evaluation can finish.
                        self.lock_io().input_usages[key.port] = ValueUsage::Used;
                    }
                } else if !computed && !state.finished {
                    drop(state);
                    pending.push(Notification::Schedule(key.node));
                }
            }
            ValueUsage::Unused => {
                warn!(
                    "demand on output {}:{} that was already determined unused",
                    key.node, key.port
                );
            }
        }
    }

    fn output_unused(&self, key: OutputPortKey, pending: &mut Vec<Notification>) {
        let mut state = self.lock_state(key.node);
        let out = &mut state.outputs[key.port];
        debug_assert!(out.remaining_targets > 0);
        out.remaining_targets = out.remaining_targets.saturating_sub(1);
        if out.remaining_targets > 0 || out.usage != ValueUsage::Maybe {
            return;
        }
        out.usage = ValueUsage::Unused;
        if key.node == GRAPH_INPUTS {
            drop(state);
            self.lock_io().input_usages[key.port] = ValueUsage::Unused;
        } else if !state.finished {
            // Let the node observe the lost demand, finish early and
            // cascade unused-ness to its own inputs.
            drop(state);
            pending.push(Notification::Schedule(key.node));
        }
    }

    fn spawn_task<'s>(&'s self, node: NodeIndex, scope: &rayon::Scope<'s>) {
        scope.spawn(move |scope| self.run_node_task(node, scope));
    }

    fn run_node_task<'s>(&'s self, node: NodeIndex, scope: &rayon::Scope<'s>) {
        let mut next = Some(node);
        while let Some(current) = next.take() {
            next = self.run_node(current, scope);
        }
    }

    /// One pass over a scheduled node. Returns the inline handoff, if any.
    fn run_node<'s>(&'s self, node_index: NodeIndex, scope: &rayon::Scope<'s>) -> Option<NodeIndex> {
        let node = self.graph.node(node_index);
        let Some(unit) = node.unit() else {
            return None;
        };
        let mut pending = Vec::new();
        let mut inline = None;

        // Phase 1: under this node's lock, decide whether to invoke.
        let invocation = {
            let mut state = self.lock_state(node_index);
            state.schedule_state = NodeScheduleState::Running;
            if state.finished || !state.wants_run() {
                self.try_finish_node(node_index, node, &mut state, &mut pending);
                state.schedule_state = NodeScheduleState::NotScheduled;
                None
            } else {
                if !state.initialized {
                    self.initialize_node(node, &mut state, &mut pending);
                }
                if state.missing_required_inputs > 0 {
                    state.schedule_state = NodeScheduleState::NotScheduled;
                    None
                } else {
                    let loans: Vec<Option<BoxedValue>> = state
                        .inputs
                        .iter_mut()
                        .map(|input| input.value.take())
                        .collect();
                    // Demand snapshot; concurrent changes become visible to
                    // the next invocation.
                    let usages: Vec<ValueUsage> = state
                        .outputs
                        .iter()
                        .map(|out| out.usage)
                        .collect();
                    let computed: Vec<bool> =
                        state.outputs.iter().map(|out| out.computed).collect();
                    let storage = std::mem::take(&mut state.storage);
                    Some((loans, usages, computed, storage))
                }
            }
        };
        let Some((loans, usages, computed, mut storage)) = invocation else {
            self.dispatch(pending, scope, &mut inline);
            return inline;
        };

        // Phase 2: invoke the unit without holding the lock. Invoking under
        // the lock would deadlock when the unit calls back through Params
        // and would serialize unrelated work.
        self.logger.node_started(node_index, unit.name());
        let params = Params::new(unit.name(), loans, unit.outputs(), &usages, &computed);
        let mut ctx = Context {
            storage: &mut storage,
            user_data: self.user_data,
        };
        {
            let _timer = ScopedTimer::debug_lazy(|| format!("node {node_index} ({})", unit.name()));
            unit.execute(&params, &mut ctx);
        }
        self.logger.node_finished(node_index, unit.name());
        let outcome = params.finish();
        for violation in &outcome.violations {
            error!("contract violation: {violation}");
            self.logger.contract_violation(node_index, violation);
        }

        // Phase 3: merge the invocation's results back under the lock.
        let mut staged: Vec<(usize, BoxedValue)> = Vec::new();
        let mut reschedule_self = false;
        {
            let mut state = self.lock_state(node_index);
            state.storage = storage;
            state.ran = true;

            for (slot, loan) in state.inputs.iter_mut().zip(outcome.loaned_inputs) {
                if loan.is_some() {
                    slot.value = loan;
                }
            }

            for i in outcome.unused_inputs {
                let input = &mut state.inputs[i];
                match input.usage {
                    ValueUsage::Used => {
                        let msg = format!(
                            "{}: input '{}' marked unused after being required",
                            unit.name(),
                            node.inputs()[i].name()
                        );
                        error!("{msg}");
                        self.logger.contract_violation(node_index, &msg);
                    }
                    ValueUsage::Unused => {}
                    ValueUsage::Maybe => {
                        input.usage = ValueUsage::Unused;
                        input.value = None;
                        if let Some(origin) = node.inputs()[i].origin() {
                            pending.push(Notification::OutputUnused(origin));
                        }
                    }
                }
            }

            for i in outcome.requested_inputs {
                let input = &mut state.inputs[i];
                if input.value.is_some() {
                    // Arrived in the meantime (or was never read); run the
                    // unit again so it can pick the value up.
                    input.usage = ValueUsage::Used;
                    reschedule_self = true;
                } else {
                    match input.usage {
                        ValueUsage::Used => {}
                        ValueUsage::Maybe => {
                            input.usage = ValueUsage::Used;
                            state.missing_required_inputs += 1;
                            if let Some(origin) = node.inputs()[i].origin() {
                                pending.push(Notification::OutputRequired(origin));
                            }
                        }
                        ValueUsage::Unused => {
                            let msg = format!(
                                "{}: requested input '{}' previously marked unused",
                                unit.name(),
                                node.inputs()[i].name()
                            );
                            error!("{msg}");
                            self.logger.contract_violation(node_index, &msg);
                        }
                    }
                }
            }

            for (i, value) in outcome.set_outputs.into_iter().enumerate() {
                if let Some(value) = value {
                    state.outputs[i].computed = true;
                    staged.push((i, value));
                }
            }

            if matches!(state.schedule_state, NodeScheduleState::RunningAndRescheduled) {
                reschedule_self = true;
            }
            if !reschedule_self {
                self.try_finish_node(node_index, node, &mut state, &mut pending);
                if !state.finished
                    && state.wants_run()
                    && state.missing_required_inputs == 0
                {
                    // Demanded outputs remain, yet the unit neither set
                    // them nor requested anything: it will never be woken
                    // again for them.
                    let missing: Vec<String> = state
                        .outputs
                        .iter()
                        .enumerate()
                        .filter(|(_, out)| out.usage == ValueUsage::Used && !out.computed)
                        .map(|(i, _)| node.outputs()[i].name().to_string())
                        .collect();
                    if !missing.is_empty() {
                        error!(
                            "node {node_index} ({}) made no progress; missing outputs: {missing:?}",
                            unit.name()
                        );
                        self.logger.outputs_missing(node_index, &missing);
                    }
                }
            }
            state.schedule_state = if reschedule_self {
                NodeScheduleState::Scheduled
            } else {
                NodeScheduleState::NotScheduled
            };
        }

        // Phase 4: propagate committed values, then dispatch everything
        // buffered while locks were held.
        for (port, value) in staged {
            self.forward_output(
                OutputPortKey {
                    node: node_index,
                    port,
                },
                value,
                &mut pending,
            );
        }
        if reschedule_self {
            if self.inline_handoff && inline.is_none() {
                inline = Some(node_index);
            } else {
                self.spawn_task(node_index, scope);
            }
        }
        self.dispatch(pending, scope, &mut inline);
        inline
    }

    /// First-run setup under the node's own lock: load defaults for
    /// unlinked inputs and apply the unit's usage hints.
    fn initialize_node(
        &self,
        node: &Node,
        state: &mut NodeState,
        pending: &mut Vec<Notification>,
    ) {
        let Some(unit) = node.unit() else {
            state.initialized = true;
            return;
        };
        state.storage = unit.init_storage();

        for (i, port) in node.inputs().iter().enumerate() {
            if port.origin().is_none() && !state.inputs[i].ready {
                let value = match &port.default_value {
                    Some(default) => port.ty().duplicate(default),
                    None => port.ty().default_value(),
                };
                state.inputs[i].ready = true;
                state.inputs[i].value = Some(value);
            }
        }

        for (i, port) in node.inputs().iter().enumerate() {
            let input = &mut state.inputs[i];
            match port.usage_hint {
                ValueUsage::Used => {
                    if input.usage == ValueUsage::Maybe {
                        input.usage = ValueUsage::Used;
                        if input.value.is_none() {
                            state.missing_required_inputs += 1;
                            if let Some(origin) = port.origin() {
                                pending.push(Notification::OutputRequired(origin));
                            }
                        }
                    }
                }
                ValueUsage::Unused => {
                    if input.usage == ValueUsage::Maybe {
                        input.usage = ValueUsage::Unused;
                        input.value = None;
                        if let Some(origin) = port.origin() {
                            pending.push(Notification::OutputUnused(origin));
                        }
                    }
                }
                ValueUsage::Maybe => {}
            }
        }
        state.initialized = true;
    }

    /// Finish the node if every output is settled and nothing required is
    /// still missing. Finishing releases storage and input values and
    /// cascades unused-ness to producers of inputs that were never needed.
    fn try_finish_node(
        &self,
        node_index: NodeIndex,
        node: &Node,
        state: &mut NodeState,
        pending: &mut Vec<Notification>,
    ) {
        if state.finished {
            return;
        }
        let all_outputs_done = state
            .outputs
            .iter()
            .all(|out| out.computed || out.usage == ValueUsage::Unused);
        if !all_outputs_done || state.missing_required_inputs > 0 {
            return;
        }
        if state.has_side_effects && !state.ran {
            // A forced node still has an invocation coming.
            return;
        }
        state.finished = true;
        state.storage.clear();
        for (i, input) in state.inputs.iter_mut().enumerate() {
            input.value = None;
            if input.usage == ValueUsage::Maybe {
                input.usage = ValueUsage::Unused;
                if let Some(origin) = node.inputs()[i].origin() {
                    pending.push(Notification::OutputUnused(origin));
                }
            }
        }
        debug!("node {node_index} ({}) finished", node.name());
    }
}
