//! Calling convention between the executor and a unit invocation.

use std::any::Any;
use std::cell::RefCell;

use crate::unit::{UnitOutput, UnitStorage, ValueUsage};
use crate::value::BoxedValue;

/// Per-invocation interface a unit uses to read available inputs, request
/// missing ones, commit outputs and introspect demand.
///
/// A `Params` is created for one invocation and is only valid for its
/// duration. Input values visible here are the ones that had arrived when
/// the invocation started; a value delivered while the unit is running is
/// observed by the next invocation. All cross-node effects (requesting an
/// input, dropping one) are recorded and applied by the executor after the
/// invocation returns, so a unit can never touch another node's state.
pub struct Params<'a> {
    unit_name: &'a str,
    inputs: Vec<Option<BoxedValue>>,
    outputs: &'a [UnitOutput],
    output_usages: &'a [ValueUsage],
    outputs_computed: &'a [bool],
    scratch: RefCell<Scratch>,
}

struct Scratch {
    set_outputs: Vec<Option<BoxedValue>>,
    requested_inputs: Vec<usize>,
    unused_inputs: Vec<usize>,
    violations: Vec<String>,
}

/// Everything the executor takes back from a finished invocation.
pub(crate) struct ParamsOutcome {
    /// Input values loaned to the invocation, returned to the node state.
    pub loaned_inputs: Vec<Option<BoxedValue>>,
    pub set_outputs: Vec<Option<BoxedValue>>,
    pub requested_inputs: Vec<usize>,
    pub unused_inputs: Vec<usize>,
    pub violations: Vec<String>,
}

impl<'a> Params<'a> {
    pub(crate) fn new(
        unit_name: &'a str,
        inputs: Vec<Option<BoxedValue>>,
        outputs: &'a [UnitOutput],
        output_usages: &'a [ValueUsage],
        outputs_computed: &'a [bool],
    ) -> Self {
        let set_outputs = outputs.iter().map(|_| None).collect();
        Self {
            unit_name,
            inputs,
            outputs,
            output_usages,
            outputs_computed,
            scratch: RefCell::new(Scratch {
                set_outputs,
                requested_inputs: Vec::new(),
                unused_inputs: Vec::new(),
                violations: Vec::new(),
            }),
        }
    }

    /// Input `i`'s value if it is available, else `None`. Never blocks.
    pub fn try_get_input<T: 'static>(&self, i: usize) -> Option<&T> {
        self.try_get_input_value(i).and_then(|v| v.downcast_ref())
    }

    /// Like [`try_get_input`](Params::try_get_input), but on `None` records
    /// that input `i` is now required, so a future invocation receives it.
    pub fn try_get_input_or_request<T: 'static>(&self, i: usize) -> Option<&T> {
        self.try_get_input_value_or_request(i)
            .and_then(|v| v.downcast_ref())
    }

    /// Type-erased variant of [`try_get_input`](Params::try_get_input).
    pub fn try_get_input_value(&self, i: usize) -> Option<&BoxedValue> {
        self.inputs[i].as_ref()
    }

    /// Type-erased variant of
    /// [`try_get_input_or_request`](Params::try_get_input_or_request).
    pub fn try_get_input_value_or_request(&self, i: usize) -> Option<&BoxedValue> {
        if self.inputs[i].is_none() {
            self.request_input(i);
        }
        self.inputs[i].as_ref()
    }

    /// Record that input `i` is required without reading it.
    pub fn request_input(&self, i: usize) {
        let mut scratch = self.scratch.borrow_mut();
        if !scratch.requested_inputs.contains(&i) {
            scratch.requested_inputs.push(i);
        }
    }

    /// Commit output `i`. Committing the same output twice within one
    /// evaluation series is a contract violation.
    pub fn set_output<T: Send + Sync + 'static>(&self, i: usize, value: T) {
        self.set_output_value(i, BoxedValue::new(value));
    }

    /// Type-erased variant of [`set_output`](Params::set_output).
    pub fn set_output_value(&self, i: usize, value: BoxedValue) {
        let mut scratch = self.scratch.borrow_mut();
        if !self.outputs[i].ty.accepts(&value) {
            scratch.violations.push(format!(
                "{}: output '{}' committed with a value that is not {}",
                self.unit_name,
                self.outputs[i].name,
                self.outputs[i].ty.name()
            ));
            return;
        }
        if self.outputs_computed[i] || scratch.set_outputs[i].is_some() {
            scratch.violations.push(format!(
                "{}: output '{}' committed twice",
                self.unit_name, self.outputs[i].name
            ));
            return;
        }
        scratch.set_outputs[i] = Some(value);
    }

    /// Whether output `i` has been committed, in this or an earlier
    /// invocation of the series.
    pub fn output_was_set(&self, i: usize) -> bool {
        self.outputs_computed[i] || self.scratch.borrow().set_outputs[i].is_some()
    }

    /// Demand on output `i`, as snapshotted when this invocation started.
    pub fn get_output_usage(&self, i: usize) -> ValueUsage {
        self.output_usages[i]
    }

    /// Assert that input `i` will never be read this evaluation. Only legal
    /// while the input is not already `Used`.
    pub fn set_input_unused(&self, i: usize) {
        let mut scratch = self.scratch.borrow_mut();
        if !scratch.unused_inputs.contains(&i) {
            scratch.unused_inputs.push(i);
        }
    }

    /// Default-construct, via the type descriptor, every output that has
    /// not been set yet and whose usage is not `Unused`.
    pub fn set_default_remaining_outputs(&self) {
        let mut scratch = self.scratch.borrow_mut();
        for (i, output) in self.outputs.iter().enumerate() {
            if self.output_usages[i] == ValueUsage::Unused {
                continue;
            }
            if self.outputs_computed[i] || scratch.set_outputs[i].is_some() {
                continue;
            }
            scratch.set_outputs[i] = Some(output.ty.default_value());
        }
    }

    pub(crate) fn finish(self) -> ParamsOutcome {
        let scratch = self.scratch.into_inner();
        ParamsOutcome {
            loaned_inputs: self.inputs,
            set_outputs: scratch.set_outputs,
            requested_inputs: scratch.requested_inputs,
            unused_inputs: scratch.unused_inputs,
            violations: scratch.violations,
        }
    }
}

/// Per-invocation context threaded into [`Unit::execute`](crate::Unit::execute).
pub struct Context<'a> {
    /// The node's private re-entrant storage, surviving across invocations
    /// of one evaluation series.
    pub storage: &'a mut UnitStorage,
    /// Opaque embedder state, passed unmodified from the caller to every
    /// unit invocation.
    pub user_data: Option<&'a (dyn Any + Send + Sync)>,
}
