//! Small general-purpose units.

use crate::params::{Context, Params};
use crate::unit::{Unit, UnitInput, UnitOutput, ValueUsage};
use crate::value::ValueType;

/// Emits a fixed value on its single output, but only once the output is
/// actually demanded.
pub struct ConstantUnit<T: Clone + Default + Send + Sync + 'static> {
    value: T,
    outputs: Vec<UnitOutput>,
}

impl<T: Clone + Default + Send + Sync + 'static> ConstantUnit<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            outputs: vec![UnitOutput::new("value", ValueType::of::<T>())],
        }
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Unit for ConstantUnit<T> {
    fn name(&self) -> &str {
        "constant"
    }

    fn inputs(&self) -> &[UnitInput] {
        &[]
    }

    fn outputs(&self) -> &[UnitOutput] {
        &self.outputs
    }

    fn execute(&self, params: &Params<'_>, _ctx: &mut Context<'_>) {
        if params.get_output_usage(0) != ValueUsage::Unused && !params.output_was_set(0) {
            params.set_output(0, self.value.clone());
        }
    }
}

/// Copies its single input to its single output through the type
/// descriptor. The input is only pulled once the output is demanded.
pub struct PassthroughUnit {
    ty: ValueType,
    inputs: Vec<UnitInput>,
    outputs: Vec<UnitOutput>,
}

impl PassthroughUnit {
    pub fn new(ty: ValueType) -> Self {
        Self {
            inputs: vec![UnitInput::maybe("value", ty.clone())],
            outputs: vec![UnitOutput::new("value", ty.clone())],
            ty,
        }
    }
}

impl Unit for PassthroughUnit {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn inputs(&self) -> &[UnitInput] {
        &self.inputs
    }

    fn outputs(&self) -> &[UnitOutput] {
        &self.outputs
    }

    fn execute(&self, params: &Params<'_>, _ctx: &mut Context<'_>) {
        if params.get_output_usage(0) == ValueUsage::Unused || params.output_was_set(0) {
            params.set_input_unused(0);
            return;
        }
        if let Some(value) = params.try_get_input_value_or_request(0) {
            params.set_output_value(0, self.ty.duplicate(value));
        }
    }
}
