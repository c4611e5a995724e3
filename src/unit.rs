//! The computation unit authoring interface.

use std::any::Any;

use crate::params::{Context, Params};
use crate::value::ValueType;

/// Demand state of a value slot.
///
/// Moves monotonically from `Maybe` toward one of the extremes within one
/// evaluation series and never reverses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueUsage {
    /// The value will certainly be read.
    Used,
    /// Not yet known whether the value will be read.
    Maybe,
    /// The value will certainly not be read.
    Unused,
}

/// Declared input of a unit: debug name, value type and a usage hint that
/// seeds the input's demand state when its node first runs.
#[derive(Clone, Debug)]
pub struct UnitInput {
    pub name: String,
    pub ty: ValueType,
    pub usage: ValueUsage,
}

impl UnitInput {
    /// An input the unit always reads. The executor requests it before the
    /// unit runs for the first time.
    pub fn required(name: &str, ty: ValueType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            usage: ValueUsage::Used,
        }
    }

    /// An input the unit may or may not read; it is only computed upstream
    /// once the unit requests it.
    pub fn maybe(name: &str, ty: ValueType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            usage: ValueUsage::Maybe,
        }
    }

    /// An input that is unused unless something upgrades it explicitly.
    pub fn unused(name: &str, ty: ValueType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            usage: ValueUsage::Unused,
        }
    }
}

/// Declared output of a unit.
#[derive(Clone, Debug)]
pub struct UnitOutput {
    pub name: String,
    pub ty: ValueType,
}

impl UnitOutput {
    pub fn new(name: &str, ty: ValueType) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

/// Private re-entrant working state of a unit, created once per invocation
/// series and dropped when the node finishes. Units that need no state
/// return [`UnitStorage::none`].
#[derive(Default)]
pub struct UnitStorage(Option<Box<dyn Any + Send>>);

impl UnitStorage {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.as_mut().and_then(|s| s.downcast_mut::<T>())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub(crate) fn clear(&mut self) {
        self.0 = None;
    }
}

/// An atomic, reusable piece of computation.
///
/// A unit declares a fixed list of typed inputs and outputs and is invoked
/// through [`Unit::execute`], possibly several times per evaluation: each
/// call must either commit every output whose usage is `Used` or request at
/// least one still-missing input via the params, then return. Blocking on
/// other nodes is never necessary; a unit that lacks input simply returns
/// early and is re-invoked once the input arrives.
pub trait Unit: Send + Sync {
    /// Debug name used in logs and diagnostics.
    fn name(&self) -> &str {
        "unit"
    }

    fn inputs(&self) -> &[UnitInput];

    fn outputs(&self) -> &[UnitOutput];

    /// Allocate re-entrant working state for one invocation series.
    fn init_storage(&self) -> UnitStorage {
        UnitStorage::none()
    }

    /// One invocation. See the trait docs for the progress contract.
    fn execute(&self, params: &Params<'_>, ctx: &mut Context<'_>);
}
