//! lazydag is a demand-driven execution engine for dataflow graphs.
//!
//! A graph wires reusable computation units together through typed ports.
//! Evaluation is lazy: the caller declares which graph outputs it wants, the
//! engine pulls demand backward through the graph and runs only the nodes
//! that are actually needed, in parallel where the structure allows. Units
//! never block; one that is missing input requests it and returns, and is
//! re-invoked once the value arrives. The caller likewise never blocks on
//! missing graph inputs: [`Executor::execute`] returns with the needed
//! inputs reported through [`GraphIo::input_usage`], and the caller calls
//! again after supplying them.
//!
//! ```no_run
//! use std::sync::Arc;
//! use lazydag::{Executor, ExecutorOptions, Graph, GraphIo, ValueType};
//! use lazydag::units::ConstantUnit;
//!
//! # fn main() -> Result<(), lazydag::EngineError> {
//! let mut graph = Graph::new();
//! let node = graph.add_function(Arc::new(ConstantUnit::new(42i64)));
//! let out = graph.add_output(ValueType::of::<i64>());
//! graph.add_link(
//!     lazydag::OutputPortKey { node, port: 0 },
//!     out,
//! )?;
//! graph.update_indices();
//!
//! let mut executor = Executor::new(&graph, ExecutorOptions::default())?;
//! let mut io = GraphIo::for_graph(&graph);
//! io.want_output(0);
//! executor.execute(&mut io, None)?;
//! assert_eq!(io.output_ref::<i64>(0), Some(&42));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod executor;
pub mod graph;
pub mod hooks;
pub mod params;
pub mod unit;
pub mod units;
pub mod value;

mod timing;

pub use error::EngineError;
pub use executor::{Executor, ExecutorOptions, GraphIo};
pub use graph::{Graph, InputPortKey, NodeIndex, OutputPortKey};
pub use hooks::{EvalLogger, SideEffectProvider};
pub use params::{Context, Params};
pub use unit::{Unit, UnitInput, UnitOutput, UnitStorage, ValueUsage};
pub use value::{BoxedValue, ValueType};
