//! Graph container: nodes, ports and links, addressed by stable indices.

use std::fmt;
use std::sync::Arc;

use crate::error::EngineError;
use crate::unit::{Unit, ValueUsage};
use crate::value::{BoxedValue, ValueType};

/// Stable index of a node within its graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies an output port on a specific node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputPortKey {
    pub node: NodeIndex,
    pub port: usize,
}

/// Identifies an input port on a specific node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputPortKey {
    pub node: NodeIndex,
    pub port: usize,
}

/// What a node is: a wrapped computation unit, or one of the two boundary
/// markers exposing the graph's own inputs and outputs as ordinary ports.
pub enum NodeKind {
    Function(Arc<dyn Unit>),
    GraphInputs,
    GraphOutputs,
}

pub struct InputPort {
    pub(crate) name: String,
    pub(crate) ty: ValueType,
    pub(crate) usage_hint: ValueUsage,
    pub(crate) origin: Option<OutputPortKey>,
    pub(crate) default_value: Option<BoxedValue>,
    pub(crate) graph_index: usize,
}

impl InputPort {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    /// The at-most-one incoming link, if any.
    pub fn origin(&self) -> Option<OutputPortKey> {
        self.origin
    }

    pub fn graph_index(&self) -> usize {
        self.graph_index
    }
}

pub struct OutputPort {
    pub(crate) name: String,
    pub(crate) ty: ValueType,
    pub(crate) targets: Vec<InputPortKey>,
    pub(crate) graph_index: usize,
}

impl OutputPort {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    /// Fan-out target list, fixed after graph construction.
    pub fn targets(&self) -> &[InputPortKey] {
        &self.targets
    }

    pub fn graph_index(&self) -> usize {
        self.graph_index
    }
}

pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) inputs: Vec<InputPort>,
    pub(crate) outputs: Vec<OutputPort>,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn unit(&self) -> Option<&Arc<dyn Unit>> {
        match &self.kind {
            NodeKind::Function(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn is_interface(&self) -> bool {
        !matches!(self.kind, NodeKind::Function(_))
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Function(unit) => unit.name(),
            NodeKind::GraphInputs => "graph_inputs",
            NodeKind::GraphOutputs => "graph_outputs",
        }
    }

    pub fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }
}

/// The data-flow graph: an arena of nodes whose ports are connected by
/// directed, type-checked links.
///
/// Built single-threaded, then [`update_indices`](Graph::update_indices) is
/// called once and the graph is treated as read-only; the executor takes
/// `&Graph` and makes no attempt to re-validate structure during execution.
pub struct Graph {
    nodes: Vec<Node>,
    finalized: bool,
}

/// Index of the interface node carrying the graph's own inputs.
pub(crate) const GRAPH_INPUTS: NodeIndex = NodeIndex(0);
/// Index of the interface node carrying the graph's own outputs.
pub(crate) const GRAPH_OUTPUTS: NodeIndex = NodeIndex(1);

impl Graph {
    pub fn new() -> Self {
        let interface = |kind| Node {
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        Self {
            nodes: vec![
                interface(NodeKind::GraphInputs),
                interface(NodeKind::GraphOutputs),
            ],
            finalized: false,
        }
    }

    /// Add a function node whose ports mirror the unit's declared inputs
    /// and outputs.
    pub fn add_function(&mut self, unit: Arc<dyn Unit>) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        let inputs = unit
            .inputs()
            .iter()
            .map(|input| InputPort {
                name: input.name.clone(),
                ty: input.ty.clone(),
                usage_hint: input.usage,
                origin: None,
                default_value: None,
                graph_index: 0,
            })
            .collect();
        let outputs = unit
            .outputs()
            .iter()
            .map(|output| OutputPort {
                name: output.name.clone(),
                ty: output.ty.clone(),
                targets: Vec::new(),
                graph_index: 0,
            })
            .collect();
        self.nodes.push(Node {
            kind: NodeKind::Function(unit),
            inputs,
            outputs,
        });
        self.finalized = false;
        index
    }

    /// Add a graph input: an output port on the input interface node, from
    /// which caller-supplied values flow into the graph.
    pub fn add_input(&mut self, ty: ValueType) -> OutputPortKey {
        let node = &mut self.nodes[GRAPH_INPUTS.0];
        let port = node.outputs.len();
        node.outputs.push(OutputPort {
            name: format!("input_{port}"),
            ty,
            targets: Vec::new(),
            graph_index: 0,
        });
        self.finalized = false;
        OutputPortKey {
            node: GRAPH_INPUTS,
            port,
        }
    }

    /// Add a graph output: an input port on the output interface node, into
    /// which the graph delivers a result for the caller.
    pub fn add_output(&mut self, ty: ValueType) -> InputPortKey {
        let node = &mut self.nodes[GRAPH_OUTPUTS.0];
        let port = node.inputs.len();
        node.inputs.push(InputPort {
            name: format!("output_{port}"),
            ty,
            usage_hint: ValueUsage::Maybe,
            origin: None,
            default_value: None,
            graph_index: 0,
        });
        self.finalized = false;
        InputPortKey {
            node: GRAPH_OUTPUTS,
            port,
        }
    }

    /// Connect an output port to an input port.
    ///
    /// Fails if either key is out of range, the input already has an origin
    /// or the port types differ.
    pub fn add_link(&mut self, from: OutputPortKey, to: InputPortKey) -> Result<(), EngineError> {
        let from_ty = {
            let port = self.output_port_checked(from)?;
            port.ty.clone()
        };
        let to_port = self.input_port_checked(to)?;
        if to_port.origin.is_some() {
            return Err(EngineError::graph(format!(
                "input port {}:{} already has an origin",
                to.node, to.port
            )));
        }
        if to_port.ty != from_ty {
            return Err(EngineError::graph(format!(
                "link type mismatch: {} -> {}",
                from_ty.name(),
                to_port.ty.name()
            )));
        }
        self.nodes[to.node.0].inputs[to.port].origin = Some(from);
        self.nodes[from.node.0].outputs[from.port].targets.push(to);
        self.finalized = false;
        Ok(())
    }

    /// Set the value an unlinked input port falls back to. Without one, the
    /// executor default-constructs via the port's type descriptor.
    pub fn set_input_default(
        &mut self,
        key: InputPortKey,
        value: BoxedValue,
    ) -> Result<(), EngineError> {
        let port = self.input_port_checked(key)?;
        if !port.ty.accepts(&value) {
            return Err(EngineError::graph(format!(
                "default value for input {}:{} is not a {}",
                key.node,
                key.port,
                port.ty.name()
            )));
        }
        self.nodes[key.node.0].inputs[key.port].default_value = Some(value);
        Ok(())
    }

    /// Assign the stable graph-wide port indices the executor uses as array
    /// keys. Must be called after construction and before execution.
    pub fn update_indices(&mut self) {
        let mut next = 0usize;
        for node in &mut self.nodes {
            for input in &mut node.inputs {
                input.graph_index = next;
                next += 1;
            }
            for output in &mut node.outputs {
                output.graph_index = next;
                next += 1;
            }
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i), node))
    }

    pub fn input_count(&self) -> usize {
        self.nodes[GRAPH_INPUTS.0].outputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.nodes[GRAPH_OUTPUTS.0].inputs.len()
    }

    pub fn input_port(&self, key: InputPortKey) -> &InputPort {
        &self.nodes[key.node.0].inputs[key.port]
    }

    pub fn output_port(&self, key: OutputPortKey) -> &OutputPort {
        &self.nodes[key.node.0].outputs[key.port]
    }

    fn input_port_checked(&self, key: InputPortKey) -> Result<&InputPort, EngineError> {
        self.nodes
            .get(key.node.0)
            .and_then(|n| n.inputs.get(key.port))
            .ok_or_else(|| {
                EngineError::graph(format!("no input port {}:{}", key.node, key.port))
            })
    }

    fn output_port_checked(&self, key: OutputPortKey) -> Result<&OutputPort, EngineError> {
        self.nodes
            .get(key.node.0)
            .and_then(|n| n.outputs.get(key.port))
            .ok_or_else(|| {
                EngineError::graph(format!("no output port {}:{}", key.node, key.port))
            })
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
