use std::sync::Arc;

use lazydag::units::{ConstantUnit, PassthroughUnit};
use lazydag::{
    BoxedValue, EngineError, Executor, ExecutorOptions, Graph, InputPortKey, OutputPortKey,
    ValueType,
};

#[test]
fn link_requires_matching_types() {
    let mut graph = Graph::new();
    let node = graph.add_function(Arc::new(ConstantUnit::new(1i64)));
    let out = graph.add_output(ValueType::of::<String>());
    let result = graph.add_link(OutputPortKey { node, port: 0 }, out);
    assert!(matches!(result, Err(EngineError::Graph(_))));
}

#[test]
fn input_port_accepts_at_most_one_origin() {
    let mut graph = Graph::new();
    let a = graph.add_function(Arc::new(ConstantUnit::new(1i64)));
    let b = graph.add_function(Arc::new(ConstantUnit::new(2i64)));
    let out = graph.add_output(ValueType::of::<i64>());
    graph
        .add_link(OutputPortKey { node: a, port: 0 }, out)
        .unwrap();
    let result = graph.add_link(OutputPortKey { node: b, port: 0 }, out);
    assert!(matches!(result, Err(EngineError::Graph(_))));
}

#[test]
fn link_rejects_unknown_ports() {
    let mut graph = Graph::new();
    let node = graph.add_function(Arc::new(ConstantUnit::new(1i64)));
    let out = graph.add_output(ValueType::of::<i64>());
    assert!(
        graph
            .add_link(OutputPortKey { node, port: 3 }, out)
            .is_err()
    );
    assert!(
        graph
            .add_link(
                OutputPortKey { node, port: 0 },
                InputPortKey {
                    node: out.node,
                    port: 99,
                },
            )
            .is_err()
    );
}

#[test]
fn input_default_must_match_port_type() {
    let mut graph = Graph::new();
    let node = graph.add_function(Arc::new(PassthroughUnit::new(ValueType::of::<i64>())));
    let result = graph.set_input_default(
        InputPortKey { node, port: 0 },
        BoxedValue::new("nope".to_string()),
    );
    assert!(matches!(result, Err(EngineError::Graph(_))));
}

#[test]
fn executor_rejects_unfinalized_graph() {
    let mut graph = Graph::new();
    graph.add_function(Arc::new(ConstantUnit::new(1i64)));
    let result = Executor::new(&graph, ExecutorOptions::default());
    assert!(matches!(result, Err(EngineError::Graph(_))));
}

#[test]
fn update_indices_numbers_every_port() {
    let mut graph = Graph::new();
    let input = graph.add_input(ValueType::of::<i64>());
    let node = graph.add_function(Arc::new(PassthroughUnit::new(ValueType::of::<i64>())));
    let out = graph.add_output(ValueType::of::<i64>());
    graph
        .add_link(input, InputPortKey { node, port: 0 })
        .unwrap();
    graph
        .add_link(OutputPortKey { node, port: 0 }, out)
        .unwrap();
    graph.update_indices();

    assert!(graph.is_finalized());
    assert_eq!(graph.input_count(), 1);
    assert_eq!(graph.output_count(), 1);

    let mut seen = Vec::new();
    for (_, node) in graph.nodes() {
        for port in node.inputs() {
            seen.push(port.graph_index());
        }
        for port in node.outputs() {
            seen.push(port.graph_index());
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..seen.len()).collect::<Vec<_>>());
}
