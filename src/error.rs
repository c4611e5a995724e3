use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Graph error: {0}")]
    Graph(String),
    #[error("Execution error: {0}")]
    Execution(String),
}

impl EngineError {
    pub fn graph(msg: impl Into<String>) -> Self {
        EngineError::Graph(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        EngineError::Execution(msg.into())
    }
}
