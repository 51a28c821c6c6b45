//! Engine errors.
//!
//! Missing data never surfaces here: a node without its required inputs
//! simply produces no outputs. These variants cover conditions that stop a
//! whole update.

/// Errors that abort an engine update or a document load.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The project has no graph flagged as main.
    #[error("project has no main graph")]
    NoMainGraph,

    /// The graph's connections form a cycle.
    #[error("cycle in graph '{graph}' through nodes {}", nodes.join(", "))]
    Cycle {
        /// Name of the graph containing the cycle.
        graph: String,
        /// Ids of the nodes in the offending strongly connected component.
        nodes: Vec<String>,
    },

    /// The update was cancelled between two node evaluations.
    #[error("evaluation cancelled")]
    Cancelled,

    /// Image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// A project or graph document could not be parsed.
    #[error("invalid document: {0}")]
    Document(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_nodes() {
        let err = EngineError::Cycle {
            graph: "main".to_owned(),
            nodes: vec!["a".to_owned(), "b".to_owned()],
        };
        assert_eq!(err.to_string(), "cycle in graph 'main' through nodes a, b");
    }

    #[test]
    fn document_errors_convert() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: EngineError = parse.into();
        assert!(matches!(err, EngineError::Document(_)));
    }
}
