// src/error.rs
use nsxpath_xpath1::XPathError;
use thiserror::Error;

/// The error type for every selection operation.
#[derive(Error, Debug)]
pub enum SelectError {
    /// A resolver query was made without an argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A traversal call on an iterator that has been detached.
    #[error("called {direction}Node() after detach()")]
    InvalidState { direction: Direction },

    /// The expression has more placeholder markers than arguments were supplied.
    /// `position` is 1-based.
    #[error("Placeholder {position} in '{expression}' has no matching argument ({supplied} supplied)")]
    MissingPlaceholderArgument {
        expression: String,
        position: usize,
        supplied: usize,
    },

    #[error("XPath evaluation failed: {0}")]
    Evaluation(#[from] XPathError),

    #[error("XML parsing failed: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// The traversal direction named in an `InvalidState` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Next => write!(f, "next"),
            Direction::Previous => write!(f, "previous"),
        }
    }
}
