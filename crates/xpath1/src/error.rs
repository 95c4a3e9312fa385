use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("XPath parse error in '{0}': {1}")]
    XPathParse(String, String),

    #[error("Namespace prefix '{0}' is not bound")]
    UnboundPrefix(String),

    #[error("Unknown XPath function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Type error: {0}")]
    TypeError(String),
}
