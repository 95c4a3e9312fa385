pub mod ast;
pub mod axes;
pub mod compiler;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod functions;
pub mod operators;
pub mod parser;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NameTest, NodeTest, Step};
pub use compiler::{CompiledExpression, NamespaceResolver, compile};
pub use datasource::{DataSourceNode, NamespaceDeclaration, NodeType, QName};
pub use engine::{EvaluationContext, XPathValue, evaluate};
pub use error::XPathError;
pub use functions::FunctionRegistry;
pub use parser::parse_expression;
