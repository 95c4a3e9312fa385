//! Turns expression text into a `CompiledExpression`: parse, bind namespace
//! prefixes, validate function calls.

use crate::ast::{Expression, LocationPath, NodeTest};
use crate::datasource::DataSourceNode;
use crate::engine::{self, EvaluationContext, XPathValue};
use crate::error::XPathError;
use crate::functions::FunctionRegistry;
use crate::parser::parse_expression;
use std::collections::HashMap;

/// Supplies namespace bindings for the prefixes used in an expression.
pub trait NamespaceResolver {
    /// The URI bound to `prefix`, or `None` when the prefix is unbound.
    fn resolve_prefix(&self, prefix: &str) -> Option<&str>;
}

impl NamespaceResolver for HashMap<String, String> {
    fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.get(prefix).map(String::as_str)
    }
}

/// An expression whose prefixes have all been bound to namespace URIs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    expr: Expression,
}

/// Parses `source` and binds every prefixed name test through `resolver`.
pub fn compile(source: &str, resolver: &dyn NamespaceResolver) -> Result<CompiledExpression, XPathError> {
    let mut expr = parse_expression(source)?;
    let registry = FunctionRegistry::default();
    bind_expression(&mut expr, resolver, &registry)?;
    log::debug!("Compiled XPath expression '{}'", source);
    Ok(CompiledExpression {
        source: source.to_string(),
        expr,
    })
}

impl CompiledExpression {
    /// The expression text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    /// Evaluates with `context` as the context node, position and size 1.
    pub fn evaluate<'a, N>(&self, context: N) -> Result<XPathValue<N>, XPathError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        let e_ctx = EvaluationContext::for_node(context);
        engine::evaluate(&self.expr, &e_ctx)
    }

    /// Evaluates and requires a node-set result, returned in document order.
    pub fn evaluate_node_set<'a, N>(&self, context: N) -> Result<Vec<N>, XPathError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        match self.evaluate(context)? {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::TypeError(format!(
                "Expression '{}' evaluated to a {}, not a node-set",
                self.source,
                other.type_name()
            ))),
        }
    }
}

fn bind_prefix(prefix: &str, resolver: &dyn NamespaceResolver) -> Result<String, XPathError> {
    match resolver.resolve_prefix(prefix) {
        Some(uri) if !uri.is_empty() => Ok(uri.to_string()),
        _ => Err(XPathError::UnboundPrefix(prefix.to_string())),
    }
}

fn bind_expression(
    expr: &mut Expression,
    resolver: &dyn NamespaceResolver,
    registry: &FunctionRegistry,
) -> Result<(), XPathError> {
    match expr {
        Expression::Literal(_) | Expression::Number(_) => Ok(()),
        Expression::LocationPath(path) => bind_location_path(path, resolver, registry),
        Expression::Filter { base, predicates } => {
            bind_expression(base, resolver, registry)?;
            for predicate in predicates {
                bind_expression(predicate, resolver, registry)?;
            }
            Ok(())
        }
        Expression::FunctionCall { name, args } => {
            registry.validate_call(name, args.len())?;
            for arg in args {
                bind_expression(arg, resolver, registry)?;
            }
            Ok(())
        }
        Expression::BinaryOp { left, right, .. } => {
            bind_expression(left, resolver, registry)?;
            bind_expression(right, resolver, registry)
        }
        Expression::UnaryOp { expr, .. } => bind_expression(expr, resolver, registry),
    }
}

fn bind_location_path(
    path: &mut LocationPath,
    resolver: &dyn NamespaceResolver,
    registry: &FunctionRegistry,
) -> Result<(), XPathError> {
    if let Some(start) = &mut path.start_point {
        bind_expression(start, resolver, registry)?;
    }
    for step in &mut path.steps {
        match &mut step.node_test {
            NodeTest::Name(name_test) => {
                name_test.namespace_uri = match &name_test.prefix {
                    Some(prefix) => Some(bind_prefix(prefix, resolver)?),
                    None => None,
                };
            }
            NodeTest::NamespaceWildcard {
                prefix,
                namespace_uri,
            } => {
                *namespace_uri = Some(bind_prefix(prefix, resolver)?);
            }
            NodeTest::Wildcard | NodeTest::NodeType(_) => {}
        }
        for predicate in &mut step.predicates {
            bind_expression(predicate, resolver, registry)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, NodeTest};
    use crate::datasource::tests::{create_test_tree, ids};

    fn resolver() -> HashMap<String, String> {
        HashMap::from([("k".to_string(), "urn:k".to_string())])
    }

    fn first_step_test(compiled: &CompiledExpression) -> NodeTest {
        match compiled.expression() {
            Expression::LocationPath(path) => path.steps[0].node_test.clone(),
            other => panic!("expected a location path, got {:?}", other),
        }
    }

    #[test]
    fn test_prefixed_names_are_bound() {
        let compiled = compile("k:a", &resolver()).unwrap();
        match first_step_test(&compiled) {
            NodeTest::Name(name) => assert_eq!(name.namespace_uri.as_deref(), Some("urn:k")),
            other => panic!("expected a name test, got {:?}", other),
        }

        let compiled = compile("k:*", &resolver()).unwrap();
        assert_eq!(
            first_step_test(&compiled),
            NodeTest::NamespaceWildcard {
                prefix: "k".to_string(),
                namespace_uri: Some("urn:k".to_string())
            }
        );
    }

    #[test]
    fn test_prefixes_inside_predicates_are_bound() {
        let compiled = compile("a[k:b = 'x']/c", &resolver()).unwrap();
        assert_eq!(compiled.source(), "a[k:b = 'x']/c");
    }

    #[test]
    fn test_unbound_prefix_fails() {
        assert_eq!(
            compile("//q:a", &resolver()),
            Err(XPathError::UnboundPrefix("q".to_string()))
        );
        assert_eq!(
            compile("a[q:*]", &resolver()),
            Err(XPathError::UnboundPrefix("q".to_string()))
        );
    }

    #[test]
    fn test_empty_binding_counts_as_unbound() {
        let resolver = HashMap::from([("k".to_string(), String::new())]);
        assert_eq!(
            compile("k:a", &resolver),
            Err(XPathError::UnboundPrefix("k".to_string()))
        );
    }

    #[test]
    fn test_unknown_function_fails() {
        assert_eq!(
            compile("frobnicate(1)", &resolver()),
            Err(XPathError::UnknownFunction("frobnicate".to_string()))
        );
    }

    #[test]
    fn test_evaluate_node_set_rejects_scalars() {
        let tree = create_test_tree();
        let compiled = compile("count(//para)", &resolver()).unwrap();
        assert!(matches!(
            compiled.evaluate_node_set(tree.node(ids::DOCUMENT)),
            Err(XPathError::TypeError(_))
        ));
    }
}
