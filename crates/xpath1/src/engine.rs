//! The evaluation engine for executing a compiled XPath AST against a generic `DataSourceNode`.

use super::ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator};
use super::{axes, functions, operators};
use crate::datasource::{DataSourceNode, NodeType};
use crate::error::XPathError;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

/// Represents the possible result types of an XPath expression evaluation.
#[derive(Debug, Clone)]
pub enum XPathValue<N> {
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a, N: DataSourceNode<'a>> XPathValue<N> {
    /// Coerces the XPath value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// Coerces the XPath value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => string_to_number(s),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|n| string_to_number(&n.string_value()))
                .unwrap_or(f64::NAN),
        }
    }

    /// The XPath type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }
}

impl<'a, N: DataSourceNode<'a>> fmt::Display for XPathValue<N> {
    /// Coerces the XPath value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => write!(
                f,
                "{}",
                nodes.first().map(|n| n.string_value()).unwrap_or_default()
            ),
            XPathValue::String(s) => write!(f, "{}", s),
            XPathValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Parses a string with the XPath `Number` grammar: optional whitespace, an optional
/// minus sign, digits with at most one decimal point. Anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if well_formed {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Formats a number the way the XPath `string()` function does.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

/// A container for the state needed while evaluating one expression.
/// `'a` is the lifetime of the underlying document.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a, N: DataSourceNode<'a>> {
    pub context_node: N,
    pub root_node: N,
    pub context_position: usize, // 1-based index
    pub context_size: usize,
    _marker: PhantomData<&'a ()>,
}

impl<'a, N: DataSourceNode<'a>> EvaluationContext<'a, N> {
    pub fn new(context_node: N, root_node: N, context_position: usize, context_size: usize) -> Self {
        Self {
            context_node,
            root_node,
            context_position,
            context_size,
            _marker: PhantomData,
        }
    }

    /// A context positioned on `node` as the only member of its node-set.
    pub fn for_node(node: N) -> Self {
        Self::new(node, root_of(node), 1, 1)
    }
}

/// Walks up the parent chain to the topmost node.
pub fn root_of<'a, N: DataSourceNode<'a>>(node: N) -> N {
    let mut current = node;
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}

/// Evaluates an expression and returns a concrete `XPathValue`.
///
/// Name tests are matched against the namespace URIs bound at compile time, so
/// expressions should come from [`crate::compile`].
pub fn evaluate<'a, N>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(XPathValue::String(s.clone())),
        Expression::Number(n) => Ok(XPathValue::Number(*n)),
        Expression::LocationPath(path) => {
            let nodes = evaluate_location_path(path, e_ctx)?;
            Ok(XPathValue::NodeSet(nodes))
        }
        Expression::Filter { base, predicates } => {
            let nodes = expect_node_set(evaluate(base, e_ctx)?, "filter expression")?;
            let filtered = apply_predicates(nodes, predicates, e_ctx)?;
            Ok(XPathValue::NodeSet(filtered))
        }
        Expression::FunctionCall { name, args } => {
            let mut evaluated_args = Vec::with_capacity(args.len());
            for arg in args {
                evaluated_args.push(evaluate(arg, e_ctx)?);
            }
            functions::evaluate_function(name, evaluated_args, e_ctx)
        }
        Expression::BinaryOp { left, op, right } => match op {
            BinaryOperator::Or => {
                if evaluate(left, e_ctx)?.to_bool() {
                    return Ok(XPathValue::Boolean(true));
                }
                Ok(XPathValue::Boolean(evaluate(right, e_ctx)?.to_bool()))
            }
            BinaryOperator::And => {
                if !evaluate(left, e_ctx)?.to_bool() {
                    return Ok(XPathValue::Boolean(false));
                }
                Ok(XPathValue::Boolean(evaluate(right, e_ctx)?.to_bool()))
            }
            _ => {
                let left_val = evaluate(left, e_ctx)?;
                let right_val = evaluate(right, e_ctx)?;
                operators::evaluate(*op, left_val, right_val)
            }
        },
        Expression::UnaryOp { op, expr } => {
            let val = evaluate(expr, e_ctx)?;
            match op {
                UnaryOperator::Minus => Ok(XPathValue::Number(-val.to_number())),
            }
        }
    }
}

fn expect_node_set<N>(value: XPathValue<N>, what: &str) -> Result<Vec<N>, XPathError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        XPathValue::String(_) => Err(XPathError::TypeError(format!("{} must be a node-set, got a string", what))),
        XPathValue::Number(_) => Err(XPathError::TypeError(format!("{} must be a node-set, got a number", what))),
        XPathValue::Boolean(_) => Err(XPathError::TypeError(format!("{} must be a node-set, got a boolean", what))),
    }
}

fn evaluate_location_path<'a, N>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let initial_context = if let Some(start_expr) = &path.start_point {
        expect_node_set(evaluate(start_expr, e_ctx)?, "path start")?
    } else if path.is_absolute {
        vec![e_ctx.root_node]
    } else {
        vec![e_ctx.context_node]
    };

    let mut current_nodes = initial_context;
    for step in &path.steps {
        current_nodes = evaluate_step(step, &current_nodes, e_ctx)?;
    }
    Ok(current_nodes)
}

/// Evaluates a single step for every context node: axis collection, node test, and
/// predicates (numbered along the axis), then merges the results in document order.
fn evaluate_step<'a, N>(
    step: &Step,
    context_nodes: &[N],
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut seen = HashSet::new();
    let mut result_nodes = Vec::new();

    for &node in context_nodes {
        let tested: Vec<N> = axes::collect(step.axis, node)
            .into_iter()
            .filter(|candidate| matches_node_test(*candidate, &step.node_test, step.axis))
            .collect();
        for selected in apply_predicates(tested, &step.predicates, e_ctx)? {
            if seen.insert(selected) {
                result_nodes.push(selected);
            }
        }
    }

    result_nodes.sort();
    Ok(result_nodes)
}

/// Checks a node against a `NodeTest`. Name tests and `*` only match the principal
/// node type of the axis: attributes on the attribute axis, elements elsewhere.
fn matches_node_test<'a, N>(node: N, test: &NodeTest, axis: Axis) -> bool
where
    N: DataSourceNode<'a> + 'a,
{
    let principal = if axis == Axis::Attribute {
        NodeType::Attribute
    } else {
        NodeType::Element
    };
    let namespace = node.namespace_uri().filter(|uri| !uri.is_empty());

    match test {
        NodeTest::Wildcard => node.node_type() == principal,
        NodeTest::Name(name_test) => {
            node.node_type() == principal
                && node
                    .name()
                    .is_some_and(|q_name| q_name.local_part == name_test.local_part)
                && namespace == name_test.namespace_uri.as_deref()
        }
        NodeTest::NamespaceWildcard { namespace_uri, .. } => {
            node.node_type() == principal
                && namespace.is_some()
                && namespace == namespace_uri.as_deref()
        }
        NodeTest::NodeType(ntt) => match ntt {
            NodeTypeTest::Text => node.node_type() == NodeType::Text,
            NodeTypeTest::Comment => node.node_type() == NodeType::Comment,
            NodeTypeTest::ProcessingInstruction(target) => {
                node.node_type() == NodeType::ProcessingInstruction
                    && target.as_deref().is_none_or(|t| {
                        node.name().is_some_and(|q_name| q_name.local_part == t)
                    })
            }
            NodeTypeTest::Node => true,
        },
    }
}

/// Filters a node list through each predicate in turn. Positions are 1-based and
/// follow the order of `nodes`.
fn apply_predicates<'a, N>(
    nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut final_nodes = nodes;
    for predicate in predicates {
        let context_size = final_nodes.len();
        let mut predicate_results = Vec::with_capacity(context_size);
        for (i, node) in final_nodes.iter().enumerate() {
            let predicate_e_ctx = EvaluationContext::new(*node, e_ctx.root_node, i + 1, context_size);
            let keep = match evaluate(predicate, &predicate_e_ctx)? {
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                predicate_results.push(*node);
            }
        }
        final_nodes = predicate_results;
    }
    Ok(final_nodes)
}
