//! XPath 1.0 binary operators: comparisons, arithmetic and node-set union.

use crate::ast::BinaryOperator;
use crate::datasource::DataSourceNode;
use crate::engine::XPathValue;
use crate::error::XPathError;

/// Applies a non-short-circuiting binary operator to two evaluated operands.
pub fn evaluate<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    match op {
        BinaryOperator::Union => union(left, right),
        BinaryOperator::Or => Ok(XPathValue::Boolean(left.to_bool() || right.to_bool())),
        BinaryOperator::And => Ok(XPathValue::Boolean(left.to_bool() && right.to_bool())),
        BinaryOperator::Equals
        | BinaryOperator::NotEquals
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => Ok(XPathValue::Boolean(compare(op, &left, &right))),
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => Ok(XPathValue::Number(arithmetic(
            op,
            left.to_number(),
            right.to_number(),
        ))),
    }
}

fn union<'a, N: DataSourceNode<'a>>(
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    match (left, right) {
        (XPathValue::NodeSet(mut l), XPathValue::NodeSet(r)) => {
            l.extend(r);
            l.sort();
            l.dedup();
            Ok(XPathValue::NodeSet(l))
        }
        (l, r) => Err(XPathError::TypeError(format!(
            "The '|' operator requires node-sets, got {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn arithmetic(op: BinaryOperator, l: f64, r: f64) -> f64 {
    match op {
        BinaryOperator::Plus => l + r,
        BinaryOperator::Minus => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
        // Truncating remainder, sign follows the dividend.
        BinaryOperator::Modulo => l % r,
        _ => f64::NAN,
    }
}

/// Compares two values using the XPath 1.0 rules. A node-set compares true if any
/// of its members satisfies the comparison.
pub fn compare<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: &XPathValue<N>,
    right: &XPathValue<N>,
) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let right_strings: Vec<String> = r.iter().map(|n| n.string_value()).collect();
            l.iter().any(|a| {
                let a = XPathValue::<N>::String(a.string_value());
                right_strings
                    .iter()
                    .any(|b| compare_scalar(op, &a, &XPathValue::String(b.clone())))
            })
        }
        (XPathValue::NodeSet(nodes), XPathValue::Boolean(b)) => {
            compare_scalar::<N>(op, &XPathValue::Boolean(!nodes.is_empty()), &XPathValue::Boolean(*b))
        }
        (XPathValue::Boolean(b), XPathValue::NodeSet(nodes)) => {
            compare_scalar::<N>(op, &XPathValue::Boolean(*b), &XPathValue::Boolean(!nodes.is_empty()))
        }
        (XPathValue::NodeSet(nodes), other) => nodes
            .iter()
            .any(|n| compare_scalar(op, &XPathValue::String(n.string_value()), other)),
        (other, XPathValue::NodeSet(nodes)) => nodes
            .iter()
            .any(|n| compare_scalar(op, other, &XPathValue::String(n.string_value()))),
        _ => compare_scalar(op, left, right),
    }
}

/// Compares two non-node-set values. Equality converts to boolean if either side is
/// boolean, else to number if either side is a number, else compares strings.
/// Relational operators always compare numbers.
fn compare_scalar<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: &XPathValue<N>,
    right: &XPathValue<N>,
) -> bool {
    match op {
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let equal = match (left, right) {
                (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                    left.to_bool() == right.to_bool()
                }
                (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                    left.to_number() == right.to_number()
                }
                _ => left.to_string() == right.to_string(),
            };
            if op == BinaryOperator::Equals { equal } else { !equal }
        }
        BinaryOperator::LessThan => left.to_number() < right.to_number(),
        BinaryOperator::LessThanOrEqual => left.to_number() <= right.to_number(),
        BinaryOperator::GreaterThan => left.to_number() > right.to_number(),
        BinaryOperator::GreaterThanOrEqual => left.to_number() >= right.to_number(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, create_test_tree, ids};

    type Value<'a> = XPathValue<MockNode<'a>>;

    #[test]
    fn test_scalar_equality_rules() {
        let one: Value = XPathValue::Number(1.0);
        let one_str: Value = XPathValue::String("1.0".into());
        let truthy: Value = XPathValue::String("x".into());
        assert!(compare(BinaryOperator::Equals, &one, &one_str));
        assert!(compare(BinaryOperator::Equals, &XPathValue::Boolean(true), &truthy));
        assert!(compare(
            BinaryOperator::NotEquals,
            &XPathValue::<MockNode>::String("1".into()),
            &one_str
        ));
    }

    #[test]
    fn test_nan_is_never_equal() {
        let nan: Value = XPathValue::Number(f64::NAN);
        assert!(!compare(BinaryOperator::Equals, &nan, &nan));
        assert!(compare(BinaryOperator::NotEquals, &nan, &nan));
        assert!(!compare(BinaryOperator::LessThan, &nan, &XPathValue::Number(1.0)));
    }

    #[test]
    fn test_node_set_comparisons_are_existential() {
        let tree = create_test_tree();
        let paras: Value = XPathValue::NodeSet(vec![tree.node(ids::PARA1), tree.node(ids::PARA2)]);
        assert!(compare(BinaryOperator::Equals, &paras, &XPathValue::String("World".into())));
        assert!(compare(BinaryOperator::NotEquals, &paras, &XPathValue::String("World".into())));
        assert!(!compare(BinaryOperator::Equals, &paras, &XPathValue::String("Other".into())));

        let empty: Value = XPathValue::NodeSet(vec![]);
        assert!(!compare(BinaryOperator::Equals, &empty, &XPathValue::String("".into())));
        assert!(compare(BinaryOperator::Equals, &empty, &XPathValue::Boolean(false)));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(arithmetic(BinaryOperator::Modulo, 5.0, 2.0), 1.0);
        assert_eq!(arithmetic(BinaryOperator::Modulo, -5.0, 2.0), -1.0);
        assert_eq!(arithmetic(BinaryOperator::Divide, 1.0, 0.0), f64::INFINITY);
        assert!(arithmetic(BinaryOperator::Divide, 0.0, 0.0).is_nan());
    }

    #[test]
    fn test_union_requires_node_sets() {
        let tree = create_test_tree();
        let nodes: Value = XPathValue::NodeSet(vec![tree.node(ids::DIV), tree.node(ids::PARA1)]);
        let more: Value = XPathValue::NodeSet(vec![tree.node(ids::PARA1)]);
        match evaluate(BinaryOperator::Union, nodes, more).unwrap() {
            XPathValue::NodeSet(merged) => {
                assert_eq!(merged.iter().map(|n| n.id).collect::<Vec<_>>(), vec![ids::PARA1, ids::DIV]);
            }
            other => panic!("expected node-set, got {:?}", other),
        }
        let err = evaluate::<MockNode>(BinaryOperator::Union, XPathValue::Number(1.0), XPathValue::NodeSet(vec![]));
        assert!(matches!(err, Err(XPathError::TypeError(_))));
    }
}
