//! A `nom`-based parser for the XPath 1.0 expression language.

use super::ast::*;
use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

/// Names that look like function calls but are node-type tests.
const NODE_TYPE_NAMES: [&str; 4] = ["text", "node", "comment", "processing-instruction"];

// --- Main Public Parser ---

pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rem, _)) => Err(XPathError::XPathParse(
            input.to_string(),
            format!("Parser did not consume all input. Remainder: '{}'", rem),
        )),
        Err(e) => Err(XPathError::XPathParse(input.to_string(), e.to_string())),
    }
}

// --- Combinators & Helpers ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Matches `word` only when it is not the start of a longer name (`or` vs `order`).
fn keyword<'a>(
    word: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(peek(satisfy(is_name_char))))
}

fn build_binary_expr_parser<'a, F, G>(
    sub_expr_parser: F,
    op_parser: G,
) -> impl FnMut(&'a str) -> IResult<&'a str, Expression>
where
    F: Parser<&'a str, Output = Expression, Error = nom::error::Error<&'a str>> + Clone,
    G: Parser<&'a str, Output = BinaryOperator, Error = nom::error::Error<&'a str>> + Clone,
{
    move |input: &str| {
        let (input, mut left) = sub_expr_parser.clone().parse(input)?;
        let (input, remainder) =
            many0(pair(ws(op_parser.clone()), sub_expr_parser.clone())).parse(input)?;

        for (op, right) in remainder {
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok((input, left))
    }
}

// --- Expression Parsers (in order of precedence) ---

fn expression(input: &str) -> IResult<&str, Expression> {
    or_expr(input)
}

fn or_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("or"), |_| BinaryOperator::Or).parse(input)
}

fn and_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("and"), |_| BinaryOperator::And).parse(input)
}

fn equality_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(tag("!="), |_| BinaryOperator::NotEquals),
        map(char('='), |_| BinaryOperator::Equals),
    ))
    .parse(input)
}

fn relational_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(tag("<="), |_| BinaryOperator::LessThanOrEqual),
        map(tag(">="), |_| BinaryOperator::GreaterThanOrEqual),
        map(char('<'), |_| BinaryOperator::LessThan),
        map(char('>'), |_| BinaryOperator::GreaterThan),
    ))
    .parse(input)
}

fn additive_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('+'), |_| BinaryOperator::Plus),
        map(char('-'), |_| BinaryOperator::Minus),
    ))
    .parse(input)
}

fn multiplicative_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('*'), |_| BinaryOperator::Multiply),
        map(keyword("div"), |_| BinaryOperator::Divide),
        map(keyword("mod"), |_| BinaryOperator::Modulo),
    ))
    .parse(input)
}

fn union_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(char('|'), |_| BinaryOperator::Union).parse(input)
}

fn or_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(and_expr, or_op)(input)
}

fn and_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(equality_expr, and_op)(input)
}

fn equality_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(relational_expr, equality_op)(input)
}

fn relational_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(additive_expr, relational_op)(input)
}

fn additive_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(multiplicative_expr, additive_op)(input)
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(unary_expr, multiplicative_op)(input)
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    if let Ok((i, _)) = ws(char::<&str, nom::error::Error<&str>>('-')).parse(input) {
        let (i, expr) = unary_expr(i)?;
        return Ok((
            i,
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(expr),
            },
        ));
    }
    union_expr(input)
}

fn union_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(path_expr, union_op)(input)
}

/// A path is either a plain location path or a filter expression (a primary
/// expression with optional predicates) followed by further steps.
fn path_expr(input: &str) -> IResult<&str, Expression> {
    // Primary expressions go first so that `position()` is read as a call and not
    // as a step named `position`.
    if let Ok((i, filter)) = filter_expr(input) {
        let (i, remainder) = many0(pair(ws(path_separator), step)).parse(i)?;
        if remainder.is_empty() {
            return Ok((i, filter));
        }
        let result = Expression::LocationPath(LocationPath {
            start_point: Some(Box::new(filter)),
            is_absolute: false,
            steps: append_steps(vec![], remainder),
        });
        return Ok((i, result));
    }

    map(ws(location_path), Expression::LocationPath).parse(input)
}

fn filter_expr(input: &str) -> IResult<&str, Expression> {
    let (i, base) = primary_expr(input)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    if predicates.is_empty() {
        Ok((i, base))
    } else {
        Ok((
            i,
            Expression::Filter {
                base: Box::new(base),
                predicates,
            },
        ))
    }
}

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        map(number_literal, Expression::Number),
        map(string_literal, Expression::Literal),
        function_call,
        delimited(ws(char('(')), expression, ws(char(')'))),
    )))
    .parse(input)
}

// --- Literal Parsers ---

fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

fn number_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        |s: &str| s.parse::<f64>(),
    )
    .parse(input)
}

// --- Name and NodeTest Parsers ---

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(is_name_start_char),
        take_while(is_name_char),
    ))
    .parse(input)
}

/// Splits `k:b` into `(Some("k"), "b")` and `b` into `(None, "b")`.
fn q_name_parts(input: &str) -> IResult<&str, (Option<&str>, &str)> {
    let (i, first) = nc_name(input)?;
    match preceded(char(':'), nc_name).parse(i) {
        Ok((rest, local)) => Ok((rest, (Some(first), local))),
        Err(_) => Ok((i, (None, first))),
    }
}

fn q_name(input: &str) -> IResult<&str, String> {
    map(recognize(q_name_parts), |s: &str| s.to_string()).parse(input)
}

fn empty_parens(input: &str) -> IResult<&str, ()> {
    map(pair(ws(char('(')), char(')')), |_| ()).parse(input)
}

fn node_type_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        map(terminated(keyword("text"), empty_parens), |_| {
            NodeTest::NodeType(NodeTypeTest::Text)
        }),
        map(terminated(keyword("node"), empty_parens), |_| {
            NodeTest::NodeType(NodeTypeTest::Node)
        }),
        map(terminated(keyword("comment"), empty_parens), |_| {
            NodeTest::NodeType(NodeTypeTest::Comment)
        }),
        map(
            preceded(
                pair(keyword("processing-instruction"), ws(char('('))),
                terminated(opt(ws(string_literal)), char(')')),
            ),
            |target| NodeTest::NodeType(NodeTypeTest::ProcessingInstruction(target)),
        ),
    ))
    .parse(input)
}

pub fn node_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        map(char('*'), |_| NodeTest::Wildcard),
        node_type_test,
        map(terminated(nc_name, tag(":*")), |prefix: &str| {
            NodeTest::NamespaceWildcard {
                prefix: prefix.to_string(),
                namespace_uri: None,
            }
        }),
        map(q_name_parts, |(prefix, local)| {
            NodeTest::Name(NameTest::new(prefix, local))
        }),
    ))
    .parse(input)
}

// --- Path Parsers ---

fn axis(input: &str) -> IResult<&str, Axis> {
    map(
        terminated(
            alt((
                tag("child"),
                tag("descendant-or-self"),
                tag("descendant"),
                tag("attribute"),
                tag("parent"),
                tag("ancestor-or-self"),
                tag("ancestor"),
                tag("self"),
                tag("following-sibling"),
                tag("preceding-sibling"),
                tag("following"),
                tag("preceding"),
            )),
            ws(tag("::")),
        ),
        |axis_str: &str| match axis_str {
            "descendant-or-self" => Axis::DescendantOrSelf,
            "descendant" => Axis::Descendant,
            "attribute" => Axis::Attribute,
            "parent" => Axis::Parent,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "ancestor" => Axis::Ancestor,
            "self" => Axis::SelfAxis,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            _ => Axis::Child,
        },
    )
    .parse(input)
}

fn predicate(input: &str) -> IResult<&str, Expression> {
    delimited(ws(char('[')), expression, ws(char(']'))).parse(input)
}

fn path_separator(input: &str) -> IResult<&str, &str> {
    alt((tag("//"), tag("/"))).parse(input)
}

fn step(input: &str) -> IResult<&str, Step> {
    let (i, (axis, node_test)) = alt((
        map(tag(".."), |_| {
            (Axis::Parent, NodeTest::NodeType(NodeTypeTest::Node))
        }),
        map(
            terminated(char('.'), not(peek(satisfy(|c: char| c.is_ascii_digit())))),
            |_| (Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node)),
        ),
        map(preceded(ws(char('@')), node_test), |nt| (Axis::Attribute, nt)),
        map(pair(opt(axis), node_test), |(ax, nt)| {
            (ax.unwrap_or(Axis::Child), nt)
        }),
    ))
    .parse(input)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    Ok((
        i,
        Step {
            axis,
            node_test,
            predicates,
        },
    ))
}

fn append_steps(mut steps: Vec<Step>, remainder: Vec<(&str, Step)>) -> Vec<Step> {
    for (sep, next_step) in remainder {
        if sep == "//" {
            steps.push(Step::descendant_or_self());
        }
        steps.push(next_step);
    }
    steps
}

fn relative_steps(input: &str) -> IResult<&str, Vec<Step>> {
    let (i, first) = step(input)?;
    let (i, remainder) = many0(pair(ws(path_separator), step)).parse(i)?;
    Ok((i, append_steps(vec![first], remainder)))
}

fn location_path(input: &str) -> IResult<&str, LocationPath> {
    if let Ok((rem, _)) = tag::<&str, &str, nom::error::Error<&str>>("//").parse(input) {
        let (rem, steps) = relative_steps(rem)?;
        let mut all_steps = vec![Step::descendant_or_self()];
        all_steps.extend(steps);
        return Ok((
            rem,
            LocationPath {
                start_point: None,
                is_absolute: true,
                steps: all_steps,
            },
        ));
    }

    if let Ok((rem, _)) = char::<&str, nom::error::Error<&str>>('/').parse(input) {
        // A lone "/" selects the document root.
        let (rem, steps) = match relative_steps(rem) {
            Ok((after, steps)) => (after, steps),
            Err(_) => (rem, vec![]),
        };
        return Ok((
            rem,
            LocationPath {
                start_point: None,
                is_absolute: true,
                steps,
            },
        ));
    }

    let (rem, steps) = relative_steps(input)?;
    Ok((
        rem,
        LocationPath {
            start_point: None,
            is_absolute: false,
            steps,
        },
    ))
}

// --- Function Call Parser ---

fn function_call(input: &str) -> IResult<&str, Expression> {
    // A function call must be a QName followed by '('. This lookahead avoids
    // parsing a simple step name (like 'foo' in 'foo/bar') as a function.
    let (i, name) = q_name(input)?;
    let (i, _) = peek(ws(char('('))).parse(i)?;

    if NODE_TYPE_NAMES.contains(&name.as_str()) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }

    let (i, _) = multispace0(i)?;
    let (i, args) = delimited(
        char('('),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )
    .parse(i)?;

    Ok((i, Expression::FunctionCall { name, args }))
}
