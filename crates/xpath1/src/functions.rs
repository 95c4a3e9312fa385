//! Defines the registry and built-in implementations for XPath 1.0 functions.

use super::engine::{EvaluationContext, XPathValue, number_to_string};
use crate::datasource::{DataSourceNode, NodeType};
use crate::error::XPathError;
use std::collections::HashMap;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The XPath 1.0 core library: name, minimum argument count, maximum argument count
/// (`None` for variadic).
const BUILTINS: &[(&str, usize, Option<usize>)] = &[
    // Node-set
    ("last", 0, Some(0)),
    ("position", 0, Some(0)),
    ("count", 1, Some(1)),
    ("local-name", 0, Some(1)),
    ("namespace-uri", 0, Some(1)),
    ("name", 0, Some(1)),
    // String
    ("string", 0, Some(1)),
    ("concat", 2, None),
    ("starts-with", 2, Some(2)),
    ("contains", 2, Some(2)),
    ("substring-before", 2, Some(2)),
    ("substring-after", 2, Some(2)),
    ("substring", 2, Some(3)),
    ("string-length", 0, Some(1)),
    ("normalize-space", 0, Some(1)),
    ("translate", 3, Some(3)),
    // Boolean
    ("boolean", 1, Some(1)),
    ("not", 1, Some(1)),
    ("true", 0, Some(0)),
    ("false", 0, Some(0)),
    ("lang", 1, Some(1)),
    // Number
    ("number", 0, Some(1)),
    ("sum", 1, Some(1)),
    ("floor", 1, Some(1)),
    ("ceiling", 1, Some(1)),
    ("round", 1, Some(1)),
];

/// How many arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    fn describe(&self) -> String {
        match self.max {
            Some(max) if max == self.min => format!("Expected {} argument(s)", self.min),
            Some(max) => format!("Expected {} to {} arguments", self.min, max),
            None => format!("Expected at least {} arguments", self.min),
        }
    }
}

/// The set of functions an expression may call, consulted when compiling.
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Arity>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, arity: Arity) {
        self.functions.insert(name, arity);
    }

    pub fn get(&self, name: &str) -> Option<Arity> {
        self.functions.get(name).copied()
    }

    /// Checks that `name` is registered and accepts `arg_count` arguments.
    pub fn validate_call(&self, name: &str, arg_count: usize) -> Result<(), XPathError> {
        let arity = self
            .get(name)
            .ok_or_else(|| XPathError::UnknownFunction(name.to_string()))?;
        if arity.accepts(arg_count) {
            Ok(())
        } else {
            Err(arity_error(name, arity))
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        for &(name, min, max) in BUILTINS {
            registry.register(name, Arity { min, max });
        }
        registry
    }
}

fn arity_error(name: &str, arity: Arity) -> XPathError {
    XPathError::FunctionError {
        function: format!("{}()", name),
        message: arity.describe(),
    }
}

fn check_arity(name: &str, arg_count: usize) -> Result<(), XPathError> {
    match BUILTINS.iter().find(|(builtin, _, _)| *builtin == name) {
        Some(&(_, min, max)) => {
            let arity = Arity { min, max };
            if arity.accepts(arg_count) {
                Ok(())
            } else {
                Err(arity_error(name, arity))
            }
        }
        None => Err(XPathError::UnknownFunction(name.to_string())),
    }
}

/// Dispatches a function call to the correct implementation.
pub fn evaluate_function<'a, N: DataSourceNode<'a>>(
    name: &str,
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<XPathValue<N>, XPathError> {
    check_arity(name, args.len())?;

    // Arity is checked above, so `args.remove(0)` below cannot go out of bounds.
    let value = match name {
        // Node-set
        "last" => XPathValue::Number(e_ctx.context_size as f64),
        "position" => XPathValue::Number(e_ctx.context_position as f64),
        "count" => XPathValue::Number(node_set_arg("count", args.remove(0))?.len() as f64),
        "local-name" => {
            let node = optional_node_arg("local-name", args, e_ctx)?;
            XPathValue::String(
                node.and_then(|n| n.name().map(|q| q.local_part.to_string()))
                    .unwrap_or_default(),
            )
        }
        "namespace-uri" => {
            let node = optional_node_arg("namespace-uri", args, e_ctx)?;
            XPathValue::String(
                node.and_then(|n| n.namespace_uri())
                    .unwrap_or_default()
                    .to_string(),
            )
        }
        "name" => {
            let node = optional_node_arg("name", args, e_ctx)?;
            XPathValue::String(node.map(qualified_name).unwrap_or_default())
        }

        // String
        "string" => XPathValue::String(string_arg_or_context(args, e_ctx)),
        "concat" => XPathValue::String(args.iter().map(|v| v.to_string()).collect()),
        "starts-with" => {
            let (s1, s2) = two_strings(args);
            XPathValue::Boolean(s1.starts_with(&s2))
        }
        "contains" => {
            let (s1, s2) = two_strings(args);
            XPathValue::Boolean(s1.contains(&s2))
        }
        "substring-before" => {
            let (s1, s2) = two_strings(args);
            let before = s1.find(&s2).map(|index| &s1[..index]).unwrap_or("");
            XPathValue::String(before.to_string())
        }
        "substring-after" => {
            let (s1, s2) = two_strings(args);
            let after = s1.find(&s2).map(|index| &s1[index + s2.len()..]).unwrap_or("");
            XPathValue::String(after.to_string())
        }
        "substring" => func_substring(args),
        "string-length" => {
            XPathValue::Number(string_arg_or_context(args, e_ctx).chars().count() as f64)
        }
        "normalize-space" => {
            let s = string_arg_or_context(args, e_ctx);
            XPathValue::String(s.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        "translate" => func_translate(args),

        // Boolean
        "boolean" => XPathValue::Boolean(args.remove(0).to_bool()),
        "not" => XPathValue::Boolean(!args.remove(0).to_bool()),
        "true" => XPathValue::Boolean(true),
        "false" => XPathValue::Boolean(false),
        "lang" => func_lang(args.remove(0).to_string(), e_ctx),

        // Number
        "number" => XPathValue::Number(match args.pop() {
            Some(arg) => arg.to_number(),
            None => XPathValue::NodeSet(vec![e_ctx.context_node]).to_number(),
        }),
        "sum" => {
            let nodes = node_set_arg("sum", args.remove(0))?;
            XPathValue::Number(
                nodes
                    .iter()
                    .map(|node| crate::engine::string_to_number(&node.string_value()))
                    .sum(),
            )
        }
        "floor" => XPathValue::Number(args.remove(0).to_number().floor()),
        "ceiling" => XPathValue::Number(args.remove(0).to_number().ceil()),
        "round" => XPathValue::Number(xpath_round(args.remove(0).to_number())),

        _ => return Err(XPathError::UnknownFunction(name.to_string())),
    };
    Ok(value)
}

fn node_set_arg<N>(function: &str, value: XPathValue<N>) -> Result<Vec<N>, XPathError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        XPathValue::String(s) => Err(XPathError::TypeError(format!(
            "{}() argument must be a node-set, got the string '{}'",
            function, s
        ))),
        XPathValue::Number(n) => Err(XPathError::TypeError(format!(
            "{}() argument must be a node-set, got the number {}",
            function,
            number_to_string(n)
        ))),
        XPathValue::Boolean(b) => Err(XPathError::TypeError(format!(
            "{}() argument must be a node-set, got the boolean {}",
            function, b
        ))),
    }
}

/// The first node of the optional node-set argument, or the context node when the
/// argument is omitted.
fn optional_node_arg<'a, N: DataSourceNode<'a>>(
    function: &str,
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, N>,
) -> Result<Option<N>, XPathError> {
    match args.pop() {
        None => Ok(Some(e_ctx.context_node)),
        Some(arg) => Ok(node_set_arg(function, arg)?.first().copied()),
    }
}

fn qualified_name<'a, N: DataSourceNode<'a>>(node: N) -> String {
    match node.name() {
        Some(q) => match q.prefix {
            Some(prefix) => format!("{}:{}", prefix, q.local_part),
            None => q.local_part.to_string(),
        },
        None => String::new(),
    }
}

fn string_arg_or_context<'a, N: DataSourceNode<'a>>(
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, N>,
) -> String {
    match args.pop() {
        Some(arg) => arg.to_string(),
        None => e_ctx.context_node.string_value(),
    }
}

fn two_strings<'a, N: DataSourceNode<'a>>(mut args: Vec<XPathValue<N>>) -> (String, String) {
    let s2 = args.remove(1).to_string();
    let s1 = args.remove(0).to_string();
    (s1, s2)
}

/// XPath 1.0 round(): halves go towards positive infinity; NaN, infinities and
/// zeros are returned unchanged.
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return n;
    }
    (n + 0.5).floor()
}

fn func_substring<'a, N: DataSourceNode<'a>>(mut args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let length_val = if args.len() == 3 {
        Some(args.remove(2).to_number())
    } else {
        None
    };
    let start_val = args.remove(1).to_number();
    let s = args.remove(0).to_string();

    let first = xpath_round(start_val);
    let last = match length_val {
        Some(l) => first + xpath_round(l),
        None => f64::INFINITY,
    };

    // Positions are 1-based; NaN bounds select nothing.
    let result = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (i + 1) as f64;
            pos >= first && pos < last
        })
        .map(|(_, c)| c)
        .collect::<String>();
    XPathValue::String(result)
}

fn func_translate<'a, N: DataSourceNode<'a>>(mut args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let to_str: Vec<char> = args.remove(2).to_string().chars().collect();
    let from_str: Vec<char> = args.remove(1).to_string().chars().collect();
    let source_str = args.remove(0).to_string();
    let result = source_str
        .chars()
        .filter_map(|c| match from_str.iter().position(|&fc| fc == c) {
            Some(pos) => to_str.get(pos).copied(),
            None => Some(c),
        })
        .collect::<String>();
    XPathValue::String(result)
}

/// Finds the nearest `xml:lang` on the context node or its ancestors and checks it
/// against `test_lang`, ignoring case and allowing a sub-language suffix.
fn func_lang<'a, N: DataSourceNode<'a>>(test_lang: String, e_ctx: &EvaluationContext<'a, N>) -> XPathValue<N> {
    let test_lang = test_lang.to_lowercase();
    let mut current = Some(e_ctx.context_node);

    if current.is_some_and(|n| n.node_type() != NodeType::Element) {
        current = current.and_then(|n| n.parent());
    }

    while let Some(node) = current {
        let lang_attr = node.attributes().find(|attr| {
            attr.namespace_uri() == Some(XML_NAMESPACE)
                && attr.name().is_some_and(|q| q.local_part == "lang")
        });
        if let Some(attr) = lang_attr {
            let node_lang = attr.string_value().to_lowercase();
            return XPathValue::Boolean(
                node_lang == test_lang || node_lang.starts_with(&format!("{}-", test_lang)),
            );
        }
        current = node.parent();
    }
    XPathValue::Boolean(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, MockTree, create_test_tree, ids};

    fn context<'a>(tree: &'a MockTree, id: usize) -> EvaluationContext<'a, MockNode<'a>> {
        EvaluationContext::for_node(tree.node(id))
    }

    fn eval_func<'a>(
        name: &str,
        args: Vec<XPathValue<MockNode<'a>>>,
        e_ctx: &EvaluationContext<'a, MockNode<'a>>,
    ) -> XPathValue<MockNode<'a>> {
        evaluate_function(name, args, e_ctx).unwrap()
    }

    fn s<'a>(value: &str) -> XPathValue<MockNode<'a>> {
        XPathValue::String(value.to_string())
    }

    fn n<'a>(value: f64) -> XPathValue<MockNode<'a>> {
        XPathValue::Number(value)
    }

    #[test]
    fn test_registry_validates_names_and_arity() {
        let registry = FunctionRegistry::default();
        assert!(registry.validate_call("contains", 2).is_ok());
        assert!(registry.validate_call("concat", 5).is_ok());
        assert_eq!(
            registry.validate_call("key", 2),
            Err(XPathError::UnknownFunction("key".to_string()))
        );
        assert!(matches!(
            registry.validate_call("contains", 1),
            Err(XPathError::FunctionError { .. })
        ));
    }

    #[test]
    fn test_func_concat() {
        let tree = create_test_tree();
        let e_ctx = context(&tree, ids::ROOT);
        let result = eval_func("concat", vec![s("a"), n(1.0), XPathValue::Boolean(true)], &e_ctx);
        assert_eq!(result.to_string(), "a1true");
    }

    #[test]
    fn test_func_substring() {
        let tree = create_test_tree();
        let e_ctx = context(&tree, ids::ROOT);
        assert_eq!(eval_func("substring", vec![s("12345"), n(2.0), n(3.0)], &e_ctx).to_string(), "234");
        assert_eq!(eval_func("substring", vec![s("12345"), n(1.5), n(2.6)], &e_ctx).to_string(), "234");
        assert_eq!(eval_func("substring", vec![s("12345"), n(0.0), n(3.0)], &e_ctx).to_string(), "12");
        assert_eq!(eval_func("substring", vec![s("12345"), n(f64::NAN), n(3.0)], &e_ctx).to_string(), "");
        assert_eq!(
            eval_func("substring", vec![s("12345"), n(-42.0), n(f64::INFINITY)], &e_ctx).to_string(),
            "12345"
        );
    }

    #[test]
    fn test_func_substring_before_after() {
        let tree = create_test_tree();
        let e_ctx = context(&tree, ids::ROOT);
        assert_eq!(eval_func("substring-before", vec![s("1999/04/01"), s("/")], &e_ctx).to_string(), "1999");
        assert_eq!(eval_func("substring-after", vec![s("1999/04/01"), s("/")], &e_ctx).to_string(), "04/01");
        assert_eq!(eval_func("substring-after", vec![s("abc"), s("z")], &e_ctx).to_string(), "");
    }

    #[test]
    fn test_func_string_length_and_normalize_space() {
        let tree = create_test_tree();
        let e_ctx = context(&tree, ids::PARA1);
        assert_eq!(eval_func("string-length", vec![], &e_ctx).to_number(), 5.0);
        assert_eq!(
            eval_func("normalize-space", vec![s("  a \n b  ")], &e_ctx).to_string(),
            "a b"
        );
    }

    #[test]
    fn test_func_translate() {
        let tree = create_test_tree();
        let e_ctx = context(&tree, ids::ROOT);
        assert_eq!(eval_func("translate", vec![s("bar"), s("abc"), s("ABC")], &e_ctx).to_string(), "BAr");
        assert_eq!(eval_func("translate", vec![s("--aaa--"), s("abc-"), s("ABC")], &e_ctx).to_string(), "AAA");
    }

    #[test]
    fn test_func_lang() {
        let tree = create_test_tree();
        let e_ctx = context(&tree, ids::PARA1_TEXT);
        assert!(eval_func("lang", vec![s("EN")], &e_ctx).to_bool());
        assert!(!eval_func("lang", vec![s("de")], &e_ctx).to_bool());
        let e_ctx = context(&tree, ids::PARA2);
        assert!(!eval_func("lang", vec![s("en")], &e_ctx).to_bool());
    }

    #[test]
    fn test_func_number_and_sum() {
        let tree = create_test_tree();
        let e_ctx = context(&tree, ids::ROOT);
        assert!(eval_func("number", vec![s("abc")], &e_ctx).to_number().is_nan());
        assert_eq!(eval_func("number", vec![s(" 12 ")], &e_ctx).to_number(), 12.0);
        let nodes = XPathValue::NodeSet(vec![tree.node(ids::PARA1_ID_ATTR)]);
        assert!(eval_func("sum", vec![nodes], &e_ctx).to_number().is_nan());
        assert!(matches!(
            evaluate_function("sum", vec![n(1.0)], &e_ctx),
            Err(XPathError::TypeError(_))
        ));
    }

    #[test]
    fn test_func_round() {
        let tree = create_test_tree();
        let e_ctx = context(&tree, ids::ROOT);
        assert_eq!(eval_func("round", vec![n(2.5)], &e_ctx).to_number(), 3.0);
        assert_eq!(eval_func("round", vec![n(-2.5)], &e_ctx).to_number(), -2.0);
        assert_eq!(eval_func("floor", vec![n(-1.5)], &e_ctx).to_number(), -2.0);
        assert_eq!(eval_func("ceiling", vec![n(1.2)], &e_ctx).to_number(), 2.0);
    }

    #[test]
    fn test_func_last_and_position() {
        let tree = create_test_tree();
        let e_ctx = EvaluationContext::new(tree.node(ids::PARA2), tree.node(ids::DOCUMENT), 2, 5);
        assert_eq!(eval_func("position", vec![], &e_ctx).to_number(), 2.0);
        assert_eq!(eval_func("last", vec![], &e_ctx).to_number(), 5.0);
    }

    #[test]
    fn test_name_functions() {
        let tree = create_test_tree();
        let item = XPathValue::NodeSet(vec![tree.node(ids::ITEM)]);
        let e_ctx = context(&tree, ids::ROOT);
        assert_eq!(eval_func("local-name", vec![item.clone()], &e_ctx).to_string(), "item");
        assert_eq!(eval_func("name", vec![item.clone()], &e_ctx).to_string(), "x:item");
        assert_eq!(eval_func("namespace-uri", vec![item], &e_ctx).to_string(), "urn:x");
        assert_eq!(eval_func("local-name", vec![], &e_ctx).to_string(), "root");
        assert_eq!(eval_func("namespace-uri", vec![], &e_ctx).to_string(), "");
        assert_eq!(
            eval_func("name", vec![XPathValue::NodeSet(vec![])], &e_ctx).to_string(),
            ""
        );
    }

    #[test]
    fn test_runtime_arity_check() {
        let tree = create_test_tree();
        let e_ctx = context(&tree, ids::ROOT);
        assert!(matches!(
            evaluate_function("not", vec![], &e_ctx),
            Err(XPathError::FunctionError { .. })
        ));
    }
}
