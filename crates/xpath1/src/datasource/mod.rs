//! Defines the core abstraction for a navigable, read-only document tree.
use std::hash::Hash;

/// A qualified name, consisting of an optional prefix and a local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local_part: &'a str,
}

/// A namespace declaration attribute carried by an element.
///
/// `prefix: None` stands for the default declaration (`xmlns="..."`),
/// `prefix: Some("k")` for `xmlns:k="..."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceDeclaration<'a> {
    pub prefix: Option<&'a str>,
    pub uri: &'a str,
}

impl NamespaceDeclaration<'_> {
    /// The attribute name this declaration is written as.
    pub fn attribute_name(&self) -> String {
        match self.prefix {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        }
    }
}

/// The type of a node in the tree, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// The contract for a node in a read-only, hierarchical document.
///
/// The evaluator is written exclusively against this trait, so any tree that can
/// answer these questions can be queried. `Ord` must follow document order.
///
/// `'a` is the lifetime of the underlying document.
pub trait DataSourceNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    /// The type of the node (Element, Text, Attribute, etc.).
    fn node_type(&self) -> NodeType;

    /// The qualified name of the node as written in the document. Returns `None` for
    /// node types without a name, such as text or root nodes. For a processing
    /// instruction, this is its target.
    fn name(&self) -> Option<QName<'a>>;

    /// The namespace URI of an element or attribute name, `None` when the name is in
    /// no namespace or the node has no name.
    fn namespace_uri(&self) -> Option<&'a str>;

    /// The string value of the node, as defined by the XPath 1.0 `string()` function.
    /// - For a text node, this is its content.
    /// - For an element or the root, this is the concatenation of the string values
    ///   of all descendant text nodes.
    /// - For an attribute, this is its value.
    /// - For a comment or processing instruction, this is its content.
    fn string_value(&self) -> String;

    /// An iterator over the attribute nodes of this node, excluding namespace
    /// declarations. Empty for non-element nodes.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The namespace declarations written on this node itself (not inherited ones).
    /// Empty for non-element nodes.
    fn namespace_declarations(&self) -> Box<dyn Iterator<Item = NamespaceDeclaration<'a>> + 'a>;

    /// An iterator over the child nodes of this node.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The parent node. `None` for the root node.
    fn parent(&self) -> Option<Self>;
}
