//! Namespace bindings in scope at a node, as seen by the XPath compiler.

use crate::error::SelectError;
use indexmap::IndexMap;
use nsxpath_xpath1::{DataSourceNode, NamespaceResolver, NodeType};
use std::collections::HashMap;

/// The "no namespace" URI. Returned for the default namespace when none is declared
/// and for prefixes that are not bound.
pub const NO_NAMESPACE: &str = "";

pub const XML_PREFIX: &str = "xml";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_PREFIX: &str = "xmlns";
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

fn is_reserved(prefix: &str) -> bool {
    prefix == XML_PREFIX || prefix == XMLNS_PREFIX
}

/// The prefix→URI bindings and default namespace in scope at a reference node,
/// optionally merged with caller overrides.
///
/// Bindings are kept in insertion order: the fixed `xml`/`xmlns` bindings, then
/// declarations from the nearest ancestor outwards, then override prefixes that no
/// ancestor declared (sorted by prefix). Reverse lookups return the first match in
/// that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceContext {
    bindings: IndexMap<String, String>,
    default_uri: String,
}

impl NamespaceContext {
    /// Collects the declarations in scope at `node`.
    ///
    /// A document root has no declarations of its own, so the walk starts at its
    /// first child element instead.
    pub fn from_node<'a, N: DataSourceNode<'a>>(node: N) -> Self {
        let mut bindings = IndexMap::new();
        bindings.insert(XML_PREFIX.to_string(), XML_NAMESPACE.to_string());
        bindings.insert(XMLNS_PREFIX.to_string(), XMLNS_NAMESPACE.to_string());

        let start = if node.parent().is_none() {
            node.children().find(|child| child.node_type() == NodeType::Element)
        } else {
            Some(node)
        };

        let mut default_uri: Option<String> = None;
        let mut current = start;
        while let Some(visited) = current {
            let Some(parent) = visited.parent() else {
                break;
            };
            for declaration in visited.namespace_declarations() {
                match declaration.prefix {
                    None => {
                        if default_uri.is_none() {
                            log::trace!("Default namespace '{}' in scope", declaration.uri);
                            default_uri = Some(declaration.uri.to_string());
                        }
                    }
                    Some(prefix) if is_reserved(prefix) => {}
                    Some(prefix) => {
                        if !bindings.contains_key(prefix) {
                            log::trace!("Namespace prefix '{}' bound to '{}'", prefix, declaration.uri);
                            bindings.insert(prefix.to_string(), declaration.uri.to_string());
                        }
                    }
                }
            }
            current = Some(parent);
        }

        let context = Self {
            bindings,
            default_uri: default_uri.unwrap_or_else(|| NO_NAMESPACE.to_string()),
        };
        log::debug!(
            "Resolved {} namespace bindings (default namespace '{}')",
            context.bindings.len(),
            context.default_uri
        );
        context
    }

    /// Collects the declarations in scope at `node`, then applies `overrides`.
    ///
    /// An override replaces any ancestor binding for the same prefix. The empty
    /// prefix overrides the default namespace. Overrides for `xml` and `xmlns` are
    /// ignored.
    pub fn with_overrides<'a, N: DataSourceNode<'a>>(
        node: N,
        overrides: &HashMap<String, String>,
    ) -> Self {
        let mut context = Self::from_node(node);
        let mut entries: Vec<(&String, &String)> = overrides.iter().collect();
        entries.sort();
        for (prefix, uri) in entries {
            if prefix.is_empty() {
                context.default_uri = uri.clone();
            } else if is_reserved(prefix) {
                log::debug!("Ignoring override for reserved prefix '{}'", prefix);
            } else {
                context.bindings.insert(prefix.clone(), uri.clone());
            }
        }
        context
    }

    /// The URI bound to `prefix`. The empty prefix yields the default namespace;
    /// an unbound prefix yields [`NO_NAMESPACE`].
    pub fn uri_for_prefix(&self, prefix: Option<&str>) -> Result<&str, SelectError> {
        let prefix = prefix.ok_or_else(|| SelectError::InvalidArgument("prefix must not be null".to_string()))?;
        if prefix.is_empty() {
            return Ok(&self.default_uri);
        }
        Ok(self
            .bindings
            .get(prefix)
            .map(String::as_str)
            .unwrap_or(NO_NAMESPACE))
    }

    /// The first prefix bound to `uri`. The default namespace URI yields the empty
    /// prefix.
    pub fn prefix_for_uri(&self, uri: Option<&str>) -> Result<Option<&str>, SelectError> {
        let uri = uri.ok_or_else(|| SelectError::InvalidArgument("namespace URI must not be null".to_string()))?;
        if uri == self.default_uri {
            return Ok(Some(""));
        }
        Ok(self
            .bindings
            .iter()
            .find(|(_, bound)| bound.as_str() == uri)
            .map(|(prefix, _)| prefix.as_str()))
    }

    /// The prefixes bound to `uri`. Only the first match is reported, so the result
    /// holds at most one prefix.
    pub fn prefixes_for_uri(&self, uri: Option<&str>) -> Result<Vec<&str>, SelectError> {
        Ok(self.prefix_for_uri(uri)?.into_iter().collect())
    }

    pub fn default_uri(&self) -> &str {
        &self.default_uri
    }

    /// All prefix bindings in lookup order, the fixed ones included.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
    }
}

impl NamespaceResolver for NamespaceContext {
    fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        match self.uri_for_prefix(Some(prefix)) {
            Ok(uri) if uri != NO_NAMESPACE => Some(uri),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    fn element_named<'a>(doc: &'a XmlDocument<'a>, local: &str) -> crate::xml::XmlNode<'a, 'a> {
        doc.descendants()
            .find(|n| n.name().is_some_and(|q| q.local_part == local))
            .unwrap()
    }

    #[test]
    fn test_fixed_bindings_without_declarations() {
        let doc = XmlDocument::parse("<root><a/></root>").unwrap();
        let ctx = NamespaceContext::from_node(doc.root_node());
        assert_eq!(ctx.uri_for_prefix(Some("xml")).unwrap(), XML_NAMESPACE);
        assert_eq!(ctx.uri_for_prefix(Some("xmlns")).unwrap(), XMLNS_NAMESPACE);
        assert_eq!(ctx.uri_for_prefix(Some("")).unwrap(), NO_NAMESPACE);
        assert_eq!(ctx.uri_for_prefix(Some("nope")).unwrap(), NO_NAMESPACE);
    }

    #[test]
    fn test_null_arguments_are_rejected() {
        let doc = XmlDocument::parse("<root/>").unwrap();
        let ctx = NamespaceContext::from_node(doc.root_node());
        assert!(matches!(ctx.uri_for_prefix(None), Err(SelectError::InvalidArgument(_))));
        assert!(matches!(ctx.prefix_for_uri(None), Err(SelectError::InvalidArgument(_))));
        assert!(matches!(ctx.prefixes_for_uri(None), Err(SelectError::InvalidArgument(_))));
    }

    #[test]
    fn test_nearest_declaration_wins() {
        let doc = XmlDocument::parse(
            "<root xmlns='urn:outer' xmlns:k='urn:k1'><mid xmlns:k='urn:k2' xmlns='urn:inner'><leaf/></mid></root>",
        )
        .unwrap();
        let ctx = NamespaceContext::from_node(element_named(&doc, "leaf"));
        assert_eq!(ctx.uri_for_prefix(Some("k")).unwrap(), "urn:k2");
        assert_eq!(ctx.default_uri(), "urn:inner");

        let outer = NamespaceContext::from_node(element_named(&doc, "root"));
        assert_eq!(outer.uri_for_prefix(Some("k")).unwrap(), "urn:k1");
        assert_eq!(outer.uri_for_prefix(Some("")).unwrap(), "urn:outer");
    }

    #[test]
    fn test_document_root_starts_at_first_element() {
        let doc = XmlDocument::parse("<!-- lead --><root xmlns:k='abc'/>").unwrap();
        let ctx = NamespaceContext::from_node(doc.root_node());
        assert_eq!(ctx.uri_for_prefix(Some("k")).unwrap(), "abc");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let doc = XmlDocument::parse("<root xmlns:k='abc'><a/></root>").unwrap();
        let overrides = HashMap::from([
            ("k".to_string(), "def".to_string()),
            ("xml".to_string(), "urn:bogus".to_string()),
            ("".to_string(), "urn:default".to_string()),
        ]);
        let ctx = NamespaceContext::with_overrides(element_named(&doc, "a"), &overrides);
        assert_eq!(ctx.uri_for_prefix(Some("k")).unwrap(), "def");
        assert_eq!(ctx.uri_for_prefix(Some("xml")).unwrap(), XML_NAMESPACE);
        assert_eq!(ctx.default_uri(), "urn:default");
    }

    #[test]
    fn test_prefix_round_trip() {
        let doc = XmlDocument::parse("<root xmlns:a='urn:a' xmlns:b='urn:b'/>").unwrap();
        let ctx = NamespaceContext::from_node(doc.root_node());
        for prefix in ["a", "b", "xml", "xmlns", ""] {
            let uri = ctx.uri_for_prefix(Some(prefix)).unwrap();
            assert_eq!(ctx.prefix_for_uri(Some(uri)).unwrap(), Some(prefix));
        }
        assert_eq!(ctx.prefix_for_uri(Some("urn:unknown")).unwrap(), None);
        assert!(ctx.prefixes_for_uri(Some("urn:unknown")).unwrap().is_empty());
        assert_eq!(ctx.prefixes_for_uri(Some("urn:a")).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_resolver_treats_unbound_as_missing() {
        let doc = XmlDocument::parse("<root xmlns:a='urn:a'/>").unwrap();
        let ctx = NamespaceContext::from_node(doc.root_node());
        assert_eq!(ctx.resolve_prefix("a"), Some("urn:a"));
        assert_eq!(ctx.resolve_prefix("b"), None);
    }

    #[test]
    fn test_bindings_order() {
        let doc = XmlDocument::parse("<root xmlns:far='urn:far'><a xmlns:near='urn:near'/></root>").unwrap();
        let ctx = NamespaceContext::from_node(element_named(&doc, "a"));
        let prefixes: Vec<&str> = ctx.bindings().map(|(p, _)| p).collect();
        assert_eq!(prefixes, vec!["xml", "xmlns", "near", "far"]);
    }
}
