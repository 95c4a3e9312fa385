// XML data source implementation using roxmltree
use crate::namespace::{XML_NAMESPACE, XML_PREFIX};
use nsxpath_xpath1::{DataSourceNode, NamespaceDeclaration, NodeType, QName};
use roxmltree::Node;
use std::hash::{Hash, Hasher};

/// Wrapper around roxmltree::Document that hands out navigable `XmlNode`s.
pub struct XmlDocument<'input> {
    doc: roxmltree::Document<'input>,
}

impl<'input> XmlDocument<'input> {
    pub fn parse(text: &'input str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(text)?;
        Ok(Self { doc })
    }

    /// The document node, parent of the root element.
    pub fn root_node(&self) -> XmlNode<'_, 'input> {
        XmlNode::Element(self.doc.root())
    }

    pub fn root_element(&self) -> XmlNode<'_, 'input> {
        XmlNode::Element(self.doc.root_element())
    }

    /// Every node of the document except attributes, in document order.
    pub fn descendants(&self) -> impl Iterator<Item = XmlNode<'_, 'input>> {
        self.doc.descendants().map(XmlNode::Element)
    }

    pub fn document(&self) -> &roxmltree::Document<'input> {
        &self.doc
    }
}

/// Either a tree node (element, text, comment, ...) or an attribute.
/// roxmltree stores attributes as data on elements rather than as navigable nodes,
/// so an attribute is addressed by its element and index.
#[derive(Debug, Clone, Copy)]
pub enum XmlNode<'a, 'input> {
    Element(Node<'a, 'input>),
    Attribute {
        parent: Node<'a, 'input>,
        index: usize,
    },
}

impl<'a, 'input> XmlNode<'a, 'input> {
    pub fn new(node: Node<'a, 'input>) -> Self {
        XmlNode::Element(node)
    }

    pub fn inner(&self) -> Option<Node<'a, 'input>> {
        match self {
            XmlNode::Element(node) => Some(*node),
            XmlNode::Attribute { .. } => None,
        }
    }

    /// The concatenated text of all descendant text nodes (the value, for an attribute).
    pub fn text_content(&self) -> String {
        match self {
            XmlNode::Element(node) if node.is_element() || node.is_root() => node
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect(),
            XmlNode::Element(node) => node.text().unwrap_or_default().to_string(),
            XmlNode::Attribute { parent, index } => parent
                .attributes()
                .nth(*index)
                .map(|attr| attr.value().to_string())
                .unwrap_or_default(),
        }
    }
}

impl PartialEq for XmlNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (XmlNode::Element(a), XmlNode::Element(b)) => a.id() == b.id(),
            (
                XmlNode::Attribute {
                    parent: p1,
                    index: i1,
                },
                XmlNode::Attribute {
                    parent: p2,
                    index: i2,
                },
            ) => p1.id() == p2.id() && i1 == i2,
            _ => false,
        }
    }
}

impl Eq for XmlNode<'_, '_> {}

impl PartialOrd for XmlNode<'_, '_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for XmlNode<'_, '_> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (XmlNode::Element(a), XmlNode::Element(b)) => a.id().get().cmp(&b.id().get()),
            (
                XmlNode::Attribute {
                    parent: p1,
                    index: i1,
                },
                XmlNode::Attribute {
                    parent: p2,
                    index: i2,
                },
            ) => p1.id().get().cmp(&p2.id().get()).then(i1.cmp(i2)),
            // Attributes sort after their element and before its children. Node ids
            // follow document order, so a child always has a larger id than its parent.
            (XmlNode::Element(e), XmlNode::Attribute { parent, .. }) => {
                if e.id().get() <= parent.id().get() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (XmlNode::Attribute { parent, .. }, XmlNode::Element(e)) => {
                if parent.id().get() < e.id().get() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
        }
    }
}

impl Hash for XmlNode<'_, '_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            XmlNode::Element(node) => {
                0u8.hash(state);
                node.id().hash(state);
            }
            XmlNode::Attribute { parent, index } => {
                1u8.hash(state);
                parent.id().hash(state);
                index.hash(state);
            }
        }
    }
}

impl<'a> DataSourceNode<'a> for XmlNode<'a, 'a> {
    fn node_type(&self) -> NodeType {
        match self {
            XmlNode::Element(node) => {
                if node.is_root() {
                    NodeType::Root
                } else if node.is_element() {
                    NodeType::Element
                } else if node.is_text() {
                    NodeType::Text
                } else if node.is_comment() {
                    NodeType::Comment
                } else {
                    NodeType::ProcessingInstruction
                }
            }
            XmlNode::Attribute { .. } => NodeType::Attribute,
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        match self {
            XmlNode::Element(node) if node.is_element() => {
                let tag = node.tag_name();
                // roxmltree keeps only the namespace URI; recover a prefix bound to it.
                let prefix = tag
                    .namespace()
                    .filter(|uri| !uri.is_empty())
                    .and_then(|uri| node.lookup_prefix(uri));
                Some(QName {
                    prefix,
                    local_part: tag.name(),
                })
            }
            XmlNode::Element(node) => node.pi().map(|pi| QName {
                prefix: None,
                local_part: pi.target,
            }),
            XmlNode::Attribute { parent, index } => parent.attributes().nth(*index).map(|attr| {
                let prefix = attr.namespace().and_then(|uri| {
                    if uri == XML_NAMESPACE {
                        Some(XML_PREFIX)
                    } else {
                        parent.lookup_prefix(uri)
                    }
                });
                QName {
                    prefix,
                    local_part: attr.name(),
                }
            }),
        }
    }

    fn namespace_uri(&self) -> Option<&'a str> {
        let uri = match self {
            XmlNode::Element(node) if node.is_element() => node.tag_name().namespace(),
            XmlNode::Element(_) => None,
            XmlNode::Attribute { parent, index } => {
                parent.attributes().nth(*index).and_then(|attr| attr.namespace())
            }
        };
        // `xmlns=""` puts unprefixed names back in no namespace.
        uri.filter(|uri| !uri.is_empty())
    }

    fn string_value(&self) -> String {
        match self {
            XmlNode::Element(node) if node.is_pi() => node
                .pi()
                .and_then(|pi| pi.value)
                .unwrap_or_default()
                .to_string(),
            _ => self.text_content(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Element(node) if node.is_element() => {
                let parent = *node;
                let attr_count = node.attributes().len();
                Box::new((0..attr_count).map(move |index| XmlNode::Attribute { parent, index }))
            }
            _ => Box::new(std::iter::empty()),
        }
    }

    /// roxmltree records the namespaces in scope at each element rather than the
    /// attributes that declared them. The declarations written on an element are
    /// the in-scope entries its parent does not share. `xmlns=""` shows up as a
    /// default declaration with an empty URI.
    fn namespace_declarations(&self) -> Box<dyn Iterator<Item = NamespaceDeclaration<'a>> + 'a> {
        let node = match self {
            XmlNode::Element(node) if node.is_element() => *node,
            _ => return Box::new(std::iter::empty()),
        };
        let parent = node.parent().filter(|p| p.is_element());

        let declarations: Vec<NamespaceDeclaration<'a>> = node
            .namespaces()
            .filter(|ns| ns.name() != Some(XML_PREFIX))
            .filter(|ns| {
                parent.is_none_or(|p| {
                    !p.namespaces()
                        .any(|inherited| inherited.name() == ns.name() && inherited.uri() == ns.uri())
                })
            })
            .map(|ns| NamespaceDeclaration {
                prefix: ns.name(),
                uri: ns.uri(),
            })
            .collect();

        Box::new(declarations.into_iter())
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Element(node) => Box::new(node.children().map(XmlNode::Element)),
            XmlNode::Attribute { .. } => Box::new(std::iter::empty()),
        }
    }

    fn parent(&self) -> Option<Self> {
        match self {
            XmlNode::Element(node) => node.parent().map(XmlNode::Element),
            XmlNode::Attribute { parent, .. } => Some(XmlNode::Element(*parent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(doc: &'a XmlDocument<'a>, local: &str) -> XmlNode<'a, 'a> {
        doc.descendants()
            .find(|n| n.name().is_some_and(|q| q.local_part == local))
            .unwrap()
    }

    #[test]
    fn test_xml_node_attributes() {
        let xml = r#"<root><item id="123" status="active">Text</item></root>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let item = find(&doc, "item");

        let attrs: Vec<_> = item.attributes().collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].node_type(), NodeType::Attribute);
        assert_eq!(attrs[0].name().unwrap().local_part, "id");
        assert_eq!(attrs[0].string_value(), "123");
        assert_eq!(attrs[1].string_value(), "active");
        assert_eq!(attrs[0].parent(), Some(item));
    }

    #[test]
    fn test_document_order_places_attributes_before_children() {
        let doc = XmlDocument::parse(r#"<root a="1"><child/></root>"#).unwrap();
        let root = doc.root_element();
        let attr = root.attributes().next().unwrap();
        let child = find(&doc, "child");
        assert!(root < attr);
        assert!(attr < child);
        assert!(doc.root_node() < attr);
    }

    #[test]
    fn test_names_carry_namespaces() {
        let doc = XmlDocument::parse(
            r#"<root xmlns:k="urn:k"><k:item k:flag="y" xml:lang="en"/></root>"#,
        )
        .unwrap();
        let item = find(&doc, "item");
        assert_eq!(item.namespace_uri(), Some("urn:k"));
        assert_eq!(item.name().unwrap().prefix, Some("k"));

        let attrs: Vec<_> = item.attributes().collect();
        assert_eq!(attrs[0].namespace_uri(), Some("urn:k"));
        assert_eq!(attrs[1].name().unwrap().prefix, Some("xml"));
        assert_eq!(find(&doc, "root").namespace_uri(), None);
    }

    #[test]
    fn test_namespace_declarations_are_local() {
        let doc = XmlDocument::parse(
            r#"<root xmlns="urn:d" xmlns:a="urn:a"><mid xmlns:b="urn:b"><leaf/></mid></root>"#,
        )
        .unwrap();

        let mut root_decls: Vec<_> = find(&doc, "root")
            .namespace_declarations()
            .map(|d| d.attribute_name())
            .collect();
        root_decls.sort();
        assert_eq!(root_decls, vec!["xmlns", "xmlns:a"]);

        let mid_decls: Vec<_> = find(&doc, "mid").namespace_declarations().collect();
        assert_eq!(mid_decls, vec![NamespaceDeclaration { prefix: Some("b"), uri: "urn:b" }]);
        assert_eq!(find(&doc, "leaf").namespace_declarations().count(), 0);
        assert_eq!(doc.root_node().namespace_declarations().count(), 0);
    }

    #[test]
    fn test_default_namespace_undeclaration() {
        let doc = XmlDocument::parse(r#"<root xmlns="urn:d"><plain xmlns=""/></root>"#).unwrap();
        let plain = find(&doc, "plain");
        let decls: Vec<_> = plain.namespace_declarations().collect();
        assert_eq!(decls, vec![NamespaceDeclaration { prefix: None, uri: "" }]);
    }

    #[test]
    fn test_string_values() {
        let doc = XmlDocument::parse("<r>a<!--c--><b>b</b><?pi data?></r>").unwrap();
        assert_eq!(doc.root_element().string_value(), "ab");
        let kinds: Vec<_> = doc.root_element().children().map(|c| c.string_value()).collect();
        assert_eq!(kinds, vec!["a", "c", "b", "data"]);
    }
}
