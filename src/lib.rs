//! Namespace-aware XPath selection over parsed XML trees.
//!
//! Bindings for the prefixes in an expression are collected from the declarations
//! in scope at a node (optionally overridden by the caller), so queries such as
//! `//k:a/k:b` work without registering namespaces up front.
//!
//! ```
//! use nsxpath::{NamespaceSource, XmlDocument, select_node_list_as_strings};
//!
//! let doc = XmlDocument::parse("<r xmlns:k='urn:k'><k:a>x</k:a><a>y</a></r>").unwrap();
//! let root = doc.root_node();
//! let texts = select_node_list_as_strings(root, "//k:a", NamespaceSource::context(root), &[]).unwrap();
//! assert_eq!(texts, vec!["x"]);
//! ```

pub mod config;
pub mod error;
pub mod iterator;
pub mod namespace;
pub mod select;
pub mod template;
pub mod xml;

pub use config::SelectConfig;
pub use error::{Direction, SelectError};
pub use iterator::{NodeIterator, SHOW_ALL};
pub use namespace::{NO_NAMESPACE, NamespaceContext};
pub use select::{
    NamespaceSource, Selector, evaluate, select_node_iterator, select_node_list,
    select_node_list_as_strings, select_single_node, select_single_node_as_string,
};
pub use xml::{XmlDocument, XmlNode};

pub use nsxpath_xpath1::{DataSourceNode, NodeType, XPathError};
