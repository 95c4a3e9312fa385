//! The selection facade: resolve namespaces, fill placeholders, evaluate, shape.

use crate::config::SelectConfig;
use crate::error::SelectError;
use crate::iterator::NodeIterator;
use crate::namespace::NamespaceContext;
use crate::template::substitute;
use nsxpath_xpath1::{DataSourceNode, compile};
use std::collections::HashMap;

/// Where the namespace bindings for an expression come from.
#[derive(Debug, Clone, Copy)]
pub enum NamespaceSource<'m, N> {
    /// The declarations in scope at a node.
    Node(N),
    /// The declarations in scope at `node`, with `overrides` taking precedence.
    Overrides {
        node: N,
        overrides: &'m HashMap<String, String>,
    },
}

impl<'m, N> NamespaceSource<'m, N> {
    /// Bindings taken from the context node itself.
    pub fn context(node: N) -> Self {
        NamespaceSource::Node(node)
    }

    pub fn with_overrides(node: N, overrides: &'m HashMap<String, String>) -> Self {
        NamespaceSource::Overrides { node, overrides }
    }

    fn resolve<'a>(&self) -> NamespaceContext
    where
        N: DataSourceNode<'a>,
    {
        match self {
            NamespaceSource::Node(node) => NamespaceContext::from_node(*node),
            NamespaceSource::Overrides { node, overrides } => {
                NamespaceContext::with_overrides(*node, overrides)
            }
        }
    }
}

/// Runs selections with a fixed `SelectConfig`.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    config: SelectConfig,
}

impl Selector {
    pub fn new(config: SelectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectConfig {
        &self.config
    }

    /// Evaluates `expression` at `context` and returns every match in document order.
    ///
    /// The expression is recompiled on every call. An empty result is not an error.
    pub fn evaluate<'a, N>(
        &self,
        context: N,
        expression: &str,
        namespaces: NamespaceSource<'_, N>,
        args: &[&str],
    ) -> Result<Vec<N>, SelectError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        let resolver = namespaces.resolve();
        let expression = substitute(expression, args, &self.config)?;
        let compiled = compile(&expression, &resolver)?;
        let nodes = compiled.evaluate_node_set(context)?;
        log::debug!("'{}' matched {} node(s)", expression, nodes.len());
        Ok(nodes)
    }

    /// The first match, if any.
    pub fn select_single_node<'a, N>(
        &self,
        context: N,
        expression: &str,
        namespaces: NamespaceSource<'_, N>,
        args: &[&str],
    ) -> Result<Option<N>, SelectError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        Ok(self
            .evaluate(context, expression, namespaces, args)?
            .into_iter()
            .next())
    }

    /// The text content of the first match, if any.
    pub fn select_single_node_as_string<'a, N>(
        &self,
        context: N,
        expression: &str,
        namespaces: NamespaceSource<'_, N>,
        args: &[&str],
    ) -> Result<Option<String>, SelectError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        Ok(self
            .select_single_node(context, expression, namespaces, args)?
            .map(|node| node.string_value()))
    }

    pub fn select_node_list<'a, N>(
        &self,
        context: N,
        expression: &str,
        namespaces: NamespaceSource<'_, N>,
        args: &[&str],
    ) -> Result<Vec<N>, SelectError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        self.evaluate(context, expression, namespaces, args)
    }

    /// The text content of every match, in document order.
    pub fn select_node_list_as_strings<'a, N>(
        &self,
        context: N,
        expression: &str,
        namespaces: NamespaceSource<'_, N>,
        args: &[&str],
    ) -> Result<Vec<String>, SelectError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        Ok(self
            .evaluate(context, expression, namespaces, args)?
            .into_iter()
            .map(|node| node.string_value())
            .collect())
    }

    pub fn select_node_iterator<'a, N>(
        &self,
        context: N,
        expression: &str,
        namespaces: NamespaceSource<'_, N>,
        args: &[&str],
    ) -> Result<NodeIterator<N>, SelectError>
    where
        N: DataSourceNode<'a> + 'a,
    {
        Ok(NodeIterator::new(self.evaluate(
            context, expression, namespaces, args,
        )?))
    }
}

/// [`Selector::evaluate`] with the default configuration.
pub fn evaluate<'a, N>(
    context: N,
    expression: &str,
    namespaces: NamespaceSource<'_, N>,
    args: &[&str],
) -> Result<Vec<N>, SelectError>
where
    N: DataSourceNode<'a> + 'a,
{
    Selector::default().evaluate(context, expression, namespaces, args)
}

pub fn select_single_node<'a, N>(
    context: N,
    expression: &str,
    namespaces: NamespaceSource<'_, N>,
    args: &[&str],
) -> Result<Option<N>, SelectError>
where
    N: DataSourceNode<'a> + 'a,
{
    Selector::default().select_single_node(context, expression, namespaces, args)
}

pub fn select_single_node_as_string<'a, N>(
    context: N,
    expression: &str,
    namespaces: NamespaceSource<'_, N>,
    args: &[&str],
) -> Result<Option<String>, SelectError>
where
    N: DataSourceNode<'a> + 'a,
{
    Selector::default().select_single_node_as_string(context, expression, namespaces, args)
}

pub fn select_node_list<'a, N>(
    context: N,
    expression: &str,
    namespaces: NamespaceSource<'_, N>,
    args: &[&str],
) -> Result<Vec<N>, SelectError>
where
    N: DataSourceNode<'a> + 'a,
{
    Selector::default().select_node_list(context, expression, namespaces, args)
}

pub fn select_node_list_as_strings<'a, N>(
    context: N,
    expression: &str,
    namespaces: NamespaceSource<'_, N>,
    args: &[&str],
) -> Result<Vec<String>, SelectError>
where
    N: DataSourceNode<'a> + 'a,
{
    Selector::default().select_node_list_as_strings(context, expression, namespaces, args)
}

pub fn select_node_iterator<'a, N>(
    context: N,
    expression: &str,
    namespaces: NamespaceSource<'_, N>,
    args: &[&str],
) -> Result<NodeIterator<N>, SelectError>
where
    N: DataSourceNode<'a> + 'a,
{
    Selector::default().select_node_iterator(context, expression, namespaces, args)
}
