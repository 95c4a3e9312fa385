//! A detachable, bidirectional cursor over an evaluated match sequence.

use crate::error::{Direction, SelectError};

/// `what_to_show` value meaning every node type is visible.
pub const SHOW_ALL: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State<N> {
    Live { nodes: Vec<N>, position: usize },
    Detached,
}

/// Walks a fixed node sequence forwards and backwards.
///
/// The cursor sits between nodes: `next_node` returns the node after it and moves
/// forward, `previous_node` moves back and returns the node it passed. Once
/// detached, both calls fail with `SelectError::InvalidState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIterator<N> {
    state: State<N>,
}

impl<N: Copy> NodeIterator<N> {
    pub fn new(nodes: Vec<N>) -> Self {
        Self {
            state: State::Live { nodes, position: 0 },
        }
    }

    pub fn next_node(&mut self) -> Result<Option<N>, SelectError> {
        match &mut self.state {
            State::Detached => Err(SelectError::InvalidState {
                direction: Direction::Next,
            }),
            State::Live { nodes, position } => {
                let node = nodes.get(*position).copied();
                if node.is_some() {
                    *position += 1;
                }
                Ok(node)
            }
        }
    }

    pub fn previous_node(&mut self) -> Result<Option<N>, SelectError> {
        match &mut self.state {
            State::Detached => Err(SelectError::InvalidState {
                direction: Direction::Previous,
            }),
            State::Live { position: 0, .. } => Ok(None),
            State::Live { nodes, position } => {
                *position -= 1;
                Ok(nodes.get(*position).copied())
            }
        }
    }

    /// Releases the node sequence. Calling it again has no effect.
    pub fn detach(&mut self) {
        self.state = State::Detached;
    }

    pub fn is_detached(&self) -> bool {
        matches!(self.state, State::Detached)
    }

    /// Number of nodes in the sequence; 0 once detached.
    pub fn len(&self) -> usize {
        match &self.state {
            State::Live { nodes, .. } => nodes.len(),
            State::Detached => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first node of the sequence.
    pub fn root(&self) -> Option<N> {
        match &self.state {
            State::Live { nodes, .. } => nodes.first().copied(),
            State::Detached => None,
        }
    }

    pub fn what_to_show(&self) -> u32 {
        SHOW_ALL
    }

    /// Node filters are not supported; there is never one installed.
    pub fn filter(&self) -> Option<()> {
        None
    }

    pub fn expand_entity_references(&self) -> bool {
        true
    }
}
