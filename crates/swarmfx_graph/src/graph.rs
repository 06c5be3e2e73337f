// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, links and layout frames.

use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId, NodeKind};
use crate::port::{PortDirection, PortId, PortType};
use indexmap::IndexMap;
use uuid::Uuid;

/// Unique identifier for a layout frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub Uuid);

impl FrameId {
    /// Create a new random frame ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FrameId {
    fn default() -> Self {
        Self::new()
    }
}

/// A visual container grouping nodes. Has no effect on evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Unique frame ID
    pub id: FrameId,
    /// Label shown on the frame
    pub label: String,
}

/// A lighting-effect node graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Links between nodes
    links: IndexMap<LinkId, Link>,
    /// Layout frames
    frames: IndexMap<FrameId, Frame>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            links: IndexMap::new(),
            frames: IndexMap::new(),
        }
    }

    /// Add a node to the graph.
    ///
    /// If the node's name is taken it is renamed with the next free numeric
    /// suffix (`Math`, `Math.001`, ...).
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        node.name = self.unique_node_name(&node.name);
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Create a node of `kind` with default state
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.add_node(Node::new(kind))
    }

    /// Remove a node and its links
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.links.retain(|_, l| !l.involves_node(node_id));
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Find a node by its name
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name == name)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First free node name derived from `base`
    pub fn unique_node_name(&self, base: &str) -> String {
        unique_name(base, |candidate| self.node_by_name(candidate).is_some())
    }

    /// Rename a node, keeping names unique. Returns the name actually used.
    pub fn rename_node(&mut self, node_id: NodeId, name: &str) -> Option<String> {
        let current = self.nodes.get(&node_id)?;
        if current.name == name {
            return Some(current.name.clone());
        }
        let unique = self.unique_node_name(name);
        let node = self.nodes.get_mut(&node_id)?;
        node.name.clone_from(&unique);
        Some(unique)
    }

    /// Link an output port to an input port.
    ///
    /// If the input already has an incoming link, that link is replaced.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<LinkId, ConnectionError> {
        // Validate nodes exist
        let source_node = self.nodes.get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target_node = self.nodes.get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        // Validate ports exist on those nodes
        let source_port = source_node.port(&from_port)
            .ok_or(ConnectionError::PortNotFound(from_port))?;
        let target_port = target_node.port(&to_port)
            .ok_or(ConnectionError::PortNotFound(to_port))?;

        if source_port.direction != PortDirection::Output
            || target_port.direction != PortDirection::Input
        {
            return Err(ConnectionError::WrongDirection);
        }
        if !source_port.can_connect(target_port) {
            return Err(ConnectionError::IncompatiblePorts {
                from: source_port.port_type,
                to: target_port.port_type,
            });
        }

        // Prevent self-loops
        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }

        // Single writer per input
        let replaced = self.links.len();
        self.links.retain(|_, l| l.to_port != to_port);
        if self.links.len() != replaced {
            tracing::debug!("Replaced existing link into {}.{}", target_node.name, target_port.name);
        }

        let link = Link::new(from_node, from_port, to_node, to_port);
        let id = link.id;
        self.links.insert(id, link);
        Ok(id)
    }

    /// Link two sockets addressed by node ID and socket name
    pub fn connect_by_name(
        &mut self,
        from_node: NodeId,
        from_socket: &str,
        to_node: NodeId,
        to_socket: &str,
    ) -> Result<LinkId, ConnectionError> {
        let source = self.nodes.get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target = self.nodes.get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        let from_port = source.output(from_socket)
            .ok_or_else(|| ConnectionError::SocketNotFound {
                node: source.name.clone(),
                socket: from_socket.to_string(),
            })?
            .id;
        let to_port = target.input(to_socket)
            .ok_or_else(|| ConnectionError::SocketNotFound {
                node: target.name.clone(),
                socket: to_socket.to_string(),
            })?
            .id;

        self.connect(from_node, from_port, to_node, to_port)
    }

    /// Remove a link
    pub fn disconnect(&mut self, link_id: LinkId) -> Option<Link> {
        self.links.shift_remove(&link_id)
    }

    /// Remove every link touching a port
    pub fn disconnect_port(&mut self, port_id: PortId) -> usize {
        let before = self.links.len();
        self.links.retain(|_, l| !l.involves_port(port_id));
        before - self.links.len()
    }

    /// Get a link by ID
    pub fn link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.get(&link_id)
    }

    /// Get all links
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Get links from a specific port
    pub fn links_from(&self, port_id: PortId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.from_port == port_id)
    }

    /// The link feeding an input port, if any
    pub fn incoming_link(&self, port_id: PortId) -> Option<&Link> {
        self.links.values().find(|l| l.to_port == port_id)
    }

    /// Whether any link touches the port
    pub fn is_linked(&self, port_id: PortId) -> bool {
        self.links.values().any(|l| l.involves_port(port_id))
    }

    /// Get links involving a node
    pub fn links_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.involves_node(node_id))
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Create a frame and return its ID
    pub fn add_frame(&mut self, label: impl Into<String>) -> FrameId {
        let frame = Frame {
            id: FrameId::new(),
            label: label.into(),
        };
        let id = frame.id;
        self.frames.insert(id, frame);
        id
    }

    /// Remove a frame, releasing its members
    pub fn remove_frame(&mut self, frame_id: FrameId) -> Option<Frame> {
        for node in self.nodes.values_mut() {
            if node.frame == Some(frame_id) {
                node.frame = None;
            }
        }
        self.frames.shift_remove(&frame_id)
    }

    /// Get a frame by ID
    pub fn frame(&self, frame_id: FrameId) -> Option<&Frame> {
        self.frames.get(&frame_id)
    }

    /// Get all frames
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    /// Nodes grouped under a frame
    pub fn frame_members(&self, frame_id: FrameId) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.frame == Some(frame_id))
    }

    /// Right edge of the rightmost node, `None` for an empty graph
    pub fn rightmost_edge(&self) -> Option<f32> {
        self.nodes
            .values()
            .map(|n| n.position[0] + Node::WIDTH)
            .reduce(f32::max)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// First name derived from `base` for which `taken` is false.
///
/// A trailing `.NNN` suffix on `base` is stripped before numbering.
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let stem = match base.rsplit_once('.') {
        Some((stem, suffix)) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => stem,
        _ => base,
    };
    (1u32..)
        .map(|n| format!("{stem}.{n:03}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| stem.to_string())
}

/// Error when creating a link
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// No socket with that name on the node
    #[error("Node '{node}' has no socket '{socket}'")]
    SocketNotFound {
        /// Node name
        node: String,
        /// Socket name
        socket: String,
    },

    /// Links must run from an output to an input
    #[error("Links must run from an output socket to an input socket")]
    WrongDirection,

    /// Incompatible port types
    #[error("Incompatible socket types: {from:?} -> {to:?}")]
    IncompatiblePorts {
        /// Source socket type
        from: PortType,
        /// Target socket type
        to: PortType,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}
