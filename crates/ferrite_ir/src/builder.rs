//! Scoped construction of register maps.
//!
//! [`RegMapBuilder`] is the hand-off point for front ends and the fixture
//! API for tests. Scopes (`begin_addrmap`, `begin_regfile`, `begin_register`,
//! `begin_memory`) nest and must be closed with [`RegMapBuilder::end`];
//! leaves (`field`, `signal`) attach to the innermost open scope. All
//! offsets and sizes are supplied by the caller; elaboration (address
//! assignment, array expansion) happens upstream.
//!
//! Scoping mistakes are caller bugs and panic with a description. Semantic
//! problems with a well-formed tree (conflicting writers, unsupported
//! property combinations) are diagnosed later by the generator, not here.

use crate::arena::Arena;
use crate::ids::NodeId;
use crate::node::{Node, NodeKind};
use crate::props::{FieldProps, MemProps, RegProps, SignalProps};
use crate::regmap::RegMap;
use ferrite_common::Interner;

/// Builds a [`RegMap`] scope by scope.
pub struct RegMapBuilder {
    nodes: Arena<NodeId, Node>,
    top: NodeId,
    stack: Vec<NodeId>,
    last: NodeId,
    interner: Interner,
}

impl RegMapBuilder {
    /// Creates a builder whose top address map has the given name and byte
    /// size.
    pub fn new(top_name: &str, size: u64) -> Self {
        let interner = Interner::new();
        let mut nodes = Arena::new();
        let mut top_node = Node::new(interner.get_or_intern(top_name), NodeKind::AddrMap);
        top_node.size = size;
        let top = nodes.alloc(top_node);
        Self {
            nodes,
            top,
            stack: vec![top],
            last: top,
            interner,
        }
    }

    /// The interner shared with the finished map.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    fn current(&self) -> NodeId {
        match self.stack.last() {
            Some(&id) => id,
            // The bottom entry is the top address map; end() refuses to pop
            // it and finish() consumes the builder.
            None => unreachable!(),
        }
    }

    fn attach(&mut self, mut node: Node) -> NodeId {
        let parent = self.current();
        match self.nodes.get(parent).kind {
            NodeKind::Register(_) => {
                assert!(
                    matches!(node.kind, NodeKind::Field(_) | NodeKind::Signal(_)),
                    "registers contain only fields and signals"
                );
            }
            NodeKind::Memory(_) => panic!("memory nodes take no children"),
            NodeKind::Field(_) | NodeKind::Signal(_) => {
                unreachable!("fields and signals are never open scopes")
            }
            NodeKind::AddrMap | NodeKind::RegFile => {
                assert!(
                    !matches!(node.kind, NodeKind::Field(_)),
                    "fields belong inside a register"
                );
            }
        }
        node.parent = Some(parent);
        let id = self.nodes.alloc(node);
        self.nodes.get_mut(parent).children.push(id);
        self.last = id;
        id
    }

    /// Opens a nested address map at `offset` with the given element size.
    pub fn begin_addrmap(&mut self, name: &str, offset: u64, size: u64) -> NodeId {
        let mut node = Node::new(self.interner.get_or_intern(name), NodeKind::AddrMap);
        node.offset = offset;
        node.size = size;
        let id = self.attach(node);
        self.stack.push(id);
        id
    }

    /// Opens a register file at `offset` with the given element size.
    pub fn begin_regfile(&mut self, name: &str, offset: u64, size: u64) -> NodeId {
        let mut node = Node::new(self.interner.get_or_intern(name), NodeKind::RegFile);
        node.offset = offset;
        node.size = size;
        let id = self.attach(node);
        self.stack.push(id);
        id
    }

    /// Opens a register at `offset`. The element size is `regwidth` in
    /// bytes.
    pub fn begin_register(&mut self, name: &str, offset: u64, props: RegProps) -> NodeId {
        let mut node = Node::new(self.interner.get_or_intern(name), NodeKind::Register(props));
        node.offset = offset;
        node.size = (props.regwidth as u64).div_ceil(8);
        let id = self.attach(node);
        self.stack.push(id);
        id
    }

    /// Opens a memory at `offset`. Memories are external by construction;
    /// the element size is `entries * entry_bytes`.
    pub fn begin_memory(&mut self, name: &str, offset: u64, props: MemProps) -> NodeId {
        let mut node = Node::new(self.interner.get_or_intern(name), NodeKind::Memory(props));
        node.offset = offset;
        node.size = props.entries * (props.entry_width as u64).div_ceil(8);
        node.external = true;
        let id = self.attach(node);
        self.stack.push(id);
        id
    }

    /// Adds a field to the innermost open register.
    ///
    /// # Panics
    ///
    /// Panics if the innermost scope is not a register.
    pub fn field(&mut self, name: &str, props: FieldProps) -> NodeId {
        assert!(
            self.nodes.get(self.current()).is_register(),
            "fields belong inside a register"
        );
        let node = Node::new(self.interner.get_or_intern(name), NodeKind::Field(props));
        self.attach(node)
    }

    /// Adds a signal to the innermost open scope.
    pub fn signal(&mut self, name: &str, props: SignalProps) -> NodeId {
        let node = Node::new(self.interner.get_or_intern(name), NodeKind::Signal(props));
        self.attach(node)
    }

    /// Declares array dimensions (outermost first) on the innermost open
    /// scope.
    ///
    /// # Panics
    ///
    /// Panics on the top address map, or if any dimension is zero.
    pub fn dims(&mut self, dims: &[u32]) -> &mut Self {
        let id = self.current();
        assert!(id != self.top, "the top address map cannot be arrayed");
        assert!(dims.iter().all(|&d| d > 0), "array dimensions must be nonzero");
        self.nodes.get_mut(id).dims = dims.to_vec();
        self
    }

    /// Marks the innermost open scope external.
    ///
    /// # Panics
    ///
    /// Panics on the top address map.
    pub fn external(&mut self) -> &mut Self {
        let id = self.current();
        assert!(id != self.top, "the top address map cannot be external");
        self.nodes.get_mut(id).external = true;
        self
    }

    /// Attaches a front-end source reference to the most recently added
    /// node.
    pub fn src_ref(&mut self, src: &str) -> &mut Self {
        self.nodes.get_mut(self.last).src_ref = Some(src.to_string());
        self
    }

    /// Closes the innermost open scope.
    ///
    /// # Panics
    ///
    /// Panics if only the top address map remains open.
    pub fn end(&mut self) {
        assert!(self.stack.len() > 1, "no open scope to end");
        self.stack.pop();
    }

    /// Finishes construction, returning the map and its interner.
    ///
    /// # Panics
    ///
    /// Panics if any scope other than the top address map is still open.
    pub fn finish(self) -> (RegMap, Interner) {
        assert!(
            self.stack.len() == 1,
            "unclosed scopes at finish: {} remain open",
            self.stack.len() - 1
        );
        (
            RegMap {
                nodes: self.nodes,
                top: self.top,
            },
            self.interner,
        )
    }
}
