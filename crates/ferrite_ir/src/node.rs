//! Register-map tree nodes.

use crate::ids::NodeId;
use crate::props::{FieldProps, MemProps, RegProps, SignalProps};
use ferrite_common::Ident;
use serde::{Deserialize, Serialize};

/// The variant of a tree node, carrying its variant-specific properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A top-level or nested address map.
    AddrMap,
    /// A grouping of registers with its own address offset.
    RegFile,
    /// An external memory region.
    Memory(MemProps),
    /// A software-addressable register containing fields.
    Register(RegProps),
    /// A bit range within a register.
    Field(FieldProps),
    /// A named signal usable as a reset source or control reference.
    Signal(SignalProps),
}

/// A vertex in the elaborated register-map tree.
///
/// Addresses are byte offsets relative to the parent's element base. `size`
/// is the byte size of a single array element; the footprint of the whole
/// node is [`Node::total_size`]. Fields and signals are not addressable and
/// carry zero offset and size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// The declared name.
    pub name: Ident,
    /// The node variant and its properties.
    pub kind: NodeKind,
    /// The enclosing node, absent only for the top address map.
    pub parent: Option<NodeId>,
    /// Child nodes in declaration order.
    pub children: Vec<NodeId>,
    /// Byte offset within the parent element.
    pub offset: u64,
    /// Byte size of one array element.
    pub size: u64,
    /// Array dimensions, outermost first; empty when scalar.
    pub dims: Vec<u32>,
    /// The node's storage and side effects live outside the generated
    /// block, accessed over a request/acknowledge handshake.
    pub external: bool,
    /// Front-end source reference used in error messages.
    pub src_ref: Option<String>,
}

impl Node {
    /// Creates a scalar, internal node with no parent or children.
    pub fn new(name: Ident, kind: NodeKind) -> Self {
        Self {
            name,
            kind,
            parent: None,
            children: Vec::new(),
            offset: 0,
            size: 0,
            dims: Vec::new(),
            external: false,
            src_ref: None,
        }
    }

    /// Returns `true` for registers.
    pub fn is_register(&self) -> bool {
        matches!(self.kind, NodeKind::Register(_))
    }

    /// Returns `true` for fields.
    pub fn is_field(&self) -> bool {
        matches!(self.kind, NodeKind::Field(_))
    }

    /// Returns `true` for signals.
    pub fn is_signal(&self) -> bool {
        matches!(self.kind, NodeKind::Signal(_))
    }

    /// Returns `true` for memories.
    pub fn is_memory(&self) -> bool {
        matches!(self.kind, NodeKind::Memory(_))
    }

    /// Returns `true` for nodes that occupy bus address space.
    pub fn is_addressable(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::AddrMap | NodeKind::RegFile | NodeKind::Memory(_) | NodeKind::Register(_)
        )
    }

    /// Returns `true` for external register files, address maps, and
    /// memories, which decode as a whole address range rather than
    /// per-register strobes.
    pub fn is_external_block(&self) -> bool {
        self.external
            && matches!(
                self.kind,
                NodeKind::RegFile | NodeKind::AddrMap | NodeKind::Memory(_)
            )
    }

    /// The number of array elements (1 when scalar).
    pub fn total_elements(&self) -> u64 {
        self.dims.iter().map(|&d| d as u64).product()
    }

    /// The byte footprint of the node including all array elements.
    pub fn total_size(&self) -> u64 {
        self.size * self.total_elements()
    }

    /// The field properties, when this is a field.
    pub fn field_props(&self) -> Option<&FieldProps> {
        match &self.kind {
            NodeKind::Field(p) => Some(p),
            _ => None,
        }
    }

    /// The register properties, when this is a register.
    pub fn reg_props(&self) -> Option<&RegProps> {
        match &self.kind {
            NodeKind::Register(p) => Some(p),
            _ => None,
        }
    }

    /// The memory properties, when this is a memory.
    pub fn mem_props(&self) -> Option<&MemProps> {
        match &self.kind {
            NodeKind::Memory(p) => Some(p),
            _ => None,
        }
    }

    /// The signal properties, when this is a signal.
    pub fn signal_props(&self) -> Option<&SignalProps> {
        match &self.kind {
            NodeKind::Signal(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: NodeKind) -> Node {
        Node::new(Ident::from_raw(0), kind)
    }

    #[test]
    fn kind_predicates() {
        assert!(node(NodeKind::Register(RegProps::default())).is_register());
        assert!(node(NodeKind::Field(FieldProps::new(0, 1))).is_field());
        assert!(node(NodeKind::Signal(SignalProps::default())).is_signal());
        assert!(node(NodeKind::Memory(MemProps::new(16, 32))).is_memory());
        assert!(!node(NodeKind::AddrMap).is_register());
    }

    #[test]
    fn addressable_excludes_fields_and_signals() {
        assert!(node(NodeKind::AddrMap).is_addressable());
        assert!(node(NodeKind::RegFile).is_addressable());
        assert!(!node(NodeKind::Field(FieldProps::new(0, 1))).is_addressable());
        assert!(!node(NodeKind::Signal(SignalProps::default())).is_addressable());
    }

    #[test]
    fn array_footprint() {
        let mut n = node(NodeKind::Register(RegProps::default()));
        n.size = 4;
        n.dims = vec![2, 3];
        assert_eq!(n.total_elements(), 6);
        assert_eq!(n.total_size(), 24);
    }

    #[test]
    fn scalar_footprint() {
        let mut n = node(NodeKind::Register(RegProps::default()));
        n.size = 4;
        assert_eq!(n.total_elements(), 1);
        assert_eq!(n.total_size(), 4);
    }

    #[test]
    fn external_block_excludes_plain_registers() {
        let mut r = node(NodeKind::Register(RegProps::default()));
        r.external = true;
        assert!(!r.is_external_block());
        let mut rf = node(NodeKind::RegFile);
        rf.external = true;
        assert!(rf.is_external_block());
    }

    #[test]
    fn serde_roundtrip() {
        let mut n = node(NodeKind::Field(FieldProps::new(8, 4)));
        n.src_ref = Some("regs.rdl:42".to_string());
        let json = serde_json::to_string(&n).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back.src_ref.as_deref(), Some("regs.rdl:42"));
        assert!(back.is_field());
    }
}
