//! The register-map root container and tree queries.

use crate::access::Access;
use crate::arena::Arena;
use crate::ids::NodeId;
use crate::node::{Node, NodeKind};
use crate::props::{ControlProp, StepProp};
use ferrite_common::{ContentHash, Interner};
use serde::{Deserialize, Serialize};

/// An elaborated register map: an arena of nodes rooted at a top-level
/// address map.
///
/// The map is immutable once built; every generation pass reads it through
/// the query methods here. Traversal order is declaration order, which makes
/// all derived artifacts (names, port lists, fragment order) deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegMap {
    /// All nodes of the tree.
    pub nodes: Arena<NodeId, Node>,
    /// The root address map.
    pub top: NodeId,
}

impl RegMap {
    /// Returns the node with the given ID.
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id)
    }

    /// Returns the children of a node in declaration order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes.get(id).children
    }

    /// Returns the parent of a node, absent for the top address map.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).parent
    }

    /// Returns `true` if `ancestor` is `node` itself or appears on its
    /// parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// Iterates over `start` and all nodes below it in pre-order.
    pub fn descendants(&self, start: NodeId) -> Descendants<'_> {
        Descendants {
            map: self,
            stack: vec![start],
        }
    }

    /// Iterates over the field children of a register.
    pub fn fields_of(&self, reg: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(reg)
            .iter()
            .copied()
            .filter(|&c| self.node(c).is_field())
    }

    /// Returns `true` if any field or memory at or below `id` is
    /// software-writable.
    pub fn has_sw_writable(&self, id: NodeId) -> bool {
        self.any_sw_access(id, Access::is_writable)
    }

    /// Returns `true` if any field or memory at or below `id` is
    /// software-readable.
    pub fn has_sw_readable(&self, id: NodeId) -> bool {
        self.any_sw_access(id, Access::is_readable)
    }

    fn any_sw_access(&self, id: NodeId, pred: fn(Access) -> bool) -> bool {
        self.descendants(id).any(|n| match &self.node(n).kind {
            NodeKind::Field(f) => pred(f.sw),
            NodeKind::Memory(m) => pred(m.sw),
            _ => false,
        })
    }

    /// Computes a deterministic fingerprint of everything that affects
    /// generated hardware: names, structure, addresses, and properties.
    ///
    /// Source references are excluded, so reformatting the input
    /// description does not change the hash.
    pub fn content_hash(&self, interner: &Interner) -> ContentHash {
        let mut buf = Vec::new();
        for id in self.descendants(self.top) {
            feed_node(self.node(id), interner, &mut buf);
        }
        ContentHash::from_bytes(&buf)
    }
}

/// Pre-order iterator over a subtree, created by [`RegMap::descendants`].
pub struct Descendants<'a> {
    map: &'a RegMap,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let children = self.map.children(id);
        self.stack.extend(children.iter().rev());
        Some(id)
    }
}

fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_opt_u64(buf: &mut Vec<u8>, v: Option<u64>) {
    match v {
        Some(v) => {
            buf.push(1);
            push_u64(buf, v);
        }
        None => buf.push(0),
    }
}

fn push_opt_node(buf: &mut Vec<u8>, v: Option<NodeId>) {
    match v {
        Some(id) => {
            buf.push(1);
            push_u32(buf, id.as_raw());
        }
        None => buf.push(0),
    }
}

fn push_control(buf: &mut Vec<u8>, c: ControlProp) {
    match c {
        ControlProp::Unset => buf.push(0),
        ControlProp::Infer => buf.push(1),
        ControlProp::Ref(id) => {
            buf.push(2);
            push_u32(buf, id.as_raw());
        }
    }
}

fn push_step(buf: &mut Vec<u8>, s: StepProp) {
    match s {
        StepProp::Fixed(v) => {
            buf.push(0);
            push_u64(buf, v);
        }
        StepProp::InputPort => buf.push(1),
        StepProp::Ref(id) => {
            buf.push(2);
            push_u32(buf, id.as_raw());
        }
    }
}

fn feed_node(node: &Node, interner: &Interner, buf: &mut Vec<u8>) {
    buf.extend_from_slice(interner.resolve(node.name).as_bytes());
    buf.push(0);
    push_u64(buf, node.offset);
    push_u64(buf, node.size);
    push_u32(buf, node.dims.len() as u32);
    for &d in &node.dims {
        push_u32(buf, d);
    }
    buf.push(node.external as u8);
    match &node.kind {
        NodeKind::AddrMap => buf.push(0),
        NodeKind::RegFile => buf.push(1),
        NodeKind::Memory(m) => {
            buf.push(2);
            buf.push(m.sw as u8);
            push_u64(buf, m.entries);
            push_u32(buf, m.entry_width);
            buf.push(m.err_support as u8);
        }
        NodeKind::Register(r) => {
            buf.push(3);
            push_u32(buf, r.regwidth);
            push_u32(buf, r.accesswidth);
        }
        NodeKind::Field(f) => {
            buf.push(4);
            push_u32(buf, f.lsb);
            push_u32(buf, f.width);
            buf.push(f.sw as u8);
            buf.push(f.hw as u8);
            buf.push(f.onread.map_or(0, |r| r as u8 + 1));
            buf.push(f.onwrite.map_or(0, |w| w as u8 + 1));
            match f.reset {
                Some(r) => {
                    buf.push(1);
                    push_opt_u64(buf, r.value);
                    push_opt_node(buf, r.signal);
                }
                None => buf.push(0),
            }
            for c in [f.next, f.we, f.wel, f.swwe, f.swwel, f.hwclr, f.hwset] {
                push_control(buf, c);
            }
            buf.push(f.precedence as u8);
            buf.push(f.singlepulse as u8);
            match f.counter {
                Some(c) => {
                    buf.push(1);
                    push_control(buf, c.incr);
                    push_control(buf, c.decr);
                    push_step(buf, c.incr_value);
                    push_step(buf, c.decr_value);
                    buf.push(c.incr_saturate as u8);
                    buf.push(c.decr_saturate as u8);
                    push_opt_u64(buf, c.incr_threshold);
                    push_opt_u64(buf, c.decr_threshold);
                    buf.push(c.overflow as u8);
                    buf.push(c.underflow as u8);
                }
                None => buf.push(0),
            }
            match f.intr {
                Some(i) => {
                    buf.push(1);
                    buf.push(i.kind as u8);
                    buf.push(i.sticky as u8);
                    push_opt_node(buf, i.enable);
                    push_opt_node(buf, i.mask);
                    push_opt_node(buf, i.haltenable);
                    push_opt_node(buf, i.haltmask);
                }
                None => buf.push(0),
            }
            for flag in [
                f.anded, f.ored, f.xored, f.swmod, f.swacc, f.rd_swacc, f.wr_swacc,
            ] {
                buf.push(flag as u8);
            }
        }
        NodeKind::Signal(s) => {
            buf.push(5);
            push_u32(buf, s.width);
            buf.push(s.active_low as u8);
            buf.push(s.is_async as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RegMapBuilder;
    use crate::props::{FieldProps, RegProps};

    fn two_reg_map() -> (RegMap, Interner, NodeId, NodeId) {
        let mut b = RegMapBuilder::new("top", 0x100);
        let ctrl = b.begin_register("ctrl", 0x0, RegProps::new(32));
        b.field("enable", FieldProps::new(0, 1));
        b.end();
        let status = b.begin_register("status", 0x4, RegProps::new(32));
        b.field("busy", FieldProps::new(0, 1));
        b.end();
        let (map, interner) = b.finish();
        (map, interner, ctrl, status)
    }

    #[test]
    fn parent_chain() {
        let (map, _, ctrl, _) = two_reg_map();
        assert_eq!(map.parent(ctrl), Some(map.top));
        assert_eq!(map.parent(map.top), None);
        assert!(map.is_ancestor(map.top, ctrl));
        assert!(map.is_ancestor(ctrl, ctrl));
    }

    #[test]
    fn descendants_pre_order() {
        let (map, interner, _, _) = two_reg_map();
        let names: Vec<&str> = map
            .descendants(map.top)
            .map(|id| interner.resolve(map.node(id).name))
            .collect();
        assert_eq!(names, vec!["top", "ctrl", "enable", "status", "busy"]);
    }

    #[test]
    fn sibling_is_not_ancestor() {
        let (map, _, ctrl, status) = two_reg_map();
        assert!(!map.is_ancestor(ctrl, status));
    }

    #[test]
    fn sw_capability_queries() {
        let (map, _, ctrl, _) = two_reg_map();
        assert!(map.has_sw_writable(ctrl));
        assert!(map.has_sw_readable(map.top));
    }

    #[test]
    fn content_hash_stable() {
        let (map_a, int_a, _, _) = two_reg_map();
        let (map_b, int_b, _, _) = two_reg_map();
        assert_eq!(map_a.content_hash(&int_a), map_b.content_hash(&int_b));
    }

    #[test]
    fn content_hash_sees_renames() {
        let (map_a, int_a, _, _) = two_reg_map();
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("ctrl", 0x0, RegProps::new(32));
        b.field("enable_n", FieldProps::new(0, 1));
        b.end();
        b.begin_register("status", 0x4, RegProps::new(32));
        b.field("busy", FieldProps::new(0, 1));
        b.end();
        let (map_c, int_c) = b.finish();
        assert_ne!(map_a.content_hash(&int_a), map_c.content_hash(&int_c));
    }

    #[test]
    fn content_hash_ignores_src_refs() {
        let (map_a, int_a, _, _) = two_reg_map();
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("ctrl", 0x0, RegProps::new(32));
        b.src_ref("regs.rdl:10");
        b.field("enable", FieldProps::new(0, 1));
        b.end();
        b.begin_register("status", 0x4, RegProps::new(32));
        b.field("busy", FieldProps::new(0, 1));
        b.end();
        let (map_c, int_c) = b.finish();
        assert_eq!(map_a.content_hash(&int_a), map_c.content_hash(&int_c));
    }

    #[test]
    fn serde_roundtrip() {
        let (map, _, _, _) = two_reg_map();
        let json = serde_json::to_string(&map).unwrap();
        let back: RegMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes.len(), map.nodes.len());
        assert_eq!(back.top, map.top);
    }
}
