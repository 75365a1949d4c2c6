//! Canonical naming and index arithmetic for tree nodes.
//!
//! Every generated identifier derives from an [`IndexedPath`]: the
//! `_`-joined segment names from the generation scope down to the node,
//! plus the array dimensions collected along the way. All passes resolve
//! paths through [`resolve`], which is a pure function of the map, so the
//! decode, storage, hwif, and read-back passes agree on every name without
//! sharing a symbol table.

use crate::errors::{node_label, GenError, GenResult};
use crate::rtl::RtlExpr;
use ferrite_common::Interner;
use ferrite_ir::{Node, NodeId, NodeKind, RegMap};
use serde::{Deserialize, Serialize};

/// SystemVerilog reserved words (IEEE 1800-2017 Annex B), sorted for
/// binary search. Path segments colliding with one get a trailing
/// underscore.
const SV_KEYWORDS: &[&str] = &[
    "accept_on", "alias", "always", "always_comb", "always_ff", "always_latch", "and", "assert",
    "assign", "assume", "automatic", "before", "begin", "bind", "bins", "binsof", "bit", "break",
    "buf", "bufif0", "bufif1", "byte", "case", "casex", "casez", "cell", "chandle", "checker",
    "class", "clocking", "cmos", "config", "const", "constraint", "context", "continue", "cover",
    "covergroup", "coverpoint", "cross", "deassign", "default", "defparam", "design", "disable",
    "dist", "do", "edge", "else", "end", "endcase", "endchecker", "endclass", "endclocking",
    "endconfig", "endfunction", "endgenerate", "endgroup", "endinterface", "endmodule",
    "endpackage", "endprimitive", "endprogram", "endproperty", "endsequence", "endspecify",
    "endtable", "endtask", "enum", "event", "eventually", "expect", "export", "extends", "extern",
    "final", "first_match", "for", "force", "foreach", "forever", "fork", "forkjoin", "function",
    "generate", "genvar", "global", "highz0", "highz1", "if", "iff", "ifnone", "ignore_bins",
    "illegal_bins", "implements", "implies", "import", "incdir", "include", "initial", "inout",
    "input", "inside", "instance", "int", "integer", "interconnect", "interface", "intersect",
    "join", "join_any", "join_none", "large", "let", "liblist", "library", "local", "localparam",
    "logic", "longint", "macromodule", "matches", "medium", "modport", "module", "nand", "negedge",
    "nettype", "new", "nexttime", "nmos", "nor", "noshowcancelled", "not", "notif0", "notif1",
    "null", "or", "output", "package", "packed", "parameter", "pmos", "posedge", "primitive",
    "priority", "program", "property", "protected", "pull0", "pull1", "pulldown", "pullup",
    "pulsestyle_ondetect", "pulsestyle_onevent", "pure", "rand", "randc", "randcase",
    "randsequence", "rcmos", "real", "realtime", "ref", "reg", "reject_on", "release", "repeat",
    "restrict", "return", "rnmos", "rpmos", "rtran", "rtranif0", "rtranif1", "s_always",
    "s_eventually", "s_nexttime", "s_until", "s_until_with", "scalared", "sequence", "shortint",
    "shortreal", "showcancelled", "signed", "small", "soft", "solve", "specify", "specparam",
    "static", "string", "strong", "strong0", "strong1", "struct", "super", "supply0", "supply1",
    "sync_accept_on", "sync_reject_on", "table", "tagged", "task", "this", "throughout", "time",
    "timeprecision", "timeunit", "tran", "tranif0", "tranif1", "tri", "tri0", "tri1", "triand",
    "trior", "trireg", "type", "typedef", "union", "unique", "unique0", "unsigned", "until",
    "until_with", "untyped", "use", "uwire", "var", "vectored", "virtual", "void", "wait",
    "wait_order", "wand", "weak", "weak0", "weak1", "while", "wildcard", "wire", "with", "within",
    "wor", "xnor", "xor",
];

fn escape(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if SV_KEYWORDS.binary_search(&lower.as_str()).is_ok() {
        format!("{lower}_")
    } else {
        lower
    }
}

/// The access strobe signal name for a register or external block path.
pub fn access_strobe_name(path: &str) -> String {
    format!("decoded_reg_strb_{path}")
}

/// A node's canonical identifier and the array dimensions enclosing it.
///
/// Dimensions are outermost first across every arrayed node on the path;
/// index variables `i0, i1, …` bind to them in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedPath {
    path: String,
    dims: Vec<u32>,
    width: Option<u64>,
}

impl IndexedPath {
    /// The flattened `_`-joined identifier.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Array dimensions, outermost first; empty when scalar.
    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    /// Returns `true` when any enclosing node is arrayed.
    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    /// The number of array elements (1 when scalar).
    pub fn total_elements(&self) -> u64 {
        self.dims.iter().map(|&d| u64::from(d)).product()
    }

    /// The node's value width in bits: field and signal width, register
    /// width, memory entry width. Absent for address maps and register
    /// files.
    pub fn width(&self) -> Option<u64> {
        self.width
    }

    /// One index variable per dimension, `i0` outermost.
    pub fn index_vars(&self) -> Vec<String> {
        (0..self.dims.len()).map(|k| format!("i{k}")).collect()
    }

    /// The flat element index `Σ i_k · stride_k` where `stride_k` is the
    /// product of the dimensions inside `k`. Zero when scalar.
    pub fn element_index_expr(&self) -> RtlExpr {
        let mut terms = Vec::new();
        for k in 0..self.dims.len() {
            let stride: u64 = self.dims[k + 1..].iter().map(|&d| u64::from(d)).product();
            let var = RtlExpr::var(format!("i{k}"));
            terms.push(if stride == 1 {
                var
            } else {
                var.mul(RtlExpr::num(stride))
            });
        }
        terms
            .into_iter()
            .reduce(RtlExpr::add)
            .unwrap_or(RtlExpr::num(0))
    }

    /// Selects this element's bit of a flat one-bit-per-element vector.
    /// Scalars use the base expression unchanged.
    pub fn element_bit(&self, base: RtlExpr) -> RtlExpr {
        if self.dims.is_empty() {
            base
        } else {
            base.index(self.element_index_expr())
        }
    }

    /// Selects this element's slice of a flat `width`-bits-per-element
    /// vector. Scalars use the base expression unchanged.
    pub fn element_slice(&self, base: RtlExpr, width: u64) -> RtlExpr {
        if self.dims.is_empty() {
            return base;
        }
        let lsb = if width == 1 {
            self.element_index_expr()
        } else {
            self.element_index_expr().mul(RtlExpr::num(width))
        };
        base.slice(lsb, width)
    }

    /// The access strobe bit for one subword of this register, addressed
    /// with the free index variables. A single-bit strobe is referenced
    /// bare.
    pub fn strobe_bit(&self, subwords: u32, subword: u32) -> RtlExpr {
        let strb = RtlExpr::var(access_strobe_name(&self.path));
        if self.total_elements() * u64::from(subwords) == 1 {
            return strb;
        }
        if self.dims.is_empty() {
            return strb.index(RtlExpr::num(u64::from(subword)));
        }
        let mut idx = self.element_index_expr();
        if subwords > 1 {
            idx = idx.mul(RtlExpr::num(u64::from(subwords)));
            if subword > 0 {
                idx = idx.add(RtlExpr::num(u64::from(subword)));
            }
        }
        strb.index(idx)
    }

    /// The access strobe bit for one subword of one concrete element,
    /// used by fully unrolled emission.
    pub fn strobe_bit_at(&self, elem: u64, subwords: u32, subword: u32) -> RtlExpr {
        let strb = RtlExpr::var(access_strobe_name(&self.path));
        if self.total_elements() * u64::from(subwords) == 1 {
            strb
        } else {
            strb.index(RtlExpr::num(elem * u64::from(subwords) + u64::from(subword)))
        }
    }
}

fn node_width(node: &Node) -> Option<u64> {
    match &node.kind {
        NodeKind::Field(f) => Some(u64::from(f.width)),
        NodeKind::Signal(s) => Some(u64::from(s.width)),
        NodeKind::Register(r) => Some(u64::from(r.regwidth)),
        NodeKind::Memory(m) => Some(u64::from(m.entry_width)),
        NodeKind::AddrMap | NodeKind::RegFile => None,
    }
}

/// A field that is its register's only child and shares its name folds
/// into the register segment.
fn collapses(map: &RegMap, field: NodeId) -> bool {
    let Some(parent) = map.parent(field) else {
        return false;
    };
    let pnode = map.node(parent);
    pnode.is_register() && pnode.children.len() == 1 && pnode.name == map.node(field).name
}

/// Resolves `target`'s canonical path relative to `top`.
///
/// Fails with a structural error when `target` lies outside `top`'s
/// subtree. Segments are lowercased and escaped against the SystemVerilog
/// reserved words; `top`'s own name is not part of the path. Repeated
/// calls return byte-identical results.
pub fn resolve(
    map: &RegMap,
    interner: &Interner,
    top: NodeId,
    target: NodeId,
) -> GenResult<IndexedPath> {
    if !map.is_ancestor(top, target) {
        return Err(GenError::structural(
            node_label(map, interner, target),
            "node is outside the generated scope",
        ));
    }

    let mut segments = Vec::new();
    let mut dims = Vec::new();
    let mut cur = target;
    while cur != top {
        let node = map.node(cur);
        if !(node.is_field() && collapses(map, cur)) {
            segments.push(escape(interner.resolve(node.name)));
        }
        for &d in node.dims.iter().rev() {
            dims.push(d);
        }
        match map.parent(cur) {
            Some(p) => cur = p,
            None => break,
        }
    }
    segments.reverse();
    dims.reverse();

    Ok(IndexedPath {
        path: segments.join("_"),
        dims,
        width: node_width(map.node(target)),
    })
}
