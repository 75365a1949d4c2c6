//! Address decode: strobe declarations and the combinational logic that
//! asserts them from the incoming bus address.
//!
//! Two passes over the tree, both skipping the top node itself. The
//! declaration pass sizes one strobe vector per register (subwords times
//! array elements) and per external block (one bit per element). The logic
//! pass walks the tree with an explicit address frame of constant and
//! index-dependent terms, comparing `cpuif_addr` against each register
//! subword address and each external block range. Decode assumes the
//! address space is statically partitioned by the front end; overlap
//! detection is an upstream concern.

use crate::design::DesignState;
use crate::errors::GenResult;
use crate::path::{access_strobe_name, resolve};
use crate::rtl::{CombItem, GenFor, RtlExpr, SignalDecl};
use ferrite_common::Interner;
use ferrite_ir::{NodeId, NodeKind, RegMap};
use serde::{Deserialize, Serialize};

/// Bus request input name.
pub const BUS_REQ: &str = "cpuif_req";
/// Bus write-direction input name.
pub const BUS_REQ_IS_WR: &str = "cpuif_req_is_wr";
/// Bus address input name.
pub const BUS_ADDR: &str = "cpuif_addr";
/// Bus write-data input name.
pub const BUS_WR_DATA: &str = "cpuif_wr_data";
/// Bus write bit-enable input name.
pub const BUS_WR_BITEN: &str = "cpuif_wr_biten";

/// The signal telling the bus adapter the current request dispatches to an
/// external implementation.
pub const REQ_IS_EXTERNAL: &str = "decoded_req_is_external";

/// Decode output: strobe declarations and the logic driving them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeRtl {
    /// Strobe declarations, plus the external-dispatch flag when needed.
    pub decls: Vec<SignalDecl>,
    /// Strobe assignments in traversal order.
    pub items: Vec<CombItem>,
    /// At least one external register, block, or memory exists.
    pub has_external: bool,
}

/// One scope's address arithmetic: the accumulated constant byte offset
/// and one index-dependent term per enclosing array dimension. Extended
/// per recursion step, never mutated in place.
#[derive(Clone)]
struct AddrFrame {
    base: u64,
    terms: Vec<RtlExpr>,
    next_index: u32,
}

impl AddrFrame {
    fn top() -> Self {
        Self {
            base: 0,
            terms: Vec::new(),
            next_index: 0,
        }
    }

    /// The frame inside `node`: offset folded into the constant, one
    /// stride term per array dimension of the node itself.
    fn enter(&self, ds: &DesignState, offset: u64, elem_size: u64, dims: &[u32]) -> Self {
        let mut next = self.clone();
        next.base += offset;
        for (k, _) in dims.iter().enumerate() {
            let stride: u64 = elem_size
                * dims[k + 1..]
                    .iter()
                    .map(|&d| u64::from(d))
                    .product::<u64>();
            next.terms.push(
                RtlExpr::var(format!("i{}", self.next_index + k as u32))
                    .mul(RtlExpr::lit(stride, ds.addr_width)),
            );
        }
        next.next_index += dims.len() as u32;
        next
    }

    /// The bus address of this frame plus `extra` bytes.
    fn addr(&self, ds: &DesignState, extra: u64) -> RtlExpr {
        let mut e = RtlExpr::lit(self.base + extra, ds.addr_width);
        for t in &self.terms {
            e = e.add(t.clone());
        }
        e
    }
}

fn bus_req() -> RtlExpr {
    RtlExpr::var(BUS_REQ)
}

fn bus_addr() -> RtlExpr {
    RtlExpr::var(BUS_ADDR)
}

/// An "any element selected" term for a strobe vector.
fn any_bit(name: String, bits: u64) -> RtlExpr {
    let v = RtlExpr::var(name);
    if bits == 1 {
        v
    } else {
        v.red_or()
    }
}

#[derive(Default)]
struct WalkOut {
    items: Vec<CombItem>,
    ext_terms: Vec<RtlExpr>,
}

impl WalkOut {
    fn absorb(&mut self, other: WalkOut) {
        self.items.extend(other.items);
        self.ext_terms.extend(other.ext_terms);
    }
}

fn decode_register(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    frame: &AddrFrame,
) -> GenResult<WalkOut> {
    let node = map.node(id);
    let Some(props) = node.reg_props() else {
        return Ok(WalkOut::default());
    };
    let ip = resolve(map, interner, ds.top, id)?;
    let inner = frame.enter(ds, node.offset, node.size, &node.dims);
    let subwords = props.subwords();
    let access_bytes = u64::from(props.accesswidth / 8);

    let mut assigns = Vec::new();
    for s in 0..subwords {
        let cmp = bus_addr().equals(inner.addr(ds, u64::from(s) * access_bytes));
        assigns.push(CombItem::assign(
            ip.strobe_bit(subwords, s),
            bus_req().logic_and(cmp),
        ));
    }

    let mut out = WalkOut {
        items: GenFor::nest(&node.dims, frame.next_index, assigns),
        ext_terms: Vec::new(),
    };

    if node.external {
        let any = any_bit(
            access_strobe_name(ip.path()),
            u64::from(subwords) * ip.total_elements(),
        );
        let writable = map.has_sw_writable(id);
        let readable = map.has_sw_readable(id);
        let term = match (writable, readable) {
            (true, true) => Some(any),
            (true, false) => Some(any.logic_and(RtlExpr::var(BUS_REQ_IS_WR))),
            (false, true) => Some(any.logic_and(RtlExpr::var(BUS_REQ_IS_WR).logic_not())),
            (false, false) => None,
        };
        out.ext_terms.extend(term);
    }
    Ok(out)
}

fn decode_external_block(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    frame: &AddrFrame,
) -> GenResult<WalkOut> {
    let node = map.node(id);
    let ip = resolve(map, interner, ds.top, id)?;
    let inner = frame.enter(ds, node.offset, node.size, &node.dims);

    let lo = bus_addr().ge(inner.addr(ds, 0));
    let hi = bus_addr().le(inner.addr(ds, node.size - 1));
    let assign = CombItem::assign(
        ip.element_bit(RtlExpr::var(access_strobe_name(ip.path()))),
        bus_req().logic_and(lo).logic_and(hi),
    );

    Ok(WalkOut {
        items: GenFor::nest(&node.dims, frame.next_index, vec![assign]),
        ext_terms: vec![any_bit(
            access_strobe_name(ip.path()),
            ip.total_elements(),
        )],
    })
}

fn walk(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    frame: &AddrFrame,
) -> GenResult<WalkOut> {
    let mut out = WalkOut::default();
    for &child in map.children(id) {
        let node = map.node(child);
        if node.is_external_block() {
            out.absorb(decode_external_block(map, interner, ds, child, frame)?);
        } else if node.is_register() {
            out.absorb(decode_register(map, interner, ds, child, frame)?);
        } else if matches!(node.kind, NodeKind::RegFile | NodeKind::AddrMap) {
            let inner = frame.enter(ds, node.offset, node.size, &node.dims);
            let child_out = walk(map, interner, ds, child, &inner)?;
            out.items
                .extend(GenFor::nest(&node.dims, frame.next_index, child_out.items));
            out.ext_terms.extend(child_out.ext_terms);
        }
    }
    Ok(out)
}

fn collect_decls(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    decls: &mut Vec<SignalDecl>,
) -> GenResult<()> {
    for &child in map.children(id) {
        let node = map.node(child);
        if node.is_external_block() {
            let ip = resolve(map, interner, ds.top, child)?;
            decls.push(SignalDecl::new(
                access_strobe_name(ip.path()),
                ip.total_elements(),
            ));
        } else if let Some(props) = node.reg_props() {
            let ip = resolve(map, interner, ds.top, child)?;
            decls.push(SignalDecl::new(
                access_strobe_name(ip.path()),
                u64::from(props.subwords()) * ip.total_elements(),
            ));
        } else if matches!(node.kind, NodeKind::RegFile | NodeKind::AddrMap) {
            collect_decls(map, interner, ds, child, decls)?;
        }
    }
    Ok(())
}

/// Runs both decode passes.
pub fn generate_decode(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
) -> GenResult<DecodeRtl> {
    let mut decls = Vec::new();
    collect_decls(map, interner, ds, ds.top, &mut decls)?;

    let mut out = walk(map, interner, ds, ds.top, &AddrFrame::top())?;
    let has_external = !out.ext_terms.is_empty();
    if has_external {
        decls.push(SignalDecl::new(REQ_IS_EXTERNAL, 1));
        out.items.push(CombItem::assign(
            RtlExpr::var(REQ_IS_EXTERNAL),
            RtlExpr::disjoin(out.ext_terms),
        ));
    }

    Ok(DecodeRtl {
        decls,
        items: out.items,
        has_external,
    })
}
