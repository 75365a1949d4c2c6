//! Software read-back multiplexing.
//!
//! Every sw-readable internal register contributes one term per array
//! element and subword: the decoded strobe, read-qualified, selects the
//! subword's assembled field image. Assembly is a fully unrolled
//! concatenation with constant indices; unreadable bit ranges are zero
//! fill. External readable nodes contribute their response data gated by
//! the read acknowledge, relying on the target to zero inactive subwords.
//! All terms OR into one `access_width`-wide vector; the bus adapter muxes
//! it onto `cpuif_rd_data` outside this block. A map with nothing readable
//! emits neither the declaration nor the assignment.

use crate::decode::BUS_REQ_IS_WR;
use crate::design::DesignState;
use crate::errors::GenResult;
use crate::field_next::FieldView;
use crate::hwif::{ext_in_name, ExtInKind};
use crate::path::resolve;
use crate::rtl::{CombItem, RtlExpr, SignalDecl};
use ferrite_common::Interner;
use ferrite_ir::{NodeId, NodeKind, RegMap, RegProps};
use serde::{Deserialize, Serialize};

/// The OR of every read term, one bus word wide.
pub const READBACK_DATA: &str = "readback_data";

/// Read-back output: the vector declaration and its fan-in assignment,
/// both absent when nothing is readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadbackRtl {
    /// The `readback_data` declaration when at least one term exists.
    pub decls: Vec<SignalDecl>,
    /// The single fan-in assignment when at least one term exists.
    pub comb: Vec<CombItem>,
}

/// Builds the read-back fan-in over every readable node under the design
/// top.
pub fn generate_readback(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
) -> GenResult<ReadbackRtl> {
    let mut terms = Vec::new();
    walk(map, interner, ds, ds.top, &mut terms)?;

    let mut out = ReadbackRtl::default();
    if !terms.is_empty() {
        out.decls
            .push(SignalDecl::new(READBACK_DATA, u64::from(ds.access_width)));
        out.comb.push(CombItem::assign(
            RtlExpr::var(READBACK_DATA),
            RtlExpr::fold_bit_or(terms),
        ));
    }
    Ok(out)
}

fn walk(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    terms: &mut Vec<RtlExpr>,
) -> GenResult<()> {
    for &child in map.children(id) {
        let node = map.node(child);
        match &node.kind {
            NodeKind::Memory(m) => {
                if m.sw.is_readable() {
                    external_terms(map, interner, ds, child, terms)?;
                }
            }
            NodeKind::AddrMap | NodeKind::RegFile if node.external => {
                if map.has_sw_readable(child) {
                    external_terms(map, interner, ds, child, terms)?;
                }
            }
            NodeKind::AddrMap | NodeKind::RegFile => walk(map, interner, ds, child, terms)?,
            NodeKind::Register(r) if node.external => {
                if map.has_sw_readable(child) {
                    external_register_terms(map, interner, ds, child, *r, terms)?;
                }
            }
            NodeKind::Register(r) => {
                if map.has_sw_readable(child) {
                    register_terms(map, interner, ds, child, *r, terms)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// One `rd_ack ? rd_data : '0` term per element of an external block or
/// memory.
fn external_terms(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    terms: &mut Vec<RtlExpr>,
) -> GenResult<()> {
    let ip = resolve(map, interner, ds.top, id)?;
    let n = ip.total_elements();
    let aw = u64::from(ds.access_width);
    let ack = RtlExpr::var(ext_in_name(ip.path(), ExtInKind::RdAck));
    let data = RtlExpr::var(ext_in_name(ip.path(), ExtInKind::RdData));
    for e in 0..n {
        let a = if n == 1 {
            ack.clone()
        } else {
            ack.clone().index(RtlExpr::num(e))
        };
        let d = if n == 1 {
            data.clone()
        } else {
            data.clone().slice(RtlExpr::num(e * aw), aw)
        };
        terms.push(RtlExpr::ternary(a, d, RtlExpr::lit(0, ds.access_width)));
    }
    Ok(())
}

/// Per-subword terms of an external register. The response is register
/// wide; each subword slice is gated by the element's acknowledge.
fn external_register_terms(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    props: RegProps,
    terms: &mut Vec<RtlExpr>,
) -> GenResult<()> {
    let ip = resolve(map, interner, ds.top, id)?;
    let n = ip.total_elements();
    let aw = u64::from(ds.access_width);
    let rw = u64::from(props.regwidth);
    let subwords = u64::from(props.subwords());
    let ack = RtlExpr::var(ext_in_name(ip.path(), ExtInKind::RdAck));
    let data = RtlExpr::var(ext_in_name(ip.path(), ExtInKind::RdData));
    for e in 0..n {
        let a = if n == 1 {
            ack.clone()
        } else {
            ack.clone().index(RtlExpr::num(e))
        };
        for s in 0..subwords {
            let d = if n * subwords == 1 {
                data.clone()
            } else {
                data.clone().slice(RtlExpr::num(e * rw + s * aw), aw)
            };
            terms.push(RtlExpr::ternary(
                a.clone(),
                d,
                RtlExpr::lit(0, ds.access_width),
            ));
        }
    }
    Ok(())
}

/// Read-qualified strobe terms of an internal register, one per element
/// and subword, each selecting the assembled field image.
fn register_terms(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    reg: NodeId,
    props: RegProps,
    terms: &mut Vec<RtlExpr>,
) -> GenResult<()> {
    let mut fields = Vec::new();
    for fid in map.fields_of(reg).collect::<Vec<_>>() {
        let view = FieldView::new(map, interner, ds, reg, fid)?;
        if view.props.sw.is_readable() {
            fields.push(view);
        }
    }
    fields.sort_by_key(|v| v.props.lsb);

    let ip = resolve(map, interner, ds.top, reg)?;
    let aw = ds.access_width;
    let subwords = props.subwords();
    for e in 0..ip.total_elements() {
        for s in 0..subwords {
            let lo = s * aw;
            let hi = lo + aw - 1;
            // assembled LSB first, reversed into concatenation order
            let mut parts = Vec::new();
            let mut pos = lo;
            for v in &fields {
                let f = &v.props;
                if f.msb() < lo || f.lsb > hi {
                    continue;
                }
                let olo = f.lsb.max(lo);
                let ohi = f.msb().min(hi);
                if olo > pos {
                    parts.push(RtlExpr::lit(0, olo - pos));
                }
                parts.push(v.value_slice_at(e, olo - f.lsb, ohi - olo + 1)?);
                pos = ohi + 1;
            }
            if parts.is_empty() {
                continue;
            }
            if pos <= hi {
                parts.push(RtlExpr::lit(0, hi - pos + 1));
            }
            parts.reverse();
            let guard = ip
                .strobe_bit_at(e, subwords, s)
                .logic_and(RtlExpr::var(BUS_REQ_IS_WR).logic_not());
            terms.push(RtlExpr::ternary(
                guard,
                RtlExpr::concat(parts),
                RtlExpr::lit(0, aw),
            ));
        }
    }
    Ok(())
}
