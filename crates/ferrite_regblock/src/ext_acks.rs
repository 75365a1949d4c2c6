//! Acknowledge and error fan-in from external implementations.
//!
//! The bus adapter completes an externally dispatched access when the
//! target raises its ack input, and flags it when the target raises an
//! error input. Four aggregate lines are built by the same recursive
//! collector parameterized over [`AckKind`]; the walk stops at external
//! boundaries, so each term is a whole hwif input vector, OR-reduced when
//! the node is arrayed. A line with no contributing node is not declared
//! at all.

use crate::design::DesignState;
use crate::errors::GenResult;
use crate::hwif::{ext_in_name, ExtInKind};
use crate::path::resolve;
use crate::rtl::{CombItem, RtlExpr, SignalDecl};
use ferrite_common::Interner;
use ferrite_ir::{NodeId, NodeKind, RegMap};
use serde::{Deserialize, Serialize};

/// Aggregated write-acknowledge line.
pub const EXTERNAL_WR_ACK: &str = "external_wr_ack";
/// Aggregated read-acknowledge line.
pub const EXTERNAL_RD_ACK: &str = "external_rd_ack";
/// Aggregated read-error line.
pub const EXTERNAL_RD_ERR: &str = "external_rd_err";
/// Aggregated write-error line.
pub const EXTERNAL_WR_ERR: &str = "external_wr_err";

/// One of the four aggregated response lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    /// Write acknowledge.
    WrAck,
    /// Read acknowledge.
    RdAck,
    /// Read error.
    RdErr,
    /// Write error.
    WrErr,
}

impl AckKind {
    /// All four lines in emission order.
    pub const ALL: [AckKind; 4] = [
        AckKind::WrAck,
        AckKind::RdAck,
        AckKind::RdErr,
        AckKind::WrErr,
    ];

    /// The aggregate signal this line drives.
    pub fn signal(self) -> &'static str {
        match self {
            AckKind::WrAck => EXTERNAL_WR_ACK,
            AckKind::RdAck => EXTERNAL_RD_ACK,
            AckKind::RdErr => EXTERNAL_RD_ERR,
            AckKind::WrErr => EXTERNAL_WR_ERR,
        }
    }

    fn input(self) -> ExtInKind {
        match self {
            AckKind::WrAck => ExtInKind::WrAck,
            AckKind::RdAck => ExtInKind::RdAck,
            AckKind::RdErr => ExtInKind::RdErr,
            AckKind::WrErr => ExtInKind::WrErr,
        }
    }

    fn wants_write(self) -> bool {
        matches!(self, AckKind::WrAck | AckKind::WrErr)
    }

    fn is_err(self) -> bool {
        matches!(self, AckKind::RdErr | AckKind::WrErr)
    }
}

/// Aggregation output: the declared lines and their fan-in assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckRtl {
    /// One declaration per line with at least one term.
    pub decls: Vec<SignalDecl>,
    /// One OR fan-in assignment per declared line.
    pub comb: Vec<CombItem>,
}

/// Aggregates external acknowledge and error inputs into the four
/// `external_*` lines.
pub fn generate_acks(map: &RegMap, interner: &Interner, ds: &DesignState) -> GenResult<AckRtl> {
    let mut out = AckRtl::default();
    for kind in AckKind::ALL {
        let mut terms = Vec::new();
        collect(map, interner, ds, ds.top, kind, &mut terms)?;
        if !terms.is_empty() {
            out.decls.push(SignalDecl::new(kind.signal(), 1));
            out.comb.push(CombItem::assign(
                RtlExpr::var(kind.signal()),
                RtlExpr::fold_bit_or(terms),
            ));
        }
    }
    Ok(out)
}

fn collect(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    kind: AckKind,
    terms: &mut Vec<RtlExpr>,
) -> GenResult<()> {
    for &child in map.children(id) {
        let node = map.node(child);
        let direction_ok = |n| {
            if kind.wants_write() {
                map.has_sw_writable(n)
            } else {
                map.has_sw_readable(n)
            }
        };
        let eligible = match &node.kind {
            NodeKind::Memory(m) => {
                let cap = if kind.wants_write() {
                    m.sw.is_writable()
                } else {
                    m.sw.is_readable()
                };
                cap && (!kind.is_err() || m.err_support)
            }
            NodeKind::AddrMap | NodeKind::RegFile if node.external => direction_ok(child),
            NodeKind::AddrMap | NodeKind::RegFile => {
                collect(map, interner, ds, child, kind, terms)?;
                false
            }
            NodeKind::Register(_) if node.external => !kind.is_err() && direction_ok(child),
            _ => false,
        };
        if eligible {
            let ip = resolve(map, interner, ds.top, child)?;
            let v = RtlExpr::var(ext_in_name(ip.path(), kind.input()));
            terms.push(if ip.is_array() { v.red_or() } else { v });
        }
    }
    Ok(())
}
