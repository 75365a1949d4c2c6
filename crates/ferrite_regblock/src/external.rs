//! Outgoing request wiring for external registers, blocks, and memories.
//!
//! The decode pass already produced a qualified strobe per external node;
//! this pass fans it out to the node's request port together with the bus
//! direction, data, and bit-enable signals, replicated across subwords and
//! array elements. Blocks and memories additionally receive the
//! block-relative address as a low-bit slice of `cpuif_addr` (external
//! regions are size-aligned by the front end, so no subtraction is
//! involved). Retiming options turn the fan-out of a node into one clocked
//! stage whose reset clears the request bits.

use crate::decode::{BUS_ADDR, BUS_REQ_IS_WR, BUS_WR_BITEN, BUS_WR_DATA};
use crate::design::DesignState;
use crate::errors::GenResult;
use crate::hwif::{ext_addr_width, ext_out_name, ExtOutKind};
use crate::path::{access_strobe_name, resolve};
use crate::rtl::{CombItem, RtlExpr, SeqBlock, SeqReset, SeqStmt};
use ferrite_common::Interner;
use ferrite_ir::{NodeId, NodeKind, RegMap, RegProps};
use serde::{Deserialize, Serialize};

/// Request wiring output: continuous fan-out assigns, or one clocked stage
/// per retimed node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRtl {
    /// Un-retimed request assignments in traversal order.
    pub comb: Vec<CombItem>,
    /// One retiming stage per retimed external node.
    pub seq: Vec<SeqBlock>,
}

/// Emits request wiring for every external node under the design top.
pub fn generate_external(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
) -> GenResult<ExternalRtl> {
    let mut out = ExternalRtl::default();
    walk(map, interner, ds, ds.top, &mut out)?;
    Ok(out)
}

fn walk(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    out: &mut ExternalRtl,
) -> GenResult<()> {
    for &child in map.children(id) {
        let node = map.node(child);
        match &node.kind {
            NodeKind::Memory(_) => block_request(map, interner, ds, child, out)?,
            NodeKind::AddrMap | NodeKind::RegFile if node.external => {
                block_request(map, interner, ds, child, out)?;
            }
            NodeKind::AddrMap | NodeKind::RegFile => walk(map, interner, ds, child, out)?,
            NodeKind::Register(r) if node.external => {
                register_request(map, interner, ds, child, *r, out)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Replicates a bus signal across `copies` subword or element positions.
fn fan(e: RtlExpr, copies: u64) -> RtlExpr {
    if copies > 1 {
        e.repl(copies)
    } else {
        e
    }
}

fn register_request(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    props: RegProps,
    out: &mut ExternalRtl,
) -> GenResult<()> {
    let ip = resolve(map, interner, ds.top, id)?;
    let n = ip.total_elements();
    let path = ip.path();
    let copies = u64::from(props.subwords()) * n;

    let mut pairs = vec![
        (
            ext_out_name(path, ExtOutKind::Req),
            RtlExpr::var(access_strobe_name(path)),
        ),
        (
            ext_out_name(path, ExtOutKind::ReqIsWr),
            fan(RtlExpr::var(BUS_REQ_IS_WR), n),
        ),
    ];
    if map.has_sw_writable(id) {
        pairs.push((
            ext_out_name(path, ExtOutKind::WrData),
            fan(RtlExpr::var(BUS_WR_DATA), copies),
        ));
        pairs.push((
            ext_out_name(path, ExtOutKind::WrBiten),
            fan(RtlExpr::var(BUS_WR_BITEN), copies),
        ));
    }
    emit_request(out, ds, ds.retime_external_reg, pairs, copies);
    Ok(())
}

fn block_request(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    out: &mut ExternalRtl,
) -> GenResult<()> {
    let node = map.node(id);
    let (writable, retime) = match &node.kind {
        NodeKind::Memory(m) => (m.sw.is_writable(), ds.retime_external_mem),
        _ => (map.has_sw_writable(id), ds.retime_external_reg),
    };
    let addr_w = u64::from(ext_addr_width(node));
    let ip = resolve(map, interner, ds.top, id)?;
    let n = ip.total_elements();
    let path = ip.path();

    let mut pairs = vec![
        (
            ext_out_name(path, ExtOutKind::Req),
            RtlExpr::var(access_strobe_name(path)),
        ),
        (
            ext_out_name(path, ExtOutKind::Addr),
            fan(RtlExpr::var(BUS_ADDR).slice(RtlExpr::num(0), addr_w), n),
        ),
        (
            ext_out_name(path, ExtOutKind::ReqIsWr),
            fan(RtlExpr::var(BUS_REQ_IS_WR), n),
        ),
    ];
    if writable {
        pairs.push((
            ext_out_name(path, ExtOutKind::WrData),
            fan(RtlExpr::var(BUS_WR_DATA), n),
        ));
        pairs.push((
            ext_out_name(path, ExtOutKind::WrBiten),
            fan(RtlExpr::var(BUS_WR_BITEN), n),
        ));
    }
    emit_request(out, ds, retime, pairs, n);
    Ok(())
}

/// Fans one node's request pairs out combinationally, or through one
/// clocked stage when retimed. The first pair is the request vector and is
/// the only signal cleared by reset.
fn emit_request(
    out: &mut ExternalRtl,
    ds: &DesignState,
    retime: bool,
    pairs: Vec<(String, RtlExpr)>,
    req_width: u64,
) {
    if retime {
        let reset = SeqReset {
            signal: ds.default_reset.signal.clone(),
            active_low: ds.default_reset.active_low,
            is_async: ds.default_reset.is_async,
            body: vec![SeqStmt::assign(
                RtlExpr::var(pairs[0].0.clone()),
                RtlExpr::lit(0, req_width as u32),
            )],
        };
        out.seq.push(SeqBlock {
            clock: ds.clock.clone(),
            reset: Some(reset),
            body: pairs
                .into_iter()
                .map(|(name, value)| SeqStmt::assign(RtlExpr::var(name), value))
                .collect(),
        });
    } else {
        out.comb.extend(
            pairs
                .into_iter()
                .map(|(name, value)| CombItem::assign(RtlExpr::var(name), value)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_config::RegblockConfig;
    use ferrite_ir::{Access, FieldProps, MemProps, RegMapBuilder};

    fn assigns(rtl: &ExternalRtl) -> Vec<String> {
        rtl.comb
            .iter()
            .map(|i| match i {
                CombItem::Assign(a) => a.to_string(),
                CombItem::For(_) => unreachable!("request wiring is vector-level"),
            })
            .collect()
    }

    fn design(map: &RegMap, interner: &Interner, cfg: &RegblockConfig) -> DesignState {
        DesignState::new(map, interner, cfg).unwrap()
    }

    #[test]
    fn external_register_request_wiring() {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("mbox", 0x0, RegProps::new(32));
        b.external();
        b.field("data", FieldProps::new(0, 32));
        b.end();
        let (map, interner) = b.finish();
        let ds = design(&map, &interner, &RegblockConfig::default());
        let rtl = generate_external(&map, &interner, &ds).unwrap();

        assert_eq!(
            assigns(&rtl),
            vec![
                "assign hwif_out_mbox_req = decoded_reg_strb_mbox;",
                "assign hwif_out_mbox_req_is_wr = cpuif_req_is_wr;",
                "assign hwif_out_mbox_wr_data = cpuif_wr_data;",
                "assign hwif_out_mbox_wr_biten = cpuif_wr_biten;",
            ]
        );
        assert!(rtl.seq.is_empty());
    }

    #[test]
    fn wide_external_register_replicates_bus_data() {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register(
            "wide",
            0x0,
            RegProps {
                regwidth: 64,
                accesswidth: 32,
            },
        );
        b.external();
        b.field("data", FieldProps::new(0, 64));
        b.end();
        let (map, interner) = b.finish();
        let ds = design(&map, &interner, &RegblockConfig::default());
        let rtl = generate_external(&map, &interner, &ds).unwrap();

        let a = assigns(&rtl);
        assert!(a.contains(&"assign hwif_out_wide_req = decoded_reg_strb_wide;".to_string()));
        assert!(a.contains(&"assign hwif_out_wide_wr_data = {2{cpuif_wr_data}};".to_string()));
    }

    #[test]
    fn external_block_addresses_with_low_bits() {
        let mut b = RegMapBuilder::new("top", 0x1000);
        b.begin_regfile("blk", 0x40, 0x40);
        b.external();
        b.begin_register("r0", 0x0, RegProps::new(32));
        b.field("f", FieldProps::new(0, 32));
        b.end();
        b.end();
        let (map, interner) = b.finish();
        let ds = design(&map, &interner, &RegblockConfig::default());
        let rtl = generate_external(&map, &interner, &ds).unwrap();

        let a = assigns(&rtl);
        assert!(a.contains(&"assign hwif_out_blk_req = decoded_reg_strb_blk;".to_string()));
        assert!(a.contains(&"assign hwif_out_blk_addr = cpuif_addr[0 +: 6];".to_string()));
        assert!(a.contains(&"assign hwif_out_blk_wr_data = cpuif_wr_data;".to_string()));
    }

    #[test]
    fn arrayed_block_replicates_per_element() {
        let mut b = RegMapBuilder::new("top", 0x1000);
        b.begin_regfile("blk", 0x0, 0x40);
        b.dims(&[2]);
        b.external();
        b.begin_register("r0", 0x0, RegProps::new(32));
        b.field("f", FieldProps::new(0, 32));
        b.end();
        b.end();
        let (map, interner) = b.finish();
        let ds = design(&map, &interner, &RegblockConfig::default());
        let rtl = generate_external(&map, &interner, &ds).unwrap();

        let a = assigns(&rtl);
        assert!(a.contains(&"assign hwif_out_blk_addr = {2{cpuif_addr[0 +: 6]}};".to_string()));
        assert!(a.contains(&"assign hwif_out_blk_req_is_wr = {2{cpuif_req_is_wr}};".to_string()));
    }

    #[test]
    fn read_only_memory_omits_write_signals() {
        let mut b = RegMapBuilder::new("top", 0x10000);
        let mut m = MemProps::new(256, 32);
        m.sw = Access::R;
        b.begin_memory("rom", 0x0, m);
        b.end();
        let (map, interner) = b.finish();
        let ds = design(&map, &interner, &RegblockConfig::default());
        let rtl = generate_external(&map, &interner, &ds).unwrap();

        let a = assigns(&rtl);
        assert_eq!(a.len(), 3);
        assert!(a.iter().all(|s| !s.contains("wr_data") && !s.contains("wr_biten")));
        assert!(a.contains(&"assign hwif_out_rom_addr = cpuif_addr[0 +: 10];".to_string()));
    }

    #[test]
    fn retimed_register_request_is_clocked() {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("mbox", 0x0, RegProps::new(32));
        b.external();
        b.field("data", FieldProps::new(0, 32));
        b.end();
        let (map, interner) = b.finish();
        let mut cfg = RegblockConfig::default();
        cfg.external.retime_reg = true;
        let ds = design(&map, &interner, &cfg);
        let rtl = generate_external(&map, &interner, &ds).unwrap();

        assert!(rtl.comb.is_empty());
        assert_eq!(rtl.seq.len(), 1);
        let text = rtl.seq[0].to_string();
        assert!(text.contains("    if (rst) begin\n        hwif_out_mbox_req <= 1'h0;\n"));
        assert!(text.contains("        hwif_out_mbox_req <= decoded_reg_strb_mbox;\n"));
        assert!(text.contains("        hwif_out_mbox_wr_biten <= cpuif_wr_biten;\n"));
    }
}
