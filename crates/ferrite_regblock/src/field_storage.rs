//! Field storage: the registered state behind every internal register,
//! plus the combinational outputs derived from it.
//!
//! One pass over the internal registers. Each storage field becomes a flat
//! vector declaration and one clocked block whose body is the field's
//! ordered conditional list folded into a priority `if` chain. Counter
//! fields additionally get widened sum vectors assigned combinationally.
//! Derived hardware outputs (read value, reductions, access strobes,
//! counter events, register interrupt lines) are continuous assignments
//! over the same vectors. External registers and everything below an
//! external block carry no storage here.

use crate::design::DesignState;
use crate::errors::GenResult;
use crate::field_next::{
    decr_sum_name, incr_sum_name, next_q_name, storage_name, value_expr, FieldView,
};
use crate::hwif::{output_name, value_output_name, InputKind, OutputKind};
use crate::path::resolve;
use crate::rtl::{CombItem, GenFor, IfArm, IfStmt, RtlExpr, SeqBlock, SeqReset, SeqStmt, SignalDecl};
use ferrite_common::Interner;
use ferrite_ir::{NodeId, NodeKind, RegMap};
use serde::{Deserialize, Serialize};

/// Storage output: state declarations, derived combinational logic, and
/// one clocked block per storage field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRtl {
    /// Storage vectors, delayed next-value copies, and counter sums.
    pub decls: Vec<SignalDecl>,
    /// Counter sums and derived hardware outputs.
    pub comb: Vec<CombItem>,
    /// One clocked process per storage field, in traversal order.
    pub seq: Vec<SeqBlock>,
}

/// Emits storage and derived outputs for every internal register under
/// the design top.
pub fn generate_storage(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
) -> GenResult<StorageRtl> {
    let mut out = StorageRtl::default();
    walk(map, interner, ds, ds.top, &mut out)?;
    Ok(out)
}

fn walk(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    out: &mut StorageRtl,
) -> GenResult<()> {
    for &child in map.children(id) {
        let node = map.node(child);
        if node.external {
            continue;
        }
        match &node.kind {
            NodeKind::Register(_) => emit_register(map, interner, ds, child, out)?,
            NodeKind::AddrMap | NodeKind::RegFile => walk(map, interner, ds, child, out)?,
            _ => {}
        }
    }
    Ok(())
}

fn emit_register(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    reg: NodeId,
    out: &mut StorageRtl,
) -> GenResult<()> {
    let mut intr_terms = Vec::new();
    let mut halt_terms = Vec::new();

    for fid in map.fields_of(reg).collect::<Vec<_>>() {
        let view = FieldView::new(map, interner, ds, reg, fid)?;
        if view.props.has_storage() {
            emit_field(&view, out)?;
        }
        derived_outputs(&view, out)?;

        if let Some(i) = view.props.intr {
            let mut gated = view.cur();
            if let Some(en) = i.enable {
                gated = gated.bit_and(value_expr(map, interner, ds, en)?);
            }
            if let Some(mk) = i.mask {
                gated = gated.bit_and(value_expr(map, interner, ds, mk)?.not());
            }
            intr_terms.push(view.any(gated));
            if i.has_halt() {
                let mut gated = view.cur();
                if let Some(en) = i.haltenable {
                    gated = gated.bit_and(value_expr(map, interner, ds, en)?);
                }
                if let Some(mk) = i.haltmask {
                    gated = gated.bit_and(value_expr(map, interner, ds, mk)?.not());
                }
                halt_terms.push(view.any(gated));
            }
        }
    }

    if !intr_terms.is_empty() {
        let reg_ip = resolve(map, interner, ds.top, reg)?;
        let mut items = vec![CombItem::assign(
            reg_ip.element_bit(RtlExpr::var(output_name(reg_ip.path(), OutputKind::Intr))),
            RtlExpr::disjoin(intr_terms),
        )];
        if !halt_terms.is_empty() {
            items.push(CombItem::assign(
                reg_ip.element_bit(RtlExpr::var(output_name(reg_ip.path(), OutputKind::Halt))),
                RtlExpr::disjoin(halt_terms),
            ));
        }
        out.comb.extend(GenFor::nest(reg_ip.dims(), 0, items));
    }
    Ok(())
}

/// Declarations, counter sums, and the clocked process of one storage
/// field.
fn emit_field(view: &FieldView<'_>, out: &mut StorageRtl) -> GenResult<()> {
    let path = view.ip.path();
    let w = view.width();
    let elems = view.ip.total_elements();

    out.decls.push(SignalDecl::new(storage_name(path), w * elems));
    if view.needs_next_delay() {
        out.decls.push(SignalDecl::new(next_q_name(path), w * elems));
    }

    if let Some(c) = view.props.counter {
        if c.incr.is_set() {
            out.decls
                .push(SignalDecl::new(incr_sum_name(path), (w + 1) * elems));
            let step = view.step(c.incr_value, InputKind::Incrvalue)?;
            out.comb.extend(GenFor::nest(
                view.ip.dims(),
                0,
                vec![CombItem::assign(
                    view.sum_slice(incr_sum_name(path)),
                    view.cur().add(step),
                )],
            ));
        }
        if c.decr.is_set() {
            out.decls
                .push(SignalDecl::new(decr_sum_name(path), (w + 1) * elems));
            let step = view.step(c.decr_value, InputKind::Decrvalue)?;
            out.comb.extend(GenFor::nest(
                view.ip.dims(),
                0,
                vec![CombItem::assign(
                    view.sum_slice(decr_sum_name(path)),
                    view.cur().sub(step),
                )],
            ));
        }
    }

    let mut arms = Vec::new();
    let mut else_body = Vec::new();
    for c in view.assemble()? {
        match c.guard {
            Some(cond) => arms.push(IfArm { cond, body: c.body }),
            None => {
                // later conditionals can never fire
                else_body = c.body;
                break;
            }
        }
    }
    let mut stmts = if arms.is_empty() {
        else_body
    } else {
        vec![SeqStmt::If(IfStmt { arms, else_body })]
    };
    if view.needs_next_delay() {
        stmts.push(SeqStmt::assign(view.next_q(), view.next_expr()?));
    }

    let reset = view.resolve_reset()?.map(|(style, value)| {
        let mut body = vec![SeqStmt::assign(
            RtlExpr::var(storage_name(path)),
            reset_word(value, view.props.width, elems),
        )];
        if view.needs_next_delay() {
            body.push(SeqStmt::assign(
                RtlExpr::var(next_q_name(path)),
                reset_word(0, view.props.width, elems),
            ));
        }
        SeqReset {
            signal: style.signal,
            active_low: style.active_low,
            is_async: style.is_async,
            body,
        }
    });

    out.seq.push(SeqBlock {
        clock: view.ds.clock.clone(),
        reset,
        body: SeqStmt::nest(view.ip.dims(), stmts),
    });
    Ok(())
}

fn reset_word(value: u64, width: u32, elems: u64) -> RtlExpr {
    let word = RtlExpr::lit(value, width);
    if elems > 1 {
        word.repl(elems)
    } else {
        word
    }
}

/// Continuous assignments a field drives besides its storage: the value
/// output, bit reductions, software access strobes, and counter events.
fn derived_outputs(view: &FieldView<'_>, out: &mut StorageRtl) -> GenResult<()> {
    let f = &view.props;
    let path = view.ip.path();

    if f.hw.is_readable() && f.has_storage() {
        out.comb.push(CombItem::assign(
            RtlExpr::var(value_output_name(path)),
            RtlExpr::var(storage_name(path)),
        ));
    }

    let mut items = Vec::new();
    let bit = |kind| view.ip.element_bit(RtlExpr::var(output_name(path, kind)));

    if f.anded {
        items.push(CombItem::assign(
            bit(OutputKind::Anded),
            view.read_value()?.red_and(),
        ));
    }
    if f.ored {
        items.push(CombItem::assign(
            bit(OutputKind::Ored),
            view.read_value()?.red_or(),
        ));
    }
    if f.xored {
        items.push(CombItem::assign(
            bit(OutputKind::Xored),
            view.read_value()?.red_xor(),
        ));
    }

    if f.swacc {
        items.push(CombItem::assign(bit(OutputKind::Swacc), view.strobe()));
    }
    if f.rd_swacc {
        items.push(CombItem::assign(bit(OutputKind::RdSwacc), view.read_guard()));
    }
    if f.wr_swacc {
        items.push(CombItem::assign(
            bit(OutputKind::WrSwacc),
            view.write_guard()?,
        ));
    }
    if f.swmod {
        let mut terms = Vec::new();
        if f.sw.is_writable() {
            terms.push(view.write_guard()?);
        }
        if f.onread.is_some() {
            terms.push(view.read_guard());
        }
        items.push(CombItem::assign(
            bit(OutputKind::Swmod),
            RtlExpr::disjoin(terms),
        ));
    }

    if let Some(c) = f.counter {
        if let Some(t) = c.incr_threshold {
            items.push(CombItem::assign(
                bit(OutputKind::Incrthreshold),
                view.cur().ge(RtlExpr::lit(t, f.width)),
            ));
        }
        if let Some(t) = c.decr_threshold {
            items.push(CombItem::assign(
                bit(OutputKind::Decrthreshold),
                view.cur().le(RtlExpr::lit(t, f.width)),
            ));
        }
        if c.overflow {
            if let Some(ev) = view.control(c.incr, InputKind::Incr)? {
                items.push(CombItem::assign(
                    bit(OutputKind::Overflow),
                    ev.logic_and(view.incr_carry()),
                ));
            }
        }
        if c.underflow {
            if let Some(ev) = view.control(c.decr, InputKind::Decr)? {
                items.push(CombItem::assign(
                    bit(OutputKind::Underflow),
                    ev.logic_and(view.decr_borrow()),
                ));
            }
        }
    }

    if !items.is_empty() {
        out.comb.extend(GenFor::nest(view.ip.dims(), 0, items));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_config::RegblockConfig;
    use ferrite_ir::{
        Access, CounterProps, FieldProps, IntrKind, IntrProps, OnRead, RegMapBuilder, RegProps,
        ResetProp,
    };

    fn reset0() -> Option<ResetProp> {
        Some(ResetProp {
            value: Some(0),
            signal: None,
        })
    }

    fn one_field(props: FieldProps) -> (RegMap, Interner, DesignState) {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("ctrl", 0x0, RegProps::new(32));
        b.field("enable", props);
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        (map, interner, ds)
    }

    fn assign_texts(rtl: &StorageRtl) -> Vec<String> {
        fn flatten(item: &CombItem, out: &mut Vec<String>) {
            match item {
                CombItem::Assign(a) => out.push(a.to_string()),
                CombItem::For(g) => {
                    for i in &g.body {
                        flatten(i, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        for item in &rtl.comb {
            flatten(item, &mut out);
        }
        out
    }

    #[test]
    fn plain_field_storage_block() {
        let (map, interner, ds) = one_field({
            let mut f = FieldProps::new(0, 1);
            f.reset = reset0();
            f
        });
        let rtl = generate_storage(&map, &interner, &ds).unwrap();

        assert_eq!(
            rtl.decls,
            vec![SignalDecl::new("field_storage_ctrl_enable", 1)]
        );
        assert_eq!(rtl.seq.len(), 1);
        let text = rtl.seq[0].to_string();
        assert!(text.starts_with("always_ff @(posedge clk) begin\n"));
        assert!(text.contains("    if (rst) begin\n        field_storage_ctrl_enable <= 1'h0;\n"));
        assert!(text.contains(
            "        if (decoded_reg_strb_ctrl && cpuif_req_is_wr) begin\n            \
             field_storage_ctrl_enable <= (field_storage_ctrl_enable & ~cpuif_wr_biten[0 +: 1]) | \
             (cpuif_wr_data[0 +: 1] & cpuif_wr_biten[0 +: 1]);\n        end\n"
        ));
    }

    #[test]
    fn hw_readable_field_drives_value_output() {
        let (map, interner, ds) = one_field({
            let mut f = FieldProps::new(0, 1);
            f.reset = reset0();
            f
        });
        let rtl = generate_storage(&map, &interner, &ds).unwrap();
        assert!(assign_texts(&rtl)
            .contains(&"assign hwif_out_ctrl_enable = field_storage_ctrl_enable;".to_string()));
    }

    #[test]
    fn field_without_reset_has_no_reset_branch() {
        let (map, interner, ds) = one_field(FieldProps::new(0, 1));
        let rtl = generate_storage(&map, &interner, &ds).unwrap();
        assert!(rtl.seq[0].reset.is_none());
    }

    #[test]
    fn arrayed_register_unrolls_with_procedural_loop() {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("ch", 0x0, RegProps::new(32));
        b.dims(&[4]);
        b.field("gain", {
            let mut f = FieldProps::new(0, 8);
            f.reset = reset0();
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let rtl = generate_storage(&map, &interner, &ds).unwrap();

        assert_eq!(rtl.decls, vec![SignalDecl::new("field_storage_ch_gain", 32)]);
        let text = rtl.seq[0].to_string();
        assert!(text.contains("field_storage_ch_gain <= {4{8'h0}};"));
        assert!(text.contains("        for (int unsigned i0 = 0; i0 < 4; i0++) begin\n"));
        assert!(text.contains("            if (decoded_reg_strb_ch[i0] && cpuif_req_is_wr) begin\n"));
        assert!(text.contains("field_storage_ch_gain[i0 * 8 +: 8] <="));
    }

    #[test]
    fn counter_sums_and_event_outputs() {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("cnt", 0x0, RegProps::new(32));
        b.field("count", {
            let mut f = FieldProps::new(0, 8);
            f.sw = Access::R;
            f.reset = reset0();
            f.counter = Some(CounterProps {
                overflow: true,
                incr_threshold: Some(200),
                ..CounterProps::default()
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let rtl = generate_storage(&map, &interner, &ds).unwrap();

        assert!(rtl
            .decls
            .contains(&SignalDecl::new("field_combo_cnt_count_incr_sum", 9)));
        let assigns = assign_texts(&rtl);
        assert!(assigns.contains(
            &"assign field_combo_cnt_count_incr_sum = field_storage_cnt_count + 8'h1;".to_string()
        ));
        assert!(assigns.contains(
            &"assign hwif_out_cnt_count_overflow = hwif_in_cnt_count_incr && \
              field_combo_cnt_count_incr_sum[8];"
                .to_string()
        ));
        assert!(assigns.contains(
            &"assign hwif_out_cnt_count_incrthreshold = field_storage_cnt_count >= 8'hc8;"
                .to_string()
        ));
    }

    #[test]
    fn interrupt_register_or_reduces_gated_fields() {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("ctrl", 0x0, RegProps::new(32));
        let ien = b.field("ien", {
            let mut f = FieldProps::new(0, 4);
            f.reset = reset0();
            f
        });
        b.end();
        b.begin_register("irq", 0x4, RegProps::new(32));
        b.field("pending", {
            let mut f = FieldProps::new(0, 4);
            f.sw = Access::R;
            f.hw = Access::W;
            f.reset = reset0();
            f.intr = Some(IntrProps {
                enable: Some(ien),
                ..IntrProps::default()
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let rtl = generate_storage(&map, &interner, &ds).unwrap();

        let assigns = assign_texts(&rtl);
        assert!(assigns.contains(
            &"assign hwif_out_irq_intr = |(field_storage_irq_pending & field_storage_ctrl_ien);"
                .to_string()
        ));
        assert!(!assigns.iter().any(|a| a.contains("_halt")));
    }

    #[test]
    fn access_strobe_outputs() {
        let (map, interner, ds) = one_field({
            let mut f = FieldProps::new(0, 1);
            f.reset = reset0();
            f.onread = Some(OnRead::RClr);
            f.swacc = true;
            f.rd_swacc = true;
            f.swmod = true;
            f
        });
        let rtl = generate_storage(&map, &interner, &ds).unwrap();

        let assigns = assign_texts(&rtl);
        assert!(assigns
            .contains(&"assign hwif_out_ctrl_enable_swacc = decoded_reg_strb_ctrl;".to_string()));
        assert!(assigns.contains(
            &"assign hwif_out_ctrl_enable_rd_swacc = decoded_reg_strb_ctrl && !cpuif_req_is_wr;"
                .to_string()
        ));
        assert!(assigns.contains(
            &"assign hwif_out_ctrl_enable_swmod = (decoded_reg_strb_ctrl && cpuif_req_is_wr) || \
              (decoded_reg_strb_ctrl && !cpuif_req_is_wr);"
                .to_string()
        ));
    }

    #[test]
    fn edge_interrupt_keeps_a_delayed_copy() {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("irq", 0x0, RegProps::new(32));
        b.field("done", {
            let mut f = FieldProps::new(0, 1);
            f.sw = Access::R;
            f.hw = Access::W;
            f.reset = reset0();
            f.intr = Some(IntrProps {
                kind: IntrKind::Posedge,
                ..IntrProps::default()
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let rtl = generate_storage(&map, &interner, &ds).unwrap();

        assert!(rtl
            .decls
            .contains(&SignalDecl::new("field_storage_irq_done_next_q", 1)));
        let text = rtl.seq[0].to_string();
        assert!(text.contains("field_storage_irq_done_next_q <= hwif_in_irq_done_next;"));
        assert!(text.contains("        field_storage_irq_done_next_q <= 1'h0;\n    end else begin"));
    }

    #[test]
    fn conflicting_unconditional_writers_propagate() {
        let (map, interner, ds) = one_field({
            let mut f = FieldProps::new(0, 1);
            f.sw = Access::R;
            f.hw = Access::W;
            f.singlepulse = true;
            f
        });
        let err = generate_storage(&map, &interner, &ds).unwrap_err();
        assert!(err.to_string().contains("conflicting unconditional writers"));
    }

    #[test]
    fn external_register_has_no_storage() {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("mbox", 0x0, RegProps::new(32));
        b.external();
        b.field("data", {
            let mut f = FieldProps::new(0, 32);
            f.hw = Access::Rw;
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let rtl = generate_storage(&map, &interner, &ds).unwrap();

        assert!(rtl.decls.is_empty());
        assert!(rtl.comb.is_empty());
        assert!(rtl.seq.is_empty());
    }
}
