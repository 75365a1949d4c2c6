//! Next-state assembly for storage fields.
//!
//! Every writer of a field is collected into an ordered list of
//! [`Conditional`]s: interrupt latching, hardware set/clear, the hardware
//! write, counter steps, the software write, read side effects, and the
//! singlepulse clear. List order is update priority; the first conditional
//! whose guard holds wins and at most one may be unconditional. The
//! sequential emission in the storage pass turns the list into one
//! `if`/`else if` chain per field, so the declared `precedence` is exactly
//! the concatenation order of the software and hardware groups.

use crate::decode::{BUS_REQ_IS_WR, BUS_WR_BITEN, BUS_WR_DATA};
use crate::design::{DesignState, ResetStyle};
use crate::errors::{node_label, GenError, GenResult};
use crate::hwif::{input_name, InputKind};
use crate::path::{resolve, IndexedPath};
use crate::rtl::{RtlExpr, SeqStmt};
use ferrite_common::{width_mask, InternalError, Interner};
use ferrite_ir::{
    ControlProp, CounterProps, FieldProps, IntrKind, IntrProps, NodeId, NodeKind, OnRead, OnWrite,
    Precedence, RegMap, RegProps, Stickiness, StepProp,
};

/// The storage vector name of a field.
pub(crate) fn storage_name(path: &str) -> String {
    format!("field_storage_{path}")
}

/// The delayed next-value copy used for edge detection.
pub(crate) fn next_q_name(path: &str) -> String {
    format!("field_storage_{path}_next_q")
}

/// The widened increment sum of a counter field.
pub(crate) fn incr_sum_name(path: &str) -> String {
    format!("field_combo_{path}_incr_sum")
}

/// The widened decrement sum of a counter field.
pub(crate) fn decr_sum_name(path: &str) -> String {
    format!("field_combo_{path}_decr_sum")
}

/// One prioritized writer of a field's storage.
///
/// `guard: None` is an unconditional writer; it becomes the terminal else
/// of the priority chain. `source` names the originating property for the
/// conflict diagnostic.
#[derive(Debug, Clone)]
pub(crate) struct Conditional {
    pub guard: Option<RtlExpr>,
    pub body: Vec<SeqStmt>,
    pub source: &'static str,
}

/// The current value of a referenced signal or field, as an expression.
///
/// Storage fields read their storage vector, wire fields their (possibly
/// referenced) hardware input, constant fields their reset value. Reference
/// targets are scalar by validation, so no element addressing is needed.
pub(crate) fn value_expr(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
) -> GenResult<RtlExpr> {
    let node = map.node(id);
    match &node.kind {
        NodeKind::Signal(_) => {
            let ip = resolve(map, interner, ds.top, id)?;
            Ok(RtlExpr::var(ip.path()))
        }
        NodeKind::Field(f) => {
            let ip = resolve(map, interner, ds.top, id)?;
            if f.has_storage() {
                Ok(RtlExpr::var(storage_name(ip.path())))
            } else if f.is_wire() {
                match f.next {
                    ControlProp::Ref(target) => value_expr(map, interner, ds, target),
                    _ => Ok(RtlExpr::var(input_name(ip.path(), InputKind::Next))),
                }
            } else {
                let v = f.reset.and_then(|r| r.value).unwrap_or(0);
                Ok(RtlExpr::lit(v & width_mask(f.width), f.width))
            }
        }
        // check_ref admits only signals and fields; anything else here
        // means validation and emission have drifted apart.
        _ => Err(GenError::Internal(InternalError::new(format!(
            "reference to '{}' escaped validation",
            node_label(map, interner, id)
        )))),
    }
}

/// A constant-index slice of a flat per-element vector. The whole vector
/// of a scalar is referenced bare.
fn slice_at(base: RtlExpr, elems: u64, fw: u32, elem: u64, offset: u32, width: u32) -> RtlExpr {
    if elems == 1 && offset == 0 && width == fw {
        base
    } else {
        base.slice(
            RtlExpr::num(elem * u64::from(fw) + u64::from(offset)),
            u64::from(width),
        )
    }
}

/// One field of one register, resolved for emission.
///
/// Bundles the map, the design state, and both resolved paths so the
/// assembly helpers can address the strobe (named by the register) and the
/// storage (named by the field) with agreeing index variables.
pub(crate) struct FieldView<'a> {
    pub map: &'a RegMap,
    pub interner: &'a Interner,
    pub ds: &'a DesignState,
    pub field: NodeId,
    pub props: FieldProps,
    pub reg_props: RegProps,
    pub reg_ip: IndexedPath,
    pub ip: IndexedPath,
}

impl<'a> FieldView<'a> {
    pub fn new(
        map: &'a RegMap,
        interner: &'a Interner,
        ds: &'a DesignState,
        reg: NodeId,
        field: NodeId,
    ) -> GenResult<Self> {
        let reg_props = match map.node(reg).reg_props() {
            Some(p) => *p,
            None => {
                return Err(GenError::structural(
                    node_label(map, interner, reg),
                    "field parent is not a register",
                ))
            }
        };
        let props = match map.node(field).field_props() {
            Some(p) => *p,
            None => {
                return Err(GenError::structural(
                    node_label(map, interner, field),
                    "node is not a field",
                ))
            }
        };
        Ok(Self {
            map,
            interner,
            ds,
            field,
            props,
            reg_props,
            reg_ip: resolve(map, interner, ds.top, reg)?,
            ip: resolve(map, interner, ds.top, field)?,
        })
    }

    pub fn width(&self) -> u64 {
        u64::from(self.props.width)
    }

    /// This element's slice of the storage vector.
    pub fn cur(&self) -> RtlExpr {
        self.ip
            .element_slice(RtlExpr::var(storage_name(self.ip.path())), self.width())
    }

    /// This element's slice of the delayed next-value copy.
    pub fn next_q(&self) -> RtlExpr {
        self.ip
            .element_slice(RtlExpr::var(next_q_name(self.ip.path())), self.width())
    }

    pub fn ones(&self) -> RtlExpr {
        RtlExpr::lit(width_mask(self.props.width), self.props.width)
    }

    pub fn zeros(&self) -> RtlExpr {
        RtlExpr::lit(0, self.props.width)
    }

    /// OR reduction of a field-width expression; a single bit stands alone.
    pub fn any(&self, e: RtlExpr) -> RtlExpr {
        if self.props.width == 1 {
            e
        } else {
            e.red_or()
        }
    }

    /// The access strobe bit of the subword holding this field. Spanning
    /// fields address their subwords explicitly instead.
    pub fn strobe(&self) -> RtlExpr {
        let sub = self.props.lsb / self.reg_props.accesswidth;
        self.reg_ip.strobe_bit(self.reg_props.subwords(), sub)
    }

    /// The field's current value for readers: the storage slice, the
    /// hardware input of a wire, or the constant reset value.
    pub fn read_value(&self) -> GenResult<RtlExpr> {
        let f = &self.props;
        if f.has_storage() {
            Ok(self.cur())
        } else if f.is_wire() {
            self.next_expr()
        } else {
            let v = f.reset.and_then(|r| r.value).unwrap_or(0);
            Ok(RtlExpr::lit(v & width_mask(f.width), f.width))
        }
    }

    /// A constant-element slice of the field's readable value: `width` bits
    /// starting `offset` bits above the field's lsb, for array element
    /// `elem`. Used by fully unrolled emission.
    pub fn value_slice_at(&self, elem: u64, offset: u32, width: u32) -> GenResult<RtlExpr> {
        let f = &self.props;
        if f.has_storage() {
            Ok(slice_at(
                RtlExpr::var(storage_name(self.ip.path())),
                self.ip.total_elements(),
                f.width,
                elem,
                offset,
                width,
            ))
        } else if f.is_wire() {
            match f.next {
                ControlProp::Ref(id) => {
                    let v = value_expr(self.map, self.interner, self.ds, id)?;
                    Ok(if offset == 0 && width == f.width {
                        v
                    } else {
                        v.slice(RtlExpr::num(u64::from(offset)), u64::from(width))
                    })
                }
                _ => Ok(slice_at(
                    RtlExpr::var(input_name(self.ip.path(), InputKind::Next)),
                    self.ip.total_elements(),
                    f.width,
                    elem,
                    offset,
                    width,
                )),
            }
        } else {
            let v = f.reset.and_then(|r| r.value).unwrap_or(0);
            Ok(RtlExpr::lit((v >> offset) & width_mask(width), width))
        }
    }

    /// Strobe qualified to software reads.
    pub fn read_guard(&self) -> RtlExpr {
        self.strobe()
            .logic_and(RtlExpr::var(BUS_REQ_IS_WR).logic_not())
    }

    /// Strobe qualified to software writes, including the `swwe`/`swwel`
    /// qualifiers.
    pub fn write_guard(&self) -> GenResult<RtlExpr> {
        let mut g = self.strobe().logic_and(RtlExpr::var(BUS_REQ_IS_WR));
        if let Some(e) = self.control(self.props.swwe, InputKind::Swwe)? {
            g = g.logic_and(e);
        }
        if let Some(e) = self.control(self.props.swwel, InputKind::Swwel)? {
            g = g.logic_and(e.logic_not());
        }
        Ok(g)
    }

    /// Resolves a control property: absent, an element-indexed inferred
    /// input bit, or the referenced value.
    pub fn control(&self, prop: ControlProp, kind: InputKind) -> GenResult<Option<RtlExpr>> {
        match prop {
            ControlProp::Unset => Ok(None),
            ControlProp::Infer => Ok(Some(self.ip.element_bit(RtlExpr::var(input_name(
                self.ip.path(),
                kind,
            ))))),
            ControlProp::Ref(id) => Ok(Some(value_expr(self.map, self.interner, self.ds, id)?)),
        }
    }

    /// Resolves a counter step: a masked sized constant, an element-sliced
    /// input port, or the referenced value.
    pub fn step(&self, prop: StepProp, kind: InputKind) -> GenResult<RtlExpr> {
        match prop {
            StepProp::Fixed(v) => Ok(RtlExpr::lit(
                v & width_mask(self.props.width),
                self.props.width,
            )),
            StepProp::InputPort => Ok(self.ip.element_slice(
                RtlExpr::var(input_name(self.ip.path(), kind)),
                self.width(),
            )),
            StepProp::Ref(id) => value_expr(self.map, self.interner, self.ds, id),
        }
    }

    /// The hardware next value: the inferred input port unless a reference
    /// replaces it.
    pub fn next_expr(&self) -> GenResult<RtlExpr> {
        match self.props.next {
            ControlProp::Ref(id) => value_expr(self.map, self.interner, self.ds, id),
            _ => Ok(self.ip.element_slice(
                RtlExpr::var(input_name(self.ip.path(), InputKind::Next)),
                self.width(),
            )),
        }
    }

    /// Edge-detected interrupts keep a delayed copy of `next`.
    pub fn needs_next_delay(&self) -> bool {
        matches!(
            self.props.intr,
            Some(IntrProps {
                kind: IntrKind::Posedge | IntrKind::Negedge | IntrKind::Bothedge,
                ..
            })
        )
    }

    /// Resolves the field's reset to a style and a masked value. A reset
    /// signal overrides the design default style.
    pub fn resolve_reset(&self) -> GenResult<Option<(ResetStyle, u64)>> {
        let Some(r) = self.props.reset else {
            return Ok(None);
        };
        let Some(v) = r.value else {
            return Ok(None);
        };
        let style = match r.signal {
            Some(sig) => {
                let sp = match &self.map.node(sig).kind {
                    NodeKind::Signal(s) => *s,
                    _ => {
                        return Err(GenError::structural(
                            node_label(self.map, self.interner, self.field),
                            "the reset reference is not a signal",
                        ))
                    }
                };
                let sig_ip = resolve(self.map, self.interner, self.ds.top, sig)?;
                ResetStyle {
                    signal: sig_ip.path().to_string(),
                    active_low: sp.active_low,
                    is_async: sp.is_async,
                }
            }
            None => self.ds.default_reset.clone(),
        };
        Ok(Some((style, v & width_mask(self.props.width))))
    }

    /// Assembles the full writer list in priority order and rejects
    /// conflicting unconditional writers.
    pub fn assemble(&self) -> GenResult<Vec<Conditional>> {
        let mut hw = Vec::new();
        if let Some(i) = self.props.intr {
            hw.push(self.intr_conditional(i)?);
        }
        if let Some(e) = self.control(self.props.hwset, InputKind::Hwset)? {
            hw.push(Conditional {
                guard: Some(e),
                body: vec![SeqStmt::assign(self.cur(), self.ones())],
                source: "hwset",
            });
        }
        if let Some(e) = self.control(self.props.hwclr, InputKind::Hwclr)? {
            hw.push(Conditional {
                guard: Some(e),
                body: vec![SeqStmt::assign(self.cur(), self.zeros())],
                source: "hwclr",
            });
        }
        if self.props.hw.is_writable() && self.props.intr.is_none() {
            hw.push(self.hw_write_conditional()?);
        }
        if let Some(c) = self.props.counter {
            self.counter_conditionals(c, &mut hw)?;
        }

        let mut sw = Vec::new();
        if self.props.sw.is_writable() {
            self.sw_write_conditionals(&mut sw)?;
        }
        if let Some(onread) = self.props.onread {
            let value = match onread {
                OnRead::RClr => self.zeros(),
                OnRead::RSet => self.ones(),
            };
            sw.push(Conditional {
                guard: Some(self.read_guard()),
                body: vec![SeqStmt::assign(self.cur(), value)],
                source: "onread",
            });
        }

        let mut all = match self.props.precedence {
            Precedence::Sw => {
                sw.extend(hw);
                sw
            }
            Precedence::Hw => {
                hw.extend(sw);
                hw
            }
        };
        if self.props.singlepulse {
            all.push(Conditional {
                guard: None,
                body: vec![SeqStmt::assign(self.cur(), self.zeros())],
                source: "singlepulse",
            });
        }

        let unconditional: Vec<&'static str> = all
            .iter()
            .filter(|c| c.guard.is_none())
            .map(|c| c.source)
            .collect();
        if unconditional.len() > 1 {
            return Err(GenError::structural(
                node_label(self.map, self.interner, self.field),
                format!(
                    "conflicting unconditional writers: {} and {}",
                    unconditional[0], unconditional[1]
                ),
            ));
        }
        Ok(all)
    }

    fn intr_conditional(&self, i: IntrProps) -> GenResult<Conditional> {
        let next = self.next_expr()?;
        let set = self.set_condition(i.kind, &next);
        Ok(match i.sticky {
            Stickiness::StickyBit => Conditional {
                guard: Some(self.any(set.clone())),
                body: vec![SeqStmt::assign(self.cur(), self.cur().bit_or(set))],
                source: "intr",
            },
            Stickiness::Sticky => Conditional {
                guard: Some(self.cur().equals(self.zeros()).logic_and(self.any(set))),
                body: vec![SeqStmt::assign(self.cur(), next)],
                source: "intr",
            },
            Stickiness::NonSticky => Conditional {
                guard: None,
                body: vec![SeqStmt::assign(self.cur(), set)],
                source: "intr",
            },
        })
    }

    /// The per-bit set condition of an interrupt field.
    fn set_condition(&self, kind: IntrKind, next: &RtlExpr) -> RtlExpr {
        match kind {
            IntrKind::Level => next.clone(),
            IntrKind::Posedge => next.clone().bit_and(self.next_q().not()),
            IntrKind::Negedge => next.clone().not().bit_and(self.next_q()),
            IntrKind::Bothedge => next.clone().bit_xor(self.next_q()),
        }
    }

    fn hw_write_conditional(&self) -> GenResult<Conditional> {
        let value = self.next_expr()?;
        let we = self.control(self.props.we, InputKind::We)?;
        let wel = self.control(self.props.wel, InputKind::Wel)?;
        let guard = match (we, wel) {
            (Some(e), _) => Some(e),
            (None, Some(e)) => Some(e.logic_not()),
            (None, None) => None,
        };
        Ok(Conditional {
            guard,
            body: vec![SeqStmt::assign(self.cur(), value)],
            source: "hw write",
        })
    }

    /// Counter writers: simultaneous increment and decrement apply the net
    /// step without saturation, then each direction alone with optional
    /// clamping against the widened sum's carry or borrow bit.
    fn counter_conditionals(&self, c: CounterProps, out: &mut Vec<Conditional>) -> GenResult<()> {
        let incr = self.control(c.incr, InputKind::Incr)?;
        let decr = self.control(c.decr, InputKind::Decr)?;

        if let (Some(ie), Some(de)) = (&incr, &decr) {
            let up = self.step(c.incr_value, InputKind::Incrvalue)?;
            let dn = self.step(c.decr_value, InputKind::Decrvalue)?;
            out.push(Conditional {
                guard: Some(ie.clone().logic_and(de.clone())),
                body: vec![SeqStmt::assign(self.cur(), self.cur().add(up).sub(dn))],
                source: "counter",
            });
        }
        if let Some(ie) = incr {
            let value = if c.incr_saturate {
                RtlExpr::ternary(self.incr_carry(), self.ones(), self.incr_sum_value())
            } else {
                self.incr_sum_value()
            };
            out.push(Conditional {
                guard: Some(ie),
                body: vec![SeqStmt::assign(self.cur(), value)],
                source: "counter",
            });
        }
        if let Some(de) = decr {
            let value = if c.decr_saturate {
                RtlExpr::ternary(self.decr_borrow(), self.zeros(), self.decr_sum_value())
            } else {
                self.decr_sum_value()
            };
            out.push(Conditional {
                guard: Some(de),
                body: vec![SeqStmt::assign(self.cur(), value)],
                source: "counter",
            });
        }
        Ok(())
    }

    fn sw_write_conditionals(&self, out: &mut Vec<Conditional>) -> GenResult<()> {
        let f = &self.props;
        let aw = self.reg_props.accesswidth;
        if f.lsb / aw == f.msb() / aw {
            let bus_lsb = u64::from(f.lsb % aw);
            let w = self.width();
            let d = RtlExpr::var(BUS_WR_DATA).slice(RtlExpr::num(bus_lsb), w);
            let be = RtlExpr::var(BUS_WR_BITEN).slice(RtlExpr::num(bus_lsb), w);
            out.push(Conditional {
                guard: Some(self.write_guard()?),
                body: vec![SeqStmt::assign(
                    self.cur(),
                    shaped_write(f.onwrite, self.cur(), d, be),
                )],
                source: "sw write",
            });
            return Ok(());
        }

        // A field spanning access subwords takes one plain masked write per
        // subword; shaped writes on spanning fields are rejected up front.
        for sub in (f.lsb / aw)..=(f.msb() / aw) {
            let lo = f.lsb.max(sub * aw);
            let hi = f.msb().min((sub + 1) * aw - 1);
            let ov_w = u64::from(hi - lo + 1);
            let bus_lsb = u64::from(lo - sub * aw);
            let target = self.partial_slice(u64::from(lo - f.lsb), ov_w);
            let d = RtlExpr::var(BUS_WR_DATA).slice(RtlExpr::num(bus_lsb), ov_w);
            let be = RtlExpr::var(BUS_WR_BITEN).slice(RtlExpr::num(bus_lsb), ov_w);
            let value = target
                .clone()
                .bit_and(be.clone().not())
                .bit_or(d.bit_and(be));
            out.push(Conditional {
                guard: Some(
                    self.reg_ip
                        .strobe_bit(self.reg_props.subwords(), sub)
                        .logic_and(RtlExpr::var(BUS_REQ_IS_WR)),
                ),
                body: vec![SeqStmt::assign(target, value)],
                source: "sw write",
            });
        }
        Ok(())
    }

    /// A sub-range of this element's storage slice, `offset` bits above the
    /// element base.
    fn partial_slice(&self, offset: u64, slice_w: u64) -> RtlExpr {
        let base = RtlExpr::var(storage_name(self.ip.path()));
        if !self.ip.is_array() {
            return base.slice(RtlExpr::num(offset), slice_w);
        }
        let elem = self
            .ip
            .element_index_expr()
            .mul(RtlExpr::num(self.width()));
        let lsb = if offset == 0 {
            elem
        } else {
            elem.add(RtlExpr::num(offset))
        };
        base.slice(lsb, slice_w)
    }

    /// This element's full widened sum slice, the assignment target of the
    /// combinational sum.
    pub fn sum_slice(&self, name: String) -> RtlExpr {
        let w1 = self.width() + 1;
        let base = RtlExpr::var(name);
        if !self.ip.is_array() {
            base
        } else {
            base.slice(self.ip.element_index_expr().mul(RtlExpr::num(w1)), w1)
        }
    }

    fn sum_bits(&self, name: String) -> RtlExpr {
        let w = self.width();
        let base = RtlExpr::var(name);
        if !self.ip.is_array() {
            base.slice(RtlExpr::num(0), w)
        } else {
            base.slice(self.ip.element_index_expr().mul(RtlExpr::num(w + 1)), w)
        }
    }

    fn sum_carry(&self, name: String) -> RtlExpr {
        let w = self.width();
        let base = RtlExpr::var(name);
        if !self.ip.is_array() {
            base.index(RtlExpr::num(w))
        } else {
            base.index(
                self.ip
                    .element_index_expr()
                    .mul(RtlExpr::num(w + 1))
                    .add(RtlExpr::num(w)),
            )
        }
    }

    /// The truncated increment result.
    pub fn incr_sum_value(&self) -> RtlExpr {
        self.sum_bits(incr_sum_name(self.ip.path()))
    }

    /// The increment carry-out bit.
    pub fn incr_carry(&self) -> RtlExpr {
        self.sum_carry(incr_sum_name(self.ip.path()))
    }

    /// The truncated decrement result.
    pub fn decr_sum_value(&self) -> RtlExpr {
        self.sum_bits(decr_sum_name(self.ip.path()))
    }

    /// The decrement borrow bit.
    pub fn decr_borrow(&self) -> RtlExpr {
        self.sum_carry(decr_sum_name(self.ip.path()))
    }
}

/// The software write value under bit enables.
fn shaped_write(onwrite: Option<OnWrite>, cur: RtlExpr, d: RtlExpr, be: RtlExpr) -> RtlExpr {
    match onwrite {
        None => cur.bit_and(be.clone().not()).bit_or(d.bit_and(be)),
        Some(OnWrite::Woset) => cur.bit_or(d.bit_and(be)),
        Some(OnWrite::Woclr) => cur.bit_and(d.bit_and(be).not()),
        Some(OnWrite::Wot) => cur.bit_xor(d.bit_and(be)),
        Some(OnWrite::Wzs) => cur.bit_or(d.not().bit_and(be)),
        Some(OnWrite::Wzc) => cur.bit_and(d.bit_or(be.not())),
        Some(OnWrite::Wzt) => cur.bit_xor(d.not().bit_and(be)),
        Some(OnWrite::Wclr) => cur.bit_and(be.not()),
        Some(OnWrite::Wset) => cur.bit_or(be),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_config::RegblockConfig;
    use ferrite_ir::{Access, RegMapBuilder, ResetProp, SignalProps};

    fn guard_text(c: &Conditional) -> String {
        c.guard
            .as_ref()
            .map(|g| format!("{g}"))
            .unwrap_or_default()
    }

    fn body_text(c: &Conditional) -> String {
        c.body
            .iter()
            .map(|s| format!("{s}"))
            .collect::<Vec<_>>()
            .join("")
    }

    #[test]
    fn plain_rw_write() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("ctrl", 0x0, RegProps::new(32));
        let f = b.field("enable", FieldProps::new(0, 1));
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(conds.len(), 1);
        assert_eq!(conds[0].source, "sw write");
        assert_eq!(
            guard_text(&conds[0]),
            "decoded_reg_strb_ctrl && cpuif_req_is_wr"
        );
        assert_eq!(
            body_text(&conds[0]),
            "field_storage_ctrl_enable <= (field_storage_ctrl_enable & \
             ~cpuif_wr_biten[0 +: 1]) | (cpuif_wr_data[0 +: 1] & cpuif_wr_biten[0 +: 1]);\n"
        );
    }

    #[test]
    fn woclr_shaping() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("irq", 0x0, RegProps::new(32));
        let f = b.field("sticky", {
            let mut f = FieldProps::new(4, 4);
            f.onwrite = Some(OnWrite::Woclr);
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(
            body_text(&conds[0]),
            "field_storage_irq_sticky <= field_storage_irq_sticky & \
             ~(cpuif_wr_data[4 +: 4] & cpuif_wr_biten[4 +: 4]);\n"
        );
    }

    #[test]
    fn onread_clear_is_read_qualified() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("evt", 0x0, RegProps::new(32));
        let f = b.field("latch", {
            let mut f = FieldProps::new(0, 4);
            f.sw = Access::R;
            f.onread = Some(OnRead::RClr);
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(conds.len(), 1);
        assert_eq!(conds[0].source, "onread");
        assert_eq!(
            guard_text(&conds[0]),
            "decoded_reg_strb_evt && !cpuif_req_is_wr"
        );
        assert_eq!(
            body_text(&conds[0]),
            "field_storage_evt_latch <= 4'h0;\n"
        );
    }

    #[test]
    fn swwe_qualifies_the_write() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("ctrl", 0x0, RegProps::new(32));
        let f = b.field("key", {
            let mut f = FieldProps::new(0, 8);
            f.swwe = ControlProp::Infer;
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(
            guard_text(&conds[0]),
            "decoded_reg_strb_ctrl && cpuif_req_is_wr && hwif_in_ctrl_key_swwe"
        );
    }

    #[test]
    fn saturating_counter() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("cnt", 0x0, RegProps::new(32));
        let f = b.field("count", {
            let mut f = FieldProps::new(0, 8);
            f.sw = Access::R;
            f.counter = Some(CounterProps {
                incr_saturate: true,
                ..CounterProps::default()
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(conds.len(), 1);
        assert_eq!(guard_text(&conds[0]), "hwif_in_cnt_count_incr");
        assert_eq!(
            body_text(&conds[0]),
            "field_storage_cnt_count <= field_combo_cnt_count_incr_sum[8] ? 8'hff : \
             field_combo_cnt_count_incr_sum[0 +: 8];\n"
        );
    }

    #[test]
    fn up_down_counter_nets_simultaneous_steps() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("cnt", 0x0, RegProps::new(32));
        let f = b.field("level", {
            let mut f = FieldProps::new(0, 8);
            f.sw = Access::R;
            f.counter = Some(CounterProps {
                decr: ControlProp::Infer,
                ..CounterProps::default()
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(conds.len(), 3);
        assert_eq!(
            guard_text(&conds[0]),
            "hwif_in_cnt_level_incr && hwif_in_cnt_level_decr"
        );
        assert_eq!(
            body_text(&conds[0]),
            "field_storage_cnt_level <= (field_storage_cnt_level + 8'h1) - 8'h1;\n"
        );
        assert_eq!(guard_text(&conds[1]), "hwif_in_cnt_level_incr");
        assert_eq!(guard_text(&conds[2]), "hwif_in_cnt_level_decr");
    }

    #[test]
    fn fixed_step_masked_to_width() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("cnt", 0x0, RegProps::new(32));
        let f = b.field("level", {
            let mut f = FieldProps::new(0, 8);
            f.sw = Access::R;
            f.counter = Some(CounterProps {
                decr: ControlProp::Infer,
                incr_value: StepProp::Fixed(0x1FF),
                ..CounterProps::default()
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(
            body_text(&conds[0]),
            "field_storage_cnt_level <= (field_storage_cnt_level + 8'hff) - 8'h1;\n"
        );
    }

    #[test]
    fn posedge_stickybit_interrupt() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("irq", 0x0, RegProps::new(32));
        let f = b.field("pending", {
            let mut f = FieldProps::new(0, 2);
            f.hw = Access::W;
            f.onwrite = Some(OnWrite::Woclr);
            f.intr = Some(IntrProps {
                kind: IntrKind::Posedge,
                ..IntrProps::default()
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        assert!(view.needs_next_delay());
        let conds = view.assemble().unwrap();
        // Software clear first by default precedence, then the latch.
        assert_eq!(conds[0].source, "sw write");
        assert_eq!(conds[1].source, "intr");
        assert_eq!(
            guard_text(&conds[1]),
            "|(hwif_in_irq_pending_next & ~field_storage_irq_pending_next_q)"
        );
        assert_eq!(
            body_text(&conds[1]),
            "field_storage_irq_pending <= field_storage_irq_pending | \
             (hwif_in_irq_pending_next & ~field_storage_irq_pending_next_q);\n"
        );
    }

    #[test]
    fn nonsticky_interrupt_is_unconditional() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("irq", 0x0, RegProps::new(32));
        let f = b.field("live", {
            let mut f = FieldProps::new(0, 1);
            f.sw = Access::R;
            f.hw = Access::W;
            f.intr = Some(IntrProps {
                sticky: Stickiness::NonSticky,
                ..IntrProps::default()
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(conds.len(), 1);
        assert!(conds[0].guard.is_none());
        assert_eq!(
            body_text(&conds[0]),
            "field_storage_irq_live <= hwif_in_irq_live_next;\n"
        );
    }

    #[test]
    fn two_unconditional_writers_conflict() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("pulse", 0x0, RegProps::new(32));
        let f = b.field("go", {
            let mut f = FieldProps::new(0, 1);
            f.hw = Access::W;
            f.singlepulse = true;
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let err = view.assemble().unwrap_err();
        let msg = format!("{err}");
        assert!(matches!(err, GenError::Structural { .. }));
        assert!(msg.contains("hw write"), "{msg}");
        assert!(msg.contains("singlepulse"), "{msg}");
    }

    #[test]
    fn hw_precedence_reorders_groups() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("ctrl", 0x0, RegProps::new(32));
        let f = b.field("state", {
            let mut f = FieldProps::new(0, 4);
            f.hw = Access::W;
            f.we = ControlProp::Infer;
            f.precedence = Precedence::Hw;
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(conds[0].source, "hw write");
        assert_eq!(conds[1].source, "sw write");
        assert_eq!(guard_text(&conds[0]), "hwif_in_ctrl_state_we");
    }

    #[test]
    fn singlepulse_clear_is_last() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("cmd", 0x0, RegProps::new(32));
        let f = b.field("kick", {
            let mut f = FieldProps::new(0, 1);
            f.singlepulse = true;
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(conds.len(), 2);
        assert_eq!(conds[1].source, "singlepulse");
        assert!(conds[1].guard.is_none());
        assert_eq!(body_text(&conds[1]), "field_storage_cmd_kick <= 1'h0;\n");
    }

    #[test]
    fn spanning_field_writes_per_subword() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register(
            "wide",
            0x0,
            RegProps {
                regwidth: 64,
                accesswidth: 32,
            },
        );
        let f = b.field("data", FieldProps::new(16, 32));
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(conds.len(), 2);
        assert_eq!(
            guard_text(&conds[0]),
            "decoded_reg_strb_wide[0] && cpuif_req_is_wr"
        );
        assert_eq!(
            body_text(&conds[0]),
            "field_storage_wide_data[0 +: 16] <= (field_storage_wide_data[0 +: 16] & \
             ~cpuif_wr_biten[16 +: 16]) | (cpuif_wr_data[16 +: 16] & cpuif_wr_biten[16 +: 16]);\n"
        );
        assert_eq!(
            guard_text(&conds[1]),
            "decoded_reg_strb_wide[1] && cpuif_req_is_wr"
        );
        assert_eq!(
            body_text(&conds[1]),
            "field_storage_wide_data[16 +: 16] <= (field_storage_wide_data[16 +: 16] & \
             ~cpuif_wr_biten[0 +: 16]) | (cpuif_wr_data[0 +: 16] & cpuif_wr_biten[0 +: 16]);\n"
        );
    }

    #[test]
    fn reset_signal_overrides_default_style() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let soft = b.signal("soft_rst_n", {
            let mut s = SignalProps::new(1);
            s.active_low = true;
            s.is_async = true;
            s
        });
        let reg = b.begin_register("ctrl", 0x0, RegProps::new(32));
        let f = b.field("mode", {
            let mut f = FieldProps::new(0, 4);
            f.reset = Some(ResetProp {
                value: Some(0x3),
                signal: Some(soft),
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let (style, value) = view.resolve_reset().unwrap().unwrap();
        assert_eq!(style.signal, "soft_rst_n");
        assert!(style.active_low);
        assert!(style.is_async);
        assert_eq!(value, 0x3);
    }

    #[test]
    fn reset_value_masked_to_width() {
        let mut b = RegMapBuilder::new("top", 0x100);
        let reg = b.begin_register("ctrl", 0x0, RegProps::new(32));
        let f = b.field("mode", {
            let mut f = FieldProps::new(0, 4);
            f.reset = Some(ResetProp {
                value: Some(0xFF),
                signal: None,
            });
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let (style, value) = view.resolve_reset().unwrap().unwrap();
        assert_eq!(style.signal, "rst");
        assert_eq!(value, 0xF);
    }

    #[test]
    fn referenced_wire_field_resolves_through() {
        let mut b = RegMapBuilder::new("top", 0x100);
        b.begin_register("status", 0x0, RegProps::new(32));
        let busy = b.field("busy", {
            let mut f = FieldProps::new(0, 1);
            f.sw = Access::R;
            f.hw = Access::W;
            f
        });
        b.end();
        let reg = b.begin_register("ctrl", 0x4, RegProps::new(32));
        let f = b.field("arm", {
            let mut f = FieldProps::new(0, 1);
            f.swwe = ControlProp::Ref(busy);
            f
        });
        b.end();
        let (map, interner) = b.finish();
        let ds = DesignState::new(&map, &interner, &RegblockConfig::default()).unwrap();
        let view = FieldView::new(&map, &interner, &ds, reg, f).unwrap();
        let conds = view.assemble().unwrap();
        assert_eq!(
            guard_text(&conds[0]),
            "decoded_reg_strb_ctrl && cpuif_req_is_wr && hwif_in_status_busy_next"
        );
    }
}
