//! Per-run generation state and input validation.
//!
//! [`DesignState`] is built once from the configuration and the map, then
//! passed by shared reference through every pass. Construction runs the
//! structural and supported-configuration checks, so the passes themselves
//! assume a valid tree and treat violations they stumble on as generator
//! defects.

use crate::errors::{node_label, GenError, GenResult};
use ferrite_common::{clog2, Interner};
use ferrite_config::RegblockConfig;
use ferrite_ir::{ControlProp, FieldProps, NodeId, NodeKind, RegMap, StepProp};
use serde::{Deserialize, Serialize};

/// Naming and polarity of one reset domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetStyle {
    /// The reset signal name as it appears in generated text.
    pub signal: String,
    /// The reset asserts low.
    pub active_low: bool,
    /// The reset is asynchronous.
    pub is_async: bool,
}

/// Everything the generation passes need besides the tree itself.
///
/// Immutable once constructed; all passes take `(&RegMap, &Interner,
/// &DesignState)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignState {
    /// The address map the generated block implements.
    pub top: NodeId,
    /// Bus data width in bits.
    pub access_width: u32,
    /// Bus address width in bits.
    pub addr_width: u32,
    /// Clock input name.
    pub clock: String,
    /// Reset style for storage without a per-field reset signal.
    pub default_reset: ResetStyle,
    /// Insert one register stage on outgoing external register requests.
    pub retime_external_reg: bool,
    /// Insert one register stage on outgoing external memory requests.
    pub retime_external_mem: bool,
}

impl DesignState {
    /// Validates the map against the configuration and captures the
    /// generation parameters.
    ///
    /// The address width defaults to the smallest width spanning the top
    /// address map and may only be widened by configuration.
    pub fn new(map: &RegMap, interner: &Interner, config: &RegblockConfig) -> GenResult<Self> {
        validate(map, interner, config.cpuif.data_width)?;

        let total = map.node(map.top).total_size();
        let needed = clog2(total).max(1);
        let addr_width = config.cpuif.addr_width.unwrap_or(needed);
        if addr_width < needed {
            return Err(GenError::structural(
                node_label(map, interner, map.top),
                format!("address width {addr_width} cannot span {total} bytes"),
            ));
        }

        Ok(Self {
            top: map.top,
            access_width: config.cpuif.data_width,
            addr_width,
            clock: config.clocking.clock.clone(),
            default_reset: ResetStyle {
                signal: config.clocking.reset.clone(),
                active_low: config.clocking.reset_active_low,
                is_async: config.clocking.reset_async,
            },
            retime_external_reg: config.external.retime_reg,
            retime_external_mem: config.external.retime_mem,
        })
    }
}

fn has_sw_side_effects(f: &FieldProps) -> bool {
    f.onread.is_some()
        || f.onwrite.is_some()
        || f.swacc
        || f.rd_swacc
        || f.wr_swacc
        || f.swmod
        || f.swwe.is_set()
        || f.swwel.is_set()
}

/// Checks a control-property reference: the target must be a signal or a
/// field, and must not live inside an array (one reference cannot name a
/// per-element value).
fn check_ref(
    map: &RegMap,
    interner: &Interner,
    owner: NodeId,
    target: NodeId,
    what: &str,
) -> GenResult<()> {
    let t = map.node(target);
    if !t.is_signal() && !t.is_field() {
        return Err(GenError::structural(
            node_label(map, interner, owner),
            format!("'{what}' references a node that is neither a signal nor a field"),
        ));
    }
    let mut cur = Some(target);
    while let Some(id) = cur {
        if !map.node(id).dims.is_empty() {
            return Err(GenError::structural(
                node_label(map, interner, owner),
                format!("'{what}' references a node inside an array"),
            ));
        }
        cur = map.parent(id);
    }
    Ok(())
}

fn check_field(map: &RegMap, interner: &Interner, id: NodeId, f: &FieldProps) -> GenResult<()> {
    if f.width > 64 {
        return Err(GenError::unsupported(
            node_label(map, interner, id),
            format!("field width {} exceeds 64 bits", f.width),
        ));
    }

    if f.we.is_set() && f.wel.is_set() {
        return Err(GenError::structural(
            node_label(map, interner, id),
            "'we' and 'wel' are mutually exclusive",
        ));
    }
    if f.swwe.is_set() && f.swwel.is_set() {
        return Err(GenError::structural(
            node_label(map, interner, id),
            "'swwe' and 'swwel' are mutually exclusive",
        ));
    }

    if let Some(reset) = f.reset {
        if let Some(sig) = reset.signal {
            if reset.value.is_none() {
                return Err(GenError::structural(
                    node_label(map, interner, id),
                    "a reset signal requires a reset value",
                ));
            }
            if !map.node(sig).is_signal() {
                return Err(GenError::structural(
                    node_label(map, interner, id),
                    "the reset reference is not a signal",
                ));
            }
            check_ref(map, interner, id, sig, "resetsignal")?;
        }
    }

    let controls = [
        (f.next, "next"),
        (f.we, "we"),
        (f.wel, "wel"),
        (f.swwe, "swwe"),
        (f.swwel, "swwel"),
        (f.hwclr, "hwclr"),
        (f.hwset, "hwset"),
    ];
    for (prop, what) in controls {
        if let ControlProp::Ref(target) = prop {
            check_ref(map, interner, id, target, what)?;
        }
    }

    if let Some(c) = f.counter {
        for (prop, what) in [(c.incr, "incr"), (c.decr, "decr")] {
            if let ControlProp::Ref(target) = prop {
                check_ref(map, interner, id, target, what)?;
            }
        }
        for (step, what) in [(c.incr_value, "incrvalue"), (c.decr_value, "decrvalue")] {
            if let StepProp::Ref(target) = step {
                check_ref(map, interner, id, target, what)?;
            }
        }
    }

    if let Some(i) = f.intr {
        let gates = [
            (i.enable, "enable"),
            (i.mask, "mask"),
            (i.haltenable, "haltenable"),
            (i.haltmask, "haltmask"),
        ];
        for (gate, what) in gates {
            if let Some(target) = gate {
                check_ref(map, interner, id, target, what)?;
            }
        }
    }

    Ok(())
}

fn validate(map: &RegMap, interner: &Interner, bus_width: u32) -> GenResult<()> {
    for id in map.descendants(map.top) {
        let node = map.node(id);
        // Range predicates compute `base + total_size - 1`.
        if node.is_addressable() && node.total_size() == 0 {
            return Err(GenError::structural(
                node_label(map, interner, id),
                "addressable nodes must span at least one byte",
            ));
        }
        match &node.kind {
            NodeKind::Memory(m) => {
                if !node.external {
                    return Err(GenError::structural(
                        node_label(map, interner, id),
                        "memories must be external",
                    ));
                }
                if node.children.iter().any(|&c| map.node(c).is_register()) {
                    return Err(GenError::unsupported(
                        node_label(map, interner, id),
                        "memory virtual registers are not supported",
                    ));
                }
                if !node.children.is_empty() {
                    return Err(GenError::structural(
                        node_label(map, interner, id),
                        "memory nodes take no children",
                    ));
                }
                if m.entry_width != bus_width {
                    return Err(GenError::unsupported(
                        node_label(map, interner, id),
                        format!(
                            "memory entry width {} does not match the {bus_width}-bit bus",
                            m.entry_width
                        ),
                    ));
                }
            }
            NodeKind::Register(r) => {
                if !r.regwidth.is_power_of_two() || r.regwidth < 8 {
                    return Err(GenError::unsupported(
                        node_label(map, interner, id),
                        format!("register width {} is not a power of two of at least 8", r.regwidth),
                    ));
                }
                if !r.accesswidth.is_power_of_two() || r.accesswidth > r.regwidth {
                    return Err(GenError::unsupported(
                        node_label(map, interner, id),
                        format!(
                            "access width {} is not a power of two no wider than the register",
                            r.accesswidth
                        ),
                    ));
                }
                if r.accesswidth != r.regwidth.min(bus_width) {
                    return Err(GenError::unsupported(
                        node_label(map, interner, id),
                        format!(
                            "access width {} does not match the {bus_width}-bit bus",
                            r.accesswidth
                        ),
                    ));
                }
                if r.subwords() > 1 {
                    for fid in map.fields_of(id) {
                        let Some(f) = map.node(fid).field_props() else {
                            continue;
                        };
                        if f.lsb / r.accesswidth != f.msb() / r.accesswidth
                            && has_sw_side_effects(f)
                        {
                            return Err(GenError::unsupported(
                                node_label(map, interner, fid),
                                "software side effects on a field spanning access subwords",
                            ));
                        }
                    }
                }
            }
            NodeKind::Field(f) => check_field(map, interner, id, f)?,
            NodeKind::AddrMap | NodeKind::RegFile | NodeKind::Signal(_) => {}
        }
    }
    Ok(())
}
