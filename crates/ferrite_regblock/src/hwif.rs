//! Hardware-interface port derivation.
//!
//! Every port at the hardware boundary is named here and nowhere else: the
//! property-implied field ports, the external request/response ports, and
//! the plain signal inputs. The port sets are closed enums, so a port for a
//! property a field does not carry cannot be requested, and the storage,
//! external, and read-back passes embed the same names this pass declares
//! without consulting the port list.

use crate::design::DesignState;
use crate::errors::GenResult;
use crate::path::resolve;
use crate::rtl::Port;
use ferrite_common::{clog2, Interner};
use ferrite_ir::{ControlProp, FieldProps, Node, NodeId, NodeKind, RegMap, RegProps, StepProp};

/// Property-implied hardware-interface inputs of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// The hardware next value.
    Next,
    /// Active-high hardware write enable.
    We,
    /// Active-low hardware write enable.
    Wel,
    /// Active-high software write qualifier.
    Swwe,
    /// Active-low software write qualifier.
    Swwel,
    /// Hardware clear request.
    Hwclr,
    /// Hardware set request.
    Hwset,
    /// Counter increment event.
    Incr,
    /// Counter decrement event.
    Decr,
    /// Counter increment step value.
    Incrvalue,
    /// Counter decrement step value.
    Decrvalue,
}

impl InputKind {
    fn suffix(self) -> &'static str {
        match self {
            InputKind::Next => "_next",
            InputKind::We => "_we",
            InputKind::Wel => "_wel",
            InputKind::Swwe => "_swwe",
            InputKind::Swwel => "_swwel",
            InputKind::Hwclr => "_hwclr",
            InputKind::Hwset => "_hwset",
            InputKind::Incr => "_incr",
            InputKind::Decr => "_decr",
            InputKind::Incrvalue => "_incrvalue",
            InputKind::Decrvalue => "_decrvalue",
        }
    }
}

/// Property-implied hardware-interface outputs of a field or register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// AND reduction of the stored value.
    Anded,
    /// OR reduction of the stored value.
    Ored,
    /// XOR reduction of the stored value.
    Xored,
    /// Software accessed the field this cycle.
    Swacc,
    /// Software read the field this cycle.
    RdSwacc,
    /// Software wrote the field this cycle.
    WrSwacc,
    /// Software modified the field this cycle.
    Swmod,
    /// The counter is at or past its increment threshold.
    Incrthreshold,
    /// The counter is at or past its decrement threshold.
    Decrthreshold,
    /// The counter increment carried out this cycle.
    Overflow,
    /// The counter decrement borrowed this cycle.
    Underflow,
    /// Register level: any gated interrupt field bit is set.
    Intr,
    /// Register level: any halt-gated interrupt field bit is set.
    Halt,
}

impl OutputKind {
    fn suffix(self) -> &'static str {
        match self {
            OutputKind::Anded => "_anded",
            OutputKind::Ored => "_ored",
            OutputKind::Xored => "_xored",
            OutputKind::Swacc => "_swacc",
            OutputKind::RdSwacc => "_rd_swacc",
            OutputKind::WrSwacc => "_wr_swacc",
            OutputKind::Swmod => "_swmod",
            OutputKind::Incrthreshold => "_incrthreshold",
            OutputKind::Decrthreshold => "_decrthreshold",
            OutputKind::Overflow => "_overflow",
            OutputKind::Underflow => "_underflow",
            OutputKind::Intr => "_intr",
            OutputKind::Halt => "_halt",
        }
    }
}

/// Request-side ports of an external register, block, or memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtOutKind {
    /// Access request strobe.
    Req,
    /// Element-relative byte address (blocks and memories only).
    Addr,
    /// The access is a write.
    ReqIsWr,
    /// Write data.
    WrData,
    /// Write bit enables.
    WrBiten,
}

impl ExtOutKind {
    fn suffix(self) -> &'static str {
        match self {
            ExtOutKind::Req => "_req",
            ExtOutKind::Addr => "_addr",
            ExtOutKind::ReqIsWr => "_req_is_wr",
            ExtOutKind::WrData => "_wr_data",
            ExtOutKind::WrBiten => "_wr_biten",
        }
    }
}

/// Response-side ports of an external register, block, or memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtInKind {
    /// Read data.
    RdData,
    /// Read completion.
    RdAck,
    /// Write completion.
    WrAck,
    /// Read error, asserted with `rd_ack`.
    RdErr,
    /// Write error, asserted with `wr_ack`.
    WrErr,
}

impl ExtInKind {
    fn suffix(self) -> &'static str {
        match self {
            ExtInKind::RdData => "_rd_data",
            ExtInKind::RdAck => "_rd_ack",
            ExtInKind::WrAck => "_wr_ack",
            ExtInKind::RdErr => "_rd_err",
            ExtInKind::WrErr => "_wr_err",
        }
    }
}

/// The inferred input port name for a field property.
pub fn input_name(path: &str, kind: InputKind) -> String {
    format!("hwif_in_{path}{}", kind.suffix())
}

/// The implied output port name for a field or register property.
pub fn output_name(path: &str, kind: OutputKind) -> String {
    format!("hwif_out_{path}{}", kind.suffix())
}

/// The current-value output port name of a storage field.
pub fn value_output_name(path: &str) -> String {
    format!("hwif_out_{path}")
}

/// The request port name of an external node.
pub fn ext_out_name(path: &str, kind: ExtOutKind) -> String {
    format!("hwif_out_{path}{}", kind.suffix())
}

/// The response port name of an external node.
pub fn ext_in_name(path: &str, kind: ExtInKind) -> String {
    format!("hwif_in_{path}{}", kind.suffix())
}

/// The byte-address width of one element of an external block or memory.
pub fn ext_addr_width(node: &Node) -> u32 {
    clog2(node.size).max(1)
}

/// Derives the hardware-interface port list in declaration order.
///
/// Traversal is pre-order over the tree, so repeated generation yields a
/// byte-identical list. Fields inside external blocks contribute nothing;
/// the block boundary itself carries the request protocol instead.
pub fn generate_hwif(map: &RegMap, interner: &Interner, ds: &DesignState) -> GenResult<Vec<Port>> {
    let mut ports = Vec::new();
    walk(map, interner, ds, ds.top, &mut ports)?;
    Ok(ports)
}

fn walk(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    ports: &mut Vec<Port>,
) -> GenResult<()> {
    for &child in map.children(id) {
        let node = map.node(child);
        match &node.kind {
            NodeKind::Signal(s) => {
                let ip = resolve(map, interner, ds.top, child)?;
                ports.push(Port::input(ip.path(), u64::from(s.width)));
            }
            NodeKind::Memory(_) => {
                external_ports(map, interner, ds, child, ports)?;
            }
            NodeKind::AddrMap | NodeKind::RegFile if node.external => {
                external_ports(map, interner, ds, child, ports)?;
            }
            NodeKind::AddrMap | NodeKind::RegFile => {
                walk(map, interner, ds, child, ports)?;
            }
            NodeKind::Register(r) if node.external => {
                external_register_ports(map, interner, ds, child, *r, ports)?;
            }
            NodeKind::Register(_) => {
                register_ports(map, interner, ds, child, ports)?;
            }
            NodeKind::Field(_) => {}
        }
    }
    Ok(())
}

/// Protocol ports of an external block or memory. The response sides are
/// gated on the node's access capabilities so every emitted port is
/// consumed by the acknowledge or read-back pass.
fn external_ports(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    ports: &mut Vec<Port>,
) -> GenResult<()> {
    let node = map.node(id);
    let (writable, readable, err_support) = match &node.kind {
        NodeKind::Memory(m) => (m.sw.is_writable(), m.sw.is_readable(), m.err_support),
        _ => (map.has_sw_writable(id), map.has_sw_readable(id), true),
    };
    let ip = resolve(map, interner, ds.top, id)?;
    let n = ip.total_elements();
    let path = ip.path();
    let aw = u64::from(ds.access_width);
    let addr_w = u64::from(ext_addr_width(node));

    ports.push(Port::output(ext_out_name(path, ExtOutKind::Req), n));
    ports.push(Port::output(ext_out_name(path, ExtOutKind::Addr), addr_w * n));
    ports.push(Port::output(ext_out_name(path, ExtOutKind::ReqIsWr), n));
    if writable {
        ports.push(Port::output(ext_out_name(path, ExtOutKind::WrData), aw * n));
        ports.push(Port::output(ext_out_name(path, ExtOutKind::WrBiten), aw * n));
        ports.push(Port::input(ext_in_name(path, ExtInKind::WrAck), n));
    }
    if readable {
        ports.push(Port::input(ext_in_name(path, ExtInKind::RdData), aw * n));
        ports.push(Port::input(ext_in_name(path, ExtInKind::RdAck), n));
    }
    if err_support {
        if readable {
            ports.push(Port::input(ext_in_name(path, ExtInKind::RdErr), n));
        }
        if writable {
            ports.push(Port::input(ext_in_name(path, ExtInKind::WrErr), n));
        }
    }
    Ok(())
}

/// Protocol ports of an external register: no address, one request bit per
/// subword, data sized to the full register. External registers never
/// report errors.
fn external_register_ports(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    id: NodeId,
    props: RegProps,
    ports: &mut Vec<Port>,
) -> GenResult<()> {
    let rw = u64::from(props.regwidth);
    let ip = resolve(map, interner, ds.top, id)?;
    let n = ip.total_elements();
    let path = ip.path();
    let writable = map.has_sw_writable(id);
    let readable = map.has_sw_readable(id);

    ports.push(Port::output(
        ext_out_name(path, ExtOutKind::Req),
        u64::from(props.subwords()) * n,
    ));
    ports.push(Port::output(ext_out_name(path, ExtOutKind::ReqIsWr), n));
    if writable {
        ports.push(Port::output(ext_out_name(path, ExtOutKind::WrData), rw * n));
        ports.push(Port::output(ext_out_name(path, ExtOutKind::WrBiten), rw * n));
        ports.push(Port::input(ext_in_name(path, ExtInKind::WrAck), n));
    }
    if readable {
        ports.push(Port::input(ext_in_name(path, ExtInKind::RdData), rw * n));
        ports.push(Port::input(ext_in_name(path, ExtInKind::RdAck), n));
    }
    Ok(())
}

/// Returns `true` when the field's `next` input port is inferred: the
/// hardware can write (or the field is an interrupt) and no reference
/// replaces the port.
pub fn infers_next_port(f: &FieldProps) -> bool {
    (f.hw.is_writable() || f.intr.is_some()) && !matches!(f.next, ControlProp::Ref(_))
}

fn register_ports(
    map: &RegMap,
    interner: &Interner,
    ds: &DesignState,
    reg: NodeId,
    ports: &mut Vec<Port>,
) -> GenResult<()> {
    let mut has_intr = false;
    let mut has_halt = false;

    for &child in map.children(reg) {
        let node = map.node(child);
        let f = match &node.kind {
            NodeKind::Field(f) => f,
            NodeKind::Signal(s) => {
                let ip = resolve(map, interner, ds.top, child)?;
                ports.push(Port::input(ip.path(), u64::from(s.width)));
                continue;
            }
            _ => continue,
        };

        let ip = resolve(map, interner, ds.top, child)?;
        let n = ip.total_elements();
        let path = ip.path();
        let w = u64::from(f.width);

        if infers_next_port(f) {
            ports.push(Port::input(input_name(path, InputKind::Next), w * n));
        }
        let controls = [
            (f.we, InputKind::We),
            (f.wel, InputKind::Wel),
            (f.swwe, InputKind::Swwe),
            (f.swwel, InputKind::Swwel),
            (f.hwclr, InputKind::Hwclr),
            (f.hwset, InputKind::Hwset),
        ];
        for (prop, kind) in controls {
            if prop == ControlProp::Infer {
                ports.push(Port::input(input_name(path, kind), n));
            }
        }
        if let Some(c) = f.counter {
            if c.incr == ControlProp::Infer {
                ports.push(Port::input(input_name(path, InputKind::Incr), n));
            }
            if c.decr == ControlProp::Infer {
                ports.push(Port::input(input_name(path, InputKind::Decr), n));
            }
            if c.incr_value == StepProp::InputPort {
                ports.push(Port::input(input_name(path, InputKind::Incrvalue), w * n));
            }
            if c.decr_value == StepProp::InputPort {
                ports.push(Port::input(input_name(path, InputKind::Decrvalue), w * n));
            }
        }

        if f.hw.is_readable() && f.has_storage() {
            ports.push(Port::output(value_output_name(path), w * n));
        }
        let flags = [
            (f.anded, OutputKind::Anded),
            (f.ored, OutputKind::Ored),
            (f.xored, OutputKind::Xored),
            (f.swacc, OutputKind::Swacc),
            (f.rd_swacc, OutputKind::RdSwacc),
            (f.wr_swacc, OutputKind::WrSwacc),
            (f.swmod, OutputKind::Swmod),
        ];
        for (set, kind) in flags {
            if set {
                ports.push(Port::output(output_name(path, kind), n));
            }
        }
        if let Some(c) = f.counter {
            if c.incr_threshold.is_some() {
                ports.push(Port::output(output_name(path, OutputKind::Incrthreshold), n));
            }
            if c.decr_threshold.is_some() {
                ports.push(Port::output(output_name(path, OutputKind::Decrthreshold), n));
            }
            if c.overflow && c.incr.is_set() {
                ports.push(Port::output(output_name(path, OutputKind::Overflow), n));
            }
            if c.underflow && c.decr.is_set() {
                ports.push(Port::output(output_name(path, OutputKind::Underflow), n));
            }
        }

        if let Some(i) = f.intr {
            has_intr = true;
            has_halt |= i.has_halt();
        }
    }

    if has_intr {
        let ip = resolve(map, interner, ds.top, reg)?;
        let n = ip.total_elements();
        ports.push(Port::output(output_name(ip.path(), OutputKind::Intr), n));
        if has_halt {
            ports.push(Port::output(output_name(ip.path(), OutputKind::Halt), n));
        }
    }
    Ok(())
}
