//! Typed property sets attached to register-map nodes.
//!
//! Every behavior the generator can emit is declared here as a closed,
//! typed property. There is no string-keyed lookup with fallback defaults;
//! a property the back end does not know about cannot be expressed.

use crate::access::{Access, OnRead, OnWrite, Precedence};
use crate::ids::NodeId;
use serde::{Deserialize, Serialize};

/// A control input source shared by write-enable style properties
/// (`we`, `wel`, `swwe`, `swwel`, `hwclr`, `hwset`, counter `incr`/`decr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControlProp {
    /// The property is not used.
    #[default]
    Unset,
    /// The property is driven by an inferred hardware-interface input port.
    Infer,
    /// The property is driven by the value of the referenced signal or
    /// field; no port is inferred.
    Ref(NodeId),
}

impl ControlProp {
    /// Returns `true` unless the property is [`ControlProp::Unset`].
    pub fn is_set(self) -> bool {
        !matches!(self, ControlProp::Unset)
    }
}

/// The step size of a counter increment or decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepProp {
    /// A compile-time constant step.
    Fixed(u64),
    /// A field-width hardware-interface input port supplies the step.
    InputPort,
    /// The referenced signal or field supplies the step.
    Ref(NodeId),
}

impl Default for StepProp {
    fn default() -> Self {
        StepProp::Fixed(1)
    }
}

/// A field reset specification.
///
/// No value and no signal means the field has no reset. A signal without a
/// value is a structural authoring error caught at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResetProp {
    /// The reset value, masked to the field width.
    pub value: Option<u64>,
    /// An overriding reset signal; the design-level default style is used
    /// when absent.
    pub signal: Option<NodeId>,
}

/// Counter machinery for a field declared as a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterProps {
    /// Increment event source. Defaults to an inferred input port.
    pub incr: ControlProp,
    /// Decrement event source. Defaults to unused (an up-counter).
    pub decr: ControlProp,
    /// Increment step.
    pub incr_value: StepProp,
    /// Decrement step.
    pub decr_value: StepProp,
    /// Clamp at all-ones instead of wrapping.
    pub incr_saturate: bool,
    /// Clamp at zero instead of wrapping.
    pub decr_saturate: bool,
    /// Emit an `incrthreshold` output comparing against this value.
    pub incr_threshold: Option<u64>,
    /// Emit a `decrthreshold` output comparing against this value.
    pub decr_threshold: Option<u64>,
    /// Emit an `overflow` output pulsing on increment carry-out.
    pub overflow: bool,
    /// Emit an `underflow` output pulsing on decrement borrow.
    pub underflow: bool,
}

impl Default for CounterProps {
    fn default() -> Self {
        Self {
            incr: ControlProp::Infer,
            decr: ControlProp::Unset,
            incr_value: StepProp::default(),
            decr_value: StepProp::default(),
            incr_saturate: false,
            decr_saturate: false,
            incr_threshold: None,
            decr_threshold: None,
            overflow: false,
            underflow: false,
        }
    }
}

/// How an interrupt field detects its set condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IntrKind {
    /// Level sensitive: the incoming value itself is the condition.
    #[default]
    Level,
    /// A 0 to 1 transition per bit.
    Posedge,
    /// A 1 to 0 transition per bit.
    Negedge,
    /// Any transition per bit.
    Bothedge,
}

/// How an interrupt field retains its set condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stickiness {
    /// Each bit latches once set until software clears it.
    #[default]
    StickyBit,
    /// The whole field latches the first nonzero value until cleared.
    Sticky,
    /// The field follows the incoming value combinationally through storage.
    NonSticky,
}

/// Interrupt machinery for a field declared as an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntrProps {
    /// Set-condition detection.
    pub kind: IntrKind,
    /// Retention behavior.
    pub sticky: Stickiness,
    /// Gate contribution to the register `intr` output: `field & enable`.
    pub enable: Option<NodeId>,
    /// Gate contribution to the register `intr` output: `field & ~mask`.
    pub mask: Option<NodeId>,
    /// Gate contribution to the register `halt` output: `field & haltenable`.
    pub haltenable: Option<NodeId>,
    /// Gate contribution to the register `halt` output: `field & ~haltmask`.
    pub haltmask: Option<NodeId>,
}

impl IntrProps {
    /// Returns `true` if this field contributes to the register `halt` output.
    pub fn has_halt(&self) -> bool {
        self.haltenable.is_some() || self.haltmask.is_some()
    }
}

/// Properties of a field node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldProps {
    /// Bit position of the field's least significant bit within its register.
    pub lsb: u32,
    /// Field width in bits.
    pub width: u32,
    /// Software access mode.
    pub sw: Access,
    /// Hardware access mode.
    pub hw: Access,
    /// Side effect of a software read.
    pub onread: Option<OnRead>,
    /// Value shaping of a software write.
    pub onwrite: Option<OnWrite>,
    /// Reset specification.
    pub reset: Option<ResetProp>,
    /// Hardware next-value source. A `Ref` replaces the inferred `next`
    /// input port entirely.
    pub next: ControlProp,
    /// Active-high hardware write enable.
    pub we: ControlProp,
    /// Active-low hardware write enable.
    pub wel: ControlProp,
    /// Active-high software write enable qualifier.
    pub swwe: ControlProp,
    /// Active-low software write enable qualifier.
    pub swwel: ControlProp,
    /// Hardware clear (to zero) request.
    pub hwclr: ControlProp,
    /// Hardware set (to all ones) request.
    pub hwset: ControlProp,
    /// Software versus hardware priority on simultaneous updates.
    pub precedence: Precedence,
    /// The field self-clears one cycle after a software write.
    pub singlepulse: bool,
    /// Counter machinery, when the field is a counter.
    pub counter: Option<CounterProps>,
    /// Interrupt machinery, when the field is an interrupt.
    pub intr: Option<IntrProps>,
    /// Emit an AND reduction output of the stored value.
    pub anded: bool,
    /// Emit an OR reduction output of the stored value.
    pub ored: bool,
    /// Emit an XOR reduction output of the stored value.
    pub xored: bool,
    /// Emit a software-modified strobe output.
    pub swmod: bool,
    /// Emit a software-accessed strobe output.
    pub swacc: bool,
    /// Emit a software-read strobe output.
    pub rd_swacc: bool,
    /// Emit a software-written strobe output.
    pub wr_swacc: bool,
}

impl FieldProps {
    /// Creates field properties for a software read-write, hardware
    /// read-only storage field with every side effect disabled.
    pub fn new(lsb: u32, width: u32) -> Self {
        Self {
            lsb,
            width,
            sw: Access::Rw,
            hw: Access::R,
            onread: None,
            onwrite: None,
            reset: None,
            next: ControlProp::Unset,
            we: ControlProp::Unset,
            wel: ControlProp::Unset,
            swwe: ControlProp::Unset,
            swwel: ControlProp::Unset,
            hwclr: ControlProp::Unset,
            hwset: ControlProp::Unset,
            precedence: Precedence::Sw,
            singlepulse: false,
            counter: None,
            intr: None,
            anded: false,
            ored: false,
            xored: false,
            swmod: false,
            swacc: false,
            rd_swacc: false,
            wr_swacc: false,
        }
    }

    /// Bit position of the field's most significant bit within its register.
    pub fn msb(&self) -> u32 {
        self.lsb + self.width - 1
    }

    /// Returns `true` if a storage element is synthesized for this field.
    ///
    /// Software-writable fields, fields with software side effects,
    /// counters, interrupts, and gated hardware writes all need state. A
    /// field hardware continuously drives (no enable) is a wire, and a
    /// field nobody drives is a constant.
    pub fn has_storage(&self) -> bool {
        self.sw.is_writable()
            || self.onread.is_some()
            || self.onwrite.is_some()
            || self.singlepulse
            || self.counter.is_some()
            || self.intr.is_some()
            || self.hwclr.is_set()
            || self.hwset.is_set()
            || (self.hw.is_writable() && (self.we.is_set() || self.wel.is_set()))
    }

    /// Returns `true` if the field value is the hardware input passed
    /// through combinationally.
    pub fn is_wire(&self) -> bool {
        self.hw.is_writable() && !self.has_storage()
    }

    /// Returns `true` if the field value is a compile-time constant
    /// (its reset value, or zero with no reset).
    pub fn is_constant(&self) -> bool {
        !self.hw.is_writable() && !self.has_storage()
    }
}

/// Properties of a register node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegProps {
    /// Register width in bits.
    pub regwidth: u32,
    /// Width of one software access in bits; equals `regwidth` for
    /// registers no wider than the bus.
    pub accesswidth: u32,
}

impl RegProps {
    /// Creates register properties with equal register and access width.
    pub fn new(regwidth: u32) -> Self {
        Self {
            regwidth,
            accesswidth: regwidth,
        }
    }

    /// The number of bus-word subwords this register occupies.
    pub fn subwords(&self) -> u32 {
        self.regwidth / self.accesswidth
    }
}

impl Default for RegProps {
    fn default() -> Self {
        Self::new(32)
    }
}

/// Properties of a memory node. Memories are always external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemProps {
    /// Software access mode for the whole memory.
    pub sw: Access,
    /// Number of entries.
    pub entries: u64,
    /// Width of one entry in bits.
    pub entry_width: u32,
    /// The external memory reports access errors through
    /// `rd_err`/`wr_err` inputs.
    pub err_support: bool,
}

impl MemProps {
    /// Creates software read-write memory properties without error
    /// reporting.
    pub fn new(entries: u64, entry_width: u32) -> Self {
        Self {
            sw: Access::Rw,
            entries,
            entry_width,
            err_support: false,
        }
    }
}

/// Properties of a signal node.
///
/// Signals become plain input ports and may be referenced as reset sources
/// or control-property drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalProps {
    /// Signal width in bits.
    pub width: u32,
    /// The signal is active low (meaningful for reset references).
    pub active_low: bool,
    /// The signal is asynchronous (meaningful for reset references).
    pub is_async: bool,
}

impl SignalProps {
    /// Creates an active-high, synchronous signal of the given width.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            active_low: false,
            is_async: false,
        }
    }
}

impl Default for SignalProps {
    fn default() -> Self {
        Self::new(1)
    }
}
