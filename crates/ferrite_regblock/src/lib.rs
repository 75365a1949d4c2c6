//! Register-block RTL generation from an elaborated register map.
//!
//! The generator runs a fixed sequence of passes over an immutable
//! [`RegMap`], each emitting structured RTL fragments keyed by canonical
//! signal names:
//!
//! 1. **Address decode**: per-register access strobes and the external
//!    dispatch flag ([`decode`])
//! 2. **Field storage**: clocked field state, counters, interrupts, and
//!    derived hardware outputs ([`field_storage`])
//! 3. **External requests**: request wiring toward external registers,
//!    blocks, and memories ([`external`])
//! 4. **Acknowledge fan-in**: the four `external_*` response lines
//!    ([`ext_acks`])
//! 5. **Read-back**: the OR fan-in of every readable word ([`readback`])
//! 6. **Hardware interface**: the closed port set the tree implies
//!    ([`hwif`])
//!
//! A structural or unsupported-construct error aborts the whole run; no
//! partial RTL is ever returned.
//!
//! # Usage
//!
//! ```ignore
//! use ferrite_regblock::generate;
//! let rtl = generate(&map, &interner, &config)?;
//! ```

#![warn(missing_docs)]

pub mod decode;
pub mod design;
pub mod errors;
pub mod ext_acks;
pub mod external;
mod field_next;
pub mod field_storage;
pub mod hwif;
pub mod path;
pub mod readback;
pub mod rtl;

use ferrite_common::{ContentHash, Interner};
use ferrite_config::RegblockConfig;
use ferrite_ir::RegMap;
use serde::{Deserialize, Serialize};

pub use decode::{generate_decode, DecodeRtl};
pub use design::{DesignState, ResetStyle};
pub use errors::{GenError, GenResult};
pub use ext_acks::{generate_acks, AckRtl};
pub use external::{generate_external, ExternalRtl};
pub use field_storage::{generate_storage, StorageRtl};
pub use hwif::generate_hwif;
pub use path::{access_strobe_name, resolve, IndexedPath};
pub use readback::{generate_readback, ReadbackRtl};
pub use rtl::{CombItem, Port, PortDir, RtlExpr, SeqBlock, SignalDecl};

/// The fully generated register block.
///
/// Fragments from every pass are concatenated in a fixed order, so two
/// runs over the same tree and configuration produce identical RTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegblockRtl {
    /// Module name, taken from the top-level address map.
    pub module_name: String,
    /// Clock, reset, and hardware-interface ports. The bus-facing
    /// `cpuif_*` signals belong to the enclosing adapter and are not
    /// block ports.
    pub ports: Vec<Port>,
    /// Internal signal declarations from every pass.
    pub decls: Vec<SignalDecl>,
    /// Continuous assignments and generate loops from every pass.
    pub comb: Vec<CombItem>,
    /// Clocked processes from every pass.
    pub seq: Vec<SeqBlock>,
    /// The design addresses at least one external node.
    pub has_external: bool,
    /// Hash of the source tree, for caching and change detection.
    pub design_hash: ContentHash,
}

/// Runs every generation pass over `map` and assembles the block-level
/// RTL.
pub fn generate(
    map: &RegMap,
    interner: &Interner,
    config: &RegblockConfig,
) -> GenResult<RegblockRtl> {
    let ds = DesignState::new(map, interner, config)?;

    let decode = generate_decode(map, interner, &ds)?;
    let storage = generate_storage(map, interner, &ds)?;
    let external = generate_external(map, interner, &ds)?;
    let acks = generate_acks(map, interner, &ds)?;
    let readback = generate_readback(map, interner, &ds)?;
    let hwif = generate_hwif(map, interner, &ds)?;

    let mut ports = vec![
        Port::input(ds.clock.clone(), 1),
        Port::input(ds.default_reset.signal.clone(), 1),
    ];
    ports.extend(hwif);

    let mut decls = decode.decls;
    decls.extend(storage.decls);
    decls.extend(acks.decls);
    decls.extend(readback.decls);

    let mut comb = decode.items;
    comb.extend(storage.comb);
    comb.extend(external.comb);
    comb.extend(acks.comb);
    comb.extend(readback.comb);

    let mut seq = storage.seq;
    seq.extend(external.seq);

    Ok(RegblockRtl {
        module_name: interner.resolve(map.node(ds.top).name).to_string(),
        ports,
        decls,
        comb,
        seq,
        has_external: decode.has_external,
        design_hash: map.content_hash(interner),
    })
}
