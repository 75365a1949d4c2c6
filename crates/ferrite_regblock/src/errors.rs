//! Generation error taxonomy.
//!
//! Every pass returns [`GenResult`]; the first error aborts generation with
//! no partial RTL. [`GenError::Structural`] means the front end handed over
//! an inconsistent tree; [`GenError::Unsupported`] means a property
//! combination this back end deliberately does not implement. Both name the
//! offending node, including its source reference when the front end
//! provided one. [`GenError::Internal`] wraps
//! [`InternalError`](ferrite_common::InternalError) for defects in the
//! generator itself, such as an emission step disagreeing with what
//! validation admitted; these should never trigger on a valid tree.

use ferrite_common::{InternalError, Interner};
use ferrite_ir::{NodeId, RegMap};

/// The result type of every generation pass.
pub type GenResult<T> = Result<T, GenError>;

/// A fatal generation error.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// The input tree violates a structural invariant.
    #[error("structural error at '{node}': {detail}")]
    Structural {
        /// Dotted path of the offending node, with source reference when
        /// available.
        node: String,
        /// What is inconsistent.
        detail: String,
    },

    /// The property combination is valid but not implemented by this back
    /// end.
    #[error("unsupported configuration at '{node}': {detail}")]
    Unsupported {
        /// Dotted path of the offending node, with source reference when
        /// available.
        node: String,
        /// What is not supported.
        detail: String,
    },

    /// A defect in the generator itself, not in the input tree.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl GenError {
    /// Creates a structural error for the given node.
    pub fn structural(node: impl Into<String>, detail: impl Into<String>) -> Self {
        GenError::Structural {
            node: node.into(),
            detail: detail.into(),
        }
    }

    /// Creates an unsupported-configuration error for the given node.
    pub fn unsupported(node: impl Into<String>, detail: impl Into<String>) -> Self {
        GenError::Unsupported {
            node: node.into(),
            detail: detail.into(),
        }
    }
}

/// Builds the human-readable label of a node for error messages: the
/// dotted path from the top, followed by the source reference when one was
/// recorded.
pub fn node_label(map: &RegMap, interner: &Interner, id: NodeId) -> String {
    let mut segments = Vec::new();
    let mut cur = Some(id);
    while let Some(n) = cur {
        segments.push(interner.resolve(map.node(n).name).to_string());
        cur = map.parent(n);
    }
    segments.reverse();
    let mut label = segments.join(".");
    if let Some(src) = &map.node(id).src_ref {
        label.push_str(" (");
        label.push_str(src);
        label.push(')');
    }
    label
}
