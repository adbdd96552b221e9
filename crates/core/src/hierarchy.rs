//! Code-prefix hierarchies.
//!
//! Both the chart of accounts and the budget rubro tree attach children to a
//! parent whose code is a strict prefix of the child's code. Only detail
//! (leaf) nodes accept postings or reservations; every other node aggregates.

use std::collections::{BTreeMap, BTreeSet};

use erario_shared::ErrorKind;
use thiserror::Error;

/// Errors raised while placing or walking a node in a code hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// The referenced parent does not exist.
    #[error("Parent not found: {0}")]
    MissingParent(String),

    /// The child code does not extend the parent code.
    #[error("Code {child} does not extend parent code {parent}")]
    PrefixMismatch {
        /// Parent code.
        parent: String,
        /// Rejected child code.
        child: String,
    },

    /// Detail nodes cannot have children.
    #[error("Parent {0} is a detail node and cannot have children")]
    ParentIsDetail(String),

    /// Code has the wrong length or characters.
    #[error("Invalid code: {0}")]
    InvalidCode(String),

    /// A stored parent chain loops back on itself.
    #[error("Cyclic parent chain at {0}")]
    CyclicReference(String),
}

impl HierarchyError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingParent(_) => "MISSING_PARENT",
            Self::PrefixMismatch { .. } => "PREFIX_MISMATCH",
            Self::ParentIsDetail(_) => "PARENT_IS_DETAIL",
            Self::InvalidCode(_) => "INVALID_CODE",
            Self::CyclicReference(_) => "CYCLIC_REFERENCE",
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Hierarchy
    }
}

/// Allowed shape of a node code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeFormat {
    /// PUC account codes: ASCII digits, 1 to 10 characters.
    Account,
    /// Rubro codes: ASCII alphanumerics, `.` and `-`, 1 to 50 characters.
    Rubro,
}

impl CodeFormat {
    /// Maximum code length.
    #[must_use]
    pub const fn max_len(self) -> usize {
        match self {
            Self::Account => 10,
            Self::Rubro => 50,
        }
    }

    const fn accepts(self, c: char) -> bool {
        match self {
            Self::Account => c.is_ascii_digit(),
            Self::Rubro => c.is_ascii_alphanumeric() || c == '.' || c == '-',
        }
    }

    /// Validates a code against this format.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCode` if the code is empty, too long, or has a disallowed character.
    pub fn validate(self, code: &str) -> Result<(), HierarchyError> {
        if code.is_empty()
            || code.len() > self.max_len()
            || !code.chars().all(|c| self.accepts(c))
        {
            return Err(HierarchyError::InvalidCode(code.to_string()));
        }
        Ok(())
    }
}

/// Validates that `child_code` may hang under `parent_code`.
///
/// The child must start with the parent code and be strictly longer.
///
/// # Errors
///
/// Returns `PrefixMismatch` otherwise.
pub fn validate_child_code(parent_code: &str, child_code: &str) -> Result<(), HierarchyError> {
    if child_code.len() > parent_code.len() && child_code.starts_with(parent_code) {
        Ok(())
    } else {
        Err(HierarchyError::PrefixMismatch {
            parent: parent_code.to_string(),
            child: child_code.to_string(),
        })
    }
}

/// A node stored in a code hierarchy.
pub trait HierarchyNode {
    /// Identifier type of the node.
    type Id: Copy + Ord;

    /// Parent identifier, `None` for roots.
    fn parent_id(&self) -> Option<Self::Id>;

    /// Node code.
    fn code(&self) -> &str;

    /// Whether the node is a leaf that accepts postings.
    fn is_detail(&self) -> bool;

    /// Depth in the tree, 1 for roots.
    fn level(&self) -> u32;
}

/// Validates where a node with `code` may be attached and returns its level.
///
/// # Errors
///
/// Returns `InvalidCode`, `ParentIsDetail` or `PrefixMismatch`.
pub fn validate_placement<N: HierarchyNode>(
    format: CodeFormat,
    code: &str,
    parent: Option<&N>,
) -> Result<u32, HierarchyError> {
    format.validate(code)?;

    let Some(parent) = parent else {
        return Ok(1);
    };

    if parent.is_detail() {
        return Err(HierarchyError::ParentIsDetail(parent.code().to_string()));
    }
    validate_child_code(parent.code(), code)?;

    Ok(parent.level() + 1)
}

/// Returns the ancestor chain of `id`, nearest parent first.
///
/// # Errors
///
/// Returns `CyclicReference` if the chain revisits a node.
pub fn ancestors<N: HierarchyNode>(
    nodes: &BTreeMap<N::Id, N>,
    id: N::Id,
) -> Result<Vec<N::Id>, HierarchyError> {
    let mut chain = Vec::new();
    let mut seen = BTreeSet::from([id]);
    let mut current = nodes.get(&id).and_then(N::parent_id);

    while let Some(parent_id) = current {
        if !seen.insert(parent_id) {
            let code = nodes
                .get(&parent_id)
                .map_or_else(String::new, |node| node.code().to_string());
            return Err(HierarchyError::CyclicReference(code));
        }
        chain.push(parent_id);
        current = nodes.get(&parent_id).and_then(N::parent_id);
    }

    Ok(chain)
}

/// Returns the direct children of `id`.
#[must_use]
pub fn children<N: HierarchyNode>(nodes: &BTreeMap<N::Id, N>, id: N::Id) -> Vec<N::Id> {
    nodes
        .iter()
        .filter(|(_, node)| node.parent_id() == Some(id))
        .map(|(child_id, _)| *child_id)
        .collect()
}

/// Returns every detail node at or below `id`.
///
/// A detail node is its own single descendant.
///
/// # Errors
///
/// Returns `CyclicReference` if any parent chain loops.
pub fn detail_descendants<N: HierarchyNode>(
    nodes: &BTreeMap<N::Id, N>,
    id: N::Id,
) -> Result<Vec<N::Id>, HierarchyError> {
    let mut found = Vec::new();
    for (node_id, node) in nodes {
        if !node.is_detail() {
            continue;
        }
        if *node_id == id || ancestors(nodes, *node_id)?.contains(&id) {
            found.push(*node_id);
        }
    }
    Ok(found)
}
