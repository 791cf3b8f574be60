//! Structural tree operations.
//!
//! These maintain the doubly-linked sibling/parent/first-child/last-child
//! invariants of the engine's tree, and hand any relocated element subtree
//! to the namespace reconciler so its declarations stay reachable from the
//! new position.
//!
//! All operations assume exclusive access to the tree for their duration:
//! the link updates are not atomic and a concurrent reader could observe a
//! torn intermediate state. Callers serialize mutation per document.

use crate::engine::{Engine, TypeTag};
use crate::error::{DomError, Result};
use crate::node::Node;
use crate::ns;

/// Appends `child` as the last child of `parent`, then reconciles the
/// child subtree's namespaces when the child is an element.
///
/// # Errors
///
/// `InvalidNode` when either handle is zero or stale; `Structural` when
/// the engine refuses the append (cross-document child, child still
/// linked elsewhere).
pub fn add_child(engine: &mut Engine, parent: &Node, child: &Node) -> Result<()> {
    let parent_h = parent.live(engine)?;
    let child_h = child.live(engine)?;
    engine
        .append_child(parent_h, child_h)
        .map_err(|refusal| DomError::Structural {
            op: "add_child",
            message: refusal.message,
        })?;
    if child.class() == TypeTag::Element {
        ns::reconcile_subtree(engine, child_h);
    }
    Ok(())
}

/// Inserts `new_child` immediately before `reference`, then reconciles the
/// moved subtree's namespaces when it is an element.
///
/// # Errors
///
/// `InvalidNode` when either handle is zero or stale; `Structural` when
/// the engine refuses the splice (detached reference, cross-document or
/// still-linked child).
pub fn insert_before(engine: &mut Engine, reference: &Node, new_child: &Node) -> Result<()> {
    let reference_h = reference.live(engine)?;
    let child_h = new_child.live(engine)?;
    engine
        .insert_before(reference_h, child_h)
        .map_err(|refusal| DomError::Structural {
            op: "insert_before",
            message: refusal.message,
        })?;
    if new_child.class() == TypeTag::Element {
        ns::reconcile_subtree(engine, child_h);
    }
    Ok(())
}

/// Removes `target` from `parent`'s child list.
///
/// No-op (not an error) when `target` is an attribute or namespace
/// declaration — those are not structural children — or when `target`'s
/// recorded parent is not `parent` (a stale handle). Otherwise the target
/// is unlinked, and an element target has its detached subtree's
/// namespaces reconciled.
///
/// # Errors
///
/// `InvalidNode` when either handle is zero or stale.
pub fn remove_child(engine: &mut Engine, parent: &Node, target: &Node) -> Result<()> {
    let parent_h = parent.live(engine)?;
    let target_h = target.live(engine)?;

    if matches!(target.class(), TypeTag::Attribute | TypeTag::NamespaceDecl) {
        log::trace!(target: "domgraft.mutate", "remove_child: non-structural target, no-op");
        return Ok(());
    }
    if engine.parent(target_h) != Some(parent_h) {
        log::trace!(target: "domgraft.mutate", "remove_child: target not a child of parent, no-op");
        return Ok(());
    }

    unlink(engine, target)?;
    if target.class() == TypeTag::Element {
        ns::reconcile_subtree(engine, target_h);
    }
    Ok(())
}

/// Detaches a node from its parent and siblings.
///
/// A DTD node goes through the engine's dedicated unlink primitive, which
/// also clears the document's internal-subset back-pointer. An already
/// detached node (no parent, no siblings) is a no-op. Afterwards the
/// node's own parent/prev/next links are cleared, so a stale handle cannot
/// reattach it.
///
/// # Errors
///
/// `InvalidNode` when the handle is zero or stale.
pub fn unlink(engine: &mut Engine, node: &Node) -> Result<()> {
    let handle = node.live(engine)?;

    if node.class() == TypeTag::Dtd {
        engine.unlink_dtd(handle);
        return Ok(());
    }

    let parent = engine.parent(handle);
    let prev = engine.prev_sibling(handle);
    let next = engine.next_sibling(handle);
    if parent.is_none() && prev.is_none() && next.is_none() {
        return Ok(());
    }

    match prev {
        Some(p) => engine.set_next_sibling(p, next),
        None => {
            if let Some(par) = parent {
                engine.set_first_child(par, next);
            }
        }
    }
    match next {
        Some(n) => engine.set_prev_sibling(n, prev),
        None => {
            if let Some(par) = parent {
                engine.set_last_child(par, prev);
            }
        }
    }
    engine.set_parent(handle, None);
    engine.set_prev_sibling(handle, None);
    engine.set_next_sibling(handle, None);
    Ok(())
}
