//! Namespace reconciliation.
//!
//! Restores the tree invariant after a subtree is detached or relocated:
//! every namespace-qualified element and attribute must reference a
//! declaration reachable from its (possibly new) position, with no orphaned
//! and no duplicated declarations.
//!
//! For each qualified node, an ancestor search for the reference's prefix
//! decides between three outcomes: repoint to a matching ancestor
//! declaration (retiring a now-redundant local copy), keep an existing
//! correct self-declaration, or self-declare by cloning. Declarations
//! retired along the way are collected in an explicit, identity-deduplicated
//! set and freed exactly once after the walk, never threaded through the
//! declarations' own link fields.
//!
//! No step here can fail: a missed ancestor search is a normal branch
//! outcome, and the walk is bounded by the subtree size.

use crate::engine::{Engine, Handle, TypeTag};
use crate::error::Result;
use crate::node::Node;

/// Reconciles namespace declarations across a detached or relocated
/// subtree rooted at `root`.
///
/// # Errors
///
/// `InvalidNode` when the root handle is zero or stale. The repair walk
/// itself raises no errors.
pub fn reconcile(engine: &mut Engine, root: &Node) -> Result<()> {
    let handle = root.live(engine)?;
    reconcile_subtree(engine, handle);
    Ok(())
}

/// Internal entry point used by the tree mutator after unlink/append.
pub(crate) fn reconcile_subtree(engine: &mut Engine, root: Handle) {
    let mut unused: Vec<Handle> = Vec::new();
    visit(engine, root, &mut unused);
    if !unused.is_empty() {
        log::debug!(
            target: "domgraft.ns",
            "reconcile: releasing {} retired declaration(s)",
            unused.len()
        );
    }
    for decl in unused {
        engine.free_namespace(decl);
    }
}

fn visit(engine: &mut Engine, t: Handle, unused: &mut Vec<Handle>) {
    let tag = engine.tag(t);
    let is_element = tag == TypeTag::Element;

    if is_element || tag == TypeTag::Attribute {
        if let Some(ns) = engine.ns_of(t) {
            reconcile_one(engine, t, ns, is_element, unused);
        }
    }

    if is_element {
        // Attributes first, then children; both lists are snapshotted so
        // the walk survives declaration-list edits.
        let attrs: Vec<Handle> = engine.attrs(t).to_vec();
        for attr in attrs {
            visit(engine, attr, unused);
        }
        let children: Vec<Handle> = engine.children(t).collect();
        for child in children {
            visit(engine, child, unused);
        }
    }
}

fn reconcile_one(
    engine: &mut Engine,
    t: Handle,
    ns: Handle,
    is_element: bool,
    unused: &mut Vec<Handle>,
) {
    let prefix = engine.decl_prefix(ns).map(str::to_owned);
    let uri = engine.decl_uri(ns).to_owned();

    // Neither prefix nor URI set: the slot represents "no namespace" and
    // is never reconciled or added to a declaration list.
    if prefix.is_none() && uri.is_empty() {
        return;
    }

    // The search starts at the parent, so a declaration still attached to
    // the node itself never shadows what the new scope provides.
    let found = engine
        .parent(t)
        .and_then(|parent| engine.search_ns(parent, prefix.as_deref()));

    match found {
        Some(decl) if engine.decl_uri(decl) == uri => {
            if is_element {
                // A reusable ancestor declaration. If the element still
                // carries its own copy (common right after detachment),
                // retire it. Membership is by handle identity on both
                // lists: equal prefix+URI strings do not make two
                // declarations the same.
                if engine.remove_ns_def(t, ns) && !unused.contains(&ns) {
                    unused.push(ns);
                }
                engine.set_ns(t, Some(decl));
            } else if let Some(owner) = engine.parent(t) {
                // The owning element is the attribute's declaration
                // carrier, so a copy parked there for the attribute is
                // retired through the owner, not through `t`.
                let target =
                    retire_owner_copy(engine, owner, decl, prefix.as_deref(), &uri, unused);
                engine.set_ns(t, Some(target));
            }
        }
        _ => {
            // No matching ancestor declaration (or a URI mismatch, in
            // which case the local declaration shadows the ancestor and
            // wins). Already correctly self-declared? Leave it.
            if engine.local_decls(t).contains(&ns) {
                return;
            }
            // Otherwise self-declare with a fresh clone. Attributes cannot
            // carry declarations, so the clone goes on the owning element;
            // a fully detached attribute keeps its reference untouched.
            let owner = if is_element { Some(t) } else { engine.parent(t) };
            let Some(owner) = owner else {
                return;
            };
            let clone = engine.clone_ns(ns);
            engine.add_ns_def(owner, clone);
            engine.set_ns(t, Some(clone));
        }
    }
}

/// Resolves which declaration a qualified attribute should reference when
/// the ancestor search stopped at `decl`.
///
/// If `decl` is the owning element's own local copy and an identical
/// (prefix, URI) declaration is in scope above the owner, the copy is
/// redundant: it is removed from the owner's list, queued on the unused
/// set, and the outer declaration is returned. Otherwise `decl` stands.
fn retire_owner_copy(
    engine: &mut Engine,
    owner: Handle,
    decl: Handle,
    prefix: Option<&str>,
    uri: &str,
    unused: &mut Vec<Handle>,
) -> Handle {
    if !engine.local_decls(owner).contains(&decl) {
        return decl;
    }
    let outer = engine
        .parent(owner)
        .and_then(|above| engine.search_ns(above, prefix))
        .filter(|&above_decl| engine.decl_uri(above_decl) == uri);
    let Some(outer) = outer else {
        return decl;
    };
    if engine.remove_ns_def(owner, decl) && !unused.contains(&decl) {
        unused.push(decl);
    }
    outer
}
