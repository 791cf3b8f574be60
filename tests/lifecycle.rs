//! Integration tests for wrapper lifetimes, release semantics, and the
//! document pool.

use domgraft::{
    mutate, with_mortal, Document, DocumentPool, DomError, Engine, EngineConfig, Handle, Node,
    TypeTag,
};

fn setup() -> (Engine, Document, Node) {
    let mut engine = Engine::new();
    let doc = Document::create(&mut engine, Some("1.0"), Some("UTF-8"));
    let dh = doc.handle().expect("doc");
    let root_h = engine.create_element(dh, None, "root");
    engine.append_child(dh, root_h).expect("append root");
    let root = Node::wrap(&engine, root_h.into_raw()).expect("wrap root");
    (engine, doc, root)
}

/// After auto-freeing a mortal wrapper, every operation on it is a typed
/// error, never a touch of freed storage.
#[test]
fn test_auto_free_then_use_is_invalid_node() {
    let (mut engine, doc, root) = setup();
    let dh = doc.handle().expect("doc");
    let text_h = engine.create_text(dh, "scratch");
    let mut w = Node::wrap_mortal(&engine, text_h.into_raw()).expect("wrap");

    w.auto_free(&mut engine).expect("auto free");

    assert_eq!(w.raw(), 0);
    assert_eq!(w.name(&engine), Err(DomError::InvalidNode));
    assert_eq!(w.value(&engine), Err(DomError::InvalidNode));
    assert_eq!(
        mutate::add_child(&mut engine, &root, &w),
        Err(DomError::InvalidNode)
    );
    assert_eq!(mutate::unlink(&mut engine, &w), Err(DomError::InvalidNode));
}

/// Double release of a mortal wrapper is rejected, never a crash.
#[test]
fn test_double_release_is_rejected() {
    let (mut engine, doc, _root) = setup();
    let dh = doc.handle().expect("doc");
    let text_h = engine.create_text(dh, "x");
    let mut w = Node::wrap_mortal(&engine, text_h.into_raw()).expect("wrap");

    w.release(&mut engine).expect("first release");
    assert_eq!(w.release(&mut engine), Err(DomError::InvalidNode));
    assert_eq!(w.auto_free(&mut engine), Err(DomError::InvalidNode));
}

/// Attempting to remove an attribute through `remove_child` is a no-op,
/// not an error.
#[test]
fn test_remove_child_attribute_noop() {
    let (mut engine, _doc, root) = setup();
    let rh = root.handle().expect("root");
    let attr_h = engine.create_attribute(rh, None, "id", "a");
    let attr = Node::wrap(&engine, attr_h.into_raw()).expect("wrap");
    assert_eq!(attr.class(), TypeTag::Attribute);

    mutate::remove_child(&mut engine, &root, &attr).expect("no-op");
    assert_eq!(engine.attrs(rh), &[attr_h]);
    assert_eq!(root.attribute(&engine, "id").expect("still there"), "a");
}

/// The scoped-release helper frees a mortal wrapper on the error path too.
#[test]
fn test_with_mortal_error_path_still_frees() {
    let (mut engine, doc, _root) = setup();
    let dh = doc.handle().expect("doc");
    let text_h = engine.create_text(dh, "x");
    let w = Node::wrap_mortal(&engine, text_h.into_raw()).expect("wrap");

    let result: domgraft::Result<()> = with_mortal(&mut engine, w, |engine, node| {
        let _ = node.value(engine)?;
        Err(DomError::AttributeNotFound {
            name: "nope".to_string(),
        })
    });

    assert!(matches!(result, Err(DomError::AttributeNotFound { .. })));
    assert!(!engine.is_alive(text_h));
}

/// Full document lifecycle through the pool: acquire, bind, build,
/// release, recycle. The recycled wrapper never aliases the released
/// handle.
#[test]
fn test_pool_document_lifecycle() {
    let mut engine = Engine::new();
    let pool = DocumentPool::new();

    let mut doc = pool.acquire();
    assert_eq!(doc.raw(), 0);
    doc.bind(engine.create_document(Some("1.0"), None));
    let first_raw = doc.raw();
    let dh = doc.handle().expect("bound");

    let root_h = engine.create_element(dh, None, "root");
    engine.append_child(dh, root_h).expect("append root");
    let root = Node::wrap(&engine, root_h.into_raw()).expect("wrap");
    assert_eq!(root.name(&engine).expect("name"), "root");

    doc.release(&mut engine).expect("free tree");
    pool.release(doc);

    // Descendant wrappers are dead after the cascading free.
    assert_eq!(root.name(&engine), Err(DomError::InvalidNode));

    let mut again = pool.acquire();
    assert_eq!(again.raw(), 0);
    assert!(!again.is_mortal());

    // Bind a different document; the old handle never resurfaces.
    again.bind(engine.create_document(None, None));
    assert_ne!(again.raw(), first_raw);
}

/// Unrelated threads can hammer the pool concurrently while each builds
/// and frees its own documents in its own engine.
#[test]
fn test_pool_concurrent_with_per_thread_engines() {
    use std::sync::Arc;

    let pool = Arc::new(DocumentPool::new());
    let mut workers = Vec::new();
    for _ in 0..4 {
        let pool = Arc::clone(&pool);
        workers.push(std::thread::spawn(move || {
            let mut engine = Engine::new();
            for _ in 0..200 {
                let mut doc = pool.acquire();
                doc.bind(engine.create_document(None, None));
                let dh = doc.handle().expect("bound");
                let root_h = engine.create_element(dh, None, "root");
                engine.append_child(dh, root_h).expect("append");
                doc.release(&mut engine).expect("free");
                pool.release(doc);
            }
        }));
    }
    for worker in workers {
        worker.join().expect("worker thread");
    }
    assert!(pool.idle() >= 1);
}

/// A mortal document auto-frees its whole tree.
#[test]
fn test_mortal_document_auto_free() {
    let mut engine = Engine::new();
    let mut doc = Document::create(&mut engine, None, None);
    doc.make_mortal();
    let dh = doc.handle().expect("doc");
    let root_h = engine.create_element(dh, None, "root");
    engine.append_child(dh, root_h).expect("append");

    doc.auto_free(&mut engine).expect("auto free");
    assert_eq!(doc.raw(), 0);
    assert!(!engine.is_alive(root_h));
    assert_eq!(doc.release(&mut engine), Err(DomError::InvalidDocument));
}

/// Structural refusals surface as typed errors regardless of whether the
/// engine is configured to log them.
#[test]
fn test_quiet_engine_still_returns_structural_errors() {
    let mut engine = Engine::with_config(EngineConfig {
        report_structural_errors: false,
    });
    let doc1 = Document::create(&mut engine, None, None);
    let doc2 = Document::create(&mut engine, None, None);
    let root_h = engine.create_element(doc1.handle().expect("doc1"), None, "root");
    engine
        .append_child(doc1.handle().expect("doc1"), root_h)
        .expect("append");
    let stray_h = engine.create_element(doc2.handle().expect("doc2"), None, "stray");

    let root = Node::wrap(&engine, root_h.into_raw()).expect("wrap");
    let stray = Node::wrap(&engine, stray_h.into_raw()).expect("wrap");
    let err = mutate::add_child(&mut engine, &root, &stray).unwrap_err();
    assert!(matches!(err, DomError::Structural { op: "add_child", .. }));
}

/// Unlink leaves the node fully detached and absent from the former
/// parent's traversal, with the parent's end pointers intact.
#[test]
fn test_unlink_invariant_end_to_end() {
    let (mut engine, doc, root) = setup();
    let dh = doc.handle().expect("doc");
    let rh = root.handle().expect("root");

    let handles: Vec<Handle> = (0..5)
        .map(|i| {
            let h = engine.create_element(dh, None, &format!("c{i}"));
            engine.append_child(rh, h).expect("append");
            h
        })
        .collect();

    for &h in &handles {
        let n = Node::wrap(&engine, h.into_raw()).expect("wrap");
        mutate::unlink(&mut engine, &n).expect("unlink");
        assert_eq!(engine.parent(h), None);
        assert_eq!(engine.prev_sibling(h), None);
        assert_eq!(engine.next_sibling(h), None);
        let remaining: Vec<Handle> = engine.children(rh).collect();
        assert!(!remaining.contains(&h));
        // End pointers stay consistent with the traversal.
        assert_eq!(engine.first_child(rh), remaining.first().copied());
        assert_eq!(engine.last_child(rh), remaining.last().copied());
    }
}
