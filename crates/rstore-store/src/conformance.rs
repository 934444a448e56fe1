//! Behaviour every [`Backend`] must share, run against each implementation.

use bytes::Bytes;

use crate::error::StoreError;
use crate::traits::{Backend, ChildName};

pub(crate) fn run_backend_conformance(backend: &dyn Backend) {
    // Round trip
    backend
        .put("alice/test.json", Bytes::from_static(br#"{"foo": "bar"}"#), "application/json")
        .unwrap();
    let item = backend.get("alice/test.json").unwrap();
    assert_eq!(&item.content[..], br#"{"foo": "bar"}"#);
    assert_eq!(item.content_type, "application/json");

    // Overwrite replaces content and type
    backend
        .put("alice/test.json", Bytes::from_static(b"plain"), "text/plain")
        .unwrap();
    let item = backend.get("alice/test.json").unwrap();
    assert_eq!(&item.content[..], b"plain");
    assert_eq!(item.content_type, "text/plain");

    // Missing keys
    assert!(matches!(backend.get("alice/missing"), Err(StoreError::NotFound(_))));
    assert!(backend.get_opt("alice/missing").unwrap().is_none());
    assert!(!backend.exists("alice/missing").unwrap());
    assert!(matches!(backend.delete("alice/missing"), Err(StoreError::NotFound(_))));

    // Invalid keys are rejected rather than mapped
    assert!(matches!(backend.get("alice/../x"), Err(StoreError::InvalidKey(_))));

    // Children
    backend
        .put("alice/a/b/c.json", Bytes::from_static(b"{}"), "application/json")
        .unwrap();
    backend
        .put("alice/a/d.txt", Bytes::from_static(b"d"), "text/plain")
        .unwrap();
    let children = backend.list_children("alice/").unwrap();
    assert_eq!(
        children,
        vec![
            ChildName { name: "a".into(), is_folder: true },
            ChildName { name: "test.json".into(), is_folder: false },
        ]
    );
    let children = backend.list_children("alice/a/").unwrap();
    assert_eq!(
        children,
        vec![
            ChildName { name: "b".into(), is_folder: true },
            ChildName { name: "d.txt".into(), is_folder: false },
        ]
    );
    assert!(backend.list_children("alice/nope/").unwrap().is_empty());
    assert!(backend.list_children("bob/").unwrap().is_empty());

    assert_eq!(
        backend.list_all("alice/").unwrap(),
        vec![
            "alice/a/b/c.json".to_string(),
            "alice/a/d.txt".to_string(),
            "alice/test.json".to_string(),
        ]
    );

    // Delete removes the document and empty folders disappear from listings
    backend.delete("alice/a/b/c.json").unwrap();
    assert!(!backend.exists("alice/a/b/c.json").unwrap());
    let children = backend.list_children("alice/a/").unwrap();
    assert_eq!(children, vec![ChildName { name: "d.txt".into(), is_folder: false }]);

    // Binary payloads survive untouched
    let binary: Vec<u8> = (0..=255u8).collect();
    backend
        .put("alice/img.jpg", Bytes::from(binary.clone()), "image/jpeg; charset=binary")
        .unwrap();
    let item = backend.get("alice/img.jpg").unwrap();
    assert_eq!(item.content.to_vec(), binary);
    assert_eq!(item.content_type, "image/jpeg; charset=binary");
}
