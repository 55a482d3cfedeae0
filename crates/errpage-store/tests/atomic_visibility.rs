//! A reader polling a code file while it is rewritten must only ever observe
//! one complete version of the page.

use errpage_schema::StatusCode;
use errpage_store::{ErrorFileStore, StoreLayout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn concurrent_reader_never_sees_torn_page() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    layout.initialize().unwrap();
    let store = ErrorFileStore::new(layout.clone());
    let code = StatusCode::parse("503").unwrap();

    let short = b"down".to_vec();
    let long = vec![b'x'; 256 * 1024];
    store.write(code, &short).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let done = Arc::clone(&done);
        let path = layout.code_path(code);
        let (short, long) = (short.clone(), long.clone());
        thread::spawn(move || {
            let mut reads = 0usize;
            loop {
                let data = std::fs::read(&path).expect("file must always exist");
                assert!(
                    data == short || data == long,
                    "observed torn page of {} bytes",
                    data.len()
                );
                reads += 1;
                if done.load(Ordering::SeqCst) {
                    break reads;
                }
            }
        })
    };

    for i in 0..200 {
        let body = if i % 2 == 0 { &long } else { &short };
        store.write(code, body).unwrap();
    }
    done.store(true, Ordering::SeqCst);

    let reads = reader.join().unwrap();
    assert!(reads > 0);
}

#[test]
fn interrupted_write_leaves_previous_page_intact() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    layout.initialize().unwrap();
    let store = ErrorFileStore::new(layout.clone());
    let code = StatusCode::parse("404").unwrap();
    store.write(code, b"previous").unwrap();

    // A leftover temp file from a crashed writer is invisible to readers
    // and to the code listing.
    std::fs::write(dir.path().join(".tmpCrash1"), b"half-writ").unwrap();

    assert_eq!(store.read(code).unwrap(), b"previous");
    assert_eq!(store.list().unwrap(), vec![code]);
}
