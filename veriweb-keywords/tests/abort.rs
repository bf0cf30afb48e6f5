mod common;

use common::settings;
use std::sync::Arc;
use std::time::Duration;
use veriweb_drivers::memory::{MemoryBrowser, MemoryNode};
use veriweb_finder::FindError;
use veriweb_keywords::{KeywordOptions, Session};
use veriweb_runtime::VeriwebRuntime;

#[test]
fn runner_thread_can_abort_a_waiting_keyword() {
    common::init_test_tracing();
    let runtime = VeriwebRuntime::build("keyword-abort-test", Some(1)).unwrap();
    let browser = Arc::new(MemoryBrowser::new(vec![MemoryNode::new("p").text("Ready")]));
    let mut session = Session::new(settings(), common::MemoryLauncher::new([browser]));
    runtime
        .block_on(session.open_browser("", None, ""))
        .unwrap();

    let abort = runtime.abort_handle();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        abort.abort();
    });

    let patient = KeywordOptions::default().timeout(Duration::from_secs(30));
    let session_ref = &mut session;
    let patient_ref = &patient;
    let result = runtime.block_on_abortable(move |token| {
        session_ref.set_cancel(token);
        let session: &Session = session_ref;
        async move { session.verify_text("Never shows up", patient_ref).await }
    });
    stopper.join().unwrap();

    let err = result.unwrap_err();
    assert_eq!(err.search().map(|f| &f.error), Some(&FindError::Cancelled));

    // the next call gets a fresh token
    let session_ref = &mut session;
    let next = runtime.block_on_abortable(move |token| {
        session_ref.set_cancel(token);
        let session: &Session = session_ref;
        async move { session.verify_text("Ready", &KeywordOptions::default()).await }
    });
    next.unwrap();
    runtime.shutdown(Duration::from_millis(50));
}
