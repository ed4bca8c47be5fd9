//! Shared setup for runtime integration tests

#![allow(dead_code)]

use jsdos_core::{BundleConfig, DosConfig, MemoryStorage};
use jsdos_harness::{
    init_test_logging, EventRecorder, MockBundleFetcher, MockCommandInterface, MockScriptHost,
};
use jsdos_runtime::{SessionBuilder, SessionController};
use std::sync::Arc;

pub const BUNDLE_URL: &str = "https://cdn.example/digger.jsdos";

pub struct TestSession {
    pub controller: SessionController,
    pub host: Arc<MockScriptHost>,
    pub storage: Arc<MemoryStorage>,
    pub recorder: EventRecorder,
    pub fetcher: MockBundleFetcher,
}

/// Session in `emu-init` with mocks wired in
pub fn create_test_session() -> TestSession {
    create_session_with(Arc::new(MockScriptHost::default()), Arc::new(MemoryStorage::new()))
}

pub fn create_session_with(host: Arc<MockScriptHost>, storage: Arc<MemoryStorage>) -> TestSession {
    init_test_logging();

    let recorder = EventRecorder::new();
    let controller = SessionBuilder::new(host.clone())
        .with_config(DosConfig::testing())
        .with_storage(storage.clone())
        .on_event(Arc::new(recorder.callback()))
        .build()
        .expect("Failed to build session");

    TestSession {
        controller,
        host,
        storage,
        recorder,
        fetcher: MockBundleFetcher::new().with_bundle(BUNDLE_URL, vec![0x50, 0x4b, 0x03, 0x04]),
    }
}

/// Drive a session to `bnd-ready` with `ci` bound
pub async fn make_ready(session: &TestSession, ci: Arc<MockCommandInterface>) {
    session
        .controller
        .init_emulators()
        .await
        .expect("Failed to init emulators");
    session
        .controller
        .load_bundle(BUNDLE_URL, None, &session.fetcher)
        .await
        .expect("Failed to load bundle");
    session
        .controller
        .bundle_ready(BundleConfig::default(), ci)
        .expect("Failed to bind command interface");
}
