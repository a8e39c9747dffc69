// Once clippy takes `clippy.toml` into account (for `tests` targets),
// we can remove these.
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

mod common;

use std::time::Duration;

use faultline_core::listener::Listener;
use faultline_core::policy::{Action, PolicyTable};
use faultline_core::prompt::NoPrompt;
use faultline_core::registry::Registry;
use faultline_core::{
    FaultEvent, FaultKind, ListenerError, ProcessId, ReceiveError, Settings, ThreadId,
};
use test_log::test;
use tokio_util::sync::CancellationToken;

use crate::common::{MockControl, MockDebugger, MockError, ScriptedSource};

fn kill_all() -> Settings {
    Settings {
        policy: PolicyTable::new(Action::Kill),
        ..Settings::default()
    }
}

#[test(tokio::test)]
async fn listener_skips_transient_errors_and_stops_on_fatal() {
    let (debugger, control) = (MockDebugger::default(), MockControl::default());
    let registry = Registry::new(debugger.clone(), control.clone(), NoPrompt, kill_all());

    let source = ScriptedSource {
        script: [
            Err(ReceiveError::Interrupted),
            Ok(FaultEvent::new(
                ProcessId(10),
                ThreadId(11),
                FaultKind::Exception {
                    code: 6,
                    address: None,
                },
            )),
            Err(ReceiveError::Malformed(MockError::Channel)),
            Ok(FaultEvent::new(
                ProcessId(20),
                ThreadId(20),
                FaultKind::ProcessDeleted,
            )),
            Err(ReceiveError::Fatal(MockError::Channel)),
        ]
        .into(),
    };

    let res = Listener::new(source, registry.clone()).run().await;

    assert!(matches!(res, Err(ListenerError::Channel(MockError::Channel))));
    assert_eq!(debugger.attach_count(10), 1);
    assert_eq!(debugger.attach_count(20), 1);

    // let the handlers finish
    tokio::time::timeout(Duration::from_secs(5), async {
        while !registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("handlers did not finish");

    assert_eq!(debugger.killed(), vec![ProcessId(10)]);
    assert!(control.terminated().is_empty());
}

#[test(tokio::test)]
async fn listener_survives_dispatch_failures() {
    let (debugger, control) = (MockDebugger::default(), MockControl::default());
    debugger.unattachable.lock().unwrap().insert(ProcessId(10));
    let registry = Registry::new(debugger.clone(), control.clone(), NoPrompt, kill_all());

    let source = ScriptedSource {
        script: [
            Ok(FaultEvent::new(
                ProcessId(10),
                ThreadId(10),
                FaultKind::DebuggerCall { message: 0 },
            )),
            Err(ReceiveError::Fatal(MockError::Channel)),
        ]
        .into(),
    };

    let res = Listener::new(source, registry.clone()).run().await;

    assert!(res.is_err());
    assert_eq!(control.terminated(), vec![ProcessId(10)]);
    assert!(registry.is_empty());
}

#[test(tokio::test)]
async fn listener_stops_on_shutdown() {
    let (debugger, control) = (MockDebugger::default(), MockControl::default());
    let registry = Registry::new(debugger, control, NoPrompt, kill_all());

    let shutdown = CancellationToken::new();
    let listener = Listener::new(
        ScriptedSource {
            script: Default::default(),
        },
        registry,
    )
    .with_shutdown(shutdown.clone());

    let task = tokio::spawn(listener.run());
    shutdown.cancel();

    let res = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("listener did not stop")
        .expect("join");

    assert!(res.is_ok());
}
