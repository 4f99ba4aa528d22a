//! Lifecycle tests for the log tail supervisor
//!
//! These spawn real `tail` subprocesses over temp files, so they are
//! timing-tolerant: assertions poll with generous deadlines instead of
//! assuming exact scheduling.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::tempdir;

use vigil::actors::tail::{MonitoredSource, TailHandle};
use vigil::config::Tuning;
use vigil::parsers::LineParser;
use vigil::{AlertCategory, RecipientId};

use crate::helpers::recording_dispatcher;

fn fast_tuning() -> Tuning {
    Tuning {
        missing_retry_secs: 1,
        read_error_retry_secs: 1,
        send_delay_ms: 0,
    }
}

fn ssh_source(path: &Path) -> MonitoredSource {
    MonitoredSource {
        path: path.to_path_buf(),
        category: AlertCategory::Logins,
        parser: LineParser::ssh_logins(),
    }
}

fn append_line(path: &Path, line: &str) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .unwrap();
    writeln!(file, "{line}").unwrap();
    file.flush().unwrap();
}

/// Poll `sent` until `predicate` holds or the deadline passes.
async fn wait_until(
    sent: &Arc<Mutex<Vec<(RecipientId, String)>>>,
    deadline: Duration,
    predicate: impl Fn(&[(RecipientId, String)]) -> bool,
) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate(&sent.lock().unwrap()) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn matched_lines_are_dispatched_and_noise_is_not() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("auth.log");
    append_line(&log_path, "historical line before start");

    let (dispatcher, sent) = recording_dispatcher(vec![1]);
    let (handle, task) = TailHandle::spawn(ssh_source(&log_path), dispatcher, &fast_tuning());

    // let tail attach before appending
    tokio::time::sleep(Duration::from_millis(500)).await;

    append_line(&log_path, "Failed password for bob from 10.0.0.9 port 22 ssh2");
    append_line(&log_path, "Accepted password for alice from 10.0.0.5 port 22 ssh2");

    let delivered = wait_until(&sent, Duration::from_secs(5), |messages| {
        messages.iter().any(|(_, text)| text.contains("alice"))
    })
    .await;
    assert!(delivered, "expected the accepted-login line to be dispatched");

    let messages = sent.lock().unwrap().clone();
    assert!(messages.iter().all(|(_, text)| !text.contains("bob")));
    assert!(
        messages
            .iter()
            .all(|(_, text)| !text.contains("historical")),
        "content written before startup must not be replayed"
    );
    assert!(messages.iter().any(|(_, text)| text.contains("10.0.0.5")));

    handle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("task must exit after shutdown")
        .unwrap();
}

#[tokio::test]
async fn missing_file_is_retried_until_it_appears() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("not-yet.log");

    let (dispatcher, sent) = recording_dispatcher(vec![1]);
    let (handle, task) = TailHandle::spawn(ssh_source(&log_path), dispatcher, &fast_tuning());

    // supervisor is in its missing-file backoff now
    tokio::time::sleep(Duration::from_millis(300)).await;
    append_line(&log_path, "created after startup");

    // one retry interval plus stream startup
    tokio::time::sleep(Duration::from_millis(1500)).await;
    append_line(&log_path, "Accepted publickey for carol from 10.1.1.1 port 22 ssh2");

    let delivered = wait_until(&sent, Duration::from_secs(6), |messages| {
        messages.iter().any(|(_, text)| text.contains("carol"))
    })
    .await;
    assert!(delivered, "supervisor should pick the file up once it exists");

    handle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("task must exit after shutdown")
        .unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_file_is_retried_until_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let log_path = dir.path().join("locked.log");
    append_line(&log_path, "");
    std::fs::set_permissions(&log_path, std::fs::Permissions::from_mode(0o000)).unwrap();

    // file modes don't stop root; only assert the denied phase when the
    // barrier actually holds
    let denied = std::fs::File::open(&log_path).is_err();

    let (dispatcher, sent) = recording_dispatcher(vec![1]);
    let (handle, task) = TailHandle::spawn(ssh_source(&log_path), dispatcher, &fast_tuning());

    if denied {
        // supervisor sits in its backoff, same as for a missing file
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(sent.lock().unwrap().is_empty());
        assert!(
            !task.is_finished(),
            "a permission error must never terminate the supervisor"
        );
    }

    std::fs::set_permissions(&log_path, std::fs::Permissions::from_mode(0o644)).unwrap();

    // one retry interval plus stream startup
    tokio::time::sleep(Duration::from_millis(1500)).await;
    append_line(&log_path, "Accepted password for erin from 10.3.3.3 port 22 ssh2");

    let delivered = wait_until(&sent, Duration::from_secs(6), |messages| {
        messages.iter().any(|(_, text)| text.contains("erin"))
    })
    .await;
    assert!(delivered, "supervisor should recover once the file becomes readable");

    handle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("task must exit after shutdown")
        .unwrap();
}

#[tokio::test]
async fn stream_restarts_after_tail_process_dies() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("restart.log");
    append_line(&log_path, "");

    let (dispatcher, sent) = recording_dispatcher(vec![1]);
    let (handle, task) = TailHandle::spawn(ssh_source(&log_path), dispatcher, &fast_tuning());

    tokio::time::sleep(Duration::from_millis(500)).await;

    // kill the tail child out from under the supervisor
    let killed = std::process::Command::new("pkill")
        .arg("-f")
        .arg(log_path.to_str().unwrap())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    assert!(killed, "expected to find and kill the tail process");

    // supervisor restarts the stream; lines appended afterwards still arrive
    tokio::time::sleep(Duration::from_millis(1000)).await;
    append_line(&log_path, "Accepted password for dave from 10.2.2.2 port 22 ssh2");

    let delivered = wait_until(&sent, Duration::from_secs(6), |messages| {
        messages.iter().any(|(_, text)| text.contains("dave"))
    })
    .await;
    assert!(delivered, "lines after the restart must be dispatched");

    handle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("task must exit after shutdown")
        .unwrap();
}

#[tokio::test]
async fn shutdown_is_bounded() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("bounded.log");
    append_line(&log_path, "");

    let (dispatcher, _sent) = recording_dispatcher(vec![1]);
    let (handle, task) = TailHandle::spawn(ssh_source(&log_path), dispatcher, &fast_tuning());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let start = tokio::time::Instant::now();
    handle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(4), task)
        .await
        .expect("shutdown must complete within the teardown bounds")
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(4));
}
