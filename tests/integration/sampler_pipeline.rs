//! End-to-end sampler behavior through the actor handle

use std::time::Duration;

use vigil::actors::sampler::SamplerHandle;
use vigil::config::Limits;

use crate::helpers::recording_dispatcher;

/// Limits with an interval long enough that only manual ticks fire.
fn manual_limits(cpu: f32, ram: f32, disk: f32) -> Limits {
    Limits {
        cpu_pct: cpu,
        ram_pct: ram,
        disk_pct: disk,
        cooldown_secs: 3600,
        sample_interval_secs: 3600,
    }
}

#[tokio::test]
async fn impossible_thresholds_never_alert() {
    let (dispatcher, sent) = recording_dispatcher(vec![1]);
    let (handle, task) = SamplerHandle::spawn(manual_limits(1000.0, 1000.0, 1000.0), dispatcher);

    handle.sample_now().await.unwrap();
    handle.sample_now().await.unwrap();

    assert!(sent.lock().unwrap().is_empty());

    let state = handle.get_state().await.unwrap();
    assert!(!state.cpu.exceeded);
    assert!(!state.ram.exceeded);
    assert!(!state.disk.exceeded);

    handle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn zero_thresholds_alert_once_and_stay_quiet() {
    let (dispatcher, sent) = recording_dispatcher(vec![1]);
    let (handle, task) = SamplerHandle::spawn(manual_limits(0.0, 0.0, 0.0), dispatcher);

    handle.sample_now().await.unwrap();

    {
        let messages = sent.lock().unwrap();
        // all three metrics crossed in the same tick -> one combined message
        assert_eq!(messages.len(), 1);
        let (_, text) = &messages[0];
        assert!(text.contains("CPU usage"));
        assert!(text.contains("RAM usage"));
        assert!(text.contains("Disk usage"));
    }

    let state = handle.get_state().await.unwrap();
    assert!(state.cpu.exceeded && state.ram.exceeded && state.disk.exceeded);

    // still above threshold, inside the cooldown: deduplicated
    handle.sample_now().await.unwrap();
    assert_eq!(sent.lock().unwrap().len(), 1);

    handle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}
