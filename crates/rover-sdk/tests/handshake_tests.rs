//! 握手协议与遥测提交测试
//!
//! 直接驱动 `LineProcessor`，验证：
//! 1. 含任何非法 token 的遥测行不修改遥测、不触发信号
//! 2. 合法遥测行恰好提交一次、触发一次信号
//! 3. n 个确认 + n 个 `OK` → *completed* 恰好触发一次，计数重置为 1
//! 4. 并发读者永远看不到"半帧"

use proptest::prelude::*;
use rover_sdk::driver::{
    LineEvent, LineProcessor, OutstandingCommand, RoverContext, Signal, SubmitOptions,
};
use rover_sdk::driver::CommandChannel;
use rover_sdk::protocol::Command;
use rover_sdk::serial::MockLineAdapter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

fn render(values: &[u32]) -> String {
    values.iter().map(u32::to_string).collect::<Vec<_>>().join(" ")
}

proptest! {
    #[test]
    fn prop_invalid_token_leaves_telemetry_unchanged(
        base in prop::array::uniform7(0u32..10_000),
        values in prop::collection::vec(0u32..10_000, 1..7),
        bad_index in 0usize..7,
        bad_token in prop_oneof![
            Just("-1".to_string()),
            Just("+3".to_string()),
            Just("1.5".to_string()),
            Just("99999999999".to_string()),
            "[a-z]{1,4}",
        ],
    ) {
        let ctx = RoverContext::new();
        let mut processor = LineProcessor::new();
        processor.process_line(render(&base).as_bytes(), &ctx);
        ctx.signals.clear(Signal::TelemetryUpdated);
        let before = ctx.telemetry();

        let mut tokens: Vec<String> = values.iter().map(u32::to_string).collect();
        // 行首的 `+` 会被识别为回显，非法 token 不放在第一位
        let index = bad_index.clamp(1, tokens.len());
        tokens.insert(index, bad_token);
        let line = tokens.join(" ");

        let event = processor.process_line(line.as_bytes(), &ctx);
        prop_assert!(matches!(event, LineEvent::Malformed(_)), "line {:?} accepted", line);
        prop_assert_eq!(ctx.telemetry().values, before.values);
        prop_assert_eq!(ctx.telemetry().sequence, before.sequence);
        prop_assert!(!ctx.signals.is_set(Signal::TelemetryUpdated));
    }

    #[test]
    fn prop_valid_line_commits_once(values in prop::collection::vec(0u32..100_000, 1..10)) {
        let ctx = RoverContext::new();
        let mut processor = LineProcessor::new();

        let event = processor.process_line(render(&values).as_bytes(), &ctx);
        prop_assert_eq!(event, LineEvent::Telemetry { sequence: 1 });
        prop_assert!(ctx.signals.is_set(Signal::TelemetryUpdated));
        prop_assert_eq!(ctx.metrics.snapshot().telemetry_commits, 1);

        let snapshot = ctx.telemetry();
        for (slot, value) in snapshot.values.iter().zip(values.iter()) {
            prop_assert_eq!(slot, value);
        }
        for slot in snapshot.values.iter().skip(values.len()) {
            prop_assert_eq!(*slot, 0);
        }
    }

    #[test]
    fn prop_n_acks_complete_exactly_once(n in 1u32..8) {
        let ctx = Arc::new(RoverContext::new());
        let (mut adapter, _handle) = MockLineAdapter::new();
        let mut processor = LineProcessor::new();

        CommandChannel::new(ctx.clone()).submit(
            &Command::forward(10),
            SubmitOptions::queued().with_confirmations(n),
        );
        processor.drain(&mut adapter, &ctx);

        let mut completions = 0;
        for i in 1..=n {
            if processor.process_line(b"OK", &ctx) == (LineEvent::Ack { completed: true }) {
                completions += 1;
                prop_assert_eq!(i, n);
            }
        }
        prop_assert_eq!(completions, 1);
        prop_assert!(ctx.signals.is_set(Signal::Completed));
        prop_assert_eq!(processor.active_confirmations(), 1);
        prop_assert_eq!(ctx.command.lock().required_confirmations, 1);
    }
}

#[test]
fn test_echo_mismatch_then_match() {
    let ctx = RoverContext::new();
    let (mut adapter, handle) = MockLineAdapter::new();
    let mut processor = LineProcessor::new();

    ctx.command.lock().outstanding = Some(OutstandingCommand::tracked("F1000", 1));
    processor.drain(&mut adapter, &ctx);

    assert_eq!(
        processor.process_line(b"+F100", &ctx),
        LineEvent::EchoMismatch { requeued: true }
    );
    assert!(!ctx.signals.is_set(Signal::Sent));

    processor.drain(&mut adapter, &ctx);
    assert_eq!(processor.process_line(b"+F1000", &ctx), LineEvent::EchoConfirmed);
    assert!(ctx.signals.is_set(Signal::Sent));
    assert_eq!(handle.written(), vec!["F1000", "F1000"]);

    let metrics = ctx.metrics.snapshot();
    assert_eq!(metrics.echo_mismatches, 1);
    assert_eq!(metrics.echo_confirmed, 1);
}

/// 读者与写者并发：每次读到的向量必须是某一整帧（所有槽位相同）
#[test]
fn test_concurrent_readers_see_whole_frames() {
    let ctx = Arc::new(RoverContext::new());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = ctx.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut reads = 0u64;
                while !done.load(Ordering::Acquire) {
                    let snapshot = ctx.telemetry();
                    let first = snapshot.values[0];
                    assert!(
                        snapshot.values.iter().all(|&v| v == first),
                        "torn read: {:?}",
                        snapshot.values
                    );
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    let mut processor = LineProcessor::new();
    for k in 0..5_000u32 {
        processor.process_line(render(&[k; 7]).as_bytes(), &ctx);
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(ctx.telemetry().sequence, 5_000);
}
