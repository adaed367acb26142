//! 遥测监控
//!
//! 按固定频率打印遥测，直到 Ctrl+C 或链路断开。

use anyhow::{Context, Result};
use rover_sdk::client::{Robot, TelemetryView};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub fn run(robot: &Robot, hz: u32) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("设置 Ctrl+C 处理失败")?;

    let interval = refresh_interval(hz);
    let view = robot.telemetry_view();
    println!("📊 监控中 ({} Hz)...", hz.max(1));
    println!("按 Ctrl+C 停止\n");

    let mut last_sequence = None;
    while running.load(Ordering::SeqCst) {
        if robot.is_released() {
            println!("⚠️  链路已断开");
            break;
        }

        let telemetry = view.snapshot();
        if last_sequence != Some(telemetry.sequence) {
            last_sequence = Some(telemetry.sequence);
            print_frame(&view, telemetry.sequence);
        }

        // 关闭请求可打断等待
        if robot.rover().pause(interval) {
            break;
        }
    }

    println!("\n✅ 监控已结束 ({:?})", robot.rover().metrics());
    Ok(())
}

fn refresh_interval(hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(hz.max(1)))
}

fn print_frame(view: &TelemetryView, sequence: u64) {
    let [ranges, hand] = view.status_lines();
    println!(
        "#{:<6} {} | {} | 朝向: {:?}",
        sequence,
        ranges,
        hand,
        view.orientation()
    );
}
