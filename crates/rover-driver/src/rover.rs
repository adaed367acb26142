//! Rover 驱动句柄（对外 API）

use crate::command::{CommandChannel, SubmitOptions, SubmitOutcome};
use crate::metrics::MetricsSnapshot;
use crate::signal::{Signal, Signals, WaitOutcome};
use crate::state::{CorrectionWindow, RoverContext, TelemetrySnapshot};
use crate::status::{RangefinderOrientation, WatcherStatus};
use rover_protocol::Command;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info};

/// 带超时的 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 由看门狗线程代为 join，主线程只在通道上限时等待
        spawn(move || {
            let _ = tx.send(self.join().map(|_| ()));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                ),
            )),
        }
    }
}

/// Rover 驱动句柄
///
/// 持有 Transport 与 Watcher 两个线程。Drop 时置位 *releasing* 并限时 join。
pub struct Rover {
    ctx: Arc<RoverContext>,
    channel: CommandChannel,
    transport_thread: Option<JoinHandle<()>>,
    watcher_thread: Option<JoinHandle<()>>,
    device: String,
}

impl Rover {
    /// 线程退出的最长等待时间
    pub const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

    pub(crate) fn new(
        ctx: Arc<RoverContext>,
        transport_thread: JoinHandle<()>,
        watcher_thread: JoinHandle<()>,
        device: String,
    ) -> Self {
        Self {
            channel: CommandChannel::new(ctx.clone()),
            ctx,
            transport_thread: Some(transport_thread),
            watcher_thread: Some(watcher_thread),
            device,
        }
    }

    /// 设备描述
    pub fn device(&self) -> &str {
        &self.device
    }

    /// 共享上下文
    pub fn context(&self) -> &Arc<RoverContext> {
        &self.ctx
    }

    /// 同步信号
    pub fn signals(&self) -> &Signals {
        &self.ctx.signals
    }

    /// 提交参与确认握手的指令
    pub fn submit(&self, command: &Command, options: SubmitOptions) -> SubmitOutcome {
        self.channel.submit(command, options)
    }

    /// 提交不参与确认握手的指令
    pub fn submit_untracked(&self, command: &Command, await_sent: bool) -> SubmitOutcome {
        self.channel.submit_untracked(command, await_sent)
    }

    /// 当前遥测快照（无锁）
    pub fn telemetry(&self) -> Arc<TelemetrySnapshot> {
        self.ctx.telemetry()
    }

    /// 等待 *completed*（不清除，不重新提交）
    pub fn wait_completed(&self, timeout: Option<Duration>) -> WaitOutcome {
        self.ctx.signals.wait(Signal::Completed, timeout)
    }

    /// 在 *releasing* 上限时等待（可被关闭请求打断的 sleep）
    ///
    /// 返回 `true` 表示等待期间收到关闭请求。
    pub fn pause(&self, duration: Duration) -> bool {
        self.ctx.signals.wait(Signal::Releasing, Some(duration)) == WaitOutcome::Signaled
    }

    pub fn watcher_status(&self) -> WatcherStatus {
        self.ctx.watcher_status.get(Ordering::Acquire)
    }

    /// 设置 Watcher 状态
    ///
    /// 启动不应被修正的机动前设为 `Suppressed`/`Blocking`，结束后恢复 `Free`。
    pub fn set_watcher_status(&self, status: WatcherStatus) {
        self.ctx.watcher_status.set(status, Ordering::Release);
    }

    pub fn correction_window(&self) -> CorrectionWindow {
        self.ctx.correction.read().clone()
    }

    pub fn set_correction_window(&self, window: CorrectionWindow) {
        *self.ctx.correction.write() = window;
    }

    pub fn clear_correction_window(&self) {
        *self.ctx.correction.write() = CorrectionWindow::disabled();
    }

    pub fn orientation(&self) -> RangefinderOrientation {
        self.ctx.orientation.get()
    }

    pub fn set_orientation(&self, orientation: RangefinderOrientation) {
        self.ctx.orientation.set(orientation);
    }

    /// Transport 指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    pub fn is_ready(&self) -> bool {
        self.ctx.signals.is_set(Signal::Ready)
    }

    pub fn is_releasing(&self) -> bool {
        self.ctx.signals.is_releasing()
    }

    /// 请求关闭
    ///
    /// 返回本次调用是否真正置位了 *releasing*（此前未置位）。
    pub fn request_release(&self) -> bool {
        let newly_set = self.ctx.signals.set(Signal::Releasing);
        if newly_set {
            info!("Release requested");
        }
        newly_set
    }
}

impl Drop for Rover {
    fn drop(&mut self) {
        self.ctx.signals.set(Signal::Releasing);

        if let Some(handle) = self.watcher_thread.take()
            && let Err(_e) = handle.join_timeout(Self::JOIN_TIMEOUT)
        {
            error!(
                "Watcher thread panicked or failed to shut down within {:?}",
                Self::JOIN_TIMEOUT
            );
        }

        if let Some(handle) = self.transport_thread.take()
            && let Err(_e) = handle.join_timeout(Self::JOIN_TIMEOUT)
        {
            error!(
                "Transport thread panicked or failed to shut down within {:?}",
                Self::JOIN_TIMEOUT
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RoverBuilder;
    use crate::pipeline::PipelineConfig;
    use rover_serial::{AutoReply, MockConnector, MockHandle, MockLineAdapter};
    use std::time::Instant;

    fn mock_rover() -> (Rover, MockHandle) {
        let (adapter, handle) = MockLineAdapter::new();
        let rover = RoverBuilder::new("mock")
            .pipeline_config(PipelineConfig { read_timeout_ms: 2 })
            .build_with_connector(MockConnector::new(adapter))
            .unwrap();
        (rover, handle)
    }

    #[test]
    fn test_submit_round_trip_completed() {
        let (rover, handle) = mock_rover();
        handle.set_auto_reply(AutoReply::echo_and_ack());

        let outcome = rover.submit(
            &Command::Rotate { degrees: 45 },
            SubmitOptions::completed(Duration::from_secs(2)),
        );
        assert_eq!(outcome, SubmitOutcome::Completed);
        assert_eq!(handle.written(), vec!["R45"]);
    }

    #[test]
    fn test_submit_two_confirmations() {
        let (rover, handle) = mock_rover();
        handle.set_auto_reply(AutoReply::echo_only());

        let submitter = {
            let ctx = rover.context().clone();
            std::thread::spawn(move || {
                CommandChannel::new(ctx).submit(
                    &Command::forward(10),
                    SubmitOptions::completed(Duration::from_secs(2)).with_confirmations(2),
                )
            })
        };

        assert!(handle.wait_for_written(1, Duration::from_secs(1)));
        handle.push_line("OK");
        std::thread::sleep(Duration::from_millis(20));
        assert!(!rover.signals().is_set(Signal::Completed));
        handle.push_line("OK");

        assert_eq!(submitter.join().unwrap(), SubmitOutcome::Completed);
        assert_eq!(rover.context().command.lock().required_confirmations, 1);
    }

    #[test]
    fn test_telemetry_flows_to_snapshot() {
        let (rover, handle) = mock_rover();
        handle.push_line("12 345 0 0 0 77 0");
        assert!(handle.wait_for_drained(Duration::from_secs(1)));

        let deadline = Instant::now() + Duration::from_secs(1);
        while rover.telemetry().sequence == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        let telemetry = rover.telemetry();
        assert_eq!(telemetry.values, [12, 345, 0, 0, 0, 77, 0]);
        assert_eq!(telemetry.hand_angle(), 77);
    }

    #[test]
    fn test_request_release_once() {
        let (rover, _handle) = mock_rover();
        assert!(rover.request_release());
        assert!(!rover.request_release());
        assert!(rover.is_releasing());
        assert_eq!(
            rover.submit(&Command::ResetPosition, SubmitOptions::sent()),
            SubmitOutcome::Released
        );
    }

    #[test]
    fn test_pause_interrupted_by_release() {
        let (rover, _handle) = mock_rover();
        let ctx = rover.context().clone();
        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            ctx.signals.set(Signal::Releasing);
        });

        let start = Instant::now();
        assert!(rover.pause(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(5));
        releaser.join().unwrap();
    }

    #[test]
    fn test_drop_joins_threads() {
        let (rover, _handle) = mock_rover();
        let start = Instant::now();
        drop(rover);
        assert!(start.elapsed() < Rover::JOIN_TIMEOUT);
    }
}
