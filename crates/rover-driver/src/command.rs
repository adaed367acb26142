//! 指令通道
//!
//! 单槽位邮箱（Overwrite）：最多一条待发送指令，发送前可被新提交覆盖。
//! Watcher 与 Facade 都经由同一把锁写入槽位，两者的写入不会交错。

use crate::signal::{Signal, WaitOutcome};
use crate::state::{OutstandingCommand, RoverContext};
use rover_protocol::Command;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, trace};

/// 默认完成等待超时
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(20);

/// 提交选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// 需要的 `OK` 确认数
    pub confirmations: u32,
    /// 等待回显确认
    pub await_sent: bool,
    /// 等待确认计数归零（优先于 `await_sent`）
    pub await_completed: bool,
    /// 完成等待超时（`None` 表示无限等待，仍会被关闭请求打断）
    pub completion_timeout: Option<Duration>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            confirmations: 1,
            await_sent: false,
            await_completed: false,
            completion_timeout: Some(DEFAULT_COMPLETION_TIMEOUT),
        }
    }
}

impl SubmitOptions {
    /// 只入槽，不等待
    pub fn queued() -> Self {
        Self::default()
    }

    /// 等待回显
    pub fn sent() -> Self {
        Self {
            await_sent: true,
            ..Self::default()
        }
    }

    /// 等待完成（1 个确认）
    pub fn completed(timeout: Duration) -> Self {
        Self {
            await_completed: true,
            completion_timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = confirmations;
        self
    }
}

/// 提交结果
///
/// 超时不是错误：确认计数状态留给下一次提交重置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 已入槽（未等待）
    Queued,
    /// 已收到回显
    Sent,
    /// 确认计数已归零
    Completed,
    /// 等待超时
    TimedOut,
    /// 等待被关闭请求打断
    Released,
}

impl SubmitOutcome {
    fn from_wait(outcome: WaitOutcome, signaled: SubmitOutcome) -> Self {
        match outcome {
            WaitOutcome::Signaled => signaled,
            WaitOutcome::Released => SubmitOutcome::Released,
            WaitOutcome::TimedOut => SubmitOutcome::TimedOut,
        }
    }

    /// 是否到达了请求等待的阶段
    pub fn is_success(self) -> bool {
        matches!(
            self,
            SubmitOutcome::Queued | SubmitOutcome::Sent | SubmitOutcome::Completed
        )
    }
}

/// 指令通道句柄
///
/// 可克隆；所有克隆共享同一个上下文。
#[derive(Debug, Clone)]
pub struct CommandChannel {
    ctx: Arc<RoverContext>,
}

impl CommandChannel {
    pub fn new(ctx: Arc<RoverContext>) -> Self {
        Self { ctx }
    }

    /// 提交一条参与确认握手的指令
    ///
    /// 在临界区内清除 *sent*/*completed*、设置确认数并写入槽位；
    /// 之后在锁外按选项等待。
    ///
    /// 已请求关闭时不写入槽位，直接返回 `SubmitOutcome::Released`。
    pub fn submit(&self, command: &Command, options: SubmitOptions) -> SubmitOutcome {
        let signals = &self.ctx.signals;
        if signals.is_releasing() {
            return SubmitOutcome::Released;
        }

        let text = command.to_string();
        {
            let mut register = self.ctx.command.lock();
            signals.clear_all(&[Signal::Sent, Signal::Completed]);
            register.required_confirmations = options.confirmations;
            if let Some(previous) = register
                .outstanding
                .replace(OutstandingCommand::tracked(&text, options.confirmations))
            {
                self.ctx.metrics.slot_overwrites.fetch_add(1, Ordering::Relaxed);
                debug!("Outstanding command {} overwritten by {}", previous.text, text);
            }
        }
        trace!("Submitted {} (confirmations={})", text, options.confirmations);

        if options.await_completed {
            let outcome = signals.wait(Signal::Completed, options.completion_timeout);
            SubmitOutcome::from_wait(outcome, SubmitOutcome::Completed)
        } else if options.await_sent {
            SubmitOutcome::from_wait(signals.wait(Signal::Sent, None), SubmitOutcome::Sent)
        } else {
            SubmitOutcome::Queued
        }
    }

    /// 提交一条不参与确认握手的指令（速度修正路径）
    ///
    /// 只清除 *sent*，不触碰 *completed* 和确认计数：移动过程中插入的修正
    /// 不能干扰该移动的完成握手（固件对 `V` 不回复 `OK`）。
    pub fn submit_untracked(&self, command: &Command, await_sent: bool) -> SubmitOutcome {
        let signals = &self.ctx.signals;
        if signals.is_releasing() {
            return SubmitOutcome::Released;
        }

        let text = command.to_string();
        {
            let mut register = self.ctx.command.lock();
            signals.clear(Signal::Sent);
            if let Some(previous) = register
                .outstanding
                .replace(OutstandingCommand::untracked(&text))
            {
                self.ctx.metrics.slot_overwrites.fetch_add(1, Ordering::Relaxed);
                debug!("Outstanding command {} overwritten by {}", previous.text, text);
            }
        }
        trace!("Submitted untracked {}", text);

        if await_sent {
            SubmitOutcome::from_wait(signals.wait(Signal::Sent, None), SubmitOutcome::Sent)
        } else {
            SubmitOutcome::Queued
        }
    }

    /// 槽位中是否有待发送指令
    pub fn has_outstanding(&self) -> bool {
        self.ctx.command.lock().outstanding.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_submit_queued_writes_slot() {
        let ctx = Arc::new(RoverContext::new());
        let channel = CommandChannel::new(ctx.clone());

        let outcome = channel.submit(
            &Command::forward(100),
            SubmitOptions::queued().with_confirmations(2),
        );
        assert_eq!(outcome, SubmitOutcome::Queued);

        let register = ctx.command.lock();
        assert_eq!(
            register.outstanding,
            Some(OutstandingCommand::tracked("F1000", 2))
        );
        assert_eq!(register.required_confirmations, 2);
    }

    #[test]
    fn test_submit_overwrites_and_counts() {
        let ctx = Arc::new(RoverContext::new());
        let channel = CommandChannel::new(ctx.clone());

        channel.submit(&Command::forward(1), SubmitOptions::queued());
        channel.submit(&Command::Rotate { degrees: 90 }, SubmitOptions::queued());

        assert_eq!(
            ctx.command.lock().outstanding.as_ref().map(|c| c.text.as_str()),
            Some("R90")
        );
        assert_eq!(ctx.metrics.snapshot().slot_overwrites, 1);
    }

    #[test]
    fn test_submit_clears_sent_and_completed() {
        let ctx = Arc::new(RoverContext::new());
        let channel = CommandChannel::new(ctx.clone());
        ctx.signals.set(Signal::Sent);
        ctx.signals.set(Signal::Completed);

        channel.submit(&Command::ResetPosition, SubmitOptions::queued());
        assert!(!ctx.signals.is_set(Signal::Sent));
        assert!(!ctx.signals.is_set(Signal::Completed));
    }

    #[test]
    fn test_submit_untracked_leaves_handshake_alone() {
        let ctx = Arc::new(RoverContext::new());
        let channel = CommandChannel::new(ctx.clone());
        ctx.command.lock().required_confirmations = 3;
        ctx.signals.set(Signal::Completed);

        channel.submit_untracked(&Command::SpeedCorrection(-9750), false);

        let register = ctx.command.lock();
        assert_eq!(register.required_confirmations, 3);
        assert_eq!(
            register.outstanding,
            Some(OutstandingCommand::untracked("V-9750"))
        );
        assert!(ctx.signals.is_set(Signal::Completed));
    }

    #[test]
    fn test_submit_completion_timeout() {
        let ctx = Arc::new(RoverContext::new());
        let channel = CommandChannel::new(ctx);
        let outcome = channel.submit(
            &Command::forward(1),
            SubmitOptions::completed(Duration::from_millis(20)),
        );
        assert_eq!(outcome, SubmitOutcome::TimedOut);
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_submit_await_sent_released() {
        let ctx = Arc::new(RoverContext::new());
        let channel = CommandChannel::new(ctx.clone());

        let releaser = ctx.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            releaser.signals.set(Signal::Releasing);
        });

        let outcome = channel.submit(&Command::Light(true), SubmitOptions::sent());
        assert_eq!(outcome, SubmitOutcome::Released);
        handle.join().unwrap();
    }

    #[test]
    fn test_submit_after_release_does_not_write() {
        let ctx = Arc::new(RoverContext::new());
        let channel = CommandChannel::new(ctx.clone());
        ctx.signals.set(Signal::Releasing);

        assert_eq!(
            channel.submit(&Command::ResetPosition, SubmitOptions::queued()),
            SubmitOutcome::Released
        );
        assert!(!channel.has_outstanding());
    }
}
