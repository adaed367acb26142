//! 同步信号
//!
//! 五个可置位/可清除/可等待的二值信号：`Ready`、`Sent`、`Completed`、
//! `Releasing`、`TelemetryUpdated`。
//!
//! 所有信号共享同一把锁和同一个条件变量，因此任何等待都是
//! "目标信号 OR `Releasing`" 的复合等待：置位 `Releasing` 会唤醒所有
//! 阻塞中的等待者，关闭流程不会死锁。

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// 信号种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Signal {
    /// Transport 已连接并进入主循环
    Ready = 1 << 0,
    /// 当前指令已写出并收到回显
    Sent = 1 << 1,
    /// 确认计数归零
    Completed = 1 << 2,
    /// 请求关闭
    Releasing = 1 << 3,
    /// 刚提交了一帧有效遥测
    TelemetryUpdated = 1 << 4,
}

impl Signal {
    #[inline]
    fn bit(self) -> u8 {
        self as u8
    }
}

/// 等待结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// 目标信号已置位
    Signaled,
    /// 目标信号未置位，但收到关闭请求
    Released,
    /// 超时
    TimedOut,
}

/// 信号集合
#[derive(Debug, Default)]
pub struct Signals {
    flags: Mutex<u8>,
    changed: Condvar,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    /// 置位信号并唤醒所有等待者
    ///
    /// 返回本次调用是否改变了状态（此前未置位）。
    pub fn set(&self, signal: Signal) -> bool {
        let mut flags = self.flags.lock();
        let newly_set = *flags & signal.bit() == 0;
        *flags |= signal.bit();
        self.changed.notify_all();
        newly_set
    }

    /// 清除信号
    pub fn clear(&self, signal: Signal) {
        *self.flags.lock() &= !signal.bit();
    }

    /// 在同一临界区内清除多个信号
    pub fn clear_all(&self, signals: &[Signal]) {
        let mask = signals.iter().fold(0u8, |mask, s| mask | s.bit());
        *self.flags.lock() &= !mask;
    }

    /// 信号是否已置位
    pub fn is_set(&self, signal: Signal) -> bool {
        *self.flags.lock() & signal.bit() != 0
    }

    /// 是否已请求关闭
    pub fn is_releasing(&self) -> bool {
        self.is_set(Signal::Releasing)
    }

    /// 等待信号（复合等待：同时监听 `Releasing`）
    ///
    /// `timeout = None` 表示无限等待（仍会被 `Releasing` 打断）。
    pub fn wait(&self, signal: Signal, timeout: Option<Duration>) -> WaitOutcome {
        self.wait_inner(signal, timeout, false)
    }

    /// 等待信号并在同一临界区内清除它
    ///
    /// 用于事件式消费（如 `TelemetryUpdated`），避免"等待-清除"之间丢失更新。
    pub fn wait_and_clear(&self, signal: Signal, timeout: Option<Duration>) -> WaitOutcome {
        self.wait_inner(signal, timeout, true)
    }

    fn wait_inner(&self, signal: Signal, timeout: Option<Duration>, consume: bool) -> WaitOutcome {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut flags = self.flags.lock();

        let check = |flags: &mut u8| -> Option<WaitOutcome> {
            if *flags & signal.bit() != 0 {
                if consume {
                    *flags &= !signal.bit();
                }
                Some(WaitOutcome::Signaled)
            } else if *flags & Signal::Releasing.bit() != 0 {
                Some(WaitOutcome::Released)
            } else {
                None
            }
        };

        loop {
            if let Some(outcome) = check(&mut *flags) {
                return outcome;
            }
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut flags, deadline).timed_out() {
                        return check(&mut *flags).unwrap_or(WaitOutcome::TimedOut);
                    }
                },
                None => self.changed.wait(&mut flags),
            }
        }
    }
}
