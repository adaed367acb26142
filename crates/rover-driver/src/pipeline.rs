//! Pipeline IO 循环模块
//!
//! Transport 线程：建立连接（带重试），随后循环"读一行 → 分类 → 排空指令槽位"。
//!
//! # 握手协议
//!
//! - `OK`：当前确认计数减一，归零时触发 *completed* 并把计数重置为 1
//! - `+<text>`：与上一条发出的指令一致则触发 *sent*；不一致时若槽位为空则重发
//! - 其余行按遥测帧解析，全部 token 合法才整帧提交并触发 *telemetry-updated*

use crate::error::DriverError;
use crate::signal::{Signal, WaitOutcome};
use crate::state::{OutstandingCommand, RoverContext};
use crossbeam_channel::Sender;
use rover_protocol::{InboundLine, ProtocolError};
use rover_serial::{Connector, LineAdapter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use rover_driver::PipelineConfig;
///
/// let config = PipelineConfig { read_timeout_ms: 20 };
/// assert_eq!(PipelineConfig::default().read_timeout_ms, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 单次读行超时（毫秒）
    ///
    /// 超时后本轮仍会排空指令槽位，因此它也是无上行数据时的最大发送延迟。
    pub read_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 50,
        }
    }
}

/// 启动（连接重试）配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// 最大连接尝试次数
    pub connect_attempts: u32,
    /// 两次尝试之间的固定退避（毫秒）
    pub connect_backoff_ms: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            connect_attempts: 3,
            connect_backoff_ms: 2000,
        }
    }
}

/// 带重试的连接
///
/// 退避只发生在两次尝试之间；退避期间收到关闭请求会提前返回 `DriverError::Released`。
///
/// # 错误
/// - `DriverError::ConnectionFailure`: 尝试次数耗尽
/// - `DriverError::Released`: 退避期间收到关闭请求
pub fn connect_with_retry<C: Connector>(
    connector: &mut C,
    config: &StartupConfig,
    ctx: &RoverContext,
) -> Result<C::Adapter, DriverError> {
    let attempts = config.connect_attempts.max(1);
    let backoff = Duration::from_millis(config.connect_backoff_ms);

    for attempt in 1..=attempts {
        match connector.connect() {
            Ok(adapter) => {
                info!("Connected to {} (attempt {}/{})", connector.describe(), attempt, attempts);
                return Ok(adapter);
            },
            Err(e) => {
                warn!(
                    "Connection to {} failed (attempt {}/{}): {}",
                    connector.describe(),
                    attempt,
                    attempts,
                    e
                );
            },
        }

        if attempt < attempts
            && ctx.signals.wait(Signal::Releasing, Some(backoff)) == WaitOutcome::Signaled
        {
            return Err(DriverError::Released);
        }
    }

    Err(DriverError::ConnectionFailure { attempts })
}

/// 单行处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// 收到 `OK`；`completed` 表示本次确认使计数归零
    Ack { completed: bool },
    /// 回显与上一条发出的指令一致
    EchoConfirmed,
    /// 回显不一致；`requeued` 表示已把上一条指令放回槽位
    EchoMismatch { requeued: bool },
    /// 没有等待回显的指令，忽略
    EchoIgnored,
    /// 遥测已提交（新序号）
    Telemetry { sequence: u64 },
    /// 畸形行，已丢弃
    Malformed(ProtocolError),
}

/// 行处理器
///
/// 持有 Transport 线程私有的握手状态：等待回显的指令文本与当前确认计数。
#[derive(Debug)]
pub struct LineProcessor {
    pending_echo: Option<String>,
    active_confirmations: u32,
}

impl Default for LineProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineProcessor {
    pub fn new() -> Self {
        Self {
            pending_echo: None,
            active_confirmations: 1,
        }
    }

    /// 等待回显的指令文本
    pub fn pending_echo(&self) -> Option<&str> {
        self.pending_echo.as_deref()
    }

    /// 当前确认计数
    pub fn active_confirmations(&self) -> u32 {
        self.active_confirmations
    }

    /// 处理一行上行数据
    pub fn process_line(&mut self, bytes: &[u8], ctx: &RoverContext) -> LineEvent {
        ctx.metrics.lines_total.fetch_add(1, Ordering::Relaxed);

        let line = match InboundLine::from_bytes(bytes) {
            Ok(line) => line,
            Err(e) => {
                ctx.metrics.malformed_lines.fetch_add(1, Ordering::Relaxed);
                match &e {
                    ProtocolError::EmptyLine => trace!("Empty line discarded"),
                    _ => debug!("Malformed line discarded ({}): {:?}", e, String::from_utf8_lossy(bytes)),
                }
                return LineEvent::Malformed(e);
            },
        };

        match line {
            InboundLine::Ack => self.on_ack(ctx),
            InboundLine::Echo(text) => self.on_echo(text, ctx),
            InboundLine::Telemetry(frame) => {
                let sequence = ctx.commit_telemetry(&frame);
                ctx.metrics.telemetry_commits.fetch_add(1, Ordering::Relaxed);
                ctx.signals.set(Signal::TelemetryUpdated);
                trace!("Telemetry #{}: {:?}", sequence, frame.values());
                LineEvent::Telemetry { sequence }
            },
        }
    }

    fn on_ack(&mut self, ctx: &RoverContext) -> LineEvent {
        ctx.metrics.acks.fetch_add(1, Ordering::Relaxed);
        self.active_confirmations = self.active_confirmations.saturating_sub(1);
        if self.active_confirmations > 0 {
            debug!("OK received, {} confirmation(s) left", self.active_confirmations);
            return LineEvent::Ack { completed: false };
        }

        self.active_confirmations = 1;
        {
            let mut register = ctx.command.lock();
            register.required_confirmations = 1;
            ctx.signals.set(Signal::Completed);
        }
        debug!("OK received, command completed");
        LineEvent::Ack { completed: true }
    }

    fn on_echo(&mut self, text: String, ctx: &RoverContext) -> LineEvent {
        let Some(pending) = self.pending_echo.as_deref() else {
            debug!("Echo {:?} with no pending command, ignored", text);
            return LineEvent::EchoIgnored;
        };

        if text == pending {
            ctx.metrics.echo_confirmed.fetch_add(1, Ordering::Relaxed);
            ctx.signals.set(Signal::Sent);
            self.pending_echo = None;
            debug!("Echo confirmed: {}", text);
            return LineEvent::EchoConfirmed;
        }

        ctx.metrics.echo_mismatches.fetch_add(1, Ordering::Relaxed);
        let requeued = {
            let mut register = ctx.command.lock();
            if register.outstanding.is_none() {
                register.outstanding = Some(OutstandingCommand::untracked(pending));
                true
            } else {
                false
            }
        };
        warn!(
            "Echo mismatch: expected {:?}, got {:?}{}",
            pending,
            text,
            if requeued { ", re-sending" } else { "" }
        );
        LineEvent::EchoMismatch { requeued }
    }

    /// 排空指令槽位
    ///
    /// 在锁内取走指令，锁外写出原始 ASCII 字节（不追加行结束符）。
    /// 写出失败时指令被丢弃，调用方的等待由超时或关闭请求释放。
    ///
    /// 返回本次写出的指令文本。
    pub fn drain<A: LineAdapter>(&mut self, adapter: &mut A, ctx: &RoverContext) -> Option<String> {
        let command = ctx.command.lock().outstanding.take()?;

        match adapter.write_all(command.text.as_bytes()) {
            Ok(()) => {
                ctx.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);
                if let Some(confirmations) = command.confirmations {
                    self.active_confirmations = confirmations;
                }
                debug!("Sent {}", command.text);
                self.pending_echo = Some(command.text.clone());
                Some(command.text)
            },
            Err(e) => {
                ctx.metrics.write_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to send {}: {}", command.text, e);
                None
            },
        }
    }
}

/// Transport 线程主循环
///
/// # 参数
/// - `connector`: 连接工厂（启动阶段可重试）
/// - `ctx`: 共享状态上下文
/// - `startup`: 连接重试配置
/// - `config`: Pipeline 配置
/// - `startup_tx`: 启动结果通道（成功后发送 `Ok(())`；失败发送错误且不触发 *ready*）
pub fn transport_loop<C: Connector>(
    mut connector: C,
    ctx: Arc<RoverContext>,
    startup: StartupConfig,
    config: PipelineConfig,
    startup_tx: Sender<Result<(), DriverError>>,
) {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Transport thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set transport thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    let mut adapter = match connect_with_retry(&mut connector, &startup, &ctx) {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Transport startup failed: {}", e);
            let _ = startup_tx.send(Err(e));
            return;
        },
    };
    adapter.set_read_timeout(Duration::from_millis(config.read_timeout_ms));

    ctx.signals.set(Signal::Ready);
    let _ = startup_tx.send(Ok(()));
    drop(startup_tx);

    let mut processor = LineProcessor::new();

    loop {
        if ctx.signals.is_releasing() {
            trace!("Transport: releasing, exiting");
            break;
        }

        match adapter.read_line() {
            Ok(Some(bytes)) => {
                trace!("RX {:?}", String::from_utf8_lossy(&bytes));
                processor.process_line(&bytes, &ctx);
            },
            Ok(None) => {
                ctx.metrics.read_timeouts.fetch_add(1, Ordering::Relaxed);
            },
            Err(e) if !e.is_fatal() => {
                ctx.metrics.read_timeouts.fetch_add(1, Ordering::Relaxed);
                trace!("Transport: non-fatal read error: {}", e);
            },
            Err(e) => {
                error!("Transport: fatal read error: {}", e);
                ctx.signals.set(Signal::Releasing);
                break;
            },
        }

        processor.drain(&mut adapter, &ctx);
    }

    drop(adapter);
    info!("Transport loop exited, connection closed");
}
