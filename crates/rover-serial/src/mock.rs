//! Mock 行适配器
//!
//! 无硬件依赖的脚本化适配器，用于单元测试和集成测试：
//! - 测试通过 [`MockHandle`] 注入上行行、检查下行写出
//! - 可选 [`AutoReply`]：写出指令后自动回显 `+<cmd>` 和/或 `OK`
//! - [`MockConnector`] 可模拟前 N 次连接失败

use crate::{Connector, LineAdapter, SerialError};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 自动应答策略
#[derive(Debug, Clone, Default)]
pub struct AutoReply {
    /// 写出后自动回显 `+<cmd>`
    pub echo: bool,
    /// 写出后自动回复 `OK`
    pub ack: bool,
    /// 不回复 `OK` 的指令字母（模拟固件不确认的指令）
    pub no_ack_opcodes: Vec<char>,
}

impl AutoReply {
    /// 只回显，不确认
    pub fn echo_only() -> Self {
        Self {
            echo: true,
            ack: false,
            no_ack_opcodes: Vec::new(),
        }
    }

    /// 回显 + 确认（`V` 和 `Y` 与固件一致，不确认）
    pub fn echo_and_ack() -> Self {
        Self {
            echo: true,
            ack: true,
            no_ack_opcodes: vec!['V', 'Y'],
        }
    }
}

#[derive(Default)]
struct MockState {
    inbound: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    closed: bool,
    auto_reply: AutoReply,
}

#[derive(Default)]
struct Shared {
    state: Mutex<MockState>,
    changed: Condvar,
}

/// Mock 行适配器（交给 Transport 线程）
pub struct MockLineAdapter {
    shared: Arc<Shared>,
    read_timeout: Duration,
}

/// Mock 控制句柄（留在测试线程）
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Shared>,
}

impl MockLineAdapter {
    /// 创建适配器和对应的控制句柄
    pub fn new() -> (Self, MockHandle) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: shared.clone(),
                read_timeout: Duration::from_millis(5),
            },
            MockHandle { shared },
        )
    }
}

impl LineAdapter for MockLineAdapter {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, SerialError> {
        let mut state = self.shared.state.lock();
        if state.inbound.is_empty() && !state.closed {
            let _ = self.shared.changed.wait_for(&mut state, self.read_timeout);
        }
        if let Some(line) = state.inbound.pop_front() {
            return Ok(Some(line));
        }
        if state.closed {
            return Err(SerialError::Closed);
        }
        Ok(None)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(SerialError::Closed);
        }
        state.written.push(data.to_vec());

        let reply = state.auto_reply.clone();
        if reply.echo {
            let mut echo = vec![b'+'];
            echo.extend_from_slice(data);
            state.inbound.push_back(echo);
        }
        let opcode = data.first().map(|&b| b as char);
        if reply.ack && !opcode.is_some_and(|op| reply.no_ack_opcodes.contains(&op)) {
            state.inbound.push_back(b"OK".to_vec());
        }

        self.shared.changed.notify_all();
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

impl MockHandle {
    /// 注入一行上行文本
    pub fn push_line(&self, line: &str) {
        self.push_bytes(line.as_bytes());
    }

    /// 注入一行原始字节（可用于构造非 UTF-8 数据）
    pub fn push_bytes(&self, bytes: &[u8]) {
        let mut state = self.shared.state.lock();
        state.inbound.push_back(bytes.to_vec());
        self.shared.changed.notify_all();
    }

    /// 设置自动应答策略
    pub fn set_auto_reply(&self, reply: AutoReply) {
        self.shared.state.lock().auto_reply = reply;
    }

    /// 已写出的指令（按写出顺序）
    pub fn written(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .written
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    /// 已写出的指令条数
    pub fn written_count(&self) -> usize {
        self.shared.state.lock().written.len()
    }

    /// 尚未被读取的上行行数
    pub fn inbound_len(&self) -> usize {
        self.shared.state.lock().inbound.len()
    }

    /// 等待写出条数达到 `count`，超时返回 false
    pub fn wait_for_written(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.written.len() < count {
            if self
                .shared
                .changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.written.len() >= count;
            }
        }
        true
    }

    /// 等待所有注入的上行行被读走，超时返回 false
    pub fn wait_for_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.inbound_len() == 0 {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.inbound_len() == 0
    }

    /// 模拟设备断开：之后的读写返回 `SerialError::Closed`
    pub fn close(&self) {
        self.shared.state.lock().closed = true;
        self.shared.changed.notify_all();
    }
}

/// Mock 连接工厂
///
/// 前 `failures` 次 `connect()` 返回错误，之后交出适配器。
pub struct MockConnector {
    failures: usize,
    adapter: Option<MockLineAdapter>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl MockConnector {
    /// 第一次即连接成功
    pub fn new(adapter: MockLineAdapter) -> Self {
        Self::failing_first(0, adapter)
    }

    /// 前 `failures` 次连接失败
    pub fn failing_first(failures: usize, adapter: MockLineAdapter) -> Self {
        Self {
            failures,
            adapter: Some(adapter),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 永远连接失败
    pub fn always_failing() -> Self {
        Self {
            failures: usize::MAX,
            adapter: None,
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 连接尝试时间记录（可在交给 Transport 之前克隆出来）
    pub fn attempt_log(&self) -> Arc<Mutex<Vec<Instant>>> {
        self.attempts.clone()
    }
}

impl Connector for MockConnector {
    type Adapter = MockLineAdapter;

    fn connect(&mut self) -> Result<Self::Adapter, SerialError> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            attempts.push(Instant::now());
            attempts.len()
        };
        if attempt <= self.failures {
            return Err(SerialError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "mock device not present",
            )));
        }
        self.adapter.take().ok_or(SerialError::Closed)
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
