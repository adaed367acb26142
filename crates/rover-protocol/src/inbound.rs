//! 上行行解析
//!
//! 固件上报的每一行恰好属于以下三类之一：
//! - `OK`：执行完成确认
//! - `+<text>`：指令回显确认
//! - 空白分隔的非负整数：遥测帧
//!
//! 遥测帧采用"先校验、后提交"：任意 token 非法则整行作废，
//! 绝不产生部分写入。

use crate::ProtocolError;
use crate::constants::{ACK_LINE, ECHO_MARKER, TELEMETRY_LEN};
use smallvec::SmallVec;

/// 已校验的遥测帧
///
/// 仅保存 token 的数值，按位置对应遥测槽位。超过 [`TELEMETRY_LEN`]
/// 的 token 在校验时保留（参与校验），但提交时被忽略。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryFrame {
    values: SmallVec<[u32; TELEMETRY_LEN]>,
}

impl TelemetryFrame {
    /// 解析并校验一行遥测文本
    ///
    /// # Example
    ///
    /// ```
    /// use rover_protocol::TelemetryFrame;
    ///
    /// let frame = TelemetryFrame::parse("10 550 0 0 0 90 0").unwrap();
    /// assert_eq!(frame.values(), &[10, 550, 0, 0, 0, 90, 0]);
    /// assert!(TelemetryFrame::parse("10 -5 0").is_err());
    /// ```
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut values = SmallVec::new();
        for (index, token) in line.split_whitespace().enumerate() {
            values.push(parse_token(index, token)?);
        }
        if values.is_empty() {
            return Err(ProtocolError::EmptyLine);
        }
        Ok(Self { values })
    }

    /// 帧内数值（按上报顺序）
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// 帧内 token 数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空（解析成功的帧永远不为空）
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 以 `base` 为底生成新的完整遥测向量
    ///
    /// 按位置覆盖；缺失的槽位保留 `base` 中的旧值，多余 token 被忽略。
    pub fn apply_to(&self, base: &[u32; TELEMETRY_LEN]) -> [u32; TELEMETRY_LEN] {
        let mut next = *base;
        for (slot, value) in next.iter_mut().zip(self.values.iter()) {
            *slot = *value;
        }
        next
    }
}

fn parse_token(index: usize, token: &str) -> Result<u32, ProtocolError> {
    let invalid = || ProtocolError::InvalidTelemetryToken {
        index,
        token: token.to_string(),
    };
    // 只接受纯 ASCII 数字：拒绝符号位（"+5"、"-5"）和小数
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    token.parse::<u32>().map_err(|_| invalid())
}

/// 上行行分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// `OK`：确认计数减一
    Ack,
    /// `+<text>`：回显确认，携带去掉前缀并修剪后的指令文本
    Echo(String),
    /// 已校验的遥测帧
    Telemetry(TelemetryFrame),
}

impl InboundLine {
    /// 对一行文本分类（调用方无需预先 trim）
    ///
    /// # 错误
    /// - `ProtocolError::EmptyLine`: 空行或仅含空白
    /// - `ProtocolError::InvalidTelemetryToken`: 非确认/回显行，且包含非法 token
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::EmptyLine);
        }
        if line == ACK_LINE {
            return Ok(InboundLine::Ack);
        }
        if let Some(echo) = line.strip_prefix(ECHO_MARKER) {
            return Ok(InboundLine::Echo(echo.trim().to_string()));
        }
        TelemetryFrame::parse(line).map(InboundLine::Telemetry)
    }

    /// 从原始字节解析
    ///
    /// 无法按 UTF-8 解码的字节序列返回 `ProtocolError::NotUtf8`。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NotUtf8)?;
        Self::parse(text)
    }
}
