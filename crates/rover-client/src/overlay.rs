//! 显示协作接口
//!
//! 摄像头画面本身不在本 crate 内；这里只定义显示端需要的两样东西：
//! - [`Overlay`]：视觉算法向画面叠加标记和文字
//! - [`TelemetryView`]：只读的遥测句柄，供画面显示测距和机械手角度

use parking_lot::Mutex;
use rover_driver::{RangefinderOrientation, RoverContext, TelemetrySnapshot};
use std::sync::Arc;

/// 画面叠加层
///
/// 方法取 `&self`，实现方自行处理内部可变性（显示线程与算法线程并发调用）。
pub trait Overlay: Send + Sync {
    /// 夹爪位置标记（`None` 清除）
    fn draw_grabber_pos(&self, pos: Option<(u16, u16)>);

    /// 目标物体位置标记（`None` 清除）
    fn draw_object_pos(&self, pos: Option<(u16, u16)>);

    /// 底部状态文字
    fn set_text(&self, text: &str);
}

/// 不显示任何内容的叠加层
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOverlay;

impl Overlay for NullOverlay {
    fn draw_grabber_pos(&self, _pos: Option<(u16, u16)>) {}
    fn draw_object_pos(&self, _pos: Option<(u16, u16)>) {}
    fn set_text(&self, _text: &str) {}
}

/// 叠加层内容
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OverlayState {
    pub grabber_pos: Option<(u16, u16)>,
    pub object_pos: Option<(u16, u16)>,
    pub text: String,
}

/// 共享叠加层
///
/// 写入方（视觉算法）与读取方（画面渲染）共享同一份 [`OverlayState`]，
/// 渲染线程每帧取一次快照。
#[derive(Debug, Default, Clone)]
pub struct SharedOverlay {
    state: Arc<Mutex<OverlayState>>,
}

impl SharedOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前内容快照
    pub fn snapshot(&self) -> OverlayState {
        self.state.lock().clone()
    }
}

impl Overlay for SharedOverlay {
    fn draw_grabber_pos(&self, pos: Option<(u16, u16)>) {
        self.state.lock().grabber_pos = pos;
    }

    fn draw_object_pos(&self, pos: Option<(u16, u16)>) {
        self.state.lock().object_pos = pos;
    }

    fn set_text(&self, text: &str) {
        let mut state = self.state.lock();
        state.text.clear();
        state.text.push_str(text);
    }
}

/// 只读遥测句柄
///
/// 只能读取遥测快照和测距仪朝向，不能写遥测、不能提交指令。
#[derive(Debug, Clone)]
pub struct TelemetryView {
    ctx: Arc<RoverContext>,
}

impl TelemetryView {
    pub(crate) fn new(ctx: Arc<RoverContext>) -> Self {
        Self { ctx }
    }

    /// 当前遥测快照
    pub fn snapshot(&self) -> Arc<TelemetrySnapshot> {
        self.ctx.telemetry()
    }

    /// 测距仪朝向
    pub fn orientation(&self) -> RangefinderOrientation {
        self.ctx.orientation.get()
    }

    /// 画面上显示的状态行（测距、机械手角度）
    pub fn status_lines(&self) -> [String; 2] {
        let telemetry = self.snapshot();
        [
            format!(
                "Rangefinders: {} {}",
                telemetry.primary_range(),
                telemetry.values[rover_protocol::SLOT_LEFT_RANGE]
            ),
            format!("Hand: {}", telemetry.hand_angle()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_protocol::TelemetryFrame;

    #[test]
    fn test_shared_overlay_snapshot() {
        let overlay = SharedOverlay::new();
        let renderer = overlay.clone();

        overlay.draw_grabber_pos(Some((320, 400)));
        overlay.draw_object_pos(Some((10, 20)));
        overlay.set_text("searching");
        overlay.draw_object_pos(None);

        let state = renderer.snapshot();
        assert_eq!(state.grabber_pos, Some((320, 400)));
        assert_eq!(state.object_pos, None);
        assert_eq!(state.text, "searching");
    }

    #[test]
    fn test_null_overlay_as_trait_object() {
        let overlay: Box<dyn Overlay> = Box::new(NullOverlay);
        overlay.set_text("ignored");
        overlay.draw_grabber_pos(None);
    }

    #[test]
    fn test_telemetry_view_status_lines() {
        let ctx = Arc::new(RoverContext::new());
        let view = TelemetryView::new(ctx.clone());
        ctx.commit_telemetry(&TelemetryFrame::parse("12 345 0 0 0 90 0").unwrap());

        assert_eq!(view.status_lines(), ["Rangefinders: 12 345".to_string(), "Hand: 90".to_string()]);
        assert_eq!(view.orientation(), RangefinderOrientation::Forward);
        assert_eq!(view.snapshot().sequence, 1);
    }
}
