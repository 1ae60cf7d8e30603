pub mod pointer;
pub mod touch;
pub mod window;

pub use pointer::{
    CursorSample, Modifiers, MouseButton, ScrollEvent, ScrollPhase, SwipeDirection, SwipeEvent,
};
pub use touch::ContactFrame;
pub use window::{
    FocusVerdict, FocusedWindow, Pid, Point, Rect, ScreenDescriptor, SpaceId, SurfaceDescriptor,
    VerdictReason, WindowId,
};

/// Сырые события ввода, которые слушатели передают владельцу состояния
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    PointerMoved(CursorSample),
    Click(MouseButton),
    Scroll(ScrollEvent),
    Swipe(SwipeEvent),
    Contact(ContactFrame),
    SpaceChanged,
}

impl RawInput {
    /// Короткое имя для логов горячего пути
    pub fn kind(&self) -> &'static str {
        match self {
            RawInput::PointerMoved(_) => "pointer",
            RawInput::Click(_) => "click",
            RawInput::Scroll(_) => "scroll",
            RawInput::Swipe(_) => "swipe",
            RawInput::Contact(_) => "contact",
            RawInput::SpaceChanged => "space",
        }
    }
}
