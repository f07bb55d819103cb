use bytemuck::{Pod, Zeroable};

/// A sound cue emitted by the session.
/// The numeric value maps to an audio element owned by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SoundEvent(pub u32);

impl SoundEvent {
    /// Start (or resume) the birthday song.
    pub const BIRTHDAY_MUSIC: SoundEvent = SoundEvent(1);
}

/// An event handed from Rust to the page through WASM memory.
/// Generic container: `kind` identifies the event, `a/b/c` carry payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GreetingEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl GreetingEvent {
    pub const FLOATS: usize = 4;

    pub fn new(kind: f32, a: f32) -> Self {
        Self { kind, a, b: 0.0, c: 0.0 }
    }

    pub fn flag(kind: f32, on: bool) -> Self {
        Self::new(kind, if on { 1.0 } else { 0.0 })
    }
}

/// Event kinds (Rust → page).
pub mod event_kind {
    /// a = stage code
    pub const STAGE_HIDDEN: f32 = 1.0;
    /// a = stage code
    pub const STAGE_SHOWN: f32 = 2.0;
    /// a = modal code
    pub const MODAL_SHOWN: f32 = 3.0;
    /// a = modal code
    pub const MODAL_HIDDEN: f32 = 4.0;
    /// a = total candles
    pub const CANDLES_READY: f32 = 5.0;
    /// a = candle index
    pub const CANDLE_OUT: f32 = 6.0;
    /// a = candles still lit
    pub const CANDLES_LIT: f32 = 7.0;
    /// a = 1 while the blow indicator should show
    pub const LISTENING: f32 = 8.0;
    /// a = 1 while the tap fallback should show
    pub const FALLBACK: f32 = 9.0;
    pub const REQUEST_MICROPHONE: f32 = 10.0;
    /// a = attempt ordinal; text via `instruction_text`
    pub const INSTRUCTION: f32 = 11.0;
    pub const BEGIN_HIDDEN: f32 = 12.0;
    pub const CONFETTI_STARTED: f32 = 13.0;
    /// a = message index; text via `fun_message`
    pub const FUN_MESSAGE: f32 = 14.0;
    pub const FINISHED: f32 = 15.0;
}

/// Top-level screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NameInput,
    /// Name accepted, cake not shown yet.
    Transitioning,
    Cake,
}

impl Stage {
    pub fn code(self) -> f32 {
        match self {
            Stage::NameInput => 1.0,
            Stage::Transitioning => 2.0,
            Stage::Cake => 3.0,
        }
    }
}

/// Overlays the page shows and hides on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    CloseEyes,
    Instruction,
    FirstBlow,
    SecondBlow,
    FunMessage,
    Congrats,
    EnlargedCard,
    AudioOverlay,
}

impl Modal {
    pub fn code(self) -> u32 {
        match self {
            Modal::CloseEyes => 1,
            Modal::Instruction => 2,
            Modal::FirstBlow => 3,
            Modal::SecondBlow => 4,
            Modal::FunMessage => 5,
            Modal::Congrats => 6,
            Modal::EnlargedCard => 7,
            Modal::AudioOverlay => 8,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Modal::CloseEyes,
            2 => Modal::Instruction,
            3 => Modal::FirstBlow,
            4 => Modal::SecondBlow,
            5 => Modal::FunMessage,
            6 => Modal::Congrats,
            7 => Modal::EnlargedCard,
            8 => Modal::AudioOverlay,
            _ => return None,
        })
    }
}
