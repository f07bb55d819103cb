use candle_engine::{
    event_kind, BlowAttempt, FrameClock, Greeting, GreetingConfig, InputEvent, InputQueue, Modal,
    Session,
};
use web_sys::MediaStream;

use crate::microphone::Microphone;

/// Generic greeting runner that wires the session into the page's frame loop.
///
/// Each concrete greeting creates a `thread_local!` GreetingRunner and exports
/// free functions via `#[wasm_bindgen]` (see `export_greeting!`), because
/// wasm-bindgen cannot export generic structs directly.
pub struct GreetingRunner<G: Greeting> {
    greeting: G,
    session: Session,
    input: InputQueue,
    clock: FrameClock,
    /// Flat buffer of sound event IDs for direct memory reads.
    sound_buffer: Vec<u8>,
}

impl<G: Greeting> GreetingRunner<G> {
    /// `seed` is used unless the greeting's config pins one.
    pub fn new(greeting: G, seed: u64) -> Self {
        let mut config = greeting.config();
        if let Err(e) = config.validate() {
            log::error!("greeting config rejected, using defaults: {}", e);
            config = GreetingConfig::default();
        }
        let seed = config.seed.unwrap_or(seed);
        Self {
            greeting,
            session: Session::new(config, seed),
            input: InputQueue::new(),
            clock: FrameClock::default(),
            sound_buffer: Vec::with_capacity(4),
        }
    }

    /// Replace the config from JSON. Only valid while the name screen is up.
    pub fn load_config(&mut self, json: &str) -> bool {
        let result = GreetingConfig::from_json(json).and_then(|c| self.session.set_config(c));
        match result {
            Ok(()) => {
                log::info!("greeting config loaded");
                true
            }
            Err(e) => {
                log::error!("failed to load greeting config: {}", e);
                false
            }
        }
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Queue an acknowledgement by modal code.
    pub fn acknowledge(&mut self, code: u32) {
        match Modal::from_code(code) {
            Some(modal) => self.input.push(InputEvent::Acknowledge(modal)),
            None => log::warn!("unknown modal code {}", code),
        }
    }

    /// The page obtained a microphone stream.
    pub fn microphone_granted(&mut self, stream: MediaStream) {
        let mut microphone = Microphone::new(stream, self.session.config().fft_size);
        self.session.attach_source(&mut microphone);
    }

    pub fn microphone_denied(&mut self) {
        self.session.microphone_denied();
    }

    /// Release the microphone and stop pending steps (page unload).
    pub fn teardown(&mut self) {
        self.session.teardown();
    }

    /// Run one frame: update the session, step confetti, pack sounds.
    pub fn tick(&mut self, dt: f32) {
        // Clear per-frame transient data
        self.session.clear_frame_data();

        let steps = self.clock.advance(dt);
        // The session applies every queued input even when one fails
        if let Err(e) = self.session.update(self.clock.now_ms(), &self.input) {
            log::error!("session update failed: {}", e);
        }

        // Drain input after update
        self.input.drain();

        self.session.step_confetti(steps);
        self.notify_greeting();

        self.sound_buffer.clear();
        for sound in &self.session.sounds {
            self.sound_buffer.push(sound.0 as u8);
        }
    }

    fn notify_greeting(&mut self) {
        for event in &self.session.events {
            if event.kind == event_kind::STAGE_HIDDEN {
                self.greeting.on_name(self.session.user_name());
            } else if event.kind == event_kind::FINISHED {
                self.greeting.on_finished(self.session.user_name());
            }
        }
    }

    // ---- Pointer accessors for direct memory reads ----

    pub fn events_ptr(&self) -> *const f32 {
        self.session.events.as_ptr() as *const f32
    }

    pub fn events_len(&self) -> u32 {
        self.session.events.len() as u32
    }

    pub fn sound_events_ptr(&self) -> *const u8 {
        self.sound_buffer.as_ptr()
    }

    pub fn sound_events_len(&self) -> u32 {
        self.sound_buffer.len() as u32
    }

    pub fn confetti_ptr(&self) -> *const f32 {
        self.session.confetti().instances_ptr()
    }

    pub fn confetti_count(&self) -> u32 {
        self.session.confetti().instance_count()
    }

    // ---- Session state ----

    pub fn lit_count(&self) -> u32 {
        self.session.flow().candles().count_lit() as u32
    }

    pub fn total_candles(&self) -> u32 {
        self.session.flow().candles().total() as u32
    }

    /// 0 = not started, 1..=3 = blowing, 4 = done.
    pub fn attempt(&self) -> u32 {
        match self.session.flow().attempt() {
            BlowAttempt::NotStarted => 0,
            BlowAttempt::First => 1,
            BlowAttempt::Second => 2,
            BlowAttempt::Final => 3,
            BlowAttempt::Done => 4,
        }
    }

    pub fn instruction_text(&self) -> String {
        self.session.instruction_text().unwrap_or_default().to_string()
    }

    pub fn fun_message(&self) -> String {
        self.session.fun_message().unwrap_or_default().to_string()
    }

    pub fn user_name(&self) -> String {
        self.session.user_name().to_string()
    }
}
