//! The session context: everything one visit to the greeting owns, from the
//! name screen to the card. Created by the runner, dropped at teardown.

use glam::Vec2;

use crate::api::greeting::GreetingConfig;
use crate::api::types::{event_kind, GreetingEvent, Modal, SoundEvent, Stage};
use crate::core::timeline::Timeline;
use crate::error::{Error, Result};
use crate::input::queue::{InputEvent, InputQueue};
use crate::session::flow::{BlowAttempt, FlowSignal, SessionFlow};
use crate::systems::capture::{AmplitudeSource, Capture};
use crate::systems::confetti::Confetti;
use crate::systems::sequencer::Rng;

/// Where microphone access stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrophoneState {
    Unrequested,
    /// The page was asked to call `getUserMedia`.
    Pending,
    Granted,
    /// Refused or broken. Blowing works through the tap fallback only.
    Denied,
}

/// Delayed steps of the presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cue {
    ShowCake,
    CloseEyesHidden,
    InstructionHidden,
    ArmFallback,
    BlowFeedback(BlowAttempt),
    AttemptModalHidden,
    ShowFunMessage,
    FunMessageHidden,
}

pub struct Session {
    config: GreetingConfig,
    seed: u64,
    stage: Stage,
    user_name: String,
    flow: SessionFlow,
    /// The modal whose OK button is currently expected.
    awaiting: Option<Modal>,
    begun: bool,
    congrats_shown: bool,
    card_open: bool,
    audio_overlay: bool,
    microphone: MicrophoneState,
    capture: Option<Capture>,
    fallback_armed: bool,
    fallback_visible: bool,
    /// Set by `teardown`. Nothing runs or captures afterwards.
    torn_down: bool,
    instruction: Option<usize>,
    fun_message: Option<usize>,
    timeline: Timeline<Cue>,
    confetti: Confetti,
    rng: Rng,
    /// Events produced since the last `clear_frame_data`.
    pub events: Vec<GreetingEvent>,
    pub sounds: Vec<SoundEvent>,
}

impl Session {
    pub fn new(config: GreetingConfig, seed: u64) -> Self {
        let flow = Self::build_flow(&config, seed);
        let confetti = Confetti::new(seed, config.confetti_palette(), Vec2::new(800.0, 600.0));
        Self {
            config,
            seed,
            stage: Stage::NameInput,
            user_name: String::new(),
            flow,
            awaiting: None,
            begun: false,
            congrats_shown: false,
            card_open: false,
            audio_overlay: false,
            microphone: MicrophoneState::Unrequested,
            capture: None,
            fallback_armed: false,
            fallback_visible: false,
            torn_down: false,
            instruction: None,
            fun_message: None,
            timeline: Timeline::new(),
            confetti,
            rng: Rng::new(seed.wrapping_add(1)),
            events: Vec::with_capacity(64),
            sounds: Vec::with_capacity(4),
        }
    }

    fn build_flow(config: &GreetingConfig, seed: u64) -> SessionFlow {
        SessionFlow::new(
            config.total_candles,
            config.detector,
            config.attempt_fractions,
            seed,
        )
    }

    /// Swap the configuration. Only allowed while the name screen is up.
    pub fn set_config(&mut self, config: GreetingConfig) -> Result<()> {
        if self.stage != Stage::NameInput {
            return Err(Error::InvalidConfig(
                "config can only change before the cake is shown".into(),
            ));
        }
        config.validate()?;
        self.flow = Self::build_flow(&config, self.seed);
        self.confetti = Confetti::new(self.seed, config.confetti_palette(), self.confetti.bounds());
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &GreetingConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn flow(&self) -> &SessionFlow {
        &self.flow
    }

    pub fn microphone(&self) -> MicrophoneState {
        self.microphone
    }

    pub fn awaiting(&self) -> Option<Modal> {
        self.awaiting
    }

    pub fn is_fallback_visible(&self) -> bool {
        self.fallback_visible
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn confetti(&self) -> &Confetti {
        &self.confetti
    }

    pub fn instruction_text(&self) -> Option<&str> {
        self.instruction
            .and_then(|i| self.config.instructions.get(i))
            .map(String::as_str)
    }

    pub fn fun_message(&self) -> Option<&str> {
        self.fun_message
            .and_then(|i| self.config.fun_messages.get(i))
            .map(String::as_str)
    }

    /// Hand the session an amplitude source once the page has one.
    /// A failure is not an error for the session: it switches to the tap fallback.
    pub fn attach_source<S: AmplitudeSource>(&mut self, source: &mut S) {
        if self.torn_down || self.capture.is_some() || self.flow.is_done() {
            log::debug!("amplitude source released unused (torn down, capturing or finished)");
            source.release();
            return;
        }
        match Capture::acquire(source) {
            Ok(capture) => {
                self.capture = Some(capture);
                self.microphone = MicrophoneState::Granted;
                log::info!("microphone capture started");
            }
            Err(e) => {
                log::warn!("microphone unavailable, using tap fallback: {}", e);
                self.microphone = MicrophoneState::Denied;
            }
        }
    }

    /// The page could not get a stream at all.
    pub fn microphone_denied(&mut self) {
        if self.capture.is_none() {
            log::warn!("microphone access denied, using tap fallback");
            self.microphone = MicrophoneState::Denied;
        }
    }

    /// Stop capture and drop pending steps. The session stays readable but
    /// ignores further input and microphone grants.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.release_capture();
        self.timeline.clear();
        log::info!("session torn down at {:?}", self.flow.attempt());
    }

    fn release_capture(&mut self) {
        // Capture::drop stops the stream
        self.capture = None;
    }

    /// Clear per-frame transient data (events, sounds).
    pub fn clear_frame_data(&mut self) {
        self.events.clear();
        self.sounds.clear();
    }

    /// One frame: apply inputs, fire due steps, sample the microphone.
    ///
    /// A failing input does not stop the frame: the remaining inputs are still
    /// applied and the first error is returned at the end.
    pub fn update(&mut self, now_ms: f64, input: &InputQueue) -> Result<()> {
        if self.torn_down {
            if !input.is_empty() {
                log::debug!("{} inputs ignored after teardown", input.len());
            }
            return Ok(());
        }

        let mut result = Ok(());
        for event in input.iter() {
            if let Err(e) = self.handle_input(event, now_ms) {
                log::warn!("input {:?} failed: {}", event, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        loop {
            let due = self.timeline.take_due(now_ms);
            if due.is_empty() {
                break;
            }
            for cue in due {
                self.run_cue(cue, now_ms);
            }
        }

        self.flow.tick(now_ms);
        if self.flow.is_listening() {
            if let Some(capture) = self.capture.as_mut() {
                let frame = capture.read_frame();
                match self.flow.sample(frame, now_ms) {
                    Ok(signals) => self.apply(signals, now_ms),
                    Err(e) if result.is_ok() => result = Err(e),
                    Err(e) => log::warn!("microphone sample failed: {}", e),
                }
            }
        }

        self.sync_fallback();
        result
    }

    /// Advance confetti by `steps` fixed steps and refresh its instance buffer.
    pub fn step_confetti(&mut self, steps: u32) {
        if !self.confetti.is_active() {
            return;
        }
        for _ in 0..steps {
            self.confetti.step();
        }
        self.confetti.rebuild_instances();
    }

    fn handle_input(&mut self, event: &InputEvent, now_ms: f64) -> Result<()> {
        match event {
            InputEvent::SubmitName(raw) => self.submit_name(raw, now_ms),
            InputEvent::Begin => {
                if self.stage == Stage::Cake && !self.begun && self.awaiting.is_none() {
                    self.begun = true;
                    self.show(Modal::CloseEyes);
                    self.awaiting = Some(Modal::CloseEyes);
                } else {
                    log::debug!("begin ignored");
                }
            }
            InputEvent::Acknowledge(modal) => self.acknowledge(*modal, now_ms),
            InputEvent::ManualBlow => {
                let signals = self.flow.manual_trigger(now_ms)?;
                self.apply(signals, now_ms);
            }
            InputEvent::AutoplayBlocked => {
                if self.stage == Stage::Cake && !self.audio_overlay {
                    self.audio_overlay = true;
                    self.show(Modal::AudioOverlay);
                }
            }
            InputEvent::EnableAudio => {
                self.sounds.push(SoundEvent::BIRTHDAY_MUSIC);
                if self.audio_overlay {
                    self.audio_overlay = false;
                    self.hide(Modal::AudioOverlay);
                }
            }
            InputEvent::ShowCard => {
                if self.congrats_shown && !self.card_open {
                    self.card_open = true;
                    self.show(Modal::EnlargedCard);
                }
            }
            InputEvent::CloseCard => {
                if self.card_open {
                    self.card_open = false;
                    self.hide(Modal::EnlargedCard);
                }
            }
            InputEvent::Resize { width, height } => {
                self.confetti.resize(Vec2::new(*width, *height));
            }
        }
        Ok(())
    }

    fn submit_name(&mut self, raw: &str, now_ms: f64) {
        let name = raw.trim();
        if self.stage != Stage::NameInput || name.is_empty() {
            log::debug!("name submission ignored");
            return;
        }
        self.user_name = name.to_string();
        self.stage = Stage::Transitioning;
        self.emit(event_kind::STAGE_HIDDEN, Stage::NameInput.code());
        self.timeline
            .schedule(now_ms, self.config.transition_delay_ms, Cue::ShowCake);
        log::info!("greeting started for {}", self.user_name);
    }

    fn acknowledge(&mut self, modal: Modal, now_ms: f64) {
        if self.awaiting != Some(modal) {
            log::debug!("acknowledgement of {:?} ignored (awaiting {:?})", modal, self.awaiting);
            return;
        }
        self.awaiting = None;
        self.hide(modal);
        let cue = match modal {
            Modal::CloseEyes => Cue::CloseEyesHidden,
            Modal::Instruction => Cue::InstructionHidden,
            Modal::FirstBlow | Modal::SecondBlow => Cue::AttemptModalHidden,
            Modal::FunMessage => Cue::FunMessageHidden,
            Modal::Congrats | Modal::EnlargedCard | Modal::AudioOverlay => return,
        };
        self.timeline.schedule(now_ms, self.config.modal_fade_ms, cue);
    }

    fn run_cue(&mut self, cue: Cue, now_ms: f64) {
        match cue {
            Cue::ShowCake => {
                self.stage = Stage::Cake;
                self.emit(event_kind::STAGE_SHOWN, Stage::Cake.code());
                self.emit(event_kind::CANDLES_READY, self.flow.candles().total() as f32);
                self.sounds.push(SoundEvent::BIRTHDAY_MUSIC);
            }
            Cue::CloseEyesHidden => {
                self.instruction = Some(0);
                self.emit(event_kind::INSTRUCTION, 0.0);
                self.show(Modal::Instruction);
                self.awaiting = Some(Modal::Instruction);
                self.request_microphone();
            }
            Cue::InstructionHidden => {
                self.emit(event_kind::BEGIN_HIDDEN, 0.0);
                let signals = self.flow.begin();
                self.apply(signals, now_ms);
                self.timeline
                    .schedule(now_ms, self.config.fallback_delay_ms, Cue::ArmFallback);
            }
            Cue::ArmFallback => self.fallback_armed = true,
            Cue::BlowFeedback(attempt) => match attempt {
                BlowAttempt::First => {
                    self.show(Modal::FirstBlow);
                    self.awaiting = Some(Modal::FirstBlow);
                }
                BlowAttempt::Second => {
                    self.show(Modal::SecondBlow);
                    self.awaiting = Some(Modal::SecondBlow);
                }
                _ => self.start_finale(now_ms),
            },
            Cue::AttemptModalHidden => {
                let signals = self.flow.acknowledge();
                self.apply(signals, now_ms);
                self.instruction = self.flow.attempt().ordinal();
                self.fallback_armed = true;
            }
            Cue::ShowFunMessage => {
                self.show(Modal::FunMessage);
                self.awaiting = Some(Modal::FunMessage);
            }
            Cue::FunMessageHidden => {
                self.congrats_shown = true;
                self.show(Modal::Congrats);
            }
        }
    }

    fn apply(&mut self, signals: Vec<FlowSignal>, now_ms: f64) {
        for signal in signals {
            match signal {
                FlowSignal::GateOpened { .. } => {
                    self.emit(event_kind::LISTENING, 1.0);
                }
                FlowSignal::CandlesExtinguished { indices, .. } => {
                    self.push(GreetingEvent::flag(event_kind::LISTENING, false));
                    if self.fallback_visible {
                        self.fallback_visible = false;
                        self.push(GreetingEvent::flag(event_kind::FALLBACK, false));
                    }
                    self.fallback_armed = false;
                    for i in indices {
                        self.emit(event_kind::CANDLE_OUT, i as f32);
                    }
                    self.emit(event_kind::CANDLES_LIT, self.flow.candles().count_lit() as f32);
                }
                FlowSignal::AttemptComplete { attempt } => {
                    self.timeline.schedule(
                        now_ms,
                        self.config.blow_feedback_delay_ms,
                        Cue::BlowFeedback(attempt),
                    );
                }
                FlowSignal::Finished => {
                    self.emit(event_kind::FINISHED, 0.0);
                    self.release_capture();
                    self.timeline.schedule(
                        now_ms,
                        self.config.blow_feedback_delay_ms,
                        Cue::BlowFeedback(BlowAttempt::Final),
                    );
                }
            }
        }
    }

    fn start_finale(&mut self, now_ms: f64) {
        self.confetti.spawn(self.config.confetti_count);
        self.confetti.rebuild_instances();
        self.emit(event_kind::CONFETTI_STARTED, self.config.confetti_count as f32);

        let index = self.rng.next_below(self.config.fun_messages.len());
        self.fun_message = Some(index);
        self.emit(event_kind::FUN_MESSAGE, index as f32);
        self.timeline
            .schedule(now_ms, self.config.fun_message_delay_ms, Cue::ShowFunMessage);
    }

    fn request_microphone(&mut self) {
        if self.microphone == MicrophoneState::Unrequested {
            self.microphone = MicrophoneState::Pending;
            self.emit(event_kind::REQUEST_MICROPHONE, self.config.fft_size as f32);
        }
    }

    /// Show the tap fallback while blowing is possible without a microphone.
    fn sync_fallback(&mut self) {
        let gate_open = self.flow.attempt().is_blowing() && self.flow.detector().is_gate_open();
        let wanted =
            self.fallback_armed && gate_open && self.microphone != MicrophoneState::Granted;
        if wanted && !self.fallback_visible {
            self.fallback_visible = true;
            self.push(GreetingEvent::flag(event_kind::FALLBACK, true));
        }
    }

    fn show(&mut self, modal: Modal) {
        self.emit(event_kind::MODAL_SHOWN, modal.code() as f32);
    }

    fn hide(&mut self, modal: Modal) {
        self.emit(event_kind::MODAL_HIDDEN, modal.code() as f32);
    }

    fn emit(&mut self, kind: f32, a: f32) {
        self.push(GreetingEvent::new(kind, a));
    }

    fn push(&mut self, event: GreetingEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::capture::fake::FakeMicrophone;

    fn session() -> Session {
        Session::new(GreetingConfig::default(), 42)
    }

    /// Run one frame with `inputs` and return the events it produced.
    fn frame(s: &mut Session, now: f64, inputs: Vec<InputEvent>) -> Vec<GreetingEvent> {
        let mut q = InputQueue::new();
        for e in inputs {
            q.push(e);
        }
        s.clear_frame_data();
        s.update(now, &q).unwrap();
        s.events.clone()
    }

    fn has(events: &[GreetingEvent], kind: f32, a: f32) -> bool {
        events.iter().any(|e| e.kind == kind && e.a == a)
    }

    fn count(events: &[GreetingEvent], kind: f32) -> usize {
        events.iter().filter(|e| e.kind == kind).count()
    }

    fn modal(m: Modal) -> f32 {
        m.code() as f32
    }

    /// Drive a fresh session to the point where the first blow is accepted.
    fn to_first_blow(s: &mut Session) {
        frame(s, 0.0, vec![InputEvent::SubmitName("Ada".into())]);
        frame(s, 600.0, vec![]);
        frame(s, 700.0, vec![InputEvent::Begin]);
        frame(s, 800.0, vec![InputEvent::Acknowledge(Modal::CloseEyes)]);
        frame(s, 1100.0, vec![]);
        frame(s, 1200.0, vec![InputEvent::Acknowledge(Modal::Instruction)]);
        frame(s, 1500.0, vec![]);
    }

    #[test]
    fn blank_name_is_ignored() {
        let mut s = session();
        let ev = frame(&mut s, 0.0, vec![InputEvent::SubmitName("   ".into())]);
        assert!(ev.is_empty());
        assert_eq!(s.stage(), Stage::NameInput);
    }

    #[test]
    fn name_submission_transitions_to_cake_after_delay() {
        let mut s = session();
        let ev = frame(&mut s, 0.0, vec![InputEvent::SubmitName("  Ada ".into())]);
        assert!(has(&ev, event_kind::STAGE_HIDDEN, Stage::NameInput.code()));
        assert_eq!(s.user_name(), "Ada");
        assert_eq!(s.stage(), Stage::Transitioning);

        assert!(frame(&mut s, 599.0, vec![]).is_empty());
        let ev = frame(&mut s, 600.0, vec![]);
        assert!(has(&ev, event_kind::STAGE_SHOWN, Stage::Cake.code()));
        assert!(has(&ev, event_kind::CANDLES_READY, 35.0));
        assert_eq!(s.sounds, vec![SoundEvent::BIRTHDAY_MUSIC]);
        assert_eq!(s.stage(), Stage::Cake);
    }

    #[test]
    fn full_walkthrough_with_tap_fallback() {
        let mut s = session();
        frame(&mut s, 0.0, vec![InputEvent::SubmitName("Ada".into())]);
        frame(&mut s, 600.0, vec![]);

        let ev = frame(&mut s, 700.0, vec![InputEvent::Begin]);
        assert!(has(&ev, event_kind::MODAL_SHOWN, modal(Modal::CloseEyes)));

        let ev = frame(&mut s, 800.0, vec![InputEvent::Acknowledge(Modal::CloseEyes)]);
        assert!(has(&ev, event_kind::MODAL_HIDDEN, modal(Modal::CloseEyes)));
        let ev = frame(&mut s, 1100.0, vec![]);
        assert!(has(&ev, event_kind::INSTRUCTION, 0.0));
        assert!(has(&ev, event_kind::MODAL_SHOWN, modal(Modal::Instruction)));
        assert_eq!(count(&ev, event_kind::REQUEST_MICROPHONE), 1);
        assert_eq!(s.microphone(), MicrophoneState::Pending);
        assert_eq!(
            s.instruction_text(),
            Some("Give it a try! Blow softly and see which candles listen to you.")
        );

        s.attach_source(&mut FakeMicrophone::denied());
        assert_eq!(s.microphone(), MicrophoneState::Denied);

        frame(&mut s, 1200.0, vec![InputEvent::Acknowledge(Modal::Instruction)]);
        let ev = frame(&mut s, 1500.0, vec![]);
        assert!(has(&ev, event_kind::BEGIN_HIDDEN, 0.0));
        assert!(has(&ev, event_kind::LISTENING, 1.0));
        assert_eq!(count(&ev, event_kind::FALLBACK), 0);
        let ev = frame(&mut s, 2000.0, vec![]);
        assert!(has(&ev, event_kind::FALLBACK, 1.0));

        // first blow
        let ev = frame(&mut s, 2100.0, vec![InputEvent::ManualBlow]);
        assert!(has(&ev, event_kind::LISTENING, 0.0));
        assert!(has(&ev, event_kind::FALLBACK, 0.0));
        assert_eq!(count(&ev, event_kind::CANDLE_OUT), 10);
        assert!(has(&ev, event_kind::CANDLES_LIT, 25.0));
        assert!(frame(&mut s, 2899.0, vec![]).is_empty());
        let ev = frame(&mut s, 2900.0, vec![]);
        assert!(has(&ev, event_kind::MODAL_SHOWN, modal(Modal::FirstBlow)));

        // second blow
        frame(&mut s, 3000.0, vec![InputEvent::Acknowledge(Modal::FirstBlow)]);
        let ev = frame(&mut s, 3300.0, vec![]);
        assert!(has(&ev, event_kind::LISTENING, 1.0));
        assert!(has(&ev, event_kind::FALLBACK, 1.0));
        assert_eq!(s.flow().attempt(), BlowAttempt::Second);
        let ev = frame(&mut s, 3400.0, vec![InputEvent::ManualBlow]);
        assert_eq!(count(&ev, event_kind::CANDLE_OUT), 14);
        assert!(has(&ev, event_kind::CANDLES_LIT, 11.0));
        let ev = frame(&mut s, 4200.0, vec![]);
        assert!(has(&ev, event_kind::MODAL_SHOWN, modal(Modal::SecondBlow)));

        // final blow
        frame(&mut s, 4300.0, vec![InputEvent::Acknowledge(Modal::SecondBlow)]);
        frame(&mut s, 4600.0, vec![]);
        let ev = frame(&mut s, 4700.0, vec![InputEvent::ManualBlow]);
        assert_eq!(count(&ev, event_kind::CANDLE_OUT), 11);
        assert!(has(&ev, event_kind::CANDLES_LIT, 0.0));
        assert!(has(&ev, event_kind::FINISHED, 0.0));
        assert!(s.flow().is_done());

        let ev = frame(&mut s, 5500.0, vec![]);
        assert!(has(&ev, event_kind::CONFETTI_STARTED, 150.0));
        assert_eq!(count(&ev, event_kind::FUN_MESSAGE), 1);
        assert_eq!(s.fun_message(), Some("Happy birthday!"));
        assert!(s.confetti().is_active());

        let ev = frame(&mut s, 6000.0, vec![]);
        assert!(has(&ev, event_kind::MODAL_SHOWN, modal(Modal::FunMessage)));
        frame(&mut s, 6100.0, vec![InputEvent::Acknowledge(Modal::FunMessage)]);
        let ev = frame(&mut s, 6400.0, vec![]);
        assert!(has(&ev, event_kind::MODAL_SHOWN, modal(Modal::Congrats)));

        let ev = frame(&mut s, 6500.0, vec![InputEvent::ShowCard]);
        assert!(has(&ev, event_kind::MODAL_SHOWN, modal(Modal::EnlargedCard)));
        let ev = frame(&mut s, 6600.0, vec![InputEvent::CloseCard]);
        assert!(has(&ev, event_kind::MODAL_HIDDEN, modal(Modal::EnlargedCard)));

        // terminal: further blows change nothing
        let ev = frame(&mut s, 9000.0, vec![InputEvent::ManualBlow]);
        assert_eq!(count(&ev, event_kind::CANDLE_OUT), 0);
        assert_eq!(s.flow().candles().count_lit(), 0);
    }

    #[test]
    fn microphone_blows_without_fallback() {
        let mut s = session();
        let mut mic = FakeMicrophone::granted();
        frame(&mut s, 0.0, vec![InputEvent::SubmitName("Ada".into())]);
        frame(&mut s, 600.0, vec![]);
        frame(&mut s, 700.0, vec![InputEvent::Begin]);
        frame(&mut s, 800.0, vec![InputEvent::Acknowledge(Modal::CloseEyes)]);
        frame(&mut s, 1100.0, vec![]);
        s.attach_source(&mut mic);
        assert_eq!(s.microphone(), MicrophoneState::Granted);

        frame(&mut s, 1200.0, vec![InputEvent::Acknowledge(Modal::Instruction)]);
        // gate not open yet: no reads
        assert_eq!(*mic.probe.reads.borrow(), 0);
        frame(&mut s, 1500.0, vec![]);
        let ev = frame(&mut s, 2100.0, vec![]);
        assert_eq!(count(&ev, event_kind::CANDLE_OUT), 0);
        assert_eq!(count(&ev, event_kind::FALLBACK), 0);

        *mic.probe.level.borrow_mut() = 200;
        let ev = frame(&mut s, 2116.0, vec![]);
        assert_eq!(count(&ev, event_kind::CANDLE_OUT), 10);
        // gate closed after the blow: loud frames are not read any more
        let reads = *mic.probe.reads.borrow();
        frame(&mut s, 2132.0, vec![]);
        assert_eq!(*mic.probe.reads.borrow(), reads);
    }

    #[test]
    fn pending_microphone_does_not_block_fallback() {
        let mut s = session();
        to_first_blow(&mut s);
        assert_eq!(s.microphone(), MicrophoneState::Pending);
        // armed at 2000, pending microphone counts as not granted
        let ev = frame(&mut s, 2000.0, vec![]);
        assert!(has(&ev, event_kind::FALLBACK, 1.0));
        s.microphone_denied();
        assert_eq!(s.microphone(), MicrophoneState::Denied);
        assert!(s.is_fallback_visible());
    }

    #[test]
    fn acknowledging_the_wrong_modal_is_ignored() {
        let mut s = session();
        frame(&mut s, 0.0, vec![InputEvent::SubmitName("Ada".into())]);
        frame(&mut s, 600.0, vec![]);
        frame(&mut s, 700.0, vec![InputEvent::Begin]);
        let ev = frame(&mut s, 800.0, vec![InputEvent::Acknowledge(Modal::FirstBlow)]);
        assert!(ev.is_empty());
        assert_eq!(s.awaiting(), Some(Modal::CloseEyes));
        // a second Begin while closing eyes does nothing either
        assert!(frame(&mut s, 900.0, vec![InputEvent::Begin]).is_empty());
    }

    #[test]
    fn capture_released_when_finished() {
        let mut s = session();
        let mut mic = FakeMicrophone::granted();
        to_first_blow(&mut s);
        s.attach_source(&mut mic);
        frame(&mut s, 2000.0, vec![InputEvent::ManualBlow]);
        frame(&mut s, 2800.0, vec![]);
        frame(&mut s, 2900.0, vec![InputEvent::Acknowledge(Modal::FirstBlow)]);
        frame(&mut s, 3200.0, vec![]);
        frame(&mut s, 3300.0, vec![InputEvent::ManualBlow]);
        frame(&mut s, 4100.0, vec![]);
        frame(&mut s, 4200.0, vec![InputEvent::Acknowledge(Modal::SecondBlow)]);
        frame(&mut s, 4500.0, vec![]);
        assert!(s.is_capturing());
        frame(&mut s, 4600.0, vec![InputEvent::ManualBlow]);
        assert!(s.flow().is_done());
        assert!(!s.is_capturing());
        assert_eq!(*mic.probe.stopped.borrow(), 1);
    }

    #[test]
    fn dropping_session_releases_capture() {
        let mut mic = FakeMicrophone::granted();
        {
            let mut s = session();
            to_first_blow(&mut s);
            s.attach_source(&mut mic);
            assert!(s.is_capturing());
        }
        assert_eq!(*mic.probe.stopped.borrow(), 1);
    }

    #[test]
    fn teardown_releases_capture_mid_session() {
        let mut s = session();
        let mut mic = FakeMicrophone::granted();
        s.attach_source(&mut mic);
        s.teardown();
        assert!(!s.is_capturing());
        assert_eq!(*mic.probe.stopped.borrow(), 1);
    }

    #[test]
    fn late_grant_after_teardown_is_released_unused() {
        let mut s = session();
        s.teardown();
        let mut mic = FakeMicrophone::granted();
        s.attach_source(&mut mic);
        assert!(!s.is_capturing());
        assert!(s.is_torn_down());
        assert_eq!(*mic.probe.released.borrow(), 1);
        assert_eq!(*mic.probe.stopped.borrow(), 0);
    }

    #[test]
    fn teardown_stops_the_session() {
        let mut s = session();
        to_first_blow(&mut s);
        s.teardown();
        let ev = frame(&mut s, 2000.0, vec![InputEvent::ManualBlow]);
        assert!(ev.is_empty());
        assert_eq!(s.flow().candles().count_lit(), 35);
        assert!(!s.is_fallback_visible());
    }

    #[test]
    fn second_grant_is_released_unused() {
        let mut s = session();
        let mut first = FakeMicrophone::granted();
        let mut second = FakeMicrophone::granted();
        s.attach_source(&mut first);
        s.attach_source(&mut second);
        assert!(s.is_capturing());
        assert_eq!(*second.probe.released.borrow(), 1);
        assert_eq!(*first.probe.released.borrow(), 0);
    }

    #[test]
    fn failing_input_does_not_swallow_the_rest() {
        let config = GreetingConfig {
            attempt_fractions: [1.5, 1.5, 1.5],
            ..GreetingConfig::default()
        };
        let mut s = Session::new(config, 42);
        to_first_blow(&mut s);

        let mut q = InputQueue::new();
        q.push(InputEvent::ManualBlow);
        q.push(InputEvent::Resize { width: 1024.0, height: 768.0 });
        s.clear_frame_data();
        assert!(matches!(s.update(1600.0, &q), Err(Error::InvalidFraction(_))));
        assert_eq!(s.confetti().bounds(), Vec2::new(1024.0, 768.0));
        assert_eq!(s.flow().attempt(), BlowAttempt::First);
    }

    #[test]
    fn autoplay_overlay_round_trip() {
        let mut s = session();
        frame(&mut s, 0.0, vec![InputEvent::SubmitName("Ada".into())]);
        frame(&mut s, 600.0, vec![]);
        let ev = frame(&mut s, 610.0, vec![InputEvent::AutoplayBlocked]);
        assert!(has(&ev, event_kind::MODAL_SHOWN, modal(Modal::AudioOverlay)));
        let ev = frame(&mut s, 620.0, vec![InputEvent::EnableAudio]);
        assert!(has(&ev, event_kind::MODAL_HIDDEN, modal(Modal::AudioOverlay)));
        assert_eq!(s.sounds, vec![SoundEvent::BIRTHDAY_MUSIC]);
    }

    #[test]
    fn config_locked_after_name() {
        let mut s = session();
        let small = GreetingConfig { total_candles: 5, ..GreetingConfig::default() };
        s.set_config(small.clone()).unwrap();
        assert_eq!(s.flow().candles().total(), 5);
        frame(&mut s, 0.0, vec![InputEvent::SubmitName("Ada".into())]);
        assert!(s.set_config(small).is_err());
    }

    #[test]
    fn card_only_opens_after_congrats() {
        let mut s = session();
        to_first_blow(&mut s);
        assert!(frame(&mut s, 1600.0, vec![InputEvent::ShowCard]).is_empty());
    }

    #[test]
    fn confetti_steps_only_once_started() {
        let mut s = session();
        s.step_confetti(3);
        assert_eq!(s.confetti().instance_count(), 0);
    }
}
