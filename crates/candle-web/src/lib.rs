pub mod microphone;
pub mod runner;

pub use microphone::{AnalyserStream, Microphone};
pub use runner::GreetingRunner;

// Re-exported so `export_greeting!` expands without extra dependencies in the caller.
pub use candle_engine;
pub use log;
pub use web_sys;

/// Install the panic hook and the console logger. Safe to call more than once.
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// A session seed from the browser's RNG and clock.
pub fn random_seed() -> u64 {
    let high = (js_sys::Math::random() * u32::MAX as f64) as u64;
    let low = js_sys::Date::now() as u64;
    (high << 32) ^ low
}

/// Generate all `#[wasm_bindgen]` exports for a greeting.
///
/// Generates:
/// - `thread_local!` storage for the GreetingRunner
/// - `with_runner()` helper function
/// - All wasm-bindgen exports (init, tick, inputs, microphone hand-off, data accessors)
///
/// # Usage
///
/// ```ignore
/// use wasm_bindgen::prelude::*;
///
/// mod greeting;
/// use greeting::MyGreeting;
///
/// candle_web::export_greeting!(MyGreeting, "my-greeting");
/// ```
///
/// # Arguments
///
/// - `$greeting_type`: a type implementing `candle_engine::Greeting` with a `new()` constructor
/// - `$greeting_name`: a string literal used in the initialization log message
#[macro_export]
macro_rules! export_greeting {
    ($greeting_type:ty, $greeting_name:literal) => {
        use std::cell::RefCell;
        use $crate::candle_engine::InputEvent;

        thread_local! {
            static RUNNER: RefCell<Option<$crate::GreetingRunner<$greeting_type>>> = RefCell::new(None);
        }

        fn with_runner<R>(f: impl FnOnce(&mut $crate::GreetingRunner<$greeting_type>) -> R) -> R {
            RUNNER.with(|cell| {
                let mut borrow = cell.borrow_mut();
                let runner = borrow.as_mut().expect("Greeting not initialized. Call greeting_init() first.");
                f(runner)
            })
        }

        #[wasm_bindgen]
        pub fn greeting_init() {
            $crate::init_logging();

            let greeting = <$greeting_type>::new();
            let runner = $crate::GreetingRunner::new(greeting, $crate::random_seed());

            RUNNER.with(|cell| {
                *cell.borrow_mut() = Some(runner);
            });
            $crate::log::info!("{}: initialized", $greeting_name);
        }

        #[wasm_bindgen]
        pub fn greeting_tick(dt: f32) {
            with_runner(|r| r.tick(dt));
        }

        #[wasm_bindgen]
        pub fn greeting_load_config(json: &str) -> bool {
            with_runner(|r| r.load_config(json))
        }

        // ---- Inputs ----

        #[wasm_bindgen]
        pub fn greeting_submit_name(name: &str) {
            with_runner(|r| r.push_input(InputEvent::SubmitName(name.to_string())));
        }

        #[wasm_bindgen]
        pub fn greeting_begin() {
            with_runner(|r| r.push_input(InputEvent::Begin));
        }

        #[wasm_bindgen]
        pub fn greeting_acknowledge(modal: u32) {
            with_runner(|r| r.acknowledge(modal));
        }

        #[wasm_bindgen]
        pub fn greeting_manual_blow() {
            with_runner(|r| r.push_input(InputEvent::ManualBlow));
        }

        #[wasm_bindgen]
        pub fn greeting_autoplay_blocked() {
            with_runner(|r| r.push_input(InputEvent::AutoplayBlocked));
        }

        #[wasm_bindgen]
        pub fn greeting_enable_audio() {
            with_runner(|r| r.push_input(InputEvent::EnableAudio));
        }

        #[wasm_bindgen]
        pub fn greeting_show_card() {
            with_runner(|r| r.push_input(InputEvent::ShowCard));
        }

        #[wasm_bindgen]
        pub fn greeting_close_card() {
            with_runner(|r| r.push_input(InputEvent::CloseCard));
        }

        #[wasm_bindgen]
        pub fn greeting_resize(width: f32, height: f32) {
            with_runner(|r| r.push_input(InputEvent::Resize { width, height }));
        }

        // ---- Microphone hand-off ----

        #[wasm_bindgen]
        pub fn greeting_microphone_granted(stream: $crate::web_sys::MediaStream) {
            with_runner(|r| r.microphone_granted(stream));
        }

        #[wasm_bindgen]
        pub fn greeting_microphone_denied() {
            with_runner(|r| r.microphone_denied());
        }

        #[wasm_bindgen]
        pub fn greeting_teardown() {
            with_runner(|r| r.teardown());
        }

        // ---- Data accessors ----

        #[wasm_bindgen]
        pub fn get_events_ptr() -> *const f32 {
            with_runner(|r| r.events_ptr())
        }

        #[wasm_bindgen]
        pub fn get_events_len() -> u32 {
            with_runner(|r| r.events_len())
        }

        #[wasm_bindgen]
        pub fn get_sound_events_ptr() -> *const u8 {
            with_runner(|r| r.sound_events_ptr())
        }

        #[wasm_bindgen]
        pub fn get_sound_events_len() -> u32 {
            with_runner(|r| r.sound_events_len())
        }

        #[wasm_bindgen]
        pub fn get_confetti_ptr() -> *const f32 {
            with_runner(|r| r.confetti_ptr())
        }

        #[wasm_bindgen]
        pub fn get_confetti_count() -> u32 {
            with_runner(|r| r.confetti_count())
        }

        #[wasm_bindgen]
        pub fn get_lit_count() -> u32 {
            with_runner(|r| r.lit_count())
        }

        #[wasm_bindgen]
        pub fn get_total_candles() -> u32 {
            with_runner(|r| r.total_candles())
        }

        #[wasm_bindgen]
        pub fn get_attempt() -> u32 {
            with_runner(|r| r.attempt())
        }

        #[wasm_bindgen]
        pub fn greeting_instruction_text() -> String {
            with_runner(|r| r.instruction_text())
        }

        #[wasm_bindgen]
        pub fn greeting_fun_message() -> String {
            with_runner(|r| r.fun_message())
        }

        #[wasm_bindgen]
        pub fn greeting_user_name() -> String {
            with_runner(|r| r.user_name())
        }
    };
}
