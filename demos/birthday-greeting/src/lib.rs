use wasm_bindgen::prelude::*;

mod greeting;
use greeting::BirthdayGreeting;

candle_web::export_greeting!(BirthdayGreeting, "birthday-greeting");
