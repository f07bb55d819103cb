use candle_engine::{Greeting, GreetingConfig};

const FUN_MESSAGES: [&str; 5] = [
    "Happy birthday! Those candles never stood a chance.",
    "Another year wiser, and clearly a champion blower.",
    "Make a wish. The candles already did their part.",
    "Cake first, questions later. Happy birthday!",
    "Thirty-five candles down, countless adventures ahead.",
];

/// The birthday greeting: 35 candles, three blows, a card at the end.
pub struct BirthdayGreeting {
    finished: bool,
}

impl BirthdayGreeting {
    pub fn new() -> Self {
        Self { finished: false }
    }
}

impl Default for BirthdayGreeting {
    fn default() -> Self {
        Self::new()
    }
}

impl Greeting for BirthdayGreeting {
    fn config(&self) -> GreetingConfig {
        GreetingConfig {
            total_candles: 35,
            fun_messages: FUN_MESSAGES.iter().map(|m| m.to_string()).collect(),
            ..GreetingConfig::default()
        }
    }

    fn on_name(&mut self, name: &str) {
        log::info!("BirthdayGreeting: lighting candles for {}", name);
    }

    fn on_finished(&mut self, name: &str) {
        if !self.finished {
            self.finished = true;
            log::info!("BirthdayGreeting: {} blew out every candle", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_is_valid() {
        let config = BirthdayGreeting::new().config();
        config.validate().unwrap();
        assert_eq!(config.total_candles, 35);
        assert_eq!(config.fun_messages.len(), FUN_MESSAGES.len());
    }
}
