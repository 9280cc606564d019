use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Amount credited to a doctor's wallet per completed session unit.
    pub session_unit_rate: f64,
    pub currency: String,
    /// Length of one billable session unit.
    pub session_unit_minutes: i64,
    /// How long a doctor has to answer the first patient message.
    pub doctor_response_deadline_seconds: i64,
    /// Tick interval of the background expiration sweeper.
    pub sweep_interval_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            session_unit_rate: parse_env("SESSION_UNIT_RATE", 4.0),
            currency: env::var("SESSION_CURRENCY").unwrap_or_else(|_| {
                warn!("SESSION_CURRENCY not set, defaulting to USD");
                "USD".to_string()
            }),
            session_unit_minutes: parse_env("SESSION_UNIT_MINUTES", 10),
            doctor_response_deadline_seconds: parse_env("DOCTOR_RESPONSE_DEADLINE_SECONDS", 90),
            sweep_interval_seconds: parse_env("SWEEP_INTERVAL_SECONDS", 30),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_unit_rate: 4.0,
            currency: "USD".to_string(),
            session_unit_minutes: 10,
            doctor_response_deadline_seconds: 90,
            sweep_interval_seconds: 30,
        }
    }
}

fn parse_env<T: std::str::FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("{} has unparseable value {:?}, using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
