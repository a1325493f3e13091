//! Weather advisory text generation.
//!
//! An advisory is one base phrase picked from the condition's bucket plus
//! conditional clauses appended in a fixed order. The wording is part of
//! the product contract and is kept verbatim, typography included.

use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::CurrentConditions;

const CLEAR_PHRASES: [&str; 2] = [
    "It’s a bright, sunny day. A great time for outdoor plans—just don’t forget sunscreen and stay hydrated.",
    "Clear skies today! Perfect for going out, but the sun might get strong later, so stay protected.",
];

const CLOUDS_PHRASES: [&str; 2] = [
    "The sky is cloudy. The temperature might drop a bit, so a light jacket could be a good idea.",
    "It’s looking overcast. No rain yet, but keep an eye on the sky.",
];

const RAIN_PHRASES: [&str; 2] = [
    "It’s raining. Roads can get slippery, so move carefully and carry an umbrella or raincoat.",
    "Expect rainfall. Make sure you’re prepared with waterproof gear and take extra caution.",
];

const DRIZZLE_PHRASES: [&str; 2] = [
    "A light drizzle is happening. It’s manageable, but you might want a jacket to stay dry.",
    "Expect some light rain. Nothing heavy, but enough to make things damp.",
];

const THUNDERSTORM_PHRASES: [&str; 2] = [
    "A thunderstorm is expected. It’s best to stay indoors and avoid open areas.",
    "Thunderstorms incoming. Postpone outdoor plans and stay updated on alerts.",
];

const SNOW_PHRASES: [&str; 2] = [
    "Snow is falling. Dress warmly and be cautious—roads can be slippery.",
    "Expect snowy conditions. Bundle up and travel carefully if you need to go out.",
];

const OBSCURED_PHRASES: [&str; 2] = [
    "Visibility is low due to current conditions. Drive slowly and stay alert.",
    "Low-visibility weather detected. Travel can be risky, so please be careful.",
];

const UNSETTLED_PHRASES: [&str; 2] = [
    "The weather seems unusual today. Keep an eye on updates and stay prepared.",
    "Conditions are a bit unpredictable. It’s best to stay alert and ready for anything.",
];

const FEELS_HOTTER: &str = "It feels much hotter than the actual temperature.";
const FEELS_COOLER: &str = "It feels much cooler than the actual temperature.";
const HIGH_HUMIDITY: &str = "The humidity is high, so expect some stickiness.";
const STRONG_WIND: &str = "Winds are quite strong, so be careful of flying debris.";
const BREEZY: &str = "It’s a bit breezy.";
const LOW_VISIBILITY: &str = "Visibility is low. Be extra careful when driving or walking.";

/// Chooses which of a bucket's phrases to use. Injectable so tests can pin
/// the selection.
pub trait PhrasePicker: Send + Sync {
    /// Returns an index in `0..len`.
    fn pick(&self, len: usize) -> usize;
}

/// Default picker: a small splitmix-style sequence seeded from the clock.
pub struct SeededPicker {
    state: Mutex<u64>,
}

impl SeededPicker {
    pub fn new(seed: u64) -> Self {
        Self {
            state: Mutex::new(mix64(seed)),
        }
    }

    fn from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed);
        Self::new(seed)
    }
}

impl PhrasePicker for SeededPicker {
    fn pick(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let mut state = self.state.lock();
        *state = mix64(state.wrapping_add(0x9e37_79b9_7f4a_7c15));
        (*state % len as u64) as usize
    }
}

fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Generates advisory text for a conditions sample.
pub struct Advisor {
    picker: Box<dyn PhrasePicker>,
}

impl Advisor {
    /// Advisor with clock-seeded phrase selection.
    pub fn new() -> Self {
        Self::with_picker(Box::new(SeededPicker::from_clock()))
    }

    /// Advisor with a caller-supplied picker.
    pub fn with_picker(picker: Box<dyn PhrasePicker>) -> Self {
        Self { picker }
    }

    /// Compose the advisory: one bucket phrase plus every triggered clause,
    /// joined with single spaces. Apart from the phrase pick, the output is
    /// a pure function of the sample.
    pub fn advise(&self, sample: &CurrentConditions) -> String {
        let bucket = phrases_for(&sample.condition);
        let base = bucket[self.picker.pick(bucket.len()) % bucket.len()];

        let mut parts = vec![base];

        if sample.feels_like_c > sample.temp_c + 2.0 {
            parts.push(FEELS_HOTTER);
        } else if sample.feels_like_c < sample.temp_c - 2.0 {
            parts.push(FEELS_COOLER);
        }

        if sample.humidity_pct > 75 {
            parts.push(HIGH_HUMIDITY);
        }

        if sample.wind_speed > 15.0 {
            parts.push(STRONG_WIND);
        } else if sample.wind_speed > 5.0 {
            parts.push(BREEZY);
        }

        if sample.visibility_m < 1000 {
            parts.push(LOW_VISIBILITY);
        }

        parts.join(" ")
    }
}

impl Default for Advisor {
    fn default() -> Self {
        Self::new()
    }
}

fn phrases_for(condition: &str) -> &'static [&'static str; 2] {
    match condition.to_lowercase().as_str() {
        "clear" => &CLEAR_PHRASES,
        "clouds" => &CLOUDS_PHRASES,
        "rain" => &RAIN_PHRASES,
        "drizzle" => &DRIZZLE_PHRASES,
        "thunderstorm" => &THUNDERSTORM_PHRASES,
        "snow" => &SNOW_PHRASES,
        "mist" | "smoke" | "haze" | "dust" | "fog" | "sand" | "ash" | "squall" | "tornado" => {
            &OBSCURED_PHRASES
        }
        _ => &UNSETTLED_PHRASES,
    }
}
