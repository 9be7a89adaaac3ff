//! Weather and its effect on resource regrowth.
//!
//! Weather is chosen once per tick from a weighted table using one draw
//! from the Environment stream. A "repeat" weight keeps the previous
//! weather, which gives natural streaks.
//!
//! | Weather  | Weight |
//! |----------|--------|
//! | Clear    | 40     |
//! | Rain     | 25     |
//! | Storm    | 10     |
//! | Drought  | 10     |
//! | (repeat) | 15     |

use serde::{Deserialize, Serialize};

/// Current weather over the whole grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    /// Normal regrowth.
    #[default]
    Clear,
    /// Boosted regrowth.
    Rain,
    /// Halved regrowth.
    Storm,
    /// No regrowth.
    Drought,
}

/// `(weather, weight)` entries; `None` repeats the previous weather.
const WEATHER_TABLE: [(Option<Weather>, u64); 5] = [
    (Some(Weather::Clear), 40),
    (Some(Weather::Rain), 25),
    (Some(Weather::Storm), 10),
    (Some(Weather::Drought), 10),
    (None, 15),
];

/// Sum of all weights in the weather table.
pub const WEATHER_TOTAL_WEIGHT: u64 = 100;

/// Pick the next weather given a roll in `[0, WEATHER_TOTAL_WEIGHT)`.
pub fn select_weather(previous: Weather, roll: u64) -> Weather {
    let mut cumulative: u64 = 0;
    for (weather, weight) in WEATHER_TABLE {
        cumulative = cumulative.saturating_add(weight);
        if roll < cumulative {
            return weather.unwrap_or(previous);
        }
    }
    previous
}

/// Regrowth for one chunk this tick under `weather`.
pub const fn regrowth(base: u32, weather: Weather) -> u32 {
    match weather {
        Weather::Clear => base,
        Weather::Rain => base.saturating_mul(2),
        Weather::Storm => base / 2,
        Weather::Drought => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_weights_sum_to_total() {
        let total: u64 = WEATHER_TABLE.iter().map(|(_, w)| *w).sum();
        assert_eq!(total, WEATHER_TOTAL_WEIGHT);
    }

    #[test]
    fn rolls_map_to_bands() {
        assert_eq!(select_weather(Weather::Storm, 0), Weather::Clear);
        assert_eq!(select_weather(Weather::Storm, 40), Weather::Rain);
        assert_eq!(select_weather(Weather::Clear, 65), Weather::Storm);
        assert_eq!(select_weather(Weather::Clear, 75), Weather::Drought);
    }

    #[test]
    fn repeat_band_keeps_previous() {
        assert_eq!(select_weather(Weather::Drought, 99), Weather::Drought);
    }

    #[test]
    fn drought_stops_regrowth() {
        assert_eq!(regrowth(4, Weather::Drought), 0);
        assert_eq!(regrowth(4, Weather::Rain), 8);
        assert_eq!(regrowth(4, Weather::Storm), 2);
    }
}
