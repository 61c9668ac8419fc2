//! The city catalog and the pure weather operations.
//!
//! Everything here is static data plus arithmetic; the service exposes it over
//! the wire and the shell only ever sees it through responses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Weather attributes for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    /// Temperature in degrees Fahrenheit.
    pub temperature: f64,
    /// Short label such as "Sunny".
    pub condition: String,
    /// Relative humidity, 0-100.
    pub humidity: u8,
    /// Wind speed in mph.
    pub wind_speed: f64,
}

impl WeatherRecord {
    fn new(temperature: f64, condition: &str, humidity: u8, wind_speed: f64) -> Self {
        Self {
            temperature,
            condition: condition.to_string(),
            humidity,
            wind_speed,
        }
    }

    /// Multi-line, human-readable description used as tool output.
    pub fn summary(&self, city: &str) -> String {
        format!(
            "Weather in {}:\nTemperature: {}°F\nCondition: {}\nHumidity: {}%\nWind Speed: {} mph",
            city, self.temperature, self.condition, self.humidity, self.wind_speed
        )
    }
}

/// Fixed mapping from city name to weather. Lookups are exact and case-sensitive.
#[derive(Debug, Clone)]
pub struct Catalog {
    cities: BTreeMap<String, WeatherRecord>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The five seeded cities.
    pub fn builtin() -> Self {
        let cities = [
            ("New York", WeatherRecord::new(72.0, "Sunny", 45, 8.0)),
            ("London", WeatherRecord::new(62.0, "Rainy", 80, 12.0)),
            ("Tokyo", WeatherRecord::new(78.0, "Partly Cloudy", 65, 5.0)),
            ("Sydney", WeatherRecord::new(85.0, "Clear", 55, 10.0)),
            ("Paris", WeatherRecord::new(68.0, "Cloudy", 70, 7.0)),
        ]
        .into_iter()
        .map(|(name, record)| (name.to_string(), record))
        .collect();

        Self { cities }
    }

    /// All city names, each exactly once.
    pub fn list_cities(&self) -> Vec<String> {
        self.cities.keys().cloned().collect()
    }

    /// Exact-match lookup. `None` means the city is unknown.
    pub fn get_weather(&self, city: &str) -> Option<&WeatherRecord> {
        self.cities.get(city)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// Message returned in place of a record for an unknown city.
pub fn not_found_message(city: &str) -> String {
    format!("No weather data available for {}", city)
}

/// The templated question behind the `weatherPrompt` prompt.
pub fn weather_prompt(city: &str) -> String {
    format!("What's the weather like in {}?", city)
}

/// Temperature scale accepted by `convertTemperature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown temperature unit '{0}' (expected celsius or fahrenheit)")]
pub struct UnknownUnit(pub String);

impl FromStr for TemperatureUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "celsius" | "c" => Ok(TemperatureUnit::Celsius),
            "fahrenheit" | "f" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(UnknownUnit(s.to_string())),
        }
    }
}

/// Convert `value` between scales.
///
/// Same-unit conversions return `value` untouched; anything else is rounded to
/// one decimal place.
pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    match (from, to) {
        (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => {
            round_tenths(value * 9.0 / 5.0 + 32.0)
        }
        (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => {
            round_tenths((value - 32.0) * 5.0 / 9.0)
        }
        _ => value,
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokyo_weather() {
        let catalog = Catalog::builtin();
        let tokyo = catalog.get_weather("Tokyo").unwrap();
        assert_eq!(tokyo.temperature, 78.0);
        assert_eq!(tokyo.condition, "Partly Cloudy");
        assert_eq!(tokyo.humidity, 65);
        assert_eq!(tokyo.wind_speed, 5.0);
    }

    #[test]
    fn test_unknown_city() {
        let catalog = Catalog::builtin();
        assert!(catalog.get_weather("Atlantis").is_none());
        assert!(catalog.get_weather("tokyo").is_none());
        assert_eq!(
            not_found_message("Atlantis"),
            "No weather data available for Atlantis"
        );
    }

    #[test]
    fn test_list_cities() {
        let mut cities = Catalog::builtin().list_cities();
        cities.sort();
        assert_eq!(cities, vec!["London", "New York", "Paris", "Sydney", "Tokyo"]);
    }

    #[test]
    fn test_every_record_is_populated() {
        let catalog = Catalog::builtin();
        for city in catalog.list_cities() {
            let record = catalog.get_weather(&city).unwrap();
            assert!(!record.condition.is_empty());
            assert!(record.humidity <= 100);
        }
    }

    #[test]
    fn test_convert_known_points() {
        use TemperatureUnit::*;
        assert_eq!(convert_temperature(32.0, Fahrenheit, Celsius), 0.0);
        assert_eq!(convert_temperature(0.0, Celsius, Fahrenheit), 32.0);
        assert_eq!(convert_temperature(100.0, Celsius, Fahrenheit), 212.0);
        assert_eq!(convert_temperature(78.0, Fahrenheit, Celsius), 25.6);
    }

    #[test]
    fn test_convert_same_unit_is_identity() {
        use TemperatureUnit::*;
        for x in [-40.0, 0.0, 21.456, 1e9, f64::MIN_POSITIVE] {
            assert_eq!(convert_temperature(x, Celsius, Celsius), x);
            assert_eq!(convert_temperature(x, Fahrenheit, Fahrenheit), x);
        }
    }

    #[test]
    fn test_fahrenheit_round_trip() {
        use TemperatureUnit::*;
        for f in [-40.0, 0.0, 32.0, 62.0, 72.0, 78.0, 85.0, 98.6, 451.0] {
            let c = convert_temperature(f, Fahrenheit, Celsius);
            let back = convert_temperature(c, Celsius, Fahrenheit);
            assert!((back - f).abs() <= 0.1 + 1e-9, "{} -> {} -> {}", f, c, back);
        }
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("celsius".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Celsius));
        assert_eq!("Fahrenheit".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Fahrenheit));
        assert_eq!("F".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Fahrenheit));
        assert!("kelvin".parse::<TemperatureUnit>().is_err());
    }

    #[test]
    fn test_summary_and_prompt() {
        let catalog = Catalog::builtin();
        let summary = catalog.get_weather("London").unwrap().summary("London");
        assert_eq!(
            summary,
            "Weather in London:\nTemperature: 62°F\nCondition: Rainy\nHumidity: 80%\nWind Speed: 12 mph"
        );
        assert_eq!(weather_prompt("Paris"), "What's the weather like in Paris?");
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let record = Catalog::builtin().get_weather("Sydney").unwrap().clone();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["windSpeed"], 10.0);
        let parsed: WeatherRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }
}
