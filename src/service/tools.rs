//! Invocable tools.
//!
//! Tools are an enum rather than trait objects; there are two of them and
//! they share no state beyond the catalog.

use crate::protocol::{RpcError, ToolDescriptor, ToolResult};
use crate::weather::{convert_temperature, not_found_message, Catalog, TemperatureUnit};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    GetWeather,
    ConvertTemperature,
}

#[derive(Debug, Deserialize)]
struct GetWeatherArgs {
    city: String,
}

#[derive(Debug, Deserialize)]
struct ConvertTemperatureArgs {
    temperature: f64,
    from: TemperatureUnit,
    to: TemperatureUnit,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::GetWeather, Tool::ConvertTemperature];

    /// Wire name of the tool.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::GetWeather => "getWeather",
            Tool::ConvertTemperature => "convertTemperature",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::GetWeather => "Get the current weather for a city",
            Tool::ConvertTemperature => "Convert a temperature between celsius and fahrenheit",
        }
    }

    /// JSON schema of the tool's arguments.
    pub fn input_schema(&self) -> Value {
        match self {
            Tool::GetWeather => json!({
                "type": "object",
                "properties": {
                    "city": { "type": "string" }
                },
                "required": ["city"]
            }),
            Tool::ConvertTemperature => json!({
                "type": "object",
                "properties": {
                    "temperature": { "type": "number" },
                    "from": { "type": "string", "enum": ["celsius", "fahrenheit"] },
                    "to": { "type": "string", "enum": ["celsius", "fahrenheit"] }
                },
                "required": ["temperature", "from", "to"]
            }),
        }
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Run the tool. Malformed arguments are a protocol error; an unknown city
    /// is a normal result with `isError` set.
    pub fn call(&self, catalog: &Catalog, arguments: Value) -> Result<ToolResult, RpcError> {
        match self {
            Tool::GetWeather => {
                let args: GetWeatherArgs = parse_arguments(self, arguments)?;
                Ok(match catalog.get_weather(&args.city) {
                    Some(record) => ToolResult::success(
                        record.summary(&args.city),
                        serde_json::to_value(record).map_err(RpcError::internal)?,
                    ),
                    None => ToolResult::failure(not_found_message(&args.city)),
                })
            }
            Tool::ConvertTemperature => {
                let args: ConvertTemperatureArgs = parse_arguments(self, arguments)?;
                let value = convert_temperature(args.temperature, args.from, args.to);
                if !value.is_finite() {
                    return Err(RpcError::invalid_params(format!(
                        "{}: {} {} is out of range",
                        self.name(),
                        args.temperature,
                        args.from
                    )));
                }
                let text = if args.from == args.to {
                    format!("{}", value)
                } else {
                    format!("{:.1}", value)
                };
                Ok(ToolResult::success(
                    text,
                    json!({ "value": value, "unit": args.to }),
                ))
            }
        }
    }
}

fn parse_arguments<T: DeserializeOwned>(tool: &Tool, arguments: Value) -> Result<T, RpcError> {
    serde_json::from_value(arguments)
        .map_err(|e| RpcError::invalid_params(format!("{}: {}", tool.name(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes;

    fn call(tool: Tool, arguments: Value) -> Result<ToolResult, RpcError> {
        tool.call(&Catalog::builtin(), arguments)
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(Tool::from_name("getWeather"), Some(Tool::GetWeather));
        assert_eq!(
            Tool::from_name("convertTemperature"),
            Some(Tool::ConvertTemperature)
        );
        assert_eq!(Tool::from_name("get_weather"), None);
    }

    #[test]
    fn test_get_weather_success() {
        let result = call(Tool::GetWeather, json!({ "city": "Tokyo" })).unwrap();
        assert!(!result.is_error);
        assert!(result.text().starts_with("Weather in Tokyo:\nTemperature: 78°F"));
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["condition"], "Partly Cloudy");
        assert_eq!(structured["windSpeed"], 5.0);
    }

    #[test]
    fn test_get_weather_unknown_city() {
        let result = call(Tool::GetWeather, json!({ "city": "Atlantis" })).unwrap();
        assert!(result.is_error);
        assert_eq!(result.text(), "No weather data available for Atlantis");
        assert!(result.structured_content.is_none());
    }

    #[test]
    fn test_get_weather_missing_city() {
        let err = call(Tool::GetWeather, json!({})).unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMS);
        assert!(err.message.contains("getWeather"));
    }

    #[test]
    fn test_convert_formats_one_decimal() {
        let result = call(
            Tool::ConvertTemperature,
            json!({ "temperature": 32, "from": "fahrenheit", "to": "celsius" }),
        )
        .unwrap();
        assert_eq!(result.text(), "0.0");
        assert_eq!(result.structured_content.unwrap()["unit"], "celsius");
    }

    #[test]
    fn test_convert_same_unit_echoes_value() {
        let result = call(
            Tool::ConvertTemperature,
            json!({ "temperature": 21.25, "from": "celsius", "to": "celsius" }),
        )
        .unwrap();
        assert_eq!(result.text(), "21.25");
        assert_eq!(result.structured_content.unwrap()["value"], 21.25);
    }

    #[test]
    fn test_convert_rejects_overflow() {
        let err = call(
            Tool::ConvertTemperature,
            json!({ "temperature": 1e308, "from": "celsius", "to": "fahrenheit" }),
        )
        .unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMS);
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn test_convert_rejects_unknown_unit() {
        let err = call(
            Tool::ConvertTemperature,
            json!({ "temperature": 1, "from": "kelvin", "to": "celsius" }),
        )
        .unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMS);
    }
}
