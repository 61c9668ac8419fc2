//! Prompt templates.

use crate::protocol::{
    Content, PromptArgument, PromptDescriptor, PromptMessage, PromptResult, Role, RpcError,
};
use crate::weather::weather_prompt;
use serde::Deserialize;
use serde_json::Value;

pub const WEATHER_PROMPT: &str = "weatherPrompt";

#[derive(Debug, Deserialize)]
struct WeatherPromptArgs {
    city: String,
}

/// Handle `get_prompt`.
pub fn get(name: &str, arguments: Value) -> Result<PromptResult, RpcError> {
    if name != WEATHER_PROMPT {
        return Err(RpcError::invalid_params(format!("unknown prompt '{}'", name)));
    }

    let args: WeatherPromptArgs = serde_json::from_value(arguments)
        .map_err(|e| RpcError::invalid_params(format!("{}: {}", WEATHER_PROMPT, e)))?;

    Ok(PromptResult {
        messages: vec![PromptMessage {
            role: Role::User,
            content: vec![Content::text(weather_prompt(&args.city))],
        }],
    })
}

/// Handle `list_prompts`.
pub fn descriptors() -> Vec<PromptDescriptor> {
    vec![PromptDescriptor {
        name: WEATHER_PROMPT.to_string(),
        description: "Ask about the weather in a city".to_string(),
        arguments: vec![PromptArgument {
            name: "city".to_string(),
            required: true,
        }],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_weather_prompt() {
        let result = get(WEATHER_PROMPT, json!({ "city": "Sydney" })).unwrap();
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, Role::User);
        assert_eq!(
            result.messages[0].content[0].as_text(),
            "What's the weather like in Sydney?"
        );
    }

    #[test]
    fn test_prompt_for_unknown_city_still_formats() {
        let result = get(WEATHER_PROMPT, json!({ "city": "Atlantis" })).unwrap();
        assert_eq!(
            result.messages[0].content[0].as_text(),
            "What's the weather like in Atlantis?"
        );
    }

    #[test]
    fn test_unknown_prompt() {
        assert!(get("forecastPrompt", json!({ "city": "Paris" })).is_err());
    }
}
