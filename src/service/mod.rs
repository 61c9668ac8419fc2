//! The weather service.
//!
//! A JSON-RPC endpoint on stdio that:
//! - Serves the static city catalog as `weather://` resources
//! - Exposes the `getWeather` and `convertTemperature` tools
//! - Renders the `weatherPrompt` prompt

pub mod prompts;
pub mod resources;
pub mod server;
pub mod tools;

pub use server::WeatherService;
