//! The client shell: owns the service's lifecycle and issues requests.
//!
//! Status moves `stopped -> starting -> running -> stopping -> stopped`.
//! Requests are only sent while running; otherwise they fail locally.

use crate::client::command::{ShellCommand, HELP};
use crate::client::connection::{Lookup, ServiceDescription};
use crate::client::error::{ClientError, ClientResult};
use crate::client::process::{ServiceConnection, ServiceHandle};
use crate::config::Config;
use crate::weather::{TemperatureUnit, WeatherRecord};
use std::fmt;
use tracing::{info, warn};

const FETCH_CITIES: &str = "fetch cities";
const FETCH_WEATHER: &str = "fetch weather data";
const CONVERT: &str = "convert temperature";
const FETCH_PROMPT: &str = "fetch prompt";
const DESCRIBE: &str = "describe service";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerStatus::Stopped => "stopped",
            ServerStatus::Starting => "starting",
            ServerStatus::Running => "running",
            ServerStatus::Stopping => "stopping",
        })
    }
}

/// Client-side view of the weather service.
pub struct Shell {
    config: Config,
    status: ServerStatus,
    service: Option<ServiceHandle>,
    cities: Vec<String>,
    selected_city: Option<String>,
    weather: Option<WeatherRecord>,
    error: Option<String>,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            status: ServerStatus::Stopped,
            service: None,
            cities: Vec::new(),
            selected_city: None,
            weather: None,
            error: None,
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn pid(&self) -> Option<u32> {
        self.service.as_ref().and_then(ServiceHandle::pid)
    }

    /// Cities from the last successful listing.
    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn selected_city(&self) -> Option<&str> {
        self.selected_city.as_deref()
    }

    /// Weather for the selected city, if it was found.
    pub fn weather(&self) -> Option<&WeatherRecord> {
        self.weather.as_ref()
    }

    /// Message from the last failed operation, cleared by the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Start the service and fetch the city list. Starting a running service is a no-op.
    pub async fn start(&mut self) -> ClientResult<String> {
        if matches!(self.status, ServerStatus::Running | ServerStatus::Starting) {
            return Ok("Weather service is already running".to_string());
        }

        self.error = None;
        self.status = ServerStatus::Starting;

        match self.launch().await {
            Ok(handle) => {
                let pid = handle.pid();
                self.service = Some(handle);
                self.status = ServerStatus::Running;
                info!("Weather service running");

                if let Err(e) = self.fetch_cities().await {
                    warn!("Initial city listing failed: {}", e);
                }

                Ok(match pid {
                    Some(pid) => format!("Weather service started with PID {}", pid),
                    None => "Weather service started (embedded)".to_string(),
                })
            }
            Err(e) => {
                self.status = ServerStatus::Stopped;
                let error = ClientError::StartFailed(Box::new(e));
                self.error = Some(error.to_string());
                Err(error)
            }
        }
    }

    async fn launch(&self) -> ClientResult<ServiceHandle> {
        let client = &self.config.client;
        let mut handle = ServiceHandle::launch(&self.config.server, client)?;
        if let Err(e) = handle.wait_ready(client.start_timeout()).await {
            let _ = handle.stop(client.stop_timeout()).await;
            return Err(e);
        }
        Ok(handle)
    }

    /// Stop the service and forget everything fetched from it.
    pub async fn stop(&mut self) -> ClientResult<String> {
        let Some(handle) = self.service.as_mut() else {
            self.status = ServerStatus::Stopped;
            return Ok("Weather service was not running".to_string());
        };

        self.error = None;
        self.status = ServerStatus::Stopping;

        match handle.stop(self.config.client.stop_timeout()).await {
            Ok(_) => {
                self.service = None;
                self.status = ServerStatus::Stopped;
                self.cities.clear();
                self.selected_city = None;
                self.weather = None;
                Ok("Weather service stopped".to_string())
            }
            Err(e) => {
                self.status = ServerStatus::Running;
                let error = ClientError::StopFailed(Box::new(e));
                self.error = Some(error.to_string());
                Err(error)
            }
        }
    }

    fn connection(&mut self, action: &'static str) -> ClientResult<&mut ServiceConnection> {
        if self.status != ServerStatus::Running {
            return Err(ClientError::NotRunning(action));
        }
        match self.service.as_mut() {
            Some(handle) => handle.connection(),
            None => Err(ClientError::NotRunning(action)),
        }
    }

    fn record<T>(&mut self, action: &str, result: ClientResult<T>) -> ClientResult<T> {
        match &result {
            Ok(_) => self.error = None,
            Err(e @ ClientError::NotRunning(_)) => self.error = Some(e.to_string()),
            Err(e) => self.error = Some(format!("Failed to {}: {}", action, e)),
        }
        result
    }

    /// Refresh the city list from the `weather://cities` resource.
    pub async fn fetch_cities(&mut self) -> ClientResult<Vec<String>> {
        let result = match self.connection(FETCH_CITIES) {
            Ok(conn) => conn.list_cities().await,
            Err(e) => Err(e),
        };
        let cities = self.record(FETCH_CITIES, result)?;
        self.cities = cities.clone();
        Ok(cities)
    }

    /// Accept either a city name or a 1-based index into the last listing.
    pub fn resolve_city(&self, input: &str) -> String {
        input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.cities.get(i))
            .cloned()
            .unwrap_or_else(|| input.to_string())
    }

    /// Select a city and fetch its weather through the `getWeather` tool.
    pub async fn select_city(&mut self, city: &str) -> ClientResult<Lookup> {
        let city = self.resolve_city(city);
        self.selected_city = Some(city.clone());

        let result = match self.connection(FETCH_WEATHER) {
            Ok(conn) => conn.get_weather(&city).await,
            Err(e) => Err(e),
        };
        let result = self.record(FETCH_WEATHER, result);
        self.weather = match &result {
            Ok(Lookup::Found(record)) => Some(record.clone()),
            _ => None,
        };
        result
    }

    /// Read a city through the `weather://city/{cityName}` resource.
    pub async fn read_city(&mut self, city: &str) -> ClientResult<Lookup> {
        let city = self.resolve_city(city);
        let result = match self.connection(FETCH_WEATHER) {
            Ok(conn) => conn.read_city(&city).await,
            Err(e) => Err(e),
        };
        self.record(FETCH_WEATHER, result)
    }

    pub async fn convert(
        &mut self,
        value: f64,
        from: TemperatureUnit,
        to: TemperatureUnit,
    ) -> ClientResult<f64> {
        let result = match self.connection(CONVERT) {
            Ok(conn) => conn.convert_temperature(value, from, to).await,
            Err(e) => Err(e),
        };
        self.record(CONVERT, result)
    }

    pub async fn prompt(&mut self, city: &str) -> ClientResult<String> {
        let city = self.resolve_city(city);
        let result = match self.connection(FETCH_PROMPT) {
            Ok(conn) => conn.weather_prompt(&city).await,
            Err(e) => Err(e),
        };
        self.record(FETCH_PROMPT, result)
    }

    pub async fn describe(&mut self) -> ClientResult<ServiceDescription> {
        let result = match self.connection(DESCRIBE) {
            Ok(conn) => conn.describe().await,
            Err(e) => Err(e),
        };
        self.record(DESCRIBE, result)
    }

    pub fn status_line(&self) -> String {
        match self.pid() {
            Some(pid) => format!("Server status: {} (PID {})", self.status, pid),
            None => format!("Server status: {}", self.status),
        }
    }

    /// Run one shell command and render its output as text.
    /// `Quit` is left to the caller and renders as nothing.
    pub async fn execute(&mut self, command: ShellCommand) -> ClientResult<String> {
        match command {
            ShellCommand::Start => self.start().await,
            ShellCommand::Stop => self.stop().await,
            ShellCommand::Status => Ok(self.status_line()),
            ShellCommand::Cities => {
                let cities = self.fetch_cities().await?;
                Ok(format_city_list(&cities))
            }
            ShellCommand::Weather(city) => {
                let lookup = self.select_city(&city).await?;
                Ok(format_lookup(self.selected_city().unwrap_or(&city), &lookup))
            }
            ShellCommand::City(city) => {
                let resolved = self.resolve_city(&city);
                let lookup = self.read_city(&resolved).await?;
                Ok(format_lookup(&resolved, &lookup))
            }
            ShellCommand::Convert { value, from, to } => {
                let result = self.convert(value, from, to).await?;
                Ok(format_conversion(value, from, result, to))
            }
            ShellCommand::Prompt(city) => self.prompt(&city).await,
            ShellCommand::Describe => {
                let description = self.describe().await?;
                Ok(format_description(&description))
            }
            ShellCommand::Help => Ok(HELP.to_string()),
            ShellCommand::Quit => Ok(String::new()),
        }
    }

    /// Stop the service if it is still up. Used on exit.
    pub async fn shutdown(&mut self) {
        if self.service.is_some() {
            if let Err(e) = self.stop().await {
                warn!("{}", e);
            }
        }
    }
}

pub fn format_city_list(cities: &[String]) -> String {
    if cities.is_empty() {
        return "No cities available".to_string();
    }
    cities
        .iter()
        .enumerate()
        .map(|(i, city)| format!("{:>2}. {}", i + 1, city))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converted values are shown to one decimal; a same-unit conversion echoes its input.
pub fn format_conversion(
    value: f64,
    from: TemperatureUnit,
    result: f64,
    to: TemperatureUnit,
) -> String {
    if from == to {
        format!("{} {} = {} {}", value, from, result, to)
    } else {
        format!("{} {} = {:.1} {}", value, from, result, to)
    }
}

pub fn format_lookup(city: &str, lookup: &Lookup) -> String {
    match lookup {
        Lookup::Found(record) => record.summary(city),
        Lookup::NotFound(message) => message.clone(),
    }
}

pub fn format_description(description: &ServiceDescription) -> String {
    let mut lines = vec!["Resources:".to_string()];
    for resource in &description.resources {
        let address = resource
            .uri
            .as_deref()
            .or(resource.uri_template.as_deref())
            .unwrap_or("?");
        lines.push(format!("  {:<28} {}", address, resource.description));
    }
    lines.push("Tools:".to_string());
    for tool in &description.tools {
        lines.push(format!("  {:<28} {}", tool.name, tool.description));
    }
    lines.push("Prompts:".to_string());
    for prompt in &description.prompts {
        lines.push(format!("  {:<28} {}", prompt.name, prompt.description));
    }
    lines.join("\n")
}
