//! Commands accepted by the interactive shell.

use crate::weather::TemperatureUnit;
use std::str::FromStr;

pub const HELP: &str = "\
Commands:
  start                          start the weather service
  stop                           stop the weather service
  status                         show the service status
  cities                         list available cities
  weather <city|number>          current weather (getWeather tool)
  city <city|number>             current weather (weather://city resource)
  convert <value> <from> <to>    convert between celsius and fahrenheit
  prompt <city>                  show the weather prompt for a city
  describe                       list the service's resources, tools, and prompts
  help                           show this help
  quit                           stop the service and exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Start,
    Stop,
    Status,
    Cities,
    Weather(String),
    City(String),
    Convert {
        value: f64,
        from: TemperatureUnit,
        to: TemperatureUnit,
    },
    Prompt(String),
    Describe,
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (verb, rest) = match input.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (input, ""),
        };

        let require_arg = |what: &str| -> Result<String, String> {
            if rest.is_empty() {
                Err(format!("Usage: {} <{}>", verb, what))
            } else {
                Ok(rest.to_string())
            }
        };

        match verb.to_ascii_lowercase().as_str() {
            "start" => Ok(ShellCommand::Start),
            "stop" => Ok(ShellCommand::Stop),
            "status" => Ok(ShellCommand::Status),
            "cities" | "ls" => Ok(ShellCommand::Cities),
            "weather" | "w" => require_arg("city").map(ShellCommand::Weather),
            "city" => require_arg("city").map(ShellCommand::City),
            "prompt" => require_arg("city").map(ShellCommand::Prompt),
            "convert" => parse_convert(rest),
            "describe" => Ok(ShellCommand::Describe),
            "help" | "?" => Ok(ShellCommand::Help),
            "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
            "" => Err("Empty command".to_string()),
            other => Err(format!("Unknown command '{}'. Type 'help' for a list.", other)),
        }
    }
}

fn parse_convert(rest: &str) -> Result<ShellCommand, String> {
    const USAGE: &str = "Usage: convert <value> <celsius|fahrenheit> <celsius|fahrenheit>";

    let parts: Vec<&str> = rest.split_whitespace().collect();
    let [value, from, to] = parts.as_slice() else {
        return Err(USAGE.to_string());
    };

    let value: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    let from: TemperatureUnit = from.parse().map_err(|e| format!("{}", e))?;
    let to: TemperatureUnit = to.parse().map_err(|e| format!("{}", e))?;

    Ok(ShellCommand::Convert { value, from, to })
}
