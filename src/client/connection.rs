//! Request/response channel to a running weather service.

use crate::client::error::{ClientError, ClientResult};
use crate::protocol::{
    framing, Method, PromptDescriptor, PromptResult, Request, ResourceContents,
    ResourceDescriptor, Response, ToolDescriptor, ToolResult,
};
use crate::service::{prompts::WEATHER_PROMPT, resources};
use crate::weather::{TemperatureUnit, WeatherRecord};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::debug;

/// Outcome of a city lookup. An unknown city is an answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(WeatherRecord),
    NotFound(String),
}

/// Everything the service advertises through its `list_*` methods.
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    pub resources: Vec<ResourceDescriptor>,
    pub tools: Vec<ToolDescriptor>,
    pub prompts: Vec<PromptDescriptor>,
}

/// One outstanding request at a time over a pair of byte streams.
pub struct Connection<R, W> {
    reader: BufReader<R>,
    writer: W,
    next_id: u64,
    timeout: Duration,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            next_id: 1,
            timeout,
        }
    }

    /// Send a request and return its `result`, bounded by the request timeout.
    pub async fn request(&mut self, method: Method, params: Value) -> ClientResult<Value> {
        let id = self.next_id;
        self.next_id += 1;
        let request = Request::new(id, method, params);

        let timeout = self.timeout;
        let response = tokio::time::timeout(timeout, self.exchange(&request, id))
            .await
            .map_err(|_| ClientError::Timeout(timeout))??;

        if response.id != Value::from(id) {
            if let Some(error) = response.error {
                return Err(error.into());
            }
            return Err(ClientError::UnexpectedResponse(format!(
                "expected id {}, got {}",
                id, response.id
            )));
        }

        match (response.result, response.error) {
            (_, Some(error)) => Err(error.into()),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ClientError::UnexpectedResponse(
                "response has neither result nor error".to_string(),
            )),
        }
    }

    /// Write `request` and read until a response that is not stale.
    ///
    /// Responses with a numeric id below `id` answer requests that already
    /// timed out and are dropped. Anything else is returned for the caller to check.
    async fn exchange(&mut self, request: &Request, id: u64) -> ClientResult<Response> {
        debug!("Sending {} (id {})", request.method, id);
        framing::write_message(&mut self.writer, request).await?;

        loop {
            let line = framing::read_line(&mut self.reader)
                .await?
                .ok_or(ClientError::Closed)?;
            let response: Response = framing::decode(&line)?;
            match response.id.as_u64() {
                Some(late) if late < id => debug!("Dropping late response (id {})", late),
                _ => return Ok(response),
            }
        }
    }

    async fn request_as<T: DeserializeOwned>(
        &mut self,
        method: Method,
        params: Value,
    ) -> ClientResult<T> {
        let result = self.request(method, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Liveness probe.
    pub async fn ping(&mut self) -> ClientResult<()> {
        self.request(Method::Ping, json!({})).await.map(|_| ())
    }

    async fn get_resource(&mut self, uri: &str) -> ClientResult<String> {
        let contents: ResourceContents = self
            .request_as(Method::GetResource, json!({ "uri": uri }))
            .await?;
        contents
            .contents
            .into_iter()
            .next()
            .map(|content| content.text)
            .ok_or_else(|| ClientError::UnexpectedResponse(format!("{} has no contents", uri)))
    }

    async fn invoke_tool(&mut self, tool: &str, arguments: Value) -> ClientResult<ToolResult> {
        self.request_as(
            Method::InvokeTool,
            json!({ "tool": tool, "arguments": arguments }),
        )
        .await
    }

    /// City names from the `weather://cities` resource.
    pub async fn list_cities(&mut self) -> ClientResult<Vec<String>> {
        let text = self.get_resource(resources::CITIES_URI).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Weather from the `weather://city/{cityName}` resource.
    pub async fn read_city(&mut self, city: &str) -> ClientResult<Lookup> {
        let text = self.get_resource(&resources::city_uri(city)).await?;
        Ok(match serde_json::from_str::<WeatherRecord>(&text) {
            Ok(record) => Lookup::Found(record),
            Err(_) => Lookup::NotFound(text),
        })
    }

    /// Weather from the `getWeather` tool.
    pub async fn get_weather(&mut self, city: &str) -> ClientResult<Lookup> {
        let result = self.invoke_tool("getWeather", json!({ "city": city })).await?;
        if result.is_error {
            return Ok(Lookup::NotFound(result.text()));
        }

        let structured = result.structured_content.ok_or_else(|| {
            ClientError::UnexpectedResponse("getWeather returned no structured content".to_string())
        })?;
        Ok(Lookup::Found(serde_json::from_value(structured)?))
    }

    /// Convert through the `convertTemperature` tool.
    pub async fn convert_temperature(
        &mut self,
        value: f64,
        from: TemperatureUnit,
        to: TemperatureUnit,
    ) -> ClientResult<f64> {
        #[derive(Deserialize)]
        struct Converted {
            value: f64,
        }

        let result = self
            .invoke_tool(
                "convertTemperature",
                json!({ "temperature": value, "from": from, "to": to }),
            )
            .await?;
        if result.is_error {
            return Err(ClientError::UnexpectedResponse(result.text()));
        }

        match result.structured_content {
            Some(structured) => Ok(serde_json::from_value::<Converted>(structured)?.value),
            None => result.text().trim().parse().map_err(|_| {
                ClientError::UnexpectedResponse(format!("not a number: {}", result.text()))
            }),
        }
    }

    /// Text of the `weatherPrompt` prompt.
    pub async fn weather_prompt(&mut self, city: &str) -> ClientResult<String> {
        let result: PromptResult = self
            .request_as(
                Method::GetPrompt,
                json!({ "prompt": WEATHER_PROMPT, "arguments": { "city": city } }),
            )
            .await?;
        result
            .messages
            .first()
            .and_then(|message| message.content.first())
            .map(|content| content.as_text().to_string())
            .ok_or_else(|| ClientError::UnexpectedResponse("empty prompt".to_string()))
    }

    /// Resources, tools, and prompts the service advertises.
    pub async fn describe(&mut self) -> ClientResult<ServiceDescription> {
        #[derive(Deserialize)]
        struct Resources {
            resources: Vec<ResourceDescriptor>,
        }
        #[derive(Deserialize)]
        struct Tools {
            tools: Vec<ToolDescriptor>,
        }
        #[derive(Deserialize)]
        struct Prompts {
            prompts: Vec<PromptDescriptor>,
        }

        let resources: Resources = self.request_as(Method::ListResources, json!({})).await?;
        let tools: Tools = self.request_as(Method::ListTools, json!({})).await?;
        let prompts: Prompts = self.request_as(Method::ListPrompts, json!({})).await?;

        Ok(ServiceDescription {
            resources: resources.resources,
            tools: tools.tools,
            prompts: prompts.prompts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::WeatherService;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

    type TestConnection = Connection<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn connect() -> TestConnection {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        tokio::spawn(async move {
            let _ = WeatherService::default()
                .serve(server_read, server_write)
                .await;
        });

        let (client_read, client_write) = tokio::io::split(client);
        Connection::new(client_read, client_write, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_list_cities_parses_real_response() {
        let mut conn = connect();
        let mut cities = conn.list_cities().await.unwrap();
        cities.sort();
        assert_eq!(cities, vec!["London", "New York", "Paris", "Sydney", "Tokyo"]);
    }

    #[tokio::test]
    async fn test_get_weather_found_and_not_found() {
        let mut conn = connect();
        match conn.get_weather("Tokyo").await.unwrap() {
            Lookup::Found(record) => {
                assert_eq!(record.temperature, 78.0);
                assert_eq!(record.condition, "Partly Cloudy");
                assert_eq!(record.humidity, 65);
                assert_eq!(record.wind_speed, 5.0);
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
        assert_eq!(
            conn.get_weather("Atlantis").await.unwrap(),
            Lookup::NotFound("No weather data available for Atlantis".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_city_decodes_spaces() {
        let mut conn = connect();
        match conn.read_city("New York").await.unwrap() {
            Lookup::Found(record) => assert_eq!(record.condition, "Sunny"),
            other => panic!("unexpected lookup: {:?}", other),
        }
        assert!(matches!(
            conn.read_city("Gotham").await.unwrap(),
            Lookup::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_convert_and_prompt() {
        let mut conn = connect();
        let celsius = conn
            .convert_temperature(32.0, TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius)
            .await
            .unwrap();
        assert_eq!(celsius, 0.0);
        let same = conn
            .convert_temperature(12.34, TemperatureUnit::Celsius, TemperatureUnit::Celsius)
            .await
            .unwrap();
        assert_eq!(same, 12.34);
        assert_eq!(
            conn.weather_prompt("Tokyo").await.unwrap(),
            "What's the weather like in Tokyo?"
        );
    }

    #[tokio::test]
    async fn test_describe() {
        let mut conn = connect();
        let description = conn.describe().await.unwrap();
        assert_eq!(description.resources.len(), 2);
        let names: Vec<_> = description.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["getWeather", "convertTemperature"]);
        assert_eq!(description.prompts[0].name, "weatherPrompt");
    }

    #[tokio::test]
    async fn test_request_ids_increase() {
        let (client, server) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client);
        let mut conn = Connection::new(client_read, client_write, Duration::from_secs(5));

        let (server_read, mut server_write) = tokio::io::split(server);
        let peer = tokio::spawn(async move {
            let mut lines = tokio::io::BufReader::new(server_read).lines();
            let mut ids = Vec::new();
            for _ in 0..2 {
                let line = lines.next_line().await.unwrap().unwrap();
                let request: Request = serde_json::from_str(&line).unwrap();
                let id = request.id.unwrap();
                ids.push(id.clone());
                let response = Response::success(id, json!({}));
                let mut out = serde_json::to_vec(&response).unwrap();
                out.push(b'\n');
                server_write.write_all(&out).await.unwrap();
            }
            ids
        });

        conn.ping().await.unwrap();
        conn.ping().await.unwrap();
        assert_eq!(peer.await.unwrap(), vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_mismatched_id_is_rejected() {
        let (client, server) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client);
        let mut conn = Connection::new(client_read, client_write, Duration::from_secs(5));

        let (server_read, mut server_write) = tokio::io::split(server);
        tokio::spawn(async move {
            let mut lines = tokio::io::BufReader::new(server_read).lines();
            let _ = lines.next_line().await;
            let _ = server_write
                .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":99,\"result\":{}}\n")
                .await;
            // Keep the stream open until the client gives up.
            let _ = lines.next_line().await;
        });

        let err = conn.ping().await.unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedResponse(_)));
    }

    #[tokio::test]
    async fn test_late_response_after_timeout_is_skipped() {
        let (client, server) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client);
        let mut conn = Connection::new(client_read, client_write, Duration::from_millis(200));

        // Answers every request, but only after 300 ms for the first one.
        let (server_read, mut server_write) = tokio::io::split(server);
        tokio::spawn(async move {
            let mut lines = tokio::io::BufReader::new(server_read).lines();
            let mut first = true;
            while let Ok(Some(line)) = lines.next_line().await {
                let request: Request = serde_json::from_str(&line).unwrap();
                if first {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    first = false;
                }
                let response = Response::success(request.id.unwrap(), json!({}));
                let mut out = serde_json::to_vec(&response).unwrap();
                out.push(b'\n');
                if server_write.write_all(&out).await.is_err() {
                    break;
                }
            }
        });

        let err = conn.ping().await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));
        for _ in 0..3 {
            conn.ping().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let (client, _server) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client);
        let mut conn = Connection::new(client_read, client_write, Duration::from_millis(50));

        let err = conn.ping().await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_closed_peer() {
        let (client, server) = tokio::io::duplex(4096);
        drop(server);
        let (client_read, client_write) = tokio::io::split(client);
        let mut conn = Connection::new(client_read, client_write, Duration::from_secs(1));

        let err = conn.ping().await.unwrap_err();
        assert!(matches!(err, ClientError::Closed | ClientError::Io(_)));
    }
}
