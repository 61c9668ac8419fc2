//! Read-only resources addressed by `weather://` URIs.

use crate::protocol::{ResourceContent, ResourceContents, ResourceDescriptor, RpcError};
use crate::weather::{not_found_message, Catalog};

pub const CITIES_URI: &str = "weather://cities";
pub const CITY_URI_TEMPLATE: &str = "weather://city/{cityName}";
const CITY_URI_PREFIX: &str = "weather://city/";

/// A parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// `weather://cities`
    Cities,
    /// `weather://city/{cityName}`, name already percent-decoded.
    City(String),
}

impl Resource {
    /// Match a URI against the known resources.
    pub fn parse(uri: &str) -> Option<Self> {
        if uri == CITIES_URI {
            return Some(Resource::Cities);
        }

        let encoded = uri.strip_prefix(CITY_URI_PREFIX)?;
        if encoded.is_empty() || encoded.contains('/') {
            return None;
        }
        let city = urlencoding::decode(encoded).ok()?;
        Some(Resource::City(city.into_owned()))
    }

    /// Render the resource body. Unknown cities yield the not-found message.
    pub fn read(&self, catalog: &Catalog) -> serde_json::Result<String> {
        match self {
            Resource::Cities => serde_json::to_string(&catalog.list_cities()),
            Resource::City(city) => match catalog.get_weather(city) {
                Some(record) => serde_json::to_string_pretty(record),
                None => Ok(not_found_message(city)),
            },
        }
    }
}

/// URI of the per-city resource, with the name percent-encoded.
pub fn city_uri(city: &str) -> String {
    format!("{}{}", CITY_URI_PREFIX, urlencoding::encode(city))
}

/// Handle `get_resource`.
pub fn get(catalog: &Catalog, uri: &str) -> Result<ResourceContents, RpcError> {
    let resource = Resource::parse(uri).ok_or_else(|| RpcError::resource_not_found(uri))?;
    let text = resource.read(catalog).map_err(RpcError::internal)?;

    Ok(ResourceContents {
        contents: vec![ResourceContent {
            uri: uri.to_string(),
            text,
        }],
    })
}

/// Handle `list_resources`.
pub fn descriptors() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor {
            name: "cities".to_string(),
            uri: Some(CITIES_URI.to_string()),
            uri_template: None,
            description: "Names of all cities with weather data, as a JSON array".to_string(),
        },
        ResourceDescriptor {
            name: "cityWeather".to_string(),
            uri: None,
            uri_template: Some(CITY_URI_TEMPLATE.to_string()),
            description: "Current weather for one city, as a JSON object".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes;
    use crate::weather::WeatherRecord;

    #[test]
    fn test_parse_uris() {
        assert_eq!(Resource::parse("weather://cities"), Some(Resource::Cities));
        assert_eq!(
            Resource::parse("weather://city/Tokyo"),
            Some(Resource::City("Tokyo".to_string()))
        );
        assert_eq!(
            Resource::parse("weather://city/New%20York"),
            Some(Resource::City("New York".to_string()))
        );
        assert_eq!(Resource::parse("weather://city/"), None);
        assert_eq!(Resource::parse("weather://city/a/b"), None);
        assert_eq!(Resource::parse("weather://forecast"), None);
    }

    #[test]
    fn test_city_uri_round_trips_through_parse() {
        let uri = city_uri("New York");
        assert_eq!(uri, "weather://city/New%20York");
        assert_eq!(
            Resource::parse(&uri),
            Some(Resource::City("New York".to_string()))
        );
    }

    #[test]
    fn test_cities_resource_is_json_array() {
        let contents = get(&Catalog::builtin(), CITIES_URI).unwrap();
        assert_eq!(contents.contents.len(), 1);
        assert_eq!(contents.contents[0].uri, CITIES_URI);

        let names: Vec<String> = serde_json::from_str(&contents.contents[0].text).unwrap();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"Sydney".to_string()));
    }

    #[test]
    fn test_city_resource_returns_record() {
        let contents = get(&Catalog::builtin(), "weather://city/Paris").unwrap();
        let record: WeatherRecord = serde_json::from_str(&contents.contents[0].text).unwrap();
        assert_eq!(record.condition, "Cloudy");
        assert_eq!(record.humidity, 70);
    }

    #[test]
    fn test_unknown_city_is_text_not_error() {
        let contents = get(&Catalog::builtin(), "weather://city/Atlantis").unwrap();
        assert_eq!(
            contents.contents[0].text,
            "No weather data available for Atlantis"
        );
    }

    #[test]
    fn test_unknown_uri_is_error() {
        let err = get(&Catalog::builtin(), "file:///etc/passwd").unwrap_err();
        assert_eq!(err.code, codes::RESOURCE_NOT_FOUND);
    }
}
