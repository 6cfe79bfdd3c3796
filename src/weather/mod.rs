use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

const WTTR_URL: &str = "https://wttr.in/";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("invalid location {0:?}")]
    Location(String),
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("weather service returned HTTP {0}")]
    Status(u16),
    #[error("no weather data available")]
    NoData,
    #[error("unreadable temperature {0:?}")]
    Temperature(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherKind {
    Clear,
    Cloudy,
    Fog,
    Rain,
    Thunder,
    Snow,
}

impl WeatherKind {
    /// Maps a wttr.in (WWO) weather code. Unknown codes read as clear.
    pub fn from_code(code: &str) -> Self {
        match code {
            "116" | "119" | "122" => WeatherKind::Cloudy,
            "143" | "248" | "260" => WeatherKind::Fog,
            "176" | "263" | "266" | "281" | "284" | "293" | "296" | "299" | "302" | "305"
            | "308" | "311" | "314" | "317" | "320" | "386" | "389" | "392" | "395" => {
                WeatherKind::Rain
            }
            "200" => WeatherKind::Thunder,
            "179" | "182" | "185" | "227" | "230" | "323" | "326" | "329" | "332" | "335"
            | "338" | "350" | "353" | "356" | "359" | "362" | "365" | "368" | "371" | "374"
            | "377" => WeatherKind::Snow,
            _ => WeatherKind::Clear,
        }
    }

    pub fn art(self) -> &'static [&'static str] {
        match self {
            WeatherKind::Clear => &[
                "    \\   /    ",
                "     .-.     ",
                "  ― (   ) ―  ",
                "     `-'     ",
                "    /   \\    ",
            ],
            WeatherKind::Cloudy | WeatherKind::Fog => &[
                "             ",
                "     .--.    ",
                "  .-(    ).  ",
                " (___.__)__) ",
                "             ",
            ],
            WeatherKind::Rain | WeatherKind::Thunder => &[
                "     .--.    ",
                "  .-(    ).  ",
                " (___.__)__) ",
                "  / / / /    ",
                " / / / /     ",
            ],
            WeatherKind::Snow => &[
                "     .--.    ",
                "  .-(    ).  ",
                " (___.__)__) ",
                "  * * * *    ",
                " * * * *     ",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    pub name: String,
    pub temp_c: f64,
    pub description: String,
    pub kind: WeatherKind,
}

#[derive(Deserialize)]
struct WttrResponse {
    #[serde(default)]
    current_condition: Vec<CurrentCondition>,
    #[serde(default)]
    nearest_area: Vec<NearestArea>,
}

#[derive(Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<TextValue>,
    #[serde(rename = "weatherCode", default)]
    weather_code: String,
}

#[derive(Deserialize)]
struct NearestArea {
    #[serde(rename = "areaName", default)]
    area_name: Vec<TextValue>,
}

#[derive(Deserialize)]
struct TextValue {
    value: String,
}

/// Where the dashboard's weather readout comes from.
pub trait WeatherSource {
    fn current(&self, city: &str) -> Result<Weather, WeatherError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Wttr;

impl WeatherSource for Wttr {
    fn current(&self, city: &str) -> Result<Weather, WeatherError> {
        fetch_weather(city)
    }
}

/// Current conditions for `city` from wttr.in.
pub fn fetch_weather(city: &str) -> Result<Weather, WeatherError> {
    let mut url = Url::parse(WTTR_URL).map_err(|_| WeatherError::Location(city.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| WeatherError::Location(city.to_string()))?
        .pop_if_empty()
        .push(city);
    url.query_pairs_mut().append_pair("format", "j1");

    let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
    let resp = client.get(url).send()?;
    if !resp.status().is_success() {
        return Err(WeatherError::Status(resp.status().as_u16()));
    }
    let body: WttrResponse = resp.json()?;
    into_weather(city, body)
}

fn into_weather(city: &str, body: WttrResponse) -> Result<Weather, WeatherError> {
    let current = body
        .current_condition
        .into_iter()
        .next()
        .ok_or(WeatherError::NoData)?;
    let temp_c = current
        .temp_c
        .trim()
        .parse::<f64>()
        .map_err(|_| WeatherError::Temperature(current.temp_c.clone()))?;
    let name = body
        .nearest_area
        .into_iter()
        .next()
        .and_then(|area| area.area_name.into_iter().next())
        .map(|v| v.value)
        .unwrap_or_else(|| city.to_string());
    let description = current
        .weather_desc
        .into_iter()
        .next()
        .map(|v| v.value.trim().to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(Weather {
        name,
        temp_c,
        description,
        kind: WeatherKind::from_code(&current.weather_code),
    })
}

#[cfg(test)]
mod tests {
    use super::{WeatherError, WeatherKind, WttrResponse, into_weather};

    fn parse(raw: &str) -> WttrResponse {
        serde_json::from_str(raw).expect("decode")
    }

    #[test]
    fn reads_current_condition_and_area() {
        let body = parse(
            r#"{
                "current_condition": [{
                    "temp_C": "21",
                    "weatherCode": "296",
                    "weatherDesc": [{"value": "Light rain "}]
                }],
                "nearest_area": [{"areaName": [{"value": "Athens"}]}]
            }"#,
        );
        let weather = into_weather("athens", body).expect("weather");
        assert_eq!(weather.name, "Athens");
        assert_eq!(weather.temp_c, 21.0);
        assert_eq!(weather.description, "Light rain");
        assert_eq!(weather.kind, WeatherKind::Rain);
    }

    #[test]
    fn falls_back_to_requested_city_and_unknown_description() {
        let body = parse(r#"{"current_condition": [{"temp_C": "-3"}]}"#);
        let weather = into_weather("Oslo", body).expect("weather");
        assert_eq!(weather.name, "Oslo");
        assert_eq!(weather.description, "Unknown");
        assert_eq!(weather.temp_c, -3.0);
        assert_eq!(weather.kind, WeatherKind::Clear);
    }

    #[test]
    fn empty_or_bad_reports_are_errors() {
        assert!(matches!(
            into_weather("x", parse(r#"{"current_condition": []}"#)),
            Err(WeatherError::NoData)
        ));
        assert!(matches!(
            into_weather("x", parse(r#"{"current_condition": [{"temp_C": "warm"}]}"#)),
            Err(WeatherError::Temperature(_))
        ));
    }

    #[test]
    fn weather_codes_map_to_kinds() {
        assert_eq!(WeatherKind::from_code("113"), WeatherKind::Clear);
        assert_eq!(WeatherKind::from_code("122"), WeatherKind::Cloudy);
        assert_eq!(WeatherKind::from_code("248"), WeatherKind::Fog);
        assert_eq!(WeatherKind::from_code("200"), WeatherKind::Thunder);
        assert_eq!(WeatherKind::from_code("338"), WeatherKind::Snow);
        assert_eq!(WeatherKind::from_code("999"), WeatherKind::Clear);
    }
}
