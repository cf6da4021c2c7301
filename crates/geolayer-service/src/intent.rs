//! Rule-based intent classification for free-text requests.
//!
//! Recognizes English and Russian keywords. A request is turned into a
//! `(source, location, data_type)` triple when both a topic and a place can
//! be found; anything else gets a conversational reply.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A concrete layer to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRequest {
    pub source: String,
    pub location: String,
    pub data_type: String,
}

impl LayerRequest {
    pub fn new(
        source: impl Into<String>,
        location: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            location: location.into(),
            data_type: data_type.into(),
        }
    }

    /// Short acknowledgement shown above the layer summary.
    pub fn describe(&self) -> String {
        format!("Showing {} for {}.", self.data_type, self.location)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Data(LayerRequest),
    Chat(String),
}

const HELP_MESSAGE: &str =
    "Ask me about population, density, weather, earthquakes, satellite imagery or map features of a place.";
const NEED_PLACE_MESSAGE: &str = "Which place should I look at? Try \"weather in Minsk\".";

/// Topic keywords, checked in order; the first hit wins.
const TOPICS: &[(&[&str], &str, &str)] = &[
    (&["earthquake", "землетряс", "seismic", "сейсм"], "earthquakes", "seismic"),
    (&["satellite", "спутник", "imagery", "снимок"], "satellite", "imagery"),
    (&["weather", "погод", "temperature", "температур"], "weather", "current"),
    (&["density", "плотност"], "worldbank", "density"),
    (&["population", "населени", "people"], "worldbank", "population"),
    (&["where is", "где находится", "coordinates of"], "geocoding", "location"),
];

/// Map-feature keywords (English and Russian stems) per place tag.
const PLACE_KEYWORDS: &[(&str, &[&str])] = &[
    ("parks", &["парк", "park"]),
    ("gardens", &["сад", "garden"]),
    ("forests", &["лес", "forest"]),
    ("rivers", &["реч", "реки", "river"]),
    ("lakes", &["озер", "lake"]),
    ("water", &["вод", "water"]),
    ("buildings", &["здан", "building", "дом"]),
    ("roads", &["дорог", "road", "трасс"]),
    ("streets", &["улиц", "street"]),
    ("railway", &["железн", "railway", "поезд", "train"]),
    ("airports", &["аэропорт", "airport"]),
    ("restaurants", &["ресторан", "restaurant"]),
    ("cafes", &["кафе", "cafe"]),
    ("shops", &["магазин", "shop"]),
    ("schools", &["школ", "school"]),
    ("hospitals", &["больниц", "hospital"]),
    ("sports", &["спорт", "sport"]),
];

/// Known city stems, used when no prepositional phrase names the place.
const CITIES: &[(&str, &str)] = &[
    ("москв", "Москва"),
    ("moscow", "Moscow"),
    ("петербург", "Санкт-Петербург"),
    ("питер", "Санкт-Петербург"),
    ("казан", "Казань"),
    ("kazan", "Kazan"),
    ("сочи", "Сочи"),
    ("париж", "Paris"),
    ("лондон", "London"),
    ("токио", "Tokyo"),
    ("нью-йорк", "New York"),
    ("берлин", "Berlin"),
];

const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "thanks", "thank you", "привет", "здравствуйте", "спасибо",
];

const TRAILING_FILLER: &[&str] = &["right now", "today", "now", "please", "сегодня", "сейчас", "пожалуйста"];

pub struct IntentClassifier {
    english_place: Regex,
    russian_place: Regex,
}

impl IntentClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            english_place: Regex::new(r"(?i)\b(?:in|near|of|for|around|at)\s+")?,
            russian_place: Regex::new(r"(?i)(?:^|\s)(?:в|во|около|возле|рядом с)\s+")?,
        })
    }

    pub fn classify(&self, text: &str) -> Intent {
        let text = text.trim();
        if text.is_empty() {
            return Intent::Chat(HELP_MESSAGE.to_string());
        }
        let lowered = text.to_lowercase();

        let topic = TOPICS
            .iter()
            .find(|(keywords, _, _)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(_, source, data_type)| (*source, *data_type))
            .or_else(|| {
                PLACE_KEYWORDS
                    .iter()
                    .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
                    .map(|(tag, _)| ("openstreetmap", *tag))
            });

        let location = self.extract_location(text);

        match (topic, location) {
            (Some((source, data_type)), Some(location)) => {
                Intent::Data(LayerRequest::new(source, location, data_type))
            }
            (None, Some(location)) => {
                Intent::Data(LayerRequest::new("openstreetmap", location, "buildings"))
            }
            (Some(_), None) => Intent::Chat(NEED_PLACE_MESSAGE.to_string()),
            (None, None) if is_greeting(&lowered) => {
                Intent::Chat(format!("Hello! {}", HELP_MESSAGE))
            }
            (None, None) => Intent::Chat(HELP_MESSAGE.to_string()),
        }
    }

    /// Text after the last preposition, normalized through the city table.
    fn extract_location(&self, text: &str) -> Option<String> {
        let phrase = self
            .english_place
            .find_iter(text)
            .chain(self.russian_place.find_iter(text))
            .map(|m| m.end())
            .max()
            .and_then(|start| text[start..].split(['?', '!', '.', ',', ';']).next())
            .map(strip_filler)
            .filter(|p| !p.is_empty());

        let haystack = phrase.as_deref().unwrap_or(text).to_lowercase();
        let known_city = CITIES
            .iter()
            .find(|(stem, _)| haystack.contains(stem))
            .map(|(_, city)| city.to_string());

        known_city.or(phrase)
    }
}

fn strip_filler(phrase: &str) -> String {
    let mut phrase = phrase.trim().to_string();
    loop {
        let lowered = phrase.to_lowercase();
        let Some(filler) = TRAILING_FILLER.iter().find(|f| lowered.ends_with(*f)) else {
            break;
        };
        let cut = phrase.len() - filler.len();
        if !phrase.is_char_boundary(cut) {
            break;
        }
        if cut > 0 && !phrase[..cut].ends_with(char::is_whitespace) {
            break;
        }
        phrase.truncate(cut);
        phrase = phrase.trim_end().to_string();
    }
    phrase
}

fn is_greeting(lowered: &str) -> bool {
    let stripped = lowered.trim_matches(|c: char| !c.is_alphanumeric());
    GREETINGS.iter().any(|g| stripped == *g || stripped.starts_with(&format!("{} ", g)))
}
