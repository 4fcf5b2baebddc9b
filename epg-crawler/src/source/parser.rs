//! HTML guide-page parser.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use crate::domain::{ProgramEntry, Station, parse_air_time};

use super::Parser;
use super::error::ParseError;

const CLASSIFY_ATTR: &str = "data-classify";
const DISPLAY_NAME_ATTR: &str = "data-display-name";
const STATION_ATTR: &str = "data-station";
const AIR_TIME_ATTR: &str = "data-airtime";

/// CSS selectors locating guide data in a page.
///
/// Station elements carry their category in `data-classify` and optionally a
/// viewer-facing name in `data-display-name`; their text is the canonical
/// name. Program elements carry `data-station` and `data-airtime`
/// (`yyyy-MM-dd HH:mm`); their text is the program title.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub station_selector: String,
    pub program_selector: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            station_selector: "li.station".to_string(),
            program_selector: "li.program".to_string(),
        }
    }
}

/// Parser for the guide's HTML pages.
#[derive(Debug, Clone)]
pub struct HtmlParser {
    station: Selector,
    program: Selector,
}

impl HtmlParser {
    pub fn new(config: &ParserConfig) -> Result<Self, ParseError> {
        Ok(Self {
            station: compile(&config.station_selector)?,
            program: compile(&config.program_selector)?,
        })
    }

    /// Parser using the default selectors.
    pub fn with_defaults() -> Result<Self, ParseError> {
        Self::new(&ParserConfig::default())
    }
}

impl Parser for HtmlParser {
    fn parse_stations(&self, text: &str) -> Result<Vec<Station>, ParseError> {
        let document = Html::parse_document(text);
        let mut seen = HashSet::new();
        let mut stations = Vec::new();

        for element in document.select(&self.station) {
            let name = element_text(&element);
            if name.is_empty() || !seen.insert(name.clone()) {
                continue;
            }
            let classify = element
                .value()
                .attr(CLASSIFY_ATTR)
                .ok_or(ParseError::MissingAttribute {
                    element: "station",
                    attribute: CLASSIFY_ATTR,
                })?;

            let mut station = Station::new(name, classify.trim());
            if let Some(display) = element.value().attr(DISPLAY_NAME_ATTR)
                && !display.trim().is_empty()
            {
                station = station.with_display_name(display.trim());
            }
            stations.push(station);
        }

        Ok(stations)
    }

    fn parse_program_entries(&self, text: &str) -> Result<Vec<ProgramEntry>, ParseError> {
        let document = Html::parse_document(text);
        let mut entries = Vec::new();

        for element in document.select(&self.program) {
            let attrs = element.value();
            let station = attrs.attr(STATION_ATTR).ok_or(ParseError::MissingAttribute {
                element: "program",
                attribute: STATION_ATTR,
            })?;
            let air_time = attrs.attr(AIR_TIME_ATTR).ok_or(ParseError::MissingAttribute {
                element: "program",
                attribute: AIR_TIME_ATTR,
            })?;

            let title = element_text(&element);
            if title.is_empty() {
                continue;
            }
            entries.push(ProgramEntry::new(
                station.trim(),
                title,
                parse_air_time(air_time)?,
            ));
        }

        Ok(entries)
    }
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Trimmed text content with inner whitespace runs collapsed.
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
