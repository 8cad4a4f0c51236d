// Publication-date enrichment.
//
// Derives calendar context from the `published` field: southern-hemisphere
// season, Peruvian retail campaign, weekday, day type, time of day and hour
// range. Values that fail to parse never abort the run; they produce the
// "unknown" sentinels below.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::records::{value_as_text, Dataset, FIELD_PUBLISHED};

pub const UNKNOWN_SEASON: &str = "Desconocido";
pub const NO_CAMPAIGN: &str = "Sin campaña";
pub const UNKNOWN_HOUR_RANGE: &str = "0_Desconocido";

/// Fields added by [`enrich_dates`], in output order.
pub const DATE_FIELDS: [&str; 7] = [
    "estacion",
    "temporada_comercial",
    "día_semana",
    "tipo_dia",
    "hora",
    "hora_12h",
    "rango_horario",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse a publication timestamp. Time zones are dropped; the local wall
/// clock time is what matters for posting habits.
pub fn parse_published(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Season for a month (1-12), southern hemisphere.
pub fn season(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "Verano",
        3..=5 => "Otoño",
        6..=8 => "Invierno",
        9..=11 => "Primavera",
        _ => UNKNOWN_SEASON,
    }
}

/// Retail campaign running in a month (1-12).
pub fn commercial_campaign(month: u32) -> &'static str {
    match month {
        1 => "Rebajas de Verano / Liquidación",
        2 | 3 => "Back to School / Regreso a Clases",
        5 => "Día de la Madre",
        6 => "Día del Padre",
        7 => "Fiestas Patrias / Gratificación",
        10 => "Cyber / Black Friday / Cyber Monday",
        11 => "Navidad y Año Nuevo",
        12 => "Navidad y Año Nuevo / Gratificación",
        _ => NO_CAMPAIGN,
    }
}

/// Weekday label, numbered so it sorts Monday first.
pub fn weekday_label(days_from_monday: u32) -> Option<&'static str> {
    const DAYS: [&str; 7] = [
        "1_Lunes",
        "2_Martes",
        "3_Miércoles",
        "4_Jueves",
        "5_Viernes",
        "6_Sábado",
        "7_Domingo",
    ];
    DAYS.get(days_from_monday as usize).copied()
}

pub fn day_type(days_from_monday: u32) -> Option<&'static str> {
    match days_from_monday {
        0..=4 => Some("Día de semana"),
        5 | 6 => Some("Fin de semana"),
        _ => None,
    }
}

/// Six-hour bucket for an hour of the day.
pub fn hour_range(hour: Option<u32>) -> &'static str {
    match hour {
        Some(0..=5) => "1_12am a 6am",
        Some(6..=11) => "2_6am a 12pm",
        Some(12..=17) => "3_12pm a 6pm",
        Some(18..=23) => "4_6pm a 12am",
        _ => UNKNOWN_HOUR_RANGE,
    }
}

/// 12-hour clock label without a leading zero, e.g. `3 PM`.
pub fn hour_12h(dt: &NaiveDateTime) -> String {
    let label = dt.format("%I %p").to_string();
    label.trim_start_matches('0').to_string()
}

/// Calendar fields for one timestamp, in [`DATE_FIELDS`] order.
pub fn date_fields(published: Option<NaiveDateTime>) -> [Value; 7] {
    match published {
        Some(dt) => {
            let weekday = dt.weekday().num_days_from_monday();
            [
                json!(season(dt.month())),
                json!(commercial_campaign(dt.month())),
                json!(weekday_label(weekday)),
                json!(day_type(weekday)),
                json!(dt.format("%H:%M:%S").to_string()),
                json!(hour_12h(&dt)),
                json!(hour_range(Some(dt.hour()))),
            ]
        }
        None => [
            json!(UNKNOWN_SEASON),
            json!(NO_CAMPAIGN),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
            json!(UNKNOWN_HOUR_RANGE),
        ],
    }
}

/// Add calendar fields to every record. Returns the number of records whose
/// date could not be parsed, or `None` when there is no `published` field.
pub fn enrich_dates(dataset: &mut Dataset) -> Option<usize> {
    if !dataset.has_field(FIELD_PUBLISHED) {
        warn!("No 'published' field found; skipping date enrichment");
        return None;
    }

    let mut unparsed = 0;
    for record in dataset.records_mut() {
        let published = record
            .get(FIELD_PUBLISHED)
            .and_then(value_as_text)
            .and_then(|raw| parse_published(&raw));
        if published.is_none() {
            unparsed += 1;
        }
        for (field, value) in DATE_FIELDS.iter().zip(date_fields(published)) {
            record.insert(field.to_string(), value);
        }
    }
    for field in DATE_FIELDS {
        dataset.add_column(field);
    }

    if unparsed > 0 {
        warn!(unparsed, "Some publication dates could not be parsed");
    }
    info!(records = dataset.len(), "Enriched records with publication dates");
    Some(unparsed)
}
