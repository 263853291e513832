use serde_json::{Map, Value};

/// A raw record as returned by the portal.
pub type RawRecord = Map<String, Value>;

/// Canonical fields and the keys they have been published under, newest schema first.
static ALIASES: &[(Field, &[&str])] = &[
    (Field::Subject, &["subjectDesc", "materia"]),
    (Field::DisplayValue, &["displayValue", "decimalValue", "voto"]),
    (Field::Date, &["evtDate", "data"]),
    (Field::ComponentType, &["componentDesc", "tipo"]),
    (Field::Note, &["notesForFamily", "nota"]),
    (Field::Color, &["color", "colore"]),
    (Field::NoAverage, &["noAverage"]),
    (Field::EventCode, &["evtCode", "codice"]),
    (Field::Justified, &["isJustified", "giustificata"]),
];

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Subject,
    DisplayValue,
    Date,
    ComponentType,
    Note,
    Color,
    NoAverage,
    EventCode,
    Justified,
}

impl Field {
    pub fn aliases(self) -> &'static [&'static str] {
        ALIASES
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, keys)| *keys)
            .unwrap_or(&[])
    }
}

/// Returns the value under the first alias present. `null` counts as absent.
pub fn lookup(raw: &RawRecord, field: Field) -> Option<&Value> {
    field
        .aliases()
        .iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

/// Resolves a field as text. Numbers keep their decimal form.
pub fn text(raw: &RawRecord, field: Field) -> Option<String> {
    match lookup(raw, field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text field with the "N/A" default.
pub fn text_or_default(raw: &RawRecord, field: Field) -> String {
    text(raw, field).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Resolves a flag. Accepts JSON booleans and the usual textual spellings.
pub fn flag(raw: &RawRecord, field: Field) -> bool {
    match lookup(raw, field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "si"
        ),
        _ => false,
    }
}
