/// Glyph some schools use for half points ("6½").
const HALF_POINT: &str = "½";

/// Parses a grade as shown on the portal into a number.
///
/// Strips `+`/`-` modifiers at either end, expands `½` to `.5` and accepts a
/// comma as decimal separator. Anything that still doesn't parse is `None`.
pub fn parse_grade_value(display: &str) -> Option<f64> {
    let stripped = display.trim().trim_matches(['+', '-']).trim();
    if stripped.is_empty() {
        return None;
    }

    let normalized = stripped.replace(HALF_POINT, ".5").replace(',', ".");
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
