// Unit normalizer - maps a power channel's unit to a factor onto watts

/// Multiplier that converts readings in `unit` to watts.
///
/// Unknown or missing units fall back to 1.0 and are logged, never rejected.
pub fn watts_factor(entity_id: &str, unit: Option<&str>) -> f64 {
    let Some(unit) = unit else {
        tracing::warn!("No unit found for {}, assuming watts", entity_id);
        return 1.0;
    };

    match unit.trim().to_lowercase().as_str() {
        "w" | "watts" => {
            tracing::debug!("{}: detected unit \"{}\", using watts", entity_id, unit);
            1.0
        }
        "kw" | "kilowatts" => {
            tracing::debug!("{}: detected unit \"{}\", converting kW to W", entity_id, unit);
            1000.0
        }
        _ => {
            tracing::warn!("Unknown power unit \"{}\" for {}, assuming watts", unit, entity_id);
            1.0
        }
    }
}
