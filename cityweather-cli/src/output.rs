//! Plain-text rendering of the core's view models.

use std::fmt::Write;

use cityweather_core::{ForecastResult, SavedCity, icon_url, large_icon_url};

pub fn city_line(city: &SavedCity) -> String {
    let place = if city.country.is_empty() {
        city.name.clone()
    } else {
        format!("{} ({})", city.name, city.country)
    };
    format!(
        "{:>4}  {place:<28} {:>4}°C  H:{}° L:{}°  {}",
        city.id, city.current_temp, city.high_temp, city.low_temp, city.description
    )
}

/// Header for the forecast view: the city row and its large icon image.
pub fn forecast_header(city: &SavedCity) -> String {
    format!("{}\n      {}", city_line(city), large_icon_url(&city.icon))
}

pub fn forecast(result: &ForecastResult) -> String {
    let mut out = String::new();

    out.push_str("\nHourly\n");
    for h in &result.hourly {
        let _ = writeln!(
            out,
            "  {:>5}  {:>4}°C  {}  {}",
            h.label,
            h.temp,
            h.description,
            icon_url(&h.icon)
        );
    }

    out.push_str("\nDaily\n");
    for d in &result.daily {
        let _ = writeln!(
            out,
            "  {:<10}  {:>4}° / {:>4}°  {}  {}",
            d.label,
            d.high,
            d.low,
            d.description,
            icon_url(&d.icon)
        );
    }
    out
}
