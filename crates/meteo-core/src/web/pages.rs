//! HTML pages

use core::fmt::{self, Write};

use crate::sensors::SensorSnapshot;
use crate::storage::HistoryRow;

const STYLE: &str = "body{font-family:Arial,sans-serif;margin:0;padding:20px;background:#f0f2f5}\
.container{max-width:800px;margin:0 auto}\
.card{background:white;border-radius:10px;padding:20px;margin-bottom:20px;box-shadow:0 2px 4px rgba(0,0,0,0.1)}\
h1{color:#1a73e8;margin-bottom:20px}\
.nav{margin-bottom:20px}\
.nav a{color:#1a73e8;text-decoration:none;margin-right:20px}\
table{width:100%;border-collapse:collapse}\
td,th{padding:12px;text-align:left;border-bottom:1px solid #ddd}\
th{background:#f8f9fa}";

pub const NO_DATA_PAGE: &str =
    "<!DOCTYPE html><html><body><h1>No data available</h1></body></html>";

/// Seconds between automatic page reloads.
pub const REFRESH_SECS: u32 = 30;

fn write_head<W: Write>(out: &mut W, title: &str) -> fmt::Result {
    write!(
        out,
        "<!DOCTYPE html><html lang='de'><head><meta charset='UTF-8'>\
         <meta http-equiv='refresh' content='{REFRESH_SECS}'>\
         <title>{title}</title><style>{STYLE}</style></head><body>\
         <div class='container'><div class='nav'>\
         <a href='/'>Live Data</a><a href='/dashboard'>Dashboard</a></div>\
         <div class='card'><h1>{title}</h1>"
    )
}

fn write_foot<W: Write>(out: &mut W) -> fmt::Result {
    out.write_str("</table></div></div></body></html>")
}

/// Current readings, one table row per quantity.
pub fn render_live<W: Write>(out: &mut W, snapshot: &SensorSnapshot) -> fmt::Result {
    write_head(out, "Weather Station Live Data")?;
    out.write_str("<table><tr><th>Sensor</th><th>Value</th><th>Unit</th></tr>")?;

    let rows = [
        ("Temperature", snapshot.temperature_celsius, "°C"),
        ("Humidity", snapshot.humidity_percent, "%"),
        ("Pressure", snapshot.pressure_hpa, "hPa"),
        ("Altitude", snapshot.altitude_m, "m"),
    ];
    for (name, value, unit) in rows {
        write!(out, "<tr><td>{name}</td><td>{value:.2}</td><td>{unit}</td></tr>")?;
    }
    write!(
        out,
        "<tr><td>Light</td><td>{}</td><td>lux</td></tr>\
         <tr><td>UV Intensity</td><td>{:.2}</td><td>µW/cm²</td></tr>",
        snapshot.illuminance_lux, snapshot.uv_microwatts_per_cm2
    )?;

    write_foot(out)
}

/// Sampled history table. Lines that are not valid log rows are skipped.
pub fn render_dashboard<W: Write>(out: &mut W, rows: &[&str]) -> fmt::Result {
    if rows.is_empty() {
        return out.write_str(NO_DATA_PAGE);
    }

    write_head(out, "Weather Station Dashboard")?;
    out.write_str(
        "<h2>Sampled Data Points</h2><table><tr><th>Timestamp</th><th>Temp</th>\
         <th>Hum</th><th>Press</th><th>Alt</th><th>Light</th><th>UV</th></tr>",
    )?;

    for row in rows.iter().filter_map(|line| HistoryRow::parse(line)) {
        out.write_str("<tr>")?;
        for field in row.fields() {
            write!(out, "<td>{field}</td>")?;
        }
        out.write_str("</tr>")?;
    }

    write_foot(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn snapshot() -> SensorSnapshot {
        SensorSnapshot {
            temperature_celsius: 21.456,
            humidity_percent: 48.0,
            pressure_hpa: 1009.25,
            altitude_m: 31.7,
            illuminance_lux: 812,
            uv_microwatts_per_cm2: 11.25,
            timestamp: 0,
        }
    }

    #[test]
    fn test_live_page_lists_every_sensor() {
        let mut html = String::new();
        render_live(&mut html, &snapshot()).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("content='30'"));
        assert!(html.contains("<tr><td>Temperature</td><td>21.46</td><td>°C</td></tr>"));
        assert!(html.contains("<tr><td>Humidity</td><td>48.00</td><td>%</td></tr>"));
        assert!(html.contains("<tr><td>Pressure</td><td>1009.25</td><td>hPa</td></tr>"));
        assert!(html.contains("<tr><td>Altitude</td><td>31.70</td><td>m</td></tr>"));
        assert!(html.contains("<tr><td>Light</td><td>812</td><td>lux</td></tr>"));
        assert!(html.contains("<tr><td>UV Intensity</td><td>11.25</td><td>µW/cm²</td></tr>"));
        assert!(html.contains("href='/dashboard'"));
        assert!(html.ends_with("</html>"));
    }

    #[test]
    fn test_empty_dashboard() {
        let mut html = String::new();
        render_dashboard(&mut html, &[]).unwrap();
        assert_eq!(html, NO_DATA_PAGE);
    }

    #[test]
    fn test_dashboard_rows() {
        let rows = [
            "14.11.2023;23:13:20,21.46,48.00,1009.25,31.70,812,11.25",
            "garbage",
            "14.11.2023;23:18:20,21.50,47.90,1009.20,32.10,790,5.63",
        ];
        let mut html = String::new();
        render_dashboard(&mut html, &rows).unwrap();

        assert!(html.contains("Sampled Data Points"));
        assert_eq!(html.matches("<tr><td>").count(), 2);
        assert!(html.contains(
            "<tr><td>14.11.2023;23:13:20</td><td>21.46</td><td>48.00</td><td>1009.25</td>\
             <td>31.70</td><td>812</td><td>11.25</td></tr>"
        ));
        assert!(!html.contains("garbage"));
    }
}
