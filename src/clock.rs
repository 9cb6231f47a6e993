use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use serde::Deserialize;
use tokio::time::{interval, MissedTickBehavior};

use crate::display::{DisplayField, DisplaySurface};

/// How the live clock is spelled on the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockStyle {
    /// Egyptian Arabic: Arabic-Indic digits, `ص` / `م` day period.
    #[default]
    Arabic,
    /// `03:07:09 PM`
    Latin,
}

const ARABIC_INDIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];

/// 12-hour `hh:mm:ss` plus day period.
pub fn format_time<T: Timelike>(time: &T, style: ClockStyle) -> String {
    let (is_pm, hour) = time.hour12();
    let digits = format!("{:02}:{:02}:{:02}", hour, time.minute(), time.second());
    match style {
        ClockStyle::Arabic => {
            let localized: String = digits
                .chars()
                .map(|c| c.to_digit(10).map_or(c, |d| ARABIC_INDIC_DIGITS[d as usize]))
                .collect();
            format!("{} {}", localized, if is_pm { 'م' } else { 'ص' })
        }
        ClockStyle::Latin => format!("{} {}", digits, if is_pm { "PM" } else { "AM" }),
    }
}

/// Writes local time to the board once a second, forever.
pub async fn run_clock(surface: Arc<dyn DisplaySurface>, style: ClockStyle) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        surface.write(DisplayField::LiveTime, format_time(&Local::now(), style));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayBoard;
    use chrono::NaiveTime;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_arabic_afternoon() {
        assert_eq!(format_time(&at(15, 7, 9), ClockStyle::Arabic), "٠٣:٠٧:٠٩ م");
    }

    #[test]
    fn test_arabic_midnight_and_noon() {
        assert_eq!(format_time(&at(0, 0, 0), ClockStyle::Arabic), "١٢:٠٠:٠٠ ص");
        assert_eq!(format_time(&at(12, 30, 45), ClockStyle::Arabic), "١٢:٣٠:٤٥ م");
    }

    #[test]
    fn test_latin() {
        assert_eq!(format_time(&at(9, 5, 0), ClockStyle::Latin), "09:05:00 AM");
        assert_eq!(format_time(&at(23, 59, 59), ClockStyle::Latin), "11:59:59 PM");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_writes_live_time() {
        let board = DisplayBoard::new();
        let handle = tokio::spawn(run_clock(Arc::new(board.clone()), ClockStyle::Latin));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let shown = board.get(DisplayField::LiveTime).expect("clock wrote a value");
        assert!(shown.ends_with("AM") || shown.ends_with("PM"));
        handle.abort();
    }
}
