mod terminal;

use crate::core::models::Service;
use std::time::Duration;

pub use terminal::TerminalSurface;

pub const NO_SERVICE_TEXT: &str = "No service enabled.";

pub trait DisplaySurface {
    fn render(&mut self, frame: &Frame);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Countdown {
    NextIn(Duration),
    Refreshing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLine {
    pub service: Service,
    pub text: String,
    pub countdown: Option<Countdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub lines: Vec<ServiceLine>,
}

impl Frame {
    #[cfg(test)]
    pub fn line(&self, service: Service) -> Option<&ServiceLine> {
        self.lines.iter().find(|l| l.service == service)
    }

    pub fn balances_text(&self) -> String {
        if self.lines.is_empty() {
            return NO_SERVICE_TEXT.to_string();
        }

        self.lines
            .iter()
            .map(|l| format!("{}: {}", l.service.name(), l.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn countdown_text(&self) -> String {
        self.lines
            .iter()
            .filter_map(|l| {
                l.countdown
                    .as_ref()
                    .map(|c| format!("{}: {}", l.service.name(), format_countdown(c)))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn format_countdown(countdown: &Countdown) -> String {
    match countdown {
        Countdown::Refreshing => "refreshing...".to_string(),
        Countdown::NextIn(remaining) => format!("next update in {}", format_hms(*remaining)),
    }
}

pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_hms(Duration::from_millis(59_900)), "0:00:59");
        assert_eq!(format_hms(Duration::from_secs(3 * 60 + 7)), "0:03:07");
        assert_eq!(format_hms(Duration::from_secs(3600 + 61)), "1:01:01");
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::default();
        assert_eq!(frame.balances_text(), NO_SERVICE_TEXT);
        assert_eq!(frame.countdown_text(), "");
    }

    #[test]
    fn test_frame_text() {
        let frame = Frame {
            lines: vec![
                ServiceLine {
                    service: Service::EarnApp,
                    text: "$3.50".to_string(),
                    countdown: Some(Countdown::NextIn(Duration::from_secs(754))),
                },
                ServiceLine {
                    service: Service::Honeygain,
                    text: "10 credits ($2.50)".to_string(),
                    countdown: Some(Countdown::Refreshing),
                },
            ],
        };

        assert_eq!(
            frame.balances_text(),
            "EarnApp: $3.50\nHoneygain: 10 credits ($2.50)"
        );
        assert_eq!(
            frame.countdown_text(),
            "EarnApp: next update in 0:12:34\nHoneygain: refreshing..."
        );
        assert_eq!(frame.line(Service::EarnApp).unwrap().text, "$3.50");
    }
}
