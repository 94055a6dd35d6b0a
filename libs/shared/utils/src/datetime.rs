use chrono::{DateTime, Locale, Utc};

/// Renders appointment dates for humans in the configured locale.
#[derive(Debug, Clone, Copy)]
pub struct DateFormatter {
    locale: Locale,
}

impl DateFormatter {
    /// Unknown locale names fall back to `pt_BR`.
    pub fn new(locale: &str) -> Self {
        let locale = match locale {
            "en_US" | "en-US" | "en" => Locale::en_US,
            _ => Locale::pt_BR,
        };
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn is_portuguese(&self) -> bool {
        self.locale == Locale::pt_BR
    }

    /// `dia 10 de janeiro, às 15:00h` / `January 10, at 15:00h`
    pub fn format_long(&self, date: DateTime<Utc>) -> String {
        let pattern = if self.is_portuguese() {
            "dia %d de %B, às %-H:%Mh"
        } else {
            "%B %d, at %-H:%Mh"
        };
        date.format_localized(pattern, self.locale).to_string()
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self { locale: Locale::pt_BR }
    }
}
