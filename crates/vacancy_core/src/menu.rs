use std::time::Duration;

const ENABLE_TOKEN: &str = "enable";
const DISABLE_TOKEN: &str = "disable";
const PERIOD_PREFIX: &str = "period:";

/// Period choices offered after "enable": label and period in seconds.
pub const PERIOD_CHOICES: [(&str, u64); 5] = [
    ("Каждые 15 минут", 15 * 60),
    ("Каждый час", 60 * 60),
    ("Каждые 6 часов", 6 * 60 * 60),
    ("Каждые 12 часов", 12 * 60 * 60),
    ("Раз в сутки", 24 * 60 * 60),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuChoice {
    pub label: String,
    pub token: String,
}

impl MenuChoice {
    fn new(label: &str, token: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            token: token.into(),
        }
    }
}

/// Grid of labeled choices; each row is rendered as one line of buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Menu {
    pub rows: Vec<Vec<MenuChoice>>,
}

pub fn main_menu() -> Menu {
    Menu {
        rows: vec![vec![
            MenuChoice::new("Включить отслеживание", ENABLE_TOKEN),
            MenuChoice::new("Отключить", DISABLE_TOKEN),
        ]],
    }
}

pub fn period_menu() -> Menu {
    Menu {
        rows: PERIOD_CHOICES
            .iter()
            .map(|(label, secs)| vec![MenuChoice::new(label, format!("{PERIOD_PREFIX}{secs}"))])
            .collect(),
    }
}

/// Parsed callback token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackToken {
    Enable,
    Disable,
    Period(Duration),
    InvalidPeriod,
    Unknown,
}

impl CallbackToken {
    pub fn parse(raw: &str) -> Self {
        match raw {
            ENABLE_TOKEN => CallbackToken::Enable,
            DISABLE_TOKEN => CallbackToken::Disable,
            other => match other.strip_prefix(PERIOD_PREFIX) {
                Some(secs) => match secs.trim().parse::<u64>() {
                    Ok(secs) if secs > 0 => CallbackToken::Period(Duration::from_secs(secs)),
                    _ => CallbackToken::InvalidPeriod,
                },
                None => CallbackToken::Unknown,
            },
        }
    }
}
