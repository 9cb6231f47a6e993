use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

/// Named text slots on the price board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayField {
    Gold24,
    Gold22,
    Gold21,
    Gold18,
    Bulk,
    Silver,
    Countdown,
    LiveTime,
}

impl DisplayField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayField::Gold24 => "gold24",
            DisplayField::Gold22 => "gold22",
            DisplayField::Gold21 => "gold21",
            DisplayField::Gold18 => "gold18",
            DisplayField::Bulk => "bulk",
            DisplayField::Silver => "silver",
            DisplayField::Countdown => "countdown",
            DisplayField::LiveTime => "live_time",
        }
    }
}

/// Anything the refresh cycle and clock can write text into.
pub trait DisplaySurface: Send + Sync {
    fn write(&self, field: DisplayField, text: String);
}

/// In-memory board shared between the writers and the HTTP `/api/board` view.
/// Fields that were never written are simply absent.
#[derive(Debug, Clone, Default)]
pub struct DisplayBoard {
    fields: Arc<RwLock<BTreeMap<DisplayField, String>>>,
}

impl DisplayBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: DisplayField) -> Option<String> {
        self.fields.read().get(&field).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<DisplayField, String> {
        self.fields.read().clone()
    }
}

impl DisplaySurface for DisplayBoard {
    fn write(&self, field: DisplayField, text: String) {
        self.fields.write().insert(field, text);
    }
}
