//! Replays a recorded sequence of form events through the barcode entry state machine.
//!
//! A script is a JSON list of events. Keystrokes carry their time in milliseconds since the page
//! was loaded:
//!
//! ```text
//! [{"event": "key", "atMs": 0, "key": "5"},
//!  {"event": "key", "atMs": 8, "key": "Enter"},
//!  {"event": "typeCopy", "value": "123"}]
//! ```

use crate::client::*;

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeName {
    Scan,
    Manual,
}

impl From<ModeName> for EntryMode {
    fn from(m: ModeName) -> EntryMode {
        match m {
            ModeName::Scan => EntryMode::Scan,
            ModeName::Manual => EntryMode::Manual,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EntryEvent {
    /// A key pressed in the scan field.
    Key {
        #[serde(rename = "atMs")]
        at_ms: u64,
        key: String,
    },
    /// Time passes without any keystroke.
    Tick {
        #[serde(rename = "atMs")]
        at_ms: u64,
    },
    ScanBlur,
    /// The scan field now holds this value.
    ScanInput { value: String },
    SetMode { mode: ModeName },
    TypeBarcode { value: String },
    BarcodeFocusOut,
    TypeCopy { value: String },
}

/// The state of the form at the end of a replay.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct EntryReport {
    #[serde(rename = "mode")]
    pub mode: String,
    #[serde(rename = "instructions")]
    pub instructions: String,
    #[serde(rename = "requiredFields")]
    pub required_fields: Vec<String>,
    #[serde(rename = "scannedBarcode")]
    pub scanned_barcode: String,
    #[serde(rename = "barcode")]
    pub barcode: String,
    #[serde(rename = "barcodeCopy")]
    pub barcode_copy: String,
    #[serde(rename = "barcodeMasked")]
    pub barcode_masked: bool,
    #[serde(rename = "pairStatus")]
    pub pair_status: Option<String>,
    #[serde(rename = "warning")]
    pub warning: Option<String>,
    #[serde(rename = "committed")]
    pub committed: Vec<String>,
    #[serde(rename = "submitEnabled")]
    pub submit_enabled: bool,
    #[serde(rename = "submittable")]
    pub submittable: Option<String>,
}

fn parse_key(s: &str) -> Key {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Key::Char(c),
        _ if s == "Enter" => Key::Enter,
        _ => Key::Other,
    }
}

fn field_name(f: Field) -> &'static str {
    match f {
        Field::ScannedBarcode => "scanned_barcode",
        Field::Barcode => "barcode",
        Field::BarcodeCopy => "barcode_copy",
    }
}

pub fn replay_events(rules: EntryRules, events: &[EntryEvent]) -> EntryReport {
    let mut controller = BarcodeModeController::new(FormState::new(), rules);
    let mut committed: Vec<String> = Vec::new();
    for event in events {
        match event {
            EntryEvent::Key { at_ms, key } => {
                let at = Duration::from_millis(*at_ms);
                let outcome = controller.on_scan_keydown(parse_key(key), at);
                debug!("replay_events: {:?} at {}ms -> {:?}", key, at_ms, outcome);
                if let KeyOutcome::Committed(code) = outcome {
                    committed.push(code);
                }
            }
            EntryEvent::Tick { at_ms } => controller.tick(Duration::from_millis(*at_ms)),
            EntryEvent::ScanBlur => controller.on_scan_blur(),
            EntryEvent::ScanInput { value } => {
                controller.view_mut().type_value(Field::ScannedBarcode, value);
                controller.on_scan_input(value);
            }
            EntryEvent::SetMode { mode } => controller.set_mode((*mode).into()),
            EntryEvent::TypeBarcode { value } => {
                controller.view_mut().type_value(Field::Barcode, value);
            }
            EntryEvent::BarcodeFocusOut => controller.on_barcode_focus_out(),
            EntryEvent::TypeCopy { value } => {
                controller.view_mut().type_value(Field::BarcodeCopy, value);
                controller.on_copy_changed();
            }
        }
    }

    let submittable = controller.submittable_barcode();
    let mode = controller.mode();
    let form = controller.into_view();
    let value = |f: Field| form.field(f).map(|fs| fs.value.clone()).unwrap_or_default();
    EntryReport {
        mode: match mode {
            EntryMode::Scan => "scan".to_string(),
            EntryMode::Manual => "manual".to_string(),
        },
        instructions: form.instructions.clone(),
        required_fields: form
            .required_fields()
            .into_iter()
            .map(|f| field_name(f).to_string())
            .collect(),
        scanned_barcode: value(Field::ScannedBarcode),
        barcode: value(Field::Barcode),
        barcode_copy: value(Field::BarcodeCopy),
        barcode_masked: form.barcode_masked,
        pair_status: form.pair_status.map(|ps| match ps {
            PairStatus::Success => "success".to_string(),
            PairStatus::Error => "error".to_string(),
        }),
        warning: form.warning.clone(),
        committed,
        submit_enabled: form.submit_enabled,
        submittable,
    }
}
