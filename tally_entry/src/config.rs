// ********* Entry form data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::time::Duration;

/// The two ways a barcode can be entered on an intake form.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum EntryMode {
    /// A single field fed by a hardware scanner.
    Scan,
    /// Two fields typed by hand that must match.
    Manual,
}

impl EntryMode {
    /// The instructions displayed above the form for this mode.
    pub fn instructions(&self) -> &'static str {
        match self {
            EntryMode::Scan => "Scan Barcode to proceed",
            EntryMode::Manual => "Enter Barcode",
        }
    }
}

/// The input fields the entry state machine manipulates.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Field {
    ScannedBarcode,
    Barcode,
    BarcodeCopy,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::ScannedBarcode, Field::Barcode, Field::BarcodeCopy];

    /// The fields that are active (required and visible) in a mode.
    pub fn for_mode(mode: EntryMode) -> &'static [Field] {
        match mode {
            EntryMode::Scan => &[Field::ScannedBarcode],
            EntryMode::Manual => &[Field::Barcode, Field::BarcodeCopy],
        }
    }
}

/// Styling applied to a copy pair once both values have been entered.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum PairStatus {
    Success,
    Error,
}

/// A key pressed in the scan field.
///
/// Only the distinctions the state machines care about are kept.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Other,
}

impl Key {
    pub fn is_digit(&self) -> bool {
        matches!(self, Key::Char(c) if c.is_ascii_digit())
    }
}

// ********* Configuration **********

pub const DEFAULT_TYPING_THRESHOLD: Duration = Duration::from_millis(100);
pub const DEFAULT_SCAN_DEBOUNCE: Duration = Duration::from_millis(200);
pub const MIN_BARCODE_LENGTH: usize = 11;
pub const DEFAULT_TASK_POLL_DELAY: Duration = Duration::from_secs(30);

pub const TYPING_DETECTED_WARNING: &str =
    "Manual typing detected in scan mode: switched to manual barcode entry";

/// Timing and length rules for the barcode entry form.
///
/// The timing values are injected so that scanner-speed and human-speed input can be
/// simulated without waiting on a real clock.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct EntryRules {
    /// A second keystroke arriving later than this after the previous one is human typing.
    pub typing_threshold: Duration,
    /// A partial scan is dropped when no keystroke arrives for this long.
    pub scan_debounce: Duration,
    /// The barcode must be at least this long before the form can be submitted.
    pub min_barcode_length: usize,
}

impl EntryRules {
    pub const DEFAULT_RULES: EntryRules = EntryRules {
        typing_threshold: DEFAULT_TYPING_THRESHOLD,
        scan_debounce: DEFAULT_SCAN_DEBOUNCE,
        min_barcode_length: MIN_BARCODE_LENGTH,
    };
}

impl Default for EntryRules {
    fn default() -> Self {
        EntryRules::DEFAULT_RULES
    }
}

// ******** Errors *********

/// Errors raised when an import tracker cannot be built.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TrackerError {
    NoSteps,
    TooManyTotals { total_steps: u32, totals: usize },
    OffsetBeyondTotal { step: u32, offset: u64, total: u64 },
    UnknownStep { step: u32, total_steps: u32 },
}

impl Error for TrackerError {}

impl Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::NoSteps => write!(f, "an import needs at least one step"),
            TrackerError::TooManyTotals { total_steps, totals } => write!(
                f,
                "{} step totals given for an import of {} steps",
                totals, total_steps
            ),
            TrackerError::OffsetBeyondTotal {
                step,
                offset,
                total,
            } => write!(
                f,
                "step {}: offset {} is beyond the step total {}",
                step, offset, total
            ),
            TrackerError::UnknownStep { step, total_steps } => {
                write!(f, "step {} does not exist (1 to {})", step, total_steps)
            }
        }
    }
}
