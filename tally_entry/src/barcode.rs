//! The barcode entry state machine.
//!
//! An intake form accepts a barcode either from a hardware scanner (scan mode) or typed twice by
//! hand (manual mode). The controller owns the mode, and drives the form only through the
//! [BarcodeFormView] capability so it can run without a DOM.
//!
//! ```
//! use std::time::Duration;
//! use tally_entry::{BarcodeModeController, EntryMode, EntryRules, Field, FormState, Key};
//!
//! let mut ctl = BarcodeModeController::new(FormState::new(), EntryRules::DEFAULT_RULES);
//! assert_eq!(ctl.mode(), EntryMode::Scan);
//!
//! // A person types slowly in the scan field: the form switches to manual entry.
//! ctl.on_scan_keydown(Key::Char('1'), Duration::from_millis(0));
//! ctl.on_scan_keydown(Key::Char('2'), Duration::from_millis(250));
//! assert_eq!(ctl.mode(), EntryMode::Manual);
//! assert!(ctl.view().field(Field::Barcode).unwrap().required);
//! ```

use log::{debug, info};
use std::time::Duration;

use crate::classifier::{ScanTypingClassifier, Verdict};
use crate::config::*;
use crate::copy_pair::{check_copy, mask_on_primary_blur, CopyCheck, LengthRule};
use crate::scanner::{ScanEvent, ScannerAssembler};

/// The operations the entry state machine needs from a form.
///
/// Implementations must treat operations on a missing element as no-ops.
pub trait BarcodeFormView {
    fn show_scan_fields(&mut self);
    fn show_manual_fields(&mut self);
    fn set_required(&mut self, field: Field, required: bool);
    /// The current value, or None if the field is not on the page.
    fn value(&self, field: Field) -> Option<String>;
    fn set_value(&mut self, field: Field, value: &str);
    fn set_read_only(&mut self, field: Field, read_only: bool);
    fn focus(&mut self, field: Field);
    fn set_instructions(&mut self, text: &str);
    /// Hides the barcode behind its placeholder.
    fn mask_barcode(&mut self);
    fn unmask_barcode(&mut self);
    fn set_pair_status(&mut self, status: Option<PairStatus>);
    fn show_warning(&mut self, message: &str);
    fn clear_warning(&mut self);
    fn set_submit_enabled(&mut self, enabled: bool);
}

/// What happened to a keystroke in the scan field.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum KeyOutcome {
    Buffered,
    Committed(String),
    SwitchedToManual,
    Ignored,
}

pub struct BarcodeModeController<V: BarcodeFormView> {
    view: V,
    rules: EntryRules,
    mode: EntryMode,
    classifier: ScanTypingClassifier,
    assembler: ScannerAssembler,
}

impl<V: BarcodeFormView> BarcodeModeController<V> {
    /// Wires the form on page load, in scan mode.
    pub fn new(view: V, rules: EntryRules) -> BarcodeModeController<V> {
        let mut ctl = BarcodeModeController {
            view,
            rules,
            mode: EntryMode::Scan,
            classifier: ScanTypingClassifier::new(rules.typing_threshold),
            assembler: ScannerAssembler::new(rules.scan_debounce),
        };
        ctl.set_mode(EntryMode::Scan);
        ctl
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn rules(&self) -> &EntryRules {
        &self.rules
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Scanner digits received since the last commit.
    pub fn pending_scan(&self) -> &str {
        self.assembler.pending()
    }

    /// Switches the form to the given mode. Calling it twice has the same effect as once.
    pub fn set_mode(&mut self, mode: EntryMode) {
        debug!("set_mode: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.view.set_instructions(mode.instructions());
        match mode {
            EntryMode::Scan => self.view.show_scan_fields(),
            EntryMode::Manual => self.view.show_manual_fields(),
        }

        // Release the inactive fields first, so that no contradictory constraint is ever set.
        let active = Field::for_mode(mode);
        for field in Field::ALL.iter().filter(|f| !active.contains(f)) {
            self.view.set_required(*field, false);
            self.view.set_value(*field, "");
            self.view.set_read_only(*field, false);
        }
        for field in active.iter() {
            self.view.set_required(*field, true);
        }

        self.view.unmask_barcode();
        self.view.set_pair_status(None);
        if mode == EntryMode::Scan {
            self.view.clear_warning();
        }
        self.classifier.reset();
        self.assembler.clear();
        match mode {
            EntryMode::Scan => self.view.focus(Field::ScannedBarcode),
            EntryMode::Manual => self.view.focus(Field::Barcode),
        }
        self.refresh_submit();
    }

    /// A keydown in the scan field at `at` (time since page load).
    pub fn on_scan_keydown(&mut self, key: Key, at: Duration) -> KeyOutcome {
        if self.mode != EntryMode::Scan {
            debug!("on_scan_keydown: ignoring {:?} in manual mode", key);
            return KeyOutcome::Ignored;
        }

        if let Verdict::Typing { interval } = self.classifier.observe(at) {
            info!(
                "on_scan_keydown: keystrokes {:?} apart, switching to manual entry",
                interval
            );
            self.view.set_value(Field::ScannedBarcode, "");
            self.set_mode(EntryMode::Manual);
            self.view.show_warning(TYPING_DETECTED_WARNING);
            return KeyOutcome::SwitchedToManual;
        }

        match self.assembler.push(key, at) {
            ScanEvent::Committed(code) => {
                info!("on_scan_keydown: scanned barcode {}", code);
                self.view.set_value(Field::ScannedBarcode, &code);
                self.view.set_read_only(Field::ScannedBarcode, true);
                self.refresh_submit();
                KeyOutcome::Committed(code)
            }
            ScanEvent::Buffered => KeyOutcome::Buffered,
            ScanEvent::Ignored => KeyOutcome::Ignored,
        }
    }

    /// Lets the scanner debounce expire when no keystroke arrives.
    pub fn tick(&mut self, now: Duration) {
        self.assembler.expire(now);
    }

    pub fn on_scan_blur(&mut self) {
        self.classifier.reset();
        self.view.clear_warning();
    }

    /// An input event on the scan field, with the new field value.
    pub fn on_scan_input(&mut self, value: &str) {
        if value.is_empty() {
            self.classifier.reset();
            self.view.clear_warning();
        }
    }

    /// The barcode (primary) field lost focus.
    pub fn on_barcode_focus_out(&mut self) {
        if self.mode != EntryMode::Manual {
            return;
        }
        let (primary, copy) = self.manual_values();
        if mask_on_primary_blur(&primary, &copy) {
            self.view.mask_barcode();
        }
        self.refresh_submit();
    }

    /// The copy field lost focus or received a keystroke.
    pub fn on_copy_changed(&mut self) -> Option<CopyCheck> {
        if self.mode != EntryMode::Manual {
            return None;
        }
        let (primary, copy) = self.manual_values();
        let check = check_copy(&primary, &copy, LengthRule::BARCODE);
        debug!("on_copy_changed: {:?}", check);
        if check.reveals_primary() {
            self.view.unmask_barcode();
        } else {
            self.view.mask_barcode();
        }
        self.view.set_pair_status(check.status());
        self.refresh_submit();
        Some(check)
    }

    /// The barcode the form would submit, if it is acceptable.
    pub fn submittable_barcode(&self) -> Option<String> {
        let min = self.rules.min_barcode_length;
        match self.mode {
            EntryMode::Scan => self
                .view
                .value(Field::ScannedBarcode)
                .filter(|v| v.chars().count() >= min),
            EntryMode::Manual => {
                let (primary, copy) = self.manual_values();
                if primary.chars().count() >= min && primary == copy {
                    Some(primary)
                } else {
                    None
                }
            }
        }
    }

    pub fn can_submit(&self) -> bool {
        self.submittable_barcode().is_some()
    }

    fn manual_values(&self) -> (String, String) {
        (
            self.view.value(Field::Barcode).unwrap_or_default(),
            self.view.value(Field::BarcodeCopy).unwrap_or_default(),
        )
    }

    fn refresh_submit(&mut self) {
        let enabled = self.can_submit();
        self.view.set_submit_enabled(enabled);
    }
}
