//! An in-memory barcode form.
//!
//! It records everything the controller asks of it, so that the entry state machine can be
//! exercised (and replayed) without a browser. Fields that were not declared when the form was
//! built behave like missing page elements: every operation on them is silently ignored.

use std::collections::BTreeMap;

use log::debug;

use crate::barcode::BarcodeFormView;
use crate::config::*;

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FieldState {
    pub value: String,
    pub required: bool,
    pub read_only: bool,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum VisibleSections {
    Scan,
    Manual,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FormState {
    pub fields: BTreeMap<Field, FieldState>,
    pub visible: Option<VisibleSections>,
    pub instructions: String,
    pub focused: Option<Field>,
    /// True when the barcode is hidden behind its placeholder.
    pub barcode_masked: bool,
    pub pair_status: Option<PairStatus>,
    pub warning: Option<String>,
    pub submit_enabled: bool,
}

impl FormState {
    /// A form with all the barcode fields present.
    pub fn new() -> FormState {
        FormState::with_fields(&Field::ALL)
    }

    pub fn with_fields(fields: &[Field]) -> FormState {
        FormState {
            fields: fields
                .iter()
                .map(|f| (*f, FieldState::default()))
                .collect(),
            visible: None,
            instructions: String::new(),
            focused: None,
            barcode_masked: false,
            pair_status: None,
            warning: None,
            submit_enabled: false,
        }
    }

    pub fn field(&self, field: Field) -> Option<&FieldState> {
        self.fields.get(&field)
    }

    /// Simulates the user typing a value directly into a field.
    pub fn type_value(&mut self, field: Field, value: &str) {
        if let Some(fs) = self.fields.get_mut(&field) {
            fs.value = value.to_string();
        }
    }

    pub fn required_fields(&self) -> Vec<Field> {
        self.fields
            .iter()
            .filter(|(_, fs)| fs.required)
            .map(|(f, _)| *f)
            .collect()
    }
}

impl Default for FormState {
    fn default() -> Self {
        FormState::new()
    }
}

impl BarcodeFormView for FormState {
    fn show_scan_fields(&mut self) {
        self.visible = Some(VisibleSections::Scan);
    }

    fn show_manual_fields(&mut self) {
        self.visible = Some(VisibleSections::Manual);
    }

    fn set_required(&mut self, field: Field, required: bool) {
        match self.fields.get_mut(&field) {
            Some(fs) => fs.required = required,
            None => debug!("set_required: no {:?} field on this form", field),
        }
    }

    fn value(&self, field: Field) -> Option<String> {
        self.fields.get(&field).map(|fs| fs.value.clone())
    }

    fn set_value(&mut self, field: Field, value: &str) {
        if let Some(fs) = self.fields.get_mut(&field) {
            fs.value = value.to_string();
        }
    }

    fn set_read_only(&mut self, field: Field, read_only: bool) {
        if let Some(fs) = self.fields.get_mut(&field) {
            fs.read_only = read_only;
        }
    }

    fn focus(&mut self, field: Field) {
        if self.fields.contains_key(&field) {
            self.focused = Some(field);
        }
    }

    fn set_instructions(&mut self, text: &str) {
        self.instructions = text.to_string();
    }

    fn mask_barcode(&mut self) {
        self.barcode_masked = true;
    }

    fn unmask_barcode(&mut self) {
        self.barcode_masked = false;
    }

    fn set_pair_status(&mut self, status: Option<PairStatus>) {
        self.pair_status = status;
    }

    fn show_warning(&mut self, message: &str) {
        self.warning = Some(message.to_string());
    }

    fn clear_warning(&mut self) {
        self.warning = None;
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.submit_enabled = enabled;
    }
}
