//! Double entry checks: a value is typed twice and both copies must agree.
//!
//! The primary field is masked behind a placeholder while the copy is being typed, so that the
//! copy cannot be produced by reading the primary off the screen.

use std::error::Error;
use std::fmt::Display;

use crate::config::PairStatus;

/// When the copy is considered complete enough to be compared.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum LengthRule {
    /// The copy has as many characters as the primary.
    SameAsPrimary,
    /// The copy has exactly this many characters.
    Exactly(usize),
    /// Any non-empty copy is compared, but a difference is not reported until submission.
    NonEmpty,
}

impl LengthRule {
    pub const BARCODE: LengthRule = LengthRule::SameAsPrimary;
    pub const CENTER_NUMBER: LengthRule = LengthRule::Exactly(5);
    pub const STATION_NUMBER: LengthRule = LengthRule::NonEmpty;
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CopyCheck {
    /// Complete and identical: reveal the primary and style both fields as valid.
    Match,
    /// Complete but different: reveal the primary and style both fields as invalid.
    Mismatch,
    /// Not complete yet: keep the primary masked.
    Incomplete,
}

impl CopyCheck {
    pub fn status(&self) -> Option<PairStatus> {
        match self {
            CopyCheck::Match => Some(PairStatus::Success),
            CopyCheck::Mismatch => Some(PairStatus::Error),
            CopyCheck::Incomplete => None,
        }
    }

    pub fn reveals_primary(&self) -> bool {
        !matches!(self, CopyCheck::Incomplete)
    }
}

/// Checks a copy while it is typed (keyup or focus out).
pub fn check_copy(primary: &str, copy: &str, rule: LengthRule) -> CopyCheck {
    let copy_len = copy.chars().count();
    let complete = match rule {
        LengthRule::SameAsPrimary => copy_len == primary.chars().count(),
        LengthRule::Exactly(n) => copy_len == n,
        LengthRule::NonEmpty => copy_len > 0,
    };
    match (complete, primary == copy) {
        (true, true) => CopyCheck::Match,
        (true, false) if rule == LengthRule::NonEmpty => CopyCheck::Incomplete,
        (true, false) => CopyCheck::Mismatch,
        (false, _) => CopyCheck::Incomplete,
    }
}

/// Whether the primary must be hidden when it loses focus.
pub fn mask_on_primary_blur(primary: &str, copy: &str) -> bool {
    !primary.is_empty() && primary != copy
}

/// A value entered twice, checked when the form is submitted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CopyPair {
    pub value: String,
    pub copy: String,
}

impl CopyPair {
    pub fn new(value: &str, copy: &str) -> CopyPair {
        CopyPair {
            value: value.to_string(),
            copy: copy.to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.value.is_empty() && !self.copy.is_empty() && self.value == self.copy
    }

    pub fn status(&self) -> PairStatus {
        if self.is_valid() {
            PairStatus::Success
        } else {
            PairStatus::Error
        }
    }
}

/// The center and station numbers of a result form, each entered twice.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CenterDetails {
    pub center_number: CopyPair,
    pub station_number: CopyPair,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CenterField {
    CenterNumber,
    StationNumber,
}

/// Returned when the center details do not match; lists the failing pairs.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CenterDetailsMismatch {
    pub fields: Vec<CenterField>,
}

impl Error for CenterDetailsMismatch {}

impl Display for CenterDetailsMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self
            .fields
            .iter()
            .map(|cf| match cf {
                CenterField::CenterNumber => "center number",
                CenterField::StationNumber => "station number",
            })
            .collect();
        write!(f, "mismatched copies: {}", names.join(", "))
    }
}

impl CenterDetails {
    /// Both pairs are checked (so that both get their styling), then any failure is reported.
    pub fn verify(&self) -> Result<(), CenterDetailsMismatch> {
        let mut fields: Vec<CenterField> = Vec::new();
        if !self.center_number.is_valid() {
            fields.push(CenterField::CenterNumber);
        }
        if !self.station_number.is_valid() {
            fields.push(CenterField::StationNumber);
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(CenterDetailsMismatch { fields })
        }
    }
}
