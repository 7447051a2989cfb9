/*!
State machines behind the data entry and batch import pages of a tally center.

Two pieces of client behaviour are modelled here, independently of any browser:

* barcode entry on intake forms: a form starts in scan mode, detects when a person types in the
  scan field instead of using a scanner, and switches to manual (double) entry.
  See [BarcodeModeController].
* the progress of a multi-step batch import driven by the server. See [ImportJobProgress].

Neither does any I/O. The form is reached through the [BarcodeFormView] trait and time is
passed in explicitly, so that scanner-speed and human-speed input can be simulated. The import
tracker returns the next request to send and consumes the replies.

The long-form documentation is in the [manual] module.
*/
mod barcode;
mod classifier;
mod config;
mod copy_pair;
mod form;
mod progress;
mod scanner;

pub mod builder;
pub mod manual;

pub use crate::barcode::*;
pub use crate::classifier::*;
pub use crate::config::*;
pub use crate::copy_pair::*;
pub use crate::form::*;
pub use crate::progress::*;
pub use crate::scanner::*;
