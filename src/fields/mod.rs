// src/fields/mod.rs
//
// Field Derivation Library.
//
// Small, pure functions from raw source values to output values. None of
// them touch the cache or the network; deployment-specific tables come in
// through `Profile`. Functions that meet unexpected input log a warning and
// return a best-effort value rather than failing.

pub mod address;
pub mod code;
pub mod date;
pub mod email;
pub mod grade;
pub mod names;
pub mod phone;
pub mod relation;
pub mod term;

pub use address::{city_state_zip, state_abbrev, street_address};
pub use code::{incr_char, incr_string};
pub use date::parse_date;
pub use email::{staff_email, student_email};
pub use grade::translate_grade;
pub use names::{camel_case, display_name, format_first_name, format_last_name, split_full_name};
pub use phone::{phone_display, phone_e164};
pub use relation::{classify_relationship, position_role, RoleCategory};
pub use term::{derive_term, Term, YearBoundaries};
