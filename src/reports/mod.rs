// src/reports/mod.rs
//! Report generators.
//!
//! Each report reads the typed tables in [`SchoolData`] and produces one or
//! more flat [`DataSet`]s. Reports never touch the cache or the network, and
//! they all share one error policy through [`ReportContext`]:
//!
//! - a row whose join target is missing goes through [`JoinPolicy`]
//!   (skip + `warn!`, or abort with `IncompleteJoin`);
//! - a required singleton (the school, the current year, the principal) that
//!   is missing or duplicated fails with `AmbiguousRequiredRecord`.
//!
//! Writing the tables is the runner's job (`file::write_report`).

pub mod clever;
pub mod directory;
pub mod oneroster;
pub mod registration;
pub mod validation;

use std::cell::Cell;

use tracing::warn;

use crate::config::consts::{MAX_FAMILY_EMAILS, MAX_PRIMARY_PARENTS};
use crate::config::options::{JoinPolicy, ReportKind};
use crate::config::profile::Profile;
use crate::data::DataSet;
use crate::error::{Error, Result};
use crate::fields::date::parse_date;
use crate::fields::relation::{contact_rank, select_emails};
use crate::fields::YearBoundaries;
use crate::records::{Employee, FamilyContact, Keyed, School, SchoolData, Typed, YearDetails};

pub trait Report {
    /// Output subdirectory name.
    fn name(&self) -> &'static str;
    fn generate(&self, ctx: &ReportContext<'_>) -> Result<Vec<DataSet>>;
}

pub fn report_for(kind: ReportKind) -> Box<dyn Report> {
    match kind {
        ReportKind::Registration => Box::new(registration::Registration),
        ReportKind::Oneroster => Box::new(oneroster::OneRoster),
        ReportKind::Clever => Box::new(clever::Clever),
        ReportKind::Directory => Box::new(directory::Directory),
        ReportKind::Validation => Box::new(validation::Validation),
    }
}

/// Everything a report may read, plus the shared join policy.
pub struct ReportContext<'a> {
    pub data: &'a SchoolData,
    pub profile: &'a Profile,
    pub school_id: &'a str,
    pub joins: JoinPolicy,
    skipped: Cell<usize>,
}

/// The current school year with its quarter boundaries.
pub struct CurrentYear<'a> {
    pub name: &'a str,
    pub details: &'a YearDetails,
    pub bounds: Option<YearBoundaries>,
}

/// Primary parents of one family, capped at two. The rest land in `overflow`.
pub struct PrimaryParents<'a> {
    pub kept: Vec<&'a FamilyContact>,
    pub overflow: Vec<&'a FamilyContact>,
}

impl<'a> ReportContext<'a> {
    pub fn new(data: &'a SchoolData, profile: &'a Profile, school_id: &'a str, joins: JoinPolicy) -> Self {
        Self { data, profile, school_id, joins, skipped: Cell::new(0) }
    }

    /// Rows dropped under `JoinPolicy::SkipRow` so far.
    pub fn skipped(&self) -> usize {
        self.skipped.get()
    }

    /// Look up `key` in `table` on behalf of row `row`. `Ok(None)` means the
    /// row has been logged and should be skipped.
    pub fn join<'t, T>(&self, table: &'t Typed<T>, key: &str, row: &str) -> Result<Option<&'t T>> {
        if let Some(found) = table.get(key) {
            return Ok(Some(found));
        }
        match self.joins {
            JoinPolicy::SkipRow => {
                warn!(table = table.entity(), key, row, "join target missing; skipping row");
                self.skipped.set(self.skipped.get() + 1);
                Ok(None)
            }
            JoinPolicy::Abort => Err(Error::IncompleteJoin { table: s!(table.entity()), key: s!(key) }),
        }
    }

    /// Log and count a row dropped for a reason other than a join miss.
    pub fn skip(&self, row: &str, reason: &str) {
        warn!(row, reason, "skipping row");
        self.skipped.set(self.skipped.get() + 1);
    }

    /* ---------------- Required singletons ---------------- */

    pub fn school(&self) -> Result<&'a School> {
        exactly_one("school", self.data.school.iter().map(|k| &k.value))
    }

    /// The employee who is their own manager.
    pub fn principal(&self) -> Result<&'a Employee> {
        exactly_one(
            "principal",
            self.data
                .employees
                .iter()
                .map(|k| &k.value)
                .filter(|e| !e.id.is_empty() && e.manager_id == e.id),
        )
    }

    pub fn current_year(&self) -> Result<CurrentYear<'a>> {
        let year = exactly_one(
            "current year",
            self.data.years.iter().filter(|y| y.value.current),
        )?;
        let details = self.data.years_details.get(&year.key).ok_or_else(|| Error::IncompleteJoin {
            table: s!(self.data.years_details.entity()),
            key: year.key.clone(),
        })?;

        let bounds = match (
            parse_date(details.q1_start()),
            parse_date(details.q3_start()),
            parse_date(&details.end_date),
        ) {
            (Some(q1_start), Some(q3_start), Some(year_end)) => Some(YearBoundaries { q1_start, q3_start, year_end }),
            _ => {
                warn!(year = %year.value.name, "current year is missing quarter or end dates");
                None
            }
        };
        let name = if details.name.trim().is_empty() { year.value.name.trim() } else { details.name.trim() };
        Ok(CurrentYear { name, details, bounds })
    }

    /* ---------------- People ---------------- */

    /// Students exported as users: details present and a grade recorded.
    /// Enrollment tables keep to the same set.
    pub fn is_rostered(&self, student_key: &str) -> bool {
        self.data
            .student_details
            .get(student_key)
            .is_some_and(|d| d.grade.is_some())
    }

    /// Active, current employees in a teaching position.
    pub fn teaching_staff(&self) -> impl Iterator<Item = &'a Keyed<Employee>> + use<'a> {
        let profile = self.profile;
        self.data
            .employees
            .iter()
            .filter(move |e| e.value.active && e.value.current && profile.is_teaching_position(e.value.position.trim()))
    }

    pub fn contacts_of(&self, family_key: &str) -> impl Iterator<Item = &'a FamilyContact> + use<'a> {
        self.data.family_contacts.children(family_key).map(|k| &k.value)
    }

    pub fn primary_parents(&self, family_key: &str) -> PrimaryParents<'a> {
        let mut kept: Vec<&FamilyContact> = self.contacts_of(family_key).filter(|c| c.primary_parent).collect();
        let overflow = if kept.len() > MAX_PRIMARY_PARENTS {
            let extra = kept.split_off(MAX_PRIMARY_PARENTS);
            warn!(family = family_key, primary_parents = kept.len() + extra.len(), "more than two primary parents; extra contacts reported separately");
            extra
        } else {
            Vec::new()
        };
        PrimaryParents { kept, overflow }
    }

    /// Up to three family email addresses, best-ranked contact first.
    pub fn family_emails(&self, family_key: &str) -> Vec<String> {
        let order = &self.profile.relationship_order;
        let ranked: Vec<(usize, &str)> = self
            .contacts_of(family_key)
            .map(|c| (contact_rank(c.relation_label(), c.primary_parent, order), c.email.as_str()))
            .collect();
        select_emails(&ranked, MAX_FAMILY_EMAILS)
    }
}

/// Contacts the roster platforms accept: email, first and last name present.
pub fn is_valid_contact(contact: &FamilyContact) -> bool {
    !contact.email.trim().is_empty() && !contact.first_name.trim().is_empty() && !contact.last_name.trim().is_empty()
}

fn exactly_one<T>(what: &str, mut items: impl Iterator<Item = T>) -> Result<T> {
    match (items.next(), items.next()) {
        (Some(one), None) => Ok(one),
        (None, _) => Err(Error::AmbiguousRequiredRecord { what: s!(what), found: 0 }),
        (Some(_), Some(_)) => Err(Error::AmbiguousRequiredRecord { what: s!(what), found: 2 + items.count() }),
    }
}
