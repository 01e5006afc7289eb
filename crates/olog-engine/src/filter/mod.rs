//! The composed record predicate.
//!
//! The original engine specialises its scan loop for each on/off
//! combination of the file-name, file-size and recipient filter classes.
//! Here that collapses into one predicate with short-circuit AND
//! semantics; the clause order keeps the cheap tests (protocol, names,
//! sizes) ahead of the resolver-invoking ones (recipient user,
//! directory).

pub mod glob;

use crate::query::{FileNamePreference, Query};
use crate::resolve::Resolver;
use glob::{PatternVerdict, match_group, pattern_verdict};
use olog_core::Record;

/// Predicate built once per run from the active query.
pub struct Predicate<'q> {
    query: &'q Query,
    file_name_active: bool,
    recipient_active: bool,
    directory_active: bool,
}

impl<'q> Predicate<'q> {
    pub fn new(query: &'q Query) -> Self {
        Self {
            query,
            file_name_active: !query.file_name_filters.is_empty(),
            recipient_active: !query.recipient_filters.is_empty(),
            directory_active: !query.directory_filters.is_empty()
                || !query.directory_ids.is_empty(),
        }
    }

    /// The name the query wants to see for this record.
    pub fn display_name<'a>(&self, record: &Record<'a>) -> &'a [u8] {
        match self.query.file_name_preference {
            FileNamePreference::Local => record.local_name,
            FileNamePreference::Remote => record.remote_name.unwrap_or(record.local_name),
        }
    }

    /// Evaluate every clause against one record. Direction toggles have
    /// already been applied by the schema detector, and the
    /// archived-only clause runs in the scanner where the archive status
    /// is derived for display anyway.
    pub fn matches(&self, record: &Record<'_>, resolver: &mut dyn Resolver) -> bool {
        if !self.query.protocols.allows(record.protocol) {
            return false;
        }

        if !self.query.job_ids.is_empty() && !self.query.job_ids.contains(&record.job_id) {
            return false;
        }

        if self.file_name_active
            && match_group(&self.query.file_name_filters, self.display_name(record)).is_none()
        {
            return false;
        }

        if let Some(filter) = &self.query.size_filter {
            if !record.size.compare(filter.op, filter.value) {
                return false;
            }
        }

        if let Some(filter) = &self.query.transport_time_filter {
            let satisfied = match filter.op {
                olog_core::Comparator::Equal => record.transport_time == filter.seconds,
                olog_core::Comparator::Less => record.transport_time < filter.seconds,
                olog_core::Comparator::Greater => record.transport_time > filter.seconds,
                olog_core::Comparator::NotEqual => record.transport_time != filter.seconds,
            };
            if !satisfied {
                return false;
            }
        }

        if self.recipient_active && !self.recipient_matches(record, resolver) {
            return false;
        }

        if self.directory_active && !self.directory_matches(record, resolver) {
            return false;
        }

        true
    }

    /// Clause 5 and 6: one recipient glob must match `"hostalias user"`,
    /// and the user glob paired with it must accept the resolved user (or
    /// the mail destination when the glob carries an `@`).
    fn recipient_matches(&self, record: &Record<'_>, resolver: &mut dyn Resolver) -> bool {
        let user_info = resolver.lookup_user(record.job_id);

        let mut target = Vec::with_capacity(record.host_alias.len() + 16);
        target.extend_from_slice(record.host_alias);
        target.push(b' ');
        if let Some(info) = &user_info {
            target.extend_from_slice(info.user.as_bytes());
        }

        let Some(index) = match_group(&self.query.recipient_filters, &target) else {
            return false;
        };

        let Some(user_filter) = self.query.user_filters.get(index) else {
            return true;
        };
        if user_filter.is_empty() {
            return true;
        }

        // A resolver miss makes the user clause a non-match, never an
        // error.
        let Some(info) = &user_info else {
            return false;
        };

        let subject = if user_filter.contains('@') {
            match &info.mail_destination {
                Some(destination) => destination.as_bytes(),
                None => return false,
            }
        } else {
            info.user.as_bytes()
        };

        pattern_verdict(user_filter, subject) == PatternVerdict::Matched
    }

    /// Clause 7: directory id membership or directory path match. Literal
    /// entries compare as path prefixes; entries with wildcards (or a
    /// negation) go through the glob group.
    fn directory_matches(&self, record: &Record<'_>, resolver: &mut dyn Resolver) -> bool {
        let Some(dir) = resolver.lookup_dir(record.job_id) else {
            return false;
        };

        if self.query.directory_ids.contains(&dir.dir_id) {
            return true;
        }

        for entry in &self.query.directory_filters {
            let is_glob =
                entry.starts_with('!') || entry.as_bytes().iter().any(|&b| b == b'*' || b == b'?');
            if is_glob {
                match pattern_verdict(entry, dir.dir_path.as_bytes()) {
                    PatternVerdict::Matched => return true,
                    PatternVerdict::Reject => return false,
                    PatternVerdict::NoMatch => {}
                }
            } else if dir.dir_path.as_bytes().starts_with(entry.as_bytes()) {
                return true;
            }
        }

        false
    }
}
