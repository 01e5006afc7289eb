//! The immutable query a run evaluates.

use bitflags::bitflags;
use olog_common::HashSet;
use olog_core::{Comparator, Protocol, ViewToggles};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Protocol toggle set of a query.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ProtocolSet: u32 {
        const FTP    = 1 << 0;
        const FTPS   = 1 << 1;
        const SFTP   = 1 << 2;
        const SCP    = 1 << 3;
        const HTTP   = 1 << 4;
        const HTTPS  = 1 << 5;
        const SMTP   = 1 << 6;
        const SMTPS  = 1 << 7;
        const LOC    = 1 << 8;
        const EXEC   = 1 << 9;
        const WMO    = 1 << 10;
        const MAP    = 1 << 11;
        const DFAX   = 1 << 12;
        const DEMAIL = 1 << 13;
    }
}

impl ProtocolSet {
    pub fn from_protocol(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Ftp => Self::FTP,
            Protocol::Ftps => Self::FTPS,
            Protocol::Sftp => Self::SFTP,
            Protocol::Scp => Self::SCP,
            Protocol::Http => Self::HTTP,
            Protocol::Https => Self::HTTPS,
            Protocol::Smtp => Self::SMTP,
            Protocol::Smtps => Self::SMTPS,
            Protocol::Loc => Self::LOC,
            Protocol::Exec => Self::EXEC,
            Protocol::Wmo => Self::WMO,
            Protocol::Map => Self::MAP,
            Protocol::Dfax => Self::DFAX,
            Protocol::Demail => Self::DEMAIL,
        }
    }

    pub fn allows(&self, protocol: Protocol) -> bool {
        self.contains(Self::from_protocol(protocol))
    }
}

impl Default for ProtocolSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Optional file-size clause.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SizeFilter {
    pub op: Comparator,
    pub value: u64,
}

/// Optional transport-time clause.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransportTimeFilter {
    pub op: Comparator,
    pub seconds: f64,
}

/// Which of the two record names is displayed and matched when both exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileNamePreference {
    #[default]
    Local,
    Remote,
}

/// Everything one run searches for. Immutable during the run; build a new
/// query to change anything between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Window start, seconds since epoch (inclusive)
    pub start_time: u64,
    /// Window end; `None` means "until now, then keep tailing"
    pub end_time: Option<u64>,

    /// File-name globs, in order; a leading `!` negates
    pub file_name_filters: Vec<String>,
    pub size_filter: Option<SizeFilter>,
    pub transport_time_filter: Option<TransportTimeFilter>,

    /// Globs matched against `"hostalias user"`
    pub recipient_filters: Vec<String>,
    /// One per recipient filter; empty string = no user restriction
    pub user_filters: Vec<String>,

    /// Literal directory prefixes or globs, in order
    pub directory_filters: Vec<String>,
    pub directory_ids: HashSet<u32>,
    pub job_ids: HashSet<u64>,

    pub protocols: ProtocolSet,

    pub view_archived_only: bool,
    pub view_output_only: bool,
    pub view_received_only: bool,
    pub view_confirmation: bool,

    /// Maximum rows to deliver; 0 = unlimited
    pub list_limit: usize,
    pub file_name_preference: FileNamePreference,
    /// Column budget of the display file name
    pub max_displayed_filename_len: usize,
}

impl Query {
    pub fn new(start_time: u64) -> Self {
        Self {
            start_time,
            end_time: None,
            file_name_filters: Vec::new(),
            size_filter: None,
            transport_time_filter: None,
            recipient_filters: Vec::new(),
            user_filters: Vec::new(),
            directory_filters: Vec::new(),
            directory_ids: HashSet::default(),
            job_ids: HashSet::default(),
            protocols: ProtocolSet::all(),
            view_archived_only: false,
            view_output_only: false,
            view_received_only: false,
            view_confirmation: false,
            list_limit: 0,
            file_name_preference: FileNamePreference::Local,
            max_displayed_filename_len: 30,
        }
    }

    pub fn with_end_time(mut self, end_time: u64) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_file_name_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_name_filters = filters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_size_filter(mut self, op: Comparator, value: u64) -> Self {
        self.size_filter = Some(SizeFilter { op, value });
        self
    }

    pub fn with_transport_time_filter(mut self, op: Comparator, seconds: f64) -> Self {
        self.transport_time_filter = Some(TransportTimeFilter { op, seconds });
        self
    }

    /// Set recipient globs together with their per-recipient user globs.
    /// Both lists must be the same length; use an empty user glob for
    /// recipients without a user restriction.
    pub fn with_recipients<I, S>(mut self, recipients: I, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipient_filters = recipients.into_iter().map(Into::into).collect();
        self.user_filters = users.into_iter().map(Into::into).collect();
        debug_assert_eq!(self.recipient_filters.len(), self.user_filters.len());
        self
    }

    pub fn with_directory_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directory_filters = filters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_directory_ids<I: IntoIterator<Item = u32>>(mut self, ids: I) -> Self {
        self.directory_ids = ids.into_iter().collect();
        self
    }

    pub fn with_job_ids<I: IntoIterator<Item = u64>>(mut self, ids: I) -> Self {
        self.job_ids = ids.into_iter().collect();
        self
    }

    pub fn with_protocols(mut self, protocols: ProtocolSet) -> Self {
        self.protocols = protocols;
        self
    }

    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.list_limit = limit;
        self
    }

    pub fn with_file_name_preference(mut self, preference: FileNamePreference) -> Self {
        self.file_name_preference = preference;
        self
    }

    /// The direction toggles the schema detector applies.
    pub fn toggles(&self) -> ViewToggles {
        ViewToggles {
            confirmation: self.view_confirmation,
            received_only: self.view_received_only,
            output_only: self.view_output_only,
            archived_only: self.view_archived_only,
        }
    }
}
