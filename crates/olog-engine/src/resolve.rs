//! The resolver seam.
//!
//! Recipient-user and directory clauses need metadata that is not in the
//! record: the user and mail destination a job delivers to, and the
//! directory the file came from. The engine consumes that through this
//! trait and assumes implementations are idempotent and internally
//! cached — the same `job_id` must resolve to the same values within one
//! run. `release` is called once at the end of a run so implementations
//! can drop lookup storage.

use olog_common::HashMap;

/// User metadata of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub user: String,
    pub mail_destination: Option<String>,
}

/// Directory metadata of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirInfo {
    pub dir_path: String,
    pub dir_id: u32,
}

/// External lookup of job metadata.
pub trait Resolver {
    fn lookup_user(&mut self, job_id: u64) -> Option<UserInfo>;
    fn lookup_dir(&mut self, job_id: u64) -> Option<DirInfo>;

    /// Free resolver-owned lookup storage after a run.
    fn release(&mut self) {}
}

/// Resolves nothing. Filters that need resolution then reject every
/// record, which is the documented miss policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl Resolver for NullResolver {
    fn lookup_user(&mut self, _job_id: u64) -> Option<UserInfo> {
        None
    }

    fn lookup_dir(&mut self, _job_id: u64) -> Option<DirInfo> {
        None
    }
}

/// Table-backed resolver for hosts that already hold the job metadata.
#[derive(Debug, Default, Clone)]
pub struct MapResolver {
    users: HashMap<u64, UserInfo>,
    dirs: HashMap<u64, DirInfo>,
}

impl MapResolver {
    pub fn insert_user(&mut self, job_id: u64, info: UserInfo) {
        self.users.insert(job_id, info);
    }

    pub fn insert_dir(&mut self, job_id: u64, info: DirInfo) {
        self.dirs.insert(job_id, info);
    }
}

impl Resolver for MapResolver {
    fn lookup_user(&mut self, job_id: u64) -> Option<UserInfo> {
        self.users.get(&job_id).cloned()
    }

    fn lookup_dir(&mut self, job_id: u64) -> Option<DirInfo> {
        self.dirs.get(&job_id).cloned()
    }
}
