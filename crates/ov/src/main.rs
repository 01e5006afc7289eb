//! `ov` — search and follow AFD output logs from the terminal.
//!
//! Matched rows go to stdout; summaries, status lines and logging go to
//! stderr so the row stream stays pipeable. Ctrl-C cancels the run
//! cooperatively.

use anyhow::{Context, bail};
use clap::Parser;
use olog_core::Comparator;
use olog_engine::sink::{Batch, EventSink};
use olog_engine::{
    DirInfo, Engine, EngineConfig, FileNamePreference, MapResolver, NullResolver, ProtocolSet,
    Query, Resolver, UserInfo,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ov", about = "Search, list and follow AFD output logs")]
struct Args {
    /// Directory holding the rotated OUTPUT_LOG.N files
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Base name of the rotated log files
    #[arg(long, default_value = "OUTPUT_LOG")]
    base_name: String,

    /// Rotation bound (OUTPUT_LOG.0 … OUTPUT_LOG.N-1)
    #[arg(long, default_value_t = 10)]
    max_files: u32,

    /// Window start, seconds since epoch (default: 24 hours ago)
    #[arg(long)]
    after: Option<u64>,

    /// Window end, seconds since epoch (default: now, or open when --tail)
    #[arg(long)]
    before: Option<u64>,

    /// Keep following the current log after the scan
    #[arg(long)]
    tail: bool,

    /// File-name glob, repeatable; a leading '!' negates
    #[arg(long = "file-name")]
    file_names: Vec<String>,

    /// Size filter: '=N', '<N', '>N' or '!=N' (bytes)
    #[arg(long)]
    size: Option<String>,

    /// Transport-time filter: '=S', '<S', '>S' or '!=S' (seconds)
    #[arg(long)]
    transport_time: Option<String>,

    /// Recipient glob over "hostalias user", repeatable
    #[arg(long = "recipient")]
    recipients: Vec<String>,

    /// User glob paired with the recipient at the same position;
    /// an '@' switches matching to the mail destination
    #[arg(long = "user")]
    users: Vec<String>,

    /// Directory path prefix or glob, repeatable
    #[arg(long = "dir")]
    dirs: Vec<String>,

    /// Directory id, repeatable
    #[arg(long = "dir-id")]
    dir_ids: Vec<u32>,

    /// Job id (hex), repeatable
    #[arg(long = "job-id")]
    job_ids: Vec<String>,

    /// Protocol to allow (ftp, ftps, sftp, scp, http, https, smtp,
    /// smtps, loc, exec, wmo, map, dfax, demail), repeatable;
    /// default: all
    #[arg(long = "protocol")]
    protocols: Vec<String>,

    /// Only records whose archived payload is still retrievable
    #[arg(long)]
    archived_only: bool,

    /// Only received records
    #[arg(long)]
    received_only: bool,

    /// Only delivered records
    #[arg(long)]
    output_only: bool,

    /// Include confirmation records
    #[arg(long)]
    confirmation: bool,

    /// Stop after this many rows (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Display the remote file name when the record has one
    #[arg(long)]
    remote_names: bool,

    /// Column budget of the file-name field
    #[arg(long, default_value_t = 30)]
    name_width: usize,

    /// JSON file with job metadata for recipient/user/directory filters
    #[arg(long)]
    job_map: Option<PathBuf>,
}

/// On-disk shape of `--job-map`: hex job ids to their metadata.
#[derive(Debug, Deserialize)]
struct JobMapFile {
    #[serde(default)]
    users: std::collections::HashMap<String, JobUser>,
    #[serde(default)]
    dirs: std::collections::HashMap<String, JobDir>,
}

#[derive(Debug, Deserialize)]
struct JobUser {
    user: String,
    #[serde(default)]
    mail_destination: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobDir {
    dir_path: String,
    dir_id: u32,
}

struct StdoutSink;

impl EventSink for StdoutSink {
    fn on_batch(&mut self, batch: Batch) {
        for row in batch.rows {
            println!("{}", row.text);
        }
    }

    fn on_summary(&mut self, summary: &str) {
        eprintln!("{summary}");
    }

    fn on_status(&mut self, status: &str) {
        eprintln!("{status}");
    }

    fn on_fatal(&mut self, message: &str) {
        eprintln!("FATAL: {message}");
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn parse_comparison(text: &str) -> anyhow::Result<(Comparator, &str)> {
    if let Some(rest) = text.strip_prefix("!=") {
        return Ok((Comparator::NotEqual, rest));
    }
    match text.as_bytes().first() {
        Some(b'=') => Ok((Comparator::Equal, &text[1..])),
        Some(b'<') => Ok((Comparator::Less, &text[1..])),
        Some(b'>') => Ok((Comparator::Greater, &text[1..])),
        _ => bail!("comparison must start with '=', '<', '>' or '!=': {text:?}"),
    }
}

fn parse_protocols(names: &[String]) -> anyhow::Result<ProtocolSet> {
    if names.is_empty() {
        return Ok(ProtocolSet::all());
    }

    let mut set = ProtocolSet::empty();
    for name in names {
        set |= match name.to_ascii_lowercase().as_str() {
            "ftp" => ProtocolSet::FTP,
            "ftps" => ProtocolSet::FTPS,
            "sftp" => ProtocolSet::SFTP,
            "scp" => ProtocolSet::SCP,
            "http" => ProtocolSet::HTTP,
            "https" => ProtocolSet::HTTPS,
            "smtp" => ProtocolSet::SMTP,
            "smtps" => ProtocolSet::SMTPS,
            "loc" => ProtocolSet::LOC,
            "exec" => ProtocolSet::EXEC,
            "wmo" => ProtocolSet::WMO,
            "map" => ProtocolSet::MAP,
            "dfax" => ProtocolSet::DFAX,
            "demail" => ProtocolSet::DEMAIL,
            other => bail!("unknown protocol: {other:?}"),
        };
    }
    Ok(set)
}

fn build_query(args: &Args) -> anyhow::Result<Query> {
    let start = args.after.unwrap_or_else(|| epoch_now().saturating_sub(86_400));
    let mut query = Query::new(start);

    query.end_time = match (args.before, args.tail) {
        (Some(before), _) => Some(before),
        (None, true) => None,
        (None, false) => Some(epoch_now()),
    };

    query.file_name_filters = args.file_names.clone();

    if let Some(size) = &args.size {
        let (op, value) = parse_comparison(size)?;
        let value: u64 = value.parse().with_context(|| format!("bad size: {size:?}"))?;
        query = query.with_size_filter(op, value);
    }

    if let Some(tt) = &args.transport_time {
        let (op, value) = parse_comparison(tt)?;
        let seconds: f64 = value
            .parse()
            .with_context(|| format!("bad transport time: {tt:?}"))?;
        query = query.with_transport_time_filter(op, seconds);
    }

    if !args.recipients.is_empty() {
        let mut users = args.users.clone();
        if users.len() > args.recipients.len() {
            bail!("more --user filters than --recipient filters");
        }
        users.resize(args.recipients.len(), String::new());
        query = query.with_recipients(args.recipients.clone(), users);
    } else if !args.users.is_empty() {
        bail!("--user requires a --recipient at the same position");
    }

    query.directory_filters = args.dirs.clone();
    query.directory_ids = args.dir_ids.iter().copied().collect();
    query.job_ids = args
        .job_ids
        .iter()
        .map(|id| {
            u64::from_str_radix(id.trim_start_matches("0x"), 16)
                .with_context(|| format!("bad job id: {id:?}"))
        })
        .collect::<anyhow::Result<_>>()?;

    query.protocols = parse_protocols(&args.protocols)?;
    query.view_archived_only = args.archived_only;
    query.view_received_only = args.received_only;
    query.view_output_only = args.output_only;
    query.view_confirmation = args.confirmation;
    query.list_limit = args.limit;
    query.max_displayed_filename_len = args.name_width;
    if args.remote_names {
        query.file_name_preference = FileNamePreference::Remote;
    }

    Ok(query)
}

fn load_job_map(path: &PathBuf) -> anyhow::Result<MapResolver> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read job map {}", path.display()))?;
    let file: JobMapFile = serde_json::from_str(&content)
        .with_context(|| format!("cannot parse job map {}", path.display()))?;

    let mut resolver = MapResolver::default();
    for (id, user) in file.users {
        let job_id = u64::from_str_radix(id.trim_start_matches("0x"), 16)
            .with_context(|| format!("bad job id in job map: {id:?}"))?;
        resolver.insert_user(
            job_id,
            UserInfo {
                user: user.user,
                mail_destination: user.mail_destination,
            },
        );
    }
    for (id, dir) in file.dirs {
        let job_id = u64::from_str_radix(id.trim_start_matches("0x"), 16)
            .with_context(|| format!("bad job id in job map: {id:?}"))?;
        resolver.insert_dir(
            job_id,
            DirInfo {
                dir_path: dir.dir_path,
                dir_id: dir.dir_id,
            },
        );
    }
    Ok(resolver)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let query = build_query(&args)?;
    let config = EngineConfig::new(&args.log_dir)
        .with_base_name(&args.base_name)
        .with_max_files(args.max_files);
    let engine = Engine::new(config);

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let mut resolver: Box<dyn Resolver> = match &args.job_map {
        Some(path) => Box::new(load_job_map(path)?),
        None => Box::new(NullResolver),
    };
    let mut sink = StdoutSink;

    let output = engine
        .run(&query, resolver.as_mut(), &mut sink, cancel)
        .await?;

    debug!(
        rows = output.state.total_matched,
        ignored = output.state.ignored,
        "Run finished"
    );
    Ok(())
}
