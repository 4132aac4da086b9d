use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::ExposeSecret;
use silt_config::shared::{DumpConfig, MySqlConnectionConfig};
use tokio::fs;
use tokio::io::BufReader;
use tokio::process::Command;
use tracing::{info, warn};

use crate::dump::parser::{DumpHandler, ParserState, parse_stream};
use crate::error::{Error, ErrorKind, SiltResult};

/// Marker file written into a finished parallel-dump directory, enabling
/// dump reuse across restarts.
const COMPLETE_MARKER: &str = "complete";

/// Subdirectory of the data directory used for dump staging.
const STAGING_DIR: &str = "dump";

static META_LOG_EXP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+Log:\s+(.+)").unwrap());
static META_POS_EXP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+Pos:\s+(\d+)").unwrap());

/// Drives the external logical dump tool and feeds its output through the
/// dump parser.
///
/// Two tool families are supported: a parallel dumper (`mydumper`) writing a
/// directory of per-table files plus a metadata file, and a sequential
/// `mysqldump`-compatible tool writing a single text stream. Which one runs
/// is decided by the executable name.
#[derive(Debug)]
pub struct Dumper {
    exec_path: String,
    host: String,
    port: u16,
    username: String,
    password: Option<String>,
    databases: Vec<String>,
    table_db: String,
    tables: Vec<String>,
    staging_dir: PathBuf,
}

impl Dumper {
    pub fn new(mysql: &MySqlConnectionConfig, dump: &DumpConfig, data_dir: &Path) -> Self {
        Self {
            exec_path: dump.exec_path.clone(),
            host: mysql.host.clone(),
            port: mysql.port,
            username: mysql.username.clone(),
            password: mysql
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string()),
            databases: Vec::new(),
            table_db: String::new(),
            tables: Vec::new(),
            staging_dir: data_dir.join(STAGING_DIR),
        }
    }

    /// Restricts the dump to specific tables of one database.
    pub fn set_tables(&mut self, db: &str, tables: Vec<String>) {
        self.table_db = db.to_string();
        self.tables = tables;
        self.databases.clear();
    }

    /// Restricts the dump to whole databases.
    pub fn set_databases(&mut self, databases: Vec<String>) {
        self.databases = databases;
        self.table_db.clear();
        self.tables.clear();
    }

    /// Runs (or reuses) the dump and streams its rows into the handler.
    pub async fn dump_and_parse<H: DumpHandler>(&self, handler: &mut H) -> SiltResult<()> {
        if self.exec_path.ends_with("mydumper") {
            self.mydumper(handler).await
        } else {
            self.mysqldump(handler).await
        }
    }

    async fn mysqldump<H: DumpHandler>(&self, handler: &mut H) -> SiltResult<()> {
        let mut args: Vec<String> = vec![
            format!("--host={}", self.host),
            format!("--port={}", self.port),
            format!("--user={}", self.username),
        ];
        if let Some(password) = &self.password {
            args.push(format!("--password={password}"));
        }

        args.push("--master-data".to_string());
        args.push("--single-transaction".to_string());
        args.push("--skip-lock-tables".to_string());

        // Keep the output lean and parseable: data only, one row per line.
        args.push("--compact".to_string());
        args.push("--skip-opt".to_string());
        args.push("--quick".to_string());
        args.push("--no-create-info".to_string());
        args.push("--skip-extended-insert".to_string());

        let mut state = ParserState::new();
        if self.tables.is_empty() && self.databases.is_empty() {
            args.push("--all-databases".to_string());
        } else if self.tables.is_empty() {
            args.push("--databases".to_string());
            args.extend(self.databases.iter().cloned());
        } else {
            args.push(self.table_db.clone());
            args.extend(self.tables.iter().cloned());
            // Table-restricted dumps carry no database context of their own.
            state.set_database(&self.table_db);
        }

        info!(exec = %self.exec_path, "starting sequential dump");
        let mut child = Command::new(&self.exec_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::with_source(
                    ErrorKind::DumpFailed {
                        reason: format!("failed to spawn '{}'", self.exec_path),
                    },
                    e,
                )
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::dump_failed("dump tool stdout not captured"))?;
        parse_stream(&mut state, BufReader::new(stdout), handler).await?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(Error::dump_failed(format!(
                "dump tool exited with {status}"
            )));
        }

        Ok(())
    }

    async fn mydumper<H: DumpHandler>(&self, handler: &mut H) -> SiltResult<()> {
        if fs::try_exists(self.staging_dir.join(COMPLETE_MARKER))
            .await
            .unwrap_or(false)
        {
            info!(dir = %self.staging_dir.display(), "reusing existing completed dump");
            return self.parse_output_dir(handler).await;
        }

        // A directory without the marker is a dump that died halfway.
        if fs::try_exists(&self.staging_dir).await.unwrap_or(false) {
            warn!(dir = %self.staging_dir.display(), "discarding incomplete dump directory");
            fs::remove_dir_all(&self.staging_dir).await?;
        }
        fs::create_dir_all(&self.staging_dir).await?;

        let mut args: Vec<String> = vec![
            format!("--host={}", self.host),
            format!("--port={}", self.port),
            format!("--user={}", self.username),
            format!("--outputdir={}", self.staging_dir.display()),
        ];
        if let Some(password) = &self.password {
            args.push(format!("--password={password}"));
        }

        // FLUSH TABLES WITH READ LOCK is not available on managed instances.
        args.push("--lock-all-tables".to_string());
        args.push("--no-schemas".to_string());
        args.push("--compress-protocol".to_string());
        args.push("--long-query-guard=2000".to_string());

        if self.tables.is_empty() && self.databases.is_empty() {
            // all databases is the tool default
        } else if self.tables.is_empty() {
            for db in &self.databases {
                args.push("--database".to_string());
                args.push(db.clone());
            }
        } else {
            args.push("--tables-list".to_string());
            let list: Vec<String> = self
                .tables
                .iter()
                .map(|t| format!("{}.{t}", self.table_db))
                .collect();
            args.push(list.join(","));
        }

        info!(exec = %self.exec_path, dir = %self.staging_dir.display(), "starting parallel dump");
        let status = Command::new(&self.exec_path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                Error::with_source(
                    ErrorKind::DumpFailed {
                        reason: format!("failed to spawn '{}'", self.exec_path),
                    },
                    e,
                )
            })?;
        if !status.success() {
            return Err(Error::dump_failed(format!(
                "dump tool exited with {status}"
            )));
        }

        fs::write(self.staging_dir.join(COMPLETE_MARKER), b"").await?;
        self.parse_output_dir(handler).await
    }

    /// Parses a completed parallel-dump directory.
    ///
    /// The metadata file is turned into a synthetic `CHANGE MASTER TO` record
    /// first, so the per-table files read as a normal stream prefix.
    async fn parse_output_dir<H: DumpHandler>(&self, handler: &mut H) -> SiltResult<()> {
        let metadata = fs::read_to_string(self.staging_dir.join("metadata")).await?;
        let change_master = Self::synthesize_checkpoint(&metadata)?;

        let mut state = ParserState::new();
        parse_stream(&mut state, change_master.as_bytes(), handler).await?;

        let mut entries = fs::read_dir(&self.staging_dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "metadata" || name == COMPLETE_MARKER {
                continue;
            }
            files.push((name, entry.path()));
        }
        files.sort();

        for (name, path) in files {
            // Per-table files are named `db.table[.NNNNN].sql`; the database
            // is inferred from the name since the content has no USE line.
            let db = name.split('.').next().unwrap_or_default().to_string();
            info!(file = %path.display(), "parsing dump file");
            state.set_database(&db);
            let file = fs::File::open(&path).await?;
            parse_stream(&mut state, BufReader::new(file), handler).await?;
        }

        Ok(())
    }

    fn synthesize_checkpoint(metadata: &str) -> SiltResult<String> {
        let mut file = None;
        let mut pos = None;
        for line in metadata.lines() {
            if let Some(captures) = META_LOG_EXP.captures(line) {
                file = Some(captures[1].to_string());
            } else if let Some(captures) = META_POS_EXP.captures(line) {
                pos = Some(captures[1].to_string());
            }
        }

        match (file, pos) {
            (Some(file), Some(pos)) => Ok(format!(
                "CHANGE MASTER TO MASTER_LOG_FILE='{file}', MASTER_LOG_POS={pos};\n"
            )),
            _ => Err(Error::dump_parse_failed(
                "dump metadata carries no binlog coordinate",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_checkpoint_from_metadata() {
        let metadata = "Started dump at: 2016-01-01 00:00:01\n\
                        SHOW MASTER STATUS:\n\
                        \tLog: mysql-bin.000002\n\
                        \tPos: 4736\n\
                        \tGTID:\n\n\
                        Finished dump at: 2016-01-01 00:00:02\n";
        let line = Dumper::synthesize_checkpoint(metadata).unwrap();
        assert_eq!(
            line,
            "CHANGE MASTER TO MASTER_LOG_FILE='mysql-bin.000002', MASTER_LOG_POS=4736;\n"
        );
    }

    #[test]
    fn metadata_without_coordinate_is_an_error() {
        assert!(Dumper::synthesize_checkpoint("Started dump at: now\n").is_err());
    }
}
