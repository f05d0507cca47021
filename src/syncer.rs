use crate::{
    config::Config,
    error::{Error, Result},
    parser::{ALL_ARCH, ParsedIssue},
};
use log::{info, warn};
use serde::Serialize;
use std::{
    io::{self, BufRead, BufReader, Read},
    path::Path,
    process::Stdio,
};
use tokio::{fs, process::Command, task};

/// One `source: target` line of a job configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMapping {
    pub source: String,
    pub target: String,
}

/// Everything needed to run the syncer once for a single architecture group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncJob {
    pub arch: String,
    pub images: Vec<ImageMapping>,
    pub args: Vec<String>,
}

impl SyncJob {
    pub fn render(&self) -> String {
        self.images
            .iter()
            .map(|mapping| format!("{}: {}\n", mapping.source, mapping.target))
            .collect()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Target images of every synced group, in processing order
    pub targets: Vec<String>,
}

pub struct Syncer {
    config: Config,
}

impl Syncer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn plan(&self, issue: &ParsedIssue) -> Vec<SyncJob> {
        issue
            .groups
            .iter()
            .map(|(arch, sources)| SyncJob {
                arch: arch.to_string(),
                images: sources
                    .iter()
                    .map(|source| ImageMapping {
                        source: source.clone(),
                        target: Self::target_image(
                            &self.config.registry,
                            &self.config.namespace,
                            source,
                        ),
                    })
                    .collect(),
                args: self.args(arch),
            })
            .collect()
    }

    /// Sync every group one after another, stopping at the first failure
    ///
    /// The summary files are only written once every group has succeeded.
    pub async fn run(&self, issue: &ParsedIssue) -> Result<SyncReport> {
        if issue.groups.is_empty() {
            info!("No valid images found to sync.");
            return Ok(SyncReport::default());
        }

        info!("Syncing {} architecture group(s)", issue.groups.len());

        let mut report = SyncReport::default();

        for job in self.plan(issue) {
            info!("{}", "-".repeat(50));
            info!("Processing group for arch: '{}'", job.arch);

            let content = job.render();
            write(&self.config.images_file, &content).await?;
            info!(
                "Generated {} for this group:",
                self.config.images_file.display()
            );
            println!("{content}");

            self.invoke(&job).await?;

            report
                .targets
                .extend(job.images.into_iter().map(|mapping| mapping.target));
        }

        write(&self.config.targets_file, &report.targets.join("\n")).await?;
        write(&self.config.sources_file, &issue.source_images.join("\n")).await?;

        info!("{}", "=".repeat(50));
        info!("All sync tasks completed successfully.");

        Ok(report)
    }

    /// Run the syncer for one job, echoing stdout and stderr as one stream
    async fn invoke(&self, job: &SyncJob) -> Result<()> {
        let sync_error = |reason: String| Error::Sync {
            arch: job.arch.clone(),
            reason,
        };

        info!(
            "Executing command: {} {}",
            self.config.syncer.display(),
            job.args.join(" ")
        );

        let (reader, writer) = io::pipe().map_err(|e| sync_error(e.to_string()))?;
        let stderr = writer
            .try_clone()
            .map_err(|e| sync_error(e.to_string()))?;

        // The command owns the write ends; dropping it lets the reader see EOF.
        let mut child = {
            let mut command = Command::new(&self.config.syncer);
            command
                .args(&job.args)
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(stderr);
            command.spawn().map_err(|e| {
                sync_error(format!(
                    "failed to execute {}: {e}",
                    self.config.syncer.display()
                ))
            })?
        };

        let output = task::spawn_blocking(move || echo(reader));
        let (echoed, status) = tokio::join!(output, child.wait());

        match echoed {
            Ok(Err(e)) => warn!("Failed to read syncer output: {e}"),
            Err(e) => warn!("Failed to read syncer output: {e}"),
            Ok(Ok(())) => {}
        }

        let status = status.map_err(|e| sync_error(e.to_string()))?;
        if !status.success() {
            return Err(sync_error(status.to_string()));
        }

        Ok(())
    }

    fn args(&self, arch: &str) -> Vec<String> {
        let mut args = vec![
            format!("--auth={}", self.config.auth.display()),
            format!("--images={}", self.config.images_file.display()),
            format!("--proc={}", self.config.proc),
        ];

        if !arch.eq_ignore_ascii_case(ALL_ARCH) {
            args.push("--arch".to_string());
            args.push(arch.to_string());
        }

        args
    }

    pub fn target_image(registry: &str, namespace: &str, source: &str) -> String {
        format!("{registry}/{namespace}/{}", Self::last_path_segment(source))
    }

    fn last_path_segment(source: &str) -> &str {
        source.rsplit('/').next().unwrap_or(source)
    }
}

fn echo(reader: impl Read) -> io::Result<()> {
    for line in BufReader::new(reader).split(b'\n') {
        println!("{}", String::from_utf8_lossy(&line?).trim());
    }

    Ok(())
}

async fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).await.map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
