use crate::{
    config::{
        Config, DEFAULT_AUTH, DEFAULT_IMAGES_FILE, DEFAULT_PROC, DEFAULT_SOURCES_FILE,
        DEFAULT_SYNCER, DEFAULT_TARGETS_FILE,
    },
    parser::Parser,
    syncer::Syncer,
};
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

#[derive(clap::Parser)]
#[command(version, about = "Mirror the images listed in an issue, grouped by architecture")]
pub struct Cli {
    /// Issue body: image names one per line, optionally `ARCH: <archs>` first and `--arch <archs>` per line
    #[arg(env = "ISSUE_BODY", conflicts_with = "body_file", allow_hyphen_values = true)]
    pub body: Option<String>,

    /// Read the issue body from a file instead
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,

    /// Target registry host (e.g. registry.example.com)
    #[arg(long, env = "TARGET_REGISTRY")]
    pub registry: Option<String>,

    /// Target namespace within the registry
    #[arg(long, env = "TARGET_NAMESPACE")]
    pub namespace: Option<String>,

    /// Path to the image-syncer executable
    #[arg(long, value_name = "PATH", env = "IMAGE_SYNCER", default_value = DEFAULT_SYNCER)]
    pub syncer: PathBuf,

    /// Registry credentials passed to image-syncer
    #[arg(long, value_name = "PATH", env = "IMAGE_SYNCER_AUTH", default_value = DEFAULT_AUTH)]
    pub auth: PathBuf,

    /// Job configuration written for each architecture group
    #[arg(long, value_name = "PATH", default_value = DEFAULT_IMAGES_FILE)]
    pub images_file: PathBuf,

    /// Parallel transfers per image-syncer run
    #[arg(long, default_value_t = DEFAULT_PROC)]
    pub proc: u32,

    /// Where the list of synced target images is written
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TARGETS_FILE)]
    pub targets_file: PathBuf,

    /// Where the list of requested source images is written
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SOURCES_FILE)]
    pub sources_file: PathBuf,

    /// Print the sync jobs as JSON without running image-syncer
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = self.config()?;
        let body = self.body().await?;
        let issue = Parser::parse(&body)?;
        let syncer = Syncer::new(config);

        if self.dry_run {
            let jobs = syncer.plan(&issue);
            println!("{}", serde_json::to_string_pretty(&jobs)?);
            return Ok(());
        }

        let report = syncer.run(&issue).await?;
        if !report.targets.is_empty() {
            info!("Synced {} image(s)", report.targets.len());
        }

        Ok(())
    }

    fn config(&self) -> Result<Config> {
        let mut config = Config::new(self.registry.clone(), self.namespace.clone())?;
        config.syncer = self.syncer.clone();
        config.auth = self.auth.clone();
        config.images_file = self.images_file.clone();
        config.proc = self.proc;
        config.targets_file = self.targets_file.clone();
        config.sources_file = self.sources_file.clone();

        Ok(config)
    }

    async fn body(&self) -> Result<String> {
        match &self.body_file {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read issue body from {}", path.display())),
            None => Ok(self.body.clone().unwrap_or_default()),
        }
    }
}
