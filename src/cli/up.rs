use super::describe_connection;
use crate::domain::Scope;
use crate::infra::Settings;
use crate::services::Fixtures;
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::info;

/// Provisions one target, prints how to reach it and keeps it until Enter is pressed
pub fn up(settings: Settings, host_spec: &str, dir: Option<PathBuf>) -> Result<()> {
    let (_scratch, dir) = match dir {
        Some(dir) => {
            fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
            (None, dir)
        }
        None => {
            let tmp = TempDir::new().context("creating scratch directory")?;
            let path = tmp.path().to_path_buf();
            (Some(tmp), path)
        }
    };

    let fixtures = Fixtures::with_docker(settings);
    let session = fixtures.scope(Scope::Session);

    let conn = fixtures
        .connect(host_spec, session.id(), &dir)
        .with_context(|| format!("connecting to {host_spec}"))?;

    print!("{}", describe_connection(&conn));
    println!("press Enter to tear the target down");

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    info!("tearing down {}", conn.target.id);
    Ok(())
}
