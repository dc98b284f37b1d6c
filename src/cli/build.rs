use crate::infra::Settings;
use crate::services::Fixtures;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub fn build(mut settings: Settings, images_root: Option<PathBuf>) -> Result<()> {
    if let Some(root) = images_root {
        settings.images_root = root;
    }

    let root = settings.images_root.clone();
    Fixtures::with_docker(settings)
        .prepare()
        .with_context(|| format!("building images under {:?}", root))
}
