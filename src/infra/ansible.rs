use crate::domain::{CommandRunner, InventorySchema};
use tracing::{debug, info};

/// Detects the installed ansible and picks the matching inventory schema.
///
/// Returns `None` when ansible is missing or its version cannot be read.
pub fn detect_inventory_schema(runner: &dyn CommandRunner) -> Option<InventorySchema> {
    let out = match runner.run("ansible", &["--version"]) {
        Ok(out) if out.success() => out,
        Ok(out) => {
            debug!("ansible --version exited with {}", out.status);
            return None;
        }
        Err(e) => {
            debug!("ansible not available: {e}");
            return None;
        }
    };

    let major = parse_major_version(&out.stdout)?;
    info!("detected ansible major version {major}");
    Some(InventorySchema::from_major(major))
}

/// First integer found on the first line, e.g. `ansible [core 2.15.1]` -> 2
pub fn parse_major_version(version_output: &str) -> Option<u32> {
    let first = version_output.lines().next()?;
    first
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|token| !token.is_empty())
        .find_map(|token| token.split('.').next()?.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockCommandRunner;

    #[test]
    fn test_parse_major_version() {
        assert_eq!(parse_major_version("ansible 1.9.6\n  configured module"), Some(1));
        assert_eq!(parse_major_version("ansible 2.9.27\n"), Some(2));
        assert_eq!(parse_major_version("ansible [core 2.15.1]\n"), Some(2));
        assert_eq!(parse_major_version("ansible\n"), None);
        assert_eq!(parse_major_version(""), None);
    }

    #[test]
    fn test_detect_schema() {
        let runner = MockCommandRunner::new();
        runner.respond("ansible --version", 0, "ansible 1.9.4\n");
        assert_eq!(detect_inventory_schema(&runner), Some(InventorySchema::V1));

        runner.respond("ansible --version", 0, "ansible [core 2.16.3]\n");
        assert_eq!(detect_inventory_schema(&runner), Some(InventorySchema::V2));
    }

    #[test]
    fn test_detect_missing_ansible() {
        let runner = MockCommandRunner::new();
        runner.respond("ansible --version", 127, "");
        assert_eq!(detect_inventory_schema(&runner), None);
    }
}
