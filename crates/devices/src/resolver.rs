//! Hardware Role Resolver
//!
//! Maps enumerated video device nodes to logical roles by matching the
//! device's identity string against configured substrings.
//!
//! Resolution is deterministic: nodes are visited in ascending index order and
//! the first (lowest index) match wins per role. Running it twice against the
//! same hardware therefore yields the same mapping.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use contracts::{ContractError, ResolverConfig, SensorRole, SessionBlueprint};
use tracing::{debug, info, instrument, warn};

/// Role -> device channel index
pub type RoleMapping = BTreeMap<SensorRole, u32>;

/// An enumerated device node (e.g. `/dev/video2`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeviceNode {
    pub index: u32,
    pub path: PathBuf,
}

impl DeviceNode {
    /// Parse `/dev/videoN` style paths; returns `None` for other names.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let digits = name.strip_prefix("video")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            index: digits.parse().ok()?,
            path: path.to_path_buf(),
        })
    }
}

/// Source of device nodes and their identity strings
pub trait DeviceProbe {
    /// List device nodes
    fn enumerate(&self) -> Result<Vec<DeviceNode>, ContractError>;

    /// Descriptive identity string of one node
    fn identity(&self, node: &DeviceNode) -> Result<String, ContractError>;
}

/// Probe backed by `/dev/video*` and `udevadm info`
#[derive(Debug, Clone)]
pub struct UdevProbe {
    dev_dir: PathBuf,
}

impl Default for UdevProbe {
    fn default() -> Self {
        Self {
            dev_dir: PathBuf::from("/dev"),
        }
    }
}

impl DeviceProbe for UdevProbe {
    fn enumerate(&self) -> Result<Vec<DeviceNode>, ContractError> {
        let mut nodes = Vec::new();
        for entry in std::fs::read_dir(&self.dev_dir)? {
            let entry = entry?;
            if let Some(node) = DeviceNode::from_path(&entry.path()) {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn identity(&self, node: &DeviceNode) -> Result<String, ContractError> {
        let output = Command::new("udevadm")
            .arg("info")
            .arg("--query=all")
            .arg(format!("--name={}", node.path.display()))
            .output()?;

        if !output.status.success() {
            return Err(ContractError::Other(format!(
                "udevadm failed for {}: {}",
                node.path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Hardware Role Resolver
#[derive(Debug, Clone)]
pub struct RoleResolver {
    config: ResolverConfig,
}

impl RoleResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve roles for the devices reported by `probe`.
    ///
    /// Nodes whose identity cannot be read are skipped with a warning.
    #[instrument(name = "role_resolver_resolve", skip(self, probe))]
    pub fn resolve(&self, probe: &dyn DeviceProbe) -> Result<RoleMapping, ContractError> {
        let mut nodes = probe.enumerate()?;
        nodes.sort();

        let require = self.config.require.as_ref().map(|s| s.to_lowercase());
        let rules: Vec<(String, SensorRole)> = self
            .config
            .rules
            .iter()
            .map(|rule| (rule.pattern.to_lowercase(), rule.role))
            .collect();

        let mut mapping = RoleMapping::new();
        for node in &nodes {
            let identity = match probe.identity(node) {
                Ok(identity) => identity.to_lowercase(),
                Err(e) => {
                    warn!(device = %node.path.display(), error = %e, "cannot query device identity");
                    continue;
                }
            };

            if let Some(required) = &require {
                if !identity.contains(required.as_str()) {
                    debug!(device = %node.path.display(), "not a capture node, skipped");
                    continue;
                }
            }

            let matched = rules
                .iter()
                .find(|(pattern, _)| identity.contains(pattern.as_str()));
            if let Some((pattern, role)) = matched {
                if mapping.contains_key(role) {
                    debug!(role = %role, device = %node.path.display(), "role already resolved to a lower index");
                    continue;
                }
                info!(role = %role, channel = node.index, pattern = %pattern, "device resolved");
                mapping.insert(*role, node.index);
            }
        }

        Ok(mapping)
    }

    /// Write the mapping into the blueprint's `channel_index` fields.
    ///
    /// Roles absent from the blueprint are ignored. Returns whether any value
    /// changed, so callers only rewrite configuration when needed.
    pub fn apply(blueprint: &mut SessionBlueprint, mapping: &RoleMapping) -> bool {
        let mut changed = false;
        for (role, channel) in mapping {
            match blueprint.sensors.get_mut(role) {
                Some(sensor) if sensor.channel_index != Some(*channel) => {
                    info!(
                        role = %role,
                        from = ?sensor.channel_index,
                        to = channel,
                        "channel index updated"
                    );
                    sensor.channel_index = Some(*channel);
                    changed = true;
                }
                Some(_) => {}
                None => debug!(role = %role, "resolved role not configured, ignored"),
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigVersion, SensorConfig, SessionSettings};
    use std::collections::HashMap;

    struct FakeProbe {
        identities: HashMap<u32, Option<String>>,
    }

    impl FakeProbe {
        fn new(devices: &[(u32, Option<&str>)]) -> Self {
            Self {
                identities: devices
                    .iter()
                    .map(|(idx, id)| (*idx, id.map(str::to_string)))
                    .collect(),
            }
        }
    }

    impl DeviceProbe for FakeProbe {
        fn enumerate(&self) -> Result<Vec<DeviceNode>, ContractError> {
            // Unsorted on purpose
            Ok(self
                .identities
                .keys()
                .map(|idx| DeviceNode {
                    index: *idx,
                    path: PathBuf::from(format!("/dev/video{idx}")),
                })
                .collect())
        }

        fn identity(&self, node: &DeviceNode) -> Result<String, ContractError> {
            self.identities[&node.index]
                .clone()
                .ok_or_else(|| ContractError::Other("udevadm failed".into()))
        }
    }

    fn standard_rig() -> FakeProbe {
        FakeProbe::new(&[
            (0, Some("E: ID_V4L_CAPABILITIES=:capture:\nE: ID_MODEL=Logitech_StreamCam")),
            (1, Some("E: ID_V4L_CAPABILITIES=::\nE: ID_MODEL=Logitech_StreamCam")),
            (2, Some("E: ID_V4L_CAPABILITIES=:capture:\nE: ID_MODEL=Logitech_BRIO")),
            (3, Some("E: ID_V4L_CAPABILITIES=::\nE: ID_MODEL=Logitech_BRIO")),
            (4, None),
        ])
    }

    #[test]
    fn test_device_node_from_path() {
        let node = DeviceNode::from_path(Path::new("/dev/video12")).unwrap();
        assert_eq!(node.index, 12);
        assert!(DeviceNode::from_path(Path::new("/dev/video")).is_none());
        assert!(DeviceNode::from_path(Path::new("/dev/videox1")).is_none());
        assert!(DeviceNode::from_path(Path::new("/dev/sda")).is_none());
    }

    #[test]
    fn test_resolve_matches_case_insensitive_capture_nodes() {
        let resolver = RoleResolver::new(ResolverConfig::default());
        let mapping = resolver.resolve(&standard_rig()).unwrap();
        assert_eq!(mapping.get(&SensorRole::Rgb), Some(&0));
        assert_eq!(mapping.get(&SensorRole::HiRes), Some(&2));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = RoleResolver::new(ResolverConfig::default());
        let probe = standard_rig();
        let first = resolver.resolve(&probe).unwrap();
        let second = resolver.resolve(&probe).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_lowest_index_wins() {
        let probe = FakeProbe::new(&[
            (7, Some("capture brio")),
            (3, Some("capture BRIO")),
        ]);
        let mapping = RoleResolver::new(ResolverConfig::default())
            .resolve(&probe)
            .unwrap();
        assert_eq!(mapping.get(&SensorRole::HiRes), Some(&3));
    }

    #[test]
    fn test_apply_reports_change_once() {
        let mut sensors = std::collections::BTreeMap::new();
        sensors.insert(SensorRole::Rgb, SensorConfig::video(30.0, 1920, 1080, 60.0));
        sensors.insert(SensorRole::HiRes, SensorConfig::video(30.0, 3840, 2160, 60.0));
        let mut blueprint = SessionBlueprint {
            version: ConfigVersion::V1,
            session: SessionSettings::default(),
            sensors,
            resolver: ResolverConfig::default(),
        };

        let mapping = RoleResolver::new(ResolverConfig::default())
            .resolve(&standard_rig())
            .unwrap();

        assert!(RoleResolver::apply(&mut blueprint, &mapping));
        assert_eq!(blueprint.sensors[&SensorRole::HiRes].channel_index, Some(2));
        // Unchanged hardware: second application is a no-op
        assert!(!RoleResolver::apply(&mut blueprint, &mapping));
    }
}
