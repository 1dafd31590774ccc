use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use drm_playready::{ChallengeOptions, Device};

use crate::error::{EmeError, EmeResult};

/**
    Device selection settings.

    ```yaml
    default_device: desktop
    client_version: 10.0.16384.10011
    scopes:
      example.com: tv
    ```
*/
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Device used when no scope mapping applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_device: Option<String>,

    /// Scope (usually a page origin) to device name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scopes: BTreeMap<String, String>,

    /// Overrides the announced client version in challenges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
}

impl Profile {
    pub fn from_yaml(text: &str) -> EmeResult<Self> {
        serde_yaml::from_str(text).map_err(|e| EmeError::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> EmeResult<String> {
        serde_yaml::to_string(self).map_err(|e| EmeError::Config(e.to_string()))
    }

    /**
        Name of the device for `scope`: the scope mapping first, then the
        default device.
    */
    pub fn device_for(&self, scope: &str) -> Option<&str> {
        self.scopes
            .get(scope)
            .or(self.default_device.as_ref())
            .map(String::as_str)
    }

    pub fn challenge_options(&self) -> ChallengeOptions {
        let mut options = ChallengeOptions::default();
        if let Some(version) = &self.client_version {
            options.client_version = version.clone();
        }
        options
    }
}

/**
    Chooses the device that answers for a scope.
*/
pub trait DeviceSelector: Send + Sync {
    fn select(&self, scope: &str) -> EmeResult<Arc<Device>>;
}

/**
    Named devices plus the profile that maps scopes onto them.
*/
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, Arc<Device>>,
    profile: Profile,
}

impl DeviceRegistry {
    pub fn new(profile: Profile) -> Self {
        Self {
            devices: BTreeMap::new(),
            profile,
        }
    }

    /**
        Register a device under `name`, replacing any previous one.
    */
    pub fn insert(&mut self, name: impl Into<String>, device: impl Into<Arc<Device>>) {
        self.devices.insert(name.into(), device.into());
    }

    pub fn with_device(mut self, name: impl Into<String>, device: impl Into<Arc<Device>>) -> Self {
        self.insert(name, device);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Device>> {
        self.devices.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }
}

impl DeviceSelector for DeviceRegistry {
    fn select(&self, scope: &str) -> EmeResult<Arc<Device>> {
        let Some(name) = self.profile.device_for(scope) else {
            return Err(EmeError::NoDeviceSelected(scope.to_string()));
        };
        match self.devices.get(name) {
            Some(device) => Ok(Arc::clone(device)),
            None => {
                warn!(scope, device = name, "profile names an unregistered device");
                Err(EmeError::NoDeviceSelected(scope.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = "\
default_device: desktop
client_version: 1.2.3.4
scopes:
  tv.example.com: tv
  broken.example.com: missing
";

    fn registry() -> (DeviceRegistry, Arc<Device>, Arc<Device>) {
        let desktop = Arc::new(Device::generate(b"desktop".to_vec()));
        let tv = Arc::new(Device::generate(b"tv".to_vec()));
        let registry = DeviceRegistry::new(Profile::from_yaml(PROFILE).unwrap())
            .with_device("desktop", Arc::clone(&desktop))
            .with_device("tv", Arc::clone(&tv));
        (registry, desktop, tv)
    }

    #[test]
    fn scope_mapping_wins_over_default() {
        let (registry, desktop, tv) = registry();
        assert!(Arc::ptr_eq(&registry.select("tv.example.com").unwrap(), &tv));
        assert!(Arc::ptr_eq(&registry.select("other.example.com").unwrap(), &desktop));
    }

    #[test]
    fn no_selection_without_default() {
        let registry = DeviceRegistry::new(Profile::default())
            .with_device("desktop", Device::generate(b"desktop".to_vec()));
        let err = registry.select("example.com").unwrap_err();
        assert!(matches!(err, EmeError::NoDeviceSelected(scope) if scope == "example.com"));
    }

    #[test]
    fn unregistered_device_is_no_selection() {
        let (registry, _, _) = registry();
        assert!(matches!(
            registry.select("broken.example.com"),
            Err(EmeError::NoDeviceSelected(_))
        ));
    }

    #[test]
    fn profile_yaml_round_trip() {
        let profile = Profile::from_yaml(PROFILE).unwrap();
        assert_eq!(profile.default_device.as_deref(), Some("desktop"));
        assert_eq!(profile.scopes.len(), 2);
        let again = Profile::from_yaml(&profile.to_yaml().unwrap()).unwrap();
        assert_eq!(again, profile);
    }

    #[test]
    fn empty_profile_parses() {
        let profile = Profile::from_yaml("{}").unwrap();
        assert_eq!(profile, Profile::default());
        assert_eq!(profile.device_for("anything"), None);
    }

    #[test]
    fn challenge_options_follow_profile() {
        let profile = Profile::from_yaml(PROFILE).unwrap();
        assert_eq!(profile.challenge_options().client_version, "1.2.3.4");
        assert_eq!(
            Profile::default().challenge_options().client_version,
            ChallengeOptions::default().client_version
        );
    }

    #[test]
    fn invalid_yaml_is_config_error() {
        assert!(matches!(
            Profile::from_yaml("scopes: [1, 2"),
            Err(EmeError::Config(_))
        ));
    }
}
