//! Predefined device templates.
//!
//! Each template yields a [`DeviceProfile`] pre-configured with the prompt
//! terminators, login markers and mode commands of one device family.

use crate::device::DeviceProfile;
use crate::error::ConnectError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Built-in template names supported by this crate.
pub const BUILTIN_TEMPLATES: &[&str] = &["dell_powerconnect", "dell_force10", "cisco_ios"];

/// Capability tags used to describe template behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCapability {
    NoneAuth,
    InteractiveLogin,
    EnableMode,
    ConfigMode,
    PagingControl,
}

/// Metadata for a built-in device template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TemplateMetadata {
    pub name: String,
    pub vendor: String,
    pub family: String,
    pub capabilities: Vec<TemplateCapability>,
}

fn metadata_for(name: &str) -> Option<TemplateMetadata> {
    let meta = match name {
        "dell_powerconnect" => TemplateMetadata {
            name: "dell_powerconnect".to_string(),
            vendor: "Dell".to_string(),
            family: "PowerConnect".to_string(),
            capabilities: vec![
                TemplateCapability::NoneAuth,
                TemplateCapability::InteractiveLogin,
                TemplateCapability::EnableMode,
                TemplateCapability::ConfigMode,
                TemplateCapability::PagingControl,
            ],
        },
        "dell_force10" => TemplateMetadata {
            name: "dell_force10".to_string(),
            vendor: "Dell".to_string(),
            family: "Force10 FTOS".to_string(),
            capabilities: vec![
                TemplateCapability::EnableMode,
                TemplateCapability::ConfigMode,
                TemplateCapability::PagingControl,
            ],
        },
        "cisco_ios" => TemplateMetadata {
            name: "cisco_ios".to_string(),
            vendor: "Cisco".to_string(),
            family: "IOS/IOS-XE".to_string(),
            capabilities: vec![
                TemplateCapability::EnableMode,
                TemplateCapability::ConfigMode,
                TemplateCapability::PagingControl,
            ],
        },
        _ => return None,
    };
    Some(meta)
}

fn profile_for(name: &str) -> Option<DeviceProfile> {
    let profile = match name {
        // Some PowerConnect firmware accepts SSH `none` auth and then asks for
        // credentials inside the shell.
        "dell_powerconnect" => DeviceProfile {
            name: "dell_powerconnect".to_string(),
            pri_prompt_terminator: '>',
            alt_prompt_terminator: '#',
            paging_disable_command: "terminal datadump".to_string(),
            enable_command: "enable".to_string(),
            enable_password_pattern: r"(?i)ssword".to_string(),
            config_command: "config".to_string(),
            exit_config_command: "end".to_string(),
            config_mode_check: "(config)#".to_string(),
            username_marker: "User Name:".to_string(),
            password_marker: "Password:".to_string(),
            username_required: true,
            try_none_auth: true,
            interactive_login: true,
        },
        "dell_force10" => DeviceProfile {
            name: "dell_force10".to_string(),
            pri_prompt_terminator: '>',
            alt_prompt_terminator: '#',
            paging_disable_command: "terminal length 0".to_string(),
            enable_command: "enable".to_string(),
            enable_password_pattern: r"(?i)ssword".to_string(),
            config_command: "configure".to_string(),
            exit_config_command: "end".to_string(),
            config_mode_check: "(conf)#".to_string(),
            username_marker: "Login:".to_string(),
            password_marker: "Password:".to_string(),
            username_required: true,
            try_none_auth: false,
            interactive_login: false,
        },
        "cisco_ios" => DeviceProfile {
            name: "cisco_ios".to_string(),
            pri_prompt_terminator: '>',
            alt_prompt_terminator: '#',
            paging_disable_command: "terminal length 0".to_string(),
            enable_command: "enable".to_string(),
            enable_password_pattern: r"(?i)ssword".to_string(),
            config_command: "configure terminal".to_string(),
            exit_config_command: "end".to_string(),
            config_mode_check: ")#".to_string(),
            username_marker: "Username:".to_string(),
            password_marker: "Password:".to_string(),
            username_required: true,
            try_none_auth: false,
            interactive_login: false,
        },
        _ => return None,
    };
    Some(profile)
}

/// Returns names of all built-in templates.
pub fn available_templates() -> &'static [&'static str] {
    BUILTIN_TEMPLATES
}

/// Returns metadata for all built-in templates.
pub fn template_catalog() -> Vec<TemplateMetadata> {
    BUILTIN_TEMPLATES
        .iter()
        .filter_map(|name| metadata_for(name))
        .collect()
}

/// Returns metadata for one template by name (case-insensitive).
pub fn template_metadata(name: &str) -> Result<TemplateMetadata, ConnectError> {
    let key = name.to_ascii_lowercase();
    metadata_for(&key).ok_or_else(|| ConnectError::TemplateNotFound(name.to_string()))
}

/// Builds the device profile for a template (case-insensitive).
pub fn profile(name: &str) -> Result<DeviceProfile, ConnectError> {
    let key = name.to_ascii_lowercase();
    profile_for(&key).ok_or_else(|| ConnectError::TemplateNotFound(name.to_string()))
}

/// Dell PowerConnect switches.
pub fn dell_powerconnect() -> Result<DeviceProfile, ConnectError> {
    profile("dell_powerconnect")
}

/// Dell Force10 switches running FTOS.
pub fn dell_force10() -> Result<DeviceProfile, ConnectError> {
    profile("dell_force10")
}

/// Cisco IOS and IOS-XE devices.
pub fn cisco_ios() -> Result<DeviceProfile, ConnectError> {
    profile("cisco_ios")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_template_has_metadata_and_valid_profile() {
        for name in available_templates() {
            let meta = template_metadata(name).expect("metadata");
            assert_eq!(meta.name, *name);
            let profile = profile(name).expect("profile");
            assert_eq!(profile.name, *name);
            profile.validate().expect("valid profile");
        }
        assert_eq!(template_catalog().len(), BUILTIN_TEMPLATES.len());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let profile = profile("Dell_PowerConnect").expect("profile");
        assert_eq!(profile.paging_disable_command, "terminal datadump");
        assert_eq!(profile.config_mode_check, "(config)#");
    }

    #[test]
    fn powerconnect_uses_none_auth_and_interactive_login() {
        let profile = dell_powerconnect().expect("profile");
        assert!(profile.try_none_auth);
        assert!(profile.interactive_login);
        assert_eq!(profile.username_marker, "User Name:");
        assert_eq!(profile.password_marker, "Password:");

        let meta = template_metadata("dell_powerconnect").expect("metadata");
        assert!(meta.capabilities.contains(&TemplateCapability::NoneAuth));
    }

    #[test]
    fn other_families_authenticate_in_transport() {
        assert!(!cisco_ios().expect("cisco").try_none_auth);
        assert!(!dell_force10().expect("force10").interactive_login);
    }

    #[test]
    fn unknown_template_returns_error() {
        assert!(matches!(
            profile("unknown"),
            Err(ConnectError::TemplateNotFound(_))
        ));
        assert!(matches!(
            template_metadata("unknown"),
            Err(ConnectError::TemplateNotFound(_))
        ));
    }
}
