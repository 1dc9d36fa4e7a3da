use std::path::PathBuf;

use wordhoard_core::config::SyncConfigOverrides;

use crate::cli::ConfigCommands;
use crate::commands::common::ProfileContext;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Values given to `config init`; unset fields keep what the profile had.
#[derive(Debug, Clone, Default)]
pub struct ConfigInitOptions {
    pub remote_path: Option<PathBuf>,
    pub can_sync: Option<bool>,
    pub sync: SyncConfigOverrides,
    pub no_activate: bool,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            remote_path,
            can_sync,
            batch_size,
            max_attempts,
            retry_delay_ms,
            infer_shared_deletions,
            no_activate,
        } => {
            let options = ConfigInitOptions {
                remote_path,
                can_sync,
                sync: SyncConfigOverrides {
                    batch_size,
                    max_attempts,
                    retry_delay_ms,
                    infer_shared_deletions,
                },
                no_activate,
            };
            run_config_init(profile.as_deref().or(global_profile), options)
        }
        ConfigCommands::Show { profile } => {
            let context = ProfileContext::load(profile.as_deref().or(global_profile))?;
            println!("profile: {}", context.name);
            println!("{}", serde_json::to_string_pretty(&context.profile)?);
            let remote = context.profile.remote_path().map_err(CliError::Config)?;
            println!("remote store: {}", remote.display());
            Ok(())
        }
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    options: ConfigInitOptions,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = apply_config_init(&mut config, profile_name, options)?;

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let has_identity = config
        .profile(&profile_name)
        .and_then(crate::config_profiles::CliProfile::identity)
        .is_some();
    if !has_identity {
        println!(
            "Run `wordhoard auth login --profile {profile_name} --user-id <id> --email <email>` to enable sync."
        );
    }
    Ok(())
}

/// Merge `options` into the named profile; returns the resolved profile name.
///
/// The resulting sync settings are validated before anything changes.
pub fn apply_config_init(
    config: &mut CliProfilesConfig,
    profile_name: Option<&str>,
    options: ConfigInitOptions,
) -> Result<String, CliError> {
    let profile_name = config.resolve_profile_name(profile_name);
    let mut profile = config.profile(&profile_name).cloned().unwrap_or_default();

    if let Some(path) = options.remote_path {
        profile.remote_path = Some(path);
    }
    if let Some(can_sync) = options.can_sync {
        profile.can_sync = can_sync;
    }
    let sync = &mut profile.sync;
    sync.batch_size = options.sync.batch_size.or(sync.batch_size);
    sync.max_attempts = options.sync.max_attempts.or(sync.max_attempts);
    sync.retry_delay_ms = options.sync.retry_delay_ms.or(sync.retry_delay_ms);
    sync.infer_shared_deletions = options
        .sync
        .infer_shared_deletions
        .or(sync.infer_shared_deletions);
    profile.sync_config().map_err(CliError::Config)?;

    *config.profile_mut_or_default(&profile_name) = profile;
    if !options.no_activate {
        config.active_profile = Some(profile_name.clone());
    }
    Ok(profile_name)
}
