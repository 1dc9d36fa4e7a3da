use wordhoard_core::sync::validate_user_id;

use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;

    match command {
        AuthCommands::Login {
            profile,
            user_id,
            email,
            display_name,
        } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            login(&mut config, &profile_name, &user_id, &email, display_name)?;
            config.save().map_err(CliError::Config)?;
            println!("Signed in profile '{profile_name}' as {}", email.trim());
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let Some(profile) = config.profile(&profile_name) else {
                println!("Profile '{profile_name}' is not configured.");
                return Ok(());
            };
            match profile.identity() {
                Some(identity) => {
                    println!("Profile '{profile_name}' is signed in.");
                    println!("User ID: {}", identity.user_id);
                    println!("Email: {}", identity.email);
                    if let Some(name) = &identity.display_name {
                        println!("Display name: {name}");
                    }
                    println!(
                        "Sync: {}",
                        if profile.can_sync { "enabled" } else { "not entitled" }
                    );
                }
                None => println!("Profile '{profile_name}' is not signed in."),
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            if let Some(profile) = config.profiles.get_mut(&profile_name) {
                profile.clear_identity();
                config.save().map_err(CliError::Config)?;
            }
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}

/// Store an identity in the named profile, creating the profile if needed.
pub fn login(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    user_id: &str,
    email: &str,
    display_name: Option<String>,
) -> Result<(), CliError> {
    let user_id = validate_user_id(user_id.trim())?;
    let email = email.trim();
    if email.is_empty() {
        return Err(CliError::Config("email must not be empty".to_string()));
    }

    let profile = config.profile_mut_or_default(profile_name);
    profile.user_id = Some(user_id.to_string());
    profile.email = Some(email.to_string());
    profile.display_name = wordhoard_core::util::normalize_text_option(display_name);
    Ok(())
}
