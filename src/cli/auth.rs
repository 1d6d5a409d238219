//! Sign-in, registration, account activation and expired-session handling.

use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use regex::Regex;
use std::io::{self, IsTerminal};
use tracing::{info, warn};

use super::args::{LoginCliArgs, RegisterCliArgs, VerifyCliArgs};
use super::{spinner, CliContext};

/// Activation codes mailed by the backend are this many digits.
const OTP_LENGTH: usize = 5;
const MIN_PASSWORD_LENGTH: usize = 6;
const MIN_NAME_LENGTH: usize = 2;

pub async fn handle_login_command(args: LoginCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    let theme = ColorfulTheme::default();

    if !io::stdin().is_terminal() {
        bail!("Login needs an interactive terminal");
    }

    let email = text_or_prompt(&theme, "Email", args.email)?;

    let password = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;

    let pb = spinner("Signing in...");
    let result = ctx.client().sign_in(&email, &password).await;
    pb.finish_and_clear();

    let credentials = match result {
        Err(e) if e.is_inactive_account() => {
            println!("This account has not been activated yet.");
            activate(&ctx, &theme, &email).await?;

            let pb = spinner("Signing in...");
            let retry = ctx.client().sign_in(&email, &password).await;
            pb.finish_and_clear();
            retry.context("Sign-in failed")?
        }
        other => other.context("Sign-in failed")?,
    };
    if !credentials.is_authenticated() {
        bail!("Backend did not return a usable session");
    }

    ctx.auth.save(&credentials)?;

    let name = credentials
        .user_info
        .as_ref()
        .map(|u| if u.name.is_empty() { u.email.as_str() } else { u.name.as_str() })
        .unwrap_or(email.as_str());
    println!("Signed in as {}.", name);
    Ok(())
}

pub async fn handle_register_command(args: RegisterCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    let theme = ColorfulTheme::default();

    if !io::stdin().is_terminal() {
        bail!("Registration needs an interactive terminal");
    }

    let name = text_or_prompt(&theme, "Name", args.name)?;
    let email = text_or_prompt(&theme, "Email", args.email)?;
    let password = Password::with_theme(&theme)
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;

    validate_registration(&name, &email, &password)?;

    let pb = spinner("Creating account...");
    let result = ctx.client().sign_up(&name, &email, &password).await;
    pb.finish_and_clear();
    result.context("Registration failed")?;

    println!("Account created. An activation code was sent to {}.", email);
    activate(&ctx, &theme, &email).await?;
    println!("Account activated. Run `meetcap login` to sign in.");
    Ok(())
}

pub async fn handle_verify_command(args: VerifyCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    let theme = ColorfulTheme::default();

    if !io::stdin().is_terminal() {
        bail!("Verification needs an interactive terminal");
    }

    let email = text_or_prompt(&theme, "Email", args.email)?;

    if args.resend {
        let pb = spinner("Requesting a new code...");
        let result = ctx.client().resend_otp(&email).await;
        pb.finish_and_clear();
        result.context("Could not resend the activation code")?;
        println!("A new activation code was sent to {}.", email);
    }

    activate(&ctx, &theme, &email).await?;
    println!("Account activated. Run `meetcap login` to sign in.");
    Ok(())
}

pub fn handle_logout_command() -> Result<()> {
    let ctx = CliContext::load()?;
    if !ctx.credentials.is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    ctx.auth.clear()?;
    println!("Logged out.");
    Ok(())
}

/// Called when the backend rejected the stored token. Offers to drop the
/// stale credentials; `assume_yes` skips the prompt.
pub fn handle_session_expired(assume_yes: bool) -> Result<()> {
    eprintln!("Your session has expired. Please log in again.");

    let clear = if assume_yes {
        true
    } else if io::stdin().is_terminal() {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Log out now?")
            .default(true)
            .interact()?
    } else {
        warn!("Non-interactive session, keeping stored credentials");
        false
    };

    if clear {
        let ctx = CliContext::load()?;
        ctx.auth.clear()?;
        info!("Cleared expired credentials");
        eprintln!("Logged out. Run `meetcap login` to sign in again.");
    }
    Ok(())
}

/// Prompt for the emailed code and submit it.
async fn activate(ctx: &CliContext, theme: &ColorfulTheme, email: &str) -> Result<()> {
    let code = Input::<String>::with_theme(theme)
        .with_prompt(format!("Activation code sent to {}", email))
        .validate_with(|input: &String| -> Result<(), String> {
            validate_otp(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;
    let code = validate_otp(&code)?;

    let pb = spinner("Activating account...");
    let result = ctx.client().activate_account(email, &code).await;
    pb.finish_and_clear();
    result.context("Activation failed")?;
    Ok(())
}

fn text_or_prompt(theme: &ColorfulTheme, prompt: &str, given: Option<String>) -> Result<String> {
    let value = match given {
        Some(value) => value,
        None => Input::<String>::with_theme(theme)
            .with_prompt(prompt)
            .interact_text()?,
    };
    let value = value.trim().to_string();
    if value.is_empty() {
        bail!("{} cannot be empty", prompt);
    }
    Ok(value)
}

pub(crate) fn validate_otp(raw: &str) -> Result<String> {
    let code = raw.trim();
    if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        bail!("The activation code must be {} digits", OTP_LENGTH);
    }
    Ok(code.to_string())
}

pub(crate) fn validate_registration(name: &str, email: &str, password: &str) -> Result<()> {
    if name.trim().chars().count() < MIN_NAME_LENGTH {
        bail!("Name must be at least {} characters", MIN_NAME_LENGTH);
    }
    let email_pattern = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")?;
    if !email_pattern.is_match(email) {
        bail!("'{}' is not a valid email address", email);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        bail!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        );
    }
    Ok(())
}
