//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! PARISH_PASSWORD=... parish login -e priest@example.com
//! parish whoami
//! parish register -n "Marie Ngono" -e marie@example.com
//! parish logout
//! ```

use clap::Args;
use secrecy::SecretString;

use super::{CommandError, Context, print_json, print_line};

#[derive(Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(short, long)]
    email: String,

    /// Account password
    #[arg(long, env = "PARISH_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Full name
    #[arg(short, long)]
    name: String,

    /// Email address
    #[arg(short, long)]
    email: String,

    /// Password (at least 8 characters)
    #[arg(long, env = "PARISH_PASSWORD", hide_env_values = true)]
    password: String,

    /// Password confirmation
    #[arg(long, env = "PARISH_PASSWORD_CONFIRM", hide_env_values = true)]
    confirm_password: String,

    /// Phone number
    #[arg(long)]
    phone: Option<String>,
}

pub async fn login(ctx: &Context, args: LoginArgs) -> Result<(), CommandError> {
    let password = SecretString::from(args.password);
    let user = ctx.auth().login(&args.email, &password).await?;
    print_line(&format!("Signed in as {} ({})", user.name, user.role));
    Ok(())
}

pub async fn logout(ctx: &Context) -> Result<(), CommandError> {
    ctx.auth().logout().await?;
    print_line("Signed out");
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<(), CommandError> {
    match ctx.auth().current_session() {
        Some(user) => print_json(&user),
        None => {
            print_line("Not signed in");
            Ok(())
        }
    }
}

pub async fn register(ctx: &Context, args: RegisterArgs) -> Result<(), CommandError> {
    let form = parish_client::RegisterForm {
        name: args.name,
        email: args.email,
        password: SecretString::from(args.password),
        confirm_password: SecretString::from(args.confirm_password),
        phone: args.phone,
    };
    let registration = ctx.auth().register(&form).await?;
    print_line(&registration.message);
    if let Some(user) = registration.session {
        print_line(&format!("Signed in as {} ({})", user.name, user.role));
    }
    Ok(())
}
