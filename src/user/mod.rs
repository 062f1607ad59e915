use anyhow::{bail, Result};
use clap::Args;
use tracing::Instrument;

use crate::config::ConfigFile;
use crate::store::{Store, StoreError};
use crate::telemetry::{self};
use crate::telemetry::ops::user::Phase as UserPhase;

pub mod types;

/// gator register <name>
#[derive(Args, Debug)]
pub struct RegisterCmd {
    pub name: String,
}

/// gator login <name>
#[derive(Args, Debug)]
pub struct LoginCmd {
    pub name: String,
}

/// gator reset (plan-only by default; use --apply to delete)
#[derive(Args, Debug)]
pub struct ResetCmd {
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

pub async fn register<S: Store>(store: &S, cfg: &mut ConfigFile, args: RegisterCmd) -> Result<()> {
    let log = telemetry::user();
    let _g = log.root_span_kv([("name", args.name.clone())]).entered();
    let name = args.name.trim();
    if name.is_empty() { bail!("user name must not be empty"); }

    let user = match store.create_user(name).instrument(log.span(&UserPhase::Register)).await {
        Ok(u) => u,
        Err(StoreError::AlreadyExists { .. }) => bail!("user {name:?} already exists"),
        Err(e) => return Err(e.into()),
    };
    cfg.set_current_user(&user.name)?;
    log.info(format!("👤 Registered {} and set as current user", user.name));
    if telemetry::config::json_mode() {
        log.result(&types::CurrentUser { user: &user, config: cfg.path().display().to_string() })?;
    }
    Ok(())
}

pub async fn login<S: Store>(store: &S, cfg: &mut ConfigFile, args: LoginCmd) -> Result<()> {
    let log = telemetry::user();
    let _g = log.root_span_kv([("name", args.name.clone())]).entered();
    let Some(user) = store.get_user_by_name(&args.name).instrument(log.span(&UserPhase::Login)).await? else {
        bail!("user {:?} is not registered", args.name);
    };
    cfg.set_current_user(&user.name)?;
    log.info(format!("👤 Current user set to {}", user.name));
    if telemetry::config::json_mode() {
        log.result(&types::CurrentUser { user: &user, config: cfg.path().display().to_string() })?;
    }
    Ok(())
}

pub async fn users<S: Store>(store: &S, current: Option<&str>) -> Result<()> {
    let log = telemetry::user();
    let users = store.list_users().instrument(log.span(&UserPhase::List)).await?;
    let rows: Vec<types::UserRow> = users
        .iter()
        .map(|u| types::UserRow { name: &u.name, current: Some(u.name.as_str()) == current })
        .collect();
    for r in &rows {
        if r.current { log.info(format!("* {} (current)", r.name)); } else { log.info(format!("* {}", r.name)); }
    }
    if telemetry::config::json_mode() {
        log.result(&types::UserList { users: rows })?;
    }
    Ok(())
}

pub async fn reset<S: Store>(store: &S, args: ResetCmd) -> Result<()> {
    let log = telemetry::user();
    let _g = log.root_span_kv([("mode", if args.apply { "apply".to_string() } else { "plan".to_string() })]).entered();

    if !args.apply {
        let users = store.list_users().instrument(log.span(&UserPhase::Plan)).await?;
        log.info(format!("📝 Reset plan — delete {} user(s) with their feeds, follows and posts", users.len()));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&types::ResetPlan { action: "delete-all-users", users: users.len() })?;
        }
        return Ok(());
    }

    let deleted = store.delete_all_users().instrument(log.span(&UserPhase::Reset)).await?;
    log.info(format!("🗑️  Deleted {} user(s)", deleted));
    if telemetry::config::json_mode() {
        log.result(&types::ResetResult { deleted_users: deleted })?;
    }
    Ok(())
}
