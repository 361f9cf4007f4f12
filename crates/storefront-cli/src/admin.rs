//! Operator command handlers. Each one runs against an already connected pool.

use std::path::Path;

use anyhow::Context;
use sqlx::PgPool;

/// Apply pending migrations and report how many ran.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub(crate) async fn run_migrate(pool: &PgPool) -> anyhow::Result<()> {
    let applied = storefront_db::run_migrations(pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!(applied, "migrations complete");
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Upsert every template in `path` into `email_templates`.
///
/// The file is validated before anything is written, so a bad file leaves the
/// table untouched. Templates not named in the file are left as they are.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or a write fails.
pub(crate) async fn run_seed_templates(pool: &PgPool, path: &Path) -> anyhow::Result<()> {
    let file = storefront_core::load_templates(path)
        .with_context(|| format!("failed to load templates from {}", path.display()))?;

    for template in &file.templates {
        storefront_db::upsert_email_template(pool, &template.key, &template.subject, &template.body)
            .await
            .with_context(|| format!("failed to save template {}", template.key))?;
        tracing::debug!(key = %template.key, "template saved");
    }

    println!(
        "seeded {} template(s) from {}",
        file.templates.len(),
        path.display()
    );
    Ok(())
}

/// Set `role = admin` on the profile with `email`.
///
/// # Errors
///
/// Returns an error if no profile uses that email or the update fails.
pub(crate) async fn run_grant_admin(pool: &PgPool, email: &str) -> anyhow::Result<()> {
    let email = email.trim();
    let granted = storefront_db::grant_admin_by_email(pool, email)
        .await
        .context("failed to update profile")?;
    if !granted {
        anyhow::bail!("no profile registered with email {email}; the user must sign in first");
    }

    tracing::info!(email, "admin role granted");
    println!("{email} is now an admin");
    Ok(())
}
