//! Notification emails sent as a side effect of admin decisions.
//!
//! Sending is best-effort: every failure is logged and swallowed, so the
//! request that triggered the email succeeds regardless.

use std::collections::HashMap;

use storefront_core::render;

use crate::api::AppState;

/// The email templates the server knows how to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKey {
    UpgradeApproved,
    UpgradeRejected,
    TopupApproved,
    OrderItemArrived,
}

impl TemplateKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKey::UpgradeApproved => "upgrade_approved",
            TemplateKey::UpgradeRejected => "upgrade_rejected",
            TemplateKey::TopupApproved => "topup_approved",
            TemplateKey::OrderItemArrived => "order_item_arrived",
        }
    }
}

/// Build the placeholder map for [`send`].
pub fn vars<const N: usize>(pairs: [(&'static str, String); N]) -> HashMap<&'static str, String> {
    pairs.into_iter().collect()
}

/// Render the stored template for `key` and email it to `to`.
///
/// Makes at most one request to the mail API.
pub async fn send(state: &AppState, key: TemplateKey, to: &str, vars: &HashMap<&str, String>) {
    let Some(mailer) = state.mailer.as_deref() else {
        tracing::warn!(template = key.as_str(), "mail API not configured; notification skipped");
        return;
    };

    let template = match storefront_db::get_email_template(&state.pool, key.as_str()).await {
        Ok(Some(template)) => template,
        Ok(None) => {
            tracing::warn!(template = key.as_str(), "email template missing; notification skipped");
            return;
        }
        Err(e) => {
            tracing::warn!(template = key.as_str(), error = %e, "email template lookup failed");
            return;
        }
    };

    let subject = render(&template.subject, vars);
    let html = render(&template.body, vars);
    match mailer.send(to, &subject, &html).await {
        Ok(()) => tracing::info!(template = key.as_str(), "notification email sent"),
        Err(e) => {
            tracing::warn!(template = key.as_str(), error = %e, "notification email failed");
        }
    }
}
