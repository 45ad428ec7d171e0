/// Minimal HTML escaping for user-supplied names and titles.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(app_name: &str, heading: &str, body: &str, action: Option<(&str, &str)>) -> String {
    let button = action
        .map(|(label, url)| {
            format!(
                r#"<p><a href="{url}" style="display: inline-block; padding: 10px 20px; background: #1a7f5a; color: white; text-decoration: none; border-radius: 4px;">{label}</a></p>"#
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>{heading}</h2>
    {body}
    {button}
    <p style="color: #666; font-size: 14px;">This message was sent by {app_name}.</p>
</body>
</html>"#
    )
}

pub fn render_verification(app_name: &str, name: &str, verify_url: &str) -> String {
    layout(
        app_name,
        "Verify your email address",
        &format!(
            "<p>Hi {},</p><p>Thanks for joining {app_name}. Please confirm your email address.</p>",
            escape(name)
        ),
        Some(("Verify Email", verify_url)),
    )
}

pub fn render_password_reset(app_name: &str, name: &str, reset_url: &str) -> String {
    layout(
        app_name,
        "Password Reset",
        &format!(
            "<p>Hi {},</p><p>A password reset was requested for your {app_name} account. \
             This link expires in 24 hours. If you didn't request this, you can ignore it.</p>",
            escape(name)
        ),
        Some(("Reset Password", reset_url)),
    )
}

pub fn render_offer_received(
    app_name: &str,
    developer_name: &str,
    investor_name: &str,
    project_title: &str,
    amount: &str,
    url: &str,
) -> String {
    layout(
        app_name,
        "New Investment Offer",
        &format!(
            "<p>Hi {},</p><p><strong>{}</strong> has offered <strong>{amount}</strong> for \
             <strong>{}</strong>. The offer is open for 30 days.</p>",
            escape(developer_name),
            escape(investor_name),
            escape(project_title)
        ),
        Some(("Review Offer", url)),
    )
}

pub fn render_offer_response(
    app_name: &str,
    investor_name: &str,
    project_title: &str,
    accepted: bool,
    notes: Option<&str>,
    url: &str,
) -> String {
    let outcome = if accepted { "accepted" } else { "rejected" };
    let next = if accepted {
        "<p>A SAFE term sheet has been prepared for both parties to sign.</p>"
    } else {
        ""
    };
    let notes = notes
        .filter(|n| !n.trim().is_empty())
        .map(|n| format!("<p>Developer notes: {}</p>", escape(n)))
        .unwrap_or_default();
    layout(
        app_name,
        &format!("Your offer was {outcome}"),
        &format!(
            "<p>Hi {},</p><p>Your offer for <strong>{}</strong> has been {outcome}.</p>{notes}{next}",
            escape(investor_name),
            escape(project_title)
        ),
        Some(("View Offer", url)),
    )
}

pub fn render_project_review(
    app_name: &str,
    developer_name: &str,
    project_title: &str,
    approved: bool,
    reason: Option<&str>,
    url: &str,
) -> String {
    let body = if approved {
        format!(
            "<p>Hi {},</p><p><strong>{}</strong> is now live on {app_name}.</p>",
            escape(developer_name),
            escape(project_title)
        )
    } else {
        format!(
            "<p>Hi {},</p><p><strong>{}</strong> was not approved.</p><p>Reason: {}</p>\
             <p>You can edit the listing and submit it again.</p>",
            escape(developer_name),
            escape(project_title),
            escape(reason.unwrap_or(""))
        )
    };
    let heading = if approved {
        "Your project has been approved"
    } else {
        "Your project has been rejected"
    };
    layout(app_name, heading, &body, Some(("Open Project", url)))
}

pub fn render_term_sheet_signed(
    app_name: &str,
    name: &str,
    project_title: &str,
    signer: &str,
    url: &str,
) -> String {
    layout(
        app_name,
        "Term sheet signed",
        &format!(
            "<p>Hi {},</p><p>The {signer} has signed the SAFE for <strong>{}</strong>. \
             It is waiting for your signature.</p>",
            escape(name),
            escape(project_title)
        ),
        Some(("Review and Sign", url)),
    )
}

pub fn render_term_sheet_completed(
    app_name: &str,
    name: &str,
    project_title: &str,
    url: &str,
) -> String {
    layout(
        app_name,
        "SAFE Agreement Completed",
        &format!(
            "<p>Hi {},</p><p>Both parties have signed the SAFE for <strong>{}</strong>. \
             The executed agreement is available for download.</p>",
            escape(name),
            escape(project_title)
        ),
        Some(("Download SAFE", url)),
    )
}
