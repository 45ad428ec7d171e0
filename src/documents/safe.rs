use super::pdf::{PdfBuilder, Style};
use crate::models::{SigningParty, TermSheet, User};

/// Names printed on the SAFE. The company is the developer's company, falling
/// back to the developer's own name.
pub struct SafeParties {
    pub company_name: String,
    pub developer_name: String,
    pub investor_name: String,
    pub investor_company: String,
    pub project_title: String,
}

impl SafeParties {
    pub fn new(developer: &User, investor: &User, project_title: &str) -> Self {
        let company_name = if developer.company_name.trim().is_empty() {
            developer.full_name()
        } else {
            developer.company_name.clone()
        };
        Self {
            company_name,
            developer_name: developer.full_name(),
            investor_name: investor.full_name(),
            investor_company: investor.company_name.clone(),
            project_title: project_title.to_string(),
        }
    }
}

const KEY_TERMS: &str = "1. CONVERSION EVENTS
This SAFE will automatically convert into equity upon:
- Equity Financing: a bona fide transaction with the primary purpose of raising capital
- Liquidity Event: a change of control, IPO, or direct listing
- Dissolution Event: voluntary or involuntary termination of the Company

2. CONVERSION MECHANICS
Upon an Equity Financing, the Investor will receive the greater of:
- Shares based on the Valuation Cap price, or
- Shares based on the Discount Rate applied to the price per share

3. REPRESENTATIONS
Both parties represent they have the authority to enter into this agreement and that this investment complies with applicable securities laws.";

pub fn render(app_name: &str, sheet: &TermSheet, parties: &SafeParties) -> Result<Vec<u8>, String> {
    let mut pdf = PdfBuilder::new("SAFE")?;

    pdf.centered("SAFE", 20.0, Style::Bold);
    pdf.centered("Simple Agreement for Future Equity", 12.0, Style::Regular);
    pdf.gap(8.0);

    pdf.paragraph("PARTIES", 12.0, Style::Bold);
    pdf.columns(
        &format!("Company: {}", parties.company_name),
        &format!("Investor: {}", parties.investor_name),
        85.0,
        10.0,
        Style::Regular,
    );
    pdf.gap(6.0);

    pdf.paragraph("INVESTMENT TERMS", 12.0, Style::Bold);
    pdf.columns("Project:", &parties.project_title, 55.0, 10.0, Style::Regular);
    pdf.columns(
        "Investment Amount:",
        &format_money(sheet.investment_amount),
        55.0,
        10.0,
        Style::Regular,
    );
    if sheet.valuation_cap > 0.0 {
        pdf.columns(
            "Valuation Cap:",
            &format_money(sheet.valuation_cap),
            55.0,
            10.0,
            Style::Regular,
        );
    }
    if sheet.discount_rate > 0.0 {
        pdf.columns(
            "Discount Rate:",
            &format!("{:.1}%", sheet.discount_rate),
            55.0,
            10.0,
            Style::Regular,
        );
    }
    pdf.columns("Pro-Rata Rights:", yes_no(sheet.pro_rata_rights), 55.0, 10.0, Style::Regular);
    pdf.columns("MFN Clause:", yes_no(sheet.mfn_clause), 55.0, 10.0, Style::Regular);
    pdf.gap(6.0);

    pdf.paragraph("KEY TERMS", 12.0, Style::Bold);
    pdf.paragraph(KEY_TERMS, 9.0, Style::Regular);
    pdf.gap(8.0);

    pdf.paragraph("SIGNATURES", 12.0, Style::Bold);
    pdf.columns("COMPANY", "INVESTOR", 85.0, 10.0, Style::Bold);
    pdf.columns(
        &signature_line(sheet, SigningParty::Developer),
        &signature_line(sheet, SigningParty::Investor),
        85.0,
        10.0,
        Style::Regular,
    );
    pdf.columns(&parties.developer_name, &parties.investor_name, 85.0, 10.0, Style::Regular);
    pdf.columns(&parties.company_name, &parties.investor_company, 85.0, 10.0, Style::Regular);
    pdf.gap(10.0);

    pdf.paragraph(
        &format!(
            "This document was generated via the {app_name} platform. Electronic signatures are \
             legally binding under applicable e-signature laws."
        ),
        8.0,
        Style::Italic,
    );

    pdf.finish()
}

fn signature_line(sheet: &TermSheet, party: SigningParty) -> String {
    let signed_at = match party {
        SigningParty::Investor => sheet.investor_signed_at,
        SigningParty::Developer => sheet.developer_signed_at,
    };
    match signed_at {
        Some(at) if sheet.signed_by(party) => format!("Signed: {}", at.format("%b %-d, %Y")),
        _ => "Pending signature".to_string(),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// `$1,234,567.89`
pub fn format_money(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{sign}${grouped}.{:02}", cents % 100)
}
