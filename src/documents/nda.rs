use super::pdf::{PdfBuilder, Style};
use crate::models::{Nda, User};

/// Current NDA wording. Bump [`NDA_VERSION`] whenever it changes.
pub const NDA_VERSION: &str = "1.0";

pub const NDA_TEMPLATE: &str = r#"NON-DISCLOSURE AGREEMENT

This Non-Disclosure Agreement ("Agreement") is entered into as of the date of electronic signature below.

BETWEEN:
{{app_name}} Platform ("Disclosing Party")
AND
The undersigned individual or entity ("Receiving Party")

1. PURPOSE
The Receiving Party wishes to receive access to confidential startup project information, including but not limited to business plans, financial projections, technical specifications, and intellectual property ("Confidential Information") for the purpose of evaluating potential investment opportunities.

2. CONFIDENTIAL INFORMATION
"Confidential Information" includes all information disclosed by the Disclosing Party or project developers through the {{app_name}} platform, whether oral, written, or in any other form, that is designated as confidential or that reasonably should be understood to be confidential.

3. OBLIGATIONS
The Receiving Party agrees to:
a) Hold all Confidential Information in strict confidence;
b) Not disclose Confidential Information to any third party without prior written consent;
c) Use Confidential Information solely for evaluating investment opportunities;
d) Not copy, reproduce, or distribute Confidential Information except as necessary for evaluation;
e) Protect Confidential Information using the same degree of care used to protect their own confidential information, but no less than reasonable care.

4. EXCLUSIONS
This Agreement does not apply to information that:
a) Is or becomes publicly available through no fault of the Receiving Party;
b) Was known to the Receiving Party prior to disclosure;
c) Is independently developed by the Receiving Party without use of Confidential Information;
d) Is disclosed with the written approval of the Disclosing Party;
e) Is required to be disclosed by law or court order.

5. TERM
This Agreement shall remain in effect for a period of two (2) years from the date of signing.

6. NO LICENSE
Nothing in this Agreement grants the Receiving Party any license or rights to any intellectual property of the Disclosing Party or project developers.

7. RETURN OF INFORMATION
Upon request, the Receiving Party shall promptly return or destroy all Confidential Information and any copies thereof.

8. REMEDIES
The Receiving Party acknowledges that any breach of this Agreement may cause irreparable harm, and the Disclosing Party shall be entitled to seek equitable relief, including injunction, in addition to any other remedies available at law.

9. GOVERNING LAW
This Agreement shall be governed by and construed in accordance with applicable laws.

10. ELECTRONIC SIGNATURE
The parties agree that electronic signatures shall be legally binding and have the same force and effect as handwritten signatures.

BY SIGNING BELOW, THE RECEIVING PARTY ACKNOWLEDGES THAT THEY HAVE READ, UNDERSTAND, AND AGREE TO BE BOUND BY THE TERMS OF THIS AGREEMENT."#;

pub fn render(app_name: &str, agreement_text: &str, nda: &Nda, investor: &User) -> Result<Vec<u8>, String> {
    let mut pdf = PdfBuilder::new("Non-Disclosure Agreement")?;

    // The template already carries the title line.
    let body = agreement_text
        .trim_start()
        .strip_prefix("NON-DISCLOSURE AGREEMENT")
        .unwrap_or(agreement_text)
        .replace(
            "The undersigned individual or entity (\"Receiving Party\")",
            &format!("{} (\"Receiving Party\")", investor.full_name()),
        )
        .replace(
            "as of the date of electronic signature below",
            &format!("as of {}", nda.signed_at.format("%B %-d, %Y")),
        );

    pdf.centered("NON-DISCLOSURE AGREEMENT", 18.0, Style::Bold);
    pdf.gap(8.0);
    pdf.paragraph(&body, 10.0, Style::Regular);
    pdf.gap(8.0);

    pdf.paragraph("RECEIVING PARTY SIGNATURE", 12.0, Style::Bold);
    pdf.gap(2.0);
    pdf.paragraph(&format!("Name: {}", nda.signed_name), 10.0, Style::Regular);
    pdf.paragraph(&format!("Email: {}", investor.email), 10.0, Style::Regular);
    pdf.paragraph(
        &format!("Signed: {}", nda.signed_at.format("%B %-d, %Y %H:%M:%S UTC")),
        10.0,
        Style::Regular,
    );
    pdf.paragraph(
        &format!("Valid until: {}", nda.expires_at.format("%B %-d, %Y")),
        10.0,
        Style::Regular,
    );
    pdf.paragraph(&format!("IP Address: {}", nda.ip_address), 10.0, Style::Regular);
    pdf.paragraph(&format!("Document Version: {}", nda.version), 10.0, Style::Regular);
    pdf.paragraph(&format!("Document Hash: {}", nda.document_hash), 8.0, Style::Regular);
    pdf.gap(8.0);

    pdf.paragraph(
        &format!(
            "This document was electronically signed via the {app_name} platform. The signature \
             data is securely stored and this document serves as proof of agreement."
        ),
        8.0,
        Style::Italic,
    );

    pdf.finish()
}
