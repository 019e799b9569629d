// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTML invoice rendering.

use std::fmt::Write;

use autospares_core::format_ksh;
use autospares_core::types::Invoice;
use chrono::NaiveDate;

const STORE_NAME: &str = "AutoSpares Kenya";
const SUPPORT_LINE: &str = "Email: support@autospareskenya.com | Phone: +254 700 000 000";

/// `Invoice <order_number> - AutoSpares Kenya`.
pub fn subject(invoice: &Invoice) -> String {
    format!("Invoice {} - {STORE_NAME}", invoice.order_number)
}

/// Renders the invoice body. All caller-supplied text is HTML-escaped.
pub fn render_html(invoice: &Invoice, date: NaiveDate) -> String {
    let order_number = escape_html(&invoice.order_number);
    let customer = escape_html(&invoice.customer_name);
    let to = escape_html(&invoice.to);

    let mut rows = String::new();
    for item in &invoice.order_items {
        let _ = write!(
            rows,
            r#"
      <tr style="border-bottom: 1px solid #e5e7eb;">
        <td style="padding: 12px; text-align: left;">{name}</td>
        <td style="padding: 12px; text-align: center;">{qty}</td>
        <td style="padding: 12px; text-align: right;">{unit}</td>
        <td style="padding: 12px; text-align: right;">{line}</td>
      </tr>"#,
            name = escape_html(&item.name),
            qty = item.quantity,
            unit = format_ksh(item.price),
            line = format_ksh(item.price * f64::from(item.quantity)),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Invoice - {order_number}</title>
</head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px;">
  <header style="text-align: center; margin-bottom: 40px; border-bottom: 2px solid #3b82f6; padding-bottom: 20px;">
    <h1 style="color: #3b82f6; margin: 0;">{STORE_NAME}</h1>
    <p style="margin: 5px 0 0 0; color: #6b7280;">Your Trusted Auto Parts Partner</p>
  </header>

  <div style="background: #f8fafc; padding: 20px; border-radius: 8px; margin-bottom: 30px;">
    <h2 style="color: #16a34a; margin: 0 0 10px 0;">&#10003; Order Confirmed!</h2>
    <p style="margin: 0;">Thank you for your order, {customer}!</p>
  </div>

  <div style="margin-bottom: 30px;">
    <h3 style="color: #374151;">Invoice Details</h3>
    <p style="margin: 5px 0;"><strong>Invoice #:</strong> {order_number}</p>
    <p style="margin: 5px 0;"><strong>Date:</strong> {date}</p>
    <p style="margin: 5px 0;"><strong>Payment Method:</strong> M-Pesa</p>
    <h3 style="color: #374151;">Customer Information</h3>
    <p style="margin: 5px 0;"><strong>Name:</strong> {customer}</p>
    <p style="margin: 5px 0;"><strong>Email:</strong> {to}</p>
  </div>

  <table style="width: 100%; border-collapse: collapse; border: 1px solid #e5e7eb;">
    <thead>
      <tr style="background: #f3f4f6;">
        <th style="padding: 15px; text-align: left;">Product</th>
        <th style="padding: 15px; text-align: center;">Qty</th>
        <th style="padding: 15px; text-align: right;">Unit Price</th>
        <th style="padding: 15px; text-align: right;">Total</th>
      </tr>
    </thead>
    <tbody>{rows}
    </tbody>
  </table>

  <div style="background: #16a34a; color: white; padding: 20px; border-radius: 8px; text-align: right; margin: 30px 0;">
    <h3 style="margin: 0;">Total: {total}</h3>
  </div>

  <div style="background: #f8fafc; padding: 20px; border-radius: 8px; margin-bottom: 30px;">
    <h4 style="color: #374151; margin: 0 0 15px 0;">Payment Information</h4>
    <p style="margin: 5px 0;">Payment will be processed via M-Pesa. You will receive a payment prompt shortly.</p>
    <p style="margin: 5px 0;">Please ensure you have sufficient funds in your M-Pesa account.</p>
  </div>

  <footer style="text-align: center; margin-top: 40px; padding-top: 20px; border-top: 1px solid #e5e7eb; color: #6b7280;">
    <p style="margin: 5px 0;">{STORE_NAME}</p>
    <p style="margin: 5px 0;">{SUPPORT_LINE}</p>
    <p style="margin: 5px 0;">Thank you for choosing {STORE_NAME} for your automotive needs!</p>
  </footer>
</body>
</html>
"#,
        date = date.format("%d/%m/%Y"),
        total = format_ksh(invoice.order_total),
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
