//! Form submissions and the Telegram text built from them.
//!
//! A request body is either a guest greeting or a payment confirmation,
//! selected by the `tipe` discriminator. Field names are accepted in both the
//! Indonesian form spelling and the English one.

use serde_json::{Map, Value};

use crate::error::RelayError;

const PAYMENT_KINDS: &[&str] = &["konfirmasi_pembayaran", "payment_confirmation"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestEntry {
    pub name: String,
    pub attendance_status: String,
    pub party_size: u64,
    pub contact: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub sender_name: String,
    pub method: String,
    /// 0 when no amount was given
    pub amount: u64,
    pub date: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Guest(GuestEntry),
    Payment(PaymentConfirmation),
}

impl Submission {
    /// Select the variant from the raw body and validate its required fields.
    pub fn parse(body: &Map<String, Value>) -> Result<Self, RelayError> {
        let kind = field(body, &["tipe", "type"]).to_lowercase();
        if PAYMENT_KINDS.contains(&kind.as_str()) {
            PaymentConfirmation::parse(body).map(Submission::Payment)
        } else {
            GuestEntry::parse(body).map(Submission::Guest)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Submission::Guest(_) => "guest_entry",
            Submission::Payment(_) => "payment_confirmation",
        }
    }

    /// Plain-text message, one line per present field in fixed order.
    pub fn to_message(&self) -> String {
        let lines: Vec<String> = match self {
            Submission::Guest(g) => vec![
                Some("📝 Ucapan Tamu".to_string()),
                Some(format!("Nama: {}", g.name)),
                Some(format!("Kehadiran: {}", g.attendance_status)),
                Some(format!("Jumlah: {}", g.party_size)),
                g.contact.as_ref().map(|c| format!("Nomor WA: {c}")),
                g.message.as_ref().map(|m| format!("Ucapan: {m}")),
            ],
            Submission::Payment(p) => vec![
                Some("💳 Konfirmasi Pembayaran".to_string()),
                Some(format!("Nama Pengirim: {}", p.sender_name)),
                Some(format!("Metode: {}", p.method)),
                Some(format!("Nominal: Rp{}", format_amount(p.amount))),
                p.date.as_ref().map(|d| format!("Tanggal: {d}")),
                p.note.as_ref().map(|n| format!("Catatan: {n}")),
            ],
        }
        .into_iter()
        .flatten()
        .collect();

        lines.join("\n")
    }
}

impl GuestEntry {
    fn parse(body: &Map<String, Value>) -> Result<Self, RelayError> {
        let name = field(body, &["nama", "name"]);
        let attendance_status = field(body, &["kehadiran", "attendanceStatus"]);

        if name.is_empty() {
            return Err(RelayError::Validation("Nama wajib diisi".to_string()));
        }
        if attendance_status.is_empty() {
            return Err(RelayError::Validation("Kehadiran wajib diisi".to_string()));
        }

        // A negative party size is invalid, not a count with a stray sign.
        let raw_size = field(body, &["jumlah", "partySize"]);
        let party_size = Some(raw_size.as_str())
            .filter(|raw| !raw.starts_with('-'))
            .and_then(parse_count)
            .filter(|n| *n >= 1)
            .unwrap_or(1);

        Ok(Self {
            name,
            attendance_status,
            party_size,
            contact: optional(field(body, &["kontak", "contact"])),
            message: optional(field(body, &["ucapan", "message"])),
        })
    }
}

impl PaymentConfirmation {
    fn parse(body: &Map<String, Value>) -> Result<Self, RelayError> {
        let sender_name = field(body, &["nama_pengirim", "senderName"]);
        let method = field(body, &["metode", "method"]);

        if sender_name.is_empty() {
            return Err(RelayError::Validation(
                "Nama pengirim wajib diisi".to_string(),
            ));
        }
        if method.is_empty() {
            return Err(RelayError::Validation("Metode wajib dipilih".to_string()));
        }

        Ok(Self {
            sender_name,
            method,
            amount: parse_count(&field(body, &["nominal", "amount"])).unwrap_or(0),
            date: optional(field(body, &["tanggal", "date"])),
            note: optional(field(body, &["catatan", "note"])),
        })
    }
}

/// Trimmed text of the first alias holding a non-blank value, or "".
fn field(body: &Map<String, Value>, aliases: &[&str]) -> String {
    aliases
        .iter()
        .filter_map(|key| body.get(*key))
        .map(scalar_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_text(n),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Whole floats print without a fraction so `2.0` stays 2 once non-digits
/// are stripped.
fn number_text(n: &serde_json::Number) -> String {
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}

fn optional(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Keep only the digits and parse them. Input that leaves no digits or
/// overflows `u64` yields `None`.
pub fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Group thousands with `.` the way `id-ID` does; 0 renders as `-`.
pub fn format_amount(amount: u64) -> String {
    if amount == 0 {
        return "-".to_string();
    }

    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
