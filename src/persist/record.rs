//! Certificate field extraction and the record persisted per sighting.
//!
//! Field extraction follows the same `x509-parser` shape the teacher uses
//! for client-certificate inspection, widened from common names/OUs to the
//! fuller field set this crate persists as JSON.

use serde::Serialize;
use sha1::{Digest, Sha1};

/// A certificate as seen on the wire, plus the fields worth persisting
/// alongside it.
///
/// The DER bytes and digest are always available, independent of whether
/// field parsing below succeeded — a certificate that `x509-parser` can't
/// fully make sense of still gets written to disk; only its `cert.json`
/// fields end up empty.
#[derive(Debug, Clone)]
pub struct CertificateRecord {
    pub der: Vec<u8>,
    fields: ParsedFields,
}

#[derive(Debug, Clone, Default, Serialize)]
struct ParsedFields {
    version: u32,
    serial: String,
    signature_algorithm: String,
    issuer: String,
    subject: String,
    common_names: Vec<String>,
    dns_names: Vec<String>,
    not_before: String,
    not_after: String,
    is_ca: bool,
}

impl CertificateRecord {
    pub fn new(der: Vec<u8>) -> Self {
        let fields = parse_fields(&der).unwrap_or_default();
        CertificateRecord { der, fields }
    }

    /// `lowercase-hex(SHA-1(der))` — the content-addressed identity used
    /// for deduplication and the output directory name.
    pub fn digest(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(&self.der);
        hex::encode(hasher.finalize())
    }

    pub fn common_name(&self) -> &str {
        self.fields.common_names.first().map(String::as_str).unwrap_or("")
    }

    pub fn serial_decimal(&self) -> &str {
        &self.fields.serial
    }

    /// The parsed fields (raw bytes never included) as the value written to
    /// `cert.json`.
    pub fn json_fields(&self) -> &impl Serialize {
        &self.fields
    }
}

fn parse_fields(der: &[u8]) -> Option<ParsedFields> {
    let (_, cert) = x509_parser::parse_x509_certificate(der).ok()?;

    let subject = cert.subject();
    let issuer = cert.issuer();

    let common_names = subject
        .iter_common_name()
        .filter_map(|cn| cn.as_str().ok())
        .map(String::from)
        .collect();

    let dns_names = cert
        .subject_alternative_name()
        .ok()
        .flatten()
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    x509_parser::extensions::GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Some(ParsedFields {
        version: cert.version().0,
        serial: serial_to_decimal(cert.raw_serial()),
        signature_algorithm: cert.signature_algorithm.algorithm.to_id_string(),
        issuer: issuer.to_string(),
        subject: subject.to_string(),
        common_names,
        dns_names,
        not_before: cert.validity().not_before.to_rfc2822().unwrap_or_default(),
        not_after: cert.validity().not_after.to_rfc2822().unwrap_or_default(),
        is_ca: cert.is_ca(),
    })
}

/// Renders a certificate's raw serial (big-endian, unsigned) as a decimal
/// string, matching `SerialNumber.String()` on the original's `*big.Int`.
/// `x509-parser`'s own `raw_serial_as_string()` renders colon-separated hex
/// instead, which isn't the wire format spec.md calls for.
fn serial_to_decimal(raw: &[u8]) -> String {
    let mut digits: Vec<u8> = vec![0];

    for &byte in raw {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            let value = *digit as u32 * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }

    while digits.len() > 1 && *digits.last().unwrap() == 0 {
        digits.pop();
    }

    digits.iter().rev().map(|d| (b'0' + d) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_renders_as_decimal_not_colon_hex() {
        // 0x2b:0x68:0x96:0x5d:0x8f:0x4f:0xbc == 12217829665962172
        let raw = [0x2b, 0x68, 0x96, 0x5d, 0x8f, 0x4f, 0xbc];
        assert_eq!(serial_to_decimal(&raw), "12217829665962172");
        assert_eq!(serial_to_decimal(&[0x00]), "0");
        assert_eq!(serial_to_decimal(&[0x00, 0x01]), "1");
    }

    #[test]
    fn unparseable_der_still_yields_a_digestable_record() {
        let record = CertificateRecord::new(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(record.common_name(), "");
        assert_eq!(record.digest().len(), 40);
    }

    #[test]
    fn digest_is_stable_for_identical_bytes() {
        let a = CertificateRecord::new(vec![1, 2, 3]);
        let b = CertificateRecord::new(vec![1, 2, 3]);
        assert_eq!(a.digest(), b.digest());
    }
}
