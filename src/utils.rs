use std::io::Cursor;

use base64::{Engine, prelude::BASE64_STANDARD};
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use rand::Rng;

use crate::prelude::*;

const UPPER_ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MIXED_ALNUM: &[u8] =
  b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn random_from(charset: &[u8], len: usize) -> String {
  let mut rng = rand::thread_rng();
  (0..len).map(|_| charset[rng.gen_range(0..charset.len())] as char).collect()
}

/// Opaque bearer token stored in `sessoes.token`.
pub fn session_token() -> String {
  random_from(MIXED_ALNUM, 64)
}

/// Short human-readable ticket code, e.g. `K7Q2M9XA`.
pub fn ticket_code() -> String {
  random_from(UPPER_ALNUM, 8)
}

/// Order number shown to buyers, e.g. `NV-7Q2M9X`.
pub fn order_number() -> String {
  format!("NV-{}", random_from(UPPER_ALNUM, 6))
}

pub fn digits(input: &str) -> String {
  input.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_valid_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !email.chars().any(char::is_whitespace)
    && !domain.contains('@')
    && domain
      .split_once('.')
      .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Formats centavos as a plain decimal amount: `3500` -> `"35.00"`.
pub fn format_amount(cents: i64) -> String {
  format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

/// Renders `data` as a QR code, PNG encoded in plain base64.
pub fn qr_png_base64(data: &str, size: u32) -> Result<String> {
  let code = QrCode::new(data.as_bytes())
    .map_err(|e| Error::Internal(format!("QR encode failed: {e:?}")))?;
  let image = code.render::<Luma<u8>>().min_dimensions(size, size).build();

  let mut png = Cursor::new(Vec::new());
  image
    .write_to(&mut png, ImageFormat::Png)
    .map_err(|e| Error::Internal(format!("QR render failed: {e}")))?;

  Ok(BASE64_STANDARD.encode(png.into_inner()))
}

pub fn qr_data_url(data: &str, size: u32) -> Result<String> {
  Ok(format!("data:image/png;base64,{}", qr_png_base64(data, size)?))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ticket_code_shape() {
    let code = ticket_code();
    assert_eq!(code.len(), 8);
    assert!(code.bytes().all(|b| UPPER_ALNUM.contains(&b)));
  }

  #[test]
  fn test_session_token_shape() {
    let token = session_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(token, session_token());
  }

  #[test]
  fn test_digits() {
    assert_eq!(digits("(16) 99613-0592"), "16996130592");
    assert_eq!(digits("123.456.789-09"), "12345678909");
  }

  #[test]
  fn test_email() {
    assert!(is_valid_email("ana@naipe.com.br"));
    assert!(!is_valid_email("ana@naipe"));
    assert!(!is_valid_email("ana naipe@x.com"));
    assert!(!is_valid_email("@x.com"));
  }

  #[test]
  fn test_format_amount() {
    assert_eq!(format_amount(2000), "20.00");
    assert_eq!(format_amount(3550), "35.50");
    assert_eq!(format_amount(5), "0.05");
  }

  #[test]
  fn test_qr_data_url() {
    let url = qr_data_url("K7Q2M9XA", 200).unwrap();
    assert!(url.starts_with("data:image/png;base64,"));

    let raw = qr_png_base64("K7Q2M9XA", 200).unwrap();
    let png = BASE64_STANDARD.decode(raw).unwrap();
    assert_eq!(&png[1..4], b"PNG");
  }
}
