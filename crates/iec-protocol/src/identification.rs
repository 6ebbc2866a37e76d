//! Identification messages
//!
//! The meter answers a sign-on request with `/XXXZ<ident>` where `XXX` is the
//! manufacturer flag and `Z` the baud code (or mode marker) it offers. Each
//! emulated brand replays the identification captured from a real unit.

use crate::baud::BaudRate;
use crate::Brand;

/// Build the CRLF-terminated identification answer for a brand
///
/// `serial_number` is echoed by brands that include it (LUNA, VIKO).
/// KOHLER announces `runtime_baud` as the speed it will switch to.
/// [`Brand::None`] has no identification and yields a bare CRLF.
pub fn identification_message(brand: Brand, serial_number: &str, runtime_baud: BaudRate) -> String {
    let body = match brand {
        Brand::Luna => format!("/LUN5<1>LUN{}", serial_number),
        Brand::Kohler => format!("/LGZ{}ZMF100AC.M29", runtime_baud.code_char()),
        Brand::Makel => "/MSY5<1>C500.KMY.2556".to_string(),
        Brand::Viko => format!("/VIK5<1>VEMM{}", serial_number),
        Brand::None => String::new(),
    };
    format!("{}\r\n", body)
}
