/*!
    SOAP/XML vocabulary for PlayReady license acquisition, plus the
    `PlayReadyKeyMessage` envelope browsers exchange with pages.

    Challenge (client -> server):

    ```xml
    <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
      <soap:Body>
        <AcquireLicense xmlns="http://schemas.microsoft.com/DRM/2007/03/protocols">
          <challenge>
            <Challenge xmlns="http://schemas.microsoft.com/DRM/2007/03/protocols/messages">
              <LA Id="SignedData" xml:space="preserve">...</LA>
              <Signature xmlns="http://www.w3.org/2000/09/xmldsig#">...</Signature>
            </Challenge>
          </challenge>
        </AcquireLicense>
      </soap:Body>
    </soap:Envelope>
    ```

    The response wraps one or more base64 XMR blobs in `<License>` elements.
*/

use data_encoding::BASE64;

use crate::error::{FormatError, FormatResult};
use crate::utf16::{decode_utf16le, encode_utf16le};

pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const PROTOCOL_NS: &str = "http://schemas.microsoft.com/DRM/2007/03/protocols";
pub const MESSAGE_NS: &str = "http://schemas.microsoft.com/DRM/2007/03/protocols/messages";
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const XMLENC_NS: &str = "http://www.w3.org/2001/04/xmlenc#";

pub const AES128_CBC_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#aes128-cbc";
pub const ECC256_ALGORITHM: &str = "http://schemas.microsoft.com/DRM/2007/03/protocols#ecc256";
pub const C14N_ALGORITHM: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const ECDSA_SHA256_ALGORITHM: &str =
    "http://schemas.microsoft.com/DRM/2007/03/protocols#ecdsa-sha256";
pub const SHA256_ALGORITHM: &str = "http://schemas.microsoft.com/DRM/2007/03/protocols#sha256";

pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";
pub const ACQUIRE_LICENSE_ACTION: &str =
    "\"http://schemas.microsoft.com/DRM/2007/03/protocols/AcquireLicense\"";

/**
    Strip a namespace prefix from a tag name.
*/
pub fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/**
    Wrap a SOAP challenge in a UTF-16LE `PlayReadyKeyMessage`, the shape a
    page expects from a PlayReady media key session. The license server URL
    is left to the page; only the HTTP headers it must send are included.
*/
pub fn wrap_key_message(challenge: &[u8]) -> Vec<u8> {
    let xml = format!(
        "<PlayReadyKeyMessage type=\"LicenseAcquisition\">\
<LicenseAcquisition Version=\"1\">\
<Challenge encoding=\"base64encoded\">{challenge}</Challenge>\
<HttpHeaders>\
<HttpHeader><name>Content-Type</name><value>{CONTENT_TYPE}</value></HttpHeader>\
<HttpHeader><name>SOAPAction</name><value>{ACQUIRE_LICENSE_ACTION}</value></HttpHeader>\
</HttpHeaders>\
</LicenseAcquisition>\
</PlayReadyKeyMessage>",
        challenge = BASE64.encode(challenge),
    );
    encode_utf16le(&xml)
}

/**
    Recover the `<WRMHEADER ...>...</WRMHEADER>` text from a page-side key
    message.

    The header is cut out textually rather than re-serialized from a DOM so
    it reaches the license server byte-for-byte as the page produced it. If
    the message only carries a base64 challenge, the header is looked for
    inside the decoded challenge.
*/
pub fn wrm_header_from_key_message(message: &[u8]) -> FormatResult<String> {
    let text = decode_utf16le(message)?;
    if let Some(header) = find_wrm_header(&text) {
        return Ok(header.to_string());
    }

    let challenge = element_text(&text, "Challenge").ok_or(FormatError::MissingElement("WRMHEADER"))?;
    let decoded = BASE64
        .decode(challenge.trim().as_bytes())
        .map_err(|e| FormatError::InvalidBase64 {
            field: "Challenge",
            message: e.to_string(),
        })?;
    let inner = String::from_utf8_lossy(&decoded);
    find_wrm_header(&inner)
        .map(str::to_string)
        .ok_or(FormatError::MissingElement("WRMHEADER"))
}

fn find_wrm_header(text: &str) -> Option<&str> {
    const OPEN: &str = "<WRMHEADER";
    const CLOSE: &str = "</WRMHEADER>";
    let start = text.find(OPEN)?;
    let end = text[start..].find(CLOSE)? + start + CLOSE.len();
    Some(&text[start..end])
}

fn element_text<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let open = text.find(&format!("<{name}"))?;
    let body_start = open + text[open..].find('>')? + 1;
    let body_len = text[body_start..].find(&format!("</{name}>"))?;
    Some(&text[body_start..body_start + body_len])
}
