//! Interpretation of raw responses: status classification, error message
//! extraction, and body decoding.

use serde_json::{json, Value};

use crate::{error::Error, transport::RawResponse};

/// Media type the API uses for raw message downloads.
const MESSAGE_MEDIA_TYPE: &str = "message/rfc822";

/// Sorts a completed round trip into success or the matching [`Error`].
pub(crate) fn classify(raw: &RawResponse) -> Result<(), Error> {
    match raw.status_code {
        200..=299 => Ok(()),
        code @ 400..=599 => Err(Error::Api {
            code,
            message: error_message(&raw.body, code),
        }),
        code => Err(Error::UnexpectedStatus(code)),
    }
}

/// Derives a human readable message from the body of a failed response.
///
/// The API reports failures as a JSON object with an `error` key; anything
/// else falls back to a generic status-coded message.
fn error_message(body: &str, code: u16) -> String {
    let fallback = || format!("Unknown error: HTTP Code {code}");
    if body.is_empty() {
        return fallback();
    }
    let Ok(Value::Object(fields)) = serde_json::from_str(body) else {
        return fallback();
    };
    match fields.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => fallback(),
    }
}

/// Decodes the body of a successful response.
pub(crate) fn decode_body(raw: &RawResponse) -> Result<Option<Value>, Error> {
    if raw.body.is_empty() {
        return Ok(None);
    }
    if media_type(&raw.headers).is_some_and(|t| t.eq_ignore_ascii_case(MESSAGE_MEDIA_TYPE)) {
        // Raw message downloads are not JSON; hand the body back verbatim.
        return Ok(Some(json!({ "message": raw.body })));
    }
    serde_json::from_str(&raw.body)
        .map(Some)
        .map_err(|source| Error::Decode {
            code: raw.status_code,
            source,
        })
}

/// Values of all `Set-Cookie` headers, in response order.
pub(crate) fn set_cookie_values(headers: &[String]) -> Vec<&str> {
    header_values(headers, "set-cookie")
}

/// The `Content-Type` media type, without parameters.
fn media_type(headers: &[String]) -> Option<&str> {
    let value = header_values(headers, "content-type").into_iter().next()?;
    let media = match value.split_once(';') {
        Some((media, _)) => media,
        None => value,
    };
    Some(media.trim())
}

fn header_values<'a>(headers: &'a [String], name: &str) -> Vec<&'a str> {
    headers
        .iter()
        .filter_map(|line| line.split_once(':'))
        .filter(|(candidate, _)| candidate.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status_code: u16, headers: &[&str], body: &str) -> RawResponse {
        RawResponse {
            status_code,
            headers: headers.iter().map(|line| line.to_string()).collect(),
            body: body.to_string(),
        }
    }

    #[test]
    fn status_within_2xx_is_success() {
        assert!(classify(&raw(200, &[], "")).is_ok());
        assert!(classify(&raw(204, &[], "")).is_ok());
        assert!(classify(&raw(299, &[], "")).is_ok());
    }

    #[test]
    fn error_key_is_reported_verbatim() {
        let error = classify(&raw(404, &[], r#"{"error":"not found"}"#)).unwrap_err();
        assert_eq!(error.to_string(), "not found");
    }

    #[test]
    fn non_string_error_value_is_reserialized() {
        let error = classify(&raw(400, &[], r#"{"error":{"code":7}}"#)).unwrap_err();
        assert_eq!(error.to_string(), r#"{"code":7}"#);
    }

    #[test]
    fn empty_failure_body_falls_back_to_status_code() {
        let error = classify(&raw(500, &[], "")).unwrap_err();
        assert_eq!(error.to_string(), "Unknown error: HTTP Code 500");
    }

    #[test]
    fn malformed_failure_body_falls_back_to_status_code() {
        let error = classify(&raw(400, &[], "not json")).unwrap_err();
        assert_eq!(error.to_string(), "Unknown error: HTTP Code 400");
    }

    #[test]
    fn non_object_failure_body_falls_back_to_status_code() {
        let error = classify(&raw(400, &[], "[1,2]")).unwrap_err();
        assert_eq!(error.to_string(), "Unknown error: HTTP Code 400");
    }

    #[test]
    fn failure_body_without_error_key_falls_back_to_status_code() {
        let error = classify(&raw(403, &[], r#"{"status":"denied"}"#)).unwrap_err();
        assert_eq!(error.to_string(), "Unknown error: HTTP Code 403");
    }

    #[test]
    fn status_outside_classified_ranges_is_reported_as_unknown() {
        let error = classify(&raw(304, &[], "")).unwrap_err();
        assert_eq!(error.to_string(), "Unknown HTTP response 304");
    }

    #[test]
    fn set_cookie_scan_is_case_insensitive_and_ordered() {
        let headers = [
            "Content-Type: application/json".to_string(),
            "Set-Cookie: a=1".to_string(),
            "SET-COOKIE: b=2; Expires=Thu, 01 Jan 2099 00:00:00 GMT".to_string(),
        ];
        assert_eq!(
            set_cookie_values(&headers),
            ["a=1", "b=2; Expires=Thu, 01 Jan 2099 00:00:00 GMT"]
        );
    }

    #[test]
    fn empty_body_decodes_to_absent() {
        assert!(decode_body(&raw(200, &[], "")).unwrap().is_none());
    }

    #[test]
    fn json_body_decodes_to_value() {
        let value = decode_body(&raw(200, &[], r#"{"a":1,"b":[2,3]}"#)).unwrap();
        assert_eq!(value, Some(json!({"a": 1, "b": [2, 3]})));
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let error = decode_body(&raw(200, &[], "<html>")).unwrap_err();
        assert!(matches!(error, Error::Decode { code: 200, .. }));
    }

    #[test]
    fn rfc822_body_is_returned_verbatim() {
        let response = raw(
            200,
            &["Content-Type: message/rfc822; charset=us-ascii"],
            "Subject: hi\r\n\r\nhello",
        );
        assert_eq!(
            decode_body(&response).unwrap(),
            Some(json!({"message": "Subject: hi\r\n\r\nhello"}))
        );
    }
}
