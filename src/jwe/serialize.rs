//! JWE serializations ([RFC7516] section 7).
//!
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::header::Header;
use crate::jwe::{Jwe, Recipient};

/// Flattened JWE JSON Serialization.
#[derive(Serialize)]
struct Flattened<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    protected: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    unprotected: Option<&'a Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<&'a Header>,
    #[serde(skip_serializing_if = "str::is_empty")]
    encrypted_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    aad: Option<&'a str>,
    iv: &'a str,
    ciphertext: &'a str,
    tag: &'a str,
}

/// Either JSON serialization.
#[derive(Deserialize)]
struct JsonJwe {
    #[serde(default)]
    protected: String,
    unprotected: Option<Header>,
    recipients: Option<Vec<Recipient>>,
    header: Option<Header>,
    encrypted_key: Option<String>,
    aad: Option<String>,
    iv: String,
    ciphertext: String,
    tag: String,
}

impl Jwe {
    /// Serialize using the JWE Compact Serialization.
    ///
    /// # Errors
    ///
    /// Returns an error unless the JWE has exactly one recipient, a protected
    /// header, and no unprotected header or AAD.
    pub fn to_compact(&self) -> Result<String> {
        let [recipient] = self.recipients.as_slice() else {
            return Err(Error::InvalidInput("compact serialization needs one recipient".into()));
        };
        if self.protected.is_empty() {
            return Err(Error::InvalidInput(
                "compact serialization needs a protected header".into(),
            ));
        }
        if self.unprotected.is_some() || recipient.header.is_some() {
            return Err(Error::InvalidInput(
                "compact serialization cannot carry unprotected headers".into(),
            ));
        }
        if self.aad.is_some() {
            return Err(Error::InvalidInput("compact serialization cannot carry AAD".into()));
        }

        Ok(format!(
            "{}.{}.{}.{}.{}",
            self.protected, recipient.encrypted_key, self.iv, self.ciphertext, self.tag
        ))
    }

    /// Serialize using the Flattened JWE JSON Serialization.
    ///
    /// # Errors
    ///
    /// Returns an error unless the JWE has exactly one recipient.
    pub fn to_flattened_json(&self) -> Result<String> {
        let [recipient] = self.recipients.as_slice() else {
            return Err(Error::InvalidInput("flattened serialization needs one recipient".into()));
        };
        let flattened = Flattened {
            protected: &self.protected,
            unprotected: self.unprotected.as_ref(),
            header: recipient.header.as_ref(),
            encrypted_key: &recipient.encrypted_key,
            aad: self.aad.as_deref(),
            iv: &self.iv,
            ciphertext: &self.ciphertext,
            tag: &self.tag,
        };
        Ok(serde_json::to_string(&flattened)?)
    }

    /// Serialize using the General JWE JSON Serialization.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JWE Compact Serialization.
    ///
    /// # Errors
    ///
    /// Returns an error if `compact` does not have five parts or the protected
    /// header is invalid.
    pub fn from_compact(compact: &str) -> Result<Self> {
        let parts: Vec<&str> = compact.split('.').collect();
        let [protected, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
            return Err(Error::InvalidInput("compact JWE must have five parts".into()));
        };
        if protected.is_empty() {
            return Err(Error::InvalidInput("compact JWE has no protected header".into()));
        }
        protected.parse::<Header>()?;

        Ok(Self {
            protected: (*protected).to_string(),
            unprotected: None,
            recipients: vec![Recipient {
                header: None,
                encrypted_key: (*encrypted_key).to_string(),
            }],
            aad: None,
            iv: (*iv).to_string(),
            ciphertext: (*ciphertext).to_string(),
            tag: (*tag).to_string(),
        })
    }

    /// Parse either JWE JSON Serialization.
    ///
    /// # Errors
    ///
    /// Returns an error if a required member is missing, a member appears
    /// twice, or `recipients` is combined with flattened members.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: JsonJwe = serde_json::from_str(json)?;

        let recipients = match parsed.recipients {
            Some(recipients) => {
                if parsed.header.is_some() || parsed.encrypted_key.is_some() {
                    return Err(Error::InvalidInput(
                        "`recipients` cannot be combined with `header` or `encrypted_key`".into(),
                    ));
                }
                if recipients.is_empty() {
                    return Err(Error::InvalidInput("`recipients` is empty".into()));
                }
                recipients
            }
            None => vec![Recipient {
                header: parsed.header,
                encrypted_key: parsed.encrypted_key.unwrap_or_default(),
            }],
        };

        let jwe = Self {
            protected: parsed.protected,
            unprotected: parsed.unprotected,
            recipients,
            aad: parsed.aad,
            iv: parsed.iv,
            ciphertext: parsed.ciphertext,
            tag: parsed.tag,
        };
        jwe.protected_header()?;
        Ok(jwe)
    }
}

/// Parse any serialization: JSON when the input is an object, compact
/// otherwise.
impl FromStr for Jwe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim_start().starts_with('{') {
            Self::from_json(s)
        } else {
            Self::from_compact(s)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // RFC 7516 Appendix A.3
    const COMPACT: &str = "eyJhbGciOiJBMTI4S1ciLCJlbmMiOiJBMTI4Q0JDLUhTMjU2In0.\
        6KB707dM9YTIgHtLvtgWQ8mKwboJW3of9locizkDTHzBC2IlrT1oOQ.\
        AxY8DCtDaGlsbGljb3RoZQ.\
        KDlTtXchhZTGufMYmOYGS4HffxPSUrfmqCHXaI9wOGY.\
        U0m_YmjN04DJvceFICbCVQ";

    #[test]
    fn compact() {
        let jwe = Jwe::from_compact(COMPACT).expect("should parse");
        assert_eq!(jwe.recipients.len(), 1);
        assert_eq!(jwe.iv, "AxY8DCtDaGlsbGljb3RoZQ");
        assert_eq!(jwe.to_compact().expect("should serialize"), COMPACT);

        assert!(Jwe::from_compact("a.b.c.d").is_err());
        assert!(Jwe::from_compact(".b.c.d.e").is_err());
    }

    #[test]
    fn flattened() {
        let jwe = Jwe::from_compact(COMPACT).expect("should parse");
        let json = jwe.to_flattened_json().expect("should serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert!(value.get("recipients").is_none());
        assert_eq!(
            value["encrypted_key"],
            "6KB707dM9YTIgHtLvtgWQ8mKwboJW3of9locizkDTHzBC2IlrT1oOQ"
        );

        let parsed: Jwe = json.parse().expect("should parse");
        assert_eq!(parsed, jwe);
    }

    #[test]
    fn general() {
        let mut jwe = Jwe::from_compact(COMPACT).expect("should parse");
        jwe.aad = Some("YWFk".into());
        jwe.recipients.push(Recipient {
            header: Some(Header::new().with("alg", "dir")),
            encrypted_key: String::new(),
        });

        let json = jwe.to_json().expect("should serialize");
        assert!(jwe.to_compact().is_err());
        assert!(jwe.to_flattened_json().is_err());
        assert_eq!(Jwe::from_json(&json).expect("should parse"), jwe);
    }

    #[test]
    fn invalid_json() {
        // missing member
        assert!(Jwe::from_json(r#"{"iv":"","ciphertext":""}"#).is_err());

        // duplicate member
        let duplicate = r#"{"iv":"","iv":"","ciphertext":"","tag":""}"#;
        assert!(Jwe::from_json(duplicate).is_err());

        // recipients combined with flattened members
        let mixed = r#"{"recipients":[{}],"encrypted_key":"","iv":"","ciphertext":"","tag":""}"#;
        assert!(Jwe::from_json(mixed).is_err());
    }
}
