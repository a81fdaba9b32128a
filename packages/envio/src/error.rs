//! Error types for the engine.

use std::fmt;

use envio_store::StoreError;

/// Which way data was flowing when a conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Store to record.
    Get,
    /// Record to store.
    Set,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Get => f.write_str("get data into"),
            Direction::Set => f.write_str("set data from"),
        }
    }
}

/// Errors returned by [`Engine::get`](crate::Engine::get) and
/// [`Engine::set`](crate::Engine::set).
///
/// A call reports only the first failure; fields processed before it keep
/// whatever the call did to them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The root value is not a record.
    #[error("envio: the input value is not a record: {type_name}")]
    NotARecord { type_name: &'static str },

    /// A mandatory key is absent or empty in the store.
    #[error("envio: the required variable ${key} is missing")]
    MissingRequired { key: &'static str },

    /// A dynamic field holds no value.
    #[error("envio: {record}.{field} holds a nil dynamic value")]
    NilDynamic {
        record: &'static str,
        field: &'static str,
    },

    /// A field's type has no conversion.
    #[error("envio: unsupported type {type_name}")]
    UnsupportedType { type_name: &'static str },

    /// An embedded optional record is absent, so there is nothing to
    /// populate.
    #[error("envio: embedded pointer to {type_name} is absent")]
    AbsentEmbedded { type_name: &'static str },

    /// The store failed to read a key.
    #[error("envio: cannot read ${key}: {source}")]
    Read {
        key: &'static str,
        #[source]
        source: StoreError,
    },

    /// A record's locators disagree with its field metadata.
    #[error("envio: {record} has no field at index {index}")]
    FieldIndex { record: &'static str, index: usize },

    /// A value could not be converted, or the store refused it.
    #[error("envio: {direction} {record}: {source}")]
    Convert {
        direction: Direction,
        record: &'static str,
        #[source]
        source: ConvertError,
    },
}

/// A failed conversion between a store string and a field.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("cannot parse {value:?} from ${key} as {target}: {reason}")]
    Parse {
        key: &'static str,
        value: String,
        target: &'static str,
        reason: String,
    },

    #[error("value {value:?} from ${key} is out of range for {target}")]
    OutOfRange {
        key: &'static str,
        value: String,
        target: &'static str,
    },

    #[error("bytes for ${key} are not valid UTF-8")]
    InvalidUtf8 { key: &'static str },

    #[error("cannot write ${key}: {source}")]
    Write {
        key: &'static str,
        #[source]
        source: StoreError,
    },
}

/// Outcome of a handler that did not succeed.
///
/// `Reported` errors are complete and travel to the caller untouched.
/// `Unexpected` causes still need the call context and are wrapped once, at
/// the top.
#[derive(Debug)]
pub(crate) enum Fault {
    Reported(Error),
    Unexpected(ConvertError),
}

impl Fault {
    pub(crate) fn into_error(self, direction: Direction, record: &'static str) -> Error {
        match self {
            Fault::Reported(e) => e,
            Fault::Unexpected(source) => Error::Convert {
                direction,
                record,
                source,
            },
        }
    }
}

impl From<Error> for Fault {
    fn from(e: Error) -> Self {
        Fault::Reported(e)
    }
}

impl From<ConvertError> for Fault {
    fn from(e: ConvertError) -> Self {
        Fault::Unexpected(e)
    }
}

pub(crate) type Flow = Result<(), Fault>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn missing_required_display() {
        let e = Error::MissingRequired { key: "APP_HOST" };
        assert_eq!(
            e.to_string(),
            "envio: the required variable $APP_HOST is missing"
        );
    }

    #[test]
    fn reported_fault_is_not_wrapped() {
        let fault = Fault::from(Error::UnsupportedType {
            type_name: "char",
        });
        let e = fault.into_error(Direction::Get, "Config");
        assert!(matches!(e, Error::UnsupportedType { type_name: "char" }));
    }

    #[test]
    fn unexpected_fault_is_wrapped_once() {
        let fault = Fault::from(ConvertError::Parse {
            key: "PORT",
            value: "http".to_string(),
            target: "u16",
            reason: "invalid digit found in string".to_string(),
        });
        let e = fault.into_error(Direction::Get, "Config");
        assert_eq!(
            e.to_string(),
            "envio: get data into Config: cannot parse \"http\" from $PORT as u16: \
             invalid digit found in string"
        );
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn set_direction_display() {
        let e = Fault::from(ConvertError::InvalidUtf8 { key: "BLOB" })
            .into_error(Direction::Set, "Payload");
        assert_eq!(
            e.to_string(),
            "envio: set data from Payload: bytes for $BLOB are not valid UTF-8"
        );
    }

    #[test]
    fn write_error_keeps_store_source() {
        let e = ConvertError::Write {
            key: "",
            source: StoreError::invalid_key("", "empty key"),
        };
        assert!(matches!(
            StdError::source(&e).and_then(|s| s.downcast_ref::<StoreError>()),
            Some(StoreError::InvalidKey { .. })
        ));
    }
}
