// src/macros.rs

//
// Logging macros
//
// logging feature enabled → tracing
// logging feature disabled → only log_error prints to stderr
//
// Call sites name their captured values with a leading underscore when the
// value is only consumed by a log statement, so builds without `logging`
// stay warning-free.
//

#![allow(unused_macros)]

// --------------------
// ERROR
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

// --------------------
// WARN
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

// --------------------
// INFO
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_info {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

// --------------------
// DEBUG
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

// --------------------
// WIRE CODES
// --------------------

/// Declares an enum that travels on the wire as its integer code.
///
/// The closed form generates `code()`, `from_code()`, `TryFrom<i64>` (unknown
/// codes become [`Error::UnknownCode`](crate::Error::UnknownCode)),
/// `From<Self> for i64` and serde support through those two conversions.
///
/// The open form, `enum Name { .. } else Other`, adds an `Other(i64)` variant
/// that keeps codes it does not recognise, so decoding never fails on them.
/// It implements `From<i64>` instead of `TryFrom<i64>`.
macro_rules! wire_code_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $code:literal
            ),+ $(,)?
        } else $other:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "i64", into = "i64")]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
            /// A code with no named variant, kept as received.
            $other(i64),
        }

        impl $name {
            /// Integer code used on the wire.
            pub fn code(self) -> i64 {
                match self {
                    $( Self::$variant => $code, )+
                    Self::$other(code) => code,
                }
            }

            /// Map a wire code onto its variant, falling back to the raw code.
            pub fn from_code(code: i64) -> Self {
                match code {
                    $( $code => Self::$variant, )+
                    _ => Self::$other(code),
                }
            }

            /// Whether the code has a named variant.
            pub fn is_known(self) -> bool {
                !matches!(self, Self::$other(_))
            }
        }

        impl From<i64> for $name {
            fn from(code: i64) -> $name {
                $name::from_code(code)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> i64 {
                value.code()
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $code:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $code,
            )+
        }

        impl $name {
            /// Integer code used on the wire.
            pub fn code(self) -> i64 {
                self as i64
            }

            /// Look up the variant for a wire code.
            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        // Variants may be called `Error`, so the lookup stays out of this
        // impl, where `Self::Error` names the associated type.
        impl TryFrom<i64> for $name {
            type Error = crate::Error;

            fn try_from(code: i64) -> crate::Result<$name> {
                $name::from_code(code).ok_or(crate::Error::UnknownCode {
                    kind: stringify!($name),
                    code,
                })
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> i64 {
                value.code()
            }
        }
    };
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;
pub(crate) use wire_code_enum;
