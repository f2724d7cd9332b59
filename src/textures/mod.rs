//! Texture vocabulary shared by every stage of the pipeline
//!
//! Closed enumerations for encodings, header flags, resampling filters and
//! container versions. Every value round-trips through the exact token the
//! external encoder expects on its command line.

/// Declares a closed enum whose variants map 1:1 to command-line tokens.
///
/// Generates `ALL`, `name()`, a case-insensitive `from_str()`, `Display`
/// and string-based serde support.
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $token:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant in canonical order
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Token as passed to the external tools
            pub fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $token ),+
                }
            }

            /// Parse from string (case-insensitive)
            #[allow(clippy::should_implement_trait)]
            pub fn from_str(s: &str) -> Option<Self> {
                let s = s.trim();
                Self::ALL.iter().copied().find(|v| v.name().eq_ignore_ascii_case(s))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::from_str(&value)
                    .ok_or_else(|| format!("unknown {} '{}'", stringify!($name), value))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.name().to_string()
            }
        }
    };
}

pub(crate) use token_enum;

mod flags;
mod format;

pub use flags::{FlagSet, TextureFlag};
pub use format::{
    ContainerVersion, EncoderVariant, ResampleFilter, ResizeMethod, SharpenFilter, TextureFormat,
};

/// True if `n` is a non-zero power of two
pub fn is_power_of_two(n: u32) -> bool {
    n != 0 && n & (n - 1) == 0
}

/// Smallest and largest clamp sizes the encoder accepts
pub const MIN_CLAMP: u32 = 2;
pub const MAX_CLAMP: u32 = 4096;

/// True if `n` is a valid clamp dimension (power of two in 2..=4096)
pub fn is_valid_clamp(n: u32) -> bool {
    is_power_of_two(n) && (MIN_CLAMP..=MAX_CLAMP).contains(&n)
}
