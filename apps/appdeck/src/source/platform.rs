//! Host architecture and the alias table used to read it out of asset names.

use std::fmt;

/// CPU architectures a bundle can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    I386,
    Arm64,
    Arm,
}

impl Arch {
    /// Every architecture, in the order asset names are scanned.
    pub const ALL: [Self; 4] = [Self::Amd64, Self::I386, Self::Arm64, Self::Arm];

    /// Tokens that identify this architecture in a file name.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Amd64 => &["amd64", "x86_64", "x86-64"],
            Self::I386 => &["i386", "i686"],
            Self::Arm64 => &["arm64", "aarch64"],
            Self::Arm => &["armhf", "armv7l", "arm"],
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::I386 => "i386",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
        }
    }

    /// Architecture of the running host, if it is one bundles exist for.
    #[must_use]
    pub fn detect() -> Option<Self> {
        Self::from_rust_arch(std::env::consts::ARCH)
    }

    /// Maps a `std::env::consts::ARCH` value.
    #[must_use]
    pub fn from_rust_arch(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" => Some(Self::Amd64),
            "x86" => Some(Self::I386),
            "aarch64" => Some(Self::Arm64),
            "arm" => Some(Self::Arm),
            _ => None,
        }
    }

    /// Whether `name` mentions one of this architecture's aliases as a
    /// standalone token (not inside a longer word).
    #[must_use]
    pub fn is_named_in(self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.aliases()
            .iter()
            .any(|alias| contains_token(&name, alias))
    }

    /// First architecture named in `name`, scanning [`Arch::ALL`] in order.
    #[must_use]
    pub fn named_in(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|arch| arch.is_named_in(name))
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_token(haystack: &str, token: &str) -> bool {
    let bytes = haystack.as_bytes();
    haystack.match_indices(token).any(|(start, _)| {
        let end = start + token.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        before_ok && after_ok
    })
}
