//! A userspace network stack over a TAP interface: Ethernet II framing,
//! ARP resolution, ICMPv4 echo, and a minimal TCP handshake/ACK responder.
//!
//! The library is pure and synchronous — it owns no file descriptors and
//! does no I/O. [`dispatcher::dispatch`] takes one Ethernet frame and the
//! mutable [`dispatcher::DispatchState`] (ARP cache + TCP endpoint table)
//! and returns a [`dispatcher::DispatchOutcome`]; the `tapnetd` binary
//! supplies the TAP read/write loop around it.
#![warn(missing_docs)]
#![deny(clippy::default_numeric_fallback)]

pub mod arp;
pub mod checksum;
pub mod dispatcher;
mod ether_type;
pub use ether_type::*;
mod ethernet;
pub use ethernet::*;
pub mod icmp;
mod ip_protocol;
pub use ip_protocol::*;
pub mod ipv4;
pub use ipv4::IPv4Header;
pub mod render;
pub mod tcp;
pub mod transport;
pub mod virtio;
pub mod wire;

macro_rules! pascal_name {
  ($name:ident) => {
    const_format::map_ascii_case!(const_format::Case::Pascal, core::stringify!($name))
  };
}

macro_rules! display_variants {
  ($struct_name:ident, $field_name:ident: $($variant_name:ident,)*) => {
    impl core::fmt::Display for $struct_name {
      fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
          $(&Self::$variant_name => write!(f, "{}: {}", $crate::pascal_name!($variant_name), self.$field_name),)*
          _ => write!(f, "Unknown: {}", self.$field_name()),
        }
      }
    }
  };
}

macro_rules! decl_variants {
  ($($(#[$docs:meta])* $variant_name:ident => $variant_value:expr,)*) => {
    $($(#[$docs])* pub const $variant_name: Self = Self::new($variant_value);)*
  };
}

macro_rules! struct_variants {
  ($struct_name:ident, $field_name:ident, $field_type:ty:
    $($(#[$variant_docs:meta])* $variant_name:ident => $variant_value:expr,)*
  ) => {
    #[doc=stringify!($struct_name)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[repr(transparent)]
    pub struct $struct_name {
      $field_name: $field_type,
    }

    paste::paste! {
      #[allow(non_camel_case_types)]
      #[allow(dead_code)]
      #[allow(clippy::upper_case_acronyms)]
      enum [<Enum $struct_name>] {
        $($variant_name = $variant_value,)*
      }
    }

    impl $struct_name {
      $crate::decl_variants!{$($(#[$variant_docs])* $variant_name => $variant_value,)*}

      /// Return $struct_name from $field_type
      pub const fn new($field_name: $field_type) -> Self {
        Self { $field_name }
      }

      /// Return $field_type
      pub const fn $field_name(&self) -> $field_type {
        self.$field_name
      }
    }

    impl From<$field_type> for $struct_name {
      fn from($field_name: $field_type) -> Self {
        Self::new($field_name)
      }
    }

    impl From<$struct_name> for $field_type {
      fn from(this: $struct_name) -> Self {
        this.$field_name
      }
    }

    impl core::str::FromStr for $struct_name {
      type Err = ();
      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $(core::stringify!($crate::pascal_name!($variant_name)) => Ok(Self::$variant_name),)*
          _ => Err(()),
        }
      }
    }

    $crate::display_variants!{
      $struct_name, $field_name:
        $($variant_name,)*
    }
  };
}

pub(crate) use decl_variants;
pub(crate) use display_variants;
pub(crate) use pascal_name;
pub(crate) use struct_variants;
