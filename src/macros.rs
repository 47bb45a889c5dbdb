macro_rules! impl_to_from_u32 {
    ($ident:ident) => {
        impl From<$ident> for u32 {
            fn from(reg: $ident) -> Self {
                reg.0
            }
        }

        impl From<u32> for $ident {
            fn from(int: u32) -> Self {
                Self(int)
            }
        }
    };
}

macro_rules! impl_to_from_u16 {
    ($ident:ident) => {
        impl From<$ident> for u16 {
            fn from(flags: $ident) -> Self {
                flags.0
            }
        }

        impl From<u16> for $ident {
            fn from(int: u16) -> Self {
                Self(int)
            }
        }
    };
}

/// Generates `flag()`, `set_flag()` and `clear_flag()` on top of the private
/// `_flag` / `_set_flag` accessors produced by `bitfield!`.
macro_rules! status_flag {
    ($flag_name:ident, $set_name:ident, $clear_name:ident) => {
        concat_idents::concat_idents!(get_name = _, $flag_name {
            pub fn $flag_name(&self) -> bool {
                self.get_name()
            }
        });

        concat_idents::concat_idents!(set_value_name = _set_, $flag_name, {
            pub fn $set_name(&mut self) {
                self.set_value_name(true)
            }

            pub fn $clear_name(&mut self) {
                self.set_value_name(false)
            }
        });
    };
}

pub(crate) use impl_to_from_u16;
pub(crate) use impl_to_from_u32;
pub(crate) use status_flag;
