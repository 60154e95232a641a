//! `Result` alias and the verification macros precondition and
//! data-integrity checks route through.

pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Verifies a caller-supplied precondition, failing with `InvalidArgument`.
/// The failed condition text becomes the error message.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $cond:expr) => {
        $crate::result::check_arg($cond, stringify!($name), stringify!($cond))?
    };
}

/// Verifies an invariant of stored or decoded data, failing with
/// `InvalidFormat`. For corruption discovered while reading, not for misuse
/// of an API surface.
#[macro_export]
macro_rules! verify_data {
    ($element:expr, $cond:expr) => {
        $crate::result::check_data($cond, stringify!($element), stringify!($cond))?
    };
}

#[inline]
pub fn check_arg(ok: bool, name: &str, condition: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(arg_failure(name, condition))
    }
}

#[inline]
pub fn check_data(ok: bool, element: &str, condition: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(data_failure(element, condition))
    }
}

#[cold]
fn arg_failure(name: &str, condition: &str) -> crate::error::Error {
    crate::error::Error::invalid_arg(name, condition)
}

#[cold]
fn data_failure(element: &str, condition: &str) -> crate::error::Error {
    crate::error::Error::invalid_format(element, condition)
}
