/// Destructure an argument vector with slice patterns, failing with a
/// `Bind` error naming the callee when no pattern fits.
///
/// ```ignore
/// match_args!("nth", args, [coll, index] => nth_of(coll, index)?)
///
/// match_args!("slice", args, {
///     [coll, start] => ...,
///     [coll, start, end] => ...,
/// })
/// ```
///
/// Patterns bind by reference into the vector.
#[macro_export]
macro_rules! match_args {
    ($name:expr, $args:expr, [$($x:pat),* $(,)?] => $expr:expr) => {
        match $args.as_slice() {
            [$($x),*] => Ok($expr),
            args => Err($crate::interpreter::cps::RuntimeError::new(
                $crate::interpreter::cps::ErrorKind::Bind,
                format!("Wrong number of arguments to {}: {}", $name, args.len()),
            )),
        }
    };

    ($name:expr, $args:expr, { $([$($x:pat),* $(,)?] => $expr:expr),+ $(,)? }) => {
        match $args.as_slice() {
            $([$($x),*] => Ok($expr),)+
            args => Err($crate::interpreter::cps::RuntimeError::new(
                $crate::interpreter::cps::ErrorKind::Bind,
                format!("Wrong number of arguments to {}: {}", $name, args.len()),
            )),
        }
    };
}
