#[cfg(test)]
macro_rules! assert_error {
    ($e:expr, $p:pat $(if $guard:expr)?) => {
        assert!(
            matches!($e, Err($p) $(if $guard)?),
            "Expected {}, but got {:?}",
            stringify!($p),
            $e
        )
    };
}
