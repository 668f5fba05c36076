/// Traces the current scope: Enter now, Exit with duration when the scope
/// ends.
///
/// The zero-argument form derives the enclosing function's path at compile
/// time; the one-argument form takes an explicit `&'static str` name.
///
/// ```
/// use scopetrace::trace_scope;
///
/// fn load_index() {
///     trace_scope!();
///     // ...
/// }
///
/// fn tick() {
///     trace_scope!("frame");
/// }
/// ```
#[macro_export]
macro_rules! trace_scope {
    () => {
        let _trace_scope_guard =
            $crate::guards::ScopeGuard::new($crate::__function_path!(), file!(), line!());
    };
    ($name:expr) => {
        let _trace_scope_guard = $crate::guards::ScopeGuard::new($name, file!(), line!());
    };
}

/// Records a formatted message event attached to the current call frame.
///
/// ```
/// use scopetrace::trace_msg;
///
/// trace_msg!("processing item {} of {}", 2, 10);
/// ```
#[macro_export]
macro_rules! trace_msg {
    ($($arg:tt)+) => {
        $crate::dispatch::message(file!(), line!(), format_args!($($arg)+))
    };
}

/// Records a function argument as `name: Type = value`.
///
/// With one argument the expression itself is the name; an explicit name can
/// be given first. Values are rendered with `Debug`.
///
/// ```
/// use scopetrace::trace_arg;
///
/// let retries = 3u32;
/// trace_arg!(retries);
/// trace_arg!("limit", retries * 2);
/// ```
#[macro_export]
macro_rules! trace_arg {
    ($value:expr) => {
        $crate::trace_arg!(stringify!($value), $value)
    };
    ($name:expr, $value:expr) => {{
        let value = &$value;
        $crate::dispatch::message(
            file!(),
            line!(),
            format_args!(
                "{}: {} = {:?}",
                $name,
                ::std::any::type_name_of_val(value),
                value
            ),
        )
    }};
}

/// Full path of the enclosing function, as a `&'static str`.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_path {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        __type_name_of(__here).trim_end_matches("::__here")
    }};
}
