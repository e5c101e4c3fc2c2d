//! Operation logging macros
//!
//! A logged operation emits one `start` event followed by one `end` or
//! `end_error` event. Extra `key = value` fields are forwarded to `tracing`
//! unchanged, so `%` and `?` sigils work as usual. The expanding crate needs
//! `tracing` and `rewind-core-types` as dependencies.
//!
//! The macros expand to expressions and can sit in a match arm.

#[doc(hidden)]
#[macro_export]
macro_rules! __rewind_op_event {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event
            $(, $($field)*)?
        )
    };
}

/// ```
/// # use rewind_core::log_op_start;
/// log_op_start!("prune", owner_type = "article", owner_id = "42");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__rewind_op_event!(
            info,
            $op,
            rewind_core_types::schema::EVENT_START
            $(, $($field)*)?
        )
    };
}

/// `duration_ms` is required and comes first among the fields.
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__rewind_op_event!(
            info,
            $op,
            rewind_core_types::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log a failed operation at error level
///
/// `$err` is anything that converts into `ExError`; its kind and stable code
/// are logged as `err_kind` and `err_code`.
///
/// ```
/// # use rewind_core::log_op_error;
/// # use rewind_core::errors::{ExError, ExErrorKind};
/// log_op_error!("find", ExError::new(ExErrorKind::NotFound), duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__rewind_op_event!(
            error,
            $op,
            rewind_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code()
            $(, $($field)*)?
        )
    }};
}
