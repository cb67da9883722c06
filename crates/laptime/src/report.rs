//! Where elapsed-time lines go.
//!
//! Instrumented code writes one line per call to standard output. Tests can
//! redirect the lines of the current thread with [`capture`].

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};

thread_local! {
    static CAPTURE: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Writes one report line.
///
/// Never panics: it runs inside drop guards, possibly while unwinding.
pub fn emit(args: fmt::Arguments<'_>) {
    let captured = CAPTURE.with(|capture| match capture.try_borrow_mut() {
        Ok(mut capture) => match capture.as_mut() {
            Some(lines) => {
                lines.push(args.to_string());
                true
            }
            None => false,
        },
        Err(_) => false,
    });

    if !captured {
        let _ = writeln!(io::stdout().lock(), "{args}");
    }
}

/// Runs `f` and returns its result together with the lines reported on this
/// thread meanwhile, instead of printing them.
///
/// Lines are collected even if `f` unwinds; the capture is then dropped along
/// with the panic.
///
/// ```
/// let (value, lines) = laptime::report::capture(|| {
///     laptime::__private::report(format_args!("Elapsed {}", 3));
///     7
/// });
/// assert_eq!(value, 7);
/// assert_eq!(lines, vec!["Elapsed 3"]);
/// ```
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    struct Restore(Option<Vec<String>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            CAPTURE.with(|capture| *capture.borrow_mut() = previous);
        }
    }

    let previous = CAPTURE.with(|capture| capture.borrow_mut().replace(Vec::new()));
    let restore = Restore(previous);
    let result = f();
    let lines = CAPTURE.with(|capture| capture.borrow_mut().take().unwrap_or_default());
    drop(restore);
    (result, lines)
}
