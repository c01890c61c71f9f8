use std::sync::Once;

pub type TestResult<T = ()> = color_eyre::eyre::Result<T>;

static INSTALL: Once = Once::new();
pub(super) fn install() {
    INSTALL.call_once(|| {
        let _ = color_eyre::install();
    });
}

macro_rules! ensure_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                ::color_eyre::eyre::ensure!(
                    (left_val == right_val),
                    "assertion failed: `(left == right)`\n  left: `{:?}`,\n right: `{:?}`",
                    left_val, right_val,
                );
            }
        }
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                ::color_eyre::eyre::ensure!(
                    (left_val == right_val),
                    "assertion failed: `(left == right)`\n  left: `{:?}`,\n right: `{:?}`: {}",
                    left_val, right_val, ::core::format_args!($($arg)+),
                );
            }
        }
    };
}
