use std::time::Instant;

use tracing::info;

pub fn timed_scope<R, F: FnOnce() -> R>(label: &str, fun: F) -> R {
    let start = Instant::now();

    let res = fun();

    let time = Instant::now().duration_since(start);
    info!("{label} took: {time:?}");

    res
}
