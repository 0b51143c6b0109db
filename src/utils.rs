use indicatif::{ProgressBar, ProgressStyle};

/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}

/// Bar counting visited voxels, or a hidden one when `enabled` is false.
pub fn progress_bar(enabled: bool, len: u64) -> ProgressBar {
    if !enabled { return ProgressBar::hidden() }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("Accumulating voxels: [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta_precise})")
    {
        bar.set_style(style);
    }
    bar
}

pub mod timing {

    use super::group_digits;
    use log::info;
    use std::time::Instant;

    pub struct Progress {
        previous: Instant,
        message: String,
    }

    impl Progress {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { previous: Instant::now(), message: String::new() } }

        /// Remember message, log it with an ellipsis, start timer.
        pub fn start(&mut self, message: &str) {
            info!("{message} ...");
            self.message = message.into();
            self.start_timer();
        }

        /// Log the message of the last `start`, with the time elapsed since then
        pub fn done(&mut self) {
            info!("{}: {} ms", self.message, group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        /// Log message followed by time elapsed since last start or done
        pub fn done_with_message(&mut self, message: &str) {
            info!("{message}: {} ms", group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        fn start_timer(&mut self) { self.previous = Instant::now() }
    }
}
