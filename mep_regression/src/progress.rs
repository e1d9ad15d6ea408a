#[cfg(feature = "progress")]
mod imp {
    use std::io::IsTerminal;

    use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

    pub(crate) struct TaskBar {
        bar: ProgressBar,
    }

    impl TaskBar {
        pub(crate) fn new(label: &str, total: usize) -> Self {
            let bar = if std::io::stderr().is_terminal() {
                let pb = ProgressBar::new(total as u64);
                pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
                pb.set_prefix(label.to_string());
                let style = ProgressStyle::with_template(
                    "{prefix:<22} {wide_bar} {pos:>7}/{len:7} [{elapsed_precise}]",
                )
                .unwrap();
                pb.set_style(style);
                pb
            } else {
                ProgressBar::hidden()
            };
            Self { bar }
        }

        pub(crate) fn inc(&self) {
            self.bar.inc(1);
        }

        pub(crate) fn finish(&self) {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(not(feature = "progress"))]
mod imp {
    pub(crate) struct TaskBar;

    impl TaskBar {
        pub(crate) fn new(_label: &str, _total: usize) -> Self {
            Self
        }

        pub(crate) fn inc(&self) {}

        pub(crate) fn finish(&self) {}
    }
}

pub(crate) use imp::TaskBar;
