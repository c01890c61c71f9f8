use {super::Xorshift32, std::path::PathBuf};

/// Infinite iterator of per-test filesystem names in the temp directory.
#[derive(Copy, Clone, Debug)]
pub struct NameGen {
    rng: Xorshift32,
    suffix: &'static str,
}
impl NameGen {
    pub fn new(id: &'static str, suffix: &'static str) -> Self {
        Self { rng: Xorshift32::from_id(id), suffix }
    }
}
impl Iterator for NameGen {
    type Item = PathBuf;
    fn next(&mut self) -> Option<Self::Item> {
        Some(std::env::temp_dir().join(format!(
            "fdrelay-test-{}-{:08x}{}",
            std::process::id(),
            self.rng.next(),
            self.suffix,
        )))
    }
}

macro_rules! make_id {
    () => {
        concat!(file!(), line!(), column!())
    };
}
